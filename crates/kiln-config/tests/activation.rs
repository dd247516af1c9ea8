//! Concurrent plugin activation through the orchestrator.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use kiln_config::{
    Activation, ActivationContext, ConfigError, EnvironmentMode, KilnConfig, Pipeline,
    PluginDescriptor, PluginFactory, PluginOrchestrator,
};
use serde_json::{Value, json};
use tempfile::TempDir;

/// Sleeps for `delay_ms` from the descriptor options, then echoes its name.
struct Delayed {
    finished: Arc<AtomicUsize>,
}

#[async_trait]
impl PluginFactory for Delayed {
    async fn activate(
        &self,
        descriptor: &PluginDescriptor,
        _ctx: &ActivationContext,
    ) -> anyhow::Result<Value> {
        let delay = descriptor.options["delay_ms"].as_u64().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(json!({ "name": descriptor.name }))
    }
}

struct Failing;

#[async_trait]
impl PluginFactory for Failing {
    async fn activate(
        &self,
        _descriptor: &PluginDescriptor,
        _ctx: &ActivationContext,
    ) -> anyhow::Result<Value> {
        tokio::time::sleep(Duration::from_millis(10)).await;
        anyhow::bail!("refusing to start")
    }
}

struct NeverFinishes {
    completed: Arc<AtomicBool>,
}

#[async_trait]
impl PluginFactory for NeverFinishes {
    async fn activate(
        &self,
        _descriptor: &PluginDescriptor,
        _ctx: &ActivationContext,
    ) -> anyhow::Result<Value> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        self.completed.store(true, Ordering::SeqCst);
        Ok(Value::Null)
    }
}

fn delayed(name: &str, delay_ms: u64) -> PluginDescriptor {
    PluginDescriptor::new(name, "delayed", Activation::Always)
        .with_options(json!({ "delay_ms": delay_ms }))
}

#[tokio::test]
async fn results_keep_declaration_order() {
    let finished = Arc::new(AtomicUsize::new(0));
    let mut orchestrator = PluginOrchestrator::empty();
    orchestrator.register("delayed", Delayed {
        finished: Arc::clone(&finished),
    });

    let descriptors = vec![delayed("slow", 60), delayed("fast", 0), delayed("middle", 20)];
    let plugins = orchestrator
        .activate(
            &descriptors,
            ActivationContext::new(EnvironmentMode::Production, "."),
        )
        .await
        .unwrap();

    let names: Vec<_> = plugins.iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["slow", "fast", "middle"]);
    assert_eq!(finished.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn first_failure_aborts_the_rest() {
    let completed = Arc::new(AtomicBool::new(false));
    let mut orchestrator = PluginOrchestrator::empty();
    orchestrator.register("failing", Failing);
    orchestrator.register("stuck", NeverFinishes {
        completed: Arc::clone(&completed),
    });

    let descriptors = vec![
        PluginDescriptor::new("stuck", "stuck", Activation::Always),
        PluginDescriptor::new("broken", "failing", Activation::Always),
    ];

    let started = std::time::Instant::now();
    let err = orchestrator
        .activate(
            &descriptors,
            ActivationContext::new(EnvironmentMode::Production, "."),
        )
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(5));
    match err {
        ConfigError::PluginActivation { plugin, reason } => {
            assert_eq!(plugin, "broken");
            assert!(reason.contains("refusing to start"));
        }
        other => panic!("unexpected error: {other}"),
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!completed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn inactive_descriptors_never_reach_their_factory() {
    let finished = Arc::new(AtomicUsize::new(0));
    let mut orchestrator = PluginOrchestrator::empty();
    orchestrator.register("delayed", Delayed {
        finished: Arc::clone(&finished),
    });

    let descriptors = vec![
        PluginDescriptor::new("dev-only", "delayed", Activation::Development),
        PluginDescriptor::new("prod-only", "delayed", Activation::Production),
    ];
    let plugins = orchestrator
        .activate(
            &descriptors,
            ActivationContext::new(EnvironmentMode::Production, "."),
        )
        .await
        .unwrap();

    assert_eq!(plugins.len(), 1);
    assert_eq!(plugins[0].name(), "prod-only");
    assert_eq!(finished.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn activation_is_idempotent() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("public")).unwrap();

    let config = KilnConfig::reference().unwrap();
    let pipeline = Pipeline::load(config, dir.path(), EnvironmentMode::Development).unwrap();
    let orchestrator = PluginOrchestrator::with_builtins();

    let first = pipeline.plan(&orchestrator).await.unwrap();
    let second = pipeline.plan(&orchestrator).await.unwrap();

    assert_eq!(first.plugins, second.plugins);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());

    let names: Vec<_> = first.plugins.iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["hmr", "editor"]);
    assert_eq!(
        first.plugins[1].settings()["languages"],
        json!(["cpp", "csharp", "css", "fsharp", "html", "javascript", "typescript"])
    );
}

#[tokio::test]
async fn editor_reads_manifest_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("editor.json"),
        r#"{ "languages": ["rust"], "features": ["find"] }"#,
    )
    .unwrap();

    let descriptors = vec![
        PluginDescriptor::new("editor", "editor", Activation::Always)
            .with_options(json!({ "manifest": "editor.json" })),
    ];
    let plugins = PluginOrchestrator::with_builtins()
        .activate(
            &descriptors,
            ActivationContext::new(EnvironmentMode::Development, dir.path()),
        )
        .await
        .unwrap();

    assert_eq!(plugins[0].settings()["languages"], json!(["rust"]));
}

#[tokio::test]
async fn editor_manifest_with_unknown_feature_fails() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("editor.json"),
        r#"{ "languages": ["rust"], "features": ["telepathy"] }"#,
    )
    .unwrap();

    let descriptors = vec![
        PluginDescriptor::new("editor", "editor", Activation::Always)
            .with_options(json!({ "manifest": "editor.json" })),
    ];
    let err = PluginOrchestrator::with_builtins()
        .activate(
            &descriptors,
            ActivationContext::new(EnvironmentMode::Development, dir.path()),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ConfigError::PluginActivation { plugin, reason } if plugin == "editor" && reason.contains("telepathy")
    ));
}
