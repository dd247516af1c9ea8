//! Transformation steps and mode-conditional chain templates.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mode::EnvironmentMode;

/// One named content-to-content conversion performed by an external transformer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformationStep {
    /// Identifier of the external transformer (e.g. `sass`, `css`, `babel`)
    #[serde(rename = "transformer")]
    kind: String,

    /// Options forwarded verbatim to the transformer
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    options: IndexMap<String, Value>,
}

impl TransformationStep {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            options: IndexMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn options(&self) -> &IndexMap<String, Value> {
        &self.options
    }
}

/// A position in a chain template.
///
/// Mode-specific slots let the development and production chains share every other
/// step. A side left out means the slot is skipped in that mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepSlot {
    Shared(TransformationStep),
    ByMode(ModeSteps),
}

/// The development and production sides of a conditional slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModeSteps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub development: Option<TransformationStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production: Option<TransformationStep>,
}

impl StepSlot {
    pub fn by_mode(development: TransformationStep, production: TransformationStep) -> Self {
        StepSlot::ByMode(ModeSteps {
            development: Some(development),
            production: Some(production),
        })
    }

    /// A conditional slot with neither side set contributes nothing in any mode.
    pub(crate) fn is_void(&self) -> bool {
        matches!(
            self,
            StepSlot::ByMode(ModeSteps {
                development: None,
                production: None
            })
        )
    }

    fn select(&self, mode: EnvironmentMode) -> Option<&TransformationStep> {
        match self {
            StepSlot::Shared(step) => Some(step),
            StepSlot::ByMode(sides) => match mode {
                EnvironmentMode::Development => sides.development.as_ref(),
                EnvironmentMode::Production => sides.production.as_ref(),
            },
        }
    }
}

impl From<TransformationStep> for StepSlot {
    fn from(step: TransformationStep) -> Self {
        StepSlot::Shared(step)
    }
}

/// Declared step order for one rule, before the mode is known.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainTemplate {
    slots: Vec<StepSlot>,
}

impl ChainTemplate {
    pub fn new(slots: impl IntoIterator<Item = StepSlot>) -> Self {
        Self {
            slots: slots.into_iter().collect(),
        }
    }

    pub fn slots(&self) -> &[StepSlot] {
        &self.slots
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Pick the steps that apply in `mode`, keeping declaration order.
    pub fn instantiate(&self, rule: &Arc<str>, mode: EnvironmentMode) -> TransformationChain {
        let steps: Vec<TransformationStep> = self
            .slots
            .iter()
            .filter_map(|slot| slot.select(mode))
            .cloned()
            .collect();

        TransformationChain {
            rule: Arc::clone(rule),
            mode,
            steps: steps.into(),
        }
    }
}

/// Immutable snapshot of the steps applied to one file, left to right.
///
/// Cloning is cheap; every clone shares the same step list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformationChain {
    rule: Arc<str>,
    mode: EnvironmentMode,
    steps: Arc<[TransformationStep]>,
}

impl TransformationChain {
    /// Name of the rule this chain belongs to.
    pub fn rule(&self) -> &str {
        &self.rule
    }

    pub fn mode(&self) -> EnvironmentMode {
        self.mode
    }

    pub fn steps(&self) -> &[TransformationStep] {
        &self.steps
    }

    /// Transformer identifiers in execution order.
    pub fn kinds(&self) -> Vec<&str> {
        self.steps.iter().map(TransformationStep::kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn style_template() -> ChainTemplate {
        ChainTemplate::new([
            TransformationStep::new("sass").into(),
            TransformationStep::new("css").into(),
            StepSlot::by_mode(
                TransformationStep::new("style-inject"),
                TransformationStep::new("css-extract"),
            ),
        ])
    }

    #[test]
    fn instantiate_swaps_only_the_conditional_slot() {
        let rule: Arc<str> = Arc::from("styles");
        let dev = style_template().instantiate(&rule, EnvironmentMode::Development);
        let prod = style_template().instantiate(&rule, EnvironmentMode::Production);

        assert_eq!(dev.kinds(), vec!["sass", "css", "style-inject"]);
        assert_eq!(prod.kinds(), vec!["sass", "css", "css-extract"]);
        assert_eq!(dev.steps()[..2], prod.steps()[..2]);
    }

    #[test]
    fn one_sided_slot_is_skipped_in_other_mode() {
        let rule: Arc<str> = Arc::from("scripts");
        let template = ChainTemplate::new([
            TransformationStep::new("babel").into(),
            StepSlot::ByMode(ModeSteps {
                development: None,
                production: Some(TransformationStep::new("minify")),
            }),
        ]);

        assert_eq!(
            template
                .instantiate(&rule, EnvironmentMode::Development)
                .kinds(),
            vec!["babel"]
        );
        assert_eq!(
            template
                .instantiate(&rule, EnvironmentMode::Production)
                .kinds(),
            vec!["babel", "minify"]
        );
    }

    #[test]
    fn slots_deserialize_from_shared_and_conditional_forms() {
        let template: ChainTemplate = serde_json::from_value(json!([
            { "transformer": "css", "options": { "modules": false } },
            { "development": { "transformer": "style-inject" },
              "production": { "transformer": "css-extract" } }
        ]))
        .unwrap();

        assert_eq!(template.slots().len(), 2);
        assert!(matches!(template.slots()[1], StepSlot::ByMode(_)));
        match &template.slots()[0] {
            StepSlot::Shared(step) => {
                assert_eq!(step.kind(), "css");
                assert_eq!(step.options()["modules"], json!(false));
            }
            other => panic!("expected shared slot, got {other:?}"),
        }
    }
}
