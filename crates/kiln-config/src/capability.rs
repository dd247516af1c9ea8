//! Capability subsets for the embedded code editor.
//!
//! The editor ships with a large default universe of languages and interactive features.
//! A project requests a subset of it; [`build_subset`] checks every identifier against
//! the universe and yields the manifest the editor reads at initialisation.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::annotation::Excluded;
use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityKind {
    Language,
    Feature,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityKind::Language => f.write_str("language"),
            CapabilityKind::Feature => f.write_str("feature"),
        }
    }
}

/// A set of language and feature identifiers. Order and duplicates carry no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySubset {
    #[serde(default)]
    pub languages: BTreeSet<String>,
    #[serde(default)]
    pub features: BTreeSet<String>,
}

impl CapabilitySubset {
    pub fn new<L, F>(languages: L, features: F) -> Self
    where
        L: IntoIterator,
        L::Item: Into<String>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        Self {
            languages: languages.into_iter().map(Into::into).collect(),
            features: features.into_iter().map(Into::into).collect(),
        }
    }

    /// Everything the bundled editor can compile in.
    pub fn editor_universe() -> Self {
        Self::new(EDITOR_LANGUAGES.iter().copied(), EDITOR_FEATURES.iter().copied())
    }
}

/// The `[editor]` section of `kiln.toml`.
///
/// `excluded_*` entries document capabilities that were considered and left out. They are
/// kept for readers of the config and never change what gets compiled in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditorConfig {
    #[serde(default)]
    pub languages: Vec<String>,

    #[serde(default)]
    pub features: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_languages: Vec<Excluded>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_features: Vec<Excluded>,
}

impl EditorConfig {
    pub fn requested(&self) -> CapabilitySubset {
        CapabilitySubset::new(self.languages.iter().cloned(), self.features.iter().cloned())
    }

    /// Validate the request against `universe`, noting annotations that contradict it.
    pub fn build(&self, universe: &CapabilitySubset) -> Result<ValidatedCapabilitySubset> {
        let subset = build_subset(&self.requested(), universe)?;

        for note in &self.excluded_languages {
            if subset.languages.contains(&note.id) {
                tracing::warn!(language = %note.id, "language is both requested and marked excluded");
            }
        }
        for note in &self.excluded_features {
            if subset.features.contains(&note.id) {
                tracing::warn!(feature = %note.id, "feature is both requested and marked excluded");
            }
        }

        Ok(subset)
    }
}

/// A subset proven to lie within its universe. Only [`build_subset`] constructs one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedCapabilitySubset {
    languages: BTreeSet<String>,
    features: BTreeSet<String>,
}

impl ValidatedCapabilitySubset {
    pub fn languages(&self) -> &BTreeSet<String> {
        &self.languages
    }

    pub fn features(&self) -> &BTreeSet<String> {
        &self.features
    }

    /// JSON manifest consumed by the editor component.
    pub fn to_manifest(&self) -> serde_json::Value {
        serde_json::json!({
            "languages": self.languages,
            "features": self.features,
        })
    }
}

/// Check `requested` against `universe`.
///
/// Languages are checked before features, each in sorted order; the first unknown
/// identifier is reported.
///
/// # Example
///
/// ```
/// use kiln_config::{build_subset, CapabilitySubset};
///
/// let universe = CapabilitySubset::editor_universe();
/// let requested = CapabilitySubset::new(["fsharp", "css", "css"], ["hover"]);
///
/// let subset = build_subset(&requested, &universe).unwrap();
/// assert_eq!(subset.languages().len(), 2);
/// ```
pub fn build_subset(
    requested: &CapabilitySubset,
    universe: &CapabilitySubset,
) -> Result<ValidatedCapabilitySubset> {
    if let Some(unknown) = requested.languages.difference(&universe.languages).next() {
        return Err(ConfigError::UnknownCapability {
            kind: CapabilityKind::Language,
            identifier: unknown.clone(),
        });
    }

    if let Some(unknown) = requested.features.difference(&universe.features).next() {
        return Err(ConfigError::UnknownCapability {
            kind: CapabilityKind::Feature,
            identifier: unknown.clone(),
        });
    }

    Ok(ValidatedCapabilitySubset {
        languages: requested.languages.clone(),
        features: requested.features.clone(),
    })
}

pub const EDITOR_LANGUAGES: &[&str] = &[
    "apex",
    "azcli",
    "bat",
    "clojure",
    "coffee",
    "cpp",
    "csharp",
    "csp",
    "css",
    "dockerfile",
    "fsharp",
    "go",
    "graphql",
    "handlebars",
    "html",
    "ini",
    "java",
    "javascript",
    "json",
    "kotlin",
    "less",
    "lua",
    "markdown",
    "msdax",
    "mysql",
    "objective-c",
    "pascal",
    "perl",
    "pgsql",
    "php",
    "postiats",
    "powerquery",
    "powershell",
    "pug",
    "python",
    "r",
    "razor",
    "redis",
    "redshift",
    "ruby",
    "rust",
    "sb",
    "scheme",
    "scss",
    "shell",
    "solidity",
    "sql",
    "st",
    "swift",
    "tcl",
    "typescript",
    "vb",
    "xml",
    "yaml",
];

pub const EDITOR_FEATURES: &[&str] = &[
    "accessibilityHelp",
    "bracketMatching",
    "caretOperations",
    "clipboard",
    "codeAction",
    "codelens",
    "colorDetector",
    "comment",
    "contextmenu",
    "coreCommands",
    "cursorUndo",
    "dnd",
    "find",
    "folding",
    "fontZoom",
    "format",
    "goToDefinitionCommands",
    "goToDefinitionMouse",
    "gotoError",
    "gotoLine",
    "hover",
    "iPadShowKeyboard",
    "inPlaceReplace",
    "inspectTokens",
    "linesOperations",
    "links",
    "multicursor",
    "parameterHints",
    "quickCommand",
    "quickFixCommands",
    "quickOutline",
    "referenceSearch",
    "rename",
    "smartSelect",
    "snippets",
    "suggest",
    "toggleHighContrast",
    "toggleTabFocusMode",
    "transpose",
    "wordHighlighter",
    "wordOperations",
    "wordPartOperations",
];
