//! Documentation-only exclusion notes.

use serde::{Deserialize, Serialize};

/// Something deliberately left out of the build, recorded for whoever edits the config.
///
/// Accepts either a bare identifier or `{ id, reason }`:
///
/// ```toml
/// excluded_features = ["dnd", { id = "folding", reason = "conflicts with cell layout" }]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ExcludedRepr")]
pub struct Excluded {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Excluded {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reason: None,
        }
    }

    pub fn because(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExcludedRepr {
    Bare(String),
    Noted {
        id: String,
        #[serde(default)]
        reason: Option<String>,
    },
}

impl From<ExcludedRepr> for Excluded {
    fn from(repr: ExcludedRepr) -> Self {
        match repr {
            ExcludedRepr::Bare(id) => Excluded::new(id),
            ExcludedRepr::Noted { id, reason } => Excluded { id, reason },
        }
    }
}

/// Rules and plugins that were considered and left out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Exclusions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Excluded>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<Excluded>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub externals: Vec<Excluded>,
}

impl Exclusions {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.plugins.is_empty() && self.externals.is_empty()
    }
}
