//! Path predicates for transformation rules.
//!
//! A [`MatchRule`] combines a file pattern with an optional directory scope. Paths are
//! compared lexically after normalisation; the filesystem is never consulted.

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

use regex::Regex;

use crate::error::{ConfigError, Result};

/// How a rule recognises the files it applies to.
#[derive(Debug, Clone)]
pub enum FilePattern {
    /// File extensions without the leading dot, compared ASCII case-insensitively.
    /// A trailing `?query` on the path is ignored.
    Extensions(Vec<String>),
    /// Regular expression over the `/`-separated path string.
    Regex(Regex),
}

impl FilePattern {
    pub fn extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        FilePattern::Extensions(
            extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        )
    }

    pub fn regex(pattern: &str, rule: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(FilePattern::Regex)
            .map_err(|source| ConfigError::InvalidPattern {
                rule: rule.to_string(),
                source,
            })
    }

    fn is_match(&self, path: &Path) -> bool {
        match self {
            FilePattern::Extensions(extensions) => file_extension(path)
                .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))),
            FilePattern::Regex(regex) => regex.is_match(&slash_path(path)),
        }
    }

    /// First extension both patterns recognise. Regex patterns never report a shared
    /// extension since their overlap cannot be decided statically.
    pub(crate) fn shared_extension<'a>(&'a self, other: &FilePattern) -> Option<&'a str> {
        match (self, other) {
            (FilePattern::Extensions(ours), FilePattern::Extensions(theirs)) => ours
                .iter()
                .find(|ext| theirs.contains(ext))
                .map(String::as_str),
            _ => None,
        }
    }
}

/// Directory roots a rule is limited to, or barred from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DirectoryScope {
    #[default]
    Everywhere,
    Include(Vec<PathBuf>),
    Exclude(Vec<PathBuf>),
}

impl DirectoryScope {
    fn admits(&self, path: &Path) -> bool {
        match self {
            DirectoryScope::Everywhere => true,
            DirectoryScope::Include(roots) => roots.iter().any(|root| path.starts_with(root)),
            DirectoryScope::Exclude(roots) => !roots.iter().any(|root| path.starts_with(root)),
        }
    }

    /// Whether no path can be admitted by both scopes.
    pub(crate) fn is_disjoint(&self, other: &DirectoryScope) -> bool {
        match (self, other) {
            (DirectoryScope::Include(ours), DirectoryScope::Include(theirs)) => {
                ours.iter().all(|a| {
                    theirs
                        .iter()
                        .all(|b| !a.starts_with(b) && !b.starts_with(a))
                })
            }
            (DirectoryScope::Include(included), DirectoryScope::Exclude(excluded))
            | (DirectoryScope::Exclude(excluded), DirectoryScope::Include(included)) => included
                .iter()
                .all(|root| excluded.iter().any(|ex| root.starts_with(ex))),
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatchRule {
    pattern: FilePattern,
    scope: DirectoryScope,
}

impl MatchRule {
    /// Build a rule. Empty directory lists count as absent.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::AmbiguousScope` when both `include` and `exclude` are given,
    /// and `ConfigError::InvalidValue` for a root that names the project itself or leaves it.
    pub fn new(
        name: &str,
        pattern: FilePattern,
        include: Vec<PathBuf>,
        exclude: Vec<PathBuf>,
    ) -> Result<Self> {
        let scope = match (include.is_empty(), exclude.is_empty()) {
            (true, true) => DirectoryScope::Everywhere,
            (false, true) => DirectoryScope::Include(scope_roots(name, "include", &include)?),
            (true, false) => DirectoryScope::Exclude(scope_roots(name, "exclude", &exclude)?),
            (false, false) => {
                return Err(ConfigError::AmbiguousScope {
                    rule: name.to_string(),
                });
            }
        };

        Ok(Self { pattern, scope })
    }

    pub fn pattern(&self) -> &FilePattern {
        &self.pattern
    }

    pub fn scope(&self) -> &DirectoryScope {
        &self.scope
    }

    /// Test a path against this rule. Scope is checked before the pattern, so an
    /// out-of-scope path never matches whatever its extension.
    pub fn matches(&self, path: &Path) -> bool {
        let path = normalize(path);
        self.scope.admits(&path) && self.pattern.is_match(&path)
    }
}

/// Free-function form of [`MatchRule::matches`].
pub fn matches(rule: &MatchRule, path: impl AsRef<Path>) -> bool {
    rule.matches(path.as_ref())
}

/// Normalise scope roots. `.` would never be a prefix of a cleaned relative path and
/// `..` points outside the project, so both are rejected.
fn scope_roots(rule: &str, key: &str, roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
    roots
        .iter()
        .map(|root| {
            let cleaned = normalize(root);
            let escapes = cleaned.components().next() == Some(Component::ParentDir);
            if cleaned == Path::new(".") || escapes {
                return Err(ConfigError::invalid_value(
                    format!("rules.{rule}.{key}"),
                    format!(
                        "`{}` is not a directory inside the project; omit `{key}` to match everywhere",
                        root.display()
                    ),
                ));
            }
            Ok(cleaned)
        })
        .collect()
}

/// Lexically normalise a path: drop `.` segments and fold `..` where possible.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    path_clean::clean(path)
}

fn slash_path(path: &Path) -> Cow<'_, str> {
    let raw = path.to_string_lossy();
    if raw.contains('\\') {
        Cow::Owned(raw.replace('\\', "/"))
    } else {
        raw
    }
}

fn file_extension(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    let name = name.split_once('?').map_or(name.as_ref(), |(head, _)| head);
    let (stem, ext) = name.rsplit_once('.')?;
    (!stem.is_empty() && !ext.is_empty()).then(|| ext.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ext_rule(exts: &[&str], include: &[&str], exclude: &[&str]) -> MatchRule {
        MatchRule::new(
            "test",
            FilePattern::extensions(exts),
            include.iter().map(PathBuf::from).collect(),
            exclude.iter().map(PathBuf::from).collect(),
        )
        .unwrap()
    }

    #[test]
    fn extension_group_matches() {
        let rule = ext_rule(&["sass", "scss", "css"], &[], &[]);
        assert!(rule.matches(Path::new("src/app/main.scss")));
        assert!(rule.matches(Path::new("theme.CSS")));
        assert!(!rule.matches(Path::new("src/app/main.js")));
        assert!(!rule.matches(Path::new("src/scss")));
    }

    #[test]
    fn extension_ignores_query_suffix() {
        let rule = ext_rule(&["woff2"], &[], &[]);
        assert!(rule.matches(Path::new("fonts/icons.woff2?v=4.7.0")));
    }

    #[test]
    fn include_scope_limits_matches() {
        let rule = ext_rule(&["css"], &["src"], &[]);
        assert!(rule.matches(Path::new("src/a.css")));
        assert!(rule.matches(Path::new("./src/nested/../a.css")));
        assert!(!rule.matches(Path::new("vendor/a.css")));
        assert!(!rule.matches(Path::new("srcx/a.css")));
    }

    #[test]
    fn exclude_scope_overrides_extension() {
        let rule = ext_rule(&["js"], &[], &["node_modules"]);
        assert!(rule.matches(Path::new("src/index.js")));
        assert!(!rule.matches(Path::new("node_modules/react/index.js")));
    }

    #[test]
    fn regex_pattern_matches_path_string() {
        let rule = MatchRule::new(
            "fable",
            FilePattern::regex(r"\.fs(x|proj)?$", "fable").unwrap(),
            vec![],
            vec![],
        )
        .unwrap();
        assert!(rule.matches(Path::new("src/App.fsproj")));
        assert!(rule.matches(Path::new("src/View.fs")));
        assert!(!rule.matches(Path::new("src/View.fsi")));
    }

    #[test]
    fn invalid_regex_is_reported() {
        let err = FilePattern::regex("(", "broken").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { rule, .. } if rule == "broken"));
    }

    #[test]
    fn include_and_exclude_together_are_rejected() {
        let err = MatchRule::new(
            "styles",
            FilePattern::extensions(["css"]),
            vec![PathBuf::from("src")],
            vec![PathBuf::from("src/legacy")],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::AmbiguousScope { rule } if rule == "styles"));
    }

    #[test]
    fn project_root_and_parent_scopes_are_rejected() {
        for root in [".", "./", "src/..", "../shared"] {
            let err = MatchRule::new(
                "styles",
                FilePattern::extensions(["css"]),
                vec![PathBuf::from(root)],
                vec![],
            )
            .unwrap_err();
            assert!(
                matches!(&err, ConfigError::InvalidValue { field, .. } if field == "rules.styles.include"),
                "{root}: {err:?}"
            );
        }

        let err = MatchRule::new(
            "scripts",
            FilePattern::extensions(["js"]),
            vec![],
            vec![PathBuf::from(".")],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field, .. } if field == "rules.scripts.exclude"));
    }

    #[test]
    fn dotted_prefix_on_a_real_root_still_works() {
        let rule = ext_rule(&["css"], &["./src/"], &[]);
        assert!(rule.matches(Path::new("src/a.css")));
    }

    #[test]
    fn scope_disjointness() {
        let src = DirectoryScope::Include(vec![PathBuf::from("src")]);
        let vendor = DirectoryScope::Include(vec![PathBuf::from("vendor")]);
        let nested = DirectoryScope::Include(vec![PathBuf::from("src/legacy")]);
        let not_vendor = DirectoryScope::Exclude(vec![PathBuf::from("vendor")]);

        assert!(src.is_disjoint(&vendor));
        assert!(!src.is_disjoint(&nested));
        assert!(vendor.is_disjoint(&not_vendor));
        assert!(!src.is_disjoint(&not_vendor));
        assert!(!DirectoryScope::Everywhere.is_disjoint(&src));
    }
}
