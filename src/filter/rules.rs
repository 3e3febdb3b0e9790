//! Declarative filter rules
//!
//! Rules live as `*.toml` files in a rule directory and are registered into
//! the filter chain at start up:
//!
//! ```toml
//! name = "internal-only"
//! priority = 50
//! path_pattern = "^com/example/.*"
//! exclude_types = ["remote"]
//! exclude_stores = ["maven:hosted:staging"]
//! first_match_only = false
//! ```

use crate::error::{DepotError, DepotResult};
use crate::filter::{retain, RepositoryFilter};
use crate::store::{ArtifactStore, StoreKey, StoreType};
use regex::Regex;
use serde::Deserialize;
use std::borrow::Cow;
use std::path::Path;
use tracing::{debug, info};

/// Rule file contents
#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub name: String,

    #[serde(default)]
    pub priority: i32,

    /// Regex the request path must match; absent matches every path
    #[serde(default)]
    pub path_pattern: Option<String>,

    /// Store types removed from the candidates
    #[serde(default)]
    pub exclude_types: Vec<StoreType>,

    /// Specific stores removed from the candidates
    #[serde(default)]
    pub exclude_stores: Vec<StoreKey>,

    /// Only narrow first-match lookups
    #[serde(default)]
    pub first_match_only: bool,
}

/// A loaded rule, ready to run in the filter chain
#[derive(Debug)]
pub struct RuleFilter {
    rule: Rule,
    pattern: Option<Regex>,
}

impl RuleFilter {
    pub fn new(rule: Rule) -> Result<Self, regex::Error> {
        let pattern = rule.path_pattern.as_deref().map(Regex::new).transpose()?;
        Ok(Self { rule, pattern })
    }

    /// Parse a rule from TOML text; `origin` names the source in errors
    pub fn parse(content: &str, origin: &Path) -> DepotResult<Self> {
        let rule: Rule = toml::from_str(content).map_err(|e| DepotError::RuleInvalid {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::new(rule).map_err(|e| DepotError::RuleInvalid {
            path: origin.to_path_buf(),
            reason: format!("invalid path_pattern: {}", e),
        })
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// Whether the rule applies to `path`
    pub fn matches(&self, path: &str) -> bool {
        self.pattern
            .as_ref()
            .map_or(true, |re| re.is_match(path.trim_start_matches('/')))
    }

    /// Candidates left after the rule's exclusions
    pub fn apply<'a>(&self, candidates: &'a [ArtifactStore]) -> Cow<'a, [ArtifactStore]> {
        retain(candidates, |store| {
            !self.rule.exclude_types.contains(&store.store_type()) && !self.rule.exclude_stores.contains(&store.key)
        })
    }
}

impl RepositoryFilter for RuleFilter {
    fn name(&self) -> &str {
        &self.rule.name
    }

    fn priority(&self) -> i32 {
        self.rule.priority
    }

    fn can_process(&self, path: &str, _group: &StoreKey) -> bool {
        self.matches(path)
    }

    fn filter<'a>(&self, _path: &str, _group: &StoreKey, candidates: &'a [ArtifactStore]) -> Cow<'a, [ArtifactStore]> {
        if self.rule.first_match_only {
            return Cow::Borrowed(candidates);
        }
        self.apply(candidates)
    }

    fn filter_for_first_match<'a>(
        &self,
        _path: &str,
        _group: &StoreKey,
        candidates: &'a [ArtifactStore],
    ) -> Cow<'a, [ArtifactStore]> {
        self.apply(candidates)
    }
}

/// Load every `*.toml` rule in `dir`, in file name order.
///
/// A missing directory yields no rules; an unparsable rule is an error.
pub async fn load_rule_filters(dir: &Path) -> DepotResult<Vec<RuleFilter>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Rule directory {} does not exist", dir.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(DepotError::io(format!("reading rule directory {}", dir.display()), e)),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| DepotError::io(format!("reading rule directory {}", dir.display()), e))?
    {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "toml") && path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let mut rules = Vec::with_capacity(files.len());
    for path in files {
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| DepotError::io(format!("reading rule {}", path.display()), e))?;
        let rule = RuleFilter::parse(&content, &path)?;
        debug!("Loaded rule {} from {}", rule.name(), path.display());
        rules.push(rule);
    }

    info!("Loaded {} filter rule(s) from {}", rules.len(), dir.display());
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const INTERNAL_ONLY: &str = r#"
name = "internal-only"
priority = 50
path_pattern = "^com/example/.*"
exclude_types = ["remote"]
"#;

    fn group() -> StoreKey {
        StoreKey::parse("maven:group:public").unwrap()
    }

    fn stores() -> Vec<ArtifactStore> {
        vec![
            ArtifactStore::hosted("maven", "local").unwrap(),
            ArtifactStore::remote("maven", "central", "https://repo.example.org").unwrap(),
        ]
    }

    #[test]
    fn parse_and_apply() {
        let rule = RuleFilter::parse(INTERNAL_ONLY, Path::new("internal.toml")).unwrap();
        assert_eq!(rule.name(), "internal-only");
        assert_eq!(rule.priority(), 50);

        assert!(rule.can_process("com/example/x.jar", &group()));
        assert!(!rule.can_process("org/other/x.jar", &group()));

        let stores = stores();
        let narrowed = rule.filter("com/example/x.jar", &group(), &stores);
        assert_eq!(narrowed.len(), 1);
        assert_eq!(narrowed[0].key.name(), "local");
    }

    #[test]
    fn exclude_specific_store() {
        let rule = RuleFilter::parse(
            "name = \"no-central\"\nexclude_stores = [\"maven:remote:central\"]\n",
            Path::new("no-central.toml"),
        )
        .unwrap();
        assert!(rule.matches("anything"));

        let stores = stores();
        let narrowed = rule.apply(&stores);
        assert_eq!(narrowed.len(), 1);
        assert_eq!(narrowed[0].key.name(), "local");
    }

    #[test]
    fn first_match_only_leaves_full_lookups_alone() {
        let rule = RuleFilter::parse(
            "name = \"fm\"\nexclude_types = [\"hosted\"]\nfirst_match_only = true\n",
            Path::new("fm.toml"),
        )
        .unwrap();
        let stores = stores();

        assert!(matches!(rule.filter("x", &group(), &stores), Cow::Borrowed(_)));
        assert_eq!(rule.filter_for_first_match("x", &group(), &stores).len(), 1);
    }

    #[test]
    fn bad_pattern_is_rule_error() {
        let err = RuleFilter::parse("name = \"bad\"\npath_pattern = \"(\"\n", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, DepotError::RuleInvalid { .. }));
    }

    #[tokio::test]
    async fn load_from_directory() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("b.toml"), INTERNAL_ONLY).unwrap();
        std::fs::write(temp.path().join("a.toml"), "name = \"first\"\n").unwrap();
        std::fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

        let rules = load_rule_filters(temp.path()).await.unwrap();
        let names: Vec<&str> = rules.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["first", "internal-only"]);
    }

    #[tokio::test]
    async fn missing_directory_has_no_rules() {
        let temp = TempDir::new().unwrap();
        let rules = load_rule_filters(&temp.path().join("absent")).await.unwrap();
        assert!(rules.is_empty());
    }

    #[tokio::test]
    async fn invalid_rule_fails_load() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("broken.toml"), "priority = \"high\"").unwrap();
        assert!(load_rule_filters(temp.path()).await.is_err());
    }
}
