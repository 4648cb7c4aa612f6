//! Rule registry: which rule owns a source file, and with which params.
//!
//! Rules are kept in registration order and resolution is first-match-wins.
//! Patterns run against a normalized relative path: lower-cased, with
//! apostrophes and whitespace removed.
//!
//! ```text
//! "Posts/Hello World.md" ──normalize──► "posts/helloworld.md"
//!                                            │
//!          ^posts/(?<slug>[a-z-]+)\.md$ ─────┘──► {slug: "helloworld"}
//! ```

mod format;
mod hooks;

pub use format::format_path;
pub use hooks::{EntryHooks, Identity};

use crate::config::normalize_path;
use crate::parser::Metadata;
use crate::pipeline::PipelineError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    fmt,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

// ============================================================================
// Publication target
// ============================================================================

/// Where a rule's entries are published.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Publish {
    /// Artifacts only.
    None,
    /// Site index only.
    #[serde(rename = "site")]
    SiteOnly,
    /// Per-rule collection only.
    #[serde(rename = "collection")]
    CollectionOnly,
    /// Site index and collection (default).
    #[default]
    Both,
}

impl Publish {
    pub const fn publishes_site(self) -> bool {
        matches!(self, Self::SiteOnly | Self::Both)
    }

    pub const fn publishes_collection(self) -> bool {
        matches!(self, Self::CollectionOnly | Self::Both)
    }
}

// ============================================================================
// Rule
// ============================================================================

/// Unvalidated rule declaration, fed to [`RuleRegistry::add_rule`].
#[derive(Clone, Default)]
pub struct RuleSpec {
    pub name: Option<String>,
    pub pattern: Option<String>,
    pub output: Option<String>,
    pub source: Option<PathBuf>,
    pub target: Option<PathBuf>,
    pub publish: Publish,
    pub hooks: Option<Arc<dyn EntryHooks>>,
}

impl RuleSpec {
    pub fn new(name: &str, pattern: &str, output: &str) -> Self {
        Self {
            name: Some(name.to_owned()),
            pattern: Some(pattern.to_owned()),
            output: Some(output.to_owned()),
            ..Self::default()
        }
    }

    pub fn source(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source = Some(dir.into());
        self
    }

    pub fn target(mut self, dir: impl Into<PathBuf>) -> Self {
        self.target = Some(dir.into());
        self
    }

    pub const fn publish(mut self, publish: Publish) -> Self {
        self.publish = publish;
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn EntryHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }
}

/// A validated rule with its compiled pattern and resolved directories.
pub struct Rule {
    pub name: String,
    pub pattern: Regex,
    pub output: String,
    pub source: PathBuf,
    pub target: PathBuf,
    pub publish: Publish,
    pub hooks: Arc<dyn EntryHooks>,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .field("output", &self.output)
            .field("source", &self.source)
            .field("target", &self.target)
            .field("publish", &self.publish)
            .finish_non_exhaustive()
    }
}

impl Rule {
    /// Named capture groups for a relative path.
    ///
    /// `None` means the pattern does not match; a match without named
    /// groups yields an empty map. Groups that did not participate are absent.
    pub fn extract_params(&self, relative: &str) -> Option<Metadata> {
        let normalized = normalize(relative);
        let caps = self.pattern.captures(&normalized)?;
        let params = self
            .pattern
            .capture_names()
            .flatten()
            .filter_map(|name| {
                caps.name(name)
                    .map(|m| (name.to_owned(), Value::String(m.as_str().to_owned())))
            })
            .collect();
        Some(params)
    }

    pub fn matches(&self, relative: &str) -> bool {
        self.pattern.is_match(&normalize(relative))
    }
}

/// Lower-case and strip apostrophes and whitespace before matching.
fn normalize(relative: &str) -> String {
    relative
        .chars()
        .filter(|c| *c != '\'' && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// `/`-separated form of a relative path, independent of the host separator.
pub fn relative_key(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

// ============================================================================
// Registry
// ============================================================================

/// A rule that owns an absolute source path.
#[derive(Debug)]
pub struct Resolved<'a> {
    pub rule: &'a Rule,
    /// Path relative to the rule's source dir, `/`-separated.
    pub relative: String,
    pub params: Metadata,
}

/// Ordered rule collection.
#[derive(Debug)]
pub struct RuleRegistry {
    rules: Vec<Rule>,
    default_source: PathBuf,
    default_target: PathBuf,
}

impl RuleRegistry {
    /// Default directories are made absolute (and canonical when they exist)
    /// so store keys match the paths `resolve_path` is given later.
    pub fn new(default_source: impl Into<PathBuf>, default_target: impl Into<PathBuf>) -> Self {
        Self {
            rules: Vec::new(),
            default_source: normalize_path(&default_source.into()),
            default_target: normalize_path(&default_target.into()),
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    /// Validate, compile and append a rule.
    pub fn add_rule(&mut self, spec: RuleSpec) -> Result<&Rule, PipelineError> {
        let name = required(spec.name, "name")?;
        let pattern = required(spec.pattern, "pattern")?;
        let output = required(spec.output, "output")?;

        let pattern = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| PipelineError::InvalidPattern {
                rule: name.clone(),
                source,
            })?;

        self.rules.push(Rule {
            name,
            pattern,
            output,
            source: spec
                .source
                .map_or_else(|| self.default_source.clone(), |dir| normalize_path(&dir)),
            target: spec
                .target
                .map_or_else(|| self.default_target.clone(), |dir| normalize_path(&dir)),
            publish: spec.publish,
            hooks: spec.hooks.unwrap_or_else(|| Arc::new(Identity)),
        });
        Ok(&self.rules[self.rules.len() - 1])
    }

    /// First rule, in registration order, whose pattern matches.
    pub fn resolve_rule(&self, relative: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.matches(relative))
    }

    /// Every rule whose pattern matches, in registration order.
    pub fn matching_rules<'a>(&'a self, relative: &'a str) -> impl Iterator<Item = &'a Rule> {
        self.rules.iter().filter(move |rule| rule.matches(relative))
    }

    /// Owner of an absolute path: the first rule whose source dir contains
    /// it and whose pattern matches the path relative to that dir.
    pub fn resolve_path(&self, path: &Path) -> Option<Resolved<'_>> {
        self.rules.iter().find_map(|rule| {
            let relative = relative_key(path.strip_prefix(&rule.source).ok()?);
            let params = rule.extract_params(&relative)?;
            Some(Resolved {
                rule,
                relative,
                params,
            })
        })
    }

    /// Distinct source directories, in first-use order.
    pub fn source_dirs(&self) -> Vec<&Path> {
        let mut dirs: Vec<&Path> = Vec::new();
        for rule in &self.rules {
            if !dirs.contains(&rule.source.as_path()) {
                dirs.push(&rule.source);
            }
        }
        dirs
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, PipelineError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(PipelineError::MissingField(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Content;

    fn registry() -> RuleRegistry {
        RuleRegistry::new("/site/content", "/site/public")
    }

    #[test]
    fn test_add_rule_defaults() {
        let mut reg = registry();
        let rule = reg
            .add_rule(RuleSpec::new("posts", r"^posts/(?<slug>[a-z-]+)\.md$", "posts/:slug"))
            .unwrap();
        assert_eq!(rule.source, PathBuf::from("/site/content"));
        assert_eq!(rule.target, PathBuf::from("/site/public"));
        assert_eq!(rule.publish, Publish::Both);
    }

    #[test]
    fn test_add_rule_overrides() {
        let mut reg = registry();
        let rule = reg
            .add_rule(
                RuleSpec::new("docs", r"\.md$", "docs")
                    .source("/docs")
                    .target("/out")
                    .publish(Publish::SiteOnly),
            )
            .unwrap();
        assert_eq!(rule.source, PathBuf::from("/docs"));
        assert_eq!(rule.target, PathBuf::from("/out"));
        assert!(rule.publish.publishes_site());
        assert!(!rule.publish.publishes_collection());
    }

    #[test]
    fn test_add_rule_missing_fields() {
        let mut reg = registry();
        let missing_name = RuleSpec {
            name: None,
            ..RuleSpec::new("x", "x", "x")
        };
        assert!(matches!(
            reg.add_rule(missing_name),
            Err(PipelineError::MissingField("name"))
        ));

        let blank_output = RuleSpec::new("x", "x", "  ");
        assert!(matches!(
            reg.add_rule(blank_output),
            Err(PipelineError::MissingField("output"))
        ));

        let missing_pattern = RuleSpec {
            pattern: None,
            ..RuleSpec::new("x", "x", "x")
        };
        let err = reg.add_rule(missing_pattern).unwrap_err();
        assert!(err.is_fatal());
        assert!(reg.rules().is_empty());
    }

    #[test]
    fn test_add_rule_invalid_pattern() {
        let err = registry()
            .add_rule(RuleSpec::new("bad", "(unclosed", "x"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidPattern { ref rule, .. } if rule == "bad"));
    }

    #[test]
    fn test_extract_params_normalizes() {
        let mut reg = registry();
        let rule = reg
            .add_rule(RuleSpec::new("posts", r"^posts/(?<slug>[a-z-]+)\.md$", "posts/:slug"))
            .unwrap();
        let params = rule.extract_params("Posts/Don't Panic.MD").unwrap();
        assert_eq!(params["slug"], "dontpanic");
    }

    #[test]
    fn test_extract_params_none_vs_empty() {
        let mut reg = registry();
        let rule = reg.add_rule(RuleSpec::new("all", r"\.yml$", "data")).unwrap();
        assert_eq!(rule.extract_params("a.yml"), Some(Metadata::new()));
        assert_eq!(rule.extract_params("a.md"), None);
    }

    #[test]
    fn test_extract_params_optional_group_absent() {
        let mut reg = registry();
        let rule = reg
            .add_rule(RuleSpec::new(
                "posts",
                r"^posts/(?:(?<year>\d{4})/)?(?<slug>[a-z-]+)\.md$",
                "posts/:year/:slug",
            ))
            .unwrap();
        let params = rule.extract_params("posts/hello.md").unwrap();
        assert!(!params.contains_key("year"));
        assert_eq!(params["slug"], "hello");
    }

    #[test]
    fn test_resolve_rule_first_match_wins() {
        let mut reg = registry();
        reg.add_rule(RuleSpec::new("reports", r"^reports/[a-z0-9]+\.yml$", "reports"))
            .unwrap();
        reg.add_rule(RuleSpec::new("data", r"\.yml$", "data")).unwrap();

        assert_eq!(reg.resolve_rule("reports/q1.yml").unwrap().name, "reports");
        assert_eq!(reg.resolve_rule("other/x.yml").unwrap().name, "data");
        assert!(reg.resolve_rule("posts/a.md").is_none());

        let all: Vec<_> = reg.matching_rules("reports/q1.yml").map(|r| r.name.as_str()).collect();
        assert_eq!(all, ["reports", "data"]);
    }

    #[test]
    fn test_resolve_path_respects_source_dir() {
        let mut reg = registry();
        reg.add_rule(RuleSpec::new("docs", r"^(?<slug>[a-z]+)\.md$", "docs/:slug").source("/site/docs"))
            .unwrap();
        reg.add_rule(RuleSpec::new("pages", r"^(?<slug>[a-z]+)\.md$", ":slug"))
            .unwrap();

        let resolved = reg.resolve_path(Path::new("/site/content/about.md")).unwrap();
        assert_eq!(resolved.rule.name, "pages");
        assert_eq!(resolved.relative, "about.md");

        let resolved = reg.resolve_path(Path::new("/site/docs/intro.md")).unwrap();
        assert_eq!(resolved.rule.name, "docs");
        assert_eq!(resolved.params["slug"], "intro");

        assert!(reg.resolve_path(Path::new("/elsewhere/x.md")).is_none());
        assert_eq!(
            reg.source_dirs(),
            [Path::new("/site/docs"), Path::new("/site/content")]
        );
    }

    #[test]
    fn test_directories_made_absolute() {
        let mut reg = RuleRegistry::new("content", "public");
        let rule = reg
            .add_rule(RuleSpec::new("docs", r"\.md$", "docs").source("docs"))
            .unwrap();
        assert!(rule.source.is_absolute());
        assert!(rule.source.ends_with("docs"));
        assert!(rule.target.is_absolute());
        assert!(rule.target.ends_with("public"));
    }

    #[cfg(unix)]
    #[test]
    fn test_directories_resolve_symlinks() {
        let dir = tempfile::TempDir::new().unwrap();
        let real = dir.path().join("real");
        std::fs::create_dir(&real).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let mut reg = RuleRegistry::new(&link, &link);
        let rule = reg.add_rule(RuleSpec::new("all", r"\.md$", "x")).unwrap();
        assert_eq!(rule.source, real.canonicalize().unwrap());
    }

    #[test]
    fn test_relative_key() {
        assert_eq!(relative_key(Path::new("posts/2024/a.md")), "posts/2024/a.md");
        assert_eq!(relative_key(Path::new("./a.md")), "a.md");
    }

    #[test]
    fn test_custom_hooks_installed() {
        struct Upper;
        impl EntryHooks for Upper {
            fn transform_content(&self, content: Content) -> Content {
                match content {
                    Content::Text(text) => Content::Text(text.to_uppercase()),
                    other => other,
                }
            }
        }

        let mut reg = registry();
        let rule = reg
            .add_rule(RuleSpec::new("p", "x", "x").hooks(Arc::new(Upper)))
            .unwrap();
        assert_eq!(
            rule.hooks.transform_content(Content::Text("a".into())),
            Content::Text("A".into())
        );
    }
}
