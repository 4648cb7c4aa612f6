//! Pipeline configuration management for `content.toml`.
//!
//! # Sections
//!
//! | Section      | Purpose                                         |
//! |--------------|-------------------------------------------------|
//! | `[content]`  | Default source/target dirs, index dir, file types |
//! | `[watch]`    | Debounce window for watch mode                  |
//! | `[[rules]]`  | Ordered routing rules (first match wins)        |
//!
//! # Example
//!
//! ```toml
//! [content]
//! source = "content"
//! target = "public"
//! index = "api"
//!
//! [watch]
//! debounce_ms = 100
//!
//! [[rules]]
//! name = "posts"
//! pattern = '^posts/(?<slug>[a-z-]+)\.md$'
//! output = "posts/:slug"
//! ```

pub mod defaults;
mod error;
mod rules;

pub use error::ConfigError;
pub use rules::RuleConfig;

use crate::cli::{Cli, Commands};
use anyhow::{Result, bail};
use educe::Educe;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

// ============================================================================
// Sections
// ============================================================================

/// `[content]` section - directories and discovery settings.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct ContentConfig {
    /// Project root directory (usually set via CLI `--root`).
    #[serde(default = "defaults::content::root")]
    #[educe(Default = defaults::content::root())]
    pub root: Option<PathBuf>,

    /// Default source directory for rules without their own.
    #[serde(default = "defaults::content::source")]
    #[educe(Default = defaults::content::source())]
    pub source: PathBuf,

    /// Default target directory for rules without their own.
    #[serde(default = "defaults::content::target")]
    #[educe(Default = defaults::content::target())]
    pub target: PathBuf,

    /// Directory of persisted index files, relative to `target`.
    #[serde(default = "defaults::content::index")]
    #[educe(Default = defaults::content::index())]
    pub index: PathBuf,

    /// File suffixes picked up by discovery.
    #[serde(default = "defaults::content::file_types")]
    #[educe(Default = defaults::content::file_types())]
    pub file_types: Vec<String>,
}

/// `[watch]` section - debounce settings.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    /// Quiet period a path must see before it is reprocessed.
    #[serde(default = "defaults::watch::debounce_ms")]
    #[educe(Default = defaults::watch::debounce_ms())]
    pub debounce_ms: u64,
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing content.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub content: ContentConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

impl PipelineConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        let mut config = Self::from_str(&content)?;
        config.config_path = normalize_path(path);
        Ok(config)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.content.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Directory holding `index.json` and the per-rule collection files.
    pub fn index_dir(&self) -> PathBuf {
        self.content.target.join(&self.content.index)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.watch.debounce_ms)
    }

    /// Update configuration with CLI arguments and resolve every path
    /// against the root directory.
    pub fn update_with_cli(&mut self, cli: &Cli) {
        let root = cli
            .root
            .clone()
            .unwrap_or_else(|| self.get_root().to_owned());
        if let Some(source) = &cli.source {
            self.content.source = source.clone();
        }
        if let Some(target) = &cli.target {
            self.content.target = target.clone();
        }
        if let Commands::Watch { debounce: Some(ms) } = cli.command {
            self.watch.debounce_ms = ms;
        }
        self.resolve_paths(&root);
    }

    /// Make every configured directory absolute relative to `root`.
    pub fn resolve_paths(&mut self, root: &Path) {
        let root = normalize_path(root);
        self.content.root = Some(root.clone());

        self.content.source = normalize_path(&root.join(&self.content.source));
        self.content.target = normalize_path(&root.join(&self.content.target));

        for rule in &mut self.rules {
            if let Some(source) = rule.source.as_mut() {
                *source = normalize_path(&root.join(&*source));
            }
            if let Some(target) = rule.target.as_mut() {
                *target = normalize_path(&root.join(&*target));
            }
        }
    }

    /// Validate configuration before a build.
    pub fn validate(&self) -> Result<()> {
        if self.content.file_types.is_empty() {
            bail!(ConfigError::Validation(
                "[content.file_types] must have at least one element".into()
            ));
        }

        if self.watch.debounce_ms == 0 {
            bail!(ConfigError::Validation(
                "[watch.debounce_ms] must be greater than 0".into()
            ));
        }

        if self.rules.is_empty() {
            bail!(ConfigError::Validation(
                "at least one [[rules]] entry is required".into()
            ));
        }

        let mut seen = FxHashSet::default();
        for name in self.rules.iter().filter_map(|r| r.name.as_deref()) {
            // Rule names become `<index>/<name>.json`
            if !is_file_safe(name) {
                bail!(ConfigError::Validation(format!(
                    "rule name `{name}` may only contain letters, digits, `-` and `_`"
                )));
            }
            if name == "index" {
                bail!(ConfigError::Validation(
                    "rule name `index` is reserved for the site index".into()
                ));
            }
            if !seen.insert(name) {
                bail!(ConfigError::DuplicateRule(name.to_owned()));
            }
        }

        if !self.content.source.is_dir() {
            bail!(ConfigError::Validation(format!(
                "[content.source] `{}` is not a directory",
                self.content.source.display()
            )));
        }

        Ok(())
    }
}

fn is_file_safe(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Normalize a path to absolute, using canonicalize if the path exists
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"
        [[rules]]
        name = "posts"
        pattern = '^posts/(?<slug>[a-z-]+)\.md$'
        output = "posts/:slug"
    "#;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.content.source, PathBuf::from("content"));
        assert_eq!(config.content.target, PathBuf::from("public"));
        assert_eq!(config.content.index, PathBuf::from("api"));
        assert_eq!(
            config.content.file_types,
            ["md", "yml", "html", "pdf", "svg", "png", "jpg"]
        );
        assert_eq!(config.watch.debounce_ms, 100);
        assert!(config.rules.is_empty());
    }

    #[test]
    fn test_from_str_sections() {
        let config = PipelineConfig::from_str(
            r#"
            [content]
            source = "src"
            target = "dist"
            file_types = ["md"]

            [watch]
            debounce_ms = 250
        "#,
        )
        .unwrap();

        assert_eq!(config.content.source, PathBuf::from("src"));
        assert_eq!(config.content.target, PathBuf::from("dist"));
        assert_eq!(config.content.file_types, ["md"]);
        assert_eq!(config.debounce(), Duration::from_millis(250));
    }

    #[test]
    fn test_from_str_invalid_toml() {
        assert!(PipelineConfig::from_str("[content").is_err());
    }

    #[test]
    fn test_unknown_section_rejection() {
        assert!(PipelineConfig::from_str("[serve]\nport = 1").is_err());
    }

    #[test]
    fn test_resolve_paths_against_root() {
        let dir = TempDir::new().unwrap();
        let mut config = PipelineConfig::from_str(
            r#"
            [[rules]]
            name = "docs"
            pattern = '^(?<slug>.+)\.md$'
            output = ":slug"
            source = "docs"
        "#,
        )
        .unwrap();
        config.resolve_paths(dir.path());

        let root = normalize_path(dir.path());
        assert_eq!(config.content.source, root.join("content"));
        assert_eq!(config.index_dir(), root.join("public").join("api"));
        assert_eq!(config.rules[0].source.as_deref(), Some(root.join("docs").as_path()));
        assert!(config.rules[0].target.is_none());
    }

    #[test]
    fn test_validate_ok() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("content")).unwrap();
        let mut config = PipelineConfig::from_str(MINIMAL).unwrap();
        config.resolve_paths(dir.path());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_missing_source() {
        let dir = TempDir::new().unwrap();
        let mut config = PipelineConfig::from_str(MINIMAL).unwrap();
        config.resolve_paths(dir.path());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("[content.source]"));
    }

    #[test]
    fn test_validate_duplicate_rule() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("content")).unwrap();
        let mut config = PipelineConfig::from_str(&format!("{MINIMAL}{MINIMAL}")).unwrap();
        config.resolve_paths(dir.path());
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::DuplicateRule(name)) if name == "posts"
        ));
    }

    #[test]
    fn test_validate_rule_names() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("content")).unwrap();
        for bad in ["index", "../posts", "my posts"] {
            let toml = MINIMAL.replace("\"posts\"", &format!("{bad:?}"));
            let mut config = PipelineConfig::from_str(&toml).unwrap();
            config.resolve_paths(dir.path());
            assert!(config.validate().is_err(), "`{bad}` should be rejected");
        }
    }

    #[test]
    fn test_validate_zero_debounce() {
        let mut config = PipelineConfig::from_str(MINIMAL).unwrap();
        config.watch.debounce_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_path_sets_config_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("content.toml");
        fs::write(&path, MINIMAL).unwrap();
        let config = PipelineConfig::from_path(&path).unwrap();
        assert_eq!(config.config_path, normalize_path(&path));
        assert_eq!(config.rules.len(), 1);
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = PipelineConfig::from_path(Path::new("/nonexistent/content.toml")).unwrap_err();
        assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::Io(..))));
    }
}
