//! `[[rules]]` array configuration.
//!
//! Each entry declares one routing rule. Mandatory fields are kept optional
//! here so that `RuleRegistry::add_rule` reports missing ones with the same
//! error as programmatic registration.

use crate::rules::{Publish, RuleSpec};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One `[[rules]]` entry in content.toml.
///
/// # Example
/// ```toml
/// [[rules]]
/// name = "posts"
/// pattern = '^posts/(?<slug>[a-z-]+)\.md$'
/// output = "posts/:slug"
/// publish = "both"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    /// Rule name, also the collection file name.
    pub name: Option<String>,

    /// Case-insensitive regex over the normalized relative path.
    pub pattern: Option<String>,

    /// Output path template with `:param` placeholders.
    pub output: Option<String>,

    /// Source directory override.
    pub source: Option<PathBuf>,

    /// Target directory override.
    pub target: Option<PathBuf>,

    /// Where matched entries are published.
    #[serde(default)]
    pub publish: Publish,
}

impl RuleConfig {
    /// Convert into a registry spec; unset directories inherit pipeline defaults.
    pub fn to_spec(&self) -> RuleSpec {
        let mut spec = RuleSpec::default().publish(self.publish);
        spec.name = self.name.clone();
        spec.pattern = self.pattern.clone();
        spec.output = self.output.clone();
        spec.source = self.source.clone();
        spec.target = self.target.clone();
        spec
    }
}
