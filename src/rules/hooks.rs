//! Per-rule transform hooks.

use crate::parser::{Content, Metadata};

/// Transforms applied to every entry a rule publishes.
///
/// Both methods default to identity; implement only the one you need.
pub trait EntryHooks {
    /// Runs after route params are merged into the parsed metadata, before
    /// the output path is formatted.
    fn transform_metadata(&self, metadata: Metadata) -> Metadata {
        metadata
    }

    /// Runs on the parsed content just before it is written.
    fn transform_content(&self, content: Content) -> Content {
        content
    }
}

/// The no-op hooks every rule gets unless it installs its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl EntryHooks for Identity {}
