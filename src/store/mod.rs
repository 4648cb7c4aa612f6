//! Index store: the in-memory source of truth for published entries.
//!
//! Two views are kept, both keyed by absolute source path:
//!
//! - **site index**: every entry of rules that publish to the site, with
//!   content stripped to keep it small
//! - **collections**: one map per rule name, with content
//!
//! `BTreeMap` keys make persisted output independent of processing order,
//! so a single incremental update yields the same files a full rebuild of
//! the same snapshot would.

mod persist;

pub use persist::{artifact_path, remove_artifact, write_bytes, write_json};

use crate::parser::{Content, Metadata};
use crate::pipeline::PipelineError;
use crate::rules::Publish;
use serde::Serialize;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

/// Published form of a processed file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexEntry {
    /// Owning rule name.
    pub name: String,
    /// Formatted output path, relative to the rule's target.
    pub path: String,
    pub data: Metadata,
    /// Omitted from JSON when the parser produced no body (YAML data).
    #[serde(skip_serializing_if = "Content::is_empty")]
    pub content: Content,
}

impl IndexEntry {
    fn without_content(&self) -> Self {
        Self {
            name: self.name.clone(),
            path: self.path.clone(),
            data: self.data.clone(),
            content: Content::Empty,
        }
    }
}

#[derive(Debug, Default)]
pub struct IndexStore {
    site: BTreeMap<PathBuf, IndexEntry>,
    collections: BTreeMap<String, BTreeMap<PathBuf, IndexEntry>>,
}

impl IndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all entries (start of a full build).
    pub fn clear(&mut self) {
        self.site.clear();
        self.collections.clear();
    }

    /// Make sure a collection exists so it is persisted even when empty.
    pub fn ensure_collection(&mut self, name: &str) {
        self.collections.entry(name.to_owned()).or_default();
    }

    /// Insert or replace the entry for `source` according to `publish`.
    ///
    /// Returns the output path the source had before, if it was indexed.
    pub fn insert(&mut self, source: &Path, entry: IndexEntry, publish: Publish) -> Option<String> {
        let mut previous = None;
        if publish.publishes_site() {
            previous = self
                .site
                .insert(source.to_path_buf(), entry.without_content())
                .map(|old| old.path);
        }
        if publish.publishes_collection() {
            let collection = self.collections.entry(entry.name.clone()).or_default();
            if let Some(old) = collection.insert(source.to_path_buf(), entry) {
                previous = Some(old.path);
            }
        }
        previous
    }

    /// Remove `source` from the site index and every collection.
    ///
    /// Returns the removed entry, if any view held one.
    pub fn retract(&mut self, source: &Path) -> Option<IndexEntry> {
        let mut removed = self.site.remove(source);
        for collection in self.collections.values_mut() {
            if let Some(entry) = collection.remove(source) {
                removed = Some(entry);
            }
        }
        removed
    }

    pub fn contains(&self, source: &Path) -> bool {
        self.site.contains_key(source)
            || self.collections.values().any(|c| c.contains_key(source))
    }

    pub fn site_entry(&self, source: &Path) -> Option<&IndexEntry> {
        self.site.get(source)
    }

    pub fn site_len(&self) -> usize {
        self.site.len()
    }

    pub fn collection(&self, name: &str) -> Option<&BTreeMap<PathBuf, IndexEntry>> {
        self.collections.get(name)
    }

    /// Write `<dir>/index.json`.
    pub fn persist_site(&self, dir: &Path) -> Result<PathBuf, PipelineError> {
        persist::write_index(dir, "index", self.site.values())
    }

    /// Write `<dir>/<name>.json` for one collection (empty if unknown).
    pub fn persist_collection(&self, dir: &Path, name: &str) -> Result<PathBuf, PipelineError> {
        let entries = self.collections.get(name).into_iter().flat_map(BTreeMap::values);
        persist::write_index(dir, name, entries)
    }
}
