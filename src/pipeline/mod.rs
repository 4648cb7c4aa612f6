//! Pipeline orchestrator.
//!
//! Ties discovery, rule resolution, parsing, the index store and artifact
//! writing together.
//!
//! ```text
//! build():        clear store ─► discover per source dir ─► for each rule:
//!                   process_files(Build) ─► persist collection
//!                 ─► persist site index
//!
//! incremental():  resolve owner ─► process_files(Incremental, [path])
//!                 ─► persist site index
//! ```
//!
//! A file is only ever processed by its owner: the first rule, in
//! registration order, whose source dir contains it and whose pattern
//! matches it.

mod discover;
mod error;

pub use discover::{FileFilter, discover};
pub use error::PipelineError;

use crate::config::{PipelineConfig, defaults, normalize_path};
use crate::log;
use crate::logger::{StatusLine, WatchStatus};
use crate::parser::{Content, ParserRegistry};
use crate::rules::{Rule, RuleRegistry, RuleSpec, format_path, relative_key};
use crate::store::{self, IndexEntry, IndexStore};
use crate::watch;
use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use std::{
    error::Error as _,
    path::{Path, PathBuf},
    ptr,
    time::{Duration, Instant},
};

/// How `process_files` treats files it cannot publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Full build: unreadable or unmatched files are skipped.
    Build,
    /// Single-path update: unreadable or unmatched files are retracted.
    Incremental,
}

/// Counters for one `build()` / `incremental()` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub processed: usize,
    pub retracted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl BuildReport {
    fn absorb(&mut self, other: Self) {
        self.processed += other.processed;
        self.retracted += other.retracted;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }

    /// Whether the store changed.
    pub const fn touched(&self) -> bool {
        self.processed + self.retracted + self.failed > 0
    }
}

enum Outcome {
    Written(String),
    Retracted,
    Skipped,
    Failed,
}

pub struct Pipeline {
    registry: RuleRegistry,
    parsers: ParserRegistry,
    store: IndexStore,
    filter: FileFilter,
    index_dir: PathBuf,
}

impl Pipeline {
    /// Empty pipeline with default parsers and the index under `target/api`.
    pub fn new(
        source: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
        file_types: &[String],
    ) -> Result<Self> {
        let target = normalize_path(&target.into());
        let filter = FileFilter::new(file_types).context("Invalid file types")?;
        Ok(Self {
            index_dir: target.join(defaults::content::index()),
            registry: RuleRegistry::new(source, target),
            parsers: ParserRegistry::default(),
            store: IndexStore::new(),
            filter,
        })
    }

    /// Build a pipeline from a loaded, path-resolved config.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let mut pipeline = Self::new(
            &config.content.source,
            &config.content.target,
            &config.content.file_types,
        )?
        .with_index_dir(config.index_dir());

        for rule in &config.rules {
            pipeline
                .add_rule(rule.to_spec())
                .with_context(|| format!("Invalid rule `{}`", rule.name.as_deref().unwrap_or("?")))?;
        }
        Ok(pipeline)
    }

    pub fn with_index_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.index_dir = dir.into();
        self
    }

    pub fn add_rule(&mut self, spec: RuleSpec) -> Result<&Rule, PipelineError> {
        self.registry.add_rule(spec)
    }

    pub const fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub const fn parsers_mut(&mut self) -> &mut ParserRegistry {
        &mut self.parsers
    }

    pub const fn store(&self) -> &IndexStore {
        &self.store
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    // ------------------------------------------------------------------------
    // Full build
    // ------------------------------------------------------------------------

    /// Rebuild every index and artifact from scratch.
    pub fn build(&mut self) -> Result<BuildReport> {
        let started = Instant::now();
        self.store.clear();

        let mut discovered: FxHashMap<PathBuf, Vec<PathBuf>> = FxHashMap::default();
        for dir in self.registry.source_dirs() {
            if !dir.is_dir() {
                log!("warn"; "source directory `{}` does not exist", dir.display());
            }
            discovered.insert(dir.to_path_buf(), discover(dir, &self.filter));
        }

        let mut report = BuildReport::default();
        for idx in 0..self.registry.rules().len() {
            let rule = &self.registry.rules()[idx];
            let name = rule.name.clone();
            if rule.publish.publishes_collection() {
                self.store.ensure_collection(&name);
            }
            let files = discovered.get(&rule.source).map_or(&[][..], Vec::as_slice);

            let rule_report = self
                .process_files(idx, files, Mode::Build)
                .with_context(|| format!("Rule `{name}` failed"))?;
            report.absorb(rule_report);
        }

        let index = self.store.persist_site(&self.index_dir)?;
        report.elapsed = started.elapsed();

        log!(
            "build";
            "{} files in {:.2?}, {} entries in `{}`",
            report.processed,
            report.elapsed,
            self.store.site_len(),
            index.display()
        );
        if report.failed > 0 {
            log!("warn"; "{} artifacts could not be written", report.failed);
        }
        Ok(report)
    }

    /// Run the rule at index `rule` over `files`, then persist its collection.
    ///
    /// Each file is matched against the rule itself, so the full candidate
    /// list of a source dir may be passed in. Configuration errors abort;
    /// per-file failures are logged and counted.
    pub fn process_files(
        &mut self,
        rule: usize,
        files: &[PathBuf],
        mode: Mode,
    ) -> Result<BuildReport, PipelineError> {
        let started = Instant::now();
        let mut report = BuildReport::default();
        let Self {
            registry,
            parsers,
            store,
            index_dir,
            ..
        } = self;
        let Some(rule) = registry.rules().get(rule) else {
            return Ok(report);
        };

        let status = (mode == Mode::Build).then(|| StatusLine::new("parse"));
        for path in files {
            match process_file(registry, parsers, store, rule, path, mode)? {
                Outcome::Written(output) => {
                    report.processed += 1;
                    if let Some(status) = &status {
                        status.update(&output);
                    }
                }
                Outcome::Retracted => report.retracted += 1,
                Outcome::Skipped => report.skipped += 1,
                Outcome::Failed => report.failed += 1,
            }
        }
        drop(status);

        if rule.publish.publishes_collection() {
            store.persist_collection(index_dir, &rule.name)?;
        }
        report.elapsed = started.elapsed();
        Ok(report)
    }

    // ------------------------------------------------------------------------
    // Incremental update
    // ------------------------------------------------------------------------

    /// Reprocess a single changed (or deleted) path.
    ///
    /// The persisted indexes end up as a full build of the same snapshot
    /// would leave them.
    pub fn incremental(&mut self, path: &Path) -> Result<BuildReport> {
        let started = Instant::now();
        let path = absolute(path);

        let owner = self.registry.resolve_path(&path).and_then(|resolved| {
            self.filter
                .matches(Path::new(&resolved.relative))
                .then(|| self.registry.rules().iter().position(|r| ptr::eq(r, resolved.rule)))
                .flatten()
        });

        let mut report = match owner {
            Some(idx) => self.process_files(idx, &[path], Mode::Incremental)?,
            None => self.retract_orphan(&path)?,
        };

        if report.touched() {
            self.store.persist_site(&self.index_dir)?;
        }
        report.elapsed = started.elapsed();
        Ok(report)
    }

    /// Drop a stale entry for a path no rule owns any more.
    fn retract_orphan(&mut self, path: &Path) -> Result<BuildReport, PipelineError> {
        let mut report = BuildReport::default();
        let Some(entry) = self.store.retract(path) else {
            return Ok(report);
        };
        if let Some(rule) = self.registry.get(&entry.name) {
            remove_stale(&rule.target, &entry.path);
            if rule.publish.publishes_collection() {
                self.store.persist_collection(&self.index_dir, &rule.name)?;
            }
        }
        report.retracted = 1;
        Ok(report)
    }

    // ------------------------------------------------------------------------
    // Watch
    // ------------------------------------------------------------------------

    /// Watch every existing source dir and run `incremental()` per settled path.
    ///
    /// Returns only on a configuration error or a failed index write.
    pub fn watch(&mut self, window: Duration) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .context("Failed to start watch runtime")?;
        runtime.block_on(self.watch_async(window))
    }

    /// [`Pipeline::watch`] on an already running tokio runtime.
    pub async fn watch_async(&mut self, window: Duration) -> Result<()> {
        let dirs: Vec<PathBuf> = self
            .registry
            .source_dirs()
            .into_iter()
            .filter(|dir| dir.is_dir())
            .map(Path::to_path_buf)
            .collect();

        let mut status = WatchStatus::new();
        watch::watch_debounced(&dirs, window, |path| {
            let report = self.incremental(path)?;
            let shown = path.display();
            if report.failed > 0 {
                status.error(&format!("failed: {shown}"), "artifact could not be written");
            } else if report.retracted > 0 {
                status.success(&format!("removed: {shown}"));
            } else if report.processed > 0 {
                status.success(&format!("updated: {shown}"));
            }
            Ok(())
        })
        .await
    }
}

// ============================================================================
// Per-file processing
// ============================================================================

fn process_file(
    registry: &RuleRegistry,
    parsers: &ParserRegistry,
    store: &mut IndexStore,
    rule: &Rule,
    path: &Path,
    mode: Mode,
) -> Result<Outcome, PipelineError> {
    let params = path
        .strip_prefix(&rule.source)
        .ok()
        .and_then(|relative| rule.extract_params(&relative_key(relative)));
    let Some(params) = params else {
        return Ok(match mode {
            Mode::Build => Outcome::Skipped,
            Mode::Incremental => retract(registry, store, path),
        });
    };

    if mode == Mode::Build {
        match registry.resolve_path(path) {
            Some(owner) if !ptr::eq(owner.rule, rule) => {
                log!(
                    "warn";
                    "`{}` matches rule `{}` but is owned by `{}`",
                    owner.relative,
                    rule.name,
                    owner.rule.name
                );
                return Ok(Outcome::Skipped);
            }
            _ => {}
        }
    }

    let parsed = match parsers.parse(path) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => return Ok(retract(registry, store, path)),
        Err(err) if err.is_fatal() => return Err(err),
        Err(err) => {
            return Ok(match mode {
                Mode::Build => {
                    log!("warn"; "skipped: {}", describe(&err));
                    Outcome::Skipped
                }
                Mode::Incremental => retract(registry, store, path),
            });
        }
    };

    let mut metadata = parsed.metadata;
    metadata.extend(params);
    let metadata = rule.hooks.transform_metadata(metadata);
    let output = format_path(&rule.output, &metadata)?;
    let content = rule.hooks.transform_content(parsed.content);

    let artifact = match store::artifact_path(&rule.target, &output) {
        Ok(artifact) => artifact,
        Err(err) => {
            log!("warn"; "{}", describe(&err));
            return Ok(Outcome::Failed);
        }
    };

    let entry = IndexEntry {
        name: rule.name.clone(),
        path: output.clone(),
        data: metadata,
        content,
    };
    let written = match &entry.content {
        Content::Binary(bytes) => store::write_bytes(&artifact, bytes),
        Content::Text(_) | Content::Empty => store::write_json(&artifact, &entry),
    };

    if let Some(previous) = store.insert(path, entry, rule.publish)
        && previous != output
    {
        remove_stale(&rule.target, &previous);
    }

    match written {
        Ok(()) => Ok(Outcome::Written(output)),
        Err(err) => {
            log!("warn"; "{}", describe(&err));
            Ok(Outcome::Failed)
        }
    }
}

/// Remove `path` from every index and delete its artifact.
fn retract(registry: &RuleRegistry, store: &mut IndexStore, path: &Path) -> Outcome {
    let Some(entry) = store.retract(path) else {
        return Outcome::Skipped;
    };
    if let Some(rule) = registry.get(&entry.name) {
        remove_stale(&rule.target, &entry.path);
    }
    Outcome::Retracted
}

/// Best-effort removal of an artifact that no entry points to any more.
fn remove_stale(target: &Path, output: &str) {
    let Ok(artifact) = store::artifact_path(target, output) else {
        return;
    };
    if let Err(err) = store::remove_artifact(&artifact) {
        log!("warn"; "cannot remove `{}`: {err}", artifact.display());
    }
}

/// Error message including its source chain.
fn describe(err: &PipelineError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Absolute form of a path that may no longer exist.
fn absolute(path: &Path) -> PathBuf {
    if let Ok(path) = path.canonicalize() {
        return path;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => normalize_path(parent).join(name),
        _ => normalize_path(path),
    }
}
