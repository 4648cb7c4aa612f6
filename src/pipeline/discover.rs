//! Source file discovery.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// Suffix filter equivalent to the glob `**/*.{md,yml,...}`.
///
/// Like shell globs, `*` does not match dot-files, and nothing below a
/// dot-directory matches either.
#[derive(Debug, Clone)]
pub struct FileFilter {
    set: GlobSet,
}

impl FileFilter {
    pub fn new(file_types: &[String]) -> Result<Self, globset::Error> {
        let pattern = format!("**/*.{{{}}}", file_types.join(","));
        let set = GlobSetBuilder::new().add(Glob::new(&pattern)?).build()?;
        Ok(Self { set })
    }

    /// Test a path relative to its source directory.
    pub fn matches(&self, relative: &Path) -> bool {
        !relative.components().any(|c| is_hidden(c.as_os_str())) && self.set.is_match(relative)
    }
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_str().is_some_and(|name| name.starts_with('.'))
}

/// Collect matching files under `dir`, sorted by name at every level so
/// the order is stable for a given snapshot.
pub fn discover(dir: &Path, filter: &FileFilter) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .strip_prefix(dir)
                .is_ok_and(|relative| filter.matches(relative))
        })
        .map(walkdir::DirEntry::into_path)
        .collect()
}
