//! Writing artifacts and index files to the target tree.

use super::IndexEntry;
use crate::parser::Metadata;
use crate::pipeline::PipelineError;
use serde::Serialize;
use std::{
    fs, io,
    path::{Component, Path, PathBuf},
};

/// Persisted shape of an entry inside `index.json` / `<rule>.json`.
#[derive(Serialize)]
struct EntrySummary<'a> {
    name: &'a str,
    path: &'a str,
    data: &'a Metadata,
}

/// Resolve a formatted output path under `target`.
///
/// Leading slashes and `.` segments are ignored; `..` is rejected so an
/// entry can never escape the target tree.
pub fn artifact_path(target: &Path, output: &str) -> Result<PathBuf, PipelineError> {
    let mut path = target.to_path_buf();
    for segment in Path::new(output).components() {
        match segment {
            Component::Normal(part) => path.push(part),
            Component::CurDir | Component::RootDir => {}
            Component::ParentDir | Component::Prefix(_) => {
                return Err(PipelineError::Write {
                    path: target.join(output),
                    source: io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "output path escapes the target directory",
                    ),
                });
            }
        }
    }
    if path == target {
        return Err(PipelineError::Write {
            path,
            source: io::Error::new(io::ErrorKind::InvalidInput, "empty output path"),
        });
    }
    Ok(path)
}

/// Write bytes, creating parent directories as needed.
pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    let write_err = |source| PipelineError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, bytes).map_err(write_err)
}

/// Serialize `value` as compact JSON and write it.
pub fn write_json(path: &Path, value: &impl Serialize) -> Result<(), PipelineError> {
    let bytes = serde_json::to_vec(value).map_err(|err| PipelineError::Write {
        path: path.to_path_buf(),
        source: io::Error::other(err),
    })?;
    write_bytes(path, &bytes)
}

/// Write `<dir>/<name>.json` as an ordered array of `{ name, path, data }`.
pub fn write_index<'a>(
    dir: &Path,
    name: &str,
    entries: impl Iterator<Item = &'a IndexEntry>,
) -> Result<PathBuf, PipelineError> {
    let summaries: Vec<_> = entries
        .map(|entry| EntrySummary {
            name: &entry.name,
            path: &entry.path,
            data: &entry.data,
        })
        .collect();
    let path = dir.join(format!("{name}.json"));
    write_json(&path, &summaries)?;
    Ok(path)
}

/// Delete a previously written artifact. A missing file is not an error.
pub fn remove_artifact(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Content;
    use tempfile::TempDir;

    #[test]
    fn test_artifact_path() {
        let target = Path::new("/out");
        assert_eq!(artifact_path(target, "posts/a").unwrap(), PathBuf::from("/out/posts/a"));
        assert_eq!(artifact_path(target, "/posts/./a").unwrap(), PathBuf::from("/out/posts/a"));
        assert!(artifact_path(target, "../etc/passwd").is_err());
        assert!(artifact_path(target, "").is_err());
    }

    #[test]
    fn test_write_bytes_creates_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/c.bin");
        write_bytes(&path, &[1, 2, 3]).unwrap();
        assert_eq!(fs::read(&path).unwrap(), [1, 2, 3]);
    }

    #[test]
    fn test_write_bytes_failure() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let err = write_bytes(&blocker.join("child"), b"y").unwrap_err();
        assert!(matches!(err, PipelineError::Write { .. }));
    }

    #[test]
    fn test_write_index_omits_content() {
        let dir = TempDir::new().unwrap();
        let mut data = Metadata::new();
        data.insert("title".into(), "Hi".into());
        let entry = IndexEntry {
            name: "posts".into(),
            path: "posts/hi".into(),
            data,
            content: Content::Text("<p>body</p>".into()),
        };

        let path = write_index(dir.path(), "posts", std::iter::once(&entry)).unwrap();
        assert_eq!(path, dir.path().join("posts.json"));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            r#"[{"name":"posts","path":"posts/hi","data":{"title":"Hi"}}]"#
        );
    }

    #[test]
    fn test_remove_artifact_missing_ok() {
        let dir = TempDir::new().unwrap();
        assert!(remove_artifact(&dir.path().join("nope")).is_ok());
    }
}
