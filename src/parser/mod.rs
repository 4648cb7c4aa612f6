//! Content parser dispatch.
//!
//! Turns one source file into metadata plus content, choosing a strategy
//! purely from the file extension.
//!
//! | Extension      | Strategy          | Content             |
//! |----------------|-------------------|---------------------|
//! | `md`           | [`MarkdownParser`] | rendered HTML       |
//! | `yml`, `yaml`  | [`YamlParser`]     | none (data in `content` key) |
//! | `html`, `htm`  | [`HtmlParser`]     | trimmed body        |
//! | anything else  | [`BinaryParser`]   | raw bytes           |
//!
//! Every strategy gets `modifiedAt`/`createdAt` merged underneath its own
//! metadata, so front matter may override them.

mod binary;
mod frontmatter;
mod html;
mod markdown;
mod yaml;

pub use binary::BinaryParser;
pub use html::HtmlParser;
pub use markdown::MarkdownParser;
pub use yaml::YamlParser;

use crate::pipeline::PipelineError;
use chrono::{DateTime, SecondsFormat, Utc};
use rustc_hash::FxHashMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::{fs, path::Path, time::SystemTime};

/// Metadata attached to an entry: front matter, timestamps and route params.
pub type Metadata = serde_json::Map<String, Value>;

/// Parsed payload of a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Rendered text, serialized into the JSON artifact.
    Text(String),
    /// Opaque bytes, written verbatim.
    Binary(Vec<u8>),
    /// No body; everything lives in metadata.
    Empty,
}

impl Content {
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl Serialize for Content {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(text) => serializer.serialize_str(text),
            Self::Binary(_) | Self::Empty => serializer.serialize_none(),
        }
    }
}

/// Result of parsing one source file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFile {
    pub metadata: Metadata,
    pub content: Content,
}

impl ParsedFile {
    pub const fn is_binary(&self) -> bool {
        matches!(self.content, Content::Binary(_))
    }
}

/// A parsing strategy for one family of extensions.
pub trait ContentParser: Send + Sync {
    /// Parse raw file bytes.
    ///
    /// `Ok(None)` is the exclusion signal: the file must not be published
    /// and any previous entry for it is retracted.
    fn parse(&self, path: &Path, bytes: Vec<u8>) -> Result<Option<ParsedFile>, PipelineError>;
}

/// Extension → strategy table.
pub struct ParserRegistry {
    parsers: FxHashMap<String, Box<dyn ContentParser>>,
    fallback: Box<dyn ContentParser>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        let mut registry = Self {
            parsers: FxHashMap::default(),
            fallback: Box::new(BinaryParser),
        };
        registry.register("md", MarkdownParser::default());
        registry.register("yml", YamlParser);
        registry.register("yaml", YamlParser);
        registry.register("html", HtmlParser);
        registry.register("htm", HtmlParser);
        registry
    }
}

impl ParserRegistry {
    /// Register (or replace) the strategy for an extension, given without the dot.
    pub fn register(&mut self, extension: &str, parser: impl ContentParser + 'static) {
        self.parsers
            .insert(extension.to_ascii_lowercase(), Box::new(parser));
    }

    fn strategy(&self, path: &Path) -> &dyn ContentParser {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.parsers.get(&ext.to_ascii_lowercase()))
            .map_or(self.fallback.as_ref(), |parser| parser.as_ref())
    }

    /// Read and parse a file.
    ///
    /// I/O failures come back as [`PipelineError::Read`]; the caller decides
    /// whether that means "skip" or "retract".
    pub fn parse(&self, path: &Path) -> Result<Option<ParsedFile>, PipelineError> {
        let read_err = |source| PipelineError::Read {
            path: path.to_path_buf(),
            source,
        };
        let stat = fs::metadata(path).map_err(read_err)?;
        let bytes = fs::read(path).map_err(read_err)?;

        let Some(mut parsed) = self.strategy(path).parse(path, bytes)? else {
            return Ok(None);
        };

        let mut metadata = file_timestamps(&stat);
        metadata.append(&mut parsed.metadata);
        parsed.metadata = metadata;
        Ok(Some(parsed))
    }
}

/// `modifiedAt` / `createdAt` as RFC 3339 UTC strings.
///
/// Filesystems without birth time report the modification time for both.
fn file_timestamps(stat: &fs::Metadata) -> Metadata {
    let modified = stat.modified().ok();
    let created = stat.created().ok().or(modified);

    let mut metadata = Metadata::new();
    if let Some(time) = modified {
        metadata.insert("modifiedAt".into(), format_time(time).into());
    }
    if let Some(time) = created {
        metadata.insert("createdAt".into(), format_time(time).into());
    }
    metadata
}

fn format_time(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Decode bytes as UTF-8 text for the text-based strategies.
fn utf8(path: &Path, bytes: Vec<u8>) -> Result<String, PipelineError> {
    String::from_utf8(bytes).map_err(|err| PipelineError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}
