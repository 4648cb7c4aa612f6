//! YAML strategy: the whole document becomes the `content` metadata key.

use super::{Content, ContentParser, Metadata, ParsedFile};
use crate::pipeline::PipelineError;
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct YamlParser;

impl ContentParser for YamlParser {
    fn parse(&self, path: &Path, bytes: Vec<u8>) -> Result<Option<ParsedFile>, PipelineError> {
        let parse_err = |message: String| PipelineError::Parse {
            path: path.to_path_buf(),
            message,
        };
        let document = if bytes.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            let document: serde_yaml::Value =
                serde_yaml::from_slice(&bytes).map_err(|err| parse_err(err.to_string()))?;
            serde_json::to_value(document).map_err(|err| parse_err(err.to_string()))?
        };

        let mut metadata = Metadata::new();
        metadata.insert("content".into(), document);
        Ok(Some(ParsedFile {
            metadata,
            content: Content::Empty,
        }))
    }
}
