//! Fallback strategy: bytes pass through untouched.

use super::{Content, ContentParser, Metadata, ParsedFile};
use crate::pipeline::PipelineError;
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct BinaryParser;

impl ContentParser for BinaryParser {
    fn parse(&self, _path: &Path, bytes: Vec<u8>) -> Result<Option<ParsedFile>, PipelineError> {
        Ok(Some(ParsedFile {
            metadata: Metadata::new(),
            content: Content::Binary(bytes),
        }))
    }
}
