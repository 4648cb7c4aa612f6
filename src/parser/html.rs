//! HTML strategy: front matter + trimmed body, no rendering.

use super::{Content, ContentParser, ParsedFile, frontmatter, utf8};
use crate::pipeline::PipelineError;
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct HtmlParser;

impl ContentParser for HtmlParser {
    fn parse(&self, path: &Path, bytes: Vec<u8>) -> Result<Option<ParsedFile>, PipelineError> {
        let source = utf8(path, bytes)?;
        let front = frontmatter::split(&source).map_err(|message| PipelineError::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        if front.is_draft() {
            return Ok(None);
        }

        Ok(Some(ParsedFile {
            content: Content::Text(front.body.trim().to_owned()),
            metadata: front.attributes,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_without_front_matter() {
        let parsed = HtmlParser
            .parse(Path::new("a.html"), b"\n<div>raw</div>\n".to_vec())
            .unwrap()
            .unwrap();
        assert!(parsed.metadata.is_empty());
        assert_eq!(parsed.content, Content::Text("<div>raw</div>".into()));
    }

    #[test]
    fn test_parse_draft() {
        let parsed = HtmlParser
            .parse(Path::new("a.html"), b"---\ndraft: true\n---\n<p/>".to_vec())
            .unwrap();
        assert!(parsed.is_none());
    }
}
