//! Markdown strategy: front matter + body rendered to HTML.

use super::{Content, ContentParser, ParsedFile, frontmatter, utf8};
use crate::pipeline::PipelineError;
use pulldown_cmark::{Options, Parser, html};
use std::path::Path;

/// Renders CommonMark with the GitHub extensions (tables, strikethrough,
/// task lists, footnotes).
#[derive(Debug, Clone, Copy)]
pub struct MarkdownParser {
    options: Options,
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self {
            options: Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_FOOTNOTES,
        }
    }
}

impl MarkdownParser {
    pub fn render(&self, body: &str) -> String {
        let mut out = String::with_capacity(body.len() * 3 / 2);
        html::push_html(&mut out, Parser::new_ext(body, self.options));
        out
    }
}

impl ContentParser for MarkdownParser {
    fn parse(&self, path: &Path, bytes: Vec<u8>) -> Result<Option<ParsedFile>, PipelineError> {
        let source = utf8(path, bytes)?;
        let front = frontmatter::split(&source).map_err(|message| PipelineError::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        if front.is_draft() {
            return Ok(None);
        }

        let content = Content::Text(self.render(front.body));
        Ok(Some(ParsedFile {
            metadata: front.attributes,
            content,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_gfm_table() {
        let html = MarkdownParser::default().render("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
    }

    #[test]
    fn test_parse_splits_front_matter() {
        let parsed = MarkdownParser::default()
            .parse(Path::new("a.md"), b"---\ntitle: Hi\n---\n*x*\n".to_vec())
            .unwrap()
            .unwrap();
        assert_eq!(parsed.metadata["title"], "Hi");
        assert_eq!(parsed.content, Content::Text("<p><em>x</em></p>\n".into()));
    }

    #[test]
    fn test_parse_bad_front_matter() {
        let err = MarkdownParser::default()
            .parse(Path::new("a.md"), b"---\ntitle: [unclosed\n---\n".to_vec())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Parse { .. }));
    }

    #[test]
    fn test_parse_invalid_utf8() {
        let err = MarkdownParser::default()
            .parse(Path::new("a.md"), vec![0xff, 0xfe])
            .unwrap_err();
        assert!(matches!(err, PipelineError::Parse { .. }));
    }
}
