//! Front matter splitting.
//!
//! A front matter block is a YAML mapping fenced by `---` lines at the very
//! start of a file. The closing fence may also be `...`.
//!
//! ```text
//! ---
//! title: Hello
//! draft: false
//! ---
//! body starts here
//! ```

use super::Metadata;
use serde_json::Value;

/// Front matter attributes plus the remaining body.
#[derive(Debug)]
pub struct FrontMatter<'a> {
    pub attributes: Metadata,
    pub body: &'a str,
}

impl FrontMatter<'_> {
    /// `draft: true` opts a file out of publication.
    pub fn is_draft(&self) -> bool {
        self.attributes.get("draft") == Some(&Value::Bool(true))
    }
}

/// Split a source into front matter attributes and body.
///
/// Sources without an opening fence, or with an unterminated one, are all body.
pub fn split(source: &str) -> Result<FrontMatter<'_>, String> {
    let text = source.strip_prefix('\u{feff}').unwrap_or(source);
    let Some((yaml, body)) = fenced_block(text) else {
        return Ok(FrontMatter {
            attributes: Metadata::new(),
            body: text,
        });
    };

    if yaml.trim().is_empty() {
        return Ok(FrontMatter {
            attributes: Metadata::new(),
            body,
        });
    }

    let attributes = match serde_yaml::from_str::<serde_yaml::Value>(yaml)
        .map_err(|err| format!("invalid front matter: {err}"))?
    {
        serde_yaml::Value::Null => Metadata::new(),
        value => match serde_json::to_value(value).map_err(|err| err.to_string())? {
            Value::Object(map) => map,
            _ => return Err("front matter must be a mapping".into()),
        },
    };

    Ok(FrontMatter { attributes, body })
}

/// Locate the fenced block; returns `(yaml, body)`.
fn fenced_block(text: &str) -> Option<(&str, &str)> {
    let (first, rest) = split_line(text)?;
    if first.trim_end() != "---" {
        return None;
    }

    let mut offset = 0;
    let mut remaining = rest;
    while let Some((line, after)) = split_line(remaining) {
        if matches!(line.trim_end(), "---" | "...") {
            return Some((&rest[..offset], after));
        }
        offset += remaining.len() - after.len();
        remaining = after;
    }
    None
}

/// Split off the first line (without its terminator). `None` on empty input.
fn split_line(text: &str) -> Option<(&str, &str)> {
    if text.is_empty() {
        return None;
    }
    Some(match text.find('\n') {
        Some(idx) => (&text[..idx], &text[idx + 1..]),
        None => (text, ""),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_basic() {
        let fm = split("---\ntitle: Hi\ntags: [a, b]\n---\nbody\n").unwrap();
        assert_eq!(fm.attributes["title"], "Hi");
        assert_eq!(fm.attributes["tags"], serde_json::json!(["a", "b"]));
        assert_eq!(fm.body, "body\n");
        assert!(!fm.is_draft());
    }

    #[test]
    fn test_no_front_matter() {
        let fm = split("# Title\n---\n").unwrap();
        assert!(fm.attributes.is_empty());
        assert_eq!(fm.body, "# Title\n---\n");
    }

    #[test]
    fn test_unterminated_is_body() {
        let source = "---\ntitle: Hi\nno closing fence";
        let fm = split(source).unwrap();
        assert!(fm.attributes.is_empty());
        assert_eq!(fm.body, source);
    }

    #[test]
    fn test_crlf_and_dots_fence() {
        let fm = split("---\r\ntitle: Hi\r\n...\r\nbody").unwrap();
        assert_eq!(fm.attributes["title"], "Hi");
        assert_eq!(fm.body, "body");
    }

    #[test]
    fn test_bom_and_empty_block() {
        let fm = split("\u{feff}---\n---\nbody").unwrap();
        assert!(fm.attributes.is_empty());
        assert_eq!(fm.body, "body");
    }

    #[test]
    fn test_draft_flag() {
        assert!(split("---\ndraft: true\n---\n").unwrap().is_draft());
        assert!(!split("---\ndraft: \"true\"\n---\n").unwrap().is_draft());
    }

    #[test]
    fn test_non_mapping_rejected() {
        assert!(split("---\n- a\n- b\n---\n").is_err());
    }

    #[test]
    fn test_invalid_yaml_rejected() {
        let err = split("---\ntitle: [unclosed\n---\n").unwrap_err();
        assert!(err.starts_with("invalid front matter"));
    }
}
