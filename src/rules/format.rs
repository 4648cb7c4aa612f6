//! Output path templating.
//!
//! A template is a `/`-separated path whose segments may contain `:key`
//! placeholders. A segment whose placeholders are not all present in the
//! params is dropped entirely, so one template covers both the item and the
//! index variant of a route:
//!
//! | Template              | Params                        | Output        |
//! |-----------------------|-------------------------------|---------------|
//! | `posts/:year/:slug`   | `{year: 2024, slug: "hello"}` | `posts/2024/hello` |
//! | `posts/:year/:slug`   | `{slug: "hello"}`             | `posts/hello` |
//! | `docs/:lang-:slug`    | `{slug: "intro"}`             | `docs`        |

use crate::parser::Metadata;
use crate::pipeline::PipelineError;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":([A-Za-z_][A-Za-z0-9_]*)").unwrap());

/// Expand `template` against `params`.
///
/// Segment dropping only looks at presence (`null` counts as absent). The
/// substitution pass that follows is strict: a placeholder whose key is not
/// in `params` at all is a configuration error.
pub fn format_path(template: &str, params: &Metadata) -> Result<String, PipelineError> {
    let kept = template
        .split('/')
        .filter(|segment| {
            PLACEHOLDER
                .find_iter(segment)
                .all(|m| is_present(params, placeholder_key(m.as_str())))
        })
        .collect::<Vec<_>>()
        .join("/");

    let mut out = String::with_capacity(kept.len());
    let mut last = 0;
    for m in PLACEHOLDER.find_iter(&kept) {
        let key = placeholder_key(m.as_str());
        let value = params.get(key).ok_or_else(|| PipelineError::MissingParam {
            template: template.to_owned(),
            key: key.to_owned(),
        })?;
        let value = scalar(value).ok_or_else(|| PipelineError::NonScalarParam {
            template: template.to_owned(),
            key: key.to_owned(),
        })?;
        out.push_str(&kept[last..m.start()]);
        out.push_str(&value);
        last = m.end();
    }
    out.push_str(&kept[last..]);
    Ok(out)
}

#[inline]
fn placeholder_key(placeholder: &str) -> &str {
    &placeholder[1..]
}

fn is_present(params: &Metadata, key: &str) -> bool {
    params.get(key).is_some_and(|value| !value.is_null())
}

/// Render a scalar param; arrays and objects have no path form.
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Metadata {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_all_present() {
        let p = params(json!({"year": 2024, "slug": "hello"}));
        assert_eq!(format_path("posts/:year/:slug", &p).unwrap(), "posts/2024/hello");
    }

    #[test]
    fn test_optional_segment_dropped() {
        let p = params(json!({"slug": "hello"}));
        assert_eq!(format_path("posts/:year/:slug", &p).unwrap(), "posts/hello");
    }

    #[test]
    fn test_index_variant() {
        let p = params(json!({}));
        assert_eq!(format_path("posts/:slug", &p).unwrap(), "posts");
    }

    #[test]
    fn test_segment_with_several_placeholders() {
        let p = params(json!({"slug": "intro"}));
        assert_eq!(format_path("docs/:lang-:slug", &p).unwrap(), "docs");

        let p = params(json!({"slug": "intro", "lang": "en"}));
        assert_eq!(format_path("docs/:lang-:slug.json", &p).unwrap(), "docs/en-intro.json");
    }

    #[test]
    fn test_empty_string_is_present() {
        let p = params(json!({"slug": ""}));
        assert_eq!(format_path("posts/:slug", &p).unwrap(), "posts/");
    }

    #[test]
    fn test_null_is_absent() {
        let p = params(json!({"year": null, "slug": "a"}));
        assert_eq!(format_path("posts/:year/:slug", &p).unwrap(), "posts/a");
    }

    #[test]
    fn test_non_scalar_rejected() {
        let p = params(json!({"tags": ["a"]}));
        let err = format_path("tags/:tags", &p).unwrap_err();
        assert!(matches!(err, PipelineError::NonScalarParam { ref key, .. } if key == "tags"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_no_placeholders() {
        let p = params(json!({"slug": "x"}));
        assert_eq!(format_path("feed.json", &p).unwrap(), "feed.json");
    }

    #[test]
    fn test_bool_and_number() {
        let p = params(json!({"n": 3, "b": false}));
        assert_eq!(format_path("page/:n/:b", &p).unwrap(), "page/3/false");
    }
}
