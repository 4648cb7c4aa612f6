//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// [content] Section Defaults
// ============================================================================

pub mod content {
    use std::path::PathBuf;

    pub fn root() -> Option<PathBuf> {
        None
    }

    pub fn source() -> PathBuf {
        "content".into()
    }

    pub fn target() -> PathBuf {
        "public".into()
    }

    pub fn index() -> PathBuf {
        "api".into()
    }

    pub fn file_types() -> Vec<String> {
        ["md", "yml", "html", "pdf", "svg", "png", "jpg"]
            .into_iter()
            .map(String::from)
            .collect()
    }
}

// ============================================================================
// [watch] Section Defaults
// ============================================================================

pub mod watch {
    pub fn debounce_ms() -> u64 {
        100
    }
}
