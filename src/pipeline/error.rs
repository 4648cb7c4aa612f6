//! Pipeline error types.
//!
//! Configuration errors abort the whole invocation; the rest are scoped to
//! the file that raised them.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("rule is missing mandatory field `{0}`")]
    MissingField(&'static str),

    #[error("rule `{rule}` has an invalid pattern")]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    #[error("key not in params: `{key}` (template `{template}`)")]
    MissingParam { template: String, key: String },

    #[error("param `{key}` is not a scalar (template `{template}`)")]
    NonScalarParam { template: String, key: String },

    #[error("cannot read `{}`", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse `{}`: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("cannot write `{}`", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Whether this error is a configuration error that aborts the whole run.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MissingField(_)
                | Self::InvalidPattern { .. }
                | Self::MissingParam { .. }
                | Self::NonScalarParam { .. }
        )
    }
}
