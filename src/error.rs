//! Startup-time configuration errors.

use std::{io, path::PathBuf};

/// An invalid configuration, detected before any frame is processed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown gesture `{0}`")]
    UnknownGesture(String),

    #[error("unknown hand `{0}`, expected `left`, `right` or `any`")]
    UnknownHand(String),

    #[error("unknown trigger `{0}`, expected `enter`, `enter_leave`, `periodic` or `continuous`")]
    UnknownTrigger(String),

    #[error("rule `{rule}`: `{field}` must be a finite, non-negative number of seconds (got {value})")]
    InvalidDelay {
        rule: String,
        field: &'static str,
        value: f64,
    },

    #[error("rule `{0}`: periodic triggers need a positive `next_trigger_delay`")]
    MissingInterval(String),

    #[error("duplicate rule name `{0}`")]
    DuplicateRule(String),

    #[error("rule `{rule}` refers to unknown callback `{callback}`")]
    UnknownCallback { rule: String, callback: String },

    #[error("invalid tracker setting `{field}`: {reason}")]
    InvalidSetting {
        field: &'static str,
        reason: &'static str,
    },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
}
