//! Error types for compiler invocation, configuration and document lookup.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while running the external compiler.
#[derive(Debug, Error)]
pub enum RunError {
    /// The executable could not be started.
    #[error("failed to start `{executable}`: {source}")]
    Spawn {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    /// The process did not finish within the allowed time.
    #[error("`{executable}` did not finish within {}s", .timeout.as_secs())]
    Timeout {
        executable: String,
        timeout: Duration,
    },

    /// The process was terminated by a signal.
    #[error("`{executable}` was terminated without an exit code")]
    Killed { executable: String },

    /// Writing the document to the scratch directory failed.
    #[error("failed to write scratch file: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while fetching configuration from the editor.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The editor rejected or failed the configuration request.
    #[error("configuration request failed: {0}")]
    Request(String),

    /// The editor answered with a value that is not a settings object.
    #[error("malformed configuration: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Errors raised by document store lookups.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    /// The URI is not an open document.
    #[error("document is not open: {0}")]
    NotOpen(String),
}
