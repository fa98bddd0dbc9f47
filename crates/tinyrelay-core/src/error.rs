// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the tinyrelay message relay.

use std::path::PathBuf;

use thiserror::Error;

/// The primary error type used across the queue, processor, and channel adapters.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration errors (missing credentials, invalid values).
    ///
    /// Raised at startup only; the binary treats these as fatal.
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem errors while reading, writing, or moving queue files.
    #[error("queue I/O error at {}: {source}", path.display())]
    Queue {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A queue file could not be encoded or decoded as JSON.
    #[error("malformed queue file: {source}")]
    Serialization { source: serde_json::Error },

    /// Platform errors (send failure, typing indicator failure, connection loss).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// External AI process errors (spawn failure, non-zero exit, empty output).
    #[error("backend error: {message}")]
    Backend {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Wraps an I/O error raised while touching `path`.
    pub fn queue_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Queue {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is an I/O `NotFound` on a queue path.
    ///
    /// The processor and adapters use this to detect files that another
    /// component already claimed or consumed.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Queue { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(source: serde_json::Error) -> Self {
        Self::Serialization { source }
    }
}
