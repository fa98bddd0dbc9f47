// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The reset sentinel: a file whose existence means "start a fresh session".

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tinyrelay_core::RelayError;
use tracing::debug;

/// Handle to the reset sentinel file.
///
/// Any process may [`set`](ResetFlag::set) it; only the queue processor
/// [`take`](ResetFlag::take)s it.
#[derive(Debug, Clone)]
pub struct ResetFlag {
    path: PathBuf,
}

impl ResetFlag {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the sentinel. Setting an already-set flag is a no-op.
    pub async fn set(&self) -> Result<(), RelayError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RelayError::queue_io(parent, e))?;
        }
        tokio::fs::write(&self.path, b"reset\n")
            .await
            .map_err(|e| RelayError::queue_io(&self.path, e))?;
        debug!(path = %self.path.display(), "reset flag set");
        Ok(())
    }

    pub async fn is_set(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Consumes the sentinel, returning whether it was present.
    ///
    /// Removal is the test, so a flag set concurrently with this call is
    /// either consumed now or observed by the next call, never lost.
    pub async fn take(&self) -> Result<bool, RelayError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "reset flag consumed");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(RelayError::queue_io(&self.path, e)),
        }
    }
}
