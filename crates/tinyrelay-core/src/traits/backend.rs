// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contract for the external conversational-AI process.

use async_trait::async_trait;

use crate::error::RelayError;
use crate::types::SessionMode;

/// The external AI process the queue processor forwards messages to.
///
/// Implementations block (asynchronously) until the process has produced its
/// full reply. The processor never calls `invoke` concurrently.
#[async_trait]
pub trait AiBackend: Send + Sync + 'static {
    /// Human-readable backend name used in logs.
    fn name(&self) -> &str;

    /// Sends `message` to the AI and returns its reply text.
    ///
    /// `mode` selects between continuing the shared conversation and
    /// starting a fresh one.
    async fn invoke(&self, mode: SessionMode, message: &str) -> Result<String, RelayError>;
}
