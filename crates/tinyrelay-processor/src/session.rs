// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The single shared conversation handle.
//!
//! There is exactly one continuing AI conversation per relay home. The
//! processor owns the [`ConversationSession`] and asks it, once per message,
//! whether the invocation continues that conversation or starts a new one.

use tinyrelay_core::SessionMode;
use tinyrelay_queue::ResetFlag;
use tracing::{info, warn};

/// Serialized handle to the shared conversation.
///
/// Mode decisions go through `&mut self`, so two invocations can never be
/// planned concurrently through the same handle.
#[derive(Debug)]
pub struct ConversationSession {
    reset: ResetFlag,
    invocations: u64,
    resets: u64,
}

impl ConversationSession {
    pub fn new(reset: ResetFlag) -> Self {
        Self {
            reset,
            invocations: 0,
            resets: 0,
        }
    }

    /// Decides the mode for the next invocation, consuming the reset flag.
    ///
    /// A flag that cannot be removed is logged and treated as absent; it
    /// will be retried on the next message.
    pub async fn next_mode(&mut self) -> SessionMode {
        self.invocations += 1;
        match self.reset.take().await {
            Ok(true) => {
                self.resets += 1;
                info!(
                    invocation = self.invocations,
                    "reset flag found, starting fresh conversation"
                );
                SessionMode::Fresh
            }
            Ok(false) => SessionMode::Continue,
            Err(e) => {
                warn!(error = %e, "could not consume reset flag, continuing conversation");
                SessionMode::Continue
            }
        }
    }

    /// Number of invocations planned so far.
    pub fn invocations(&self) -> u64 {
        self.invocations
    }

    /// Number of fresh conversations started by a reset.
    pub fn resets(&self) -> u64 {
        self.resets
    }
}
