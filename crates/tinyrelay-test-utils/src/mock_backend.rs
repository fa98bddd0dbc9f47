// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock AI backend for deterministic processor tests.
//!
//! `MockBackend` implements `AiBackend` with scripted replies (or failures)
//! and records every invocation, optionally with a snapshot of `outgoing/`
//! taken when the invocation started.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use tinyrelay_core::{AiBackend, RelayError, SessionMode};

/// One recorded call to [`MockBackend::invoke`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub mode: SessionMode,
    pub message: String,
    /// File names present in the observed directory when the call started.
    pub observed_files: Vec<String>,
}

/// A scripted AI backend.
///
/// Replies are popped from a FIFO queue; `Err` entries become backend
/// failures. An empty script echoes the message as `"echo: {message}"`.
/// Clones share the script and the invocation log.
#[derive(Clone, Default)]
pub struct MockBackend {
    script: Arc<Mutex<VecDeque<Result<String, String>>>>,
    invocations: Arc<Mutex<Vec<Invocation>>>,
    observe_dir: Option<PathBuf>,
    delay: Option<Duration>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend pre-loaded with successful replies.
    pub fn with_replies(replies: Vec<&str>) -> Self {
        let script: VecDeque<Result<String, String>> =
            replies.into_iter().map(|r| Ok(r.to_string())).collect();
        Self {
            script: Arc::new(Mutex::new(script)),
            ..Self::default()
        }
    }

    /// Snapshot the file names in `dir` at the start of every invocation.
    pub fn observing(mut self, dir: impl Into<PathBuf>) -> Self {
        self.observe_dir = Some(dir.into());
        self
    }

    /// Sleep this long inside every invocation.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn push_reply(&self, reply: &str) {
        self.script.lock().await.push_back(Ok(reply.to_string()));
    }

    pub async fn push_failure(&self, message: &str) {
        self.script.lock().await.push_back(Err(message.to_string()));
    }

    pub async fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().await.clone()
    }

    pub async fn invocation_count(&self) -> usize {
        self.invocations.lock().await.len()
    }

    fn snapshot(&self) -> Vec<String> {
        let Some(dir) = &self.observe_dir else {
            return Vec::new();
        };
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .map(|rd| {
                rd.filter_map(|e| e.ok())
                    .filter_map(|e| e.file_name().into_string().ok())
                    .filter(|n| !n.starts_with('.'))
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

#[async_trait]
impl AiBackend for MockBackend {
    fn name(&self) -> &str {
        "mock-backend"
    }

    async fn invoke(&self, mode: SessionMode, message: &str) -> Result<String, RelayError> {
        self.invocations.lock().await.push(Invocation {
            mode,
            message: message.to_string(),
            observed_files: self.snapshot(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.script.lock().await.pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(RelayError::Backend {
                message,
                source: None,
            }),
            None => Ok(format!("echo: {message}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_replies_then_echo() {
        let backend = MockBackend::with_replies(vec!["first"]);
        backend.push_failure("boom").await;

        assert_eq!(
            backend.invoke(SessionMode::Continue, "a").await.unwrap(),
            "first"
        );
        assert!(backend.invoke(SessionMode::Continue, "b").await.is_err());
        assert_eq!(
            backend.invoke(SessionMode::Fresh, "c").await.unwrap(),
            "echo: c"
        );

        let calls = backend.invocations().await;
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2].mode, SessionMode::Fresh);
        assert_eq!(calls[2].message, "c");
    }

    #[tokio::test]
    async fn with_replies_keeps_every_reply_in_order() {
        let backend = MockBackend::with_replies(vec!["one", "two", "three"]);
        for expected in ["one", "two", "three"] {
            assert_eq!(
                backend.invoke(SessionMode::Continue, "x").await.unwrap(),
                expected
            );
        }
        assert_eq!(
            backend.invoke(SessionMode::Continue, "x").await.unwrap(),
            "echo: x"
        );
    }

    #[tokio::test]
    async fn clones_share_the_log() {
        let backend = MockBackend::new();
        let clone = backend.clone();
        clone.invoke(SessionMode::Continue, "x").await.unwrap();
        assert_eq!(backend.invocation_count().await, 1);
    }
}
