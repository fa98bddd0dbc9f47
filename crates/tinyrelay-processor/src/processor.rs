// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-consumer drain of the `incoming` queue.
//!
//! The [`QueueProcessor`] takes one file at a time in arrival order, claims
//! it by renaming it into `processing/`, invokes the AI backend, and
//! publishes the reply to `outgoing/` before it looks at the next file. At
//! most one AI invocation is ever in flight.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tinyrelay_config::RelayConfig;
use tinyrelay_core::{AiBackend, MessageId, QueueResponse, RelayError};
use tinyrelay_queue::{now_ms, ClaimedMessage, QueueStore, ResetFlag};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::session::ConversationSession;

/// Notice appended to replies cut at `max_reply_chars`.
const TRUNCATION_NOTICE: &str = "\n\n[Response truncated...]";

/// Tunables for the processing loop.
#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    /// Sleep between polls while `incoming/` is empty.
    pub poll_interval: Duration,
    /// Replies longer than this many characters are truncated.
    pub max_reply_chars: usize,
    /// Reply text sent when the AI invocation fails.
    pub error_reply: String,
}

impl ProcessorSettings {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            poll_interval: config.queue.poll_interval(),
            max_reply_chars: config.backend.max_reply_chars,
            error_reply: config.backend.error_reply.clone(),
        }
    }
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            max_reply_chars: 4000,
            error_reply: "Sorry, I encountered an error processing your request.".to_string(),
        }
    }
}

/// What happened to the file handled by one poll step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The AI replied and the reply was published.
    Replied(MessageId),
    /// The AI failed and the error notice was published instead.
    Failed(MessageId),
    /// The file could not be decoded and was deleted.
    Discarded(String),
}

/// A reply produced by the AI whose claim is not yet released.
#[derive(Debug)]
struct Unfinished {
    claimed: ClaimedMessage,
    response: QueueResponse,
    outcome: ProcessOutcome,
    published: bool,
}

/// Drains `incoming/` one message at a time.
pub struct QueueProcessor {
    store: QueueStore,
    session: ConversationSession,
    backend: Arc<dyn AiBackend>,
    settings: ProcessorSettings,
    /// Held until its response is in `outgoing/` and its claim is released.
    /// Nothing new is claimed while this is set.
    unfinished: Option<Unfinished>,
}

impl QueueProcessor {
    pub fn new(
        store: QueueStore,
        reset: ResetFlag,
        backend: Arc<dyn AiBackend>,
        settings: ProcessorSettings,
    ) -> Self {
        info!(backend = backend.name(), "queue processor initialized");
        Self {
            store,
            session: ConversationSession::new(reset),
            backend,
            settings,
            unfinished: None,
        }
    }

    pub fn session(&self) -> &ConversationSession {
        &self.session
    }

    /// Runs until `cancel` fires.
    ///
    /// Leftovers in `processing/` from a previous crash are recovered first.
    /// The loop sleeps only while the queue is empty; an in-flight invocation
    /// is allowed to finish before cancellation is observed.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), RelayError> {
        self.store.ensure_dirs().await?;
        let recovered = self.store.recover_orphans().await?;
        if recovered > 0 {
            warn!(count = recovered, "requeued messages left in processing by a previous run");
        }

        info!(
            incoming = %self.store.incoming_dir().display(),
            "queue processor running"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let idle = match self.poll_once().await {
                Ok(Some(_)) => false,
                Ok(None) => true,
                Err(e) => {
                    error!(error = %e, "queue poll failed");
                    true
                }
            };

            if idle {
                tokio::select! {
                    _ = tokio::time::sleep(self.settings.poll_interval) => {}
                    _ = cancel.cancelled() => break,
                }
            }
        }

        if let Some(unfinished) = &self.unfinished {
            warn!(
                message_id = %unfinished.response.message_id,
                "stopping with an unpublished response, message stays in processing"
            );
        }
        info!(
            invocations = self.session.invocations(),
            "queue processor stopped"
        );
        Ok(())
    }

    /// Processes at most one message: the oldest one that can be claimed.
    ///
    /// A response that failed to publish on an earlier step is retried
    /// first; until it goes through, no new message is claimed.
    ///
    /// Returns `None` when nothing was claimable.
    pub async fn poll_once(&mut self) -> Result<Option<ProcessOutcome>, RelayError> {
        if let Some(unfinished) = self.unfinished.take() {
            info!(
                message_id = %unfinished.response.message_id,
                "retrying unpublished response"
            );
            return self.finish(unfinished).await.map(Some);
        }

        for path in self.store.pending_incoming().await? {
            if let Some(claimed) = self.store.claim(&path).await? {
                return self.process(claimed).await.map(Some);
            }
        }
        Ok(None)
    }

    async fn process(&mut self, claimed: ClaimedMessage) -> Result<ProcessOutcome, RelayError> {
        let msg = match self.store.read_claimed(&claimed).await {
            Ok(msg) => msg,
            Err(e) => {
                if matches!(e, RelayError::Serialization { .. }) {
                    warn!(file = %claimed.file_name, error = %e, "deleting malformed queue file");
                } else {
                    error!(file = %claimed.file_name, error = %e, "deleting unreadable queue file");
                }
                let file_name = claimed.file_name.clone();
                self.store.discard(claimed).await?;
                return Ok(ProcessOutcome::Discarded(file_name));
            }
        };

        info!(
            message_id = %msg.message_id,
            channel = %msg.channel,
            sender = %msg.sender,
            "processing message"
        );

        let mode = self.session.next_mode().await;
        let started = std::time::Instant::now();
        let (text, outcome) = match self.backend.invoke(mode, &msg.message).await {
            Ok(reply) => (
                truncate_reply(&reply, self.settings.max_reply_chars),
                ProcessOutcome::Replied(msg.message_id.clone()),
            ),
            Err(e) => {
                error!(
                    message_id = %msg.message_id,
                    error = %e,
                    "AI invocation failed, sending error reply"
                );
                (
                    self.settings.error_reply.clone(),
                    ProcessOutcome::Failed(msg.message_id.clone()),
                )
            }
        };

        debug!(
            message_id = %msg.message_id,
            %mode,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "invocation finished"
        );

        let unfinished = Unfinished {
            claimed,
            response: QueueResponse::reply_to(&msg, text, now_ms()),
            outcome,
            published: false,
        };
        self.finish(unfinished).await
    }

    /// Publishes the response, then releases the claim. On failure the
    /// work is parked in `self.unfinished` for the next poll.
    async fn finish(&mut self, mut unfinished: Unfinished) -> Result<ProcessOutcome, RelayError> {
        if !unfinished.published {
            match self.store.publish_response(&unfinished.response).await {
                Ok(out) => {
                    unfinished.published = true;
                    debug!(
                        message_id = %unfinished.response.message_id,
                        path = %display_name(&out),
                        "response published"
                    );
                }
                Err(e) => {
                    error!(
                        message_id = %unfinished.response.message_id,
                        error = %e,
                        "failed to publish response, will retry"
                    );
                    self.unfinished = Some(unfinished);
                    return Err(e);
                }
            }
        }

        if let Err(e) = self.store.discard(unfinished.claimed.clone()).await {
            error!(
                file = %unfinished.claimed.file_name,
                error = %e,
                "failed to release claimed file, will retry"
            );
            self.unfinished = Some(unfinished);
            return Err(e);
        }
        Ok(unfinished.outcome)
    }
}

/// Cuts `reply` to at most `max_chars` characters, marking the cut.
pub fn truncate_reply(reply: &str, max_chars: usize) -> String {
    match reply.char_indices().nth(max_chars) {
        None => reply.to_string(),
        Some((cut, _)) => format!("{}{TRUNCATION_NOTICE}", &reply[..cut]),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
