// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The channel adapter: one chat platform bridged to the shared queue.
//!
//! [`RelayAdapter`] is generic over [`ChatPlatform`]. It runs three duties
//! from one select loop:
//!
//! - inbound platform text becomes an `incoming/` file plus a pending entry
//!   (reset commands set the reset flag and are answered directly)
//! - `outgoing/` files for this channel are matched to pending entries,
//!   delivered, and always deleted
//! - typing indicators are refreshed for every pending entry until it is
//!   resolved or evicted

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tinyrelay_config::model::QueueConfig;
use tinyrelay_core::{ChatPlatform, InboundText, MessageId, QueueMessage, RelayError};
use tinyrelay_queue::{generate_message_id, now_ms, QueueStore, ResetFlag};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::command::{is_reset_command, RESET_REPLY};
use crate::pending::{PendingReplyTracker, DEFAULT_PENDING_TTL};
use crate::split::split_message;

/// Floor for timer periods; `tokio::time::interval` rejects zero.
const MIN_TICK: Duration = Duration::from_millis(10);

/// Timers for one adapter.
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    /// How often `outgoing/` is scanned.
    pub poll_interval: Duration,
    /// How long a pending entry may wait for its reply.
    pub pending_ttl: Duration,
}

impl AdapterSettings {
    pub fn from_config(config: &QueueConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            pending_ttl: config.pending_ttl(),
        }
    }
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            pending_ttl: DEFAULT_PENDING_TTL,
        }
    }
}

/// What [`RelayAdapter::handle_inbound`] did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    /// Written to `incoming/` under this id.
    Queued(MessageId),
    /// Reset command: flag set, confirmation sent, nothing queued.
    Reset,
    /// Blank text, ignored.
    Ignored,
}

/// Bridges one chat platform to the queue.
pub struct RelayAdapter<P: ChatPlatform> {
    platform: Arc<P>,
    store: QueueStore,
    reset: ResetFlag,
    pending: Mutex<PendingReplyTracker<P::Target>>,
    settings: AdapterSettings,
}

impl<P: ChatPlatform> RelayAdapter<P> {
    /// Wraps an already connected platform.
    pub fn new(
        platform: P,
        store: QueueStore,
        reset: ResetFlag,
        settings: AdapterSettings,
    ) -> Self {
        Self {
            platform: Arc::new(platform),
            store,
            reset,
            pending: Mutex::new(PendingReplyTracker::new(settings.pending_ttl)),
            settings,
        }
    }

    /// Connects the platform, then wraps it.
    pub async fn connect(
        mut platform: P,
        store: QueueStore,
        reset: ResetFlag,
        settings: AdapterSettings,
    ) -> Result<Self, RelayError> {
        platform.connect().await?;
        Ok(Self::new(platform, store, reset, settings))
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Handles one inbound platform message.
    pub async fn handle_inbound(
        &self,
        inbound: InboundText<P::Target>,
    ) -> Result<InboundOutcome, RelayError> {
        let channel = self.platform.channel();
        let where_from = self.platform.describe_target(&inbound.reply_target);

        if inbound.text.trim().is_empty() {
            debug!(%channel, chat = %where_from, "ignoring blank message");
            return Ok(InboundOutcome::Ignored);
        }

        if is_reset_command(&inbound.text) {
            self.reset.set().await?;
            info!(%channel, sender = %inbound.sender, "reset requested");
            if let Err(e) = self
                .platform
                .send_text(&inbound.reply_target, RESET_REPLY, true)
                .await
            {
                warn!(%channel, chat = %where_from, error = %e, "failed to confirm reset");
            }
            return Ok(InboundOutcome::Reset);
        }

        let message_id = generate_message_id();
        let msg = QueueMessage {
            channel,
            sender: inbound.sender,
            sender_id: inbound.sender_id,
            message: inbound.text,
            timestamp: now_ms(),
            message_id: message_id.clone(),
        };

        // Track first, so a fast reply can never beat its pending entry.
        self.pending
            .lock()
            .await
            .insert(message_id.clone(), inbound.reply_target.clone());

        if let Err(e) = self.store.enqueue(&msg).await {
            self.pending.lock().await.take(&message_id);
            return Err(e);
        }

        info!(
            %channel,
            message_id = %message_id,
            sender = %msg.sender,
            chat = %where_from,
            "message queued"
        );

        if let Err(e) = self.platform.send_typing(&inbound.reply_target).await {
            debug!(%channel, error = %e, "typing indicator failed");
        }

        Ok(InboundOutcome::Queued(message_id))
    }

    /// Consumes this channel's `outgoing/` files. Every file is deleted,
    /// matched or not. Returns how many replies were delivered.
    pub async fn poll_outgoing(&self) -> Result<usize, RelayError> {
        let channel = self.platform.channel();
        let mut delivered = 0;

        for path in self.store.list_outgoing(channel).await? {
            let response = match self.store.read_response(&path).await {
                Ok(response) => response,
                Err(e) if e.is_not_found() => continue,
                Err(e) => {
                    warn!(
                        %channel,
                        path = %path.display(),
                        error = %e,
                        "deleting malformed outgoing file"
                    );
                    self.store.remove(&path).await?;
                    continue;
                }
            };

            let target = self.pending.lock().await.take(&response.message_id);
            match target {
                Some(target) => {
                    if self.deliver(&target, &response.message).await {
                        delivered += 1;
                    }
                }
                None => {
                    warn!(
                        %channel,
                        message_id = %response.message_id,
                        "no pending reply for outgoing message, discarding"
                    );
                }
            }

            self.store.remove(&path).await?;
        }

        Ok(delivered)
    }

    /// Sends `text` in platform-sized chunks; only the first is threaded.
    /// Returns whether every chunk was sent.
    async fn deliver(&self, target: &P::Target, text: &str) -> bool {
        let caps = self.platform.capabilities();
        let chunks = split_message(text, caps.max_message_length);
        if chunks.is_empty() {
            warn!(chat = %self.platform.describe_target(target), "empty reply, nothing sent");
            return false;
        }

        for (i, chunk) in chunks.iter().enumerate() {
            let threaded = i == 0 && caps.supports_threaded_reply;
            if let Err(e) = self.platform.send_text(target, chunk, threaded).await {
                error!(
                    chat = %self.platform.describe_target(target),
                    chunk = i,
                    error = %e,
                    "failed to send reply"
                );
                return false;
            }
        }

        debug!(
            chat = %self.platform.describe_target(target),
            chunks = chunks.len(),
            "reply delivered"
        );
        true
    }

    /// Evicts stale entries, then re-sends typing once per chat with a
    /// pending reply.
    pub async fn refresh_typing(&self) {
        let targets = {
            let mut pending = self.pending.lock().await;
            let evicted = pending.evict_stale();
            for id in &evicted {
                warn!(message_id = %id, "pending reply expired without a response");
            }
            pending.targets()
        };

        let mut chats = HashSet::new();
        for target in targets {
            if !chats.insert(self.platform.chat_key(&target)) {
                continue;
            }
            if let Err(e) = self.platform.send_typing(&target).await {
                debug!(
                    chat = %self.platform.describe_target(&target),
                    error = %e,
                    "typing refresh failed"
                );
            }
        }
    }

    /// Runs until `cancel` fires, then shuts the platform down.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), RelayError> {
        self.store.ensure_dirs().await?;
        let channel = self.platform.channel();
        let caps = self.platform.capabilities();
        info!(
            %channel,
            poll_ms = self.settings.poll_interval.as_millis() as u64,
            typing_secs = caps.typing_interval.as_secs_f32(),
            "channel adapter running"
        );

        let mut poll = tokio::time::interval(self.settings.poll_interval.max(MIN_TICK));
        let mut typing = tokio::time::interval(caps.typing_interval.max(MIN_TICK));
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        typing.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let mut result = Ok(());
        loop {
            tokio::select! {
                inbound = self.platform.receive() => {
                    match inbound {
                        Ok(inbound) => {
                            if let Err(e) = self.handle_inbound(inbound).await {
                                error!(%channel, error = %e, "failed to queue inbound message");
                            }
                        }
                        Err(e) => {
                            error!(%channel, error = %e, "platform receive failed");
                            result = Err(e);
                            break;
                        }
                    }
                }
                _ = poll.tick() => {
                    if let Err(e) = self.poll_outgoing().await {
                        error!(%channel, error = %e, "outgoing poll failed");
                    }
                }
                _ = typing.tick() => {
                    self.refresh_typing().await;
                }
                _ = cancel.cancelled() => {
                    info!(%channel, "shutdown signal received, stopping adapter");
                    break;
                }
            }
        }

        self.platform.shutdown().await?;
        info!(%channel, "channel adapter stopped");
        result
    }
}
