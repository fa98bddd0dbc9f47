// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic proactive check-ins.
//!
//! The [`HeartbeatTrigger`] enqueues a synthetic message from the `system`
//! channel on a fixed interval so the AI can act without user input. The
//! processor handles it like any other message. No chat adapter listens on
//! `system`, so the trigger also drains `system_*` replies from `outgoing/`
//! and logs them.

use std::time::Duration;

use tinyrelay_config::model::HeartbeatConfig;
use tinyrelay_core::{Channel, MessageId, QueueMessage, RelayError};
use tinyrelay_queue::{generate_message_id, now_ms, QueueStore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Sender name recorded on heartbeat messages.
pub const HEARTBEAT_SENDER: &str = "Heartbeat";

/// Longest reply excerpt written to the log when draining.
const LOG_EXCERPT_CHARS: usize = 200;

/// Builds a message on the `system` channel.
pub fn system_message(sender: &str, text: &str) -> QueueMessage {
    QueueMessage {
        channel: Channel::System,
        sender: sender.to_string(),
        sender_id: sender.to_lowercase(),
        message: text.to_string(),
        timestamp: now_ms(),
        message_id: generate_message_id(),
    }
}

/// Enqueues heartbeat prompts and drains their replies.
#[derive(Debug, Clone)]
pub struct HeartbeatTrigger {
    store: QueueStore,
    prompt: String,
    interval: Duration,
    drain_interval: Duration,
}

impl HeartbeatTrigger {
    pub fn new(store: QueueStore, prompt: impl Into<String>, interval: Duration) -> Self {
        Self {
            store,
            prompt: prompt.into(),
            interval,
            drain_interval: Duration::from_secs(1),
        }
    }

    pub fn from_config(store: QueueStore, config: &HeartbeatConfig) -> Self {
        Self::new(store, config.prompt.clone(), config.interval())
    }

    /// How often `outgoing/` is checked for heartbeat replies.
    pub fn with_drain_interval(mut self, drain_interval: Duration) -> Self {
        self.drain_interval = drain_interval;
        self
    }

    /// Enqueues one heartbeat message.
    pub async fn fire(&self) -> Result<MessageId, RelayError> {
        let msg = system_message(HEARTBEAT_SENDER, &self.prompt);
        self.store.enqueue(&msg).await?;
        info!(message_id = %msg.message_id, "heartbeat enqueued");
        Ok(msg.message_id)
    }

    /// Consumes every `system_*` file in `outgoing/`, logging each reply.
    /// Returns how many files were consumed.
    pub async fn drain_responses(&self) -> Result<usize, RelayError> {
        let files = self.store.list_outgoing(Channel::System).await?;
        let mut drained = 0;
        for path in files {
            match self.store.read_response(&path).await {
                Ok(response) => {
                    let excerpt: String =
                        response.message.chars().take(LOG_EXCERPT_CHARS).collect();
                    info!(
                        message_id = %response.message_id,
                        sender = %response.sender,
                        reply = %excerpt,
                        "system reply received"
                    );
                }
                Err(e) if e.is_not_found() => continue,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "discarding unreadable system reply"
                    );
                }
            }
            self.store.remove(&path).await?;
            drained += 1;
        }
        Ok(drained)
    }

    /// Fires every `interval` (first after one full interval) and drains
    /// replies every `drain_interval`, until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), RelayError> {
        self.store.ensure_dirs().await?;
        info!(interval_secs = self.interval.as_secs(), "heartbeat running");

        let start = tokio::time::Instant::now();
        let mut beat = tokio::time::interval_at(start + self.interval, self.interval);
        let mut drain = tokio::time::interval(self.drain_interval);
        beat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        drain.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = beat.tick() => {
                    if let Err(e) = self.fire().await {
                        warn!(error = %e, "failed to enqueue heartbeat");
                    }
                }
                _ = drain.tick() => {
                    match self.drain_responses().await {
                        Ok(0) => {}
                        Ok(n) => debug!(count = n, "drained system replies"),
                        Err(e) => warn!(error = %e, "failed to drain system replies"),
                    }
                }
                _ = cancel.cancelled() => {
                    info!("heartbeat stopped");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinyrelay_core::QueueResponse;

    async fn trigger() -> (HeartbeatTrigger, QueueStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = QueueStore::new(dir.path());
        store.ensure_dirs().await.unwrap();
        let trigger = HeartbeatTrigger::new(store.clone(), "status?", Duration::from_secs(60));
        (trigger, store, dir)
    }

    #[test]
    fn system_message_uses_system_channel() {
        let msg = system_message("Heartbeat", "ping");
        assert_eq!(msg.channel, Channel::System);
        assert_eq!(msg.sender_id, "heartbeat");
        assert!(msg.file_name().starts_with("system_"));
    }

    #[tokio::test]
    async fn fire_enqueues_prompt() {
        let (trigger, store, _dir) = trigger().await;
        let id = trigger.fire().await.unwrap();

        let pending = store.pending_incoming().await.unwrap();
        assert_eq!(pending.len(), 1);
        let claimed = store.claim(&pending[0]).await.unwrap().unwrap();
        let msg = store.read_claimed(&claimed).await.unwrap();
        assert_eq!(msg.message_id, id);
        assert_eq!(msg.message, "status?");
        assert_eq!(msg.sender, HEARTBEAT_SENDER);
    }

    #[tokio::test]
    async fn drain_consumes_only_system_replies() {
        let (trigger, store, _dir) = trigger().await;
        let sys = system_message(HEARTBEAT_SENDER, "status?");
        let mut tg = system_message("Alice", "hi");
        tg.channel = Channel::Telegram;
        for msg in [&sys, &tg] {
            let bytes = serde_json::to_vec(&QueueResponse::reply_to(msg, "ok".into(), 0)).unwrap();
            std::fs::write(store.outgoing_dir().join(msg.file_name()), bytes).unwrap();
        }
        std::fs::write(store.outgoing_dir().join("system_broken.json"), "nope").unwrap();

        assert_eq!(trigger.drain_responses().await.unwrap(), 2);
        assert!(store.list_outgoing(Channel::System).await.unwrap().is_empty());
        assert_eq!(store.list_outgoing(Channel::Telegram).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn run_fires_after_interval_and_stops_on_cancel() {
        let (trigger, store, _dir) = trigger().await;
        let trigger = trigger.with_drain_interval(Duration::from_millis(50));
        let trigger = HeartbeatTrigger {
            interval: Duration::from_millis(300),
            ..trigger
        };
        let cancel = CancellationToken::new();
        let handle = {
            let trigger = trigger.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { trigger.run(cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.stats().await.unwrap().incoming, 0);

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(store.stats().await.unwrap().incoming, 1);

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }
}
