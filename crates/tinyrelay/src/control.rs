// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot operator commands: `reset` and `send`.

use tinyrelay_config::RelayConfig;
use tinyrelay_core::{MessageId, RelayError};
use tinyrelay_processor::system_message;
use tinyrelay_queue::{QueueStore, ResetFlag};
use tracing::info;

/// Sender name recorded on messages enqueued with `tinyrelay send`.
const OPERATOR_SENDER: &str = "Operator";

/// `tinyrelay reset`: the next processed message starts a fresh conversation.
pub async fn run_reset(config: &RelayConfig) -> Result<(), RelayError> {
    let flag = ResetFlag::new(config.relay.reset_flag_path());
    flag.set().await?;
    info!(path = %flag.path().display(), "reset flag set");
    println!("Conversation will reset on the next message.");
    Ok(())
}

/// `tinyrelay send <text>`: enqueue `text` on the system channel.
pub async fn run_send(config: &RelayConfig, text: &str) -> Result<(), RelayError> {
    let id = enqueue_system(&QueueStore::new(config.relay.queue_root()), text).await?;
    println!("queued: {id}");
    Ok(())
}

async fn enqueue_system(store: &QueueStore, text: &str) -> Result<MessageId, RelayError> {
    if text.trim().is_empty() {
        return Err(RelayError::Config("message text must not be empty".into()));
    }
    store.ensure_dirs().await?;
    let msg = system_message(OPERATOR_SENDER, text);
    store.enqueue(&msg).await?;
    Ok(msg.message_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_enqueues_operator_message() {
        let dir = tempfile::tempdir().unwrap();
        let store = QueueStore::new(dir.path().join("queue"));

        let id = enqueue_system(&store, "check the logs").await.unwrap();

        let pending = store.pending_incoming().await.unwrap();
        assert_eq!(pending.len(), 1);
        let raw = std::fs::read_to_string(&pending[0]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["channel"], "system");
        assert_eq!(value["sender"], "Operator");
        assert_eq!(value["message"], "check the logs");
        assert_eq!(value["messageId"], id.as_str());
    }

    #[tokio::test]
    async fn send_rejects_blank_text() {
        let dir = tempfile::tempdir().unwrap();
        let store = QueueStore::new(dir.path().join("queue"));
        assert!(enqueue_system(&store, "   ").await.is_err());
        assert!(store.pending_incoming().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reset_sets_flag_under_home() {
        let dir = tempfile::tempdir().unwrap();
        let toml = format!("[relay]\nhome = {:?}\n", dir.path().display().to_string());
        let config = tinyrelay_config::load_and_validate_str(&toml).unwrap();

        run_reset(&config).await.unwrap();
        assert!(dir.path().join("reset_flag").exists());
    }
}
