// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Temporary queue root for integration tests.
//!
//! `QueueHarness` owns a temp directory laid out like a relay home
//! (`queue/` plus `reset_flag`) and offers shortcuts for planting and
//! inspecting queue files.

use std::path::{Path, PathBuf};

use tinyrelay_core::{Channel, MessageId, QueueMessage, QueueResponse, RelayError};
use tinyrelay_queue::{QueueStore, ResetFlag};

/// A relay home in a temp directory, removed on drop.
pub struct QueueHarness {
    dir: tempfile::TempDir,
    store: QueueStore,
    reset: ResetFlag,
}

impl QueueHarness {
    /// Create the temp home and the three queue directories.
    pub async fn new() -> Result<Self, RelayError> {
        let dir = tempfile::TempDir::new().map_err(|e| RelayError::queue_io("<tempdir>", e))?;
        let store = QueueStore::new(dir.path().join("queue"));
        store.ensure_dirs().await?;
        let reset = ResetFlag::new(dir.path().join("reset_flag"));
        Ok(Self { dir, store, reset })
    }

    pub fn home(&self) -> &Path {
        self.dir.path()
    }

    pub fn store(&self) -> QueueStore {
        self.store.clone()
    }

    pub fn reset_flag(&self) -> ResetFlag {
        self.reset.clone()
    }

    /// Builds a message with a fixed sender and the given id.
    pub fn message(channel: Channel, id: &str, text: &str) -> QueueMessage {
        QueueMessage {
            channel,
            sender: "Tester".to_string(),
            sender_id: "tester".to_string(),
            message: text.to_string(),
            timestamp: 1_700_000_000_000,
            message_id: MessageId::from(id),
        }
    }

    /// Enqueues a message through the store, as an adapter would.
    pub async fn enqueue(
        &self,
        channel: Channel,
        id: &str,
        text: &str,
    ) -> Result<QueueMessage, RelayError> {
        let msg = Self::message(channel, id, text);
        self.store.enqueue(&msg).await?;
        Ok(msg)
    }

    /// Writes a response straight into `outgoing/`, as the processor would.
    pub async fn plant_response(
        &self,
        channel: Channel,
        id: &str,
        text: &str,
    ) -> Result<PathBuf, RelayError> {
        let msg = Self::message(channel, id, "original");
        let response = QueueResponse::reply_to(&msg, text.to_string(), 1_700_000_000_500);
        let path = self.store.outgoing_dir().join(response.file_name());
        let bytes = serde_json::to_vec_pretty(&response)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| RelayError::queue_io(&path, e))?;
        Ok(path)
    }

    pub fn incoming_files(&self) -> Vec<String> {
        sorted_names(self.store.incoming_dir())
    }

    pub fn processing_files(&self) -> Vec<String> {
        sorted_names(self.store.processing_dir())
    }

    pub fn outgoing_files(&self) -> Vec<String> {
        sorted_names(self.store.outgoing_dir())
    }

    /// Reads and decodes `outgoing/{name}`.
    pub fn read_outgoing(&self, name: &str) -> Result<QueueResponse, RelayError> {
        let path = self.store.outgoing_dir().join(name);
        let bytes = std::fs::read(&path).map_err(|e| RelayError::queue_io(&path, e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn sorted_names(dir: &Path) -> Vec<String> {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn harness_lays_out_relay_home() {
        let harness = QueueHarness::new().await.unwrap();
        assert!(harness.home().join("queue/incoming").is_dir());
        assert!(harness.home().join("queue/processing").is_dir());
        assert!(harness.home().join("queue/outgoing").is_dir());
        assert_eq!(harness.reset_flag().path(), harness.home().join("reset_flag"));
    }

    #[tokio::test]
    async fn plant_and_read_response() {
        let harness = QueueHarness::new().await.unwrap();
        harness.enqueue(Channel::Telegram, "T1", "hi").await.unwrap();
        harness
            .plant_response(Channel::Discord, "D1", "hello")
            .await
            .unwrap();

        assert_eq!(harness.incoming_files(), vec!["telegram_T1.json"]);
        assert_eq!(harness.outgoing_files(), vec!["discord_D1.json"]);
        let response = harness.read_outgoing("discord_D1.json").unwrap();
        assert_eq!(response.message, "hello");
        assert_eq!(response.message_id, MessageId::from("D1"));
    }
}
