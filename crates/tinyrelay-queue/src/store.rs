// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Directory-backed queue store.
//!
//! Three sibling directories under one root encode ownership:
//!
//! - `incoming/`: written by adapters, claimed by the processor.
//! - `processing/`: owned by the processor while the AI runs.
//! - `outgoing/`: written by the processor, consumed by adapters.
//!
//! Moving a file between stages is always a single `rename`, so a file is
//! never visible in two stages or in none. New files are published through a
//! hidden temp name in the destination directory and renamed into place;
//! listings skip those temp names.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tinyrelay_core::{Channel, QueueMessage, QueueResponse, RelayError};
use tracing::{debug, info, warn};

const INCOMING: &str = "incoming";
const PROCESSING: &str = "processing";
const OUTGOING: &str = "outgoing";

/// A message file the processor has moved into `processing/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedMessage {
    /// Path inside `processing/`.
    pub path: PathBuf,
    /// Bare file name, identical in every stage.
    pub file_name: String,
}

/// Number of queue files currently in each stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub incoming: usize,
    pub processing: usize,
    pub outgoing: usize,
}

/// Handle to the queue directories under one root.
#[derive(Debug, Clone)]
pub struct QueueStore {
    root: PathBuf,
    incoming: PathBuf,
    processing: PathBuf,
    outgoing: PathBuf,
}

impl QueueStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            root: root.to_path_buf(),
            incoming: root.join(INCOMING),
            processing: root.join(PROCESSING),
            outgoing: root.join(OUTGOING),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn incoming_dir(&self) -> &Path {
        &self.incoming
    }

    pub fn processing_dir(&self) -> &Path {
        &self.processing
    }

    pub fn outgoing_dir(&self) -> &Path {
        &self.outgoing
    }

    /// Creates the three stage directories if they are missing.
    pub async fn ensure_dirs(&self) -> Result<(), RelayError> {
        for dir in [&self.incoming, &self.processing, &self.outgoing] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| RelayError::queue_io(dir, e))?;
        }
        Ok(())
    }

    /// Publishes `msg` into `incoming/` and returns its final path.
    pub async fn enqueue(&self, msg: &QueueMessage) -> Result<PathBuf, RelayError> {
        let bytes = serde_json::to_vec_pretty(msg)?;
        let path = publish(&self.incoming, &msg.file_name(), &bytes).await?;
        debug!(
            message_id = %msg.message_id,
            channel = %msg.channel,
            "message enqueued"
        );
        Ok(path)
    }

    /// Lists `incoming/` in arrival order: oldest modification time first,
    /// ties broken by the timestamp embedded in the message id, then by
    /// file name.
    ///
    /// Coarse filesystems give files written within the same second equal
    /// mtimes, so the id timestamp decides before the channel prefix can.
    pub async fn pending_incoming(&self) -> Result<Vec<PathBuf>, RelayError> {
        let mut entries: Vec<(SystemTime, i64, String, PathBuf)> = Vec::new();
        for (name, path) in list_queue_files(&self.incoming).await? {
            let modified = match tokio::fs::metadata(&path).await {
                Ok(meta) => meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                // Claimed by someone else between listing and stat.
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(RelayError::queue_io(&path, e)),
            };
            let id_ms = id_timestamp_ms(&name).unwrap_or(i64::MAX);
            entries.push((modified, id_ms, name, path));
        }
        entries.sort();
        Ok(entries.into_iter().map(|(_, _, _, path)| path).collect())
    }

    /// Claims an incoming file by renaming it into `processing/`.
    ///
    /// Returns `None` when the file is already gone.
    pub async fn claim(&self, incoming_path: &Path) -> Result<Option<ClaimedMessage>, RelayError> {
        let Some(file_name) = incoming_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
        else {
            return Err(RelayError::Internal(format!(
                "queue path has no file name: {}",
                incoming_path.display()
            )));
        };

        let path = self.processing.join(&file_name);
        match tokio::fs::rename(incoming_path, &path).await {
            Ok(()) => Ok(Some(ClaimedMessage { path, file_name })),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %incoming_path.display(), "file vanished before claim");
                Ok(None)
            }
            Err(e) => Err(RelayError::queue_io(incoming_path, e)),
        }
    }

    /// Reads and decodes a claimed message.
    pub async fn read_claimed(&self, claimed: &ClaimedMessage) -> Result<QueueMessage, RelayError> {
        let bytes = tokio::fs::read(&claimed.path)
            .await
            .map_err(|e| RelayError::queue_io(&claimed.path, e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Publishes `response` to `outgoing/` and returns its final path.
    pub async fn publish_response(&self, response: &QueueResponse) -> Result<PathBuf, RelayError> {
        let bytes = serde_json::to_vec_pretty(response)?;
        publish(&self.outgoing, &response.file_name(), &bytes).await
    }

    /// Deletes a claimed file without producing a response.
    pub async fn discard(&self, claimed: ClaimedMessage) -> Result<(), RelayError> {
        self.remove(&claimed.path).await
    }

    /// Lists `outgoing/` files addressed to `channel`, by file name.
    pub async fn list_outgoing(&self, channel: Channel) -> Result<Vec<PathBuf>, RelayError> {
        let prefix = channel.file_prefix();
        let mut files: Vec<(String, PathBuf)> = list_queue_files(&self.outgoing)
            .await?
            .into_iter()
            .filter(|(name, _)| name.starts_with(&prefix))
            .collect();
        files.sort();
        Ok(files.into_iter().map(|(_, path)| path).collect())
    }

    pub async fn read_response(&self, path: &Path) -> Result<QueueResponse, RelayError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| RelayError::queue_io(path, e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Deletes a queue file. A file that is already gone is not an error.
    pub async fn remove(&self, path: &Path) -> Result<(), RelayError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RelayError::queue_io(path, e)),
        }
    }

    /// Moves files left in `processing/` by a crashed processor back into
    /// `incoming/` so they are retried. Returns how many were recovered.
    pub async fn recover_orphans(&self) -> Result<usize, RelayError> {
        let mut recovered = 0;
        for (name, path) in list_queue_files(&self.processing).await? {
            let target = self.incoming.join(&name);
            match tokio::fs::rename(&path, &target).await {
                Ok(()) => {
                    info!(file = %name, "recovered orphaned message from processing");
                    recovered += 1;
                }
                Err(e) => {
                    warn!(file = %name, error = %e, "failed to recover orphaned message");
                }
            }
        }
        Ok(recovered)
    }

    pub async fn stats(&self) -> Result<QueueStats, RelayError> {
        Ok(QueueStats {
            incoming: list_queue_files(&self.incoming).await?.len(),
            processing: list_queue_files(&self.processing).await?.len(),
            outgoing: list_queue_files(&self.outgoing).await?.len(),
        })
    }
}

/// Milliseconds from a `{channel}_{ms}_{suffix}.json` file name.
fn id_timestamp_ms(name: &str) -> Option<i64> {
    let (_, id) = name.strip_suffix(".json")?.split_once('_')?;
    id.split('_').next()?.parse().ok()
}

/// Whether `name` is a published queue file (not a temp file, not foreign).
fn is_queue_file(name: &str) -> bool {
    !name.starts_with('.') && name.ends_with(".json")
}

/// Lists published queue files in `dir` as `(file name, path)` pairs.
///
/// A missing directory lists as empty.
async fn list_queue_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, RelayError> {
    let mut read_dir = match tokio::fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(RelayError::queue_io(dir, e)),
    };

    let mut files = Vec::new();
    while let Some(entry) = read_dir
        .next_entry()
        .await
        .map_err(|e| RelayError::queue_io(dir, e))?
    {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if is_queue_file(&name) {
            files.push((name, entry.path()));
        }
    }
    Ok(files)
}

/// Writes `bytes` to `dir/.{name}.tmp`, then renames it to `dir/{name}`.
async fn publish(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, RelayError> {
    let tmp = dir.join(format!(".{name}.tmp"));
    let dest = dir.join(name);
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| RelayError::queue_io(&tmp, e))?;
    if let Err(e) = tokio::fs::rename(&tmp, &dest).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(RelayError::queue_io(&dest, e));
    }
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinyrelay_core::MessageId;

    fn message(channel: Channel, id: &str, text: &str) -> QueueMessage {
        QueueMessage {
            channel,
            sender: "Alice".into(),
            sender_id: "42".into(),
            message: text.into(),
            timestamp: 1_700_000_000_000,
            message_id: MessageId::from(id),
        }
    }

    async fn store() -> (QueueStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = QueueStore::new(dir.path().join("queue"));
        store.ensure_dirs().await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn enqueue_writes_named_json() {
        let (store, _dir) = store().await;
        let msg = message(Channel::Telegram, "T1", "hello");
        let path = store.enqueue(&msg).await.unwrap();

        assert_eq!(path, store.incoming_dir().join("telegram_T1.json"));
        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["messageId"], "T1");
        assert_eq!(raw["senderId"], "42");

        let leftovers: Vec<_> = std::fs::read_dir(store.incoming_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1, "temp file must not survive publish");
    }

    #[tokio::test]
    async fn pending_incoming_orders_by_arrival_not_channel() {
        let (store, _dir) = store().await;
        store
            .enqueue(&message(Channel::Telegram, "T1", "first"))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        store
            .enqueue(&message(Channel::Discord, "D1", "second"))
            .await
            .unwrap();

        let pending = store.pending_incoming().await.unwrap();
        let names: Vec<_> = pending
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["telegram_T1.json", "discord_D1.json"]);
    }

    #[tokio::test]
    async fn equal_mtimes_fall_back_to_id_timestamp() {
        let (store, _dir) = store().await;
        let telegram = store
            .enqueue(&message(Channel::Telegram, "1700000000000_aaaaaaaa", "first"))
            .await
            .unwrap();
        let discord = store
            .enqueue(&message(Channel::Discord, "1700000000010_bbbbbbbb", "second"))
            .await
            .unwrap();

        let same_second = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_700_000_000);
        for path in [&telegram, &discord] {
            std::fs::File::options()
                .write(true)
                .open(path)
                .unwrap()
                .set_modified(same_second)
                .unwrap();
        }

        assert_eq!(store.pending_incoming().await.unwrap(), vec![telegram, discord]);
    }

    #[test]
    fn id_timestamp_parses_leading_millis() {
        assert_eq!(
            id_timestamp_ms("telegram_1700000000000_k3j9x2ab.json"),
            Some(1_700_000_000_000)
        );
        assert_eq!(id_timestamp_ms("discord_D1.json"), None);
        assert_eq!(id_timestamp_ms("system.json"), None);
    }

    #[tokio::test]
    async fn listings_skip_temp_and_foreign_files() {
        let (store, _dir) = store().await;
        std::fs::write(store.incoming_dir().join(".telegram_X.json.tmp"), "{").unwrap();
        std::fs::write(store.incoming_dir().join("notes.txt"), "hi").unwrap();
        assert!(store.pending_incoming().await.unwrap().is_empty());
        assert_eq!(store.stats().await.unwrap(), QueueStats::default());
    }

    #[tokio::test]
    async fn claim_moves_file_and_second_claim_is_none() {
        let (store, _dir) = store().await;
        let path = store
            .enqueue(&message(Channel::Whatsapp, "W1", "hey"))
            .await
            .unwrap();

        let claimed = store.claim(&path).await.unwrap().unwrap();
        assert_eq!(claimed.file_name, "whatsapp_W1.json");
        assert!(!path.exists());
        assert!(claimed.path.starts_with(store.processing_dir()));
        assert_eq!(store.read_claimed(&claimed).await.unwrap().message, "hey");

        assert!(store.claim(&path).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn publish_then_discard_releases_claim() {
        let (store, _dir) = store().await;
        let msg = message(Channel::Discord, "D1", "hi");
        let path = store.enqueue(&msg).await.unwrap();
        let claimed = store.claim(&path).await.unwrap().unwrap();
        let processing_path = claimed.path.clone();

        let response = QueueResponse::reply_to(&msg, "hello back".into(), 1);
        let out = store.publish_response(&response).await.unwrap();
        store.discard(claimed).await.unwrap();

        assert_eq!(out, store.outgoing_dir().join("discord_D1.json"));
        assert!(!processing_path.exists());
        let read = store.read_response(&out).await.unwrap();
        assert_eq!(read.message_id, msg.message_id);
        assert_eq!(read.original_message, "hi");
    }

    #[tokio::test]
    async fn list_outgoing_filters_by_channel_prefix() {
        let (store, _dir) = store().await;
        for (channel, id) in [
            (Channel::Discord, "D2"),
            (Channel::Telegram, "T1"),
            (Channel::Discord, "D1"),
        ] {
            let msg = message(channel, id, "x");
            let bytes = serde_json::to_vec(&QueueResponse::reply_to(&msg, "y".into(), 0)).unwrap();
            std::fs::write(store.outgoing_dir().join(msg.file_name()), bytes).unwrap();
        }

        let discord = store.list_outgoing(Channel::Discord).await.unwrap();
        assert_eq!(
            discord,
            vec![
                store.outgoing_dir().join("discord_D1.json"),
                store.outgoing_dir().join("discord_D2.json"),
            ]
        );
        assert!(store.list_outgoing(Channel::System).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_claim_reports_serialization_error() {
        let (store, _dir) = store().await;
        let path = store.incoming_dir().join("telegram_bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let claimed = store.claim(&path).await.unwrap().unwrap();
        let err = store.read_claimed(&claimed).await.unwrap_err();
        assert!(matches!(err, RelayError::Serialization { .. }));
    }

    #[tokio::test]
    async fn recover_orphans_returns_files_to_incoming() {
        let (store, _dir) = store().await;
        let path = store
            .enqueue(&message(Channel::Telegram, "T9", "stuck"))
            .await
            .unwrap();
        store.claim(&path).await.unwrap().unwrap();

        assert_eq!(store.recover_orphans().await.unwrap(), 1);
        assert!(path.exists());
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.incoming, 1);
        assert_eq!(stats.processing, 0);
    }

    #[tokio::test]
    async fn remove_tolerates_missing_file() {
        let (store, _dir) = store().await;
        store
            .remove(&store.outgoing_dir().join("discord_gone.json"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn missing_directories_list_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = QueueStore::new(dir.path().join("never-created"));
        assert!(store.pending_incoming().await.unwrap().is_empty());
        assert_eq!(store.stats().await.unwrap(), QueueStats::default());
    }
}
