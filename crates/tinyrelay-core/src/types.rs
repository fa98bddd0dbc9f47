// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue wire format and common types shared by the processor and adapters.
//!
//! [`QueueMessage`] and [`QueueResponse`] are serialized with camelCase keys;
//! they are the on-disk protocol between independently running processes.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Chat platform a queue entry originated from.
///
/// `System` is the synthetic channel used by the heartbeat trigger and the
/// `send` CLI command; no chat adapter listens on it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Channel {
    Discord,
    Whatsapp,
    Telegram,
    System,
}

impl Channel {
    /// Filename prefix for queue files of this channel, e.g. `telegram_`.
    pub fn file_prefix(&self) -> String {
        format!("{self}_")
    }
}

/// Internal message identifier, the join key between incoming and outgoing files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Returns the queue filename for a channel/id pair: `{channel}_{messageId}.json`.
pub fn queue_file_name(channel: Channel, message_id: &MessageId) -> String {
    format!("{channel}_{message_id}.json")
}

/// A message written by an adapter into `incoming/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueMessage {
    pub channel: Channel,
    pub sender: String,
    pub sender_id: String,
    pub message: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub message_id: MessageId,
}

impl QueueMessage {
    pub fn file_name(&self) -> String {
        queue_file_name(self.channel, &self.message_id)
    }
}

/// A reply written by the processor into `outgoing/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueResponse {
    pub channel: Channel,
    pub sender: String,
    /// Reply text produced by the AI process (or the error notice).
    pub message: String,
    pub original_message: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub message_id: MessageId,
}

impl QueueResponse {
    /// Builds the response for `msg`, carrying over its id, channel and sender.
    pub fn reply_to(msg: &QueueMessage, text: String, timestamp: i64) -> Self {
        Self {
            channel: msg.channel,
            sender: msg.sender.clone(),
            message: text,
            original_message: msg.message.clone(),
            timestamp,
            message_id: msg.message_id.clone(),
        }
    }

    pub fn file_name(&self) -> String {
        queue_file_name(self.channel, &self.message_id)
    }
}

/// Whether an AI invocation continues the shared conversation or starts over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SessionMode {
    /// Start a new conversation (after a reset).
    Fresh,
    /// Continue the existing conversation.
    Continue,
}

/// A text message received from a chat platform, before it is queued.
///
/// `T` is the platform's reply target: everything needed to address a reply
/// back to the originating chat (chat id, optional message to reply to).
#[derive(Debug, Clone)]
pub struct InboundText<T> {
    /// Display name of the sender.
    pub sender: String,
    /// Stable platform user id of the sender.
    pub sender_id: String,
    pub text: String,
    pub reply_target: T,
}

/// Capabilities reported by a chat platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformCapabilities {
    /// Longest text the platform accepts in a single message.
    pub max_message_length: usize,
    /// How often the typing indicator must be re-sent before it expires.
    pub typing_interval: std::time::Duration,
    /// Whether replies can quote/thread onto the original inbound message.
    pub supports_threaded_reply: bool,
}
