// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message id generation.
//!
//! Ids are `{unix_ms}_{8 random alphanumerics}`. Uniqueness across adapter
//! processes rests on the random suffix; queue filenames additionally carry
//! the channel prefix, so two adapters can only collide within one channel.

use rand::distributions::Alphanumeric;
use rand::Rng;
use tinyrelay_core::MessageId;

/// Length of the random suffix appended to the timestamp.
pub const SUFFIX_LEN: usize = 8;

/// Current time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generates a fresh message id stamped with the current time.
pub fn generate_message_id() -> MessageId {
    message_id_at(now_ms())
}

/// Generates a message id for the given millisecond timestamp.
pub fn message_id_at(timestamp_ms: i64) -> MessageId {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect();
    MessageId(format!("{timestamp_ms}_{suffix}"))
}
