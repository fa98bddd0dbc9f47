// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File-based queue for tinyrelay.
//!
//! The filesystem is the only IPC between channel adapters and the queue
//! processor. This crate owns the directory protocol ([`QueueStore`]), the
//! message id format ([`generate_message_id`]), and the reset sentinel
//! ([`ResetFlag`]).

pub mod ids;
pub mod reset;
pub mod store;

pub use ids::{generate_message_id, now_ms};
pub use reset::ResetFlag;
pub use store::{ClaimedMessage, QueueStats, QueueStore};
