// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generic channel adapter for the tinyrelay message relay.
//!
//! Every chat platform runs the same [`RelayAdapter`]; only the
//! [`ChatPlatform`](tinyrelay_core::ChatPlatform) implementation differs.

pub mod adapter;
pub mod command;
pub mod pending;
pub mod split;

pub use adapter::{AdapterSettings, InboundOutcome, RelayAdapter};
pub use command::{is_reset_command, RESET_REPLY};
pub use pending::{PendingReplyTracker, DEFAULT_PENDING_TTL};
pub use split::split_message;
