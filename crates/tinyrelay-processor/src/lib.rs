// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue processor for the tinyrelay message relay.
//!
//! - [`QueueProcessor`] drains `incoming/` strictly one message at a time
//! - [`ConversationSession`] decides fresh vs. continued conversation
//! - [`CliBackend`] runs the external AI command
//! - [`HeartbeatTrigger`] injects periodic `system` messages
//! - [`install_signal_handler`] turns SIGINT/SIGTERM into a cancellation token

pub mod backend;
pub mod heartbeat;
pub mod processor;
pub mod session;
pub mod shutdown;

pub use backend::CliBackend;
pub use heartbeat::{system_message, HeartbeatTrigger};
pub use processor::{truncate_reply, ProcessOutcome, ProcessorSettings, QueueProcessor};
pub use session::ConversationSession;
pub use shutdown::install_signal_handler;
