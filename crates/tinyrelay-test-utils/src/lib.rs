// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for tinyrelay integration tests.
//!
//! Provides mock collaborators and a temporary queue so the processor and
//! the channel adapter can be exercised without chat platforms or an AI
//! process.
//!
//! # Components
//!
//! - [`MockBackend`] - Scripted AI backend that records every invocation
//! - [`MockPlatform`] - Chat platform with message injection and send capture
//! - [`QueueHarness`] - Temporary queue root with store and reset flag

pub mod harness;
pub mod mock_backend;
pub mod mock_platform;

pub use harness::QueueHarness;
pub use mock_backend::{Invocation, MockBackend};
pub use mock_platform::{MockPlatform, MockTarget, SentText};
