// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the relay core and its external collaborators.
//!
//! Both traits use `#[async_trait]`; [`AiBackend`] is used as a trait object
//! by the processor, [`ChatPlatform`] is a generic bound of the channel adapter.

pub mod backend;
pub mod platform;

pub use backend::AiBackend;
pub use platform::ChatPlatform;
