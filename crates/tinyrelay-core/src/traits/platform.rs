// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability interface a chat platform exposes to the generic channel adapter.

use std::fmt;

use async_trait::async_trait;

use crate::error::RelayError;
use crate::types::{Channel, InboundText, PlatformCapabilities};

/// A chat platform (Telegram, Discord, WhatsApp) seen through the narrow
/// interface the relay needs: receive text, send text, show typing, and
/// describe where a reply goes.
#[async_trait]
pub trait ChatPlatform: Send + Sync + 'static {
    /// Everything needed to address a reply back to the originating chat.
    type Target: Clone + fmt::Debug + Send + Sync + 'static;

    /// The queue channel this platform writes under.
    fn channel(&self) -> Channel;

    /// Returns the capabilities supported by this platform.
    fn capabilities(&self) -> PlatformCapabilities;

    /// Establishes the connection to the platform and starts receiving events.
    async fn connect(&mut self) -> Result<(), RelayError>;

    /// Receives the next inbound text message.
    async fn receive(&self) -> Result<InboundText<Self::Target>, RelayError>;

    /// Sends `text` to the chat behind `target`.
    ///
    /// When `threaded` is true and the platform supports it, the message is
    /// sent as a reply to the original inbound message.
    async fn send_text(
        &self,
        target: &Self::Target,
        text: &str,
        threaded: bool,
    ) -> Result<(), RelayError>;

    /// Shows a typing indicator in the chat behind `target`.
    async fn send_typing(&self, target: &Self::Target) -> Result<(), RelayError>;

    /// Short description of `target` for logs.
    fn describe_target(&self, target: &Self::Target) -> String;

    /// Identifies the chat behind `target`, ignoring which message it
    /// points at. Targets with equal keys share one typing indicator.
    fn chat_key(&self, target: &Self::Target) -> String {
        self.describe_target(target)
    }

    /// Releases platform resources.
    async fn shutdown(&self) -> Result<(), RelayError> {
        Ok(())
    }
}
