// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat platform for deterministic adapter tests.
//!
//! `MockPlatform` implements `ChatPlatform` with injectable inbound messages
//! and captured sends and typing indicators for assertion in tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use tinyrelay_core::{Channel, ChatPlatform, InboundText, PlatformCapabilities, RelayError};

/// Reply target on the mock platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MockTarget {
    pub chat_id: String,
    pub message_id: Option<u64>,
}

impl MockTarget {
    pub fn new(chat_id: &str, message_id: u64) -> Self {
        Self {
            chat_id: chat_id.to_string(),
            message_id: Some(message_id),
        }
    }
}

/// A text captured from [`ChatPlatform::send_text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentText {
    pub target: MockTarget,
    pub text: String,
    pub threaded: bool,
}

/// A mock chat platform.
///
/// Clones share all queues, so a test can keep one clone for injection and
/// assertions while the adapter owns another.
#[derive(Clone)]
pub struct MockPlatform {
    channel: Channel,
    capabilities: PlatformCapabilities,
    inbound: Arc<Mutex<VecDeque<InboundText<MockTarget>>>>,
    notify: Arc<Notify>,
    sent: Arc<Mutex<Vec<SentText>>>,
    typing: Arc<Mutex<Vec<MockTarget>>>,
    fail_sends: Arc<AtomicBool>,
}

impl MockPlatform {
    /// Create a mock platform writing under `channel`.
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            capabilities: PlatformCapabilities {
                max_message_length: 4096,
                typing_interval: Duration::from_millis(50),
                supports_threaded_reply: true,
            },
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            notify: Arc::new(Notify::new()),
            sent: Arc::new(Mutex::new(Vec::new())),
            typing: Arc::new(Mutex::new(Vec::new())),
            fail_sends: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_capabilities(mut self, capabilities: PlatformCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Inject an inbound text; the next `receive()` returns it.
    pub async fn inject(&self, sender: &str, text: &str, target: MockTarget) {
        self.inbound.lock().await.push_back(InboundText {
            sender: sender.to_string(),
            sender_id: sender.to_lowercase(),
            text: text.to_string(),
            reply_target: target,
        });
        self.notify.notify_one();
    }

    /// Make every subsequent send and typing call fail.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<SentText> {
        self.sent.lock().await.clone()
    }

    pub async fn typing_count(&self) -> usize {
        self.typing.lock().await.len()
    }

    fn check_failure(&self) -> Result<(), RelayError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(RelayError::Channel {
                message: "mock send failure".to_string(),
                source: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChatPlatform for MockPlatform {
    type Target = MockTarget;

    fn channel(&self) -> Channel {
        self.channel
    }

    fn capabilities(&self) -> PlatformCapabilities {
        self.capabilities.clone()
    }

    async fn connect(&mut self) -> Result<(), RelayError> {
        Ok(())
    }

    async fn receive(&self) -> Result<InboundText<MockTarget>, RelayError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(msg) = queue.pop_front() {
                    return Ok(msg);
                }
            }
            self.notify.notified().await;
        }
    }

    async fn send_text(
        &self,
        target: &MockTarget,
        text: &str,
        threaded: bool,
    ) -> Result<(), RelayError> {
        self.check_failure()?;
        self.sent.lock().await.push(SentText {
            target: target.clone(),
            text: text.to_string(),
            threaded,
        });
        Ok(())
    }

    async fn send_typing(&self, target: &MockTarget) -> Result<(), RelayError> {
        self.check_failure()?;
        self.typing.lock().await.push(target.clone());
        Ok(())
    }

    fn describe_target(&self, target: &MockTarget) -> String {
        match target.message_id {
            Some(id) => format!("mock:{}#{id}", target.chat_id),
            None => format!("mock:{}", target.chat_id),
        }
    }

    fn chat_key(&self, target: &MockTarget) -> String {
        target.chat_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inject_and_receive() {
        let platform = MockPlatform::new(Channel::Telegram);
        platform.inject("Alice", "hello", MockTarget::new("c1", 7)).await;
        let msg = platform.receive().await.unwrap();
        assert_eq!(msg.text, "hello");
        assert_eq!(msg.sender_id, "alice");
        assert_eq!(msg.reply_target.message_id, Some(7));
    }

    #[tokio::test]
    async fn captures_sends_and_honors_failure_switch() {
        let platform = MockPlatform::new(Channel::Discord);
        let target = MockTarget::new("c1", 1);
        platform.send_text(&target, "hi", true).await.unwrap();
        platform.fail_sends(true);
        assert!(platform.send_text(&target, "again", false).await.is_err());
        assert!(platform.send_typing(&target).await.is_err());

        let sent = platform.sent().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].threaded);
        assert_eq!(platform.describe_target(&target), "mock:c1#1");
    }
}
