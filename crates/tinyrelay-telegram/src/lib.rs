// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram platform for the tinyrelay channel adapter.
//!
//! Implements [`ChatPlatform`] for the Telegram Bot API via teloxide: long
//! polling feeds authorized direct messages into an mpsc channel, replies
//! quote the original message, and typing uses `sendChatAction`.

pub mod handler;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, ChatId, MessageId as TgMessageId, ReplyParameters};
use tinyrelay_config::model::TelegramConfig;
use tinyrelay_core::{
    Channel, ChatPlatform, InboundText, PlatformCapabilities, RelayError,
};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub use handler::TelegramTarget;

/// Telegram's hard limit on message text length.
pub const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Telegram platform implementing [`ChatPlatform`].
pub struct TelegramPlatform {
    bot: Bot,
    config: TelegramConfig,
    inbound_rx: Mutex<mpsc::Receiver<InboundText<TelegramTarget>>>,
    inbound_tx: mpsc::Sender<InboundText<TelegramTarget>>,
    polling_handle: Mutex<Option<JoinHandle<()>>>,
}

impl TelegramPlatform {
    /// Creates the platform. Requires `telegram.bot_token`.
    pub fn new(config: TelegramConfig) -> Result<Self, RelayError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            RelayError::Config("telegram.bot_token is required for the Telegram adapter".into())
        })?;

        if token.is_empty() {
            return Err(RelayError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        if config.allowed_users.is_empty() {
            warn!("telegram.allowed_users is empty, every message will be rejected");
        }

        let bot = Bot::new(token);
        let (inbound_tx, inbound_rx) = mpsc::channel(100);

        Ok(Self {
            bot,
            config,
            inbound_rx: Mutex::new(inbound_rx),
            inbound_tx,
            polling_handle: Mutex::new(None),
        })
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

fn channel_error(what: &str, e: teloxide::RequestError) -> RelayError {
    RelayError::Channel {
        message: format!("{what}: {e}"),
        source: Some(Box::new(e)),
    }
}

#[async_trait]
impl ChatPlatform for TelegramPlatform {
    type Target = TelegramTarget;

    fn channel(&self) -> Channel {
        Channel::Telegram
    }

    fn capabilities(&self) -> PlatformCapabilities {
        PlatformCapabilities {
            max_message_length: TELEGRAM_MAX_MESSAGE_LENGTH,
            typing_interval: Duration::from_secs(self.config.typing_interval_secs),
            supports_threaded_reply: true,
        }
    }

    async fn connect(&mut self) -> Result<(), RelayError> {
        let mut slot = self.polling_handle.lock().await;
        if slot.is_some() {
            return Ok(());
        }

        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| channel_error("Telegram bot unreachable", e))?;
        info!(bot = %me.username(), "starting Telegram long polling");

        let bot = self.bot.clone();
        let tx = self.inbound_tx.clone();
        let allowed_users: Arc<Vec<String>> = Arc::new(self.config.allowed_users.clone());

        let handle = tokio::spawn(async move {
            let handler = Update::filter_message().endpoint(move |msg: Message| {
                let tx = tx.clone();
                let allowed = allowed_users.clone();
                async move {
                    if !handler::is_dm(&msg) {
                        debug!(chat_id = msg.chat.id.0, "ignoring non-DM message");
                        return respond(());
                    }

                    if !handler::is_authorized(&msg, &allowed) {
                        debug!(chat_id = msg.chat.id.0, "ignoring unauthorized user");
                        return respond(());
                    }

                    match handler::to_inbound(&msg) {
                        Some(inbound) => {
                            if tx.send(inbound).await.is_err() {
                                warn!("inbound channel closed, dropping message");
                            }
                        }
                        None => {
                            debug!(msg_id = msg.id.0, "ignoring non-text message");
                        }
                    }

                    respond(())
                }
            });

            Dispatcher::builder(bot, handler)
                .default_handler(|_| async {})
                .build()
                .dispatch()
                .await;
        });

        *slot = Some(handle);
        Ok(())
    }

    async fn receive(&self) -> Result<InboundText<TelegramTarget>, RelayError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| RelayError::Channel {
            message: "Telegram inbound channel closed".into(),
            source: None,
        })
    }

    async fn send_text(
        &self,
        target: &TelegramTarget,
        text: &str,
        threaded: bool,
    ) -> Result<(), RelayError> {
        let mut request = self.bot.send_message(ChatId(target.chat_id), text);
        if threaded {
            request =
                request.reply_parameters(ReplyParameters::new(TgMessageId(target.message_id)));
        }
        request
            .await
            .map_err(|e| channel_error("failed to send message", e))?;
        Ok(())
    }

    async fn send_typing(&self, target: &TelegramTarget) -> Result<(), RelayError> {
        self.bot
            .send_chat_action(ChatId(target.chat_id), ChatAction::Typing)
            .await
            .map_err(|e| channel_error("failed to send typing indicator", e))?;
        Ok(())
    }

    fn describe_target(&self, target: &TelegramTarget) -> String {
        format!("telegram:{}#{}", target.chat_id, target.message_id)
    }

    fn chat_key(&self, target: &TelegramTarget) -> String {
        target.chat_id.to_string()
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        if let Some(handle) = self.polling_handle.lock().await.take() {
            debug!("stopping Telegram long polling");
            handle.abort();
        }
        Ok(())
    }
}
