// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discord platform for the tinyrelay channel adapter.
//!
//! Implements [`ChatPlatform`] via serenity. The gateway client runs in a
//! background task and forwards DMs through [`handler::RelayHandler`];
//! replies and typing go through the REST client.

pub mod handler;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serenity::all::{ChannelId, Client, CreateMessage, Http, MessageId, ShardManager};
use tinyrelay_config::model::DiscordConfig;
use tinyrelay_core::{Channel, ChatPlatform, InboundText, PlatformCapabilities, RelayError};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub use handler::DiscordTarget;

/// Discord's limit on message content length.
pub const DISCORD_MAX_MESSAGE_LENGTH: usize = 2000;

/// Discord platform implementing [`ChatPlatform`].
pub struct DiscordPlatform {
    token: String,
    config: DiscordConfig,
    http: Arc<Http>,
    inbound_rx: Mutex<mpsc::Receiver<InboundText<DiscordTarget>>>,
    inbound_tx: mpsc::Sender<InboundText<DiscordTarget>>,
    shard_manager: Mutex<Option<Arc<ShardManager>>>,
    client_handle: Mutex<Option<JoinHandle<()>>>,
}

impl DiscordPlatform {
    /// Creates the platform. Requires `discord.bot_token`.
    pub fn new(config: DiscordConfig) -> Result<Self, RelayError> {
        let token = match config.bot_token.as_deref() {
            Some(token) if !token.trim().is_empty() => token.to_string(),
            Some(_) => {
                return Err(RelayError::Config(
                    "discord.bot_token cannot be empty".into(),
                ));
            }
            None => {
                return Err(RelayError::Config(
                    "discord.bot_token is required for the Discord adapter".into(),
                ));
            }
        };

        if config.allowed_users.is_empty() {
            warn!("discord.allowed_users is empty, every message will be rejected");
        }

        let http = Arc::new(Http::new(&token));
        let (inbound_tx, inbound_rx) = mpsc::channel(100);

        Ok(Self {
            token,
            config,
            http,
            inbound_rx: Mutex::new(inbound_rx),
            inbound_tx,
            shard_manager: Mutex::new(None),
            client_handle: Mutex::new(None),
        })
    }
}

fn channel_error(what: &str, e: serenity::Error) -> RelayError {
    RelayError::Channel {
        message: format!("{what}: {e}"),
        source: Some(Box::new(e)),
    }
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    type Target = DiscordTarget;

    fn channel(&self) -> Channel {
        Channel::Discord
    }

    fn capabilities(&self) -> PlatformCapabilities {
        PlatformCapabilities {
            max_message_length: DISCORD_MAX_MESSAGE_LENGTH,
            typing_interval: Duration::from_secs(self.config.typing_interval_secs),
            supports_threaded_reply: true,
        }
    }

    async fn connect(&mut self) -> Result<(), RelayError> {
        let mut handle_slot = self.client_handle.lock().await;
        if handle_slot.is_some() {
            return Ok(());
        }

        let handler = handler::RelayHandler {
            tx: self.inbound_tx.clone(),
            allowed_users: Arc::new(self.config.allowed_users.clone()),
        };

        let mut client = Client::builder(&self.token, handler::intents())
            .event_handler(handler)
            .await
            .map_err(|e| channel_error("failed to build Discord client", e))?;

        *self.shard_manager.lock().await = Some(Arc::clone(&client.shard_manager));

        info!("starting Discord gateway connection");
        let handle = tokio::spawn(async move {
            if let Err(e) = client.start().await {
                error!(error = %e, "Discord gateway stopped");
            }
        });

        *handle_slot = Some(handle);
        Ok(())
    }

    async fn receive(&self) -> Result<InboundText<DiscordTarget>, RelayError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| RelayError::Channel {
            message: "Discord inbound channel closed".into(),
            source: None,
        })
    }

    async fn send_text(
        &self,
        target: &DiscordTarget,
        text: &str,
        threaded: bool,
    ) -> Result<(), RelayError> {
        let channel_id = ChannelId::new(target.channel_id);
        let mut builder = CreateMessage::new().content(text);
        if threaded {
            builder = builder.reference_message((channel_id, MessageId::new(target.message_id)));
        }
        channel_id
            .send_message(&self.http, builder)
            .await
            .map_err(|e| channel_error("failed to send message", e))?;
        Ok(())
    }

    async fn send_typing(&self, target: &DiscordTarget) -> Result<(), RelayError> {
        ChannelId::new(target.channel_id)
            .broadcast_typing(&self.http)
            .await
            .map_err(|e| channel_error("failed to send typing indicator", e))
    }

    fn describe_target(&self, target: &DiscordTarget) -> String {
        format!("discord:{}#{}", target.channel_id, target.message_id)
    }

    fn chat_key(&self, target: &DiscordTarget) -> String {
        target.channel_id.to_string()
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        if let Some(manager) = self.shard_manager.lock().await.take() {
            debug!("shutting down Discord shards");
            manager.shutdown_all().await;
        }
        if let Some(handle) = self.client_handle.lock().await.take() {
            handle.abort();
        }
        Ok(())
    }
}
