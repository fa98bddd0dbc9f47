// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discord gateway event handler.
//!
//! Forwards authorized direct messages into the platform's inbound mpsc
//! channel. Guild messages and bot authors are ignored.

use std::sync::Arc;

use serenity::all::{Context, EventHandler, GatewayIntents, Message, Ready};
use serenity::async_trait;
use tinyrelay_core::InboundText;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Where a Discord reply goes: the channel, and the message to reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiscordTarget {
    pub channel_id: u64,
    pub message_id: u64,
}

/// Gateway intents the relay needs: DMs and their content.
pub fn intents() -> GatewayIntents {
    GatewayIntents::DIRECT_MESSAGES | GatewayIntents::MESSAGE_CONTENT
}

/// Checks a sender against `allowed_users` by numeric id or username
/// (with or without `@`, case-insensitive). An empty list rejects everyone.
pub fn is_authorized(user_id: u64, username: &str, allowed_users: &[String]) -> bool {
    if allowed_users.is_empty() {
        return false;
    }
    let user_id = user_id.to_string();
    allowed_users.iter().any(|allowed| {
        *allowed == user_id
            || allowed
                .strip_prefix('@')
                .unwrap_or(allowed)
                .eq_ignore_ascii_case(username)
    })
}

/// Builds the inbound text for a DM. Prefers the display name over the
/// account name for `sender`.
pub fn to_inbound(
    display_name: Option<&str>,
    username: &str,
    user_id: u64,
    content: &str,
    target: DiscordTarget,
) -> InboundText<DiscordTarget> {
    InboundText {
        sender: display_name.unwrap_or(username).to_string(),
        sender_id: user_id.to_string(),
        text: content.to_string(),
        reply_target: target,
    }
}

/// Serenity event handler feeding the adapter.
pub struct RelayHandler {
    pub tx: mpsc::Sender<InboundText<DiscordTarget>>,
    pub allowed_users: Arc<Vec<String>>,
}

#[async_trait]
impl EventHandler for RelayHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(bot_name = %ready.user.name, "discord bot ready");
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        if msg.guild_id.is_some() {
            debug!(channel_id = msg.channel_id.get(), "ignoring guild message");
            return;
        }

        let user_id = msg.author.id.get();
        if !is_authorized(user_id, &msg.author.name, &self.allowed_users) {
            debug!(user_id, "ignoring unauthorized user");
            return;
        }

        let inbound = to_inbound(
            msg.author.global_name.as_deref(),
            &msg.author.name,
            user_id,
            &msg.content,
            DiscordTarget {
                channel_id: msg.channel_id.get(),
                message_id: msg.id.get(),
            },
        );

        if self.tx.send(inbound).await.is_err() {
            warn!("inbound channel closed, dropping message");
        }
    }
}
