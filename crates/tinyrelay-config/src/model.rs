// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the tinyrelay message relay.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level tinyrelay configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Relay identity, logging and queue location.
    #[serde(default)]
    pub relay: RelaySection,

    /// Queue polling and pending-reply settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// External AI process invocation settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Heartbeat trigger settings.
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,

    /// Telegram bot integration settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Discord bot integration settings.
    #[serde(default)]
    pub discord: DiscordConfig,

    /// WhatsApp Cloud API integration settings.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
}

/// Relay identity and filesystem location.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelaySection {
    /// Display name of the relay, used in logs.
    #[serde(default = "default_relay_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Root directory holding `queue/` and the reset flag.
    #[serde(default = "default_home")]
    pub home: String,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            name: default_relay_name(),
            log_level: default_log_level(),
            home: default_home(),
        }
    }
}

impl RelaySection {
    /// Directory containing `incoming/`, `processing/` and `outgoing/`.
    pub fn queue_root(&self) -> PathBuf {
        PathBuf::from(&self.home).join("queue")
    }

    /// Well-known path of the reset sentinel file.
    pub fn reset_flag_path(&self) -> PathBuf {
        PathBuf::from(&self.home).join("reset_flag")
    }
}

fn default_relay_name() -> String {
    "tinyrelay".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_home() -> String {
    dirs::home_dir()
        .map(|p| p.join(".tinyrelay"))
        .unwrap_or_else(|| PathBuf::from(".tinyrelay"))
        .to_string_lossy()
        .into_owned()
}

/// Queue polling configuration shared by the processor and adapters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Interval between polls of `incoming/` (processor) and `outgoing/` (adapters).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Age after which a pending reply is evicted without sending anything.
    #[serde(default = "default_pending_ttl_secs")]
    pub pending_ttl_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            pending_ttl_secs: default_pending_ttl_secs(),
        }
    }
}

impl QueueConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn pending_ttl(&self) -> Duration {
        Duration::from_secs(self.pending_ttl_secs)
    }
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_pending_ttl_secs() -> u64 {
    600
}

/// External AI process configuration.
///
/// The processor runs `command args... [continue_args...] [prompt_arg] <message>`
/// and reads the reply from stdout.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Executable to run.
    #[serde(default = "default_backend_command")]
    pub command: String,

    /// Arguments passed on every invocation.
    #[serde(default = "default_backend_args")]
    pub args: Vec<String>,

    /// Extra arguments passed only when continuing the conversation.
    #[serde(default = "default_continue_args")]
    pub continue_args: Vec<String>,

    /// Flag placed directly before the message text. `None` passes the text bare.
    #[serde(default = "default_prompt_arg")]
    pub prompt_arg: Option<String>,

    /// Working directory for the AI process.
    #[serde(default)]
    pub working_dir: Option<String>,

    /// Optional wall-clock limit per invocation. `None` waits indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Replies longer than this many characters are truncated.
    #[serde(default = "default_max_reply_chars")]
    pub max_reply_chars: usize,

    /// Text sent back to the user when an invocation fails.
    #[serde(default = "default_error_reply")]
    pub error_reply: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            command: default_backend_command(),
            args: default_backend_args(),
            continue_args: default_continue_args(),
            prompt_arg: default_prompt_arg(),
            working_dir: None,
            timeout_secs: None,
            max_reply_chars: default_max_reply_chars(),
            error_reply: default_error_reply(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn default_backend_command() -> String {
    "claude".to_string()
}

fn default_backend_args() -> Vec<String> {
    vec!["--dangerously-skip-permissions".to_string()]
}

fn default_continue_args() -> Vec<String> {
    vec!["-c".to_string()]
}

fn default_prompt_arg() -> Option<String> {
    Some("-p".to_string())
}

fn default_max_reply_chars() -> usize {
    4000
}

fn default_error_reply() -> String {
    "Sorry, I encountered an error processing your request.".to_string()
}

/// Heartbeat trigger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HeartbeatConfig {
    /// Enable the periodic heartbeat loop.
    #[serde(default = "default_heartbeat_enabled")]
    pub enabled: bool,

    /// Interval between heartbeats in seconds.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub interval_secs: u64,

    /// Prompt enqueued on every heartbeat.
    #[serde(default = "default_heartbeat_prompt")]
    pub prompt: String,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: default_heartbeat_enabled(),
            interval_secs: default_heartbeat_interval_secs(),
            prompt: default_heartbeat_prompt(),
        }
    }
}

impl HeartbeatConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_heartbeat_enabled() -> bool {
    true
}

fn default_heartbeat_interval_secs() -> u64 {
    500
}

fn default_heartbeat_prompt() -> String {
    "Quick status check: Any pending tasks? Keep response brief.".to_string()
}

/// Telegram bot integration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. Required to run the Telegram adapter.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// List of allowed Telegram user IDs or usernames.
    #[serde(default)]
    pub allowed_users: Vec<String>,

    /// Typing indicator refresh interval in seconds.
    #[serde(default = "default_telegram_typing_secs")]
    pub typing_interval_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            allowed_users: Vec::new(),
            typing_interval_secs: default_telegram_typing_secs(),
        }
    }
}

fn default_telegram_typing_secs() -> u64 {
    4
}

/// Discord bot integration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DiscordConfig {
    /// Discord bot token. Required to run the Discord adapter.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// List of allowed Discord user IDs or usernames.
    #[serde(default)]
    pub allowed_users: Vec<String>,

    /// Typing indicator refresh interval in seconds.
    #[serde(default = "default_discord_typing_secs")]
    pub typing_interval_secs: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            allowed_users: Vec::new(),
            typing_interval_secs: default_discord_typing_secs(),
        }
    }
}

fn default_discord_typing_secs() -> u64 {
    8
}

/// WhatsApp Cloud API integration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    /// Permanent or system-user access token for the Graph API.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Phone number ID messages are sent from.
    #[serde(default)]
    pub phone_number_id: Option<String>,

    /// Token Meta echoes back during webhook verification.
    #[serde(default)]
    pub verify_token: Option<String>,

    /// App secret used to verify `X-Hub-Signature-256`. `None` skips verification.
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Address the webhook listener binds to.
    #[serde(default = "default_whatsapp_bind")]
    pub bind_address: String,

    /// Port the webhook listener binds to.
    #[serde(default = "default_whatsapp_port")]
    pub port: u16,

    /// Graph API base URL.
    #[serde(default = "default_whatsapp_api_base")]
    pub api_base: String,

    /// List of allowed sender phone numbers (wa_id) or profile names.
    #[serde(default)]
    pub allowed_users: Vec<String>,

    /// Typing indicator refresh interval in seconds.
    #[serde(default = "default_whatsapp_typing_secs")]
    pub typing_interval_secs: u64,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            phone_number_id: None,
            verify_token: None,
            app_secret: None,
            bind_address: default_whatsapp_bind(),
            port: default_whatsapp_port(),
            api_base: default_whatsapp_api_base(),
            allowed_users: Vec::new(),
            typing_interval_secs: default_whatsapp_typing_secs(),
        }
    }
}

fn default_whatsapp_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_whatsapp_port() -> u16 {
    3000
}

fn default_whatsapp_api_base() -> String {
    "https://graph.facebook.com/v21.0".to_string()
}

fn default_whatsapp_typing_secs() -> u64 {
    20
}
