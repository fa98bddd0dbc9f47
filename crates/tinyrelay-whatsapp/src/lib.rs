// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API platform for the tinyrelay channel adapter.
//!
//! Inbound messages arrive on an axum webhook (see [`webhook`]); replies and
//! typing indicators are Graph API calls made with reqwest.

pub mod webhook;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tinyrelay_config::model::WhatsAppConfig;
use tinyrelay_core::{Channel, ChatPlatform, InboundText, PlatformCapabilities, RelayError};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub use webhook::WhatsAppTarget;

/// WhatsApp's limit on text message body length.
pub const WHATSAPP_MAX_MESSAGE_LENGTH: usize = 4096;

const API_TIMEOUT: Duration = Duration::from_secs(30);

struct WebhookServer {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    local_addr: SocketAddr,
}

/// WhatsApp platform implementing [`ChatPlatform`].
pub struct WhatsAppPlatform {
    config: WhatsAppConfig,
    access_token: String,
    phone_number_id: String,
    verify_token: String,
    client: reqwest::Client,
    inbound_rx: Mutex<mpsc::Receiver<InboundText<WhatsAppTarget>>>,
    inbound_tx: mpsc::Sender<InboundText<WhatsAppTarget>>,
    server: Mutex<Option<WebhookServer>>,
}

fn required(value: Option<&str>, key: &str) -> Result<String, RelayError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.to_string()),
        _ => Err(RelayError::Config(format!(
            "whatsapp.{key} is required for the WhatsApp adapter"
        ))),
    }
}

impl WhatsAppPlatform {
    /// Creates the platform. Requires `access_token`, `phone_number_id` and
    /// `verify_token`.
    pub fn new(config: WhatsAppConfig) -> Result<Self, RelayError> {
        let access_token = required(config.access_token.as_deref(), "access_token")?;
        let phone_number_id = required(config.phone_number_id.as_deref(), "phone_number_id")?;
        let verify_token = required(config.verify_token.as_deref(), "verify_token")?;

        if config.app_secret.is_none() {
            warn!("whatsapp.app_secret is not set, webhook signatures will not be verified");
        }
        if config.allowed_users.is_empty() {
            warn!("whatsapp.allowed_users is empty, every message will be rejected");
        }

        let client = reqwest::Client::builder()
            .timeout(API_TIMEOUT)
            .build()
            .map_err(|e| RelayError::Channel {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        let (inbound_tx, inbound_rx) = mpsc::channel(100);

        Ok(Self {
            config,
            access_token,
            phone_number_id,
            verify_token,
            client,
            inbound_rx: Mutex::new(inbound_rx),
            inbound_tx,
            server: Mutex::new(None),
        })
    }

    /// Address the webhook listener is bound to, once connected.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.server.lock().await.as_ref().map(|s| s.local_addr)
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/{}/messages",
            self.config.api_base.trim_end_matches('/'),
            self.phone_number_id
        )
    }

    async fn post_messages(&self, body: &serde_json::Value) -> Result<(), RelayError> {
        let resp = self
            .client
            .post(self.messages_url())
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| RelayError::Channel {
                message: format!("WhatsApp API request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(RelayError::Channel {
                message: format!("WhatsApp API returned {status}: {detail}"),
                source: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChatPlatform for WhatsAppPlatform {
    type Target = WhatsAppTarget;

    fn channel(&self) -> Channel {
        Channel::Whatsapp
    }

    fn capabilities(&self) -> PlatformCapabilities {
        PlatformCapabilities {
            max_message_length: WHATSAPP_MAX_MESSAGE_LENGTH,
            typing_interval: Duration::from_secs(self.config.typing_interval_secs),
            supports_threaded_reply: true,
        }
    }

    async fn connect(&mut self) -> Result<(), RelayError> {
        let mut slot = self.server.lock().await;
        if slot.is_some() {
            return Ok(());
        }

        let state = webhook::WebhookState {
            tx: self.inbound_tx.clone(),
            verify_token: Arc::from(self.verify_token.as_str()),
            app_secret: self.config.app_secret.as_deref().map(Arc::from),
            allowed_users: Arc::new(self.config.allowed_users.clone()),
        };
        let app = webhook::router(state);

        let addr = format!("{}:{}", self.config.bind_address, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| RelayError::Channel {
                message: format!("failed to bind WhatsApp webhook to {addr}: {e}"),
                source: Some(Box::new(e)),
            })?;
        let local_addr = listener.local_addr().map_err(|e| RelayError::Channel {
            message: format!("failed to read webhook address: {e}"),
            source: Some(Box::new(e)),
        })?;

        info!(%local_addr, "WhatsApp webhook listening");

        let cancel = CancellationToken::new();
        let stop = cancel.clone();
        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop.cancelled().await })
                .await;
            if let Err(e) = served {
                error!(error = %e, "WhatsApp webhook server error");
            }
        });

        *slot = Some(WebhookServer {
            cancel,
            handle,
            local_addr,
        });
        Ok(())
    }

    async fn receive(&self) -> Result<InboundText<WhatsAppTarget>, RelayError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| RelayError::Channel {
            message: "WhatsApp inbound channel closed".into(),
            source: None,
        })
    }

    async fn send_text(
        &self,
        target: &WhatsAppTarget,
        text: &str,
        threaded: bool,
    ) -> Result<(), RelayError> {
        let mut body = json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": target.wa_id,
            "type": "text",
            "text": { "body": text },
        });
        if threaded {
            body["context"] = json!({ "message_id": target.message_id });
        }
        self.post_messages(&body).await
    }

    /// Marks the inbound message read and shows the typing indicator. The
    /// indicator clears on the next reply or after about 25 seconds.
    async fn send_typing(&self, target: &WhatsAppTarget) -> Result<(), RelayError> {
        let body = json!({
            "messaging_product": "whatsapp",
            "status": "read",
            "message_id": target.message_id,
            "typing_indicator": { "type": "text" },
        });
        self.post_messages(&body).await
    }

    fn describe_target(&self, target: &WhatsAppTarget) -> String {
        format!("whatsapp:{}#{}", target.wa_id, target.message_id)
    }

    fn chat_key(&self, target: &WhatsAppTarget) -> String {
        target.wa_id.clone()
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        if let Some(server) = self.server.lock().await.take() {
            debug!("stopping WhatsApp webhook");
            server.cancel.cancel();
            if let Err(e) = server.handle.await {
                warn!(error = %e, "webhook task ended abnormally");
            }
        }
        Ok(())
    }
}
