// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound side of the WhatsApp Cloud API: the webhook.
//!
//! Meta delivers messages as signed JSON `POST`s and verifies the endpoint
//! with a `GET` handshake. Routes:
//! - `GET /webhook` (subscription verification)
//! - `POST /webhook` (message notifications)

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tinyrelay_core::InboundText;
use tokio::sync::mpsc;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the payload signature, `sha256=<hex>`.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Where a WhatsApp reply goes: the sender's number and the message to quote.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WhatsAppTarget {
    pub wa_id: String,
    pub message_id: String,
}

/// Top-level webhook notification.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub field: String,
    pub value: WebhookValue,
}

#[derive(Debug, Deserialize)]
pub struct WebhookValue {
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub messages: Vec<WebhookMessage>,
}

#[derive(Debug, Deserialize)]
pub struct Contact {
    pub wa_id: String,
    pub profile: Option<Profile>,
}

#[derive(Debug, Deserialize)]
pub struct Profile {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct WebhookMessage {
    pub from: String,
    pub id: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub text: Option<TextBody>,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub body: String,
}

/// Verifies `X-Hub-Signature-256` against the raw request body.
pub fn verify_signature(body: &[u8], signature_header: &str, app_secret: &str) -> bool {
    let Some(expected) = signature_header.strip_prefix("sha256=") else {
        warn!("invalid signature header format (missing sha256= prefix)");
        return false;
    };
    let Ok(expected) = hex::decode(expected) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(app_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    // `verify_slice` compares in constant time.
    mac.verify_slice(&expected).is_ok()
}

/// Answers the subscription handshake. Returns the challenge to echo back
/// when `hub.mode` is `subscribe` and `hub.verify_token` matches.
pub fn verify_subscription(params: &HashMap<String, String>, verify_token: &str) -> Option<String> {
    let mode = params.get("hub.mode")?;
    let token = params.get("hub.verify_token")?;
    let challenge = params.get("hub.challenge")?;
    (mode == "subscribe" && token == verify_token).then(|| challenge.clone())
}

fn normalize_number(number: &str) -> &str {
    number.trim_start_matches('+')
}

/// Checks a sender against `allowed_users` by phone number (leading `+`
/// ignored) or profile name (case-insensitive). An empty list rejects
/// everyone.
pub fn is_authorized(wa_id: &str, profile_name: Option<&str>, allowed_users: &[String]) -> bool {
    if allowed_users.is_empty() {
        return false;
    }
    allowed_users.iter().any(|allowed| {
        normalize_number(allowed) == normalize_number(wa_id)
            || profile_name.is_some_and(|name| name.eq_ignore_ascii_case(allowed))
    })
}

/// Extracts authorized text messages from a notification. Status updates,
/// non-text messages and unauthorized senders are dropped.
pub fn extract_texts(
    payload: WebhookPayload,
    allowed_users: &[String],
) -> Vec<InboundText<WhatsAppTarget>> {
    let mut out = Vec::new();

    for change in payload.entry.into_iter().flat_map(|e| e.changes) {
        if change.field != "messages" {
            debug!(field = %change.field, "ignoring non-message webhook");
            continue;
        }

        let names: HashMap<String, String> = change
            .value
            .contacts
            .into_iter()
            .filter_map(|c| c.profile.map(|p| (c.wa_id, p.name)))
            .collect();

        for msg in change.value.messages {
            let Some(text) = msg.text.filter(|_| msg.message_type == "text") else {
                debug!(msg_type = %msg.message_type, "ignoring non-text message");
                continue;
            };

            let name = names.get(&msg.from).map(String::as_str);
            if !is_authorized(&msg.from, name, allowed_users) {
                debug!(wa_id = %msg.from, "ignoring unauthorized sender");
                continue;
            }

            out.push(InboundText {
                sender: name.unwrap_or(msg.from.as_str()).to_string(),
                sender_id: msg.from.clone(),
                text: text.body,
                reply_target: WhatsAppTarget {
                    wa_id: msg.from,
                    message_id: msg.id,
                },
            });
        }
    }

    out
}

/// Shared state for the webhook routes.
#[derive(Clone)]
pub struct WebhookState {
    pub tx: mpsc::Sender<InboundText<WhatsAppTarget>>,
    pub verify_token: Arc<str>,
    pub app_secret: Option<Arc<str>>,
    pub allowed_users: Arc<Vec<String>>,
}

/// Builds the webhook router.
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook", get(get_verify).post(post_notification))
        .with_state(state)
}

async fn get_verify(
    State(state): State<WebhookState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    match verify_subscription(&params, &state.verify_token) {
        Some(challenge) => {
            debug!("webhook subscription verified");
            (StatusCode::OK, challenge).into_response()
        }
        None => {
            warn!("webhook verification failed");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

async fn post_notification(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(secret) = state.app_secret.as_deref() {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !verify_signature(&body, signature, secret) {
            warn!("rejecting webhook with invalid signature");
            return StatusCode::UNAUTHORIZED;
        }
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "malformed webhook payload");
            return StatusCode::BAD_REQUEST;
        }
    };

    for inbound in extract_texts(payload, &state.allowed_users) {
        if state.tx.send(inbound).await.is_err() {
            warn!("inbound channel closed, dropping message");
        }
    }

    StatusCode::OK
}
