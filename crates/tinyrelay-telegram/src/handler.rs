// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authorization filtering and conversion of Telegram updates.
//!
//! Decides whether an incoming Telegram message is relayed at all, then
//! turns it into an [`InboundText`] addressed back at the same chat and
//! message.

use teloxide::prelude::*;
use teloxide::types::ChatKind;
use tinyrelay_core::InboundText;

/// Where a Telegram reply goes: the chat, and the message to quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TelegramTarget {
    pub chat_id: i64,
    pub message_id: i32,
}

/// Checks whether the message sender is authorized.
///
/// Authorization passes if the sender's user ID (as string) or username
/// matches any entry in `allowed_users`. An empty list rejects everyone.
/// Messages without a sender (e.g., channel posts) are never authorized.
pub fn is_authorized(msg: &Message, allowed_users: &[String]) -> bool {
    if allowed_users.is_empty() {
        return false;
    }

    let Some(user) = msg.from.as_ref() else {
        return false;
    };
    let user_id = user.id.0.to_string();

    allowed_users.iter().any(|allowed| {
        if *allowed == user_id {
            return true;
        }
        let wanted = allowed.strip_prefix('@').unwrap_or(allowed);
        user.username
            .as_deref()
            .is_some_and(|name| name.eq_ignore_ascii_case(wanted))
    })
}

/// Whether the message comes from a private (DM) chat.
pub fn is_dm(msg: &Message) -> bool {
    matches!(msg.chat.kind, ChatKind::Private(_))
}

/// Converts a text message. Non-text messages (stickers, photos, ...)
/// yield `None`.
pub fn to_inbound(msg: &Message) -> Option<InboundText<TelegramTarget>> {
    let text = msg.text()?;

    let (sender, sender_id) = match msg.from.as_ref() {
        Some(user) => (user.full_name(), user.id.0.to_string()),
        None => ("unknown".to_string(), "unknown".to_string()),
    };

    Some(InboundText {
        sender,
        sender_id,
        text: text.to_string(),
        reply_target: TelegramTarget {
            chat_id: msg.chat.id.0,
            message_id: msg.id.0,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a private chat message from JSON, shaped like the Bot API payload.
    fn private_message(user_id: u64, username: Option<&str>, text: &str) -> Message {
        let mut from = serde_json::json!({
            "id": user_id,
            "is_bot": false,
            "first_name": "Test",
            "last_name": "User",
        });
        if let Some(name) = username {
            from["username"] = serde_json::json!(name);
        }

        let json = serde_json::json!({
            "message_id": 42,
            "date": 1700000000i64,
            "chat": {
                "id": user_id as i64,
                "type": "private",
                "first_name": "Test",
            },
            "from": from,
            "text": text,
        });

        serde_json::from_value(json).expect("failed to deserialize mock message")
    }

    fn group_message(user_id: u64, text: &str) -> Message {
        let json = serde_json::json!({
            "message_id": 7,
            "date": 1700000000i64,
            "chat": {
                "id": -100123i64,
                "type": "supergroup",
                "title": "Test Group",
            },
            "from": {
                "id": user_id,
                "is_bot": false,
                "first_name": "Test",
            },
            "text": text,
        });

        serde_json::from_value(json).expect("failed to deserialize mock group message")
    }

    fn location_message() -> Message {
        let json = serde_json::json!({
            "message_id": 3,
            "date": 1700000000i64,
            "chat": {
                "id": 12345i64,
                "type": "private",
                "first_name": "Test",
            },
            "from": {
                "id": 12345u64,
                "is_bot": false,
                "first_name": "Test",
            },
            "location": { "latitude": 1.0, "longitude": 2.0 },
        });

        serde_json::from_value(json).expect("failed to deserialize mock location message")
    }

    #[test]
    fn authorized_by_user_id() {
        let msg = private_message(12345, None, "hello");
        assert!(is_authorized(&msg, &["12345".into()]));
    }

    #[test]
    fn authorized_by_username_with_or_without_at() {
        let msg = private_message(12345, Some("TestUser"), "hello");
        assert!(is_authorized(&msg, &["testuser".into()]));
        assert!(is_authorized(&msg, &["@testuser".into()]));
    }

    #[test]
    fn rejects_unlisted_user() {
        let msg = private_message(12345, Some("testuser"), "hello");
        assert!(!is_authorized(&msg, &["99999".into(), "@someone".into()]));
    }

    #[test]
    fn empty_allow_list_rejects_everyone() {
        let msg = private_message(12345, Some("testuser"), "hello");
        assert!(!is_authorized(&msg, &[]));
    }

    #[test]
    fn dm_detection() {
        assert!(is_dm(&private_message(1, None, "hi")));
        assert!(!is_dm(&group_message(1, "hi")));
    }

    #[test]
    fn to_inbound_maps_sender_and_target() {
        let msg = private_message(12345, Some("testuser"), "what's up");
        let inbound = to_inbound(&msg).unwrap();

        assert_eq!(inbound.text, "what's up");
        assert_eq!(inbound.sender, "Test User");
        assert_eq!(inbound.sender_id, "12345");
        assert_eq!(
            inbound.reply_target,
            TelegramTarget {
                chat_id: 12345,
                message_id: 42,
            }
        );
    }

    #[test]
    fn non_text_message_is_skipped() {
        assert!(to_inbound(&location_message()).is_none());
    }
}
