// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the tinyrelay message relay.
//!
//! This crate provides the queue wire format, the error type, and the two
//! trait seams ([`ChatPlatform`], [`AiBackend`]) that the rest of the
//! workspace is built around.

pub mod error;
pub mod traits;
pub mod types;

pub use error::RelayError;
pub use traits::{AiBackend, ChatPlatform};
pub use types::{
    Channel, InboundText, MessageId, PlatformCapabilities, QueueMessage, QueueResponse,
    SessionMode,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_message() -> QueueMessage {
        QueueMessage {
            channel: Channel::Telegram,
            sender: "Alice".into(),
            sender_id: "42".into(),
            message: "hello".into(),
            timestamp: 1_700_000_000_000,
            message_id: MessageId("1700000000000_k3j9x2ab".into()),
        }
    }

    #[test]
    fn relay_error_has_all_variants() {
        let _config = RelayError::Config("test".into());
        let _queue = RelayError::queue_io("/tmp/q", std::io::Error::other("test"));
        let _channel = RelayError::Channel {
            message: "test".into(),
            source: None,
        };
        let _backend = RelayError::Backend {
            message: "test".into(),
            source: None,
        };
        let _timeout = RelayError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = RelayError::Internal("test".into());
    }

    #[test]
    fn not_found_detection() {
        let gone = RelayError::queue_io(
            "/tmp/q/x.json",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(gone.is_not_found());

        let denied = RelayError::queue_io(
            "/tmp/q/x.json",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(!denied.is_not_found());
        assert!(!RelayError::Internal("x".into()).is_not_found());
    }

    #[test]
    fn channel_display_and_parse_round_trip() {
        for channel in [
            Channel::Discord,
            Channel::Whatsapp,
            Channel::Telegram,
            Channel::System,
        ] {
            let s = channel.to_string();
            assert_eq!(s, s.to_lowercase());
            assert_eq!(Channel::from_str(&s).unwrap(), channel);
        }
        assert_eq!(Channel::Discord.file_prefix(), "discord_");
    }

    #[test]
    fn queue_message_uses_camel_case_keys() {
        let json = serde_json::to_value(sample_message()).unwrap();
        assert_eq!(json["channel"], "telegram");
        assert_eq!(json["senderId"], "42");
        assert_eq!(json["messageId"], "1700000000000_k3j9x2ab");
        assert_eq!(json["timestamp"], 1_700_000_000_000i64);
    }

    #[test]
    fn queue_message_file_name() {
        assert_eq!(
            sample_message().file_name(),
            "telegram_1700000000000_k3j9x2ab.json"
        );
    }

    #[test]
    fn response_keeps_message_id_and_channel() {
        let msg = sample_message();
        let resp = QueueResponse::reply_to(&msg, "hi there".into(), 1_700_000_000_500);
        assert_eq!(resp.message_id, msg.message_id);
        assert_eq!(resp.channel, Channel::Telegram);
        assert_eq!(resp.original_message, "hello");
        assert_eq!(resp.file_name(), msg.file_name());

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["originalMessage"], "hello");
        assert_eq!(json["message"], "hi there");
    }

    #[test]
    fn response_parses_from_external_json() {
        let raw = r#"{
            "channel": "discord",
            "sender": "bob",
            "message": "pong",
            "originalMessage": "ping",
            "timestamp": 1700000000123,
            "messageId": "D1"
        }"#;
        let resp: QueueResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.channel, Channel::Discord);
        assert_eq!(resp.message_id, MessageId::from("D1"));
    }

    #[test]
    fn unknown_channel_is_rejected() {
        let raw = r#"{"channel":"slack","sender":"a","senderId":"1","message":"x","timestamp":1,"messageId":"m"}"#;
        assert!(serde_json::from_str::<QueueMessage>(raw).is_err());
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_backend<T: AiBackend>() {}
        fn _assert_platform<T: ChatPlatform>() {}
    }
}
