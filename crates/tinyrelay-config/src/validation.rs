// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express: non-empty paths and
//! commands, positive intervals, valid listener addresses.

use crate::diagnostic::ConfigError;
use crate::model::RelayConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Shortest heartbeat interval accepted while the heartbeat is enabled.
const MIN_HEARTBEAT_INTERVAL_SECS: u64 = 10;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.relay.home.trim().is_empty() {
        fail("relay.home must not be empty".to_string());
    }

    if !LOG_LEVELS.contains(&config.relay.log_level.as_str()) {
        fail(format!(
            "relay.log_level `{}` must be one of: {}",
            config.relay.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.queue.poll_interval_ms == 0 {
        fail("queue.poll_interval_ms must be greater than 0".to_string());
    }

    if config.queue.pending_ttl_secs == 0 {
        fail("queue.pending_ttl_secs must be greater than 0".to_string());
    }

    if config.backend.command.trim().is_empty() {
        fail("backend.command must not be empty".to_string());
    }

    if config.backend.timeout_secs == Some(0) {
        fail("backend.timeout_secs must be greater than 0 when set".to_string());
    }

    if config.backend.max_reply_chars == 0 {
        fail("backend.max_reply_chars must be greater than 0".to_string());
    }

    if config.backend.error_reply.trim().is_empty() {
        fail("backend.error_reply must not be empty".to_string());
    }

    if config.heartbeat.enabled {
        if config.heartbeat.interval_secs < MIN_HEARTBEAT_INTERVAL_SECS {
            fail(format!(
                "heartbeat.interval_secs must be at least {MIN_HEARTBEAT_INTERVAL_SECS}, got {}",
                config.heartbeat.interval_secs
            ));
        }
        if config.heartbeat.prompt.trim().is_empty() {
            fail("heartbeat.prompt must not be empty".to_string());
        }
    }

    for (section, secs) in [
        ("telegram", config.telegram.typing_interval_secs),
        ("discord", config.discord.typing_interval_secs),
        ("whatsapp", config.whatsapp.typing_interval_secs),
    ] {
        if secs == 0 {
            fail(format!("{section}.typing_interval_secs must be greater than 0"));
        }
    }

    let addr = config.whatsapp.bind_address.trim();
    if addr.is_empty() {
        fail("whatsapp.bind_address must not be empty".to_string());
    } else {
        let is_valid_ip = addr.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = addr
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "whatsapp.bind_address `{addr}` is not a valid IP address or hostname"
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        let config = RelayConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_command_fails_validation() {
        let mut config = RelayConfig::default();
        config.backend.command = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "backend.command"));
    }

    #[test]
    fn zero_poll_interval_fails_validation() {
        let mut config = RelayConfig::default();
        config.queue.poll_interval_ms = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "poll_interval_ms"));
    }

    #[test]
    fn short_heartbeat_only_checked_when_enabled() {
        let mut config = RelayConfig::default();
        config.heartbeat.interval_secs = 1;
        assert!(has_error(
            &validate_config(&config).unwrap_err(),
            "heartbeat.interval_secs"
        ));

        config.heartbeat.enabled = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_timeout_fails_but_none_passes() {
        let mut config = RelayConfig::default();
        config.backend.timeout_secs = Some(0);
        assert!(has_error(
            &validate_config(&config).unwrap_err(),
            "timeout_secs"
        ));

        config.backend.timeout_secs = None;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn unknown_log_level_fails_validation() {
        let mut config = RelayConfig::default();
        config.relay.log_level = "verbose".to_string();
        assert!(has_error(
            &validate_config(&config).unwrap_err(),
            "relay.log_level"
        ));
    }

    #[test]
    fn collects_multiple_errors() {
        let mut config = RelayConfig::default();
        config.relay.home = String::new();
        config.discord.typing_interval_secs = 0;
        config.whatsapp.bind_address = "not a host!".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(has_error(&errors, "relay.home"));
        assert!(has_error(&errors, "discord.typing_interval_secs"));
        assert!(has_error(&errors, "whatsapp.bind_address"));
    }
}
