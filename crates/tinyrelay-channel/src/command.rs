// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-chat commands handled by the adapter itself.

use std::sync::LazyLock;

use regex::Regex;

/// `!reset` or `/reset`, any case, nothing else on the line.
static RESET_COMMAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[!/]reset$").expect("reset command pattern is valid"));

/// Reply sent when a reset command is accepted.
pub const RESET_REPLY: &str =
    "Conversation reset! The next message will start a fresh conversation.";

/// Whether `text` is a reset command. Surrounding whitespace is ignored.
pub fn is_reset_command(text: &str) -> bool {
    RESET_COMMAND.is_match(text.trim())
}
