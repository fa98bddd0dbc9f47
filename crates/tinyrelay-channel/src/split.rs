// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Splitting long replies to fit platform message limits.

/// Splits `text` into chunks of at most `max_chars` characters.
///
/// Cuts prefer a paragraph break, then a line break, then a space; a word
/// longer than the limit is cut hard. Whitespace at the cut is dropped.
/// Blank text yields no chunks.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    if max_chars == 0 || text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        let Some((window_end, _)) = remaining.char_indices().nth(max_chars) else {
            chunks.push(remaining.to_string());
            break;
        };

        let window = &remaining[..window_end];
        let split_at = window
            .rfind("\n\n")
            .map(|p| p + 1)
            .or_else(|| window.rfind('\n'))
            .or_else(|| window.rfind(' '))
            .filter(|&p| p > 0)
            .unwrap_or(window_end);

        let (chunk, rest) = remaining.split_at(split_at);
        let chunk = chunk.trim_end();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        remaining = rest.trim_start_matches(['\n', ' ']);
    }

    chunks
}
