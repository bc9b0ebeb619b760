// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Overtext and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt::Write as _;

/// Escapes `input` so it can be embedded literally in a selector, following the CSSOM
/// `CSS.escape()` algorithm.
///
/// The result is valid both as an identifier (`#id`, `.class`, attribute names) and inside a
/// quoted attribute value.
pub fn css_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let first = input.chars().next();
    let single = input.chars().nth(1).is_none();

    for (idx, ch) in input.chars().enumerate() {
        match ch {
            '\0' => out.push('\u{fffd}'),
            '\u{1}'..='\u{1f}' | '\u{7f}' => push_hex_escape(&mut out, ch),
            '0'..='9' if idx == 0 => push_hex_escape(&mut out, ch),
            '0'..='9' if idx == 1 && first == Some('-') => push_hex_escape(&mut out, ch),
            '-' if idx == 0 && single => out.push_str("\\-"),
            _ if ch >= '\u{80}' || ch == '-' || ch == '_' || ch.is_ascii_alphanumeric() => {
                out.push(ch)
            }
            _ => {
                out.push('\\');
                out.push(ch);
            }
        }
    }

    out
}

fn push_hex_escape(out: &mut String, ch: char) {
    let _ = write!(out, "\\{:x} ", ch as u32);
}
