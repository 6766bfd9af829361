//! Repairs for the almost-JSON models emit in citation blocks.
//!
//! One left-to-right scan fixes three things without touching string content:
//! trailing commas before `]`/`}`, backslash escapes JSON does not allow, and
//! raw control characters inside string literals. Unpaired UTF-16 surrogate
//! escapes become U+FFFD.

use anyhow::{Context, Result};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanMode {
    /// Between tokens, outside any string literal.
    Structural,
    InString,
}

/// Characters that may legally follow a backslash (besides `u`).
fn is_simple_escape(c: char) -> bool {
    matches!(c, '"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't')
}

/// Whether the four chars after `u` at `chars[u_idx]` are all hex digits.
fn has_unicode_digits(chars: &[char], u_idx: usize) -> bool {
    chars.len() > u_idx + 4 && chars[u_idx + 1..=u_idx + 4].iter().all(|c| c.is_ascii_hexdigit())
}

/// Value of the `\uXXXX` escape whose `u` sits at `chars[u_idx]`.
fn unicode_escape_at(chars: &[char], u_idx: usize) -> Option<u32> {
    if chars.get(u_idx) != Some(&'u') || !has_unicode_digits(chars, u_idx) {
        return None;
    }
    let hex: String = chars[u_idx + 1..=u_idx + 4].iter().collect();
    u32::from_str_radix(&hex, 16).ok()
}

fn is_high_surrogate(code: u32) -> bool {
    (0xD800..=0xDBFF).contains(&code)
}

fn is_low_surrogate(code: u32) -> bool {
    (0xDC00..=0xDFFF).contains(&code)
}

/// Whether the next non-whitespace char after `idx` closes a container.
fn closes_container(chars: &[char], idx: usize) -> bool {
    chars[idx + 1..]
        .iter()
        .find(|c| !c.is_whitespace())
        .is_some_and(|c| matches!(c, ']' | '}'))
}

/// Rewrite `input` so that near-valid JSON parses.
pub fn repair_json(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut mode = ScanMode::Structural;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match mode {
            ScanMode::Structural => match c {
                '"' => {
                    out.push(c);
                    mode = ScanMode::InString;
                }
                ',' if closes_container(&chars, i) => {}
                _ => out.push(c),
            },
            ScanMode::InString => match c {
                '"' => {
                    out.push(c);
                    mode = ScanMode::Structural;
                }
                '\\' => match chars.get(i + 1).copied() {
                    Some(next) if is_simple_escape(next) => {
                        out.push('\\');
                        out.push(next);
                        i += 1;
                    }
                    Some('u') if has_unicode_digits(&chars, i + 1) => {
                        let code = unicode_escape_at(&chars, i + 1).unwrap_or(0);
                        let low = (chars.get(i + 6) == Some(&'\\'))
                            .then(|| unicode_escape_at(&chars, i + 7))
                            .flatten()
                            .filter(|c| is_low_surrogate(*c));

                        if is_high_surrogate(code) && low.is_some() {
                            out.push('\\');
                            out.extend(&chars[i + 1..=i + 11]);
                            i += 11;
                        } else if is_high_surrogate(code) || is_low_surrogate(code) {
                            // Half a pair is not representable
                            out.push_str("\\ufffd");
                            i += 5;
                        } else {
                            out.push('\\');
                            out.extend(&chars[i + 1..=i + 5]);
                            i += 5;
                        }
                    }
                    // Drop the backslash, the next char is kept as a literal
                    _ => {}
                },
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
                _ => out.push(c),
            },
        }
        i += 1;
    }

    out
}

/// Repair then parse a citation block.
pub fn parse_repaired(block: &str) -> Result<Value> {
    let repaired = repair_json(block);
    serde_json::from_str(&repaired).context("citation block is not valid JSON after repair")
}
