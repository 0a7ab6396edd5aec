use std::sync::OnceLock;

use regex::Regex;

use super::{close_open_blocks, is_quoted, quote};
use crate::catalog::DiagramFamily;
use crate::normalize::changed;

fn message_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(\s*)([^\s:]+?)\s*(<<-->>|<<->>|-->>|->>|--x|-x|--\)|-\)|-->|->)\s*([+-]?[^\s:]+)\s*:(.*)$",
        )
        .expect("valid regex")
    })
}

/// Characters that the sequence lexer reads as structure inside an unquoted message.
const MESSAGE_PUNCTUATION: &[char] = &['{', '}', '[', ']', '(', ')', '<', '>', ';', '#'];

fn message_needs_quotes(message: &str) -> bool {
    message.contains(MESSAGE_PUNCTUATION) || message.starts_with(|c: char| c.is_ascii_digit())
}

/// `API-->>Client: 401 Unauthorized` becomes `API-->>Client: "401 Unauthorized"`.
pub fn quote_message_labels(text: &str) -> Option<String> {
    let out = text
        .split('\n')
        .map(|line| {
            let Some(caps) = message_re().captures(line) else {
                return line.to_string();
            };
            let message = caps[5].trim();
            if message.is_empty() || is_quoted(message) || !message_needs_quotes(message) {
                return line.to_string();
            }
            format!(
                "{}{}{}{}: {}",
                &caps[1],
                &caps[2],
                &caps[3],
                &caps[4],
                quote(message)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    changed(text, out)
}

fn alias_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\s*)(participant|actor)\s+(\S+)\s+as\s+(.+?)\s*$").expect("valid regex")
    })
}

fn strip_quotes(text: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = text
            .strip_prefix(q)
            .and_then(|rest| rest.strip_suffix(q))
        {
            return inner;
        }
    }
    text
}

/// `participant A as Alice Smith` becomes `participant A as "Alice Smith"`.
pub fn quote_participant_aliases(text: &str) -> Option<String> {
    let out = text
        .split('\n')
        .map(|line| {
            let Some(caps) = alias_re().captures(line) else {
                return line.to_string();
            };
            let name = strip_quotes(&caps[4]).trim();
            if name.is_empty() {
                return line.to_string();
            }
            format!("{}{} {} as {}", &caps[1], &caps[2], &caps[3], quote(name))
        })
        .collect::<Vec<_>>()
        .join("\n");
    changed(text, out)
}

fn note_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\s*)([Nn]ote)\s+(over|left of|right of)\s+([^:]+?)\s*:\s*(.*?)\s*$")
            .expect("valid regex")
    })
}

/// `Note over A,B: two words` becomes `Note over A,B: "two words"`.
pub fn quote_note_text(text: &str) -> Option<String> {
    let out = text
        .split('\n')
        .map(|line| {
            let Some(caps) = note_re().captures(line) else {
                return line.to_string();
            };
            let note = &caps[5];
            if note.is_empty() || is_quoted(note) || !note.contains(char::is_whitespace) {
                return line.to_string();
            }
            format!(
                "{}{} {} {}: {}",
                &caps[1],
                &caps[2],
                &caps[3],
                &caps[4],
                quote(note)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    changed(text, out)
}

/// Appends `end` for every `loop` / `alt` / `opt` / ... left open.
pub fn close_open_groups(text: &str) -> Option<String> {
    close_open_blocks(text, DiagramFamily::MessageExchange)
}
