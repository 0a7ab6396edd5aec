use std::sync::OnceLock;

use regex::Regex;

use super::{RuleContext, changed, is_header_line};
use crate::catalog::DiagramFamily;

/// CRLF / CR to LF, and a leading byte-order mark removed.
pub fn line_endings(text: &str, _ctx: &RuleContext<'_>) -> Option<String> {
    let body = text.strip_prefix('\u{feff}').unwrap_or(text);
    if body.len() == text.len() && !body.contains('\r') {
        return None;
    }
    Some(body.replace("\r\n", "\n").replace('\r', "\n"))
}

fn numbered_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\s*)\d{1,3}[.)]\s+(\S.*)$").expect("valid regex"))
}

fn bullet_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\s*)[-*•]\s+(\S.*)$").expect("valid regex"))
}

/// Strips `1.` numbering and `-` / `*` / `•` bullets in front of statements.
///
/// Class diagrams keep bullets: `- name` is a private member there.
pub fn list_markers(text: &str, ctx: &RuleContext<'_>) -> Option<String> {
    if !ctx.options.strip_list_markers {
        return None;
    }
    let keep_bullets = ctx.family == DiagramFamily::Class;

    let out = text
        .split('\n')
        .map(|line| {
            if is_header_line(line) {
                return line.to_string();
            }
            if let Some(caps) = numbered_marker_re().captures(line) {
                return format!("{}{}", &caps[1], &caps[2]);
            }
            match bullet_marker_re().captures(line) {
                Some(caps) if !keep_bullets => format!("{}{}", &caps[1], &caps[2]),
                _ => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    changed(text, out)
}

/// `` A`Code Commit` `` becomes `A"Code Commit"`.
///
/// Backticks inside a double-quoted string are markdown-string syntax (`` A["`**bold**`"] ``)
/// and stay as they are.
pub fn backtick_labels(text: &str, _ctx: &RuleContext<'_>) -> Option<String> {
    let out = text
        .split('\n')
        .map(|line| {
            if !line.contains('`') || is_header_line(line) || line.trim_start().starts_with("%%") {
                line.to_string()
            } else {
                quote_backticks(line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    changed(text, out)
}

fn quote_backticks(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_quote = false;
    let mut i = 0usize;
    while let Some(ch) = line[i..].chars().next() {
        if ch == '`' && !in_quote {
            let body = &line[i + 1..];
            let close = body
                .find(['`', '"'])
                .filter(|&n| n > 0 && body[n..].starts_with('`'));
            if let Some(n) = close {
                out.push('"');
                out.push_str(&body[..n]);
                out.push('"');
                i += n + 2;
                continue;
            }
        }
        if ch == '"' {
            in_quote = !in_quote;
        }
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

/// Flow connectors that get spaced, longest first.
const FLOW_CONNECTORS: &[&str] = &["<-->", "-.->", "==>", "-->", "---"];

fn er_operator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\|o|\|\||\}o|\}\|)(--|\.\.)(o\||\|\||o\{|\|\{)").expect("valid regex")
    })
}

fn is_word(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// `A-->B` becomes `A --> B`; `A||--o{B` becomes `A ||--o{ B`.
pub fn connector_spacing(text: &str, ctx: &RuleContext<'_>) -> Option<String> {
    let space: fn(&str) -> String = match ctx.family {
        DiagramFamily::Flow => space_flow_line,
        DiagramFamily::EntityRelationship => space_er_line,
        _ => return None,
    };
    let out = text
        .split('\n')
        .map(|line| {
            if is_header_line(line) || line.trim_start().starts_with("%%") {
                line.to_string()
            } else {
                space(line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    changed(text, out)
}

fn space_flow_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len() + 8);
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut in_pipe = false;
    let mut i = 0usize;

    while i < line.len() {
        let rest = &line[i..];
        let Some(ch) = rest.chars().next() else {
            break;
        };
        if !in_quote && !in_pipe && depth == 0 {
            if let Some(conn) = FLOW_CONNECTORS.iter().find(|c| rest.starts_with(**c)) {
                // Longer arrows (`--->`, `====>`) are consumed whole.
                let extra = rest[conn.len()..]
                    .chars()
                    .take_while(|c| matches!(c, '-' | '=' | '.' | '>'))
                    .map(char::len_utf8)
                    .sum::<usize>();
                let token = &rest[..conn.len() + extra];
                if out
                    .chars()
                    .next_back()
                    .is_some_and(|p| is_word(p) || matches!(p, ']' | ')' | '}'))
                {
                    out.push(' ');
                }
                out.push_str(token);
                i += token.len();
                if line[i..].chars().next().is_some_and(is_word) {
                    out.push(' ');
                }
                continue;
            }
        }
        match ch {
            '"' => in_quote = !in_quote,
            '|' if !in_quote => in_pipe = !in_pipe,
            '[' | '(' | '{' if !in_quote && !in_pipe => depth += 1,
            ']' | ')' | '}' if !in_quote && !in_pipe => depth = depth.saturating_sub(1),
            _ => {}
        }
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

fn space_er_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len() + 4);
    let mut last = 0usize;
    for m in er_operator_re().find_iter(line) {
        out.push_str(&line[last..m.start()]);
        if line[..m.start()].chars().next_back().is_some_and(is_word) {
            out.push(' ');
        }
        out.push_str(m.as_str());
        if line[m.end()..].chars().next().is_some_and(is_word) {
            out.push(' ');
        }
        last = m.end();
    }
    out.push_str(&line[last..]);
    out
}

/// Trailing whitespace stripped, runs of three or more blank lines collapsed to one, and
/// leading/trailing blank lines dropped.
pub fn whitespace(text: &str, _ctx: &RuleContext<'_>) -> Option<String> {
    let lines: Vec<&str> = text.split('\n').map(str::trim_end).collect();
    let first = lines.iter().position(|l| !l.is_empty());
    let last = lines.iter().rposition(|l| !l.is_empty());
    let (Some(first), Some(last)) = (first, last) else {
        return changed(text, String::new());
    };

    let mut out: Vec<&str> = Vec::with_capacity(last - first + 1);
    let mut blank_run = 0usize;
    for line in &lines[first..=last] {
        if line.is_empty() {
            blank_run += 1;
            continue;
        }
        match blank_run {
            0 => {}
            1 | 2 => out.extend(std::iter::repeat_n("", blank_run)),
            _ => out.push(""),
        }
        blank_run = 0;
        out.push(line);
    }
    changed(text, out.join("\n"))
}
