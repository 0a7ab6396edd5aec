use std::sync::OnceLock;

use regex::Regex;

use super::{RuleContext, changed, indent_of, is_header_line};
use crate::catalog::{self, DiagramFamily};

/// Tokens that close a block and are sometimes glued to the next diagram's header.
const BLOCK_END_TOKENS: &[&str] = &["end", "}"];

/// `end` or `}` glued to (or directly followed by) the next diagram header gets a blank line.
pub fn concatenated_diagram_separator(text: &str, _ctx: &RuleContext<'_>) -> Option<String> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        let glued = BLOCK_END_TOKENS.iter().find_map(|tok| {
            let rest = trimmed.strip_prefix(tok)?;
            catalog::match_header_at(rest).map(|_| (*tok, rest))
        });
        if let Some((tok, header)) = glued {
            out.push(format!("{}{tok}", indent_of(line)));
            out.push(String::new());
            out.push(header.to_string());
            continue;
        }

        out.push(line.to_string());
        let closes = BLOCK_END_TOKENS.contains(&trimmed.trim_end());
        if closes && lines.get(i + 1).is_some_and(|next| is_header_line(next)) {
            out.push(String::new());
        }
    }
    changed(text, out.join("\n"))
}

fn subgraph_collision_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^(\s*)subgraph\s+([\w-]+\s*\[[^\]]*\]|"[^"]*")[ \t]+([\w-]+\s*(?:[\[({]|-->|---|==>|-\.->).*)$"#,
        )
        .expect("valid regex")
    })
}

/// `subgraph api[API] gw[Gateway] --> svc` becomes two lines.
pub fn subgraph_label_collision(text: &str, ctx: &RuleContext<'_>) -> Option<String> {
    if ctx.family != DiagramFamily::Flow {
        return None;
    }
    let out = text
        .split('\n')
        .map(|line| match subgraph_collision_re().captures(line) {
            Some(caps) => format!(
                "{indent}subgraph {name}\n{indent}    {rest}",
                indent = &caps[1],
                name = &caps[2],
                rest = caps[3].trim_end()
            ),
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n");
    changed(text, out)
}

fn quoted_subgraph_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^(\s*)subgraph\s+(?:"([^"]+)"|'([^']+)')\s*$"#).expect("valid regex")
    })
}

/// `subgraph "Name"` becomes `subgraph Name`.
pub fn quoted_block_name(text: &str, ctx: &RuleContext<'_>) -> Option<String> {
    if ctx.family != DiagramFamily::Flow {
        return None;
    }
    let out = text
        .split('\n')
        .map(|line| match quoted_subgraph_re().captures(line) {
            Some(caps) => {
                let name = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
                format!("{}subgraph {}", &caps[1], name.trim())
            }
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n");
    changed(text, out)
}

fn subgraph_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\s*)subgraph\s+(.+?)\s*$").expect("valid regex"))
}

fn safe_subgraph_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^[\w-]+(?:\s*(?:\[.*\]|\(.*\)|\{.*\}))?$"#).expect("valid regex")
    })
}

fn generated_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bsubgraph(\d+)\b").expect("valid regex"))
}

/// `subgraph Name With Spaces` becomes `subgraph subgraph1["Name With Spaces"]`.
///
/// Generated ids continue after the highest `subgraphN` already present in the segment.
pub fn unsafe_block_name(text: &str, ctx: &RuleContext<'_>) -> Option<String> {
    if ctx.family != DiagramFamily::Flow {
        return None;
    }
    let mut next_id = generated_id_re()
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse::<u64>().ok())
        .max()
        .unwrap_or(0)
        + 1;

    let out = text
        .split('\n')
        .map(|line| {
            let Some(caps) = subgraph_line_re().captures(line) else {
                return line.to_string();
            };
            let name = &caps[2];
            if safe_subgraph_name_re().is_match(name) {
                return line.to_string();
            }
            let label = name.trim().replace('"', "'");
            let id = next_id;
            next_id += 1;
            format!("{}subgraph subgraph{id}[\"{label}\"]", &caps[1])
        })
        .collect::<Vec<_>>()
        .join("\n");
    changed(text, out)
}

/// While `end` lines outnumber the family's block openers, the last `end` line is deleted.
///
/// Families without `end`-terminated blocks are left alone.
pub fn orphaned_block_end_removal(text: &str, ctx: &RuleContext<'_>) -> Option<String> {
    if !ctx.family.has_blocks() {
        return None;
    }
    let (open, close) = catalog::block_balance(text, ctx.family);
    if close <= open {
        return None;
    }
    let mut excess = close - open;
    let mut lines: Vec<&str> = text.split('\n').collect();
    let mut idx = lines.len();
    while excess > 0 && idx > 0 {
        idx -= 1;
        if catalog::is_block_end(lines[idx]) {
            lines.remove(idx);
            excess -= 1;
        }
    }
    changed(text, lines.join("\n"))
}
