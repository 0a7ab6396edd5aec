//! Compression split: statements that an LLM (or a copy-paste) squeezed onto one line are put
//! back on lines of their own.
//!
//! Only segments with at most two non-empty lines are touched. Each line is tokenized on
//! whitespace, keeping quoted strings and bracketed labels intact, and a family-specific
//! splitter decides where new statements begin.

use std::sync::OnceLock;

use regex::Regex;

use super::{RuleContext, changed, indent_of, label_depth_delta};
use crate::catalog::{self, DiagramFamily};

const STATEMENT_INDENT: &str = "    ";

pub fn compression_split(text: &str, ctx: &RuleContext<'_>) -> Option<String> {
    // Other kinds carry options on the header line itself (`gitGraph LR:`).
    if matches!(
        ctx.family,
        DiagramFamily::Block | DiagramFamily::Other | DiagramFamily::Unknown
    ) {
        return None;
    }
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.iter().filter(|l| !l.trim().is_empty()).count() > 2 {
        return None;
    }

    let mut out: Vec<String> = Vec::with_capacity(lines.len() + 4);
    for line in lines {
        let trimmed = line.trim_start();
        let indent = indent_of(line);
        match catalog::match_header_at(trimmed) {
            Some(header) => {
                let rest = trimmed[header.len..].trim().trim_start_matches(';').trim();
                if rest.is_empty() || rest.starts_with("%%") {
                    out.push(line.to_string());
                    continue;
                }
                let statements = split_statements(rest, ctx.family);
                if !keeps_labels_whole(&statements, ctx.family) {
                    out.push(line.to_string());
                    continue;
                }
                out.push(format!("{indent}{}", &trimmed[..header.len]));
                let inner = if indent.is_empty() {
                    STATEMENT_INDENT.to_string()
                } else {
                    format!("{indent}{STATEMENT_INDENT}")
                };
                out.extend(statements.into_iter().map(|s| format!("{inner}{s}")));
            }
            None if trimmed.is_empty() || trimmed.starts_with("%%") => out.push(line.to_string()),
            None => {
                let statements = split_statements(trimmed.trim_end(), ctx.family);
                if statements.len() > 1 && keeps_labels_whole(&statements, ctx.family) {
                    let indent = if indent.is_empty() { STATEMENT_INDENT } else { indent };
                    out.extend(statements.into_iter().map(|s| format!("{indent}{s}")));
                } else {
                    out.push(line.to_string());
                }
            }
        }
    }
    changed(text, out.join("\n"))
}

/// A split that leaves a label open on one statement would be merged back by the label rules
/// on the next pass; such lines wait until the closure rule has balanced them.
fn keeps_labels_whole(statements: &[String], family: DiagramFamily) -> bool {
    statements
        .iter()
        .all(|s| label_depth_delta(s, family) == 0)
}

fn split_statements(line: &str, family: DiagramFamily) -> Vec<String> {
    match family {
        DiagramFamily::Flow => split_on_semicolons(line)
            .into_iter()
            .flat_map(|part| split_flow_like(&tokenize(part, FLOW_BRACKETS, true), &FLOW))
            .collect(),
        DiagramFamily::Class => split_flow_like(&tokenize(line, CLASS_BRACKETS, false), &CLASS),
        DiagramFamily::StateMachine => split_flow_like(&tokenize(line, "", false), &STATE),
        DiagramFamily::MessageExchange => {
            split_sequence(&tokenize(line, SEQUENCE_BRACKETS, false))
        }
        DiagramFamily::EntityRelationship => split_er(&tokenize(line, "", false)),
        DiagramFamily::Block | DiagramFamily::Other | DiagramFamily::Unknown => {
            vec![line.trim().to_string()]
        }
    }
}

const FLOW_BRACKETS: &str = "[](){}";
const CLASS_BRACKETS: &str = "()[]";
const SEQUENCE_BRACKETS: &str = "()[]{}";

/// Whitespace-separated tokens. Quoted strings and the given bracket pairs (written as
/// `"()[]"`, opener then closer) keep their inner whitespace; `pipes` does the same for
/// `|edge label|` segments.
fn tokenize<'a>(line: &'a str, brackets: &str, pipes: bool) -> Vec<&'a str> {
    let pairs: Vec<(char, char)> = brackets
        .chars()
        .collect::<Vec<_>>()
        .chunks(2)
        .filter_map(|pair| match pair {
            [open, close] => Some((*open, *close)),
            _ => None,
        })
        .collect();

    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut in_pipe = false;

    for (idx, ch) in line.char_indices() {
        let boundary = ch.is_whitespace() && depth == 0 && !in_quote && !in_pipe;
        if boundary {
            if let Some(s) = start.take() {
                tokens.push(&line[s..idx]);
            }
            continue;
        }
        start.get_or_insert(idx);
        if ch == '"' {
            in_quote = !in_quote;
        } else if in_quote {
            continue;
        } else if pipes && ch == '|' && depth == 0 {
            in_pipe = !in_pipe;
        } else if pairs.iter().any(|&(open, _)| open == ch) {
            depth += 1;
        } else if pairs.iter().any(|&(_, close)| close == ch) {
            depth = depth.saturating_sub(1);
        }
    }
    if let Some(s) = start {
        tokens.push(&line[s..]);
    }
    tokens
}

/// `;`-separated parts outside quotes and brackets.
fn split_on_semicolons(line: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut last = 0usize;
    for (idx, ch) in line.char_indices() {
        match ch {
            '"' => in_quote = !in_quote,
            '[' | '(' | '{' if !in_quote => depth += 1,
            ']' | ')' | '}' if !in_quote => depth = depth.saturating_sub(1),
            ';' if !in_quote && depth == 0 => {
                parts.push(&line[last..idx]);
                last = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&line[last..]);
    parts.into_iter().filter(|p| !p.trim().is_empty()).collect()
}

/// Keyword table and connector predicate for the operand/connector splitters.
struct FlowLike {
    /// Statement keywords with the number of argument tokens they take.
    keywords: &'static [(&'static str, usize)],
    is_connector: fn(&str) -> bool,
    /// `A --> B : label` style trailing labels.
    colon_labels: bool,
}

const FLOW: FlowLike = FlowLike {
    keywords: &[
        ("subgraph", 1),
        ("end", 0),
        ("direction", 1),
        ("classDef", 2),
        ("class", 2),
        ("style", 2),
        ("linkStyle", 2),
        ("click", 2),
    ],
    is_connector: is_flow_connector,
    colon_labels: false,
};

const CLASS: FlowLike = FlowLike {
    keywords: &[("class", 1), ("direction", 1), ("namespace", 1)],
    is_connector: is_class_relation,
    colon_labels: true,
};

const STATE: FlowLike = FlowLike {
    keywords: &[("state", 1), ("direction", 1)],
    is_connector: is_state_transition,
    colon_labels: true,
};

fn flow_connector_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:\|.*|&|[<ox]?(?:-{2,}|={2,}|-\.+-?|~{3,})[-=.>ox]*(?:\|.*)?)$")
            .expect("valid regex")
    })
}

fn is_flow_connector(token: &str) -> bool {
    flow_connector_re().is_match(token)
}

fn class_relation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^(?:"[^"]*")?(?:<\||\*|o|<)?(?:--|\.\.)(?:\|>|\*|o|>)?(?:"[^"]*")?$"#)
            .expect("valid regex")
    })
}

fn is_class_relation(token: &str) -> bool {
    class_relation_re().is_match(token)
}

/// `as` binds like a connector so `state "Long name" as L` stays together.
fn is_state_transition(token: &str) -> bool {
    matches!(token, "-->" | "as")
}

/// Connector tokens that open an edge whose text follows (`A -- text --> B`).
fn opens_edge_text(token: &str) -> bool {
    matches!(token, "--" | "==" | "-.")
}

/// Operand/connector splitter shared by flowcharts, class and state diagrams: an operand that
/// follows a complete statement (rather than a connector) begins a new one.
fn split_flow_like(tokens: &[&str], lang: &FlowLike) -> Vec<String> {
    let mut statements: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut pending_args = 0usize;
    let mut prev_connector = false;
    let mut open_edge = false;
    let mut in_label = false;

    fn flush<'t>(current: &mut Vec<&'t str>, statements: &mut Vec<Vec<&'t str>>) {
        if !current.is_empty() {
            statements.push(std::mem::take(current));
        }
    }

    for (i, &token) in tokens.iter().enumerate() {
        if pending_args > 0 {
            current.push(token);
            pending_args -= 1;
            continue;
        }
        if let Some(&(_, args)) = lang.keywords.iter().find(|(kw, _)| *kw == token) {
            if !open_edge {
                flush(&mut current, &mut statements);
                current.push(token);
                pending_args = args;
                prev_connector = false;
                in_label = false;
                continue;
            }
        }
        if (lang.is_connector)(token) {
            current.push(token);
            prev_connector = true;
            open_edge = opens_edge_text(token);
            in_label = false;
            continue;
        }
        if lang.colon_labels && (token.starts_with(':') || token.ends_with(':')) {
            current.push(token);
            prev_connector = false;
            in_label = true;
            continue;
        }
        if matches!(token, "{") {
            current.push(token);
            flush(&mut current, &mut statements);
            continue;
        }
        if matches!(token, "}") {
            flush(&mut current, &mut statements);
            statements.push(vec![token]);
            continue;
        }

        let next_is_connector = tokens
            .get(i + 1)
            .is_some_and(|next| (lang.is_connector)(next));
        let attach = current.is_empty()
            || prev_connector
            || open_edge
            || (in_label && !next_is_connector);
        if !attach {
            flush(&mut current, &mut statements);
            in_label = false;
        }
        current.push(token);
        prev_connector = false;
    }
    flush(&mut current, &mut statements);
    statements.into_iter().map(|s| s.join(" ")).collect()
}

/// Keywords that always start a statement in a message-exchange diagram.
const SEQUENCE_STATEMENTS: &[&str] = &[
    "participant",
    "actor",
    "Note",
    "loop",
    "alt",
    "opt",
    "par",
    "critical",
    "break",
    "rect",
    "box",
    "activate",
    "deactivate",
    "autonumber",
];

/// Block keywords that are ordinary words unless the matching block is open.
fn continues_block(token: &str, innermost: Option<&str>) -> bool {
    match token {
        "else" => innermost == Some("alt"),
        "and" => innermost == Some("par"),
        "option" => innermost == Some("critical"),
        _ => false,
    }
}

fn message_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][\w.]*(?:<<-->>|<<->>|-->>|->>|-->|->|--x|-x|--\)|-\))")
            .expect("valid regex")
    })
}

fn arrow_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:<<-->>|<<->>|-->>|->>|-->|->|--x|-x|--\)|-\))").expect("valid regex")
    })
}

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][\w.]*$").expect("valid regex"))
}

fn starts_message(tokens: &[&str], i: usize) -> bool {
    let token = tokens[i];
    message_start_re().is_match(token)
        || (identifier_re().is_match(token)
            && tokens
                .get(i + 1)
                .is_some_and(|next| arrow_start_re().is_match(next)))
}

fn split_sequence(tokens: &[&str]) -> Vec<String> {
    let mut statements: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut open_blocks: Vec<&str> = Vec::new();
    let mut pending_args = 0usize;

    for (i, &token) in tokens.iter().enumerate() {
        if pending_args > 0 {
            current.push(token);
            pending_args -= 1;
            continue;
        }
        let innermost = open_blocks.last().copied();
        let starts = if SEQUENCE_STATEMENTS.contains(&token) {
            if catalog::block_opener(token, DiagramFamily::MessageExchange).is_some() {
                open_blocks.push(token);
            }
            if matches!(token, "activate" | "deactivate") {
                pending_args = 1;
            }
            true
        } else if token == "end" && !open_blocks.is_empty() {
            open_blocks.pop();
            true
        } else {
            continues_block(token, innermost) || starts_message(tokens, i)
        };

        if starts && !current.is_empty() {
            statements.push(std::mem::take(&mut current));
        }
        current.push(token);
    }
    if !current.is_empty() {
        statements.push(current);
    }
    statements.into_iter().map(|s| s.join(" ")).collect()
}

fn cardinality_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:\|o|\|\||\}o|\}\|)(?:--|\.\.)(?:o\||\|\||o\{|\|\{)$").expect("valid regex")
    })
}

/// `ORDER{` with the brace glued to the entity name.
fn glued_entity_open(token: &str) -> bool {
    token.len() > 1 && token.ends_with('{') && !token.starts_with('{') && !cardinality_re().is_match(token)
}

fn split_er(tokens: &[&str]) -> Vec<String> {
    let mut statements: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_entity = false;

    for (i, &token) in tokens.iter().enumerate() {
        if in_entity {
            current.push(token);
            if token.ends_with('}') {
                in_entity = false;
                statements.push(std::mem::take(&mut current));
            }
            continue;
        }
        let next = tokens.get(i + 1).copied().unwrap_or("");
        let starts =
            next.starts_with('{') || glued_entity_open(token) || cardinality_re().is_match(next);
        if starts && !current.is_empty() {
            statements.push(std::mem::take(&mut current));
        }
        current.push(token);
        if token.starts_with('{') || glued_entity_open(token) {
            if token.len() > 1 && token.ends_with('}') {
                statements.push(std::mem::take(&mut current));
            } else {
                in_entity = true;
            }
        }
    }
    if !current.is_empty() {
        statements.push(current);
    }
    statements.into_iter().map(|s| s.join(" ")).collect()
}
