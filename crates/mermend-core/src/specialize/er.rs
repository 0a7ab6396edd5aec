use std::sync::OnceLock;

use regex::Regex;

use crate::normalize::changed;

const ATTRIBUTE_INDENT: &str = "    ";

fn entity_open_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^(\s*)([A-Za-z_][\w-]*|"[^"]*")\s*\{(.*)$"#).expect("valid regex")
    })
}

fn relationship_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\|o|\|\||\}o|\}\|)(--|\.\.)(o\||\|\||o\{|\|\{)").expect("valid regex")
    })
}

fn relationship_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^(\s*\S.*?(?:\|o|\|\||\}o|\}\|)(?:--|\.\.)(?:o\||\|\||o\{|\|\{)\s*(?:"[^"]*"|[^\s:"]+))\s*:\s*(.*?)\s*$"#,
        )
        .expect("valid regex")
    })
}

fn is_single_word(label: &str) -> bool {
    label
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

/// The label a relationship should carry, or `None` when it is fine as written.
fn requote_label(label: &str) -> Option<String> {
    let core = label.trim_matches(|c: char| c == '"' || c == '\'').trim();
    if core.is_empty() {
        return None;
    }
    let quoted = label.len() >= 2
        && label.starts_with('"')
        && label.ends_with('"')
        && !label[1..label.len() - 1].contains('"');
    if quoted || (!label.contains(['"', '\'']) && is_single_word(core)) {
        return None;
    }
    Some(format!("\"{}\"", core.replace('"', "'")))
}

/// Relationship labels that Mermaid would reject are rewritten: `: "places` is closed,
/// `""places""` collapses to `"places"`, multi-word labels are quoted. Lines holding nothing but a
/// `"` are dropped.
pub fn repair_relationship_labels(text: &str) -> Option<String> {
    let out = text
        .split('\n')
        .filter(|line| line.trim() != "\"")
        .map(|line| {
            let Some(caps) = relationship_label_re().captures(line) else {
                return line.to_string();
            };
            match requote_label(&caps[2]) {
                Some(label) => format!("{} : {label}", &caps[1]),
                None => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    changed(text, out)
}

/// An entity block located in the source lines.
struct EntityBlock<'a> {
    indent: &'a str,
    name: &'a str,
    /// Raw body text, lines joined by `\n`.
    body: String,
    /// Text after the closing `}` on its line.
    tail: &'a str,
    /// Index of the line holding the closing brace.
    close_line: usize,
    malformed: bool,
}

fn find_block<'a>(lines: &[&'a str], start: usize) -> Option<EntityBlock<'a>> {
    let caps = entity_open_re().captures(lines[start])?;
    let indent = caps.get(1).map_or("", |m| m.as_str());
    let name = caps.get(2).map_or("", |m| m.as_str());
    let after_open = caps.get(3).map_or("", |m| m.as_str());

    if let Some(close) = after_open.find('}') {
        let body = after_open[..close].to_string();
        let tail = after_open[close + 1..].trim();
        return Some(EntityBlock {
            indent,
            name,
            // `NAME {}` on one line is malformed only when something follows it.
            malformed: !body.trim().is_empty() || !tail.is_empty(),
            body,
            tail,
            close_line: start,
        });
    }

    let mut body_lines: Vec<&str> = Vec::new();
    let mut malformed = !after_open.trim().is_empty();
    if malformed {
        body_lines.push(after_open);
    }
    for (idx, line) in lines.iter().enumerate().skip(start + 1) {
        if entity_open_re().is_match(line) || relationship_re().is_match(line) {
            // The next statement starts before this entity closed.
            return None;
        }
        if let Some(close) = line.find('}') {
            let before = &line[..close];
            let tail = line[close + 1..].trim();
            if !before.trim().is_empty() {
                body_lines.push(before);
                malformed = true;
            }
            malformed |= !tail.is_empty()
                || body_lines.iter().any(|l| l.trim().is_empty())
                || body_lines.iter().any(|l| attribute_count(l) != 1);
            return Some(EntityBlock {
                indent,
                name,
                body: body_lines.join("\n"),
                tail,
                close_line: idx,
                malformed,
            });
        }
        body_lines.push(line);
    }
    None
}

/// Attribute entries, split on newlines, commas and semicolons outside quotes.
fn entries(body: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut in_quote = false;
    let mut last = 0usize;
    for (idx, ch) in body.char_indices() {
        match ch {
            '"' => in_quote = !in_quote,
            '\n' | ',' | ';' if !in_quote => {
                out.push(&body[last..idx]);
                last = idx + 1;
            }
            _ => {}
        }
    }
    out.push(&body[last..]);
    out.into_iter().map(str::trim).filter(|e| !e.is_empty()).collect()
}

fn words(entry: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut in_quote = false;
    let mut start: Option<usize> = None;
    for (idx, ch) in entry.char_indices() {
        if ch.is_whitespace() && !in_quote {
            if let Some(s) = start.take() {
                out.push(&entry[s..idx]);
            }
            continue;
        }
        start.get_or_insert(idx);
        if ch == '"' {
            in_quote = !in_quote;
        }
    }
    if let Some(s) = start {
        out.push(&entry[s..]);
    }
    out
}

fn is_key(word: &str) -> bool {
    ["PK", "FK", "UK"].iter().any(|k| k.eq_ignore_ascii_case(word))
}

#[derive(Debug, Default)]
struct Attribute<'a> {
    ty: Option<&'a str>,
    name: Option<&'a str>,
    keys: Vec<&'a str>,
    comment: Option<&'a str>,
}

impl Attribute<'_> {
    fn is_empty(&self) -> bool {
        self.ty.is_none() && self.keys.is_empty() && self.comment.is_none()
    }

    fn render(&self) -> String {
        let mut out = [self.ty, self.name]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if !self.keys.is_empty() {
            out.push(' ');
            out.push_str(&self.keys.join(", "));
        }
        if let Some(comment) = self.comment {
            out.push(' ');
            out.push_str(comment);
        }
        out
    }
}

fn parse_attributes(body: &str) -> Vec<Attribute<'_>> {
    let mut attrs: Vec<Attribute<'_>> = Vec::new();
    for entry in entries(body) {
        let words = words(entry);
        // `string id PK, FK`: a bare key list continues the previous attribute.
        if words.iter().all(|w| is_key(w)) {
            if let Some(prev) = attrs.last_mut() {
                prev.keys.extend(words);
                continue;
            }
        }
        let mut current = Attribute::default();
        for word in words {
            if word.starts_with('"') {
                current.comment = Some(word);
            } else if is_key(word) && current.name.is_some() {
                current.keys.push(word);
            } else if current.name.is_some() || current.comment.is_some() {
                attrs.push(std::mem::take(&mut current));
                current.ty = Some(word);
            } else if current.ty.is_some() {
                current.name = Some(word);
            } else {
                current.ty = Some(word);
            }
        }
        if !current.is_empty() {
            attrs.push(current);
        }
    }
    attrs
}

fn attribute_count(line: &str) -> usize {
    parse_attributes(line).len()
}

/// Rewrites malformed entity blocks so every attribute sits on its own indented line.
pub fn reformat_entity_blocks(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut i = 0usize;

    while i < lines.len() {
        let Some(block) = find_block(&lines, i).filter(|b| b.malformed) else {
            out.push(lines[i].to_string());
            i += 1;
            continue;
        };
        out.push(format!("{}{} {{", block.indent, block.name));
        for attr in parse_attributes(&block.body) {
            out.push(format!("{}{ATTRIBUTE_INDENT}{}", block.indent, attr.render()));
        }
        out.push(format!("{}}}", block.indent));
        if !block.tail.is_empty() {
            out.push(format!("{}{}", block.indent, block.tail));
        }
        i = block.close_line + 1;
    }
    changed(text, out.join("\n"))
}
