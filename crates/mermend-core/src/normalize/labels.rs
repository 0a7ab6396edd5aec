use super::{RuleContext, changed, is_header_line, label_depth_delta};
use crate::catalog::{self, DiagramFamily};
use crate::fixpoint::fixpoint;

/// Connector tails that leave an edge without a target.
const DANGLING_CONNECTORS: &[&str] = &["-->", "---", "==>", "-.->", "-.-"];

fn ends_with_connector(line: &str) -> bool {
    let trimmed = line.trim_end();
    DANGLING_CONNECTORS.iter().any(|c| trimmed.ends_with(c))
}

/// `A -->` followed by `B` on the next non-blank line becomes `A --> B`.
pub fn dangling_connector_join(text: &str, ctx: &RuleContext<'_>) -> Option<String> {
    if ctx.family != DiagramFamily::Flow {
        return None;
    }
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut i = 0usize;
    while i < lines.len() {
        let mut current = lines[i].to_string();
        i += 1;
        while ends_with_connector(&current) && !is_header_line(&current) {
            let Some(next) = (i..lines.len()).find(|&j| !lines[j].trim().is_empty()) else {
                break;
            };
            let candidate = lines[next].trim();
            if is_header_line(candidate) || catalog::is_block_end(candidate) {
                break;
            }
            current = format!("{} {}", current.trim_end(), candidate);
            i = next + 1;
        }
        out.push(current);
    }
    changed(text, out.join("\n"))
}

/// Nothing but line-break markers.
fn is_marker_only(fragment: &str, marker: &str) -> bool {
    fragment.replace(marker, "").trim().is_empty()
}

fn is_closer_only(fragment: &str) -> bool {
    fragment.chars().all(|c| matches!(c, ']' | ')' | '}') || c.is_whitespace())
}

fn breaks_label(line: &str) -> bool {
    line.trim().is_empty() || is_header_line(line) || catalog::is_block_end(line)
}

/// One pass: every label opened on a line and closed within `label_merge_span` lines is pulled
/// onto its opening line.
fn merge_labels_once(text: &str, family: DiagramFamily, span: usize, marker: &str) -> Option<String> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut merged_any = false;
    let mut i = 0usize;

    while i < lines.len() {
        let line = lines[i];
        let mut depth = label_depth_delta(line, family);
        let mut close_at = None;
        if depth > 0 {
            for (j, next) in lines.iter().enumerate().skip(i + 1).take(span) {
                if breaks_label(next) {
                    break;
                }
                depth += label_depth_delta(next, family);
                if depth <= 0 {
                    close_at = (depth == 0).then_some(j);
                    break;
                }
            }
        }
        match close_at {
            Some(j) => {
                let mut joined = line.trim_end().to_string();
                for piece in lines[i + 1..=j].iter().map(|p| p.trim()) {
                    if is_closer_only(piece) {
                        joined.push_str(piece);
                    } else if !is_marker_only(piece, marker) {
                        joined.push_str(marker);
                        joined.push_str(piece);
                    }
                }
                out.push(joined);
                merged_any = true;
                i = j + 1;
            }
            None => {
                out.push(line.to_string());
                i += 1;
            }
        }
    }
    merged_any.then(|| out.join("\n"))
}

/// `A[Validate user` / `credentials]` becomes `A[Validate user<br/>credentials]`.
pub fn multi_line_label_merge(text: &str, ctx: &RuleContext<'_>) -> Option<String> {
    let opts = ctx.options;
    let result = fixpoint(
        "multi-line-label-merge",
        text.to_string(),
        opts.max_rule_iterations,
        |current| {
            merge_labels_once(current, ctx.family, opts.label_merge_span, &opts.line_break)
        },
    );
    changed(text, result.value)
}

/// Byte offset of the first `]` that has no opener before it on the line.
fn unmatched_closer(line: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, ch) in line.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' if depth == 0 => return Some(idx),
            ']' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn looks_like_statement(fragment: &str) -> bool {
    ["--", "==", "->", ":"].iter().any(|t| fragment.contains(t))
}

fn continue_labels_once(text: &str, marker: &str) -> Option<String> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut merged_any = false;

    for line in lines {
        let Some(prev) = out.last() else {
            out.push(line.to_string());
            continue;
        };
        let prev_trimmed = prev.trim_end();
        let fits = !line.trim().is_empty()
            && !is_header_line(prev)
            && prev_trimmed.ends_with(']')
            && !prev_trimmed.ends_with("]]")
            && label_depth_delta(prev, DiagramFamily::Other) == 0;
        let split = fits
            .then(|| unmatched_closer(line))
            .flatten()
            .map(|at| (line[..at].trim(), &line[at..]))
            .filter(|(fragment, _)| {
                !fragment.is_empty()
                    && !is_marker_only(fragment, marker)
                    && !looks_like_statement(fragment)
            });

        match split {
            Some((fragment, rest)) => {
                let head = &prev_trimmed[..prev_trimmed.len() - 1];
                let joined = format!("{head}{marker}{fragment}{rest}");
                if let Some(last) = out.last_mut() {
                    *last = joined;
                }
                merged_any = true;
            }
            None => out.push(line.to_string()),
        }
    }
    merged_any.then(|| out.join("\n"))
}

/// `A[Validate user]` / `credentials] --> B` becomes `A[Validate user<br/>credentials] --> B`.
pub fn truncated_label_continuation(text: &str, ctx: &RuleContext<'_>) -> Option<String> {
    let opts = ctx.options;
    let result = fixpoint(
        "truncated-label-continuation",
        text.to_string(),
        opts.max_rule_iterations,
        |current| continue_labels_once(current, &opts.line_break),
    );
    changed(text, result.value)
}

fn close_line(line: &str, family: DiagramFamily) -> Option<String> {
    let flow = family == DiagramFamily::Flow;
    let mut stack: Vec<char> = Vec::new();
    let mut in_quote = false;
    let mut prev: Option<char> = None;

    for ch in line.chars() {
        if ch == '"' {
            in_quote = !in_quote;
        } else if !in_quote {
            match ch {
                '[' => stack.push(']'),
                '(' if flow => stack.push(')'),
                '{' if flow && prev.is_some_and(|p| p.is_alphanumeric() || p == '_' || p == '{') => {
                    stack.push('}')
                }
                ']' | ')' | '}' => {
                    if stack.last() == Some(&ch) {
                        stack.pop();
                    }
                }
                _ => {}
            }
        }
        prev = Some(ch);
    }

    if stack.is_empty() {
        return None;
    }
    let mut out = line.trim_end().to_string();
    if in_quote {
        out.push('"');
    }
    out.extend(stack.iter().rev());
    Some(out)
}

/// Appends missing label closers (and a missing quote inside an open label) per line.
pub fn unbalanced_label_closure(text: &str, ctx: &RuleContext<'_>) -> Option<String> {
    let out = text
        .split('\n')
        .map(|line| {
            let skip = is_header_line(line) || line.trim_start().starts_with("%%");
            match close_line(line, ctx.family).filter(|_| !skip) {
                Some(closed) => closed,
                None => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    changed(text, out)
}
