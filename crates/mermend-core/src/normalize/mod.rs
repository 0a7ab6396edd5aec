//! Structural normalizer: an ordered table of named, independently testable rewrite rules.
//!
//! Each rule is a plain function returning `Some(new_text)` when it changed something and `None`
//! otherwise. Rules are no-ops on text that does not need them; the pipeline as a whole is re-run
//! through [`crate::fixpoint`] until it is stable, which makes [`normalize`] idempotent.

mod blocks;
mod labels;
mod lexical;
mod split;

use crate::RepairOptions;
use crate::catalog::{self, DiagramFamily, DiagramKind, HeaderScanner};
use crate::fixpoint::fixpoint;

pub use blocks::{
    concatenated_diagram_separator, orphaned_block_end_removal, quoted_block_name,
    subgraph_label_collision, unsafe_block_name,
};
pub use labels::{
    dangling_connector_join, multi_line_label_merge, truncated_label_continuation,
    unbalanced_label_closure,
};
pub use lexical::{backtick_labels, connector_spacing, line_endings, list_markers, whitespace};
pub use split::compression_split;

/// What a rule gets to see besides the text.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'o> {
    /// Kind of the segment (or of the first header, for document-scope rules).
    pub kind: Option<DiagramKind>,
    pub family: DiagramFamily,
    pub options: &'o RepairOptions,
}

impl<'o> RuleContext<'o> {
    pub fn new(kind: Option<DiagramKind>, options: &'o RepairOptions) -> Self {
        Self {
            kind,
            family: DiagramFamily::of(kind),
            options,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleScope {
    /// The rule sees the whole block at once.
    Document,
    /// The rule runs once per diagram segment, with that segment's kind.
    Segment,
}

pub type RuleFn = fn(&str, &RuleContext<'_>) -> Option<String>;

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub scope: RuleScope,
    pub apply: RuleFn,
}

const fn rule(name: &'static str, scope: RuleScope, apply: RuleFn) -> Rule {
    Rule { name, scope, apply }
}

/// The pipeline, in application order.
pub const RULES: &[Rule] = &[
    rule("line-endings", RuleScope::Document, line_endings),
    rule("list-markers", RuleScope::Segment, list_markers),
    rule("backtick-labels", RuleScope::Document, backtick_labels),
    rule(
        "concatenated-diagram-separator",
        RuleScope::Document,
        concatenated_diagram_separator,
    ),
    rule("compression-split", RuleScope::Segment, compression_split),
    rule(
        "dangling-connector-join",
        RuleScope::Segment,
        dangling_connector_join,
    ),
    rule(
        "multi-line-label-merge",
        RuleScope::Segment,
        multi_line_label_merge,
    ),
    rule(
        "truncated-label-continuation",
        RuleScope::Segment,
        truncated_label_continuation,
    ),
    rule(
        "subgraph-label-collision",
        RuleScope::Segment,
        subgraph_label_collision,
    ),
    rule("quoted-block-name", RuleScope::Segment, quoted_block_name),
    rule("unsafe-block-name", RuleScope::Segment, unsafe_block_name),
    rule(
        "unbalanced-label-closure",
        RuleScope::Segment,
        unbalanced_label_closure,
    ),
    rule("connector-spacing", RuleScope::Segment, connector_spacing),
    rule(
        "orphaned-block-end-removal",
        RuleScope::Segment,
        orphaned_block_end_removal,
    ),
    rule("whitespace", RuleScope::Document, whitespace),
];

/// Normalizes one diagram block: the rule table re-applied until stable.
///
/// If the table has not settled after `max_passes` passes the block is returned unchanged.
pub fn normalize(text: &str, options: &RepairOptions) -> String {
    let result = fixpoint(
        "normalize",
        text.to_string(),
        options.max_passes,
        |current| {
            let next = normalize_pass(current, options);
            (next != current).then_some(next)
        },
    );
    if !result.converged {
        tracing::warn!(
            passes = options.max_passes,
            "normalize did not settle; block left as given"
        );
        return text.to_string();
    }
    result.value
}

/// One application of every rule, in order.
pub fn normalize_pass(text: &str, options: &RepairOptions) -> String {
    RULES.iter().fold(text.to_string(), |acc, rule| {
        apply_rule(rule, &acc, options).unwrap_or(acc)
    })
}

/// Runs a single rule with the scope it declares.
pub fn apply_rule(rule: &Rule, text: &str, options: &RepairOptions) -> Option<String> {
    match rule.scope {
        RuleScope::Document => {
            let ctx = RuleContext::new(catalog::detect_kind(text), options);
            (rule.apply)(text, &ctx)
        }
        RuleScope::Segment => map_segments(text, |seg| {
            let ctx = RuleContext::new(seg.kind, options);
            (rule.apply)(seg.text, &ctx)
        }),
    }
}

/// A run of lines belonging to one diagram: from a top-level header line up to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub kind: Option<DiagramKind>,
    /// The segment's lines joined by `\n`, without the separating newline to the next segment.
    pub text: &'a str,
}

/// Splits a block into segments.
///
/// A header line only starts a new segment when it is indented no deeper than the first header
/// of the block and is not a plain-word keyword inside an open block; nested lines that happen
/// to start with a keyword (a mindmap node called `timeline`, say) stay inside their diagram.
pub fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut starts: Vec<(usize, Option<DiagramKind>)> = Vec::new();
    let mut top_indent: Option<usize> = None;
    let mut scanner = HeaderScanner::new();
    let mut offset = 0usize;

    for line in text.split('\n') {
        let indent = line.len() - line.trim_start().len();
        let candidate = catalog::match_header_line(line)
            .filter(|_| top_indent.is_none_or(|top| indent <= top));
        if let Some(m) = scanner.line(line, candidate) {
            top_indent.get_or_insert(indent);
            starts.push((offset, Some(m.kind())));
        }
        offset += line.len() + 1;
    }

    if starts.first().is_none_or(|&(start, _)| start != 0) {
        starts.insert(0, (0, None));
    }

    let mut out = Vec::with_capacity(starts.len());
    for (i, &(start, kind)) in starts.iter().enumerate() {
        let end = match starts.get(i + 1) {
            // Drop the newline that separates this segment from the next.
            Some(&(next, _)) => next - 1,
            None => text.len(),
        };
        out.push(Segment {
            kind,
            text: &text[start..end],
        });
    }
    out
}

/// Applies `f` to every segment and stitches the results back together.
pub(crate) fn map_segments<F>(text: &str, mut f: F) -> Option<String>
where
    F: FnMut(&Segment<'_>) -> Option<String>,
{
    let segs = segments(text);
    let mut changed = false;
    let mut parts: Vec<std::borrow::Cow<'_, str>> = Vec::with_capacity(segs.len());
    for seg in &segs {
        match f(seg) {
            Some(new) if new != seg.text => {
                changed = true;
                parts.push(new.into());
            }
            _ => parts.push(seg.text.into()),
        }
    }
    changed.then(|| parts.join("\n"))
}

pub(crate) fn changed(original: &str, new: String) -> Option<String> {
    (new != original).then_some(new)
}

pub(crate) fn indent_of(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// Net count of label openers minus closers on a line. Flowcharts also use `(` and `{` shapes.
pub(crate) fn label_depth_delta(line: &str, family: DiagramFamily) -> i64 {
    let flow = family == DiagramFamily::Flow;
    line.chars().fold(0i64, |acc, ch| match ch {
        '[' => acc + 1,
        ']' => acc - 1,
        '(' | '{' if flow => acc + 1,
        ')' | '}' if flow => acc - 1,
        _ => acc,
    })
}

pub(crate) fn is_header_line(line: &str) -> bool {
    catalog::match_header_line(line).is_some()
}
