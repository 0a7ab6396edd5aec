//! Family-specific repairs, layered after the structural normalizer.
//!
//! Each segment is dispatched on its [`DiagramFamily`]; families without a specializer pass
//! through untouched.

mod class;
mod er;
mod flowchart;
mod sequence;
mod state;

use crate::RepairOptions;
use crate::catalog::{self, DiagramFamily};
use crate::normalize::{RuleContext, map_segments};

pub use class::normalize_class_members;
pub use er::{reformat_entity_blocks, repair_relationship_labels};
pub use flowchart::close_open_subgraphs;
pub use sequence::{close_open_groups, quote_message_labels, quote_note_text, quote_participant_aliases};
pub use state::quote_transition_labels;

/// One specializer pass over every segment of a block.
pub fn specialize_pass(text: &str, options: &RepairOptions) -> String {
    map_segments(text, |seg| {
        let ctx = RuleContext::new(seg.kind, options);
        specialize_segment(seg.text, &ctx)
    })
    .unwrap_or_else(|| text.to_string())
}

fn specialize_segment(text: &str, ctx: &RuleContext<'_>) -> Option<String> {
    let steps: &[fn(&str) -> Option<String>] = match ctx.family {
        DiagramFamily::MessageExchange => &[
            quote_message_labels,
            quote_participant_aliases,
            quote_note_text,
            close_open_groups,
        ],
        DiagramFamily::EntityRelationship => &[repair_relationship_labels, reformat_entity_blocks],
        DiagramFamily::Class => &[normalize_class_members],
        DiagramFamily::StateMachine => &[quote_transition_labels],
        DiagramFamily::Flow => &[close_open_subgraphs],
        DiagramFamily::Block | DiagramFamily::Other | DiagramFamily::Unknown => return None,
    };
    let out = steps.iter().fold(text.to_string(), |acc, step| step(&acc).unwrap_or(acc));
    (out != text).then_some(out)
}

/// Wraps `text` in double quotes; inner double quotes become single quotes.
pub(crate) fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "'"))
}

pub(crate) fn is_quoted(text: &str) -> bool {
    text.len() >= 2 && text.starts_with('"') && text.ends_with('"')
}

/// Appends one `end` per opener that outnumbers the `end` lines, indented like the innermost
/// unclosed openers.
///
/// The count matches [`catalog::block_balance`], which is what orphaned-end removal and the
/// validator use, so the two rules never undo each other.
pub(crate) fn close_open_blocks(text: &str, family: DiagramFamily) -> Option<String> {
    let (opened, closed) = catalog::block_balance(text, family);
    let missing = opened.saturating_sub(closed);
    if missing == 0 {
        return None;
    }

    let mut unclosed: Vec<&str> = Vec::new();
    for line in text.split('\n') {
        if catalog::block_opener(line, family).is_some() {
            unclosed.push(crate::normalize::indent_of(line));
        } else if catalog::is_block_end(line) {
            unclosed.pop();
        }
    }

    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    let trailing_blank = lines.iter().rev().take_while(|l| l.trim().is_empty()).count();
    let tail = lines.split_off(lines.len() - trailing_blank);
    lines.extend(
        unclosed
            .iter()
            .rev()
            .copied()
            .chain(std::iter::repeat(""))
            .take(missing)
            .map(|indent| format!("{indent}end")),
    );
    lines.extend(tail);
    Some(lines.join("\n"))
}
