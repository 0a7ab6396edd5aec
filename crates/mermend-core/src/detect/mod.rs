//! Content detection: does a piece of LLM output contain a diagram at all?

use crate::RepairOptions;
use crate::catalog::{self, DiagramKind, DiagramType};
use crate::markdown::{self, Fence};

/// Why a fenced code block counts as a diagram fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceRole {
    /// Tagged with a configured diagram language (```` ```mermaid ````).
    Language,
    /// Untagged, with a diagram header as its first statement.
    Headed,
    /// Tagged with a diagram keyword (```` ```sequenceDiagram ````); the header may be missing
    /// from the body.
    Keyword(&'static DiagramType),
}

/// Classifies a fence; `None` for ordinary code blocks.
pub fn fence_role(fence: &Fence<'_>, source: &str, options: &RepairOptions) -> Option<FenceRole> {
    if fence.info.is_empty() {
        let first = fence
            .body_text(source)
            .lines()
            .find(|l| !l.trim().is_empty())?;
        return catalog::match_header_line(first).map(|_| FenceRole::Headed);
    }
    if options.is_fence_language(fence.info) {
        return Some(FenceRole::Language);
    }
    catalog::match_header_at(fence.info)
        .filter(|m| m.len == fence.info.len())
        .map(|m| FenceRole::Keyword(m.ty))
}

/// True when `text` contains a diagram header at a line start or a diagram fence.
pub fn has_diagram_content(text: &str, options: &RepairOptions) -> bool {
    if text.trim().is_empty() {
        return false;
    }
    if text.lines().any(|line| catalog::match_header_line(line).is_some()) {
        return true;
    }
    markdown::fences(text)
        .iter()
        .any(|fence| fence_role(fence, text, options).is_some())
}

/// Every diagram kind whose header appears at a line start (or as a fence tag), in source
/// order, without duplicates.
pub fn detect_kinds(text: &str) -> Vec<DiagramKind> {
    let mut kinds: Vec<DiagramKind> = Vec::new();
    for (_, line) in markdown::lines_with_offsets(text) {
        let trimmed = line.trim();
        let tag = trimmed.trim_start_matches(['`', '~']);
        let found = if tag.len() + 3 <= trimmed.len() {
            catalog::match_header_at(tag.trim()).filter(|m| m.len == tag.trim().len())
        } else {
            catalog::match_header_line(line)
        };
        if let Some(m) = found {
            if !kinds.contains(&m.kind()) {
                kinds.push(m.kind());
            }
        }
    }
    kinds
}
