//! Markdown scanning on top of `pulldown-cmark`: fenced code blocks and ATX headings, with
//! byte ranges into the source.
//!
//! An unterminated fence runs to end of text (CommonMark semantics), which is what truncated
//! LLM output needs.

use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fence<'a> {
    /// First word of the info string (`mermaid` for ```` ```mermaid title ````), may be empty.
    pub info: &'a str,
    /// The opening fence line, including its newline.
    pub open: Range<usize>,
    /// Everything between the fence lines.
    pub body: Range<usize>,
    /// The closing fence line; `None` when the fence runs to end of text.
    pub close: Option<Range<usize>>,
}

impl<'a> Fence<'a> {
    pub fn body_text(&self, source: &'a str) -> &'a str {
        &source[self.body.clone()]
    }

    /// Span covering the whole fence, delimiters included.
    pub fn outer(&self) -> Range<usize> {
        let end = self.close.as_ref().map_or(self.body.end, |c| c.end);
        self.open.start..end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading<'a> {
    /// Byte offset of the heading line.
    pub offset: usize,
    pub level: usize,
    pub text: &'a str,
}

/// Lines with their starting byte offsets. Each line keeps its trailing newline.
pub(crate) fn lines_with_offsets(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split_inclusive('\n').scan(0usize, |offset, line| {
        let start = *offset;
        *offset += line.len();
        Some((start, line))
    })
}

struct FenceMarker<'a> {
    ch: char,
    len: usize,
    info: &'a str,
}

/// The fence run on an opening line; list or quote prefixes before it are skipped.
fn fence_marker(line: &str) -> Option<FenceMarker<'_>> {
    let run = &line[line.find(['`', '~'])?..];
    let ch = run.chars().next()?;
    let len = run.chars().take_while(|&c| c == ch).count();
    let info = run[len..].split_whitespace().next().unwrap_or("");
    Some(FenceMarker { ch, len, info })
}

fn closes(line: &str, open: &FenceMarker<'_>) -> bool {
    let trimmed = line.trim();
    let run = trimmed.chars().take_while(|&c| c == open.ch).count();
    run >= open.len && trimmed[run..].trim().is_empty()
}

/// Splits the source range of a fenced code block into its delimiter and body lines.
fn fence_at(text: &str, range: Range<usize>) -> Option<Fence<'_>> {
    let line_start = text[..range.start].rfind('\n').map_or(0, |i| i + 1);
    let mut lines = lines_with_offsets(&text[line_start..])
        .map(|(offset, line)| (line_start + offset, line))
        .take_while(|(start, _)| *start < range.end);

    let (open_start, open_line) = lines.next()?;
    let marker = fence_marker(open_line)?;
    let open = open_start..open_start + open_line.len();
    let rest: Vec<(usize, &str)> = lines.collect();

    let close = rest
        .last()
        .filter(|(_, line)| closes(line, &marker))
        .map(|&(start, line)| start..start + line.len());
    let body_end = match &close {
        Some(close) => close.start,
        None => rest.last().map_or(open.end, |&(start, line)| start + line.len()),
    };
    Some(Fence {
        info: marker.info,
        body: open.end..body_end,
        open,
        close,
    })
}

/// All fenced code blocks, in source order.
pub fn fences(text: &str) -> Vec<Fence<'_>> {
    Parser::new(text)
        .into_offset_iter()
        .filter_map(|(event, range)| match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(_))) => fence_at(text, range),
            _ => None,
        })
        .collect()
}

/// Text of an ATX heading line (`## Title ##` → `Title`).
pub fn heading_text(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim();
    let level = trimmed.chars().take_while(|&c| c == '#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let text = rest.trim().trim_end_matches('#').trim();
    (!text.is_empty()).then_some((level, text))
}

/// All ATX headings, in source order. Setext underlines are ignored: in LLM output a `---`
/// under a diagram line is a separator, not a heading.
pub fn headings(text: &str) -> Vec<Heading<'_>> {
    Parser::new(text)
        .into_offset_iter()
        .filter_map(|(event, range)| match event {
            Event::Start(Tag::Heading { .. }) => {
                let line = text[range.start..].lines().next()?;
                let (level, title) = heading_text(line)?;
                Some(Heading {
                    offset: range.start,
                    level,
                    text: title,
                })
            }
            _ => None,
        })
        .collect()
}

/// The nearest heading that starts before `offset`.
pub fn nearest_heading_before<'h, 'a>(
    headings: &'h [Heading<'a>],
    offset: usize,
) -> Option<&'h Heading<'a>> {
    let idx = headings.partition_point(|h| h.offset < offset);
    idx.checked_sub(1).map(|i| &headings[i])
}

/// The heading on the last non-blank line before `offset`, if that line is a heading.
pub fn heading_immediately_before(text: &str, offset: usize) -> Option<&str> {
    let line = text[..offset].lines().rev().find(|l| !l.trim().is_empty())?;
    heading_text(line).map(|(_, text)| text)
}

/// `---`, `***` or `___` (three or more, optionally spaced).
pub fn is_thematic_break(line: &str) -> bool {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    compact.len() >= 3
        && ['-', '*', '_']
            .iter()
            .any(|&ch| compact.chars().all(|c| c == ch))
}
