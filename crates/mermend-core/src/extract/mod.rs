//! Splitting LLM output into individual diagrams, repairing each, and naming them.

use std::borrow::Cow;
use std::ops::Range;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::catalog::{self, DiagramKind, HeaderScanner};
use crate::detect::{FenceRole, fence_role, has_diagram_content};
use crate::markdown::{self, Fence, Heading};
use crate::validate::{ValidationVerdict, validate};
use crate::{NamingMode, RepairOptions, pipeline};

/// A contiguous piece of the input believed to hold one diagram, before repair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock<'a> {
    pub kind: Option<DiagramKind>,
    /// Byte range in the source this block was taken from.
    pub span: Range<usize>,
    /// Block text. Owned only when a fence tag had to be turned into a header line.
    pub text: Cow<'a, str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedDiagram {
    pub kind: Option<DiagramKind>,
    pub text: String,
    pub verdict: ValidationVerdict,
    #[serde(skip)]
    pub span: Range<usize>,
}

/// Repaired diagrams keyed by unique name, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NamedDiagramSet {
    diagrams: IndexMap<String, ExtractedDiagram>,
}

impl NamedDiagramSet {
    /// Repaired text of the diagram called `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.diagrams.get(name).map(|d| d.text.as_str())
    }

    pub fn diagram(&self, name: &str) -> Option<&ExtractedDiagram> {
        self.diagrams.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExtractedDiagram)> {
        self.diagrams.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.diagrams.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.diagrams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagrams.is_empty()
    }

    /// Drops verdicts and spans: name → repaired text.
    pub fn into_text_map(self) -> IndexMap<String, String> {
        self.diagrams
            .into_iter()
            .map(|(name, d)| (name, d.text))
            .collect()
    }
}

impl<'s> IntoIterator for &'s NamedDiagramSet {
    type Item = (&'s String, &'s ExtractedDiagram);
    type IntoIter = indexmap::map::Iter<'s, String, ExtractedDiagram>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagrams.iter()
    }
}

/// The input document with every extracted diagram repaired in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixedDocument {
    pub diagrams: NamedDiagramSet,
    pub content: String,
}

/// Where a block came from, which decides how it is written back.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Origin {
    /// Fence body; `close` is the delimiter to append when the fence was never closed.
    Fence { close: Option<String> },
    Raw,
    /// The whole input, after every other strategy came up empty.
    Whole,
}

#[derive(Debug, Clone)]
struct Candidate<'a> {
    block: RawBlock<'a>,
    name_hint: Option<String>,
    origin: Origin,
}

/// Raw blocks of `text`, before repair: diagram fences when there are any, header
/// occurrences otherwise.
pub fn split_blocks<'a>(text: &'a str, options: &RepairOptions) -> Vec<RawBlock<'a>> {
    candidates(text, options)
        .into_iter()
        .map(|c| c.block)
        .collect()
}

fn candidates<'a>(text: &'a str, options: &RepairOptions) -> Vec<Candidate<'a>> {
    let fences = markdown::fences(text);
    let diagram_fences: Vec<(&Fence<'a>, FenceRole)> = fences
        .iter()
        .filter_map(|f| fence_role(f, text, options).map(|role| (f, role)))
        .collect();

    if diagram_fences.is_empty() {
        tracing::debug!("no diagram fences; splitting on header occurrences");
        return raw_candidates(text, &fences);
    }

    let headings = markdown::headings(text);
    tracing::debug!(count = diagram_fences.len(), "splitting on diagram fences");
    diagram_fences
        .into_iter()
        .filter_map(|(fence, role)| fence_candidate(text, fence, role, &headings, options))
        .collect()
}

fn fence_candidate<'a>(
    text: &'a str,
    fence: &Fence<'a>,
    role: FenceRole,
    headings: &[Heading<'a>],
    options: &RepairOptions,
) -> Option<Candidate<'a>> {
    let body = fence.body_text(text).trim();
    if body.is_empty() {
        return None;
    }
    let mut kind = catalog::detect_kind(body);
    let block_text = match role {
        FenceRole::Keyword(ty) if kind.is_none() => {
            kind = Some(ty.kind);
            Cow::Owned(format!("{}\n{body}", ty.keyword))
        }
        _ => Cow::Borrowed(body),
    };

    let name_hint = match options.naming {
        NamingMode::Positional => None,
        NamingMode::Headings => markdown::nearest_heading_before(headings, fence.open.start)
            .map(|h| kebab_slug(h.text))
            .filter(|slug| !slug.is_empty()),
    };
    let close = fence.close.is_none().then(|| closing_delimiter(&text[fence.open.clone()]));

    Some(Candidate {
        block: RawBlock {
            kind,
            span: fence.body.clone(),
            text: block_text,
        },
        name_hint,
        origin: Origin::Fence { close },
    })
}

fn closing_delimiter(open_line: &str) -> String {
    let trimmed = open_line.trim_start();
    let ch = trimmed.chars().next().unwrap_or('`');
    trimmed.chars().take_while(|&c| c == ch).collect()
}

/// Byte offsets of every header occurrence outside `masked` ranges: at a line start, or glued
/// to a preceding `end` / `}`.
fn header_occurrences(text: &str, masked: &[Range<usize>]) -> Vec<(usize, DiagramKind)> {
    let mut found: Vec<(usize, DiagramKind)> = Vec::new();
    let mut scanner = HeaderScanner::new();
    for (start, line) in markdown::lines_with_offsets(text) {
        if masked.iter().any(|r| r.contains(&start)) {
            continue;
        }
        let trimmed = line.trim_start();
        let lead = line.len() - trimmed.len();
        if let Some(m) = scanner.line(line, catalog::match_header_at(trimmed)) {
            found.push((start + lead, m.kind()));
        }
        for tok in ["end", "}"] {
            for (idx, _) in trimmed.match_indices(tok) {
                let glued_to_word = trimmed[..idx]
                    .chars()
                    .next_back()
                    .is_some_and(|c| c.is_alphanumeric() && tok == "end");
                if glued_to_word {
                    continue;
                }
                let at = idx + tok.len();
                if let Some(m) = catalog::match_header_at(&trimmed[at..]) {
                    found.push((start + lead + at, m.kind()));
                }
            }
        }
    }
    found.sort_by_key(|&(offset, _)| offset);
    found.dedup_by_key(|&mut (offset, _)| offset);
    found
}

fn is_section_break(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || markdown::heading_text(trimmed).is_some() || markdown::is_thematic_break(trimmed)
}

/// Drops trailing headings, horizontal rules and blank lines from a raw span.
fn trim_section_tail(text: &str) -> &str {
    let mut end = text.trim_end().len();
    loop {
        let body = &text[..end];
        let line_start = body.rfind('\n').map_or(0, |i| i + 1);
        if line_start == 0 || !is_section_break(&body[line_start..]) {
            return body;
        }
        end = body[..line_start].trim_end().len();
    }
}

fn raw_candidates<'a>(text: &'a str, fences: &[Fence<'a>]) -> Vec<Candidate<'a>> {
    let masked: Vec<Range<usize>> = fences.iter().map(Fence::outer).collect();
    let occurrences = header_occurrences(text, &masked);

    let mut out = Vec::with_capacity(occurrences.len());
    for (i, &(start, kind)) in occurrences.iter().enumerate() {
        let mut end = occurrences.get(i + 1).map_or(text.len(), |&(next, _)| next);
        // A code block that starts inside the span ends it.
        if let Some(fence) = masked.iter().find(|r| r.start > start && r.start < end) {
            end = fence.start;
        }
        let body = trim_section_tail(&text[start..end]);
        if body.trim().is_empty() {
            continue;
        }
        let name_hint = markdown::heading_immediately_before(text, start)
            .map(compact_token)
            .or_else(|| leading_comment(body).map(compact_token))
            .filter(|name| !name.is_empty());
        out.push(Candidate {
            block: RawBlock {
                kind: Some(kind),
                span: start..start + body.len(),
                text: Cow::Borrowed(body),
            },
            name_hint,
            origin: Origin::Raw,
        });
    }
    out
}

/// Text of the first `%%` comment (not a `%%{...}%%` directive) in a block.
fn leading_comment(block: &str) -> Option<&str> {
    block
        .lines()
        .skip(1)
        .map(str::trim)
        .find(|l| l.starts_with("%%") && !l.starts_with("%%{"))
        .map(|l| l.trim_start_matches('%').trim())
}

/// Lowercase alphanumerics only: `## User Login Flow` names a block `userloginflow`.
pub fn compact_token(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn list_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\d+[.)]\s*").expect("valid regex"))
}

/// Kebab-case slug: `2. User Login Flow` names a block `user-login-flow`.
pub fn kebab_slug(text: &str) -> String {
    let text = list_number_re().replace(text, "");
    let mut slug = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Repairs one block; a panic inside a rule degrades to the trimmed input.
fn repair_guarded(text: &str, options: &RepairOptions) -> String {
    match catch_unwind(AssertUnwindSafe(|| pipeline::repair(text, options))) {
        Ok(repaired) => repaired.trim().to_string(),
        Err(_) => {
            tracing::error!(len = text.len(), "repair panicked; keeping the block unmodified");
            text.trim().to_string()
        }
    }
}

struct Repaired<'a> {
    candidate: Candidate<'a>,
    text: String,
}

fn whole_input_candidate(text: &str) -> Candidate<'_> {
    let fences = markdown::fences(text);
    let delimiter_lines: Vec<Range<usize>> = fences
        .iter()
        .flat_map(|f| std::iter::once(f.open.clone()).chain(f.close.clone()))
        .collect();
    let stripped: String = markdown::lines_with_offsets(text)
        .filter(|(start, _)| !delimiter_lines.iter().any(|r| r.start == *start))
        .map(|(_, line)| line)
        .collect();
    Candidate {
        block: RawBlock {
            kind: catalog::detect_kind(&stripped),
            span: 0..text.len(),
            text: Cow::Owned(stripped),
        },
        name_hint: None,
        origin: Origin::Whole,
    }
}

fn extract<'a>(text: &'a str, options: &RepairOptions) -> Vec<Repaired<'a>> {
    if !has_diagram_content(text, options) {
        return Vec::new();
    }

    let keep = |r: &Repaired<'_>| r.text.chars().count() >= options.min_length;
    let survivors: Vec<Repaired<'a>> = candidates(text, options)
        .into_iter()
        .map(|candidate| Repaired {
            text: repair_guarded(&candidate.block.text, options),
            candidate,
        })
        .filter(keep)
        .collect();
    if !survivors.is_empty() {
        return survivors;
    }

    tracing::debug!("no block survived; repairing the whole input");
    let candidate = whole_input_candidate(text);
    let whole = Repaired {
        text: repair_guarded(&candidate.block.text, options),
        candidate,
    };
    if keep(&whole) { vec![whole] } else { Vec::new() }
}

fn unique_name(base: String, used: &mut FxHashSet<String>) -> String {
    if used.insert(base.clone()) {
        return base;
    }
    (2u64..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| used.insert(candidate.clone()))
        .unwrap_or(base)
}

fn name_all(repaired: &[Repaired<'_>]) -> Vec<String> {
    let mut used: FxHashSet<String> = FxHashSet::default();
    repaired
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let base = r
                .candidate
                .name_hint
                .clone()
                .unwrap_or_else(|| format!("diagram{}", i + 1));
            unique_name(base, &mut used)
        })
        .collect()
}

fn into_set(repaired: &[Repaired<'_>], names: Vec<String>, options: &RepairOptions) -> NamedDiagramSet {
    let diagrams = repaired
        .iter()
        .zip(names)
        .map(|(r, name)| {
            let diagram = ExtractedDiagram {
                kind: catalog::detect_kind(&r.text).or(r.candidate.block.kind),
                verdict: validate(&r.text, options),
                text: r.text.clone(),
                span: r.candidate.block.span.clone(),
            };
            (name, diagram)
        })
        .collect();
    NamedDiagramSet { diagrams }
}

/// Every diagram in `text`, repaired and named. Never fails; an input without diagrams yields
/// an empty set.
pub fn parse_diagrams(text: &str, options: &RepairOptions) -> NamedDiagramSet {
    let repaired = extract(text, options);
    let names = name_all(&repaired);
    into_set(&repaired, names, options)
}

/// [`parse_diagrams`] plus a copy of `text` with every diagram replaced by its repaired form.
pub fn extract_and_fix(text: &str, options: &RepairOptions) -> FixedDocument {
    let repaired = extract(text, options);
    let names = name_all(&repaired);

    let mut content = String::with_capacity(text.len());
    let mut cursor = 0usize;
    for r in &repaired {
        let span = &r.candidate.block.span;
        if span.start < cursor {
            continue;
        }
        content.push_str(&text[cursor..span.start]);
        match &r.candidate.origin {
            Origin::Fence { close } => {
                content.push_str(&r.text);
                content.push('\n');
                if let Some(delim) = close {
                    content.push_str(delim);
                    content.push('\n');
                }
            }
            Origin::Raw | Origin::Whole => content.push_str(&r.text),
        }
        cursor = span.end;
    }
    content.push_str(&text[cursor..]);

    FixedDocument {
        diagrams: into_set(&repaired, names, options),
        content,
    }
}
