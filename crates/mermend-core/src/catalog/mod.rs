//! Diagram-type catalog: the closed set of Mermaid header keywords this crate recognizes.
//!
//! The catalog is plain data. Adding a diagram family means adding a [`DiagramKind`] variant and
//! a [`DiagramType`] row; the rule pipeline only ever consults [`DiagramFamily`].

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagramKind {
    Flowchart,
    Sequence,
    Class,
    State,
    Er,
    Gantt,
    Pie,
    Journey,
    GitGraph,
    Requirement,
    Mindmap,
    Timeline,
    QuadrantChart,
    Sankey,
    XyChart,
    Block,
    C4Context,
    C4Container,
    C4Component,
    C4Dynamic,
    C4Deployment,
}

/// Groups of kinds that share lexical conventions (and therefore repair rules).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagramFamily {
    /// Participants exchanging labeled messages (`sequenceDiagram`).
    MessageExchange,
    EntityRelationship,
    StateMachine,
    Class,
    /// `graph` / `flowchart`.
    Flow,
    /// `block-beta` grids, whose `block:` groups close with `end`.
    Block,
    Other,
    /// Text whose header could not be recognized.
    Unknown,
}

impl DiagramKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flowchart => "flowchart",
            Self::Sequence => "sequence",
            Self::Class => "class",
            Self::State => "state",
            Self::Er => "er",
            Self::Gantt => "gantt",
            Self::Pie => "pie",
            Self::Journey => "journey",
            Self::GitGraph => "gitGraph",
            Self::Requirement => "requirement",
            Self::Mindmap => "mindmap",
            Self::Timeline => "timeline",
            Self::QuadrantChart => "quadrantChart",
            Self::Sankey => "sankey",
            Self::XyChart => "xychart",
            Self::Block => "block",
            Self::C4Context => "c4Context",
            Self::C4Container => "c4Container",
            Self::C4Component => "c4Component",
            Self::C4Dynamic => "c4Dynamic",
            Self::C4Deployment => "c4Deployment",
        }
    }

    pub const fn family(self) -> DiagramFamily {
        match self {
            Self::Sequence => DiagramFamily::MessageExchange,
            Self::Er => DiagramFamily::EntityRelationship,
            Self::State => DiagramFamily::StateMachine,
            Self::Class => DiagramFamily::Class,
            Self::Flowchart => DiagramFamily::Flow,
            Self::Block => DiagramFamily::Block,
            _ => DiagramFamily::Other,
        }
    }
}

impl DiagramFamily {
    pub fn of(kind: Option<DiagramKind>) -> Self {
        kind.map_or(Self::Unknown, DiagramKind::family)
    }

    /// Keywords that open an `end`-terminated block in this family.
    pub const fn block_openers(self) -> &'static [&'static str] {
        match self {
            Self::Flow => FLOW_BLOCK_OPENERS,
            Self::MessageExchange => MESSAGE_BLOCK_OPENERS,
            Self::Block => GRID_BLOCK_OPENERS,
            Self::Unknown => ANY_BLOCK_OPENERS,
            _ => &[],
        }
    }

    /// Whether `end` lines mean anything in this family.
    pub const fn has_blocks(self) -> bool {
        !self.block_openers().is_empty()
    }
}

const FLOW_BLOCK_OPENERS: &[&str] = &["subgraph"];
const MESSAGE_BLOCK_OPENERS: &[&str] = &[
    "loop", "alt", "opt", "par", "critical", "break", "rect", "box",
];
const GRID_BLOCK_OPENERS: &[&str] = &["block"];
const ANY_BLOCK_OPENERS: &[&str] = &[
    "subgraph", "loop", "alt", "opt", "par", "critical", "break", "rect", "box",
];

/// Flowchart direction tokens accepted after `graph` / `flowchart`.
pub const DIRECTIONS: &[&str] = &["TB", "TD", "LR", "RL", "BT"];

/// One header variant of a diagram kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagramType {
    pub kind: DiagramKind,
    pub keyword: &'static str,
    /// The header may carry a direction token (`graph TD`).
    pub directional: bool,
}

impl DiagramType {
    /// Keywords such as `timeline` or `requirement` that are just as likely to be a node id.
    pub fn is_plain_word(&self) -> bool {
        !self.directional && self.keyword.bytes().all(|b| b.is_ascii_lowercase())
    }
}

const fn ty(kind: DiagramKind, keyword: &'static str) -> DiagramType {
    DiagramType {
        kind,
        keyword,
        directional: false,
    }
}

const fn directional(kind: DiagramKind, keyword: &'static str) -> DiagramType {
    DiagramType {
        kind,
        keyword,
        directional: true,
    }
}

/// Every recognized header keyword. Variants that extend another keyword come first.
pub const CATALOG: &[DiagramType] = &[
    directional(DiagramKind::Flowchart, "flowchart-elk"),
    directional(DiagramKind::Flowchart, "flowchart"),
    directional(DiagramKind::Flowchart, "graph"),
    ty(DiagramKind::Sequence, "sequenceDiagram"),
    ty(DiagramKind::Class, "classDiagram-v2"),
    ty(DiagramKind::Class, "classDiagram"),
    ty(DiagramKind::State, "stateDiagram-v2"),
    ty(DiagramKind::State, "stateDiagram"),
    ty(DiagramKind::Er, "erDiagram"),
    ty(DiagramKind::Gantt, "gantt"),
    ty(DiagramKind::Pie, "pie"),
    ty(DiagramKind::Journey, "journey"),
    ty(DiagramKind::GitGraph, "gitGraph"),
    ty(DiagramKind::Requirement, "requirementDiagram"),
    ty(DiagramKind::Requirement, "requirement"),
    ty(DiagramKind::Mindmap, "mindmap"),
    ty(DiagramKind::Timeline, "timeline"),
    ty(DiagramKind::QuadrantChart, "quadrantChart"),
    ty(DiagramKind::Sankey, "sankey-beta"),
    ty(DiagramKind::Sankey, "sankey"),
    ty(DiagramKind::XyChart, "xychart-beta"),
    ty(DiagramKind::XyChart, "xychart"),
    ty(DiagramKind::Block, "block-beta"),
    ty(DiagramKind::C4Context, "C4Context"),
    ty(DiagramKind::C4Container, "C4Container"),
    ty(DiagramKind::C4Component, "C4Component"),
    ty(DiagramKind::C4Dynamic, "C4Dynamic"),
    ty(DiagramKind::C4Deployment, "C4Deployment"),
];

/// A header keyword found at the start of some text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderMatch {
    pub ty: &'static DiagramType,
    /// Byte length of the header: the keyword plus, for directional headers, the direction.
    pub len: usize,
}

impl HeaderMatch {
    pub fn kind(&self) -> DiagramKind {
        self.ty.kind
    }
}

/// Matches a header keyword at the very start of `text` (no leading whitespace allowed).
///
/// The keyword must be followed by whitespace or end of input. `graph` and `flowchart` must
/// additionally be followed by a direction token or stand alone on their line, so prose like
/// "graph theory" is not a header. A plain-word keyword followed on its line by a connector, a
/// `:` or a node shape (`requirement --> design`, `timeline[Plan]`) is a statement instead.
pub fn match_header_at(text: &str) -> Option<HeaderMatch> {
    CATALOG.iter().find_map(|ty| {
        let rest = text.strip_prefix(ty.keyword)?;
        let len = if ty.directional {
            ty.keyword.len() + directional_tail(rest)?
        } else {
            if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
                return None;
            }
            if ty.is_plain_word() && continues_statement(rest) {
                return None;
            }
            ty.keyword.len()
        };
        Some(HeaderMatch { ty, len })
    })
}

/// Characters that, first on the rest of a line, make a leading word an operand.
const STATEMENT_CONTINUATIONS: &[char] = &[
    '-', '=', '.', ':', ';', '[', '(', '{', '&', '|', '<', '>', '~',
];

fn continues_statement(rest: &str) -> bool {
    let line_rest = rest.split('\n').next().unwrap_or("");
    line_rest
        .trim_start_matches([' ', '\t'])
        .starts_with(STATEMENT_CONTINUATIONS)
}

fn directional_tail(rest: &str) -> Option<usize> {
    let line_rest = rest.split('\n').next().unwrap_or("");
    if line_rest.trim().is_empty() {
        return Some(0);
    }
    let trimmed = line_rest.trim_start_matches([' ', '\t']);
    if trimmed.len() == line_rest.len() {
        // Something other than whitespace directly after the keyword.
        return None;
    }
    let ws = line_rest.len() - trimmed.len();
    DIRECTIONS.iter().find_map(|dir| {
        let after = trimmed.strip_prefix(dir)?;
        let boundary = after.is_empty() || after.starts_with([' ', '\t', ';', '\r']);
        boundary.then_some(ws + dir.len())
    })
}

/// Matches a header keyword on a single line, ignoring leading whitespace.
pub fn match_header_line(line: &str) -> Option<HeaderMatch> {
    match_header_at(line.trim_start())
}

/// Kind of the first header line found in `text`.
pub fn detect_kind(text: &str) -> Option<DiagramKind> {
    text.lines()
        .find_map(match_header_line)
        .map(|m| m.kind())
}

/// The block opener keyword a line starts with, if any.
pub fn block_opener(line: &str, family: DiagramFamily) -> Option<&'static str> {
    let trimmed = line.trim_start();
    family.block_openers().iter().copied().find(|kw| {
        trimmed.strip_prefix(kw).is_some_and(|rest| {
            rest.is_empty()
                || rest.starts_with(char::is_whitespace)
                || (family == DiagramFamily::Block && rest.starts_with(':'))
        })
    })
}

pub fn is_block_end(line: &str) -> bool {
    line.trim() == "end"
}

/// `(openers, ends)` counted line by line.
pub fn block_balance(text: &str, family: DiagramFamily) -> (usize, usize) {
    text.lines().fold((0, 0), |(open, close), line| {
        if block_opener(line, family).is_some() {
            (open + 1, close)
        } else if is_block_end(line) {
            (open, close + 1)
        } else {
            (open, close)
        }
    })
}

/// Line-by-line header recognition that keeps track of open blocks.
///
/// Inside an open `subgraph`/`loop`/`block:` a plain-word keyword on its own (`timeline`) is a
/// node, not the start of another diagram.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderScanner {
    family: Option<DiagramFamily>,
    depth: usize,
}

impl HeaderScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line along with the header the caller found on it (if any); returns the header
    /// when it really starts a new diagram.
    pub fn line(&mut self, line: &str, header: Option<HeaderMatch>) -> Option<HeaderMatch> {
        if let Some(m) = header {
            if !(m.ty.is_plain_word() && self.depth > 0) {
                self.family = Some(m.kind().family());
                self.depth = 0;
                return Some(m);
            }
            tracing::debug!(
                keyword = m.ty.keyword,
                depth = self.depth,
                "keyword inside an open block read as a node"
            );
        }
        if let Some(family) = self.family {
            if block_opener(line, family).is_some() {
                self.depth += 1;
            } else if is_block_end(line) {
                self.depth = self.depth.saturating_sub(1);
            }
        }
        None
    }
}
