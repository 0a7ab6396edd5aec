#![forbid(unsafe_code)]

//! Repair and extraction of Mermaid diagram text produced by language models.
//!
//! LLM output mixes prose, Markdown fences and diagram source, and the diagram source itself is
//! often structurally broken: statements squeezed onto one line, labels split across lines,
//! unclosed `subgraph`/`loop` blocks, unquoted punctuation. This crate finds the diagrams,
//! rewrites them into text a Mermaid parser accepts, and reports what still looks wrong.
//!
//! Design goals:
//! - total: malformed input is never an error, it degrades to a best-effort result
//! - bounded: every rewrite loop has a cap, and matching is linear-time (`regex`)
//! - stateless: nothing survives between calls
//!
//! ```
//! let text = "Here you go:\n```mermaid\ngraph TD\nA-->B\n```\n";
//! let diagrams = mermend_core::parse_diagrams(text);
//! assert_eq!(diagrams.get("diagram1"), Some("graph TD\nA --> B"));
//! ```

pub mod catalog;
pub mod config;
pub mod detect;
pub mod error;
pub mod extract;
pub mod fixpoint;
pub mod markdown;
pub mod normalize;
mod pipeline;
pub mod specialize;
pub mod validate;

pub use catalog::{DiagramFamily, DiagramKind};
pub use config::{NamingMode, RepairOptions};
pub use error::{Error, Result};
pub use extract::{ExtractedDiagram, FixedDocument, NamedDiagramSet, RawBlock};
pub use validate::{Defect, ValidationVerdict};

/// Entry point carrying a set of [`RepairOptions`].
///
/// The free functions at the crate root use [`RepairOptions::default`]; a `Repairer` is the way
/// to use anything else. It is plain data and can be shared across threads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Repairer {
    options: RepairOptions,
}

impl Repairer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `options` as-is after validating them.
    pub fn with_options(options: RepairOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    /// Layers a (possibly partial) JSON object over the current options.
    pub fn with_overrides(self, overlay: &serde_json::Value) -> Result<Self> {
        Ok(Self {
            options: self.options.with_overrides(overlay)?,
        })
    }

    pub fn options(&self) -> &RepairOptions {
        &self.options
    }

    pub fn has_diagram_content(&self, text: &str) -> bool {
        detect::has_diagram_content(text, &self.options)
    }

    pub fn detect_kinds(&self, text: &str) -> Vec<DiagramKind> {
        detect::detect_kinds(text)
    }

    pub fn parse_diagrams(&self, text: &str) -> NamedDiagramSet {
        extract::parse_diagrams(text, &self.options)
    }

    pub fn extract_and_fix(&self, text: &str) -> FixedDocument {
        extract::extract_and_fix(text, &self.options)
    }

    /// Structural normalization only (no family-specific rules).
    pub fn normalize(&self, block: &str) -> String {
        normalize::normalize(block, &self.options)
    }

    /// Normalization followed by the family specializers, repeated until stable.
    pub fn repair(&self, block: &str) -> String {
        pipeline::repair(block, &self.options)
    }

    pub fn validate(&self, diagram: &str) -> ValidationVerdict {
        validate::validate(diagram, &self.options)
    }
}

pub fn has_diagram_content(text: &str) -> bool {
    detect::has_diagram_content(text, &RepairOptions::default())
}

pub fn detect_kinds(text: &str) -> Vec<DiagramKind> {
    detect::detect_kinds(text)
}

pub fn parse_diagrams(text: &str) -> NamedDiagramSet {
    extract::parse_diagrams(text, &RepairOptions::default())
}

pub fn extract_and_fix(text: &str) -> FixedDocument {
    extract::extract_and_fix(text, &RepairOptions::default())
}

pub fn normalize(block: &str) -> String {
    normalize::normalize(block, &RepairOptions::default())
}

pub fn repair(block: &str) -> String {
    pipeline::repair(block, &RepairOptions::default())
}

pub fn validate(diagram: &str) -> ValidationVerdict {
    validate::validate(diagram, &RepairOptions::default())
}

#[cfg(test)]
mod tests;
