//! Structural soundness checks. Read-only and diagnostic: a failed verdict never stops
//! extraction.

use serde::Serialize;

use crate::RepairOptions;
use crate::catalog::{self, DiagramFamily};

/// The first structural problem found in a diagram.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Defect {
    #[error("too short")]
    TooShort,
    #[error("unrecognized type")]
    UnrecognizedType,
    #[error("unbalanced brackets")]
    UnbalancedBrackets,
    #[error("unbalanced quotes")]
    UnbalancedQuotes,
    #[error("mismatched block start/end ({open} vs {close})")]
    MismatchedBlocks { open: usize, close: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationVerdict {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip)]
    pub defect: Option<Defect>,
}

impl ValidationVerdict {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            reason: None,
            defect: None,
        }
    }

    pub fn invalid(defect: Defect) -> Self {
        Self {
            is_valid: false,
            reason: Some(defect.to_string()),
            defect: Some(defect),
        }
    }
}

impl From<Result<(), Defect>> for ValidationVerdict {
    fn from(result: Result<(), Defect>) -> Self {
        match result {
            Ok(()) => Self::valid(),
            Err(defect) => Self::invalid(defect),
        }
    }
}

/// First line that is neither blank nor a `%%` comment.
fn first_statement(text: &str) -> Option<&str> {
    text.lines()
        .map(str::trim_start)
        .find(|line| !line.is_empty() && !line.starts_with("%%"))
}

fn check(text: &str, options: &RepairOptions) -> Result<(), Defect> {
    if text.trim().chars().count() < options.min_length {
        return Err(Defect::TooShort);
    }

    let kind = first_statement(text)
        .and_then(catalog::match_header_at)
        .map(|m| m.kind())
        .ok_or(Defect::UnrecognizedType)?;

    let opens = text.matches('[').count();
    let closes = text.matches(']').count();
    if opens != closes {
        return Err(Defect::UnbalancedBrackets);
    }

    if text.matches('"').count() % 2 != 0 {
        return Err(Defect::UnbalancedQuotes);
    }

    let family = DiagramFamily::of(Some(kind));
    if family.has_blocks() {
        let (open, close) = catalog::block_balance(text, family);
        if open != close {
            return Err(Defect::MismatchedBlocks { open, close });
        }
    }
    Ok(())
}

/// Checks, in order: length, header keyword, `[`/`]` balance, `"` parity, block balance.
pub fn validate(text: &str, options: &RepairOptions) -> ValidationVerdict {
    check(text, options).into()
}
