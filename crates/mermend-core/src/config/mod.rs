use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How extracted diagrams are keyed in a [`crate::NamedDiagramSet`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NamingMode {
    /// Fenced blocks are `diagram1`, `diagram2`, ...; raw blocks use a preceding heading or a
    /// leading `%%` comment when one exists.
    #[default]
    Positional,
    /// Fenced blocks are named after the nearest preceding markdown heading (kebab-case slug).
    Headings,
}

/// Knobs for detection, repair and extraction.
///
/// Every field has a default, so a partial JSON object is a valid configuration:
///
/// ```
/// use mermend_core::RepairOptions;
///
/// let opts = RepairOptions::from_json_str(r#"{ "minLength": 20, "naming": "headings" }"#)?;
/// assert_eq!(opts.min_length, 20);
/// assert_eq!(opts.line_break, "<br/>");
/// # Ok::<(), mermend_core::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RepairOptions {
    /// Diagrams shorter than this many characters (after trimming) are noise.
    pub min_length: usize,
    /// Cap for every loop-based rule (see [`crate::fixpoint`]).
    pub max_rule_iterations: usize,
    /// Cap for re-running the whole normalize + specialize pipeline until it is stable.
    pub max_passes: usize,
    /// Inline line-break marker used when label fragments are merged onto one line.
    pub line_break: String,
    /// Fence info strings that mark a diagram fence.
    pub fence_languages: Vec<String>,
    pub naming: NamingMode,
    /// How many lines ahead a multi-line label may look for its closing bracket.
    pub label_merge_span: usize,
    /// Strip `1.` / `-` list markers that LLMs put in front of statements.
    pub strip_list_markers: bool,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            min_length: 10,
            max_rule_iterations: 64,
            max_passes: 8,
            line_break: "<br/>".to_string(),
            fence_languages: vec!["mermaid".to_string()],
            naming: NamingMode::Positional,
            label_merge_span: 4,
            strip_list_markers: true,
        }
    }
}

impl RepairOptions {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let overlay: Value = serde_json::from_str(text).map_err(|e| Error::InvalidOptionsJson {
            message: e.to_string(),
        })?;
        Self::default().with_overrides(&overlay)
    }

    /// Layers a (possibly partial) JSON object over these options.
    pub fn with_overrides(self, overlay: &Value) -> Result<Self> {
        let mut base = serde_json::to_value(&self).map_err(|e| Error::InvalidOptionsJson {
            message: e.to_string(),
        })?;
        deep_merge_value(&mut base, overlay);
        let merged: Self =
            serde_json::from_value(base).map_err(|e| Error::InvalidOptionsJson {
                message: e.to_string(),
            })?;
        merged.validate()?;
        Ok(merged)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_rule_iterations == 0 {
            return Err(Error::InvalidOption {
                option: "maxRuleIterations",
                message: "must be at least 1".to_string(),
            });
        }
        if self.max_passes == 0 {
            return Err(Error::InvalidOption {
                option: "maxPasses",
                message: "must be at least 1".to_string(),
            });
        }
        if self.label_merge_span == 0 {
            return Err(Error::InvalidOption {
                option: "labelMergeSpan",
                message: "must be at least 1".to_string(),
            });
        }
        if self.line_break.is_empty() || self.line_break.contains('\n') {
            return Err(Error::InvalidOption {
                option: "lineBreak",
                message: "must be a non-empty single-line marker".to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn is_fence_language(&self, info: &str) -> bool {
        self.fence_languages
            .iter()
            .any(|lang| lang.eq_ignore_ascii_case(info))
    }
}

fn deep_merge_value(base: &mut Value, incoming: &Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(in_map)) => {
            for (key, in_value) in in_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge_value(base_value, in_value),
                    None => {
                        base_map.insert(key.clone(), in_value.clone());
                    }
                }
            }
        }
        (base_slot, in_value) => {
            *base_slot = in_value.clone();
        }
    }
}
