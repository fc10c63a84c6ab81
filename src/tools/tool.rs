//! Tool input/output plumbing shared by the built-in tools.

use serde::de::DeserializeOwned;

use crate::diff::Diff;
use crate::error::ToolError;

/// Successful tool output.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// Plain-text result for the model.
    pub text: String,
    /// Structured diff, when the tool produced one.
    pub diff: Option<Diff>,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            diff: None,
        }
    }

    /// A headline followed by a diff rendering.
    pub fn with_diff(headline: impl Into<String>, diff: Diff) -> Self {
        Self {
            text: headline.into(),
            diff: Some(diff),
        }
    }

    /// The text sent back to the model. Never contains terminal escapes.
    pub fn content(&self) -> String {
        match &self.diff {
            Some(diff) => format!("{}\n\n{}", self.text, diff),
            None => self.text.clone(),
        }
    }
}

/// Result of one dispatch, always data: failures are carried with `is_error`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub content: String,
    pub is_error: bool,
    pub diff: Option<Diff>,
}

impl ToolOutcome {
    pub fn error(err: &ToolError) -> Self {
        Self {
            content: err.to_string(),
            is_error: true,
            diff: None,
        }
    }
}

impl From<Result<ToolOutput, ToolError>> for ToolOutcome {
    fn from(result: Result<ToolOutput, ToolError>) -> Self {
        match result {
            Ok(output) => Self {
                content: output.content(),
                is_error: false,
                diff: output.diff,
            },
            Err(err) => Self::error(&err),
        }
    }
}

/// Deserialize a tool's raw input into its input struct.
///
/// A missing (`null`) payload is treated as an empty object so tools whose
/// fields are all optional still accept it.
pub fn parse_input<T: DeserializeOwned>(tool: &str, raw: &serde_json::Value) -> Result<T, ToolError> {
    let value = if raw.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        raw.clone()
    };
    serde_json::from_value(value).map_err(|e| ToolError::invalid(tool, e.to_string()))
}
