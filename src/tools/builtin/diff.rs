//! Diff generation tool.

use serde::Deserialize;

use crate::diff::diff_text;
use crate::error::ToolError;
use crate::tools::tool::ToolOutput;

pub const GENERATE_DIFF_DESCRIPTION: &str = "Generate a line-based diff between original and \
modified code.\n\nUse this tool to show what changes would be made before applying them. Lines \
prefixed with '-' are removed, lines prefixed with '+' are added and unchanged lines are indented \
with a space.";

#[derive(Debug, Deserialize)]
pub struct GenerateDiffInput {
    pub original_code: String,
    pub modified_code: String,
}

pub fn generate_diff_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "original_code": {
                "type": "string",
                "description": "The original code before changes"
            },
            "modified_code": {
                "type": "string",
                "description": "The modified code after changes"
            }
        },
        "required": ["original_code", "modified_code"]
    })
}

pub fn generate_diff(input: GenerateDiffInput) -> Result<ToolOutput, ToolError> {
    if input.original_code == input.modified_code {
        return Ok(ToolOutput::text(
            "No changes detected. The original and modified code are identical.",
        ));
    }
    let diff = diff_text(&input.original_code, &input.modified_code);
    tracing::debug!(
        additions = diff.additions(),
        deletions = diff.deletions(),
        "Generated diff"
    );
    Ok(ToolOutput::with_diff("Diff:", diff))
}
