//! Tool registry for the built-in tools.
//!
//! The tool set is closed: every tool is a [`BuiltinTool`] variant, and the
//! registry advertises them to the model in a fixed order.

use std::time::Instant;

use serde_json::Value;

use crate::error::ToolError;
use crate::llm::ToolDefinition;
use crate::tools::builtin::shell::{self, ShellTool};
use crate::tools::builtin::{diff, file};
use crate::tools::tool::{ToolOutcome, ToolOutput, parse_input};

/// The tools the agent can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinTool {
    ReadFile,
    ListFiles,
    EditFile,
    RunCommand,
    GenerateDiff,
}

impl BuiltinTool {
    /// Every tool, in the order it is advertised.
    pub const ALL: [BuiltinTool; 5] = [
        BuiltinTool::ReadFile,
        BuiltinTool::ListFiles,
        BuiltinTool::EditFile,
        BuiltinTool::RunCommand,
        BuiltinTool::GenerateDiff,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ReadFile => "read_file",
            Self::ListFiles => "list_files",
            Self::EditFile => "edit_file",
            Self::RunCommand => "run_command",
            Self::GenerateDiff => "generate_diff",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::ReadFile => file::READ_FILE_DESCRIPTION,
            Self::ListFiles => file::LIST_FILES_DESCRIPTION,
            Self::EditFile => file::EDIT_FILE_DESCRIPTION,
            Self::RunCommand => shell::RUN_COMMAND_DESCRIPTION,
            Self::GenerateDiff => diff::GENERATE_DIFF_DESCRIPTION,
        }
    }

    pub fn input_schema(self) -> Value {
        match self {
            Self::ReadFile => file::read_file_schema(),
            Self::ListFiles => file::list_files_schema(),
            Self::EditFile => file::edit_file_schema(),
            Self::RunCommand => shell::run_command_schema(),
            Self::GenerateDiff => diff::generate_diff_schema(),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }
}

/// A tool as advertised to the model.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
    pub tool: BuiltinTool,
}

/// Build the specs for every built-in tool.
pub fn register() -> Vec<ToolSpec> {
    BuiltinTool::ALL
        .into_iter()
        .map(|tool| ToolSpec {
            name: tool.name(),
            description: tool.description(),
            input_schema: tool.input_schema(),
            tool,
        })
        .collect()
}

/// Registry of available tools.
pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
    shell: ShellTool,
}

impl ToolRegistry {
    /// Registry with every built-in tool and a default shell.
    pub fn builtin() -> Self {
        Self {
            specs: register(),
            shell: ShellTool::new(),
        }
    }

    /// Replace the shell runner (working directory, timeout).
    pub fn with_shell(mut self, shell: ShellTool) -> Self {
        self.shell = shell;
        self
    }

    /// Get tool definitions for LLM function calling.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.specs
            .iter()
            .map(|spec| ToolDefinition {
                name: spec.name.to_string(),
                description: spec.description.to_string(),
                input_schema: spec.input_schema.clone(),
            })
            .collect()
    }

    /// Run the named tool on a raw input payload.
    ///
    /// Never fails: unknown names, bad input and execution errors all come
    /// back as an outcome with `is_error` set.
    pub async fn dispatch(&self, name: &str, input: &Value) -> ToolOutcome {
        let Some(tool) = self.lookup(name) else {
            tracing::warn!(tool = %name, "Model requested unknown tool");
            return ToolOutcome::error(&ToolError::NotFound {
                name: name.to_string(),
            });
        };

        let start = Instant::now();
        let result = self.execute(tool, input).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => tracing::debug!(tool = %name, elapsed_ms, "Tool succeeded"),
            Err(e) => tracing::debug!(tool = %name, elapsed_ms, error = %e, "Tool failed"),
        }
        ToolOutcome::from(result)
    }

    fn lookup(&self, name: &str) -> Option<BuiltinTool> {
        self.specs
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| spec.tool)
    }

    async fn execute(&self, tool: BuiltinTool, input: &Value) -> Result<ToolOutput, ToolError> {
        let name = tool.name();
        match tool {
            BuiltinTool::ReadFile => file::read_file(parse_input(name, input)?).await,
            BuiltinTool::ListFiles => file::list_files(parse_input(name, input)?).await,
            BuiltinTool::EditFile => file::edit_file(parse_input(name, input)?).await,
            BuiltinTool::RunCommand => self.shell.run(parse_input(name, input)?).await,
            BuiltinTool::GenerateDiff => diff::generate_diff(parse_input(name, input)?),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
