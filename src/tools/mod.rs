//! Tools the model can call.

pub mod builtin;
pub mod registry;
pub mod tool;

pub use registry::{BuiltinTool, ToolRegistry, ToolSpec, register};
pub use tool::{ToolOutcome, ToolOutput};
