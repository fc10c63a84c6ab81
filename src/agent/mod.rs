//! Agent module: the REPL loop, its input sources, conversation history and
//! the inference progress indicator.

pub mod agent_loop;
pub mod conversation;
pub mod input;
pub mod progress;

pub use agent_loop::{Agent, AgentDeps, LoopState};
pub use conversation::Conversation;
pub use input::{ScriptedInput, StdinInput, UserInput};
