//! Main agent loop.
//!
//! One REPL session: read a user line, run inference, dispatch any tool uses
//! the model asked for, feed the results back, and repeat until the model
//! answers without tools. Then wait for the next line.

use std::io::Write;
use std::sync::Arc;

use crossterm::style::Stylize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::agent::conversation::Conversation;
use crate::agent::input::UserInput;
use crate::agent::progress::run_with_progress;
use crate::config::AgentConfig;
use crate::error::{Error, LlmError};
use crate::llm::{ContentBlock, InferenceRequest, LlmProvider, Message};
use crate::tools::registry::ToolRegistry;
use crate::tools::tool::ToolOutcome;

/// Longest tool-result preview printed to the terminal.
const PREVIEW_CHARS: usize = 120;

/// Collapse a tool output string into a single-line preview for display.
pub fn truncate_for_preview(output: &str, max_chars: usize) -> String {
    let collapsed: String = output
        .chars()
        .take(max_chars + 50)
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    // char_indices gives us byte offsets at char boundaries, so the slice is always valid UTF-8.
    if collapsed.chars().count() > max_chars {
        let byte_offset = collapsed
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(collapsed.len());
        format!("{}...", &collapsed[..byte_offset])
    } else {
        collapsed
    }
}

/// A tool use the model requested, waiting to be dispatched.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingToolUse {
    pub id: String,
    pub name: String,
    pub input: Value,
}

/// Where the loop is.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopState {
    AwaitingUserInput,
    RunningInference,
    DispatchingTools(Vec<PendingToolUse>),
}

/// Core dependencies for the agent.
pub struct AgentDeps {
    pub llm: Arc<dyn LlmProvider>,
    pub tools: ToolRegistry,
}

/// The REPL agent.
pub struct Agent<I, W> {
    config: AgentConfig,
    deps: AgentDeps,
    input: I,
    out: W,
    conversation: Conversation,
}

impl<I: UserInput, W: Write> Agent<I, W> {
    pub fn new(config: AgentConfig, deps: AgentDeps, input: I, out: W) -> Self {
        Self {
            config,
            deps,
            input,
            out,
            conversation: Conversation::new(),
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Everything written to the terminal so far.
    pub fn output(&self) -> &W {
        &self.out
    }

    /// Run the loop until input ends.
    ///
    /// Returns `Ok(())` on end of input (or cancellation while waiting for
    /// it) and the inference error if a model call fails.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<(), Error> {
        tracing::info!(
            agent = %self.config.name,
            model = %self.deps.llm.model_name(),
            "Chat started"
        );
        writeln!(
            self.out,
            "Chat with {} (use Ctrl-D or Ctrl-C to quit)",
            self.deps.llm.model_name()
        )?;

        let mut state = LoopState::AwaitingUserInput;
        loop {
            state = match state {
                LoopState::AwaitingUserInput => match self.read_user_line(cancel).await? {
                    Some(line) => {
                        self.conversation.push(Message::user(line));
                        LoopState::RunningInference
                    }
                    None => break,
                },
                LoopState::RunningInference => {
                    let response = match self.infer(cancel).await {
                        Ok(response) => response,
                        Err(e) => {
                            tracing::error!(error = %e, "Inference failed");
                            writeln!(self.out, "{}: {}", "Error".red(), e)?;
                            return Err(e.into());
                        }
                    };
                    self.print_model_text(&response)?;
                    let pending: Vec<PendingToolUse> = response
                        .tool_uses()
                        .map(|(id, name, input)| PendingToolUse {
                            id: id.to_string(),
                            name: name.to_string(),
                            input: input.clone(),
                        })
                        .collect();
                    self.conversation.push(response);

                    if pending.is_empty() {
                        LoopState::AwaitingUserInput
                    } else {
                        LoopState::DispatchingTools(pending)
                    }
                }
                LoopState::DispatchingTools(pending) => {
                    let results = self.dispatch_tools(pending).await?;
                    self.conversation.push(Message::tool_results(results));
                    LoopState::RunningInference
                }
            };
            tracing::debug!(state = ?state, messages = self.conversation.len(), "Loop state");
        }

        tracing::info!(messages = self.conversation.len(), "Chat ended");
        Ok(())
    }

    /// Prompt until a non-blank line arrives. `None` on end of input.
    async fn read_user_line(&mut self, cancel: &CancellationToken) -> Result<Option<String>, Error> {
        loop {
            write!(self.out, "{}: ", "You".blue())?;
            self.out.flush()?;

            let line = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                line = self.input.next_line() => line,
            };
            let Some(line) = line else {
                writeln!(self.out)?;
                return Ok(None);
            };

            let line = line.trim();
            if !line.is_empty() {
                return Ok(Some(line.to_string()));
            }
        }
    }

    async fn infer(&mut self, cancel: &CancellationToken) -> Result<Message, LlmError> {
        let request = InferenceRequest {
            system: self.config.system_prompt.clone(),
            messages: self.conversation.messages().to_vec(),
            tools: self.deps.tools.definitions(),
        };
        let llm = Arc::clone(&self.deps.llm);
        let cancel = cancel.clone();

        run_with_progress(&mut self.out, self.config.progress_interval, async move {
            llm.complete(request, &cancel).await
        })
        .await
    }

    fn print_model_text(&mut self, response: &Message) -> Result<(), Error> {
        for text in response.texts() {
            writeln!(self.out, "{}: {}", "Claude".yellow(), text)?;
        }
        Ok(())
    }

    /// Run every pending tool use in order, one result per use.
    async fn dispatch_tools(&mut self, pending: Vec<PendingToolUse>) -> Result<Vec<ContentBlock>, Error> {
        let mut results = Vec::with_capacity(pending.len());
        for call in pending {
            writeln!(self.out, "{}: {}({})", "tool".green(), call.name, call.input)?;
            let outcome = self.deps.tools.dispatch(&call.name, &call.input).await;
            self.print_outcome(&outcome)?;
            results.push(ContentBlock::tool_result(call.id, outcome.content, outcome.is_error));
        }
        Ok(results)
    }

    fn print_outcome(&mut self, outcome: &ToolOutcome) -> Result<(), Error> {
        if outcome.is_error {
            writeln!(self.out, "{}: {}", "Error".red(), outcome.content)?;
        } else if let Some(diff) = &outcome.diff {
            write!(self.out, "{}", diff.render_ansi())?;
        } else {
            writeln!(self.out, "{}", truncate_for_preview(&outcome.content, PREVIEW_CHARS).dark_grey())?;
        }
        Ok(())
    }
}
