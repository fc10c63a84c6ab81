//! Line sources for the REPL.

use std::collections::VecDeque;
use std::io::BufRead;

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Where user lines come from. `None` means the input has ended.
#[async_trait]
pub trait UserInput: Send {
    async fn next_line(&mut self) -> Option<String>;
}

/// Reads lines from the process's stdin.
///
/// A dedicated reader thread feeds a channel, so a pending read never holds
/// up runtime shutdown after Ctrl-C.
pub struct StdinInput {
    rx: mpsc::UnboundedReceiver<String>,
}

impl StdinInput {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
            tracing::debug!("stdin closed");
        });

        Self { rx }
    }
}

#[async_trait]
impl UserInput for StdinInput {
    async fn next_line(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

/// Yields a fixed list of lines, then ends.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    lines: VecDeque<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl UserInput for ScriptedInput {
    async fn next_line(&mut self) -> Option<String> {
        self.lines.pop_front()
    }
}
