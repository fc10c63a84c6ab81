//! Elapsed-time indicator shown while an inference call is in flight.

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use tokio::sync::oneshot;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::error::LlmError;
use crate::llm::Message;

/// Run `inference` to completion, repainting `Thinking... (<n>s)` on the
/// current line of `out` every `period` until it finishes.
///
/// The inference runs as its own task and hands its result back over a
/// oneshot channel. The indicator line is cleared on every exit path.
pub async fn run_with_progress<W, F>(
    out: &mut W,
    period: Duration,
    inference: F,
) -> Result<Message, LlmError>
where
    W: Write,
    F: Future<Output = Result<Message, LlmError>> + Send + 'static,
{
    let (tx, mut rx) = oneshot::channel();
    tokio::spawn(async move {
        // Receiver gone means the caller stopped waiting.
        let _ = tx.send(inference.await);
    });

    let start = Instant::now();
    let mut ticker = interval_at(start + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut line = ProgressLine::new(out);

    loop {
        tokio::select! {
            biased;
            result = &mut rx => {
                return result.unwrap_or_else(|_| {
                    Err(LlmError::RequestFailed {
                        provider: "inference".to_string(),
                        reason: "inference task ended without a result".to_string(),
                    })
                });
            }
            _ = ticker.tick() => line.repaint(start.elapsed()),
        }
    }
}

/// Owns the indicator line; clears it when dropped.
struct ProgressLine<'a, W: Write> {
    out: &'a mut W,
}

impl<'a, W: Write> ProgressLine<'a, W> {
    fn new(out: &'a mut W) -> Self {
        Self { out }
    }

    fn repaint(&mut self, elapsed: Duration) {
        let result = queue!(
            self.out,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(format!("Thinking... ({}s)", elapsed.as_secs()))
        )
        .and_then(|_| self.out.flush());
        if let Err(e) = result {
            tracing::debug!(error = %e, "Failed to paint progress line");
        }
    }
}

impl<W: Write> Drop for ProgressLine<'_, W> {
    fn drop(&mut self) {
        let result = queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))
            .and_then(|_| self.out.flush());
        if let Err(e) = result {
            tracing::debug!(error = %e, "Failed to clear progress line");
        }
    }
}
