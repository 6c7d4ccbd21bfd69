//! Callbacks through which a run reports to its host.
//!
//! The supervisor calls a [`FeedbackSink`] synchronously and in output
//! order. Two adapters ship with the crate:
//!
//! - [`TracingFeedback`] logs every callback through `tracing`.
//! - [`ChannelFeedback`] forwards [`FeedbackEvent`]s over an mpsc channel.
//!
//! Both read cancellation from a [`CancellationToken`].

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Host side of a supervised run.
///
/// Cancellation is polled, not pushed: the supervisor checks
/// [`is_cancelled`](Self::is_cancelled) between output lines, so an engine
/// that prints nothing cannot be cancelled until it prints again.
pub trait FeedbackSink: Send {
    fn on_info(&mut self, text: &str);
    fn on_command_echo(&mut self, command: &str);
    fn on_console_line(&mut self, line: &str);
    fn on_progress(&mut self, percent: u8);
    fn is_cancelled(&self) -> bool;
}

// ---------------------------------------------------------------------------
// TracingFeedback
// ---------------------------------------------------------------------------

/// Logs every callback; engine output goes to the `chloe_runner::engine`
/// target.
#[derive(Debug, Clone, Default)]
pub struct TracingFeedback {
    cancel: CancellationToken,
}

impl TracingFeedback {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }
}

impl FeedbackSink for TracingFeedback {
    fn on_info(&mut self, text: &str) {
        tracing::info!("{text}");
    }

    fn on_command_echo(&mut self, command: &str) {
        tracing::info!(command = %command, "Engine command");
    }

    fn on_console_line(&mut self, line: &str) {
        tracing::info!(target: "chloe_runner::engine", "{line}");
    }

    fn on_progress(&mut self, percent: u8) {
        tracing::debug!(percent, "Engine progress");
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

// ---------------------------------------------------------------------------
// ChannelFeedback
// ---------------------------------------------------------------------------

/// One feedback callback, as sent by [`ChannelFeedback`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum FeedbackEvent {
    Info(String),
    CommandEcho(String),
    ConsoleLine(String),
    Progress(u8),
}

/// Forwards callbacks as [`FeedbackEvent`]s.
///
/// Send failures (receiver dropped) are ignored; the run itself continues.
#[derive(Debug, Clone)]
pub struct ChannelFeedback {
    sender: mpsc::UnboundedSender<FeedbackEvent>,
    cancel: CancellationToken,
}

impl ChannelFeedback {
    pub fn new(sender: mpsc::UnboundedSender<FeedbackEvent>, cancel: CancellationToken) -> Self {
        Self { sender, cancel }
    }

    /// Sink plus the receiving end of a fresh channel.
    pub fn channel(cancel: CancellationToken) -> (Self, mpsc::UnboundedReceiver<FeedbackEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender, cancel), receiver)
    }

    fn send(&self, event: FeedbackEvent) {
        let _ = self.sender.send(event);
    }
}

impl FeedbackSink for ChannelFeedback {
    fn on_info(&mut self, text: &str) {
        self.send(FeedbackEvent::Info(text.to_string()));
    }

    fn on_command_echo(&mut self, command: &str) {
        self.send(FeedbackEvent::CommandEcho(command.to_string()));
    }

    fn on_console_line(&mut self, line: &str) {
        self.send(FeedbackEvent::ConsoleLine(line.to_string()));
    }

    fn on_progress(&mut self, percent: u8) {
        self.send(FeedbackEvent::Progress(percent));
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
