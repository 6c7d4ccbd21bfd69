//! Engine process supervision.
//!
//! One [`ProcessSupervisor::run`] call drives a single engine execution:
//!
//! ```text
//! Idle -> Starting -> Running -> Terminated{Completed}
//!            ^           |  \
//!            |           |   -> Cancelling -> Terminated{Cancelled}
//!            |           v
//!            +---- RetryingStart -> (attempts exhausted) Terminated{Failed}
//! ```
//!
//! Output is read one line at a time with no timeout. Cancellation is
//! polled before every read and again before a freshly read line is
//! processed, so a silent engine is only interrupted once it prints.

use std::io;
use std::path::PathBuf;

use chloe_core::progress;

use crate::command::EngineCommand;
use crate::config::{EngineConfig, DEFAULT_MAX_START_ATTEMPTS};
use crate::error::{log_tail, EngineError};
use crate::feedback::FeedbackSink;
use crate::outcome::{ExecutionOutcome, ExecutionStatus};
use crate::process::{EngineLauncher, EngineProcess, ShellLauncher};

/// Info line sent before the command echo.
pub const COMMAND_HEADER: &str = "engine command:";
/// Info line sent before the first console line.
pub const OUTPUT_HEADER: &str = "engine command output:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Idle,
    Starting,
    Running,
    Cancelling,
    RetryingStart,
    Terminated,
}

enum AttemptEnd {
    Completed,
    Cancelled,
}

/// Launches the engine and supervises it until it terminates.
///
/// `run` takes `&mut self`, so one supervisor drives at most one engine at
/// a time.
pub struct ProcessSupervisor<L = ShellLauncher> {
    launcher: L,
    working_dir: PathBuf,
    max_start_attempts: u32,
    state: SupervisorState,
}

impl ProcessSupervisor<ShellLauncher> {
    /// Shell-backed supervisor using the configured directory and attempt
    /// bound.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(ShellLauncher, config.engine_dir.clone())
            .with_max_start_attempts(config.max_start_attempts)
    }
}

impl<L: EngineLauncher> ProcessSupervisor<L> {
    pub fn new(launcher: L, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            launcher,
            working_dir: working_dir.into(),
            max_start_attempts: DEFAULT_MAX_START_ATTEMPTS,
            state: SupervisorState::Idle,
        }
    }

    /// Total spawn attempts allowed per run. Values below 1 are raised to 1.
    pub fn with_max_start_attempts(mut self, attempts: u32) -> Self {
        self.max_start_attempts = attempts.max(1);
        self
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    fn transition(&mut self, next: SupervisorState) {
        tracing::debug!(from = ?self.state, to = ?next, "Supervisor state change");
        self.state = next;
    }

    /// Run `command` to completion, cancellation, or start failure.
    ///
    /// Start and read I/O errors are retried up to the attempt bound; the
    /// final failure is returned as [`ExecutionStatus::Failed`] carrying
    /// [`EngineError::TransientStart`]. Every console line and progress
    /// value is forwarded to `sink` in order.
    pub async fn run<S>(&mut self, command: &EngineCommand, sink: &mut S) -> ExecutionOutcome
    where
        S: FeedbackSink + ?Sized,
    {
        self.state = SupervisorState::Idle;

        let launcher = command.launcher();
        if !launcher.is_ready() {
            tracing::warn!(launcher = %launcher, "Launching engine without a usable launcher");
            sink.on_info(&launcher.to_string());
        }

        let command_line = command.command_line();
        tracing::info!(command = %command_line, "Running engine");
        sink.on_info(COMMAND_HEADER);
        sink.on_command_echo(&command_line);
        sink.on_info(OUTPUT_HEADER);

        let mut attempts: u32 = 0;
        let mut last_progress = None;

        loop {
            attempts += 1;
            self.transition(SupervisorState::Starting);

            let mut log = Vec::new();
            let result = self
                .attempt(command, sink, &mut log, &mut last_progress)
                .await;

            tracing::info!(
                attempt = attempts,
                lines = log.len(),
                "Engine console output:\n{}",
                log.join("\n")
            );

            let status = match result {
                Ok(AttemptEnd::Completed) => ExecutionStatus::Completed,
                Ok(AttemptEnd::Cancelled) => ExecutionStatus::Cancelled,
                Err(err) if attempts < self.max_start_attempts => {
                    tracing::warn!(
                        attempt = attempts,
                        max_attempts = self.max_start_attempts,
                        error = %err,
                        "Engine start failed, retrying",
                    );
                    self.transition(SupervisorState::RetryingStart);
                    continue;
                }
                Err(err) => {
                    tracing::error!(
                        attempts,
                        lines = log.len(),
                        error = %err,
                        "Engine start failed, giving up",
                    );
                    ExecutionStatus::Failed(EngineError::TransientStart {
                        attempts,
                        lines_read: log.len(),
                        last_lines: log_tail(&log),
                        source: err,
                    })
                }
            };

            self.transition(SupervisorState::Terminated);
            tracing::info!(status = status.as_str(), attempts, "Engine run finished");

            return ExecutionOutcome {
                status,
                log,
                last_progress,
                attempts,
                properties_path: None,
            };
        }
    }

    async fn attempt<S>(
        &mut self,
        command: &EngineCommand,
        sink: &mut S,
        log: &mut Vec<String>,
        last_progress: &mut Option<u8>,
    ) -> io::Result<AttemptEnd>
    where
        S: FeedbackSink + ?Sized,
    {
        let mut process = self.launcher.launch(command, &self.working_dir).await?;
        tracing::debug!(pid = ?process.id(), "Engine process started");
        self.transition(SupervisorState::Running);

        loop {
            if sink.is_cancelled() {
                return Ok(self.cancel(process.as_mut()).await);
            }

            let raw = match process.next_line().await {
                Ok(Some(raw)) => raw,
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(
                        pid = ?process.id(),
                        error = %err,
                        "Engine output read failed, terminating engine",
                    );
                    if let Err(kill_err) = process.terminate().await {
                        tracing::warn!(error = %kill_err, "Failed to terminate engine process");
                    }
                    return Err(err);
                }
            };

            if sink.is_cancelled() {
                return Ok(self.cancel(process.as_mut()).await);
            }

            let line = decode_line(&raw);
            sink.on_console_line(&line);
            if let Some(percent) = progress::parse(&line) {
                *last_progress = Some(percent);
                sink.on_progress(percent);
            }
            log.push(line);
        }

        match process.wait().await {
            Ok(code) => tracing::debug!(exit_code = ?code, "Engine output closed"),
            Err(err) => tracing::warn!(error = %err, "Could not collect engine exit status"),
        }
        Ok(AttemptEnd::Completed)
    }

    async fn cancel(&mut self, process: &mut dyn EngineProcess) -> AttemptEnd {
        self.transition(SupervisorState::Cancelling);
        tracing::info!(pid = ?process.id(), "Cancellation requested, terminating engine");
        if let Err(err) = process.terminate().await {
            tracing::warn!(error = %err, "Failed to terminate engine process");
        }
        AttemptEnd::Cancelled
    }
}

/// Decode one raw output line, replacing invalid UTF-8 and dropping the
/// line terminator and any trailing carriage returns.
pub fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let text = String::from_utf8_lossy(raw);
    text.trim_end_matches('\r').to_string()
}
