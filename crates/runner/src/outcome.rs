use std::path::PathBuf;

use crate::error::EngineError;

/// How a supervised run ended.
///
/// `Completed` means the engine closed its output without a cancellation
/// or start failure. The exit code is not consulted, so it does not imply
/// the engine succeeded: check the log or the declared output files.
#[derive(Debug)]
pub enum ExecutionStatus {
    Completed,
    Cancelled,
    Failed(EngineError),
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed(_) => "failed",
        }
    }
}

/// Result of one supervised run.
#[derive(Debug)]
pub struct ExecutionOutcome {
    pub status: ExecutionStatus,
    /// Engine output of the last attempt, one entry per line.
    pub log: Vec<String>,
    pub last_progress: Option<u8>,
    /// Spawn attempts used, including the final one.
    pub attempts: u32,
    /// Configuration file the engine was pointed at, when written by the
    /// runner.
    pub properties_path: Option<PathBuf>,
}

impl ExecutionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self.status, ExecutionStatus::Completed)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.status, ExecutionStatus::Cancelled)
    }

    /// `Err` for a failed run, the outcome itself otherwise.
    pub fn into_result(self) -> Result<Self, EngineError> {
        match self.status {
            ExecutionStatus::Failed(err) => Err(err),
            status => Ok(Self { status, ..self }),
        }
    }
}
