use chloe_core::{ConfigurationError, CoreError};

/// Number of trailing log lines carried by a start failure.
pub const FAILURE_TAIL_LINES: usize = 10;

/// Errors that stop an engine run.
///
/// Engine-reported failures are not represented here: whatever the engine
/// prints is forwarded as console output and never interpreted.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Spawning or reading the engine failed on every allowed attempt.
    #[error(
        "{source}\nTried {attempts} time(s) without success. Last attempt stopped after reading {lines_read} line(s).\nLast line(s):\n{}",
        .last_lines.join("\n")
    )]
    TransientStart {
        attempts: u32,
        lines_read: usize,
        last_lines: Vec<String>,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value for {key}: {value:?}")]
    InvalidConfig { key: String, value: String },

    #[error(transparent)]
    Validation(#[from] CoreError),
}

/// The last [`FAILURE_TAIL_LINES`] entries of `log`.
pub(crate) fn log_tail(log: &[String]) -> Vec<String> {
    let start = log.len().saturating_sub(FAILURE_TAIL_LINES);
    log[start..].to_vec()
}
