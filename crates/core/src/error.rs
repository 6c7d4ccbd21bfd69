use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
}

/// The configuration document could not be created or written.
///
/// Surfaced immediately; the write is never retried.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Cannot write configuration file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigurationError {
    /// Path of the configuration file that could not be written.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Write { path, .. } => path,
        }
    }
}
