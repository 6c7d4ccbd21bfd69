//! Configuration document rendering and writing.
//!
//! The engine consumes a line-oriented `key=value` file:
//!
//! ```text
//! #2026-03-01 12:00:00
//! treatment=distance
//! input_raster=/a/in.tif
//! distance_sources={1;2}
//! output_raster=/a/out.tif
//! ```
//!
//! The first line is a generation timestamp comment (UTC), the second
//! always names the treatment, and the rest follow the request's insertion
//! order.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::ConfigurationError;
use crate::parameters::ExecutionRequest;

/// `strftime` format of the timestamp comment.
pub const HEADER_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Key of the mandatory first configuration line.
pub const TREATMENT_KEY: &str = "treatment";

/// Rendered configuration lines plus the time they were generated.
///
/// Immutable once built; [`write`](Self::write) may be called any number
/// of times but always emits the same content.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationDocument {
    generated_at: DateTime<Utc>,
    lines: Vec<String>,
}

impl ConfigurationDocument {
    /// Rendered lines, without the timestamp comment.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// The `#<timestamp>` comment line.
    pub fn header(&self) -> String {
        format!("#{}", self.generated_at.format(HEADER_TIMESTAMP_FORMAT))
    }

    /// Full file content: header, then one line per entry, each `\n`-terminated.
    pub fn render(&self) -> String {
        let mut out = self.header();
        out.push('\n');
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Write the document to `path`, truncating any existing file.
    pub fn write(&self, path: &Path) -> Result<(), ConfigurationError> {
        write(self, path)
    }
}

/// Write `document` to `path`, truncating any existing file.
///
/// Fails with [`ConfigurationError::Write`] carrying the target path and
/// the underlying I/O error (missing directory, permission denied, ...).
pub fn write(document: &ConfigurationDocument, path: &Path) -> Result<(), ConfigurationError> {
    let to_error = |source: std::io::Error| ConfigurationError::Write {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(to_error)?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(document.render().as_bytes())
        .map_err(to_error)?;
    writer.flush().map_err(to_error)?;
    Ok(())
}

/// Renders an [`ExecutionRequest`] into a [`ConfigurationDocument`].
///
/// Treatment-agnostic: per-treatment key selection lives in
/// [`crate::treatments`].
#[derive(Debug, Clone, Copy)]
pub struct ConfigurationSerializer {
    target_is_windows: bool,
}

impl ConfigurationSerializer {
    pub fn new(target_is_windows: bool) -> Self {
        Self { target_is_windows }
    }

    /// Serializer escaping paths for the platform this binary runs on.
    pub fn for_host() -> Self {
        Self::new(cfg!(windows))
    }

    pub fn target_is_windows(&self) -> bool {
        self.target_is_windows
    }

    /// Render `request`, stamping the document with the current time.
    pub fn serialize(&self, request: &ExecutionRequest) -> ConfigurationDocument {
        self.serialize_at(request, Utc::now())
    }

    /// Render `request` with an explicit generation time.
    pub fn serialize_at(
        &self,
        request: &ExecutionRequest,
        generated_at: DateTime<Utc>,
    ) -> ConfigurationDocument {
        let mut lines = Vec::with_capacity(request.parameters().count() + 1);
        lines.push(format!("{TREATMENT_KEY}={}", request.treatment()));

        for (name, value) in request.parameters() {
            // Absent parameters are omitted, never emitted as `name=`.
            if let Some(value) = value {
                lines.push(format!("{name}={}", value.render(self.target_is_windows)));
            }
        }

        ConfigurationDocument {
            generated_at,
            lines,
        }
    }
}

impl Default for ConfigurationSerializer {
    fn default() -> Self {
        Self::for_host()
    }
}
