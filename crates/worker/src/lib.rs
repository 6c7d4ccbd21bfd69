//! `chloe-worker` library crate.
//!
//! Command-line parsing, request loading and exit-code mapping for the
//! worker binary. The entrypoint lives in `main.rs`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use chloe_core::{Treatment, TreatmentLineBuilder};
use chloe_runner::{ExecutionOutcome, ExecutionStatus, PropertiesTarget};

/// Exit code of a cancelled run (conventional 128 + SIGINT).
pub const EXIT_CANCELLED: u8 = 130;

/// Run one Chloe engine treatment described by a JSON file.
#[derive(Parser, Debug)]
#[command(name = "chloe-worker", version, about)]
pub struct Cli {
    /// JSON treatment request, e.g. `{"treatment": "map", ...}`
    #[arg(value_name = "REQUEST_JSON")]
    pub request: PathBuf,

    /// Write the engine configuration here instead of a temporary file
    #[arg(long, value_name = "PATH")]
    pub properties: Option<PathBuf>,
}

impl Cli {
    pub fn properties_target(&self) -> PropertiesTarget {
        match &self.properties {
            Some(path) => PropertiesTarget::At(path.clone()),
            None => PropertiesTarget::Temporary,
        }
    }
}

/// Read and parse a treatment request file. Parameter validation happens
/// when the runner executes it.
pub fn load_treatment(path: &Path) -> anyhow::Result<Treatment> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read request file {}", path.display()))?;
    let treatment = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid treatment request in {}", path.display()))?;
    Ok(treatment)
}

/// `name=path` lines for the outputs a completed treatment produced.
pub fn output_listing(treatment: &Treatment) -> Vec<String> {
    let request = treatment.to_request();
    request
        .output_paths()
        .into_iter()
        .map(|(name, path)| format!("{name}={}", path.display()))
        .collect()
}

/// 0 completed, 1 failed, 130 cancelled.
pub fn exit_code(outcome: &ExecutionOutcome) -> ExitCode {
    match outcome.status {
        ExecutionStatus::Completed => ExitCode::SUCCESS,
        ExecutionStatus::Cancelled => ExitCode::from(EXIT_CANCELLED),
        ExecutionStatus::Failed(_) => ExitCode::FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_request_and_properties() {
        let cli = Cli::try_parse_from(["chloe-worker", "req.json", "--properties", "/w/p.properties"])
            .expect("valid arguments");
        assert_eq!(cli.request, PathBuf::from("req.json"));
        assert_eq!(
            cli.properties_target(),
            PropertiesTarget::At(PathBuf::from("/w/p.properties"))
        );

        let cli = Cli::try_parse_from(["chloe-worker", "req.json"]).expect("valid arguments");
        assert_eq!(cli.properties_target(), PropertiesTarget::Temporary);
    }

    #[test]
    fn cli_requires_request() {
        assert!(Cli::try_parse_from(["chloe-worker"]).is_err());
    }

    #[test]
    fn load_treatment_parses_and_lists_outputs() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("map.json");
        std::fs::write(
            &path,
            r#"{"treatment": "map", "input_raster": "/a/in.tif", "output_csv": "/a/map.csv", "metrics": ["SHDI"]}"#,
        )
        .expect("write request");
        let treatment = load_treatment(&path).expect("valid request");
        assert_eq!(treatment.treatment_id(), "map");
        assert_eq!(output_listing(&treatment), vec!["output_csv=/a/map.csv"]);
    }

    #[test]
    fn load_treatment_rejects_unknown_treatment() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("bogus.json");
        std::fs::write(&path, r#"{"treatment": "bogus"}"#).expect("write request");
        let err = load_treatment(&path).expect_err("unknown treatment");
        assert!(err.to_string().contains("Invalid treatment request"));
    }

    #[test]
    fn load_treatment_reports_missing_file() {
        let err = load_treatment(Path::new("/definitely/missing.json")).expect_err("no file");
        assert!(err.to_string().contains("/definitely/missing.json"));
    }
}
