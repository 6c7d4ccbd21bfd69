//! `chloe-worker` -- runs one Chloe engine treatment from the command line.
//!
//! # Environment variables
//!
//! Engine settings come from [`EngineConfig::from_env`]; `.env` is loaded
//! first. `RUST_LOG` overrides the default log filter.
//!
//! | Variable                   | Default                 |
//! |----------------------------|-------------------------|
//! | `CHLOE_JAVA_PATH`          | `$JAVA_HOME/bin/java`   |
//! | `CHLOE_HOME`               | `Chloe`                 |
//! | `CHLOE_JAR`                | `bin/chloe5-0.0.1.jar`  |
//! | `CHLOE_HEAP_SIZE`          | --                      |
//! | `CHLOE_STACK_SIZE`         | --                      |
//! | `CHLOE_MAX_START_ATTEMPTS` | `5`                     |

use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chloe_runner::{EngineConfig, EngineRunner, ExecutionStatus, TracingFeedback};
use chloe_core::TreatmentLineBuilder;
use chloe_worker::{exit_code, load_treatment, output_listing, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chloe_worker=info,chloe_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid engine configuration");
            return ExitCode::FAILURE;
        }
    };

    let treatment = match load_treatment(&cli.request) {
        Ok(treatment) => treatment,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Cannot load request");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        treatment = treatment.treatment_id(),
        engine_dir = %config.engine_dir.display(),
        "Starting chloe-worker",
    );

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Ctrl-C received, cancelling after the next engine line");
                cancel.cancel();
            }
        }
    });

    let mut runner = EngineRunner::new(config);
    let mut sink = TracingFeedback::new(cancel);

    let outcome = match runner
        .execute_treatment(&treatment, &cli.properties_target(), &mut sink)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "Engine run aborted");
            return ExitCode::FAILURE;
        }
    };

    match &outcome.status {
        ExecutionStatus::Completed => {
            for line in output_listing(&treatment) {
                println!("{line}");
            }
        }
        ExecutionStatus::Cancelled => tracing::warn!("Engine run cancelled"),
        ExecutionStatus::Failed(e) => tracing::error!(error = %e, "Engine run failed"),
    }

    exit_code(&outcome)
}
