use std::path::{Path, PathBuf};

use chloe_core::{ConfigurationSerializer, ExecutionRequest, Treatment};

use crate::command::CommandBuilder;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::feedback::FeedbackSink;
use crate::outcome::ExecutionOutcome;
use crate::process::{EngineLauncher, ShellLauncher};
use crate::supervisor::ProcessSupervisor;

/// Where the configuration document is written.
///
/// The runner never deletes it; temporary files are left for the host or
/// the OS to clean up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PropertiesTarget {
    /// `<temp dir>/<treatment>_params<uuid>.properties`.
    #[default]
    Temporary,
    At(PathBuf),
}

impl PropertiesTarget {
    pub fn resolve(&self, treatment: &str) -> PathBuf {
        match self {
            Self::Temporary => std::env::temp_dir().join(format!(
                "{treatment}_params{}.properties",
                uuid::Uuid::new_v4().simple()
            )),
            Self::At(path) => path.clone(),
        }
    }
}

/// Top-level entry point: write the configuration, build the command, and
/// supervise the engine.
pub struct EngineRunner<L = ShellLauncher> {
    config: EngineConfig,
    serializer: ConfigurationSerializer,
    supervisor: ProcessSupervisor<L>,
}

impl EngineRunner<ShellLauncher> {
    pub fn new(config: EngineConfig) -> Self {
        let supervisor = ProcessSupervisor::from_config(&config);
        Self {
            config,
            serializer: ConfigurationSerializer::for_host(),
            supervisor,
        }
    }
}

impl<L: EngineLauncher> EngineRunner<L> {
    /// Runner with a custom launcher, e.g. a scripted one in tests.
    pub fn with_launcher(config: EngineConfig, launcher: L) -> Self {
        let supervisor = ProcessSupervisor::new(launcher, config.engine_dir.clone())
            .with_max_start_attempts(config.max_start_attempts);
        Self {
            config,
            serializer: ConfigurationSerializer::for_host(),
            supervisor,
        }
    }

    /// Override path escaping, e.g. to prepare files for a Windows engine.
    pub fn with_serializer(mut self, serializer: ConfigurationSerializer) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn supervisor(&self) -> &ProcessSupervisor<L> {
        &self.supervisor
    }

    /// Execute `request` once.
    ///
    /// A configuration write failure is returned as `Err` before anything
    /// is launched. Everything after that, including start failures, is
    /// reported through the returned outcome.
    pub async fn execute<S>(
        &mut self,
        request: &ExecutionRequest,
        target: &PropertiesTarget,
        sink: &mut S,
    ) -> Result<ExecutionOutcome, EngineError>
    where
        S: FeedbackSink + ?Sized,
    {
        let path = target.resolve(request.treatment());
        self.write_configuration(request, &path)?;

        let command = CommandBuilder::from_config(&self.config, &path);
        let mut outcome = self.supervisor.run(&command, sink).await;
        outcome.properties_path = Some(path);
        Ok(outcome)
    }

    /// Validate `treatment`, then [`execute`](Self::execute) its request.
    ///
    /// Invalid parameters are returned as [`EngineError::Validation`]
    /// before any file is written.
    pub async fn execute_treatment<S>(
        &mut self,
        treatment: &Treatment,
        target: &PropertiesTarget,
        sink: &mut S,
    ) -> Result<ExecutionOutcome, EngineError>
    where
        S: FeedbackSink + ?Sized,
    {
        let request = treatment.validated_request().inspect_err(|err| {
            tracing::error!(error = %err, "Rejected treatment parameters");
        })?;
        self.execute(&request, target, sink).await
    }

    fn write_configuration(
        &self,
        request: &ExecutionRequest,
        path: &Path,
    ) -> Result<(), EngineError> {
        let document = self.serializer.serialize(request);
        document.write(path).map_err(|err| {
            tracing::error!(path = %path.display(), error = %err, "Cannot write engine configuration");
            err
        })?;
        tracing::info!(
            treatment = request.treatment(),
            path = %path.display(),
            lines = document.lines().len(),
            "Engine configuration written",
        );
        Ok(())
    }
}
