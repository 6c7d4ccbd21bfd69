//! Chloe engine driver.
//!
//! Turns an [`ExecutionRequest`](chloe_core::ExecutionRequest) into a
//! running engine process and reports its output to the host:
//!
//! - [`EngineConfig`] - launcher, working directory and JVM flags.
//! - [`CommandBuilder`] - assembles the engine command line.
//! - [`FeedbackSink`] - host callbacks, with tracing and channel adapters.
//! - [`ProcessSupervisor`] - spawn, stream, cancel and retry.
//! - [`EngineRunner`] - writes the configuration file and runs it.

pub mod command;
pub mod config;
pub mod error;
pub mod feedback;
pub mod outcome;
pub mod process;
pub mod runner;
pub mod supervisor;

pub use command::{CommandBuilder, EngineCommand, LauncherStatus};
pub use config::EngineConfig;
pub use error::EngineError;
pub use feedback::{ChannelFeedback, FeedbackEvent, FeedbackSink, TracingFeedback};
pub use outcome::{ExecutionOutcome, ExecutionStatus};
pub use process::{EngineLauncher, EngineProcess, ShellLauncher};
pub use runner::{EngineRunner, PropertiesTarget};
pub use supervisor::{ProcessSupervisor, SupervisorState};
