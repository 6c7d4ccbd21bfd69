//! Chloe engine configuration building blocks.
//!
//! Everything here is synchronous and free of process handling:
//!
//! - [`escape`] - path escaping for the engine's properties format.
//! - [`ParameterValue`] / [`ExecutionRequest`] - typed, ordered run parameters.
//! - [`ConfigurationSerializer`] - renders a request into a
//!   [`ConfigurationDocument`] and writes it to disk.
//! - [`progress::parse`] - recognises `#NN` progress markers in engine output.
//! - [`treatments`] - per-treatment parameter line builders.

pub mod error;
pub mod escape;
pub mod parameters;
pub mod progress;
pub mod properties;
pub mod treatments;

pub use error::{ConfigurationError, CoreError};
pub use escape::escape;
pub use parameters::{ExecutionRequest, ParameterValue};
pub use properties::{ConfigurationDocument, ConfigurationSerializer};
pub use treatments::{Treatment, TreatmentLineBuilder};
