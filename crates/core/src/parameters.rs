//! Typed engine parameters and the per-run request that carries them.
//!
//! An [`ExecutionRequest`] is built once per run from already-validated
//! host input and is never mutated after it is handed to the serializer.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::escape::escape;

/// Prefix shared by every parameter that names an artifact the engine writes.
pub const OUTPUT_PARAMETER_PREFIX: &str = "output_";

/// A single parameter value as the engine understands it.
///
/// Rendering is total and deterministic: the same value always produces
/// the same text for a given target platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ParameterValue {
    Text(String),
    Integer(i64),
    Decimal(f64),
    Bool(bool),
    /// Filesystem path. Escaped for the target platform when rendered.
    Path(PathBuf),
    /// Rendered as `{a;b;c}`. `;` inside an element is not escaped.
    Set(Vec<ParameterValue>),
    /// Classification pairs, rendered as `(domain-class);(domain-class)`.
    Classes(Vec<(String, String)>),
    /// Value substitutions, rendered as `(left,right);(left,right)`.
    Mapping(Vec<(ParameterValue, ParameterValue)>),
}

impl ParameterValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn path(value: impl Into<PathBuf>) -> Self {
        Self::Path(value.into())
    }

    /// Build a `{...}` set from anything convertible into parameter values.
    pub fn set<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ParameterValue>,
    {
        Self::Set(items.into_iter().map(Into::into).collect())
    }

    /// Wrap a single value in braces, e.g. `{(1-2);(3-4)}`.
    pub fn enclosed(inner: ParameterValue) -> Self {
        Self::Set(vec![inner])
    }

    /// Render the value as it appears to the right of `=`.
    pub fn render(&self, target_is_windows: bool) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Decimal(d) => render_decimal(*d),
            Self::Bool(b) => b.to_string(),
            Self::Path(p) => escape(&p.to_string_lossy(), target_is_windows),
            Self::Set(items) => {
                let inner: Vec<String> = items
                    .iter()
                    .map(|item| item.render(target_is_windows))
                    .collect();
                format!("{{{}}}", inner.join(";"))
            }
            Self::Classes(pairs) => pairs
                .iter()
                .map(|(domain, class)| format!("({domain}-{class})"))
                .collect::<Vec<_>>()
                .join(";"),
            Self::Mapping(pairs) => pairs
                .iter()
                .map(|(left, right)| {
                    format!(
                        "({},{})",
                        left.render(target_is_windows),
                        right.render(target_is_windows)
                    )
                })
                .collect::<Vec<_>>()
                .join(";"),
        }
    }

    /// The path carried by a [`ParameterValue::Path`], if any.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Path(p) => Some(p),
            _ => None,
        }
    }
}

/// Integral decimals keep one fractional digit (`100.0`), matching the
/// engine's reference configuration files.
fn render_decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for ParameterValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<u32> for ParameterValue {
    fn from(value: u32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<PathBuf> for ParameterValue {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for ParameterValue {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

// ---------------------------------------------------------------------------
// ExecutionRequest
// ---------------------------------------------------------------------------

/// A treatment identifier plus its ordered parameters.
///
/// Parameters keep insertion order. Setting a name a second time replaces
/// the value in place and keeps the original position. A parameter set to
/// `None` is recorded as absent and is never emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    treatment: String,
    parameters: IndexMap<String, Option<ParameterValue>>,
}

impl ExecutionRequest {
    pub fn new(treatment: impl Into<String>) -> Self {
        Self {
            treatment: treatment.into(),
            parameters: IndexMap::new(),
        }
    }

    /// Add a present parameter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.parameters.insert(name.into(), Some(value.into()));
        self
    }

    /// Add a parameter that may be absent.
    pub fn with_optional<V: Into<ParameterValue>>(
        mut self,
        name: impl Into<String>,
        value: Option<V>,
    ) -> Self {
        self.parameters.insert(name.into(), value.map(Into::into));
        self
    }

    pub fn treatment(&self) -> &str {
        &self.treatment
    }

    /// All parameters in insertion order, absent ones included.
    pub fn parameters(&self) -> impl Iterator<Item = (&str, Option<&ParameterValue>)> {
        self.parameters
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_ref()))
    }

    /// Value of a present parameter.
    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.parameters.get(name).and_then(Option::as_ref)
    }

    /// Declared artifact paths (`output_*` parameters holding a path).
    ///
    /// These are what the host inspects after a run; the core never checks
    /// that they exist.
    pub fn output_paths(&self) -> Vec<(&str, &Path)> {
        self.parameters
            .iter()
            .filter(|(name, _)| name.starts_with(OUTPUT_PARAMETER_PREFIX))
            .filter_map(|(name, value)| {
                value
                    .as_ref()
                    .and_then(ParameterValue::as_path)
                    .map(|p| (name.as_str(), p))
            })
            .collect()
    }
}
