//! Per-treatment parameter line builders.
//!
//! Each engine treatment has a parameter struct implementing
//! [`TreatmentLineBuilder`], which yields the ordered `(key, value)` pairs
//! the engine expects. The serializer stays treatment-agnostic; all key
//! names, ordering and conditional omission live here.
//!
//! [`Treatment`] is the serde entry point for hosts that describe runs as
//! JSON (`{"treatment": "distance", ...}`).

pub mod metrics;
pub mod rasterize;
pub mod tools;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::parameters::{ExecutionRequest, ParameterValue};

pub use metrics::{
    EntityParams, GridParams, MapParams, SelectedParams, SlidingParams, WindowCentres,
};
pub use rasterize::{Extent, RasterFromCsvParams, RasterFromShapefileParams};
pub use tools::{
    ClassificationParams, ClusterParams, CombineFactor, CombineParams, DistanceParams,
    SearchAndReplaceParams,
};

// ---------------------------------------------------------------------------
// Treatment identifiers
// ---------------------------------------------------------------------------

pub const TREATMENT_DISTANCE: &str = "distance";
pub const TREATMENT_CLUSTER: &str = "cluster";
pub const TREATMENT_CLASSIFICATION: &str = "classification";
pub const TREATMENT_SEARCH_AND_REPLACE: &str = "search_and_replace";
pub const TREATMENT_COMBINE: &str = "combine";
pub const TREATMENT_MAP: &str = "map";
pub const TREATMENT_GRID: &str = "grid";
pub const TREATMENT_SLIDING: &str = "sliding";
pub const TREATMENT_SELECTED: &str = "selected";
pub const TREATMENT_ENTITY: &str = "entity";
pub const TREATMENT_RASTER_FROM_CSV: &str = "raster_from_csv";
pub const TREATMENT_RASTER_FROM_SHAPEFILE: &str = "raster_from_shapefile";

// ---------------------------------------------------------------------------
// Builder trait
// ---------------------------------------------------------------------------

/// Produces the ordered parameter list for one engine treatment.
pub trait TreatmentLineBuilder {
    /// Identifier emitted as `treatment=<id>`.
    fn treatment_id(&self) -> &'static str;

    /// Ordered `(key, value)` pairs. `None` marks an omitted key.
    fn parameters(&self) -> Vec<(&'static str, Option<ParameterValue>)>;

    /// Check host-supplied values before building a request.
    fn validate(&self) -> Result<(), CoreError> {
        Ok(())
    }

    /// Collect [`parameters`](Self::parameters) into an [`ExecutionRequest`].
    fn to_request(&self) -> ExecutionRequest {
        self.parameters()
            .into_iter()
            .fold(ExecutionRequest::new(self.treatment_id()), |req, (key, value)| {
                req.with_optional(key, value)
            })
    }
}

// ---------------------------------------------------------------------------
// Shared engine enums
// ---------------------------------------------------------------------------

/// How metrics are aggregated inside an analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzeType {
    Threshold,
    /// Distance-weighted; requires a `distance_function`.
    WeightedDistance,
}

impl AnalyzeType {
    pub fn as_engine_str(&self) -> &'static str {
        match self {
            Self::Threshold => "THRESHOLD",
            Self::WeightedDistance => "WEIGHTED",
        }
    }
}

/// Shape of a moving or selected analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowShape {
    Circle,
    Square,
    /// Friction-driven shape; requires a friction raster.
    Functional,
}

impl WindowShape {
    pub fn as_engine_str(&self) -> &'static str {
        match self {
            Self::Circle => "CIRCLE",
            Self::Square => "SQUARE",
            Self::Functional => "FUNCTIONAL",
        }
    }
}

// ---------------------------------------------------------------------------
// Treatment dispatch
// ---------------------------------------------------------------------------

/// Any engine treatment with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "treatment", rename_all = "snake_case")]
pub enum Treatment {
    Distance(DistanceParams),
    Cluster(ClusterParams),
    Classification(ClassificationParams),
    SearchAndReplace(SearchAndReplaceParams),
    Combine(CombineParams),
    Map(MapParams),
    Grid(GridParams),
    Sliding(SlidingParams),
    Selected(SelectedParams),
    Entity(EntityParams),
    RasterFromCsv(RasterFromCsvParams),
    RasterFromShapefile(RasterFromShapefileParams),
}

impl Treatment {
    fn builder(&self) -> &dyn TreatmentLineBuilder {
        match self {
            Self::Distance(p) => p,
            Self::Cluster(p) => p,
            Self::Classification(p) => p,
            Self::SearchAndReplace(p) => p,
            Self::Combine(p) => p,
            Self::Map(p) => p,
            Self::Grid(p) => p,
            Self::Sliding(p) => p,
            Self::Selected(p) => p,
            Self::Entity(p) => p,
            Self::RasterFromCsv(p) => p,
            Self::RasterFromShapefile(p) => p,
        }
    }

    /// Validate, then build the request.
    pub fn validated_request(&self) -> Result<ExecutionRequest, CoreError> {
        self.validate()?;
        Ok(self.to_request())
    }
}

impl TreatmentLineBuilder for Treatment {
    fn treatment_id(&self) -> &'static str {
        self.builder().treatment_id()
    }

    fn parameters(&self) -> Vec<(&'static str, Option<ParameterValue>)> {
        self.builder().parameters()
    }

    fn validate(&self) -> Result<(), CoreError> {
        self.builder().validate()
    }
}

// ---------------------------------------------------------------------------
// Helpers shared by the builders
// ---------------------------------------------------------------------------

pub(crate) fn path(p: &Path) -> Option<ParameterValue> {
    Some(ParameterValue::from(p))
}

pub(crate) fn optional_path(p: &Option<PathBuf>) -> Option<ParameterValue> {
    p.as_deref().map(ParameterValue::from)
}

pub(crate) fn present(value: impl Into<ParameterValue>) -> Option<ParameterValue> {
    Some(value.into())
}

/// Window sizes must be odd so the window has a centre pixel; even sizes
/// are bumped to the next odd value.
pub fn to_odd(size: u32) -> u32 {
    if size % 2 == 0 {
        size + 1
    } else {
        size
    }
}

pub(crate) fn require_non_empty<T>(field: &str, items: &[T]) -> Result<(), CoreError> {
    if items.is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

pub(crate) fn require_positive(field: &str, value: u32) -> Result<(), CoreError> {
    if value == 0 {
        return Err(CoreError::Validation(format!(
            "{field} must be greater than zero"
        )));
    }
    Ok(())
}

pub(crate) fn require_text(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be blank")));
    }
    Ok(())
}

/// Weighted analysis needs a distance function; threshold analysis ignores it.
pub(crate) fn validate_analysis(
    analyze_type: AnalyzeType,
    distance_function: &Option<String>,
) -> Result<(), CoreError> {
    if analyze_type == AnalyzeType::WeightedDistance
        && distance_function.as_deref().map_or(true, |f| f.trim().is_empty())
    {
        return Err(CoreError::Validation(
            "Weighted distance analysis requires a distance_function".to_string(),
        ));
    }
    Ok(())
}

/// `distance_function` is only emitted for weighted analysis.
pub(crate) fn distance_function_line(
    analyze_type: AnalyzeType,
    distance_function: &Option<String>,
) -> Option<ParameterValue> {
    match analyze_type {
        AnalyzeType::WeightedDistance => distance_function.clone().map(ParameterValue::Text),
        AnalyzeType::Threshold => None,
    }
}
