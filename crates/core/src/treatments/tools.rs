//! Raster utility treatments: distance, cluster, classification,
//! search-and-replace and combine.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{
    optional_path, path, present, require_non_empty, require_text, TreatmentLineBuilder,
    TREATMENT_CLASSIFICATION, TREATMENT_CLUSTER, TREATMENT_COMBINE, TREATMENT_DISTANCE,
    TREATMENT_SEARCH_AND_REPLACE,
};
use crate::error::CoreError;
use crate::parameters::ParameterValue;

/// Smallest `max_distance` the engine honours; smaller values mean "unbounded"
/// and the key is omitted.
const MIN_MAX_DISTANCE: f64 = 1.0;

// ---------------------------------------------------------------------------
// Distance
// ---------------------------------------------------------------------------

/// Distance from every cell to the nearest source value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceParams {
    pub input_raster: PathBuf,
    /// Raster values treated as distance sources.
    pub sources: Vec<i64>,
    /// Engine distance type name, e.g. `EUCLIDIAN` or `FUNCTIONAL`.
    pub distance_type: String,
    #[serde(default)]
    pub friction_raster: Option<PathBuf>,
    #[serde(default)]
    pub max_distance: Option<f64>,
    pub output_raster: PathBuf,
}

impl TreatmentLineBuilder for DistanceParams {
    fn treatment_id(&self) -> &'static str {
        TREATMENT_DISTANCE
    }

    fn parameters(&self) -> Vec<(&'static str, Option<ParameterValue>)> {
        vec![
            ("input_raster", path(&self.input_raster)),
            ("distance_sources", present(ParameterValue::set(self.sources.iter().copied()))),
            ("distance_type", present(self.distance_type.as_str())),
            ("friction_raster", optional_path(&self.friction_raster)),
            (
                "max_distance",
                self.max_distance
                    .filter(|d| *d >= MIN_MAX_DISTANCE)
                    .map(ParameterValue::Decimal),
            ),
            ("output_raster", path(&self.output_raster)),
        ]
    }

    fn validate(&self) -> Result<(), CoreError> {
        require_non_empty("sources", &self.sources)?;
        require_text("distance_type", &self.distance_type)
    }
}

// ---------------------------------------------------------------------------
// Cluster
// ---------------------------------------------------------------------------

/// Connected-component clustering of selected raster values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterParams {
    pub input_raster: PathBuf,
    #[serde(default)]
    pub output_csv: Option<PathBuf>,
    #[serde(default)]
    pub output_raster: Option<PathBuf>,
    pub sources: Vec<i64>,
    /// Engine cluster type name, e.g. `ROOK`, `QUEEN` or `DISTANCE`.
    pub cluster_type: String,
    #[serde(default)]
    pub distance_raster: Option<PathBuf>,
    #[serde(default)]
    pub max_distance: Option<f64>,
}

impl TreatmentLineBuilder for ClusterParams {
    fn treatment_id(&self) -> &'static str {
        TREATMENT_CLUSTER
    }

    fn parameters(&self) -> Vec<(&'static str, Option<ParameterValue>)> {
        vec![
            ("input_raster", path(&self.input_raster)),
            ("output_csv", optional_path(&self.output_csv)),
            ("output_raster", optional_path(&self.output_raster)),
            ("cluster_sources", present(ParameterValue::set(self.sources.iter().copied()))),
            ("cluster_type", present(self.cluster_type.as_str())),
            ("distance_raster", optional_path(&self.distance_raster)),
            (
                "max_distance",
                self.max_distance
                    .filter(|d| *d > 0.0)
                    .map(ParameterValue::Decimal),
            ),
        ]
    }

    fn validate(&self) -> Result<(), CoreError> {
        require_non_empty("sources", &self.sources)?;
        require_text("cluster_type", &self.cluster_type)?;
        if self.output_csv.is_none() && self.output_raster.is_none() {
            return Err(CoreError::Validation(
                "Cluster needs at least one of output_csv or output_raster".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Reclassify raster values by domain, e.g. `[0,10[` -> class `1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationParams {
    pub input_raster: PathBuf,
    pub output_raster: PathBuf,
    /// `(domain, class)` pairs.
    pub domains: Vec<(String, String)>,
}

impl TreatmentLineBuilder for ClassificationParams {
    fn treatment_id(&self) -> &'static str {
        TREATMENT_CLASSIFICATION
    }

    fn parameters(&self) -> Vec<(&'static str, Option<ParameterValue>)> {
        vec![
            ("input_raster", path(&self.input_raster)),
            ("output_raster", path(&self.output_raster)),
            (
                "domains",
                present(ParameterValue::enclosed(ParameterValue::Classes(
                    self.domains.clone(),
                ))),
            ),
        ]
    }

    fn validate(&self) -> Result<(), CoreError> {
        require_non_empty("domains", &self.domains)
    }
}

// ---------------------------------------------------------------------------
// Search and replace
// ---------------------------------------------------------------------------

/// Substitute raster values one-for-one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchAndReplaceParams {
    pub input_raster: PathBuf,
    pub output_raster: PathBuf,
    /// `(from, to)` value substitutions.
    pub changes: Vec<(i64, i64)>,
    pub nodata_value: i64,
}

impl TreatmentLineBuilder for SearchAndReplaceParams {
    fn treatment_id(&self) -> &'static str {
        TREATMENT_SEARCH_AND_REPLACE
    }

    fn parameters(&self) -> Vec<(&'static str, Option<ParameterValue>)> {
        let changes = self
            .changes
            .iter()
            .map(|(from, to)| (ParameterValue::Integer(*from), ParameterValue::Integer(*to)))
            .collect();
        vec![
            ("input_raster", path(&self.input_raster)),
            ("output_raster", path(&self.output_raster)),
            (
                "changes",
                present(ParameterValue::enclosed(ParameterValue::Mapping(changes))),
            ),
            ("nodata_value", present(self.nodata_value)),
        ]
    }

    fn validate(&self) -> Result<(), CoreError> {
        require_non_empty("changes", &self.changes)
    }
}

// ---------------------------------------------------------------------------
// Combine
// ---------------------------------------------------------------------------

/// A named raster used as a variable in a combination formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombineFactor {
    pub raster: PathBuf,
    pub name: String,
}

/// Combine several rasters cell-by-cell with a formula over factor names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombineParams {
    /// Formula referencing factor names, e.g. `a + 2*b`.
    pub combination: String,
    pub factors: Vec<CombineFactor>,
    pub output_raster: PathBuf,
}

impl TreatmentLineBuilder for CombineParams {
    fn treatment_id(&self) -> &'static str {
        TREATMENT_COMBINE
    }

    fn parameters(&self) -> Vec<(&'static str, Option<ParameterValue>)> {
        let factors = self
            .factors
            .iter()
            .map(|f| (ParameterValue::path(&f.raster), ParameterValue::text(&f.name)))
            .collect();
        vec![
            ("combination", present(self.combination.as_str())),
            (
                "factors",
                present(ParameterValue::enclosed(ParameterValue::Mapping(factors))),
            ),
            ("output_raster", path(&self.output_raster)),
        ]
    }

    fn validate(&self) -> Result<(), CoreError> {
        require_text("combination", &self.combination)?;
        require_non_empty("factors", &self.factors)?;
        for factor in &self.factors {
            require_text("factor name", &factor.name)?;
        }
        Ok(())
    }
}
