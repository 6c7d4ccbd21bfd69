//! Landscape metric treatments: map, grid, sliding window, selected
//! windows and entity.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{
    distance_function_line, optional_path, path, present, require_non_empty, require_positive,
    to_odd, validate_analysis, AnalyzeType, TreatmentLineBuilder, WindowShape, TREATMENT_ENTITY,
    TREATMENT_GRID, TREATMENT_MAP, TREATMENT_SELECTED, TREATMENT_SLIDING,
};
use crate::error::CoreError;
use crate::parameters::ParameterValue;

/// Upper bound of the tolerated missing-value rate, in percent.
const MAX_NODATA_RATE: u32 = 100;

fn metric_set(metrics: &[String]) -> Option<ParameterValue> {
    present(ParameterValue::set(metrics.iter().map(String::as_str)))
}

fn odd_sizes(sizes: &[u32]) -> Option<ParameterValue> {
    present(ParameterValue::set(sizes.iter().map(|s| to_odd(*s))))
}

fn validate_nodata_rate(field: &str, rate: u32) -> Result<(), CoreError> {
    if rate > MAX_NODATA_RATE {
        return Err(CoreError::Validation(format!(
            "{field} must be between 0 and {MAX_NODATA_RATE}"
        )));
    }
    Ok(())
}

fn validate_sizes(sizes: &[u32]) -> Result<(), CoreError> {
    require_non_empty("sizes", sizes)?;
    for size in sizes {
        require_positive("sizes", *size)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------

/// Metrics computed over the whole raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapParams {
    pub input_raster: PathBuf,
    pub output_csv: PathBuf,
    pub metrics: Vec<String>,
}

impl TreatmentLineBuilder for MapParams {
    fn treatment_id(&self) -> &'static str {
        TREATMENT_MAP
    }

    fn parameters(&self) -> Vec<(&'static str, Option<ParameterValue>)> {
        vec![
            ("input_raster", path(&self.input_raster)),
            ("output_csv", path(&self.output_csv)),
            ("metrics", metric_set(&self.metrics)),
        ]
    }

    fn validate(&self) -> Result<(), CoreError> {
        require_non_empty("metrics", &self.metrics)
    }
}

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

/// Metrics computed over a regular grid of square cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridParams {
    pub input_raster: PathBuf,
    /// Grid cell sizes in pixels. A single size is emitted bare (`sizes=5`).
    pub sizes: Vec<u32>,
    /// Maximum tolerated rate of missing values per cell, in percent.
    pub maximum_rate_nodata_value: u32,
    pub metrics: Vec<String>,
    #[serde(default)]
    pub output_csv: Option<PathBuf>,
    #[serde(default)]
    pub output_raster: Option<PathBuf>,
    #[serde(default)]
    pub output_folder: Option<PathBuf>,
}

impl TreatmentLineBuilder for GridParams {
    fn treatment_id(&self) -> &'static str {
        TREATMENT_GRID
    }

    fn parameters(&self) -> Vec<(&'static str, Option<ParameterValue>)> {
        let sizes = match self.sizes.as_slice() {
            [single] => present(*single),
            many => present(ParameterValue::set(many.iter().copied())),
        };
        vec![
            ("input_raster", path(&self.input_raster)),
            ("sizes", sizes),
            (
                "maximum_rate_nodata_value",
                present(self.maximum_rate_nodata_value),
            ),
            ("metrics", metric_set(&self.metrics)),
            ("output_csv", optional_path(&self.output_csv)),
            ("output_raster", optional_path(&self.output_raster)),
            ("output_folder", optional_path(&self.output_folder)),
        ]
    }

    fn validate(&self) -> Result<(), CoreError> {
        validate_sizes(&self.sizes)?;
        validate_nodata_rate("maximum_rate_nodata_value", self.maximum_rate_nodata_value)?;
        require_non_empty("metrics", &self.metrics)
    }
}

// ---------------------------------------------------------------------------
// Sliding window
// ---------------------------------------------------------------------------

/// Metrics computed in a window sliding over every (or every n-th) pixel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlidingParams {
    pub input_raster: PathBuf,
    pub output_folder: PathBuf,
    /// Window sizes; even values are bumped to the next odd value.
    pub sizes: Vec<u32>,
    pub maximum_nodata_value_rate: u32,
    pub analyze_type: AnalyzeType,
    #[serde(default)]
    pub distance_function: Option<String>,
    pub metrics: Vec<String>,
    /// Step between analysed pixels.
    pub displacement: u32,
    pub shape: WindowShape,
    #[serde(default)]
    pub friction: Option<PathBuf>,
    /// Interpolate values between displaced pixels.
    #[serde(default)]
    pub interpolate: bool,
    /// Fast mode ignores window shape and friction.
    #[serde(default)]
    pub fast_mode: bool,
    /// Only analyse pixels with these values.
    #[serde(default)]
    pub filters: Vec<i64>,
    /// Never analyse pixels with these values.
    #[serde(default)]
    pub unfilters: Vec<i64>,
}

impl SlidingParams {
    fn interpolation(&self) -> Option<ParameterValue> {
        if self.interpolate {
            present(true)
        } else if self.displacement != 1 {
            present(false)
        } else {
            None
        }
    }
}

impl TreatmentLineBuilder for SlidingParams {
    fn treatment_id(&self) -> &'static str {
        TREATMENT_SLIDING
    }

    fn parameters(&self) -> Vec<(&'static str, Option<ParameterValue>)> {
        let shape = (!self.fast_mode).then(|| ParameterValue::text(self.shape.as_engine_str()));
        let friction = if self.fast_mode {
            None
        } else {
            optional_path(&self.friction)
        };
        let filters = (!self.filters.is_empty())
            .then(|| ParameterValue::set(self.filters.iter().copied()));
        let unfilters = (!self.unfilters.is_empty())
            .then(|| ParameterValue::set(self.unfilters.iter().copied()));

        vec![
            ("input_raster", path(&self.input_raster)),
            ("output_folder", path(&self.output_folder)),
            ("sizes", odd_sizes(&self.sizes)),
            (
                "maximum_nodata_value_rate",
                present(self.maximum_nodata_value_rate),
            ),
            ("distance_type", present(self.analyze_type.as_engine_str())),
            (
                "distance_function",
                distance_function_line(self.analyze_type, &self.distance_function),
            ),
            ("metrics", metric_set(&self.metrics)),
            ("displacement", present(self.displacement)),
            ("shape", shape),
            ("friction", friction),
            ("interpolation", self.interpolation()),
            ("filters", filters),
            ("unfilters", unfilters),
        ]
    }

    fn validate(&self) -> Result<(), CoreError> {
        validate_sizes(&self.sizes)?;
        validate_nodata_rate("maximum_nodata_value_rate", self.maximum_nodata_value_rate)?;
        validate_analysis(self.analyze_type, &self.distance_function)?;
        require_non_empty("metrics", &self.metrics)?;
        require_positive("displacement", self.displacement)?;
        if !self.fast_mode && self.shape == WindowShape::Functional && self.friction.is_none() {
            return Err(CoreError::Validation(
                "Functional window shape requires a friction raster".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Selected windows
// ---------------------------------------------------------------------------

/// Where the selected window centres come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "file", rename_all = "snake_case")]
pub enum WindowCentres {
    /// File listing pixel coordinates (column/row).
    Pixels(PathBuf),
    /// File listing map coordinates (x/y).
    Points(PathBuf),
}

/// Metrics computed in windows centred on selected pixels or points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedParams {
    pub input_raster: PathBuf,
    pub sizes: Vec<u32>,
    pub metrics: Vec<String>,
    pub analyze_type: AnalyzeType,
    #[serde(default)]
    pub distance_function: Option<String>,
    pub shape: WindowShape,
    #[serde(default)]
    pub friction: Option<PathBuf>,
    pub centres: WindowCentres,
    #[serde(default)]
    pub output_csv: Option<PathBuf>,
    #[serde(default)]
    pub output_folder: Option<PathBuf>,
    /// Directory where the engine writes one raster per analysed window.
    #[serde(default)]
    pub windows_path: Option<PathBuf>,
}

impl TreatmentLineBuilder for SelectedParams {
    fn treatment_id(&self) -> &'static str {
        TREATMENT_SELECTED
    }

    fn parameters(&self) -> Vec<(&'static str, Option<ParameterValue>)> {
        let (pixels, points) = match &self.centres {
            WindowCentres::Pixels(p) => (path(p), None),
            WindowCentres::Points(p) => (None, path(p)),
        };
        // The engine concatenates file names onto windows_path, so it must
        // end with a separator.
        let windows_path = self.windows_path.as_ref().map(|dir| {
            let mut dir = dir.to_string_lossy().into_owned();
            if !dir.ends_with('/') && !dir.ends_with('\\') {
                dir.push('/');
            }
            ParameterValue::path(dir)
        });

        vec![
            ("input_raster", path(&self.input_raster)),
            ("sizes", odd_sizes(&self.sizes)),
            ("metrics", metric_set(&self.metrics)),
            ("distance_type", present(self.analyze_type.as_engine_str())),
            (
                "distance_function",
                distance_function_line(self.analyze_type, &self.distance_function),
            ),
            ("shape", present(self.shape.as_engine_str())),
            ("friction", optional_path(&self.friction)),
            ("pixels", pixels),
            ("points", points),
            ("output_csv", optional_path(&self.output_csv)),
            ("output_folder", optional_path(&self.output_folder)),
            ("windows_path", windows_path),
        ]
    }

    fn validate(&self) -> Result<(), CoreError> {
        validate_sizes(&self.sizes)?;
        require_non_empty("metrics", &self.metrics)?;
        validate_analysis(self.analyze_type, &self.distance_function)?;
        if self.shape == WindowShape::Functional && self.friction.is_none() {
            return Err(CoreError::Validation(
                "Functional window shape requires a friction raster".to_string(),
            ));
        }
        if self.output_csv.is_none() && self.output_folder.is_none() {
            return Err(CoreError::Validation(
                "Selected needs at least one of output_csv or output_folder".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// Metrics computed per entity of a zoning raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityParams {
    pub input_raster: PathBuf,
    pub entity_raster: PathBuf,
    pub metrics: Vec<String>,
    #[serde(default)]
    pub output_csv: Option<PathBuf>,
    #[serde(default)]
    pub output_raster: Option<PathBuf>,
    #[serde(default)]
    pub output_folder: Option<PathBuf>,
}

impl TreatmentLineBuilder for EntityParams {
    fn treatment_id(&self) -> &'static str {
        TREATMENT_ENTITY
    }

    fn parameters(&self) -> Vec<(&'static str, Option<ParameterValue>)> {
        vec![
            ("input_raster", path(&self.input_raster)),
            ("entity_raster", path(&self.entity_raster)),
            ("metrics", metric_set(&self.metrics)),
            ("output_csv", optional_path(&self.output_csv)),
            ("output_raster", optional_path(&self.output_raster)),
            ("output_folder", optional_path(&self.output_folder)),
        ]
    }

    fn validate(&self) -> Result<(), CoreError> {
        require_non_empty("metrics", &self.metrics)?;
        if self.output_csv.is_none() && self.output_raster.is_none() && self.output_folder.is_none()
        {
            return Err(CoreError::Validation(
                "Entity needs at least one output".to_string(),
            ));
        }
        Ok(())
    }
}
