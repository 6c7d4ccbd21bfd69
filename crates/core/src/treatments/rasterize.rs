//! Raster generation from tabular or vector inputs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{
    path, present, require_non_empty, require_positive, require_text, TreatmentLineBuilder,
    TREATMENT_RASTER_FROM_CSV, TREATMENT_RASTER_FROM_SHAPEFILE,
};
use crate::error::CoreError;
use crate::parameters::ParameterValue;

fn require_positive_cellsize(cellsize: f64) -> Result<(), CoreError> {
    if !(cellsize.is_finite() && cellsize > 0.0) {
        return Err(CoreError::Validation(
            "cellsize must be a positive number".to_string(),
        ));
    }
    Ok(())
}

/// One raster per CSV variable, laid out on a regular grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterFromCsvParams {
    pub input_csv: PathBuf,
    pub output_folder: PathBuf,
    /// File name prefix of each generated raster.
    pub output_prefix: String,
    /// Output format, e.g. `image/tiff` or `text/plain` (ASCII grid).
    pub mime_type: String,
    /// CSV columns to rasterize.
    pub variables: Vec<String>,
    pub width: u32,
    pub height: u32,
    pub xmin: f64,
    pub ymin: f64,
    pub cellsize: f64,
    pub nodata_value: i64,
    /// Output CRS, e.g. `EPSG:2154`.
    pub crs: String,
}

impl TreatmentLineBuilder for RasterFromCsvParams {
    fn treatment_id(&self) -> &'static str {
        TREATMENT_RASTER_FROM_CSV
    }

    fn parameters(&self) -> Vec<(&'static str, Option<ParameterValue>)> {
        vec![
            ("input_csv", path(&self.input_csv)),
            ("output_folder", path(&self.output_folder)),
            ("output_prefix", present(self.output_prefix.as_str())),
            ("mime_type", present(self.mime_type.as_str())),
            (
                "variables",
                present(ParameterValue::set(self.variables.iter().map(String::as_str))),
            ),
            ("width", present(self.width)),
            ("height", present(self.height)),
            ("xmin", present(self.xmin)),
            ("ymin", present(self.ymin)),
            ("cellsize", present(self.cellsize)),
            ("nodata_value", present(self.nodata_value)),
            ("crs", present(self.crs.as_str())),
        ]
    }

    fn validate(&self) -> Result<(), CoreError> {
        require_non_empty("variables", &self.variables)?;
        require_positive("width", self.width)?;
        require_positive("height", self.height)?;
        require_positive_cellsize(self.cellsize)?;
        require_text("mime_type", &self.mime_type)
    }
}

/// Bounding box restricting a shapefile rasterization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

/// Burn a shapefile attribute into a raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterFromShapefileParams {
    pub input_shapefile: PathBuf,
    pub output_raster: PathBuf,
    /// Attribute whose value is written to each covered cell.
    pub attribute: String,
    /// Defaults to the shapefile's own extent when absent.
    #[serde(default)]
    pub extent: Option<Extent>,
    pub cellsize: f64,
    pub nodata_value: i64,
    /// Value of cells not covered by any feature.
    pub fill_value: i64,
}

impl TreatmentLineBuilder for RasterFromShapefileParams {
    fn treatment_id(&self) -> &'static str {
        TREATMENT_RASTER_FROM_SHAPEFILE
    }

    fn parameters(&self) -> Vec<(&'static str, Option<ParameterValue>)> {
        let extent = self.extent;
        vec![
            ("input_shapefile", path(&self.input_shapefile)),
            ("output_raster", path(&self.output_raster)),
            ("attribute", present(self.attribute.as_str())),
            ("xmin", extent.map(|e| ParameterValue::Decimal(e.xmin))),
            ("xmax", extent.map(|e| ParameterValue::Decimal(e.xmax))),
            ("ymin", extent.map(|e| ParameterValue::Decimal(e.ymin))),
            ("ymax", extent.map(|e| ParameterValue::Decimal(e.ymax))),
            ("cellsize", present(self.cellsize)),
            ("nodata_value", present(self.nodata_value)),
            ("fill_value", present(self.fill_value)),
        ]
    }

    fn validate(&self) -> Result<(), CoreError> {
        require_text("attribute", &self.attribute)?;
        require_positive_cellsize(self.cellsize)?;
        if let Some(e) = self.extent {
            if e.xmin >= e.xmax || e.ymin >= e.ymax {
                return Err(CoreError::Validation(
                    "extent minimum must be below its maximum".to_string(),
                ));
            }
        }
        Ok(())
    }
}
