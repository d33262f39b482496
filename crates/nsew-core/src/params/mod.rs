//! Persisted alignment geometry, reusable for chip stitching.

pub mod store;
pub mod validate;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::PARAMS_SCHEMA_VERSION;
use crate::quadrant::Quadrant;
use crate::tile::Dimensions;

pub use store::{default_parameters_path, load_parameters, save_parameters};
pub use validate::{inspect_parameters_file, validate_parameters, ValidationReport};

/// Placement of one tile in a stitch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuadrantAlignment {
    pub quadrant: Quadrant,
    pub original_image_path: PathBuf,
    /// (width, height) of the tile as placed on the canvas.
    pub dimensions: Dimensions,
    /// Tile origin relative to the anchor tile, before the origin offset.
    pub position_shift: (f64, f64),
}

/// Geometry of one original stitch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlignmentParameters {
    pub version: String,
    /// RFC 3339.
    pub timestamp: String,
    pub stitched_image_path: PathBuf,
    pub quadrants: Vec<QuadrantAlignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_dimensions: Option<Dimensions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_offset: Option<(f64, f64)>,
}

impl AlignmentParameters {
    /// Record for a finished stitch, stamped with the current schema version
    /// and local time.
    pub fn from_alignment(
        stitched_image_path: &Path,
        mut quadrants: Vec<QuadrantAlignment>,
        final_dimensions: Dimensions,
        origin_offset: (f64, f64),
    ) -> Self {
        quadrants.sort_by_key(|a| a.quadrant);
        Self {
            version: PARAMS_SCHEMA_VERSION.to_string(),
            timestamp: chrono::Local::now().to_rfc3339(),
            stitched_image_path: stitched_image_path.to_path_buf(),
            quadrants,
            final_dimensions: Some(final_dimensions),
            origin_offset: Some(origin_offset),
        }
    }

    pub fn alignment(&self, quadrant: Quadrant) -> Option<&QuadrantAlignment> {
        self.quadrants.iter().find(|a| a.quadrant == quadrant)
    }

    pub fn shifts(&self) -> BTreeMap<Quadrant, (f64, f64)> {
        self.quadrants.iter().map(|a| (a.quadrant, a.position_shift)).collect()
    }

    pub fn dimensions(&self) -> BTreeMap<Quadrant, Dimensions> {
        self.quadrants.iter().map(|a| (a.quadrant, a.dimensions)).collect()
    }
}

/// How a stored schema version relates to the current one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VersionSupport {
    Current,
    /// Older layout that reads with defaults for the missing fields.
    Migratable,
    Unsupported,
}

pub fn version_support(version: &str) -> VersionSupport {
    let major = version.trim().split('.').next().unwrap_or("");
    match major {
        "1" => VersionSupport::Current,
        "0" => VersionSupport::Migratable,
        _ => VersionSupport::Unsupported,
    }
}
