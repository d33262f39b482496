//! Pairwise border alignment and tile placement.

pub mod estimator;
pub mod placement;
pub mod ransac;
pub mod resize;

use std::collections::BTreeMap;

use crate::quadrant::{Border, BorderAxis, Quadrant};
use crate::tile::Dimensions;

pub use estimator::{border_confidence, estimate_geometry, overlap_percent};
pub use placement::place_tiles;
pub use ransac::{fit_translation, TranslationFit};
pub use resize::{harmonize_dimensions, resize_tile, target_dimensions, ResizeNote};

/// Measured alignment across one border.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BorderEstimate {
    pub border: Border,
    pub confidence: f64,
    pub overlap_percent: f64,
    pub matches: usize,
    pub inliers: usize,
    /// Origin of the second tile in the first tile's frame.
    pub translation: (f64, f64),
}

/// Geometry of a set of tiles.
#[derive(Clone, Debug, Default)]
pub struct GeometryEstimate {
    /// Tile origin relative to the anchor tile at (0, 0).
    pub placements: BTreeMap<Quadrant, (f64, f64)>,
    /// Borders whose neighbours are both present.
    pub possible_borders: Vec<Border>,
    /// Borders with a usable fit.
    pub borders: Vec<BorderEstimate>,
    /// Possible borders that fell back to nominal placement.
    pub nominal_borders: Vec<Border>,
}

impl GeometryEstimate {
    pub fn border(&self, border: Border) -> Option<&BorderEstimate> {
        self.borders.iter().find(|b| b.border == border)
    }
}

/// Translation implied by the configured overlap for tiles of `dims`.
pub fn nominal_translation(border: Border, dims: Dimensions, overlap_threshold_percent: f64) -> (f64, f64) {
    let keep = 1.0 - overlap_threshold_percent / 100.0;
    match border.axis() {
        BorderAxis::Horizontal => (dims.0 as f64 * keep, 0.0),
        BorderAxis::Vertical => (0.0, dims.1 as f64 * keep),
    }
}
