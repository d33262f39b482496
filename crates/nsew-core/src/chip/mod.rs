//! Re-stitching "chip" images with geometry saved from an earlier stitch.

pub mod compose;
pub mod locate;

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::params::AlignmentParameters;
use crate::quadrant::Quadrant;
use crate::tile::Dimensions;

pub use compose::stitch_chips;
pub use locate::locate_chip_images;

/// Default chip stem: the original's prefix and code with a `_chip` suffix.
pub const DEFAULT_CHIP_TEMPLATE: &str = "{prefix}{code}_chip";

/// How a chip file is named relative to its original tile.
///
/// The template may use `{prefix}` (original stem before the quadrant code)
/// and `{code}` (the two-letter code, upper case).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChipNaming {
    pub template: String,
}

impl Default for ChipNaming {
    fn default() -> Self {
        Self {
            template: DEFAULT_CHIP_TEMPLATE.to_string(),
        }
    }
}

impl ChipNaming {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn chip_stem(&self, prefix: &str, quadrant: Quadrant) -> String {
        self.template
            .replace("{prefix}", prefix)
            .replace("{code}", quadrant.code())
    }
}

/// A chip whose size differs from the size recorded for its quadrant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DimensionMismatch {
    pub quadrant: Quadrant,
    pub chip_path: PathBuf,
    pub found: Dimensions,
    pub expected: Dimensions,
}

/// Chips discovered for a saved alignment.
#[derive(Clone, Debug, PartialEq)]
pub struct ChipImageSet {
    pub parameters: AlignmentParameters,
    /// Where `parameters` was read from.
    pub source_path: PathBuf,
    /// One key per recorded quadrant; `None` when no chip was found.
    pub chips: BTreeMap<Quadrant, Option<PathBuf>>,
    pub missing: Vec<Quadrant>,
    pub mismatches: Vec<DimensionMismatch>,
}

impl ChipImageSet {
    pub fn found(&self) -> usize {
        self.chips.values().filter(|p| p.is_some()).count()
    }

    pub fn mismatch(&self, quadrant: Quadrant) -> Option<&DimensionMismatch> {
        self.mismatches.iter().find(|m| m.quadrant == quadrant)
    }
}
