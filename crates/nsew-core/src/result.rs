use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::compose::display_copy;
use crate::params::QuadrantAlignment;
use crate::pipeline::config::{Interpolation, StitchingConfig};
use crate::quadrant::Quadrant;
use crate::quality::QualityMetrics;
use crate::tile::{Dimensions, TileImage, TileSummary};

/// How a chip was brought to its recorded size.
#[derive(Clone, Debug, PartialEq)]
pub struct DimensionTransformation {
    pub quadrant: Quadrant,
    pub original_dimensions: Dimensions,
    pub final_dimensions: Dimensions,
    pub was_resized: bool,
    pub interpolation: Option<Interpolation>,
}

/// Extra facts about a stitch that reused saved geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct ChipStitchMetadata {
    pub chips_found: usize,
    pub placeholders_generated: usize,
    pub placeholder_quadrants: Vec<Quadrant>,
    pub transformations: Vec<DimensionTransformation>,
    pub elapsed: Duration,
    pub source_alignment_path: PathBuf,
    pub source_alignment_timestamp: String,
}

/// Output of a stitch.
#[derive(Clone, Debug)]
pub struct StitchedResult {
    pub image: TileImage,
    pub full_resolution: Dimensions,
    pub display_resolution: Dimensions,
    /// Downsampled copy when the canvas is too large to show directly.
    pub display_image: Option<TileImage>,
    pub source_tiles: Vec<TileSummary>,
    pub config: StitchingConfig,
    pub quality: QualityMetrics,
    /// Placement used, one entry per tile.
    pub alignments: Vec<QuadrantAlignment>,
    pub origin_offset: (f64, f64),
    pub processing_time: Duration,
    /// RFC 3339.
    pub timestamp: String,
    pub was_downsampled: bool,
    pub is_chip_stitch: bool,
    pub chip_metadata: Option<ChipStitchMetadata>,
}

/// Everything a stitch produced before display preparation.
pub(crate) struct StitchParts {
    pub image: TileImage,
    pub source_tiles: Vec<TileSummary>,
    pub config: StitchingConfig,
    pub quality: QualityMetrics,
    pub alignments: Vec<QuadrantAlignment>,
    pub origin_offset: (f64, f64),
    pub chip_metadata: Option<ChipStitchMetadata>,
}

impl StitchedResult {
    pub(crate) fn assemble(parts: StitchParts, started: Instant) -> Self {
        let full_resolution = parts.image.dimensions();
        let display_image = display_copy(&parts.image);
        let display_resolution = display_image
            .as_ref()
            .map_or(full_resolution, TileImage::dimensions);

        Self {
            image: parts.image,
            full_resolution,
            display_resolution,
            was_downsampled: display_image.is_some(),
            display_image,
            source_tiles: parts.source_tiles,
            config: parts.config,
            quality: parts.quality,
            alignments: parts.alignments,
            origin_offset: parts.origin_offset,
            processing_time: started.elapsed(),
            timestamp: chrono::Local::now().to_rfc3339(),
            is_chip_stitch: parts.chip_metadata.is_some(),
            chip_metadata: parts.chip_metadata,
        }
    }

    /// Image to show: the display copy when there is one.
    pub fn display(&self) -> &TileImage {
        self.display_image.as_ref().unwrap_or(&self.image)
    }
}
