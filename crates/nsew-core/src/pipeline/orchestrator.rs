use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::align::estimator::estimate_geometry_with;
use crate::align::harmonize_dimensions;
use crate::chip::compose::stitch_chips_with;
use crate::chip::ChipImageSet;
use crate::compose::{compose_canvas, CanvasLayout};
use crate::error::{Result, StitchError};
use crate::io::{ImageLoader, ImageWriter};
use crate::params::{default_parameters_path, save_parameters, AlignmentParameters, QuadrantAlignment};
use crate::quadrant::Quadrant;
use crate::quality::assess_quality;
use crate::result::{StitchParts, StitchedResult};
use crate::tile::{Dimensions, QuadrantImage, TileImage};

use super::config::StitchingConfig;
use super::types::{CancelToken, Milestones, PipelineStage, ProgressReporter};

const RESIZED_PERCENT: u8 = 5;
const COMPOSITED_PERCENT: u8 = 90;

/// Where a finished stitch is written.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StitchOutput {
    /// Stitched image. Nothing is written when absent.
    pub image_path: Option<PathBuf>,
    /// Alignment parameters; defaults to [`default_parameters_path`].
    pub parameters_path: Option<PathBuf>,
}

/// Where a finished chip stitch is written.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChipOutput {
    pub image_path: Option<PathBuf>,
}

/// Align and composite the loaded tiles. Writes nothing.
pub fn stitch_quadrants(
    tiles: &[Arc<QuadrantImage>],
    config: &StitchingConfig,
    reporter: Arc<dyn ProgressReporter>,
    cancel: &CancelToken,
) -> Result<StitchedResult> {
    stitch_quadrants_with(tiles, config, &Milestones::new(reporter.as_ref()), cancel)
}

fn stitch_quadrants_with(
    tiles: &[Arc<QuadrantImage>],
    config: &StitchingConfig,
    milestones: &Milestones<'_>,
    cancel: &CancelToken,
) -> Result<StitchedResult> {
    let started = Instant::now();
    if tiles.is_empty() {
        return Err(StitchError::NoTiles);
    }
    let mut by_quadrant: BTreeMap<Quadrant, &QuadrantImage> = BTreeMap::new();
    for tile in tiles {
        if by_quadrant.insert(tile.quadrant, tile.as_ref()).is_some() {
            return Err(StitchError::InvalidConfig(format!(
                "more than one tile assigned to {}",
                tile.quadrant
            )));
        }
    }
    info!(
        tiles = by_quadrant.len(),
        method = %config.alignment_method(),
        blend = %config.blend_mode(),
        "Starting stitch"
    );

    let reporter = milestones.reporter();
    reporter.begin_stage(PipelineStage::Resizing, Some(by_quadrant.len()));
    let originals: Vec<(Quadrant, TileImage)> = by_quadrant.iter().map(|(q, t)| (*q, t.image.clone())).collect();
    let (harmonized, resized) = harmonize_dimensions(originals, config.resize_strategy(), config.interpolation())?;
    reporter.finish_stage();
    milestones.emit(RESIZED_PERCENT, "Harmonized tile dimensions");

    cancel.check()?;
    let geometry = estimate_geometry_with(&harmonized, config, milestones, cancel)?;
    let quality = assess_quality(&geometry, &resized, config);
    for warning in &quality.warnings {
        warn!("{warning}");
    }

    cancel.check()?;
    reporter.begin_stage(PipelineStage::Compositing, None);
    let dims: BTreeMap<Quadrant, Dimensions> = harmonized.iter().map(|(q, t)| (*q, t.dimensions())).collect();
    let layout = CanvasLayout::from_shifts(&geometry.placements, &dims);
    let harmonized: BTreeMap<Quadrant, TileImage> = harmonized.into_iter().collect();
    let image = compose_canvas(&harmonized, &layout, config)?;
    reporter.finish_stage();
    milestones.emit(COMPOSITED_PERCENT, "Composited canvas");

    let alignments: Vec<QuadrantAlignment> = by_quadrant
        .iter()
        .map(|(q, tile)| QuadrantAlignment {
            quadrant: *q,
            original_image_path: tile.path.clone(),
            dimensions: dims[q],
            position_shift: geometry.placements.get(q).copied().unwrap_or((0.0, 0.0)),
        })
        .collect();

    info!(
        width = layout.width,
        height = layout.height,
        confidence = quality.overall_confidence,
        category = %quality.category(),
        "Stitch complete"
    );

    Ok(StitchedResult::assemble(
        StitchParts {
            image,
            source_tiles: by_quadrant.values().map(|t| t.summary()).collect(),
            config: config.clone(),
            quality,
            alignments,
            origin_offset: layout.origin_offset,
            chip_metadata: None,
        },
        started,
    ))
}

/// Stitch, then write the image and (when an image was written) the
/// alignment parameters that let chips reuse this geometry.
///
/// Cancellation is honoured up to the start of write-out; a cancelled run
/// writes nothing.
pub fn run_stitch(
    tiles: &[Arc<QuadrantImage>],
    config: &StitchingConfig,
    output: &StitchOutput,
    writer: &dyn ImageWriter,
    reporter: Arc<dyn ProgressReporter>,
    cancel: &CancelToken,
) -> Result<StitchedResult> {
    let milestones = Milestones::new(reporter.as_ref());
    let result = stitch_quadrants_with(tiles, config, &milestones, cancel)?;
    cancel.check()?;

    if let Some(image_path) = &output.image_path {
        reporter.begin_stage(PipelineStage::Writing, Some(2));
        writer.save(&result.image, image_path, config.output_format(), config.compression_level())?;
        reporter.advance(1);

        let params_path = output.parameters_path.clone().unwrap_or_else(default_parameters_path);
        let params = AlignmentParameters::from_alignment(
            image_path,
            result.alignments.clone(),
            result.full_resolution,
            result.origin_offset,
        );
        save_parameters(&params, &params_path)?;
        reporter.advance(2);
        reporter.finish_stage();
        info!(image = %image_path.display(), params = %params_path.display(), "Wrote stitch output");
    }

    milestones.emit(100, "Done");
    Ok(result)
}

/// Stitch chips on saved geometry and write the image. Parameters are never
/// written.
pub fn run_chip_stitch(
    set: &ChipImageSet,
    config: &StitchingConfig,
    output: &ChipOutput,
    loader: &dyn ImageLoader,
    writer: &dyn ImageWriter,
    reporter: Arc<dyn ProgressReporter>,
    cancel: &CancelToken,
) -> Result<StitchedResult> {
    let milestones = Milestones::new(reporter.as_ref());
    let result = stitch_chips_with(set, config, loader, &milestones, cancel)?;
    cancel.check()?;

    if let Some(image_path) = &output.image_path {
        reporter.begin_stage(PipelineStage::Writing, Some(1));
        writer.save(&result.image, image_path, config.output_format(), config.compression_level())?;
        reporter.advance(1);
        reporter.finish_stage();
        info!(image = %image_path.display(), "Wrote chip stitch");
    }

    milestones.emit(100, "Done");
    Ok(result)
}
