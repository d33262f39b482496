use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{info, warn};

use crate::align::resize_tile;
use crate::compose::{compose_canvas, CanvasLayout};
use crate::error::{Result, StitchError};
use crate::io::{load_quadrant_image, ImageLoader};
use crate::pipeline::config::StitchingConfig;
use crate::pipeline::types::{span_percent, CancelToken, Milestones, NoOpReporter, PipelineStage};
use crate::quadrant::Quadrant;
use crate::quality::QualityMetrics;
use crate::result::{ChipStitchMetadata, DimensionTransformation, StitchParts, StitchedResult};
use crate::tile::{TileImage, TileSummary};

use super::ChipImageSet;

const LOADING_SPAN: (u8, u8) = (0, 60);
const COMPOSITED_PERCENT: u8 = 90;

/// Composite the chips of `set` on the saved geometry. No feature work is
/// done; quadrants without a usable chip get a black placeholder.
pub fn stitch_chips(set: &ChipImageSet, config: &StitchingConfig, loader: &dyn ImageLoader) -> Result<StitchedResult> {
    let reporter = NoOpReporter;
    stitch_chips_with(set, config, loader, &Milestones::new(&reporter), &CancelToken::new())
}

pub(crate) fn stitch_chips_with(
    set: &ChipImageSet,
    config: &StitchingConfig,
    loader: &dyn ImageLoader,
    milestones: &Milestones<'_>,
    cancel: &CancelToken,
) -> Result<StitchedResult> {
    let started = Instant::now();
    let params = &set.parameters;
    if params.quadrants.is_empty() {
        return Err(StitchError::NoTiles);
    }

    let reporter = milestones.reporter();
    let total = params.quadrants.len();
    reporter.begin_stage(PipelineStage::LoadingChips, Some(total));
    info!(chips = set.found(), quadrants = total, "Stitching chip images");

    let mut tiles: BTreeMap<Quadrant, TileImage> = BTreeMap::new();
    let mut source_tiles: Vec<TileSummary> = Vec::new();
    let mut transformations = Vec::new();
    let mut placeholders = Vec::new();
    let mut warnings = Vec::new();

    for (i, alignment) in params.quadrants.iter().enumerate() {
        cancel.check()?;
        let quadrant = alignment.quadrant;
        let expected = alignment.dimensions;

        let loaded = set.chips.get(&quadrant).cloned().flatten().and_then(|path| {
            load_quadrant_image(quadrant, &path, loader)
                .map_err(|e| {
                    warn!(quadrant = %quadrant, error = %e, "Chip could not be loaded, using placeholder");
                    warnings.push(format!("{quadrant} chip could not be loaded: {e}"));
                })
                .ok()
        });

        match loaded {
            Some(chip) => {
                let original = chip.dimensions();
                let was_resized = original != expected;
                let image = if was_resized {
                    info!(
                        quadrant = %quadrant,
                        from_width = original.0,
                        from_height = original.1,
                        to_width = expected.0,
                        to_height = expected.1,
                        "Resizing chip to recorded size"
                    );
                    warnings.push(format!(
                        "{quadrant} chip was resized from {}x{} to {}x{}",
                        original.0, original.1, expected.0, expected.1
                    ));
                    resize_tile(&chip.image, expected, config.interpolation())?
                } else {
                    chip.image.clone()
                };
                transformations.push(DimensionTransformation {
                    quadrant,
                    original_dimensions: original,
                    final_dimensions: expected,
                    was_resized,
                    interpolation: was_resized.then_some(config.interpolation()),
                });
                source_tiles.push(chip.summary());
                tiles.insert(quadrant, image);
            }
            None => {
                warnings.push(format!("{quadrant} has no chip image; black placeholder used"));
                placeholders.push(quadrant);
                tiles.insert(quadrant, TileImage::filled(expected, 1, 0.0));
            }
        }

        reporter.advance(i + 1);
        milestones.emit(span_percent(LOADING_SPAN, i + 1, total), format!("Prepared {quadrant} chip"));
    }
    reporter.finish_stage();

    if !placeholders.is_empty() {
        warn!(placeholders = placeholders.len(), "Chip stitch uses placeholders");
    }

    cancel.check()?;
    reporter.begin_stage(PipelineStage::Compositing, None);
    let layout = CanvasLayout::with_saved(
        &params.shifts(),
        &params.dimensions(),
        params.origin_offset,
        params.final_dimensions,
    );
    let image = compose_canvas(&tiles, &layout, config)?;
    reporter.finish_stage();
    milestones.emit(COMPOSITED_PERCENT, "Composited chips");

    let chips_found = total - placeholders.len();
    let quality = QualityMetrics::from_coverage(chips_found as f64 / total as f64, warnings);

    let chip_metadata = ChipStitchMetadata {
        chips_found,
        placeholders_generated: placeholders.len(),
        placeholder_quadrants: placeholders,
        transformations,
        elapsed: started.elapsed(),
        source_alignment_path: set.source_path.clone(),
        source_alignment_timestamp: params.timestamp.clone(),
    };

    info!(
        width = layout.width,
        height = layout.height,
        found = chips_found,
        placeholders = chip_metadata.placeholders_generated,
        "Chip stitch complete"
    );

    Ok(StitchedResult::assemble(
        StitchParts {
            image,
            source_tiles,
            config: config.clone(),
            quality,
            alignments: params.quadrants.clone(),
            origin_offset: layout.origin_offset,
            chip_metadata: Some(chip_metadata),
        },
        started,
    ))
}
