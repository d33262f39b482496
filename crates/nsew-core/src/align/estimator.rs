use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::{s, Array2};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::consts::{
    BORDER_SEARCH_FRACTION, CONFIDENCE_MATCH_SCALE, MATCH_RATIO, MIN_INLIERS, MIN_MATCHES,
};
use crate::error::{Result, StitchError};
use crate::features::{detector_for, match_features, FeatureDetector, Features};
use crate::pipeline::config::StitchingConfig;
use crate::pipeline::types::{span_percent, CancelToken, Milestones, NoOpReporter, PipelineStage};
use crate::quadrant::{Border, BorderAxis, Quadrant};
use crate::tile::{Dimensions, TileImage};

use super::placement::place_tiles;
use super::ransac::{fit_translation, TranslationFit};
use super::{BorderEstimate, GeometryEstimate};

/// Progress span (percent) covered by feature extraction and matching.
const FEATURES_SPAN: (u8, u8) = (5, 55);
const MATCHING_SPAN: (u8, u8) = (55, 70);

/// Which half of a tile faces a border.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

fn border_sides(border: Border) -> (Side, Side) {
    match border.axis() {
        BorderAxis::Horizontal => (Side::Right, Side::Left),
        BorderAxis::Vertical => (Side::Bottom, Side::Top),
    }
}

/// Border confidence from RANSAC support.
///
/// `inlier_ratio * (1 - exp(-inliers / 10))`: zero without inliers,
/// increasing in both arguments, approaching the inlier ratio as the
/// inlier count grows.
pub fn border_confidence(inliers: usize, matches: usize) -> f64 {
    if matches == 0 {
        return 0.0;
    }
    let ratio = inliers as f64 / matches as f64;
    ratio * (1.0 - (-(inliers as f64) / CONFIDENCE_MATCH_SCALE).exp())
}

/// Overlap of two tiles as a percentage of `extent`, given the translation
/// along the border axis.
pub fn overlap_percent(extent: f64, translation_along_axis: f64) -> f64 {
    if extent <= 0.0 {
        return 0.0;
    }
    (extent - translation_along_axis) / extent * 100.0
}

/// Estimate the placement of equally sized tiles. See [`estimate_geometry_with`].
pub fn estimate_geometry(tiles: &[(Quadrant, TileImage)], config: &StitchingConfig) -> Result<GeometryEstimate> {
    let reporter = NoOpReporter;
    estimate_geometry_with(tiles, config, &Milestones::new(&reporter), &CancelToken::new())
}

pub(crate) fn estimate_geometry_with(
    tiles: &[(Quadrant, TileImage)],
    config: &StitchingConfig,
    milestones: &Milestones<'_>,
    cancel: &CancelToken,
) -> Result<GeometryEstimate> {
    if tiles.is_empty() {
        return Err(StitchError::NoTiles);
    }

    let dims: BTreeMap<Quadrant, Dimensions> = tiles.iter().map(|(q, t)| (*q, t.dimensions())).collect();
    let possible_borders: Vec<Border> = Border::ALL
        .into_iter()
        .filter(|b| {
            let (a, c) = b.quadrants();
            dims.contains_key(&a) && dims.contains_key(&c)
        })
        .collect();

    let features = extract_border_features(tiles, &possible_borders, config, milestones, cancel)?;

    let reporter = milestones.reporter();
    reporter.begin_stage(PipelineStage::Matching, Some(possible_borders.len()));
    let mut borders = Vec::new();
    let mut nominal_borders = Vec::new();
    for (i, &border) in possible_borders.iter().enumerate() {
        cancel.check()?;
        let (a, b) = border.quadrants();
        let (side_a, side_b) = border_sides(border);
        let estimate = match (features.get(&(a, side_a)), features.get(&(b, side_b))) {
            (Some(fa), Some(fb)) => estimate_border(border, fa, fb, dims[&a], config.feature_seed()),
            _ => None,
        };
        match estimate {
            Some(estimate) => {
                info!(
                    border = %border,
                    matches = estimate.matches,
                    inliers = estimate.inliers,
                    confidence = estimate.confidence,
                    overlap_percent = estimate.overlap_percent,
                    "Border aligned"
                );
                if estimate.confidence < config.confidence_threshold() {
                    warn!(border = %border, confidence = estimate.confidence, "Border confidence below threshold");
                }
                borders.push(estimate);
            }
            None => {
                warn!(border = %border, "No usable fit, falling back to nominal overlap");
                nominal_borders.push(border);
            }
        }

        reporter.advance(i + 1);
        milestones.emit(
            span_percent(MATCHING_SPAN, i + 1, possible_borders.len()),
            format!("Matched {border} border"),
        );
    }
    reporter.finish_stage();

    if !config.allow_low_confidence() && !possible_borders.is_empty() {
        if borders.is_empty() {
            return Err(StitchError::InsufficientGeometry(format!(
                "none of the {} shared borders could be aligned",
                possible_borders.len()
            )));
        }
        if borders.iter().all(|b| b.confidence < config.confidence_threshold()) {
            let best = borders.iter().map(|b| b.confidence).fold(0.0, f64::max);
            return Err(StitchError::InsufficientGeometry(format!(
                "best border confidence {best:.3} is below the threshold {:.3}",
                config.confidence_threshold()
            )));
        }
    }

    let placements = place_tiles(&dims, &borders, &nominal_borders, config.overlap_threshold_percent());

    Ok(GeometryEstimate {
        placements,
        possible_borders,
        borders,
        nominal_borders,
    })
}

/// Detect features on every border-facing half that takes part in a possible
/// border. Tiles run in parallel.
fn extract_border_features(
    tiles: &[(Quadrant, TileImage)],
    possible_borders: &[Border],
    config: &StitchingConfig,
    milestones: &Milestones<'_>,
    cancel: &CancelToken,
) -> Result<BTreeMap<(Quadrant, Side), Features>> {
    let detector = detector_for(config.alignment_method(), config.feature_seed());
    let reporter = milestones.reporter();
    reporter.begin_stage(PipelineStage::FeatureExtraction, Some(tiles.len()));
    info!(method = detector.name(), tiles = tiles.len(), "Extracting features");

    let done = AtomicUsize::new(0);
    let per_tile: Vec<Vec<((Quadrant, Side), Features)>> = tiles
        .par_iter()
        .map(|(quadrant, tile)| {
            cancel.check()?;
            let sides: Vec<Side> = possible_borders
                .iter()
                .filter_map(|&border| {
                    let (a, b) = border.quadrants();
                    let (side_a, side_b) = border_sides(border);
                    if a == *quadrant {
                        Some(side_a)
                    } else if b == *quadrant {
                        Some(side_b)
                    } else {
                        None
                    }
                })
                .collect();

            let gray = tile.luminance();
            let found: Vec<((Quadrant, Side), Features)> = sides
                .into_iter()
                .map(|side| ((*quadrant, side), detect_side(detector.as_ref(), &gray, side)))
                .collect();
            for ((_, side), f) in &found {
                debug!(quadrant = %quadrant, side = ?side, keypoints = f.len(), "Features detected");
            }

            let n = done.fetch_add(1, Ordering::SeqCst) + 1;
            reporter.advance(n);
            milestones.emit(
                span_percent(FEATURES_SPAN, n, tiles.len()),
                format!("Extracted features ({quadrant})"),
            );
            Ok(found)
        })
        .collect::<Result<_>>()?;
    reporter.finish_stage();

    Ok(per_tile.into_iter().flatten().collect())
}

/// Run the detector on one half of `gray`, returning keypoints in tile coordinates.
fn detect_side(detector: &dyn FeatureDetector, gray: &Array2<f32>, side: Side) -> Features {
    let (h, w) = gray.dim();
    let keep_w = ((w as f64 * BORDER_SEARCH_FRACTION).ceil() as usize).min(w);
    let keep_h = ((h as f64 * BORDER_SEARCH_FRACTION).ceil() as usize).min(h);
    let (rows, cols) = match side {
        Side::Left => (0..h, 0..keep_w),
        Side::Right => (0..h, w - keep_w..w),
        Side::Top => (0..keep_h, 0..w),
        Side::Bottom => (h - keep_h..h, 0..w),
    };
    let (dy, dx) = (rows.start as f64, cols.start as f64);
    let crop = gray.slice(s![rows, cols]).to_owned();
    detector.detect(&crop).translate(dx, dy)
}

/// Match one border and fit its translation. `None` when there is no
/// plausible fit.
fn estimate_border(
    border: Border,
    first: &Features,
    second: &Features,
    first_dims: Dimensions,
    seed: u64,
) -> Option<BorderEstimate> {
    let matches = match_features(first, second, MATCH_RATIO);
    if matches.len() < MIN_MATCHES {
        debug!(border = %border, matches = matches.len(), "Too few matches");
        return None;
    }

    // Each match implies the second tile's origin in the first tile's frame.
    let offsets: Vec<(f64, f64)> = matches
        .iter()
        .map(|m| {
            let a = first.keypoints[m.query];
            let b = second.keypoints[m.train];
            (a.x - b.x, a.y - b.y)
        })
        .collect();
    let fit = fit_translation(&offsets, seed)?;
    if fit.inliers < MIN_INLIERS || !is_plausible(border, &fit, first_dims) {
        debug!(border = %border, dx = fit.dx, dy = fit.dy, inliers = fit.inliers, "Rejected fit");
        return None;
    }

    let (extent, along) = match border.axis() {
        BorderAxis::Horizontal => (first_dims.0 as f64, fit.dx),
        BorderAxis::Vertical => (first_dims.1 as f64, fit.dy),
    };
    Some(BorderEstimate {
        border,
        confidence: border_confidence(fit.inliers, fit.matches),
        overlap_percent: overlap_percent(extent, along),
        matches: fit.matches,
        inliers: fit.inliers,
        translation: (fit.dx, fit.dy),
    })
}

/// The neighbour must lie to the right (or below) with a partial overlap,
/// and drift across the border by less than half a tile.
fn is_plausible(border: Border, fit: &TranslationFit, dims: Dimensions) -> bool {
    let (w, h) = (dims.0 as f64, dims.1 as f64);
    match border.axis() {
        BorderAxis::Horizontal => fit.dx > 0.0 && fit.dx < w && fit.dy.abs() < h * 0.5,
        BorderAxis::Vertical => fit.dy > 0.0 && fit.dy < h && fit.dx.abs() < w * 0.5,
    }
}
