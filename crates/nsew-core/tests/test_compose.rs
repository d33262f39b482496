mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use approx::assert_abs_diff_eq;

use nsew_core::compose::{compose_canvas, CanvasLayout};
use nsew_core::pipeline::{stitch_quadrants, BlendMode, CancelToken, MissingFill, NoOpReporter, StitchingConfig};
use nsew_core::quadrant::Border;
use nsew_core::{Quadrant, TileImage};

fn config(blend: BlendMode, fill: MissingFill) -> StitchingConfig {
    StitchingConfig::builder()
        .blend_mode(blend)
        .missing_quadrant_fill(fill)
        .build()
        .unwrap()
}

/// NW flat at `left`, NE flat at `right`, overlapping by 32 columns.
fn two_flat_tiles(left: f32, right: f32) -> (BTreeMap<Quadrant, TileImage>, CanvasLayout) {
    let tiles: BTreeMap<Quadrant, TileImage> = [
        (Quadrant::NW, TileImage::filled((96, 128), 1, left)),
        (Quadrant::NE, TileImage::filled((96, 128), 1, right)),
    ]
    .into();
    let shifts: BTreeMap<Quadrant, (f64, f64)> = [(Quadrant::NW, (0.0, 0.0)), (Quadrant::NE, (64.0, 0.0))].into();
    let dims = tiles.iter().map(|(q, t)| (*q, t.dimensions())).collect();
    (tiles, CanvasLayout::from_shifts(&shifts, &dims))
}

// ---------------------------------------------------------------------------
// Single tile
// ---------------------------------------------------------------------------

#[test]
fn test_single_tile_unchanged_in_every_mode() {
    let scene = common::scene(9);
    let tile = common::cut_tiles(&scene).remove(0);
    let images = common::quadrant_images(&[tile.clone()]);

    for blend in [BlendMode::Linear, BlendMode::Feather, BlendMode::Multiband] {
        let result = stitch_quadrants(
            &images,
            &config(blend, MissingFill::Black),
            Arc::new(NoOpReporter),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(result.full_resolution, tile.1.dimensions(), "{blend}");
        assert_eq!(result.origin_offset, (0.0, 0.0));
        for border in Border::ALL {
            assert_eq!(result.quality.border_confidence(border), None);
            assert_eq!(result.quality.overlap_percent(border), None);
        }
        for (a, b) in result.image.data.iter().zip(tile.1.data.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-5);
        }
        assert!(!result.was_downsampled);
        assert_eq!(result.display_resolution, result.full_resolution);
    }
}

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

#[test]
fn test_multiband_seam_is_monotonic() {
    let (tiles, layout) = two_flat_tiles(0.4, 0.6);
    let image = compose_canvas(&tiles, &layout, &config(BlendMode::Multiband, MissingFill::Black)).unwrap();
    assert_eq!(image.dimensions(), (160, 128));

    let row = 64;
    let values: Vec<f32> = (0..160).map(|c| image.data[[row, c, 0]]).collect();
    assert_abs_diff_eq!(values[0], 0.4, epsilon = 1e-3);
    assert_abs_diff_eq!(values[159], 0.6, epsilon = 1e-3);
    for pair in values.windows(2) {
        assert!(pair[1] >= pair[0] - 1e-5, "not monotonic: {pair:?}");
        assert!((pair[1] - pair[0]).abs() < 0.1, "jump: {pair:?}");
    }
    assert!(values.iter().all(|&v| (0.4 - 1e-5..=0.6 + 1e-5).contains(&v)));
}

#[test]
fn test_linear_blend_ramps_across_overlap() {
    let (tiles, layout) = two_flat_tiles(0.0, 1.0);
    let image = compose_canvas(&tiles, &layout, &config(BlendMode::Linear, MissingFill::Black)).unwrap();
    let row = 64;
    assert_abs_diff_eq!(image.data[[row, 10, 0]], 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(image.data[[row, 150, 0]], 1.0, epsilon = 1e-6);
    let mid = image.data[[row, 80, 0]];
    assert!(mid > 0.2 && mid < 0.8, "mid = {mid}");
    for c in 64..96 {
        assert!(image.data[[row, c + 1, 0]] >= image.data[[row, c, 0]] - 1e-6);
    }
}

#[test]
fn test_feather_keeps_tiles_pure_away_from_seam() {
    let (tiles, layout) = two_flat_tiles(0.2, 0.8);
    let cfg = StitchingConfig::builder()
        .blend_mode(BlendMode::Feather)
        .feather_width(4)
        .build()
        .unwrap();
    let image = compose_canvas(&tiles, &layout, &cfg).unwrap();
    let row = 64;
    // The seam sits mid-overlap at column 80; the band is a few pixels wide.
    assert_abs_diff_eq!(image.data[[row, 68, 0]], 0.2, epsilon = 1e-6);
    assert_abs_diff_eq!(image.data[[row, 92, 0]], 0.8, epsilon = 1e-6);
}

// ---------------------------------------------------------------------------
// Uncovered regions
// ---------------------------------------------------------------------------

fn with_empty_bottom(fill: MissingFill) -> TileImage {
    let (tiles, layout) = two_flat_tiles(0.4, 0.6);
    let shifts = [(Quadrant::NW, (0.0, 0.0)), (Quadrant::NE, (64.0, 0.0))].into();
    let dims = tiles.iter().map(|(q, t)| (*q, t.dimensions())).collect();
    let tall = CanvasLayout::with_saved(&shifts, &dims, Some(layout.origin_offset), Some((160, 256)));
    compose_canvas(&tiles, &tall, &config(BlendMode::Linear, fill)).unwrap()
}

#[test]
fn test_black_and_white_fill() {
    let black = with_empty_bottom(MissingFill::Black);
    assert_eq!(black.data[[200, 10, 0]], 0.0);
    let white = with_empty_bottom(MissingFill::White);
    assert_eq!(white.data[[200, 10, 0]], 1.0);
    assert_abs_diff_eq!(white.data[[10, 10, 0]], 0.4, epsilon = 1e-6);
}

#[test]
fn test_interpolate_fill_uses_adjacent_tiles() {
    let image = with_empty_bottom(MissingFill::Interpolate);
    // SW takes NW's bottom strip, SE takes NE's.
    assert_abs_diff_eq!(image.data[[200, 10, 0]], 0.4, epsilon = 1e-6);
    assert_abs_diff_eq!(image.data[[200, 150, 0]], 0.6, epsilon = 1e-6);
}

#[test]
fn test_gray_and_rgb_tiles_unify_to_rgb() {
    let tiles: BTreeMap<Quadrant, TileImage> = [
        (Quadrant::NW, TileImage::filled((32, 32), 1, 0.5)),
        (Quadrant::NE, TileImage::filled((32, 32), 3, 0.5)),
    ]
    .into();
    let shifts = [(Quadrant::NW, (0.0, 0.0)), (Quadrant::NE, (24.0, 0.0))].into();
    let dims = tiles.iter().map(|(q, t)| (*q, t.dimensions())).collect();
    let layout = CanvasLayout::from_shifts(&shifts, &dims);
    let image = compose_canvas(&tiles, &layout, &config(BlendMode::Linear, MissingFill::Black)).unwrap();
    assert_eq!(image.channels(), 3);
    assert!(image.data.iter().all(|&v| (v - 0.5).abs() < 1e-6));
}
