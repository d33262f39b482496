//! Canvas layout and tile compositing.

pub mod blend;
pub mod fill;
pub mod multiband;

use std::collections::BTreeMap;

use ndarray::{Array2, Array3};
use tracing::{debug, info};

use crate::consts::MAX_DISPLAY_DIMENSION;
use crate::error::{Result, StitchError};
use crate::pipeline::config::StitchingConfig;
use crate::quadrant::Quadrant;
use crate::tile::{Dimensions, SampleType, TileImage};

pub use blend::{blender_for, Blender, FeatherBlender, LinearBlender};
pub use fill::fill_uncovered;
pub use multiband::MultibandBlender;

/// A tile positioned on the canvas, top-left corner at (x, y).
#[derive(Clone, Copy, Debug)]
pub struct CanvasTile<'a> {
    pub quadrant: Quadrant,
    pub image: &'a TileImage,
    pub x: usize,
    pub y: usize,
}

impl CanvasTile<'_> {
    /// Tile-local (row, col) for canvas (row, col), if the tile covers it.
    pub fn local(&self, row: usize, col: usize) -> Option<(usize, usize)> {
        let r = row.checked_sub(self.y)?;
        let c = col.checked_sub(self.x)?;
        (r < self.image.height() && c < self.image.width()).then_some((r, c))
    }

    /// Distance from a tile-local pixel to the tile's nearest edge, >= 1 inside.
    pub fn edge_distance(&self, r: usize, c: usize) -> f32 {
        let (h, w) = (self.image.height(), self.image.width());
        (r + 1).min(h - r).min(c + 1).min(w - c) as f32
    }
}

/// Integer canvas geometry derived from tile shifts.
#[derive(Clone, Debug, PartialEq)]
pub struct CanvasLayout {
    pub width: usize,
    pub height: usize,
    /// Added to every shift to make it non-negative.
    pub origin_offset: (f64, f64),
    /// Rounded top-left corner of each tile.
    pub positions: BTreeMap<Quadrant, (usize, usize)>,
}

impl CanvasLayout {
    /// Bounding canvas of all tiles, with offset = -min(shift).
    pub fn from_shifts(shifts: &BTreeMap<Quadrant, (f64, f64)>, dims: &BTreeMap<Quadrant, Dimensions>) -> Self {
        Self::with_saved(shifts, dims, None, None)
    }

    /// Layout honouring a previously recorded offset and canvas size; each
    /// is recomputed from the shifts when absent.
    pub fn with_saved(
        shifts: &BTreeMap<Quadrant, (f64, f64)>,
        dims: &BTreeMap<Quadrant, Dimensions>,
        origin_offset: Option<(f64, f64)>,
        final_dimensions: Option<Dimensions>,
    ) -> Self {
        let origin_offset = origin_offset.unwrap_or_else(|| {
            let min_x = shifts.values().map(|s| s.0).fold(f64::INFINITY, f64::min);
            let min_y = shifts.values().map(|s| s.1).fold(f64::INFINITY, f64::min);
            if shifts.is_empty() {
                (0.0, 0.0)
            } else {
                (-min_x, -min_y)
            }
        });

        let positions: BTreeMap<Quadrant, (usize, usize)> = shifts
            .iter()
            .map(|(&q, &(dx, dy))| {
                let x = (dx + origin_offset.0).round().max(0.0) as usize;
                let y = (dy + origin_offset.1).round().max(0.0) as usize;
                (q, (x, y))
            })
            .collect();

        let (width, height) = match final_dimensions {
            Some((w, h)) => (w as usize, h as usize),
            None => positions.iter().fold((0, 0), |(w, h), (q, &(x, y))| {
                let (tw, th) = dims.get(q).copied().unwrap_or((0, 0));
                (w.max(x + tw as usize), h.max(y + th as usize))
            }),
        };

        Self {
            width,
            height,
            origin_offset,
            positions,
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        (self.width as u32, self.height as u32)
    }
}

/// Blend the tiles onto the canvas described by `layout` and fill the
/// uncovered pixels.
///
/// Tiles missing from the layout are skipped. Channel counts are unified to
/// the widest tile.
pub fn compose_canvas(
    tiles: &BTreeMap<Quadrant, TileImage>,
    layout: &CanvasLayout,
    config: &StitchingConfig,
) -> Result<TileImage> {
    if layout.width == 0 || layout.height == 0 {
        return Err(StitchError::NoTiles);
    }
    let channels = tiles.values().map(TileImage::channels).max().ok_or(StitchError::NoTiles)?;

    let unified: Vec<(Quadrant, TileImage, (usize, usize))> = tiles
        .iter()
        .filter_map(|(q, t)| layout.positions.get(q).map(|&pos| (*q, t.with_channels(channels), pos)))
        .collect();
    let placed: Vec<CanvasTile<'_>> = unified
        .iter()
        .map(|(q, image, (x, y))| CanvasTile {
            quadrant: *q,
            image,
            x: *x,
            y: *y,
        })
        .collect();

    let blender = blender_for(config.blend_mode(), config.feather_width());
    info!(
        blend = blender.name(),
        width = layout.width,
        height = layout.height,
        tiles = placed.len(),
        "Compositing canvas"
    );

    let mut data = blender.blend(&placed, layout.height, layout.width, channels);
    let coverage = coverage_mask(&placed, layout.height, layout.width);
    let uncovered = coverage.iter().filter(|&&c| !c).count();
    if uncovered > 0 {
        debug!(pixels = uncovered, fill = %config.missing_quadrant_fill(), "Filling uncovered canvas");
        fill_uncovered(&mut data, &coverage, config.missing_quadrant_fill(), &placed);
    }

    let sample_type = widest_sample_type(tiles.values().map(|t| t.sample_type));
    Ok(TileImage::new(data, sample_type))
}

/// True where at least one tile covers the canvas pixel.
pub fn coverage_mask(tiles: &[CanvasTile<'_>], height: usize, width: usize) -> Array2<bool> {
    let mut mask = Array2::from_elem((height, width), false);
    for tile in tiles {
        let r_end = (tile.y + tile.image.height()).min(height);
        let c_end = (tile.x + tile.image.width()).min(width);
        for r in tile.y.min(r_end)..r_end {
            for c in tile.x.min(c_end)..c_end {
                mask[[r, c]] = true;
            }
        }
    }
    mask
}

/// Box-averaged copy for display when the canvas exceeds
/// [`MAX_DISPLAY_DIMENSION`] on either axis.
pub fn display_copy(image: &TileImage) -> Option<TileImage> {
    let (h, w, c) = image.data.dim();
    let longest = h.max(w);
    if longest <= MAX_DISPLAY_DIMENSION {
        return None;
    }
    let factor = longest.div_ceil(MAX_DISPLAY_DIMENSION);
    let (out_h, out_w) = (h.div_ceil(factor), w.div_ceil(factor));
    let data = Array3::from_shape_fn((out_h, out_w, c), |(r, col, ch)| {
        let r_end = ((r + 1) * factor).min(h);
        let c_end = ((col + 1) * factor).min(w);
        let mut sum = 0.0f32;
        let mut count = 0usize;
        for y in r * factor..r_end {
            for x in col * factor..c_end {
                sum += image.data[[y, x, ch]];
                count += 1;
            }
        }
        sum / count.max(1) as f32
    });
    Some(TileImage::new(data, image.sample_type))
}

fn widest_sample_type(types: impl Iterator<Item = SampleType>) -> SampleType {
    types.fold(SampleType::U8, |acc, t| match (acc, t) {
        (SampleType::F32, _) | (_, SampleType::F32) => SampleType::F32,
        (SampleType::U16, _) | (_, SampleType::U16) => SampleType::U16,
        _ => SampleType::U8,
    })
}
