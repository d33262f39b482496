//! Laplacian-pyramid (multiband) blending.
//!
//! Each tile is edge-extended to the full canvas and split into frequency
//! bands. Every band is blended with a Gaussian-smoothed copy of the tile's
//! seam mask at the matching scale, so low frequencies mix over a wide area
//! and fine detail switches sharply at the seam.

use ndarray::{Array2, Array3, Axis};
use rayon::prelude::*;

use crate::consts::EPSILON;
use crate::filters::pyramid::{collapse, gaussian_pyramid, laplacian_pyramid, max_levels};

use super::blend::Blender;
use super::CanvasTile;

pub struct MultibandBlender {
    pub max_levels: usize,
}

impl Blender for MultibandBlender {
    fn name(&self) -> &'static str {
        "multiband"
    }

    fn blend(&self, tiles: &[CanvasTile<'_>], height: usize, width: usize, channels: usize) -> Array3<f32> {
        let mut out = Array3::<f32>::zeros((height, width, channels));
        if tiles.is_empty() || height == 0 || width == 0 {
            return out;
        }

        let levels = max_levels((height, width), self.max_levels);
        let masks = seam_masks(tiles, height, width);
        let mask_pyramids: Vec<Vec<Array2<f32>>> =
            masks.iter().map(|m| gaussian_pyramid(m, levels)).collect();

        let planes: Vec<Array2<f32>> = (0..channels)
            .into_par_iter()
            .map(|ch| blend_channel(tiles, &mask_pyramids, ch, height, width, levels))
            .collect();

        for (ch, plane) in planes.into_iter().enumerate() {
            out.index_axis_mut(Axis(2), ch).assign(&plane);
        }

        // Only covered pixels carry blended values.
        for (i, mask) in coverage(&masks).indexed_iter() {
            if !*mask {
                for ch in 0..channels {
                    out[[i.0, i.1, ch]] = 0.0;
                }
            }
        }
        out
    }
}

/// One mask per tile: 1 where that tile is farthest from its own edge
/// (ties to the earlier tile), 0 elsewhere.
fn seam_masks(tiles: &[CanvasTile<'_>], height: usize, width: usize) -> Vec<Array2<f32>> {
    let mut masks = vec![Array2::<f32>::zeros((height, width)); tiles.len()];
    for row in 0..height {
        for col in 0..width {
            let mut best: Option<(usize, f32)> = None;
            for (i, tile) in tiles.iter().enumerate() {
                if let Some((r, c)) = tile.local(row, col) {
                    let d = tile.edge_distance(r, c);
                    if best.map_or(true, |(_, bd)| d > bd) {
                        best = Some((i, d));
                    }
                }
            }
            if let Some((i, _)) = best {
                masks[i][[row, col]] = 1.0;
            }
        }
    }
    masks
}

fn coverage(masks: &[Array2<f32>]) -> Array2<bool> {
    let (h, w) = masks[0].dim();
    Array2::from_shape_fn((h, w), |(r, c)| masks.iter().any(|m| m[[r, c]] > 0.0))
}

/// Tile channel extended to the canvas by clamping to its nearest pixel.
fn extended_plane(tile: &CanvasTile<'_>, ch: usize, height: usize, width: usize) -> Array2<f32> {
    let (th, tw) = (tile.image.height() as isize, tile.image.width() as isize);
    Array2::from_shape_fn((height, width), |(row, col)| {
        let r = (row as isize - tile.y as isize).clamp(0, th - 1) as usize;
        let c = (col as isize - tile.x as isize).clamp(0, tw - 1) as usize;
        tile.image.data[[r, c, ch]]
    })
}

fn blend_channel(
    tiles: &[CanvasTile<'_>],
    mask_pyramids: &[Vec<Array2<f32>>],
    ch: usize,
    height: usize,
    width: usize,
    levels: usize,
) -> Array2<f32> {
    let mut weighted: Vec<Array2<f32>> = mask_pyramids[0].iter().map(|g| Array2::zeros(g.dim())).collect();
    let mut weights = weighted.clone();
    let mut plain = weighted.clone();

    for (tile, mask_pyramid) in tiles.iter().zip(mask_pyramids) {
        let bands = laplacian_pyramid(&extended_plane(tile, ch, height, width), levels);
        for (k, (band, g)) in bands.iter().zip(mask_pyramid).enumerate() {
            weighted[k] += &(band * g);
            weights[k] += g;
            plain[k] += band;
        }
    }

    let n = tiles.len() as f32;
    let blended: Vec<Array2<f32>> = weighted
        .into_iter()
        .zip(weights)
        .zip(plain)
        .map(|((mut num, den), plain)| {
            ndarray::Zip::from(&mut num)
                .and(&den)
                .and(&plain)
                .for_each(|v, &d, &p| {
                    // Far from every seam mask: fall back to the plain mean.
                    *v = if d > EPSILON { *v / d } else { p / n };
                });
            num
        })
        .collect();

    collapse(&blended).mapv_into(|v| v.clamp(0.0, 1.0))
}
