use ndarray::{Array3, ArrayViewMut2, Axis};
use rayon::prelude::*;

use crate::consts::{MULTIBAND_MAX_LEVELS, PARALLEL_PIXEL_THRESHOLD};
use crate::pipeline::config::BlendMode;

use super::multiband::MultibandBlender;
use super::CanvasTile;

/// Strategy for combining overlapping tiles.
pub trait Blender: Send + Sync {
    fn name(&self) -> &'static str;

    /// Blend `tiles` onto an (height, width, channels) canvas. Uncovered
    /// pixels are left at 0. All tiles must have `channels` channels.
    fn blend(&self, tiles: &[CanvasTile<'_>], height: usize, width: usize, channels: usize) -> Array3<f32>;
}

pub fn blender_for(mode: BlendMode, feather_width: u32) -> Box<dyn Blender> {
    match mode {
        BlendMode::Linear => Box::new(LinearBlender),
        BlendMode::Feather => Box::new(FeatherBlender {
            width: feather_width.max(1) as f32,
        }),
        BlendMode::Multiband => Box::new(MultibandBlender {
            max_levels: MULTIBAND_MAX_LEVELS,
        }),
    }
}

/// Weights proportional to each tile's distance to its own edge.
pub struct LinearBlender;

impl Blender for LinearBlender {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn blend(&self, tiles: &[CanvasTile<'_>], height: usize, width: usize, channels: usize) -> Array3<f32> {
        weighted_blend(tiles, height, width, channels, |d, _| d)
    }
}

/// Only tiles within `width` pixels of the best edge distance contribute,
/// ramped linearly, which keeps the transition to a narrow band.
pub struct FeatherBlender {
    pub width: f32,
}

impl Blender for FeatherBlender {
    fn name(&self) -> &'static str {
        "feather"
    }

    fn blend(&self, tiles: &[CanvasTile<'_>], height: usize, width: usize, channels: usize) -> Array3<f32> {
        let band = self.width;
        weighted_blend(tiles, height, width, channels, move |d, d_max| (band - (d_max - d)).max(0.0))
    }
}

/// Normalized per-pixel weighted average. `weight(d, d_max)` receives the
/// tile's edge distance and the largest edge distance of any tile at that pixel.
pub(crate) fn weighted_blend<F>(
    tiles: &[CanvasTile<'_>],
    height: usize,
    width: usize,
    channels: usize,
    weight: F,
) -> Array3<f32>
where
    F: Fn(f32, f32) -> f32 + Sync,
{
    let mut out = Array3::<f32>::zeros((height, width, channels));

    let blend_row = |row: usize, mut out_row: ArrayViewMut2<'_, f32>| {
        let mut distances: Vec<Option<(usize, usize, f32)>> = vec![None; tiles.len()];
        for col in 0..width {
            let mut d_max = 0.0f32;
            for (i, tile) in tiles.iter().enumerate() {
                distances[i] = tile.local(row, col).map(|(r, c)| {
                    let d = tile.edge_distance(r, c);
                    d_max = d_max.max(d);
                    (r, c, d)
                });
            }
            if d_max == 0.0 {
                continue;
            }

            let mut total = 0.0f32;
            for (tile, entry) in tiles.iter().zip(&distances) {
                let Some((r, c, d)) = *entry else { continue };
                let w = weight(d, d_max);
                if w <= 0.0 {
                    continue;
                }
                total += w;
                for ch in 0..channels {
                    out_row[[col, ch]] += w * tile.image.data[[r, c, ch]];
                }
            }
            if total > 0.0 {
                for ch in 0..channels {
                    out_row[[col, ch]] /= total;
                }
            }
        }
    };

    if height * width >= PARALLEL_PIXEL_THRESHOLD {
        out.axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(row, out_row)| blend_row(row, out_row));
    } else {
        for (row, out_row) in out.axis_iter_mut(Axis(0)).enumerate() {
            blend_row(row, out_row);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quadrant::Quadrant;
    use crate::tile::TileImage;

    fn pair<'a>(a: &'a TileImage, b: &'a TileImage, bx: usize) -> Vec<CanvasTile<'a>> {
        vec![
            CanvasTile {
                quadrant: Quadrant::NW,
                image: a,
                x: 0,
                y: 0,
            },
            CanvasTile {
                quadrant: Quadrant::NE,
                image: b,
                x: bx,
                y: 0,
            },
        ]
    }

    #[test]
    fn test_linear_blend_interpolates_overlap() {
        let a = TileImage::filled((40, 10), 1, 0.0);
        let b = TileImage::filled((40, 10), 1, 1.0);
        let tiles = pair(&a, &b, 20);
        let out = LinearBlender.blend(&tiles, 10, 60, 1);
        assert_eq!(out[[5, 0, 0]], 0.0);
        assert_eq!(out[[5, 59, 0]], 1.0);
        let mid = out[[5, 30, 0]];
        assert!(mid > 0.3 && mid < 0.7, "mid = {mid}");
    }

    #[test]
    fn test_feather_band_is_narrower_than_linear() {
        let a = TileImage::filled((80, 20), 1, 0.0);
        let b = TileImage::filled((80, 20), 1, 1.0);
        let tiles = pair(&a, &b, 40);
        let linear = LinearBlender.blend(&tiles, 20, 120, 1);
        let feather = FeatherBlender { width: 4.0 }.blend(&tiles, 20, 120, 1);
        let mixed = |img: &Array3<f32>| {
            (0..120)
                .filter(|&c| {
                    let v = img[[10, c, 0]];
                    v > 0.01 && v < 0.99
                })
                .count()
        };
        assert!(mixed(&feather) < mixed(&linear));
        assert!(mixed(&feather) > 0);
    }

    #[test]
    fn test_uncovered_left_zero() {
        let a = TileImage::filled((4, 4), 1, 0.7);
        let tiles = vec![CanvasTile {
            quadrant: Quadrant::NW,
            image: &a,
            x: 0,
            y: 0,
        }];
        let out = LinearBlender.blend(&tiles, 6, 6, 1);
        assert_eq!(out[[5, 5, 0]], 0.0);
        assert!((out[[1, 1, 0]] - 0.7).abs() < 1e-6);
    }
}
