use image::{ImageBuffer, Luma};
use ndarray::{Array3, Axis};
use tracing::info;

use crate::error::{Result, StitchError};
use crate::pipeline::config::{Interpolation, ResizeStrategy};
use crate::quadrant::Quadrant;
use crate::tile::{Dimensions, TileImage};

/// Record of one tile resampled before alignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResizeNote {
    pub quadrant: Quadrant,
    pub from: Dimensions,
    pub to: Dimensions,
}

/// Per-axis target size for a set of tile dimensions.
pub fn target_dimensions(dims: &[Dimensions], strategy: ResizeStrategy) -> Option<Dimensions> {
    if dims.is_empty() {
        return None;
    }
    let widths = dims.iter().map(|d| d.0);
    let heights = dims.iter().map(|d| d.1);
    let target = match strategy {
        ResizeStrategy::Largest => (widths.max()?, heights.max()?),
        ResizeStrategy::Smallest => (widths.min()?, heights.min()?),
        ResizeStrategy::Average => {
            let n = dims.len() as f64;
            let w = widths.map(f64::from).sum::<f64>() / n;
            let h = heights.map(f64::from).sum::<f64>() / n;
            (w.round() as u32, h.round() as u32)
        }
    };
    Some(target)
}

/// Bring every tile to a common size. Tiles already at the target are
/// passed through untouched.
pub fn harmonize_dimensions(
    tiles: Vec<(Quadrant, TileImage)>,
    strategy: ResizeStrategy,
    interpolation: Interpolation,
) -> Result<(Vec<(Quadrant, TileImage)>, Vec<ResizeNote>)> {
    let dims: Vec<Dimensions> = tiles.iter().map(|(_, t)| t.dimensions()).collect();
    let Some(target) = target_dimensions(&dims, strategy) else {
        return Ok((tiles, Vec::new()));
    };

    let mut notes = Vec::new();
    let mut out = Vec::with_capacity(tiles.len());
    for (quadrant, tile) in tiles {
        let from = tile.dimensions();
        if from == target {
            out.push((quadrant, tile));
            continue;
        }
        info!(
            quadrant = %quadrant,
            from_width = from.0,
            from_height = from.1,
            to_width = target.0,
            to_height = target.1,
            filter = %interpolation,
            "Resizing tile"
        );
        out.push((quadrant, resize_tile(&tile, target, interpolation)?));
        notes.push(ResizeNote {
            quadrant,
            from,
            to: target,
        });
    }
    Ok((out, notes))
}

/// Resample each channel plane with `image::imageops::resize`.
pub fn resize_tile(tile: &TileImage, target: Dimensions, interpolation: Interpolation) -> Result<TileImage> {
    let (tw, th) = target;
    if tw == 0 || th == 0 {
        return Err(StitchError::InvalidConfig(format!(
            "cannot resize to {tw}x{th}"
        )));
    }
    if tile.dimensions() == target {
        return Ok(tile.clone());
    }

    let (h, w, c) = tile.data.dim();
    let mut data = Array3::<f32>::zeros((th as usize, tw as usize, c));
    for ch in 0..c {
        let plane: Vec<f32> = tile.data.index_axis(Axis(2), ch).iter().copied().collect();
        let buffer = ImageBuffer::<Luma<f32>, Vec<f32>>::from_raw(w as u32, h as u32, plane)
            .ok_or_else(|| StitchError::InvalidConfig(format!("tile buffer does not match {w}x{h}")))?;
        let resized = image::imageops::resize(&buffer, tw, th, interpolation.filter_type());
        for (x, y, pixel) in resized.enumerate_pixels() {
            data[[y as usize, x as usize, ch]] = pixel.0[0].clamp(0.0, 1.0);
        }
    }
    Ok(TileImage::new(data, tile.sample_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_dimensions() {
        let dims = [(100, 80), (120, 60), (110, 70)];
        assert_eq!(target_dimensions(&dims, ResizeStrategy::Largest), Some((120, 80)));
        assert_eq!(target_dimensions(&dims, ResizeStrategy::Smallest), Some((100, 60)));
        assert_eq!(target_dimensions(&dims, ResizeStrategy::Average), Some((110, 70)));
        assert_eq!(target_dimensions(&[], ResizeStrategy::Largest), None);
    }

    #[test]
    fn test_resize_constant_tile() {
        let tile = TileImage::filled((10, 8), 3, 0.5);
        let resized = resize_tile(&tile, (20, 16), Interpolation::Lanczos).unwrap();
        assert_eq!(resized.dimensions(), (20, 16));
        assert_eq!(resized.channels(), 3);
        assert!(resized.data.iter().all(|&v| (v - 0.5).abs() < 1e-3));
    }

    #[test]
    fn test_harmonize_notes_only_changed_tiles() {
        let tiles = vec![
            (Quadrant::NW, TileImage::filled((40, 30), 1, 0.1)),
            (Quadrant::NE, TileImage::filled((36, 30), 1, 0.2)),
        ];
        let (out, notes) =
            harmonize_dimensions(tiles, ResizeStrategy::Largest, Interpolation::Linear).unwrap();
        assert!(out.iter().all(|(_, t)| t.dimensions() == (40, 30)));
        assert_eq!(
            notes,
            vec![ResizeNote {
                quadrant: Quadrant::NE,
                from: (36, 30),
                to: (40, 30)
            }]
        );
    }
}
