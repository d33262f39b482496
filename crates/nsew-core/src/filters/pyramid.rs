//! Gaussian pyramid primitives shared by the DoG detector and multiband blending.

use ndarray::Array2;

use crate::consts::PYRAMID_BLUR_SIGMA;

use super::gaussian_blur::gaussian_blur_array;

/// Downsample by 2x, taking every other pixel.
pub fn downsample_2x(data: &Array2<f32>) -> Array2<f32> {
    let (h, w) = data.dim();
    let new_h = h.div_ceil(2);
    let new_w = w.div_ceil(2);
    Array2::from_shape_fn((new_h, new_w), |(r, c)| data[[r * 2, c * 2]])
}

/// Blur, then downsample by 2x.
pub fn reduce(data: &Array2<f32>) -> Array2<f32> {
    downsample_2x(&gaussian_blur_array(data, PYRAMID_BLUR_SIGMA))
}

/// Bilinear upsample to `(height, width)`, then blur.
///
/// Inverse of [`reduce`] up to smoothing; constant images stay constant.
pub fn expand(data: &Array2<f32>, dims: (usize, usize)) -> Array2<f32> {
    let (h, w) = data.dim();
    let (out_h, out_w) = dims;
    let up = Array2::from_shape_fn((out_h, out_w), |(r, c)| {
        let y = (r as f32 / 2.0).min((h - 1) as f32);
        let x = (c as f32 / 2.0).min((w - 1) as f32);
        let y0 = y.floor() as usize;
        let x0 = x.floor() as usize;
        let y1 = (y0 + 1).min(h - 1);
        let x1 = (x0 + 1).min(w - 1);
        let fy = y - y0 as f32;
        let fx = x - x0 as f32;
        data[[y0, x0]] * (1.0 - fx) * (1.0 - fy)
            + data[[y0, x1]] * fx * (1.0 - fy)
            + data[[y1, x0]] * (1.0 - fx) * fy
            + data[[y1, x1]] * fx * fy
    });
    gaussian_blur_array(&up, PYRAMID_BLUR_SIGMA)
}

/// Gaussian pyramid with `levels + 1` entries, index 0 = input.
pub fn gaussian_pyramid(data: &Array2<f32>, levels: usize) -> Vec<Array2<f32>> {
    let mut pyramid = Vec::with_capacity(levels + 1);
    pyramid.push(data.clone());
    for k in 0..levels {
        let next = reduce(&pyramid[k]);
        pyramid.push(next);
    }
    pyramid
}

/// Laplacian pyramid: band-pass levels followed by the coarsest Gaussian level.
pub fn laplacian_pyramid(data: &Array2<f32>, levels: usize) -> Vec<Array2<f32>> {
    let gaussian = gaussian_pyramid(data, levels);
    let mut bands = Vec::with_capacity(levels + 1);
    for k in 0..levels {
        let up = expand(&gaussian[k + 1], gaussian[k].dim());
        bands.push(&gaussian[k] - &up);
    }
    bands.push(gaussian[levels].clone());
    bands
}

/// Rebuild an image from its Laplacian pyramid.
pub fn collapse(bands: &[Array2<f32>]) -> Array2<f32> {
    let mut current = bands[bands.len() - 1].clone();
    for band in bands[..bands.len() - 1].iter().rev() {
        current = expand(&current, band.dim()) + band;
    }
    current
}

/// Largest usable pyramid depth for an image of the given size.
pub fn max_levels(dims: (usize, usize), cap: usize) -> usize {
    let min_side = dims.0.min(dims.1).max(1);
    let mut levels = 0;
    let mut side = min_side;
    while levels < cap && side >= 16 {
        side = side.div_ceil(2);
        levels += 1;
    }
    levels
}
