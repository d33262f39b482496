//! Difference-of-Gaussian blobs with gradient-histogram descriptors.
//!
//! A single octave is enough here: neighbouring tiles come from the same
//! microscope at the same magnification, so there is no scale change to
//! recover. Descriptors are upright for the same reason.

use ndarray::Array2;

use crate::filters::gaussian_blur::gaussian_blur_array;

use super::{sample_clamped, Descriptors, FeatureDetector, Features, Keypoint};

const BASE_SIGMA: f32 = 1.6;
const SCALES_PER_OCTAVE: usize = 3;

/// Edge rejection ratio on the DoG Hessian (Lowe's r).
const EDGE_RATIO: f32 = 10.0;

const GRID: usize = 4;
const BINS: usize = 8;
const DESCRIPTOR_CLAMP: f32 = 0.2;

pub struct DogDetector {
    /// Minimum |DoG| relative to the image's value range.
    pub contrast_threshold: f32,
}

impl Default for DogDetector {
    fn default() -> Self {
        Self {
            contrast_threshold: 0.02,
        }
    }
}

impl FeatureDetector for DogDetector {
    fn name(&self) -> &'static str {
        "SIFT"
    }

    fn detect(&self, image: &Array2<f32>) -> Features {
        let k = 2f32.powf(1.0 / SCALES_PER_OCTAVE as f32);
        let sigmas: Vec<f32> = (0..SCALES_PER_OCTAVE + 2)
            .map(|i| BASE_SIGMA * k.powi(i as i32))
            .collect();
        let gaussians: Vec<Array2<f32>> =
            sigmas.iter().map(|&s| gaussian_blur_array(image, s)).collect();
        let dogs: Vec<Array2<f32>> = gaussians.windows(2).map(|w| &w[1] - &w[0]).collect();

        let (lo, hi) = image
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let threshold = self.contrast_threshold * (hi - lo).max(0.0);
        if threshold <= 0.0 {
            return empty();
        }

        // Response map over the interior DoG layers; the strongest layer wins.
        let (h, w) = image.dim();
        let mut response = Array2::<f32>::zeros((h, w));
        let mut layer_of = Array2::<u8>::zeros((h, w));
        for layer in 1..dogs.len() - 1 {
            for row in 1..h.saturating_sub(1) {
                for col in 1..w.saturating_sub(1) {
                    let v = dogs[layer][[row, col]];
                    if v.abs() <= threshold || v.abs() <= response[[row, col]] {
                        continue;
                    }
                    if is_scale_space_extremum(&dogs, layer, row, col) && !is_edge(&dogs[layer], row, col) {
                        response[[row, col]] = v.abs();
                        layer_of[[row, col]] = layer as u8;
                    }
                }
            }
        }

        let margin = (sigmas[sigmas.len() - 1] * 2.0).ceil() as usize;
        let keypoints = super::select_maxima(&response, 0.0, margin);
        let descriptors = keypoints
            .iter()
            .map(|kp| {
                let layer = layer_of[[kp.y as usize, kp.x as usize]] as usize;
                describe(&gaussians[layer], kp, sigmas[layer])
            })
            .collect();

        Features {
            keypoints,
            descriptors: Descriptors::Float(descriptors),
        }
    }
}

fn empty() -> Features {
    Features {
        keypoints: Vec::new(),
        descriptors: Descriptors::Float(Vec::new()),
    }
}

fn is_scale_space_extremum(dogs: &[Array2<f32>], layer: usize, row: usize, col: usize) -> bool {
    let v = dogs[layer][[row, col]];
    let mut is_max = true;
    let mut is_min = true;
    for dog in &dogs[layer - 1..=layer + 1] {
        for r in row - 1..=row + 1 {
            for c in col - 1..=col + 1 {
                if std::ptr::eq(dog, &dogs[layer]) && r == row && c == col {
                    continue;
                }
                let n = dog[[r, c]];
                is_max &= v > n;
                is_min &= v < n;
                if !is_max && !is_min {
                    return false;
                }
            }
        }
    }
    true
}

/// Principal curvature test: reject points lying on an edge.
fn is_edge(dog: &Array2<f32>, row: usize, col: usize) -> bool {
    let v = dog[[row, col]];
    let dxx = dog[[row, col + 1]] + dog[[row, col - 1]] - 2.0 * v;
    let dyy = dog[[row + 1, col]] + dog[[row - 1, col]] - 2.0 * v;
    let dxy = (dog[[row + 1, col + 1]] - dog[[row + 1, col - 1]] - dog[[row - 1, col + 1]]
        + dog[[row - 1, col - 1]])
        / 4.0;
    let trace = dxx + dyy;
    let det = dxx * dyy - dxy * dxy;
    if det <= 0.0 {
        return true;
    }
    trace * trace / det >= (EDGE_RATIO + 1.0).powi(2) / EDGE_RATIO
}

/// 4x4 cells of 8-bin gradient orientation histograms, Gaussian-weighted.
fn describe(image: &Array2<f32>, kp: &Keypoint, sigma: f32) -> Vec<f32> {
    let cell = (sigma * 1.5).round().max(2.0) as isize;
    let half = cell * GRID as isize / 2;
    let weight_sigma = half as f32;
    let cx = kp.x as isize;
    let cy = kp.y as isize;

    let mut hist = vec![0.0f32; GRID * GRID * BINS];
    for dy in -half..half {
        for dx in -half..half {
            let y = cy + dy;
            let x = cx + dx;
            let gx = sample_clamped(image, y, x + 1) - sample_clamped(image, y, x - 1);
            let gy = sample_clamped(image, y + 1, x) - sample_clamped(image, y - 1, x);
            let magnitude = (gx * gx + gy * gy).sqrt();
            if magnitude == 0.0 {
                continue;
            }
            let weight = (-((dx * dx + dy * dy) as f32) / (2.0 * weight_sigma * weight_sigma)).exp();
            let angle = gy.atan2(gx).rem_euclid(std::f32::consts::TAU);
            let bin = ((angle / std::f32::consts::TAU * BINS as f32) as usize).min(BINS - 1);
            let cell_row = ((dy + half) / cell) as usize;
            let cell_col = ((dx + half) / cell) as usize;
            hist[(cell_row * GRID + cell_col) * BINS + bin] += magnitude * weight;
        }
    }

    normalize(&mut hist);
    for v in &mut hist {
        *v = v.min(DESCRIPTOR_CLAMP);
    }
    normalize(&mut hist);
    hist
}

fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob_image() -> Array2<f32> {
        Array2::from_shape_fn((64, 64), |(r, c)| {
            let dy = r as f32 - 32.0;
            let dx = c as f32 - 30.0;
            (-(dx * dx + dy * dy) / 18.0).exp()
        })
    }

    #[test]
    fn test_detects_blob_centre() {
        let features = DogDetector::default().detect(&blob_image());
        assert!(!features.is_empty());
        let kp = features.keypoints[0];
        assert!((kp.x - 30.0).abs() <= 2.0 && (kp.y - 32.0).abs() <= 2.0, "{kp:?}");
    }

    #[test]
    fn test_descriptors_unit_length() {
        let features = DogDetector::default().detect(&blob_image());
        let Descriptors::Float(desc) = features.descriptors else {
            panic!("DoG descriptors are float");
        };
        for d in desc {
            let norm: f32 = d.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-3 || norm == 0.0);
        }
    }
}
