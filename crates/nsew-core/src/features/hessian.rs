//! Hessian-determinant extrema on a nonlinearly diffused image, described by
//! binary comparisons of grid-cell statistics (an M-LDB style descriptor).

use ndarray::Array2;

use crate::filters::gaussian_blur::gaussian_blur_array;

use super::{sample_clamped, select_maxima, Descriptors, FeatureDetector, Features, Keypoint};

const PRESMOOTH_SIGMA: f32 = 1.0;
const DIFFUSION_STEPS: usize = 4;
const DIFFUSION_TAU: f32 = 0.2;
/// Percentile of gradient magnitude used as the Perona-Malik contrast factor.
const CONTRAST_PERCENTILE: f32 = 0.7;
const DERIVATIVE_SIGMA: f32 = 1.5;
const PATCH_SIZE: isize = 24;
const GRID_LEVELS: [usize; 3] = [2, 3, 4];

pub struct HessianDetector {
    /// Minimum response relative to the strongest one.
    pub relative_threshold: f32,
}

impl Default for HessianDetector {
    fn default() -> Self {
        Self {
            relative_threshold: 0.01,
        }
    }
}

impl FeatureDetector for HessianDetector {
    fn name(&self) -> &'static str {
        "AKAZE"
    }

    fn detect(&self, image: &Array2<f32>) -> Features {
        let diffused = diffuse(&gaussian_blur_array(image, PRESMOOTH_SIGMA));
        let smoothed = gaussian_blur_array(&diffused, DERIVATIVE_SIGMA);
        let response = hessian_determinant(&smoothed);

        let peak = response.iter().copied().fold(0.0f32, f32::max);
        if peak <= 0.0 {
            return Features {
                keypoints: Vec::new(),
                descriptors: Descriptors::Binary(Vec::new()),
            };
        }
        let keypoints = select_maxima(&response, peak * self.relative_threshold, PATCH_SIZE as usize / 2);
        let descriptors = keypoints.iter().map(|kp| describe(&diffused, kp)).collect();

        Features {
            keypoints,
            descriptors: Descriptors::Binary(descriptors),
        }
    }
}

/// Explicit Perona-Malik diffusion with conductance g = 1 / (1 + (|∇L|/k)²).
fn diffuse(image: &Array2<f32>) -> Array2<f32> {
    let k = contrast_factor(image);
    if k <= 0.0 {
        return image.clone();
    }
    let (h, w) = image.dim();
    let mut current = image.clone();
    for _ in 0..DIFFUSION_STEPS {
        let next = Array2::from_shape_fn((h, w), |(r, c)| {
            let (r, c) = (r as isize, c as isize);
            let v = sample_clamped(&current, r, c);
            let mut flux = 0.0;
            for (dr, dc) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
                let n = sample_clamped(&current, r + dr, c + dc);
                let grad = (n - v) / k;
                flux += (n - v) / (1.0 + grad * grad);
            }
            v + DIFFUSION_TAU * flux
        });
        current = next;
    }
    current
}

fn contrast_factor(image: &Array2<f32>) -> f32 {
    let (h, w) = image.dim();
    if h < 3 || w < 3 {
        return 0.0;
    }
    let mut magnitudes: Vec<f32> = Vec::with_capacity((h - 2) * (w - 2));
    for r in 1..h - 1 {
        for c in 1..w - 1 {
            let gx = (image[[r, c + 1]] - image[[r, c - 1]]) / 2.0;
            let gy = (image[[r + 1, c]] - image[[r - 1, c]]) / 2.0;
            let m = (gx * gx + gy * gy).sqrt();
            if m > 0.0 {
                magnitudes.push(m);
            }
        }
    }
    if magnitudes.is_empty() {
        return 0.0;
    }
    magnitudes.sort_by(f32::total_cmp);
    let idx = ((magnitudes.len() - 1) as f32 * CONTRAST_PERCENTILE) as usize;
    magnitudes[idx]
}

/// det(H) = Lxx·Lyy − Lxy², clamped at zero so saddles are ignored.
fn hessian_determinant(image: &Array2<f32>) -> Array2<f32> {
    let (h, w) = image.dim();
    Array2::from_shape_fn((h, w), |(r, c)| {
        let (r, c) = (r as isize, c as isize);
        let v = sample_clamped(image, r, c);
        let lxx = sample_clamped(image, r, c + 1) + sample_clamped(image, r, c - 1) - 2.0 * v;
        let lyy = sample_clamped(image, r + 1, c) + sample_clamped(image, r - 1, c) - 2.0 * v;
        let lxy = (sample_clamped(image, r + 1, c + 1) - sample_clamped(image, r + 1, c - 1)
            - sample_clamped(image, r - 1, c + 1)
            + sample_clamped(image, r - 1, c - 1))
            / 4.0;
        (lxx * lyy - lxy * lxy).max(0.0)
    })
}

/// Per-cell (mean intensity, mean dx, mean dy) compared pairwise within each
/// grid level: 2x2, 3x3 and 4x4 give 6 + 36 + 120 pairs, 486 bits in all.
fn describe(image: &Array2<f32>, kp: &Keypoint) -> Vec<u8> {
    let half = PATCH_SIZE / 2;
    let x0 = kp.x as isize - half;
    let y0 = kp.y as isize - half;

    let mut bits: Vec<bool> = Vec::with_capacity(486);
    for &n in &GRID_LEVELS {
        let cell = PATCH_SIZE as f32 / n as f32;
        let stats: Vec<[f32; 3]> = (0..n * n)
            .map(|i| {
                let cy0 = (i / n) as f32 * cell;
                let cx0 = (i % n) as f32 * cell;
                cell_stats(image, x0, y0, cx0, cy0, cell)
            })
            .collect();
        for a in 0..stats.len() {
            for b in a + 1..stats.len() {
                for k in 0..3 {
                    bits.push(stats[a][k] > stats[b][k]);
                }
            }
        }
    }

    let mut bytes = vec![0u8; bits.len().div_ceil(8)];
    for (i, bit) in bits.into_iter().enumerate() {
        if bit {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    bytes
}

fn cell_stats(image: &Array2<f32>, x0: isize, y0: isize, cx0: f32, cy0: f32, cell: f32) -> [f32; 3] {
    let r_start = cy0.round() as isize;
    let r_end = (cy0 + cell).round() as isize;
    let c_start = cx0.round() as isize;
    let c_end = (cx0 + cell).round() as isize;

    let mut sum = [0.0f32; 3];
    let mut count = 0.0f32;
    for r in r_start..r_end {
        for c in c_start..c_end {
            let (y, x) = (y0 + r, x0 + c);
            sum[0] += sample_clamped(image, y, x);
            sum[1] += sample_clamped(image, y, x + 1) - sample_clamped(image, y, x - 1);
            sum[2] += sample_clamped(image, y + 1, x) - sample_clamped(image, y - 1, x);
            count += 1.0;
        }
    }
    if count > 0.0 {
        for s in &mut sum {
            *s /= count;
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_length() {
        let image = Array2::from_shape_fn((64, 64), |(r, c)| ((r / 8 + c / 8) % 2) as f32);
        let features = HessianDetector::default().detect(&image);
        assert!(!features.is_empty());
        let Descriptors::Binary(desc) = features.descriptors else {
            panic!("AKAZE descriptors are binary");
        };
        assert!(desc.iter().all(|d| d.len() == 61));
    }

    #[test]
    fn test_flat_image_has_no_features() {
        let features = HessianDetector::default().detect(&Array2::from_elem((40, 40), 0.3));
        assert!(features.is_empty());
    }
}
