//! FAST corners with steered BRIEF descriptors.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::filters::gaussian_blur::gaussian_blur_array;

use super::{sample_clamped, select_maxima, Descriptors, FeatureDetector, Features, Keypoint};

/// Bresenham circle of radius 3, clockwise from 12 o'clock.
const CIRCLE: [(isize, isize); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

/// Contiguous circle pixels required for a FAST-9 corner.
const ARC_LENGTH: usize = 9;

const DESCRIPTOR_BITS: usize = 256;
const PATCH_RADIUS: isize = 12;
const ORIENTATION_RADIUS: isize = 7;
const SMOOTHING_SIGMA: f32 = 1.2;

/// Lower bound on the FAST threshold for nearly flat images.
const MIN_FAST_THRESHOLD: f32 = 0.01;

pub struct OrbDetector {
    /// Sampling pairs (x1, y1, x2, y2) relative to the keypoint.
    pattern: Vec<[f32; 4]>,
}

impl OrbDetector {
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let r = PATCH_RADIUS as f32;
        let pattern = (0..DESCRIPTOR_BITS)
            .map(|_| {
                [
                    rng.random_range(-r..=r),
                    rng.random_range(-r..=r),
                    rng.random_range(-r..=r),
                    rng.random_range(-r..=r),
                ]
            })
            .collect();
        Self { pattern }
    }

    fn describe(&self, smoothed: &Array2<f32>, kp: &Keypoint) -> Vec<u8> {
        let (sin, cos) = kp.angle.sin_cos();
        let mut bytes = vec![0u8; DESCRIPTOR_BITS / 8];
        for (i, &[x1, y1, x2, y2]) in self.pattern.iter().enumerate() {
            let a = steered_sample(smoothed, kp, x1, y1, sin, cos);
            let b = steered_sample(smoothed, kp, x2, y2, sin, cos);
            if a < b {
                bytes[i / 8] |= 1 << (i % 8);
            }
        }
        bytes
    }
}

impl FeatureDetector for OrbDetector {
    fn name(&self) -> &'static str {
        "ORB"
    }

    fn detect(&self, image: &Array2<f32>) -> Features {
        let smoothed = gaussian_blur_array(image, SMOOTHING_SIGMA);
        let threshold = fast_threshold(&smoothed);
        let scores = fast_scores(&smoothed, threshold);

        let mut keypoints = select_maxima(&scores, 0.0, PATCH_RADIUS as usize / 2);
        for kp in &mut keypoints {
            kp.angle = intensity_centroid_angle(&smoothed, kp);
        }
        let descriptors = keypoints.iter().map(|kp| self.describe(&smoothed, kp)).collect();

        Features {
            keypoints,
            descriptors: Descriptors::Binary(descriptors),
        }
    }
}

/// Threshold proportional to the image's contrast.
fn fast_threshold(image: &Array2<f32>) -> f32 {
    let n = image.len().max(1) as f32;
    let mean = image.sum() / n;
    let var = image.iter().map(|&v| (v - mean) * (v - mean)).sum::<f32>() / n;
    (var.sqrt() * 0.25).max(MIN_FAST_THRESHOLD)
}

/// FAST-9 score map: sum of absolute differences past the threshold, or 0
/// where the segment test fails.
fn fast_scores(image: &Array2<f32>, threshold: f32) -> Array2<f32> {
    let (h, w) = image.dim();
    let mut scores = Array2::<f32>::zeros((h, w));
    if h < 7 || w < 7 {
        return scores;
    }

    let score_row = |row: usize, out: &mut [f32]| {
        for col in 3..w - 3 {
            out[col] = corner_score(image, row, col, threshold);
        }
    };

    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        scores
            .axis_iter_mut(ndarray::Axis(0))
            .into_par_iter()
            .enumerate()
            .filter(|(row, _)| *row >= 3 && *row < h - 3)
            .for_each(|(row, mut out)| {
                if let Some(slice) = out.as_slice_mut() {
                    score_row(row, slice);
                }
            });
    } else {
        for row in 3..h - 3 {
            let mut out = scores.row_mut(row);
            if let Some(slice) = out.as_slice_mut() {
                score_row(row, slice);
            }
        }
    }
    scores
}

fn corner_score(image: &Array2<f32>, row: usize, col: usize, threshold: f32) -> f32 {
    let p = image[[row, col]];
    let mut state = [0i8; 16];
    for (i, &(dx, dy)) in CIRCLE.iter().enumerate() {
        let v = image[[(row as isize + dy) as usize, (col as isize + dx) as usize]];
        state[i] = if v > p + threshold {
            1
        } else if v < p - threshold {
            -1
        } else {
            0
        };
    }

    let has_arc = |sign: i8| {
        let mut run = 0;
        // Walk the circle twice to catch arcs wrapping past index 0.
        for i in 0..32 {
            if state[i % 16] == sign {
                run += 1;
                if run >= ARC_LENGTH {
                    return true;
                }
            } else {
                run = 0;
            }
        }
        false
    };

    if !has_arc(1) && !has_arc(-1) {
        return 0.0;
    }

    CIRCLE
        .iter()
        .map(|&(dx, dy)| {
            let v = image[[(row as isize + dy) as usize, (col as isize + dx) as usize]];
            ((v - p).abs() - threshold).max(0.0)
        })
        .sum()
}

/// Orientation from the intensity centroid of a disc around the keypoint.
fn intensity_centroid_angle(image: &Array2<f32>, kp: &Keypoint) -> f32 {
    let cx = kp.x as isize;
    let cy = kp.y as isize;
    let mut m01 = 0.0f32;
    let mut m10 = 0.0f32;
    for dy in -ORIENTATION_RADIUS..=ORIENTATION_RADIUS {
        for dx in -ORIENTATION_RADIUS..=ORIENTATION_RADIUS {
            if dx * dx + dy * dy > ORIENTATION_RADIUS * ORIENTATION_RADIUS {
                continue;
            }
            let v = sample_clamped(image, cy + dy, cx + dx);
            m10 += dx as f32 * v;
            m01 += dy as f32 * v;
        }
    }
    m01.atan2(m10)
}

fn steered_sample(image: &Array2<f32>, kp: &Keypoint, x: f32, y: f32, sin: f32, cos: f32) -> f32 {
    let rx = x * cos - y * sin;
    let ry = x * sin + y * cos;
    sample_clamped(
        image,
        (kp.y as f32 + ry).round() as isize,
        (kp.x as f32 + rx).round() as isize,
    )
}
