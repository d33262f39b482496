//! Keypoint detection and description.
//!
//! Each alignment method is a [`FeatureDetector`]. They share one contract:
//! a grayscale `[0, 1]` image goes in, keypoints with descriptors come out.
//! Detectors are deterministic for a given seed.

pub mod dog;
pub mod hessian;
pub mod matcher;
pub mod orb;

use ndarray::Array2;

use crate::consts::MAX_KEYPOINTS;
use crate::pipeline::config::AlignmentMethod;

pub use matcher::{match_features, FeatureMatch};

/// A detected interest point in image coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    pub response: f32,
    /// Orientation in radians (0 for upright detectors).
    pub angle: f32,
}

impl Keypoint {
    pub fn new(x: f64, y: f64, response: f32) -> Self {
        Self {
            x,
            y,
            response,
            angle: 0.0,
        }
    }
}

/// Descriptor set, one row per keypoint.
#[derive(Clone, Debug)]
pub enum Descriptors {
    /// Bit strings compared by Hamming distance.
    Binary(Vec<Vec<u8>>),
    /// Real vectors compared by Euclidean distance.
    Float(Vec<Vec<f32>>),
}

impl Descriptors {
    pub fn len(&self) -> usize {
        match self {
            Self::Binary(d) => d.len(),
            Self::Float(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keypoints with their descriptors.
#[derive(Clone, Debug)]
pub struct Features {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Descriptors,
}

impl Features {
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// Move every keypoint by (dx, dy), e.g. from crop to tile coordinates.
    pub fn translate(mut self, dx: f64, dy: f64) -> Self {
        for kp in &mut self.keypoints {
            kp.x += dx;
            kp.y += dy;
        }
        self
    }
}

/// Strategy interface for keypoint detection + description.
pub trait FeatureDetector: Send + Sync {
    fn name(&self) -> &'static str;

    fn detect(&self, image: &Array2<f32>) -> Features;
}

/// Build the detector for a configured alignment method.
pub fn detector_for(method: AlignmentMethod, seed: u64) -> Box<dyn FeatureDetector> {
    match method {
        AlignmentMethod::Orb => Box::new(orb::OrbDetector::new(seed)),
        AlignmentMethod::Sift => Box::new(dog::DogDetector::default()),
        AlignmentMethod::Akaze => Box::new(hessian::HessianDetector::default()),
    }
}

/// Keep local maxima of `response` above `threshold`, at least `margin`
/// pixels from the image edge, strongest first.
///
/// Ties are broken by position so the result is independent of thread
/// scheduling.
pub(crate) fn select_maxima(response: &Array2<f32>, threshold: f32, margin: usize) -> Vec<Keypoint> {
    let (h, w) = response.dim();
    if h <= 2 * margin + 2 || w <= 2 * margin + 2 {
        return Vec::new();
    }

    let mut keypoints = Vec::new();
    for row in margin.max(1)..h - margin.max(1) {
        for col in margin.max(1)..w - margin.max(1) {
            let v = response[[row, col]];
            if v <= threshold {
                continue;
            }
            let mut is_max = true;
            'nbhd: for dr in -1isize..=1 {
                for dc in -1isize..=1 {
                    if dr == 0 && dc == 0 {
                        continue;
                    }
                    let n = response[[(row as isize + dr) as usize, (col as isize + dc) as usize]];
                    // Strict on one side so plateaus yield exactly one point.
                    if n > v || (n == v && (dr < 0 || (dr == 0 && dc < 0))) {
                        is_max = false;
                        break 'nbhd;
                    }
                }
            }
            if is_max {
                keypoints.push(Keypoint::new(col as f64, row as f64, v));
            }
        }
    }

    keypoints.sort_by(|a, b| {
        b.response
            .total_cmp(&a.response)
            .then(a.y.total_cmp(&b.y))
            .then(a.x.total_cmp(&b.x))
    });
    keypoints.truncate(MAX_KEYPOINTS);
    keypoints
}

/// Pixel lookup with edge clamping.
pub(crate) fn sample_clamped(image: &Array2<f32>, y: isize, x: isize) -> f32 {
    let (h, w) = image.dim();
    let r = y.clamp(0, h as isize - 1) as usize;
    let c = x.clamp(0, w as isize - 1) as usize;
    image[[r, c]]
}
