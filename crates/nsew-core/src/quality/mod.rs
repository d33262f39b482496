//! Stitch quality metrics derived from border estimates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::align::{GeometryEstimate, ResizeNote};
use crate::consts::{BORDER_COUNT, BORDER_COVERAGE_WEIGHT};
use crate::pipeline::config::StitchingConfig;
use crate::quadrant::Border;

/// Coarse rating of an overall confidence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityCategory {
    Poor,
    Acceptable,
    Good,
    Excellent,
}

impl QualityCategory {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.9 {
            Self::Excellent
        } else if confidence >= 0.8 {
            Self::Good
        } else if confidence >= 0.6 {
            Self::Acceptable
        } else {
            Self::Poor
        }
    }
}

impl std::fmt::Display for QualityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Excellent => write!(f, "Excellent"),
            Self::Good => write!(f, "Good"),
            Self::Acceptable => write!(f, "Acceptable"),
            Self::Poor => write!(f, "Poor"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BorderQuality {
    pub confidence: f64,
    pub overlap_percent: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// In [0, 1].
    pub overall_confidence: f64,
    /// Measured borders only; absent borders were skipped or fell back.
    pub borders: BTreeMap<Border, BorderQuality>,
    pub total_matches: usize,
    pub inlier_ratio: f64,
    pub warnings: Vec<String>,
}

impl QualityMetrics {
    pub fn category(&self) -> QualityCategory {
        QualityCategory::from_confidence(self.overall_confidence)
    }

    pub fn border_confidence(&self, border: Border) -> Option<f64> {
        self.borders.get(&border).map(|b| b.confidence)
    }

    pub fn overlap_percent(&self, border: Border) -> Option<f64> {
        self.borders.get(&border).map(|b| b.overlap_percent)
    }

    /// Metrics for a stitch with no border measurements, e.g. a chip stitch.
    pub fn from_coverage(overall_confidence: f64, warnings: Vec<String>) -> Self {
        Self {
            overall_confidence: overall_confidence.clamp(0.0, 1.0),
            borders: BTreeMap::new(),
            total_matches: 0,
            inlier_ratio: 0.0,
            warnings,
        }
    }
}

/// Combine border estimates into overall metrics.
///
/// `overall = mean(usable confidences) * (0.6 + 0.4 * usable / 4)`. A lone
/// tile has nothing to misalign and scores 1.0; shared borders with no usable
/// estimate score 0.0.
pub fn assess_quality(geometry: &GeometryEstimate, resized: &[ResizeNote], config: &StitchingConfig) -> QualityMetrics {
    let mut warnings = Vec::new();
    let mut borders = BTreeMap::new();

    for estimate in &geometry.borders {
        if estimate.overlap_percent < config.overlap_threshold_percent() {
            warnings.push(format!(
                "{} border overlap {:.1}% is below the {:.1}% threshold",
                estimate.border,
                estimate.overlap_percent,
                config.overlap_threshold_percent()
            ));
        }
        if estimate.confidence < config.confidence_threshold() {
            warnings.push(format!(
                "{} border confidence {:.2} is below the {:.2} threshold",
                estimate.border,
                estimate.confidence,
                config.confidence_threshold()
            ));
        }
        borders.insert(
            estimate.border,
            BorderQuality {
                confidence: estimate.confidence,
                overlap_percent: estimate.overlap_percent,
            },
        );
    }
    for border in &geometry.nominal_borders {
        warnings.push(format!(
            "{border} border could not be aligned; placed at the nominal {:.1}% overlap",
            config.overlap_threshold_percent()
        ));
    }
    for note in resized {
        warnings.push(format!(
            "{} was resized from {}x{} to {}x{}",
            note.quadrant, note.from.0, note.from.1, note.to.0, note.to.1
        ));
    }

    let usable = geometry.borders.len();
    let overall_confidence = if geometry.possible_borders.is_empty() {
        1.0
    } else if usable == 0 {
        0.0
    } else {
        let mean = geometry.borders.iter().map(|b| b.confidence).sum::<f64>() / usable as f64;
        let coverage = usable as f64 / BORDER_COUNT as f64;
        mean * ((1.0 - BORDER_COVERAGE_WEIGHT) + BORDER_COVERAGE_WEIGHT * coverage)
    };

    let total_matches: usize = geometry.borders.iter().map(|b| b.matches).sum();
    let total_inliers: usize = geometry.borders.iter().map(|b| b.inliers).sum();
    let inlier_ratio = if total_matches == 0 {
        0.0
    } else {
        total_inliers as f64 / total_matches as f64
    };

    QualityMetrics {
        overall_confidence: overall_confidence.clamp(0.0, 1.0),
        borders,
        total_matches,
        inlier_ratio,
        warnings,
    }
}
