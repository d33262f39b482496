//! Robust translation fit over match-implied offsets.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::consts::{RANSAC_INLIER_RADIUS, RANSAC_ITERATIONS};

/// Translation with its support.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TranslationFit {
    pub dx: f64,
    pub dy: f64,
    pub inliers: usize,
    pub matches: usize,
    /// Mean distance of inliers to the refined translation, in pixels.
    pub residual: f64,
}

impl TranslationFit {
    pub fn inlier_ratio(&self) -> f64 {
        if self.matches == 0 {
            0.0
        } else {
            self.inliers as f64 / self.matches as f64
        }
    }
}

/// Fit a translation to `offsets` (one (dx, dy) per match).
///
/// A single match fully determines a translation, so each hypothesis is one
/// offset. With few matches every offset is tried; otherwise
/// [`RANSAC_ITERATIONS`] are drawn from an RNG seeded with `seed`. The best
/// hypothesis has the most inliers, then the lowest residual, then the
/// lowest index. It is refined to the inlier mean and re-scored.
pub fn fit_translation(offsets: &[(f64, f64)], seed: u64) -> Option<TranslationFit> {
    if offsets.is_empty() {
        return None;
    }

    let hypotheses: Vec<usize> = if offsets.len() <= RANSAC_ITERATIONS {
        (0..offsets.len()).collect()
    } else {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..RANSAC_ITERATIONS)
            .map(|_| rng.random_range(0..offsets.len()))
            .collect()
    };

    let mut best: Option<(usize, f64, usize)> = None;
    for &idx in &hypotheses {
        let (inliers, residual) = score(offsets, offsets[idx]);
        let better = match best {
            None => true,
            Some((best_inliers, best_residual, best_idx)) => {
                inliers > best_inliers
                    || (inliers == best_inliers && residual < best_residual)
                    || (inliers == best_inliers && residual == best_residual && idx < best_idx)
            }
        };
        if better {
            best = Some((inliers, residual, idx));
        }
    }

    let (_, _, best_idx) = best?;
    let hypothesis = offsets[best_idx];
    let support: Vec<&(f64, f64)> = offsets
        .iter()
        .filter(|o| distance(**o, hypothesis) <= RANSAC_INLIER_RADIUS)
        .collect();
    let n = support.len() as f64;
    let refined = (
        support.iter().map(|o| o.0).sum::<f64>() / n,
        support.iter().map(|o| o.1).sum::<f64>() / n,
    );
    let (inliers, residual) = score(offsets, refined);

    Some(TranslationFit {
        dx: refined.0,
        dy: refined.1,
        inliers,
        matches: offsets.len(),
        residual,
    })
}

fn score(offsets: &[(f64, f64)], t: (f64, f64)) -> (usize, f64) {
    let mut count = 0;
    let mut total = 0.0;
    for &o in offsets {
        let d = distance(o, t);
        if d <= RANSAC_INLIER_RADIUS {
            count += 1;
            total += d;
        }
    }
    let residual = if count > 0 { total / count as f64 } else { f64::INFINITY };
    (count, residual)
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}
