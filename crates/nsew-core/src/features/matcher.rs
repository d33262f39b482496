use rayon::prelude::*;

use super::{Descriptors, Features};

/// A correspondence between keypoint `query` in one set and `train` in the other.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureMatch {
    pub query: usize,
    pub train: usize,
    pub distance: f32,
}

/// Brute-force nearest neighbours with a ratio test and a cross-check.
///
/// A match survives when its best distance is below `ratio` times the second
/// best, and the train descriptor's own nearest neighbour is the query.
/// Mixed descriptor kinds never match.
pub fn match_features(query: &Features, train: &Features, ratio: f32) -> Vec<FeatureMatch> {
    match (&query.descriptors, &train.descriptors) {
        (Descriptors::Binary(q), Descriptors::Binary(t)) => {
            cross_checked(q, t, ratio, |a, b| hamming(a, b) as f32)
        }
        (Descriptors::Float(q), Descriptors::Float(t)) => cross_checked(q, t, ratio, euclidean),
        _ => Vec::new(),
    }
}

fn cross_checked<D, F>(query: &[D], train: &[D], ratio: f32, distance: F) -> Vec<FeatureMatch>
where
    D: Sync,
    F: Fn(&D, &D) -> f32 + Sync,
{
    if query.is_empty() || train.len() < 2 {
        return Vec::new();
    }

    let forward: Vec<Option<(usize, f32, f32)>> = query
        .par_iter()
        .map(|q| two_nearest(q, train, &distance))
        .collect();
    let backward: Vec<Option<(usize, f32, f32)>> = train
        .par_iter()
        .map(|t| two_nearest(t, query, &distance))
        .collect();

    forward
        .iter()
        .enumerate()
        .filter_map(|(qi, best)| {
            let (ti, d1, d2) = (*best)?;
            if d1 >= ratio * d2 {
                return None;
            }
            match backward[ti] {
                Some((back, _, _)) if back == qi => Some(FeatureMatch {
                    query: qi,
                    train: ti,
                    distance: d1,
                }),
                _ => None,
            }
        })
        .collect()
}

/// (index of best, best distance, second-best distance). Ties go to the lower index.
fn two_nearest<D, F>(needle: &D, haystack: &[D], distance: &F) -> Option<(usize, f32, f32)>
where
    F: Fn(&D, &D) -> f32,
{
    let mut best: Option<(usize, f32)> = None;
    let mut second = f32::INFINITY;
    for (i, candidate) in haystack.iter().enumerate() {
        let d = distance(needle, candidate);
        match best {
            Some((_, bd)) if d >= bd => {
                if d < second {
                    second = d;
                }
            }
            Some((_, bd)) => {
                second = bd;
                best = Some((i, d));
            }
            None => best = Some((i, d)),
        }
    }
    best.map(|(i, d)| (i, d, second))
}

fn hamming(a: &Vec<u8>, b: &Vec<u8>) -> u32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x ^ y).count_ones()).sum()
}

fn euclidean(a: &Vec<f32>, b: &Vec<f32>) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
