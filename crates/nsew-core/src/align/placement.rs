use std::collections::BTreeMap;

use tracing::debug;

use crate::quadrant::{Border, Quadrant};
use crate::tile::Dimensions;

use super::{nominal_translation, BorderEstimate};

/// Place tiles by a maximum-confidence spanning tree rooted at the anchor.
///
/// The anchor is the first present tile of NW, NE, SW, SE and sits at the
/// origin. Measured borders are preferred over `nominal` ones; ties go to
/// border order (N, S, E, W). Tiles that no border reaches are put on the
/// nominal grid relative to the anchor.
pub fn place_tiles(
    tiles: &BTreeMap<Quadrant, Dimensions>,
    estimates: &[BorderEstimate],
    nominal: &[Border],
    overlap_threshold_percent: f64,
) -> BTreeMap<Quadrant, (f64, f64)> {
    let mut placements = BTreeMap::new();
    let Some(anchor) = Quadrant::ALL.into_iter().find(|q| tiles.contains_key(q)) else {
        return placements;
    };
    placements.insert(anchor, (0.0, 0.0));

    // (weight, border, translation from first to second tile)
    let mut edges: Vec<(f64, Border, (f64, f64))> = estimates
        .iter()
        .map(|e| (e.confidence, e.border, e.translation))
        .collect();
    for &border in nominal {
        let (first, _) = border.quadrants();
        if let Some(&dims) = tiles.get(&first) {
            edges.push((-1.0, border, nominal_translation(border, dims, overlap_threshold_percent)));
        }
    }
    edges.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));

    loop {
        let next = edges.iter().find_map(|&(weight, border, t)| {
            let (a, b) = border.quadrants();
            match (placements.get(&a), placements.get(&b)) {
                (Some(&pa), None) => Some((b, (pa.0 + t.0, pa.1 + t.1), border, weight)),
                (None, Some(&pb)) => Some((a, (pb.0 - t.0, pb.1 - t.1), border, weight)),
                _ => None,
            }
        });
        let Some((quadrant, position, border, weight)) = next else {
            break;
        };
        debug!(quadrant = %quadrant, border = %border, weight, "Placed tile");
        placements.insert(quadrant, position);
    }

    let (anchor_row, anchor_col) = anchor.grid_position();
    let anchor_dims = tiles[&anchor];
    let step_x = nominal_translation(Border::North, anchor_dims, overlap_threshold_percent).0;
    let step_y = nominal_translation(Border::West, anchor_dims, overlap_threshold_percent).1;
    for &quadrant in tiles.keys() {
        if placements.contains_key(&quadrant) {
            continue;
        }
        let (row, col) = quadrant.grid_position();
        let position = (
            (col as f64 - anchor_col as f64) * step_x,
            (row as f64 - anchor_row as f64) * step_y,
        );
        debug!(quadrant = %quadrant, "Tile unreachable, using nominal grid position");
        placements.insert(quadrant, position);
    }

    placements
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimate(border: Border, confidence: f64, translation: (f64, f64)) -> BorderEstimate {
        BorderEstimate {
            border,
            confidence,
            overlap_percent: 0.0,
            matches: 10,
            inliers: 10,
            translation,
        }
    }

    #[test]
    fn test_chain_through_estimates() {
        let tiles: BTreeMap<_, _> = Quadrant::ALL.into_iter().map(|q| (q, (100, 80))).collect();
        let estimates = [
            estimate(Border::North, 0.9, (90.0, 1.0)),
            estimate(Border::West, 0.8, (2.0, 70.0)),
            estimate(Border::South, 0.7, (89.0, -1.0)),
            estimate(Border::East, 0.1, (0.0, 50.0)),
        ];
        let p = place_tiles(&tiles, &estimates, &[], 15.0);
        assert_eq!(p[&Quadrant::NW], (0.0, 0.0));
        assert_eq!(p[&Quadrant::NE], (90.0, 1.0));
        assert_eq!(p[&Quadrant::SW], (2.0, 70.0));
        // Reached via South (0.7) rather than East (0.1).
        assert_eq!(p[&Quadrant::SE], (91.0, 69.0));
    }

    #[test]
    fn test_diagonal_pair_uses_grid() {
        let tiles: BTreeMap<_, _> = [(Quadrant::NW, (100, 80)), (Quadrant::SE, (100, 80))].into();
        let p = place_tiles(&tiles, &[], &[], 20.0);
        assert_eq!(p[&Quadrant::SE], (80.0, 64.0));
    }

    #[test]
    fn test_anchor_is_first_present() {
        let tiles: BTreeMap<_, _> = [(Quadrant::SE, (50, 50)), (Quadrant::SW, (50, 50))].into();
        let p = place_tiles(&tiles, &[], &[Border::South], 10.0);
        assert_eq!(p[&Quadrant::SW], (0.0, 0.0));
        assert_eq!(p[&Quadrant::SE], (45.0, 0.0));
    }
}
