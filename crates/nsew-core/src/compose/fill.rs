use std::collections::BTreeMap;

use ndarray::{s, Array2, Array3};

use crate::consts::INTERPOLATE_STRIP_WIDTH;
use crate::pipeline::config::MissingFill;
use crate::quadrant::{BorderAxis, Quadrant};

use super::CanvasTile;

/// Paint every canvas pixel with `coverage == false`.
///
/// `Interpolate` assigns each uncovered pixel to its grid cell (by canvas
/// half) and uses that cell's fill colour: the mean of the border strips that
/// its present grid neighbours turn towards it, or black without neighbours.
pub fn fill_uncovered(canvas: &mut Array3<f32>, coverage: &Array2<bool>, fill: MissingFill, tiles: &[CanvasTile<'_>]) {
    let (h, w, channels) = canvas.dim();
    let colours: BTreeMap<Quadrant, Vec<f32>> = match fill {
        MissingFill::Black => uniform(0.0, channels),
        MissingFill::White => uniform(1.0, channels),
        MissingFill::Interpolate => Quadrant::ALL
            .into_iter()
            .map(|q| (q, neighbour_colour(q, tiles, channels)))
            .collect(),
    };

    for row in 0..h {
        for col in 0..w {
            if coverage[[row, col]] {
                continue;
            }
            let cell = Quadrant::from_grid_position(usize::from(row * 2 >= h), usize::from(col * 2 >= w))
                .unwrap_or(Quadrant::NW);
            if let Some(colour) = colours.get(&cell) {
                for (ch, &v) in colour.iter().enumerate() {
                    canvas[[row, col, ch]] = v;
                }
            }
        }
    }
}

fn uniform(value: f32, channels: usize) -> BTreeMap<Quadrant, Vec<f32>> {
    Quadrant::ALL.into_iter().map(|q| (q, vec![value; channels])).collect()
}

/// Mean colour of the strips that `cell`'s grid neighbours present towards it.
fn neighbour_colour(cell: Quadrant, tiles: &[CanvasTile<'_>], channels: usize) -> Vec<f32> {
    let means: Vec<Vec<f32>> = cell
        .borders()
        .into_iter()
        .filter_map(|border| {
            let neighbour = border.other(cell)?;
            let tile = tiles.iter().find(|t| t.quadrant == neighbour)?;
            Some(strip_mean(tile, cell, neighbour, border.axis(), channels))
        })
        .collect();

    if means.is_empty() {
        return vec![0.0; channels];
    }
    (0..channels)
        .map(|ch| means.iter().map(|m| m[ch]).sum::<f32>() / means.len() as f32)
        .collect()
}

fn strip_mean(tile: &CanvasTile<'_>, cell: Quadrant, neighbour: Quadrant, axis: BorderAxis, channels: usize) -> Vec<f32> {
    let data = &tile.image.data;
    let (h, w, _) = data.dim();
    let (cell_row, cell_col) = cell.grid_position();
    let (n_row, n_col) = neighbour.grid_position();
    let strip_w = INTERPOLATE_STRIP_WIDTH.min(w);
    let strip_h = INTERPOLATE_STRIP_WIDTH.min(h);

    let strip = match axis {
        // Side by side: the neighbour's column strip facing the cell.
        BorderAxis::Horizontal if cell_col < n_col => data.slice(s![.., ..strip_w, ..]),
        BorderAxis::Horizontal => data.slice(s![.., w - strip_w.., ..]),
        // Stacked: the neighbour's row strip facing the cell.
        BorderAxis::Vertical if cell_row < n_row => data.slice(s![..strip_h, .., ..]),
        BorderAxis::Vertical => data.slice(s![h - strip_h.., .., ..]),
    };

    let count = (strip.len() / channels.max(1)).max(1) as f32;
    (0..channels)
        .map(|ch| strip.slice(s![.., .., ch]).sum() / count)
        .collect()
}
