#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::{s, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use nsew_core::params::{AlignmentParameters, QuadrantAlignment};
use nsew_core::tile::SampleType;
use nsew_core::{Quadrant, QuadrantImage, TileImage};

/// Tile size cut from [`scene`]: (width, height).
pub const TILE: (usize, usize) = (160, 128);
/// Offset between neighbouring tiles: 30% horizontal, ~31% vertical overlap.
pub const STEP: (usize, usize) = (112, 88);

/// Grey background scattered with flat rectangles of random brightness.
/// Rectangle corners give every detector something to lock on to.
pub fn scene(seed: u64) -> Array2<f32> {
    let (width, height) = (TILE.0 + STEP.0, TILE.1 + STEP.1);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut scene = Array2::<f32>::from_elem((height, width), 0.2);
    for _ in 0..(width * height / 300) {
        let w = rng.random_range(4..14);
        let h = rng.random_range(4..14);
        let x = rng.random_range(0..width - w);
        let y = rng.random_range(0..height - h);
        let v: f32 = rng.random_range(0.3..1.0);
        scene.slice_mut(s![y..y + h, x..x + w]).fill(v);
    }
    scene
}

/// Expected position of each tile relative to NW.
pub fn expected_shift(quadrant: Quadrant) -> (f64, f64) {
    let (row, col) = quadrant.grid_position();
    ((col * STEP.0) as f64, (row * STEP.1) as f64)
}

/// Cut the four overlapping tiles out of `scene`.
pub fn cut_tiles(scene: &Array2<f32>) -> Vec<(Quadrant, TileImage)> {
    Quadrant::ALL
        .into_iter()
        .map(|q| {
            let (x, y) = expected_shift(q);
            let (x, y) = (x as usize, y as usize);
            let gray = scene.slice(s![y..y + TILE.1, x..x + TILE.0]).to_owned();
            (q, TileImage::from_gray(gray, SampleType::U8))
        })
        .collect()
}

pub fn quadrant_images(tiles: &[(Quadrant, TileImage)]) -> Vec<Arc<QuadrantImage>> {
    tiles
        .iter()
        .map(|(q, t)| {
            Arc::new(QuadrantImage::new(
                *q,
                PathBuf::from(format!("sample_{}.png", q.code())),
                0,
                t.clone(),
            ))
        })
        .collect()
}

/// Save a single-channel tile as 8-bit PNG.
pub fn write_gray_png(path: &Path, tile: &TileImage) {
    let (w, h) = tile.dimensions();
    let img = image::GrayImage::from_fn(w, h, |x, y| {
        let v = tile.data[[y as usize, x as usize, 0]];
        image::Luma([(v.clamp(0.0, 1.0) * 255.0).round() as u8])
    });
    img.save(path).unwrap();
}

/// Write `{prefix}{CODE}.png` for every tile and return the paths.
pub fn write_tiles(dir: &Path, prefix: &str, tiles: &[(Quadrant, TileImage)]) -> Vec<PathBuf> {
    tiles
        .iter()
        .map(|(q, t)| {
            let path = dir.join(format!("{prefix}{}.png", q.code()));
            write_gray_png(&path, t);
            path
        })
        .collect()
}

/// Parameters for the four tiles of [`cut_tiles`] with originals in `dir`.
pub fn scene_parameters(dir: &Path) -> AlignmentParameters {
    let quadrants = Quadrant::ALL
        .into_iter()
        .map(|q| QuadrantAlignment {
            quadrant: q,
            original_image_path: dir.join(format!("sample_{}.png", q.code())),
            dimensions: (TILE.0 as u32, TILE.1 as u32),
            position_shift: expected_shift(q),
        })
        .collect();
    AlignmentParameters::from_alignment(
        &dir.join("stitched.tiff"),
        quadrants,
        ((TILE.0 + STEP.0) as u32, (TILE.1 + STEP.1) as u32),
        (0.0, 0.0),
    )
}
