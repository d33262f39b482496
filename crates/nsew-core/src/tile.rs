use std::path::PathBuf;

use ndarray::{Array2, Array3, Axis};

use crate::consts::LUMINANCE_WEIGHTS;
use crate::quadrant::Quadrant;

/// (width, height) in pixels.
pub type Dimensions = (u32, u32);

/// Sample type of the decoded source file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SampleType {
    #[default]
    U8,
    U16,
    F32,
}

/// A decoded image. Pixel values are f32 in [0.0, 1.0].
#[derive(Clone, Debug)]
pub struct TileImage {
    /// Pixel data, shape = (height, width, channels). Channels is 1 or 3.
    pub data: Array3<f32>,
    pub sample_type: SampleType,
}

impl TileImage {
    pub fn new(data: Array3<f32>, sample_type: SampleType) -> Self {
        Self { data, sample_type }
    }

    /// Single-channel image from a 2D array.
    pub fn from_gray(gray: Array2<f32>, sample_type: SampleType) -> Self {
        Self::new(gray.insert_axis(Axis(2)), sample_type)
    }

    /// Uniform image, used for placeholders.
    pub fn filled(dims: Dimensions, channels: usize, value: f32) -> Self {
        let (w, h) = dims;
        Self::new(
            Array3::from_elem((h as usize, w as usize, channels), value),
            SampleType::U8,
        )
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn channels(&self) -> usize {
        self.data.dim().2
    }

    pub fn dimensions(&self) -> Dimensions {
        (self.width() as u32, self.height() as u32)
    }

    /// Luminance plane used for feature work.
    pub fn luminance(&self) -> Array2<f32> {
        if self.channels() == 1 {
            return self.data.index_axis(Axis(2), 0).to_owned();
        }
        let (h, w, c) = self.data.dim();
        let mut lum = Array2::<f32>::zeros((h, w));
        for row in 0..h {
            for col in 0..w {
                let mut v = 0.0;
                for (ch, weight) in LUMINANCE_WEIGHTS.iter().enumerate().take(c) {
                    v += self.data[[row, col, ch]] * weight;
                }
                lum[[row, col]] = v;
            }
        }
        lum
    }

    /// Copy with `channels` channels. Gray is replicated; extra channels are dropped.
    pub fn with_channels(&self, channels: usize) -> TileImage {
        if self.channels() == channels {
            return self.clone();
        }
        let (h, w, c) = self.data.dim();
        let data = Array3::from_shape_fn((h, w, channels), |(row, col, ch)| {
            self.data[[row, col, ch.min(c - 1)]]
        });
        TileImage::new(data, self.sample_type)
    }

    /// BLAKE3 over the shape and the little-endian sample bytes, as hex.
    pub fn checksum(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        let (h, w, c) = self.data.dim();
        for d in [h, w, c] {
            hasher.update(&(d as u64).to_le_bytes());
        }
        for v in self.data.iter() {
            hasher.update(&v.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// One loaded tile bound to its grid slot.
#[derive(Clone, Debug)]
pub struct QuadrantImage {
    pub quadrant: Quadrant,
    pub path: PathBuf,
    pub file_size_bytes: u64,
    pub image: TileImage,
    checksum: String,
}

impl QuadrantImage {
    pub fn new(quadrant: Quadrant, path: PathBuf, file_size_bytes: u64, image: TileImage) -> Self {
        let checksum = image.checksum();
        Self {
            quadrant,
            path,
            file_size_bytes,
            image,
            checksum,
        }
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// Recompute the checksum and compare with the one taken at load.
    pub fn verify_checksum(&self) -> bool {
        self.image.checksum() == self.checksum
    }

    pub fn dimensions(&self) -> Dimensions {
        self.image.dimensions()
    }

    pub fn summary(&self) -> TileSummary {
        TileSummary {
            quadrant: self.quadrant,
            path: self.path.clone(),
            dimensions: self.dimensions(),
            checksum: self.checksum.clone(),
        }
    }
}

/// Lightweight record of a tile that went into a stitch.
#[derive(Clone, Debug, PartialEq)]
pub struct TileSummary {
    pub quadrant: Quadrant,
    pub path: PathBuf,
    pub dimensions: Dimensions,
    pub checksum: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luminance_of_gray_is_identity() {
        let gray = Array2::from_shape_fn((3, 4), |(r, c)| (r * 4 + c) as f32 / 12.0);
        let tile = TileImage::from_gray(gray.clone(), SampleType::U8);
        assert_eq!(tile.luminance(), gray);
    }

    #[test]
    fn test_with_channels_replicates_gray() {
        let tile = TileImage::filled((2, 2), 1, 0.25);
        let rgb = tile.with_channels(3);
        assert_eq!(rgb.channels(), 3);
        assert!(rgb.data.iter().all(|&v| (v - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_checksum_detects_mutation() {
        let tile = TileImage::filled((4, 4), 1, 0.5);
        let mut qi = QuadrantImage::new(Quadrant::NE, PathBuf::from("a_NE.tif"), 10, tile);
        assert!(qi.verify_checksum());
        qi.image.data[[0, 0, 0]] = 0.75;
        assert!(!qi.verify_checksum());
    }
}
