use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageError, ImageReader};
use ndarray::Array3;
use tracing::debug;

use crate::error::{LoadErrorKind, Result, StitchError};
use crate::quadrant::Quadrant;
use crate::tile::{Dimensions, QuadrantImage, SampleType, TileImage};

/// Facts about a decoded file.
#[derive(Clone, Debug, PartialEq)]
pub struct TileMetadata {
    pub path: PathBuf,
    pub file_size_bytes: u64,
    pub dimensions: Dimensions,
    pub channels: usize,
    pub sample_type: SampleType,
}

/// Source of tile pixels.
pub trait ImageLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<(TileImage, TileMetadata)>;

    /// Image size without decoding the pixels.
    fn dimensions(&self, path: &Path) -> Result<Dimensions>;
}

/// Decodes anything the `image` crate reads (TIFF, PNG, JPEG, BMP, ...).
#[derive(Clone, Copy, Debug, Default)]
pub struct FileImageLoader;

impl ImageLoader for FileImageLoader {
    fn load(&self, path: &Path) -> Result<(TileImage, TileMetadata)> {
        let file_size_bytes = std::fs::metadata(path)
            .map_err(|e| StitchError::load(path, LoadErrorKind::NotFound, e.to_string()))?
            .len();
        let decoded = ImageReader::open(path)
            .map_err(|e| StitchError::load(path, LoadErrorKind::NotFound, e.to_string()))?
            .with_guessed_format()
            .map_err(|e| StitchError::load(path, LoadErrorKind::Corrupted, e.to_string()))?
            .decode()
            .map_err(|e| classify(path, e))?;

        let image = to_tile_image(decoded);
        debug!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            channels = image.channels(),
            "Decoded image"
        );
        let metadata = TileMetadata {
            path: path.to_path_buf(),
            file_size_bytes,
            dimensions: image.dimensions(),
            channels: image.channels(),
            sample_type: image.sample_type,
        };
        Ok((image, metadata))
    }

    fn dimensions(&self, path: &Path) -> Result<Dimensions> {
        if !path.is_file() {
            return Err(StitchError::load(path, LoadErrorKind::NotFound, "no such file"));
        }
        image::image_dimensions(path).map_err(|e| classify(path, e))
    }
}

fn classify(path: &Path, err: ImageError) -> StitchError {
    let kind = match &err {
        ImageError::Unsupported(_) => LoadErrorKind::UnsupportedFormat,
        ImageError::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => LoadErrorKind::NotFound,
        _ => LoadErrorKind::Corrupted,
    };
    StitchError::load(path, kind, err.to_string())
}

/// Normalize to f32 in [0, 1]. Alpha is dropped; gray stays single-channel.
fn to_tile_image(decoded: DynamicImage) -> TileImage {
    let (w, h) = (decoded.width() as usize, decoded.height() as usize);
    match decoded {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageLumaA8(_) => {
            let gray = decoded.to_luma8();
            let data = Array3::from_shape_fn((h, w, 1), |(r, c, _)| {
                gray.get_pixel(c as u32, r as u32).0[0] as f32 / 255.0
            });
            TileImage::new(data, SampleType::U8)
        }
        DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA16(_) => {
            let gray = decoded.to_luma16();
            let data = Array3::from_shape_fn((h, w, 1), |(r, c, _)| {
                gray.get_pixel(c as u32, r as u32).0[0] as f32 / 65535.0
            });
            TileImage::new(data, SampleType::U16)
        }
        DynamicImage::ImageRgb16(_) | DynamicImage::ImageRgba16(_) => {
            let rgb = decoded.to_rgb16();
            let data = Array3::from_shape_fn((h, w, 3), |(r, c, ch)| {
                rgb.get_pixel(c as u32, r as u32).0[ch] as f32 / 65535.0
            });
            TileImage::new(data, SampleType::U16)
        }
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            let rgb = decoded.to_rgb32f();
            let data = Array3::from_shape_fn((h, w, 3), |(r, c, ch)| {
                rgb.get_pixel(c as u32, r as u32).0[ch].clamp(0.0, 1.0)
            });
            TileImage::new(data, SampleType::F32)
        }
        _ => {
            let rgb = decoded.to_rgb8();
            let data = Array3::from_shape_fn((h, w, 3), |(r, c, ch)| {
                rgb.get_pixel(c as u32, r as u32).0[ch] as f32 / 255.0
            });
            TileImage::new(data, SampleType::U8)
        }
    }
}

/// Load `path` into the `quadrant` slot.
pub fn load_quadrant_image(quadrant: Quadrant, path: &Path, loader: &dyn ImageLoader) -> Result<QuadrantImage> {
    let (image, metadata) = loader.load(path)?;
    Ok(QuadrantImage::new(
        quadrant,
        metadata.path,
        metadata.file_size_bytes,
        image,
    ))
}
