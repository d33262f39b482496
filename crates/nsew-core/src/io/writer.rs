use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, ImageFormat, Luma, Rgb};
use tracing::info;

use crate::error::{Result, StitchError};
use crate::pipeline::config::OutputFormat;
use crate::tile::TileImage;

/// Sink for stitched images.
pub trait ImageWriter: Send + Sync {
    fn save(&self, image: &TileImage, path: &Path, format: OutputFormat, compression_level: u8) -> Result<()>;
}

/// Writes through the `image` crate: 16-bit TIFF, 8-bit PNG or JPEG.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileImageWriter;

impl ImageWriter for FileImageWriter {
    fn save(&self, image: &TileImage, path: &Path, format: OutputFormat, compression_level: u8) -> Result<()> {
        match format {
            OutputFormat::Tiff => save_tiff(image, path)?,
            OutputFormat::Png => save_png(image, path, compression_level)?,
            OutputFormat::Jpeg => save_jpeg(image, path, compression_level)?,
        }
        info!(
            path = %path.display(),
            format = %format,
            width = image.width(),
            height = image.height(),
            "Saved image"
        );
        Ok(())
    }
}

/// Interleaved samples scaled to `max`.
fn quantize<T>(image: &TileImage, max: f32, cast: impl Fn(f32) -> T) -> Vec<T> {
    image
        .data
        .iter()
        .map(|&v| cast((v.clamp(0.0, 1.0) * max).round()))
        .collect()
}

fn buffer_error() -> StitchError {
    StitchError::Worker("pixel buffer does not match image dimensions".into())
}

/// Save as 16-bit grayscale or RGB TIFF.
fn save_tiff(image: &TileImage, path: &Path) -> Result<()> {
    let (w, h) = image.dimensions();
    let pixels = quantize(image, 65535.0, |v| v as u16);
    if image.channels() == 1 {
        let img = image::ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w, h, pixels).ok_or_else(buffer_error)?;
        img.save_with_format(path, ImageFormat::Tiff)?;
    } else {
        let img = image::ImageBuffer::<Rgb<u16>, Vec<u16>>::from_raw(w, h, pixels).ok_or_else(buffer_error)?;
        img.save_with_format(path, ImageFormat::Tiff)?;
    }
    Ok(())
}

/// Save as 8-bit PNG. Levels 0-3 favour speed, 7-9 size.
fn save_png(image: &TileImage, path: &Path, compression_level: u8) -> Result<()> {
    let (w, h) = image.dimensions();
    let pixels = quantize(image, 255.0, |v| v as u8);
    let compression = match compression_level {
        0..=3 => CompressionType::Fast,
        4..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    };
    let writer = BufWriter::new(File::create(path)?);
    let encoder = PngEncoder::new_with_quality(writer, compression, FilterType::Adaptive);
    encoder.write_image(&pixels, w, h, color_type(image))?;
    Ok(())
}

/// Save as JPEG with quality 100 at level 0 down to 55 at level 9.
fn save_jpeg(image: &TileImage, path: &Path, compression_level: u8) -> Result<()> {
    let (w, h) = image.dimensions();
    let pixels = quantize(image, 255.0, |v| v as u8);
    let quality = 100 - 5 * compression_level.min(9);
    let writer = BufWriter::new(File::create(path)?);
    let encoder = JpegEncoder::new_with_quality(writer, quality);
    encoder.write_image(&pixels, w, h, color_type(image))?;
    Ok(())
}

fn color_type(image: &TileImage) -> ExtendedColorType {
    if image.channels() == 1 {
        ExtendedColorType::L8
    } else {
        ExtendedColorType::Rgb8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_format_writes_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let image = TileImage::filled((16, 8), 3, 0.5);
        for format in [OutputFormat::Tiff, OutputFormat::Png, OutputFormat::Jpeg] {
            let path = dir.path().join(format!("out.{}", format.extension()));
            FileImageWriter.save(&image, &path, format, 5).unwrap();
            assert_eq!(image::image_dimensions(&path).unwrap(), (16, 8));
        }
    }
}
