use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_FEATHER_WIDTH, DEFAULT_FEATURE_SEED};
use crate::error::{Result, StitchError};

/// Feature detector used to align neighbouring tiles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentMethod {
    /// FAST corners with steered binary descriptors. Fastest.
    #[default]
    Orb,
    /// Difference-of-Gaussian blobs with gradient-histogram descriptors. Most robust.
    Sift,
    /// Hessian extrema on a diffused image with grid-comparison descriptors.
    Akaze,
}

impl std::fmt::Display for AlignmentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Orb => write!(f, "ORB"),
            Self::Sift => write!(f, "SIFT"),
            Self::Akaze => write!(f, "AKAZE"),
        }
    }
}

/// How overlapping pixels are combined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    Linear,
    #[default]
    Multiband,
    Feather,
}

impl std::fmt::Display for BlendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linear => write!(f, "Linear"),
            Self::Multiband => write!(f, "Multiband"),
            Self::Feather => write!(f, "Feather"),
        }
    }
}

/// Target size used when tiles disagree on dimensions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeStrategy {
    #[default]
    Largest,
    Smallest,
    Average,
}

impl std::fmt::Display for ResizeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Largest => write!(f, "Largest"),
            Self::Smallest => write!(f, "Smallest"),
            Self::Average => write!(f, "Average"),
        }
    }
}

/// Resampling filter for resizes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    #[default]
    Linear,
    Cubic,
    Lanczos,
}

impl Interpolation {
    pub fn filter_type(self) -> FilterType {
        match self {
            Self::Linear => FilterType::Triangle,
            Self::Cubic => FilterType::CatmullRom,
            Self::Lanczos => FilterType::Lanczos3,
        }
    }
}

impl std::fmt::Display for Interpolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linear => write!(f, "Linear"),
            Self::Cubic => write!(f, "Cubic"),
            Self::Lanczos => write!(f, "Lanczos"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// 16-bit lossless.
    #[default]
    Tiff,
    /// 8-bit lossless.
    Png,
    /// 8-bit lossy.
    Jpeg,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Tiff => "tiff",
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tiff => write!(f, "TIFF"),
            Self::Png => write!(f, "PNG"),
            Self::Jpeg => write!(f, "JPEG"),
        }
    }
}

/// What to paint where no tile covers the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingFill {
    #[default]
    Black,
    White,
    /// Mean colour of the adjacent tiles' border strips.
    Interpolate,
}

impl std::fmt::Display for MissingFill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Black => write!(f, "Black"),
            Self::White => write!(f, "White"),
            Self::Interpolate => write!(f, "Interpolate"),
        }
    }
}

/// Validated, immutable stitching parameters.
///
/// Built through [`StitchingConfig::builder`] or deserialized (which runs the
/// same validation). Out-of-range values are rejected, never clamped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StitchingConfigBuilder")]
pub struct StitchingConfig {
    alignment_method: AlignmentMethod,
    blend_mode: BlendMode,
    overlap_threshold_percent: f64,
    resize_strategy: ResizeStrategy,
    interpolation: Interpolation,
    confidence_threshold: f64,
    output_format: OutputFormat,
    compression_level: u8,
    missing_quadrant_fill: MissingFill,
    feature_seed: u64,
    feather_width: u32,
    allow_low_confidence: bool,
}

impl Default for StitchingConfig {
    fn default() -> Self {
        Self {
            alignment_method: AlignmentMethod::Orb,
            blend_mode: BlendMode::Multiband,
            overlap_threshold_percent: 15.0,
            resize_strategy: ResizeStrategy::Largest,
            interpolation: Interpolation::Linear,
            confidence_threshold: 0.6,
            output_format: OutputFormat::Tiff,
            compression_level: 5,
            missing_quadrant_fill: MissingFill::Black,
            feature_seed: DEFAULT_FEATURE_SEED,
            feather_width: DEFAULT_FEATHER_WIDTH,
            allow_low_confidence: false,
        }
    }
}

impl StitchingConfig {
    pub fn builder() -> StitchingConfigBuilder {
        StitchingConfigBuilder::default()
    }

    /// Builder pre-filled with this config's values.
    pub fn to_builder(&self) -> StitchingConfigBuilder {
        StitchingConfigBuilder {
            alignment_method: self.alignment_method,
            blend_mode: self.blend_mode,
            overlap_threshold_percent: self.overlap_threshold_percent,
            resize_strategy: self.resize_strategy,
            interpolation: self.interpolation,
            confidence_threshold: self.confidence_threshold,
            output_format: self.output_format,
            compression_level: self.compression_level,
            missing_quadrant_fill: self.missing_quadrant_fill,
            feature_seed: self.feature_seed,
            feather_width: self.feather_width,
            allow_low_confidence: self.allow_low_confidence,
        }
    }

    pub fn alignment_method(&self) -> AlignmentMethod {
        self.alignment_method
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn overlap_threshold_percent(&self) -> f64 {
        self.overlap_threshold_percent
    }

    pub fn resize_strategy(&self) -> ResizeStrategy {
        self.resize_strategy
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn compression_level(&self) -> u8 {
        self.compression_level
    }

    pub fn missing_quadrant_fill(&self) -> MissingFill {
        self.missing_quadrant_fill
    }

    pub fn feature_seed(&self) -> u64 {
        self.feature_seed
    }

    pub fn feather_width(&self) -> u32 {
        self.feather_width
    }

    pub fn allow_low_confidence(&self) -> bool {
        self.allow_low_confidence
    }
}

/// Mutable staging area for a [`StitchingConfig`]. Missing fields take defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchingConfigBuilder {
    pub alignment_method: AlignmentMethod,
    pub blend_mode: BlendMode,
    pub overlap_threshold_percent: f64,
    pub resize_strategy: ResizeStrategy,
    pub interpolation: Interpolation,
    pub confidence_threshold: f64,
    pub output_format: OutputFormat,
    pub compression_level: u8,
    pub missing_quadrant_fill: MissingFill,
    pub feature_seed: u64,
    pub feather_width: u32,
    pub allow_low_confidence: bool,
}

impl Default for StitchingConfigBuilder {
    fn default() -> Self {
        StitchingConfig::default().to_builder()
    }
}

impl StitchingConfigBuilder {
    pub fn alignment_method(mut self, method: AlignmentMethod) -> Self {
        self.alignment_method = method;
        self
    }

    pub fn blend_mode(mut self, mode: BlendMode) -> Self {
        self.blend_mode = mode;
        self
    }

    pub fn overlap_threshold_percent(mut self, percent: f64) -> Self {
        self.overlap_threshold_percent = percent;
        self
    }

    pub fn resize_strategy(mut self, strategy: ResizeStrategy) -> Self {
        self.resize_strategy = strategy;
        self
    }

    pub fn interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn compression_level(mut self, level: u8) -> Self {
        self.compression_level = level;
        self
    }

    pub fn missing_quadrant_fill(mut self, fill: MissingFill) -> Self {
        self.missing_quadrant_fill = fill;
        self
    }

    pub fn feature_seed(mut self, seed: u64) -> Self {
        self.feature_seed = seed;
        self
    }

    pub fn feather_width(mut self, width: u32) -> Self {
        self.feather_width = width;
        self
    }

    pub fn allow_low_confidence(mut self, allow: bool) -> Self {
        self.allow_low_confidence = allow;
        self
    }

    pub fn build(self) -> Result<StitchingConfig> {
        if !(5.0..=50.0).contains(&self.overlap_threshold_percent) {
            return Err(StitchError::InvalidConfig(format!(
                "overlap_threshold_percent must be in range [5, 50], got {}",
                self.overlap_threshold_percent
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(StitchError::InvalidConfig(format!(
                "confidence_threshold must be in range [0.0, 1.0], got {}",
                self.confidence_threshold
            )));
        }
        if self.compression_level > 9 {
            return Err(StitchError::InvalidConfig(format!(
                "compression_level must be in range [0, 9], got {}",
                self.compression_level
            )));
        }
        if self.feather_width == 0 {
            return Err(StitchError::InvalidConfig(
                "feather_width must be at least 1 pixel".into(),
            ));
        }

        Ok(StitchingConfig {
            alignment_method: self.alignment_method,
            blend_mode: self.blend_mode,
            overlap_threshold_percent: self.overlap_threshold_percent,
            resize_strategy: self.resize_strategy,
            interpolation: self.interpolation,
            confidence_threshold: self.confidence_threshold,
            output_format: self.output_format,
            compression_level: self.compression_level,
            missing_quadrant_fill: self.missing_quadrant_fill,
            feature_seed: self.feature_seed,
            feather_width: self.feather_width,
            allow_low_confidence: self.allow_low_confidence,
        })
    }
}

impl TryFrom<StitchingConfigBuilder> for StitchingConfig {
    type Error = StitchError;

    fn try_from(builder: StitchingConfigBuilder) -> Result<Self> {
        builder.build()
    }
}
