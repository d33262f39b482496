use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use nsew_core::identify::find_siblings_by_suffix;
use nsew_core::params::default_parameters_path;
use nsew_core::pipeline::{
    AlignmentMethod, BlendMode, Interpolation, MissingFill, OutputFormat, ResizeStrategy, StitchOutput,
    StitchingConfig, StitchingConfigBuilder,
};
use nsew_core::session::StitchSession;
use nsew_core::Quadrant;

use crate::progress::drive_job;

#[derive(Clone, Copy, ValueEnum)]
pub enum MethodArg {
    Orb,
    Sift,
    Akaze,
}

impl From<MethodArg> for AlignmentMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Orb => Self::Orb,
            MethodArg::Sift => Self::Sift,
            MethodArg::Akaze => Self::Akaze,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum BlendArg {
    Linear,
    Multiband,
    Feather,
}

impl From<BlendArg> for BlendMode {
    fn from(arg: BlendArg) -> Self {
        match arg {
            BlendArg::Linear => Self::Linear,
            BlendArg::Multiband => Self::Multiband,
            BlendArg::Feather => Self::Feather,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ResizeArg {
    Largest,
    Smallest,
    Average,
}

impl From<ResizeArg> for ResizeStrategy {
    fn from(arg: ResizeArg) -> Self {
        match arg {
            ResizeArg::Largest => Self::Largest,
            ResizeArg::Smallest => Self::Smallest,
            ResizeArg::Average => Self::Average,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum InterpolationArg {
    Linear,
    Cubic,
    Lanczos,
}

impl From<InterpolationArg> for Interpolation {
    fn from(arg: InterpolationArg) -> Self {
        match arg {
            InterpolationArg::Linear => Self::Linear,
            InterpolationArg::Cubic => Self::Cubic,
            InterpolationArg::Lanczos => Self::Lanczos,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FillArg {
    Black,
    White,
    Interpolate,
}

impl From<FillArg> for MissingFill {
    fn from(arg: FillArg) -> Self {
        match arg {
            FillArg::Black => Self::Black,
            FillArg::White => Self::White,
            FillArg::Interpolate => Self::Interpolate,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FormatArg {
    Tiff,
    Png,
    Jpeg,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Tiff => Self::Tiff,
            FormatArg::Png => Self::Png,
            FormatArg::Jpeg => Self::Jpeg,
        }
    }
}

/// Output and compositing options shared by `stitch` and `chip`.
#[derive(Args)]
pub struct OutputArgs {
    /// Stitching config file (TOML); flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Blending of overlapping pixels
    #[arg(long, value_enum)]
    pub blend: Option<BlendArg>,

    /// Resampling filter for resized tiles
    #[arg(long, value_enum)]
    pub interpolation: Option<InterpolationArg>,

    /// Fill for canvas areas no tile covers
    #[arg(long, value_enum)]
    pub fill: Option<FillArg>,

    /// Output format (defaults to the output file extension)
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Compression level 0-9 (JPEG quality for JPEG)
    #[arg(long)]
    pub compression: Option<u8>,

    /// Output file path
    #[arg(short, long, default_value = "stitched.tiff")]
    pub output: PathBuf,
}

impl OutputArgs {
    /// Config file (or defaults) with the compositing flags applied.
    pub fn builder(&self) -> Result<StitchingConfigBuilder> {
        let mut builder = if let Some(ref config_path) = self.config {
            let contents = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config {}", config_path.display()))?;
            toml::from_str(&contents).context("Invalid stitching config")?
        } else {
            StitchingConfig::builder()
        };

        if let Some(blend) = self.blend {
            builder = builder.blend_mode(blend.into());
        }
        if let Some(interpolation) = self.interpolation {
            builder = builder.interpolation(interpolation.into());
        }
        if let Some(fill) = self.fill {
            builder = builder.missing_quadrant_fill(fill.into());
        }
        if let Some(format) = self.format {
            builder = builder.output_format(format.into());
        } else if let Some(format) = format_from_extension(&self.output) {
            builder = builder.output_format(format);
        }
        if let Some(level) = self.compression {
            builder = builder.compression_level(level);
        }
        Ok(builder)
    }
}

fn format_from_extension(path: &Path) -> Option<OutputFormat> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "tif" | "tiff" => Some(OutputFormat::Tiff),
        "png" => Some(OutputFormat::Png),
        "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
        _ => None,
    }
}

#[derive(Args)]
pub struct StitchArgs {
    /// Tile images; quadrants are read from the file names
    pub files: Vec<PathBuf>,

    /// Pick up all four tiles from one file's `_NW`/`_NE`/`_SW`/`_SE` siblings
    #[arg(long)]
    pub reference: Option<PathBuf>,

    /// Explicit north-west tile
    #[arg(long)]
    pub nw: Option<PathBuf>,

    /// Explicit north-east tile
    #[arg(long)]
    pub ne: Option<PathBuf>,

    /// Explicit south-west tile
    #[arg(long)]
    pub sw: Option<PathBuf>,

    /// Explicit south-east tile
    #[arg(long)]
    pub se: Option<PathBuf>,

    /// Feature detector
    #[arg(long, value_enum)]
    pub method: Option<MethodArg>,

    /// Target size when tile dimensions differ
    #[arg(long, value_enum)]
    pub resize: Option<ResizeArg>,

    /// Minimum border overlap in percent before warning
    #[arg(long)]
    pub overlap_threshold: Option<f64>,

    /// Minimum border confidence (0-1)
    #[arg(long)]
    pub confidence_threshold: Option<f64>,

    /// Seam band width in pixels for feather blending
    #[arg(long)]
    pub feather_width: Option<u32>,

    /// Seed for feature sampling and RANSAC
    #[arg(long)]
    pub seed: Option<u64>,

    /// Place tiles nominally when a border cannot be measured
    #[arg(long)]
    pub allow_low_confidence: bool,

    /// Where to save alignment parameters for later chip stitching
    #[arg(long)]
    pub params: Option<PathBuf>,

    #[command(flatten)]
    pub output: OutputArgs,
}

fn build_config(args: &StitchArgs) -> Result<StitchingConfig> {
    let mut builder = args.output.builder()?;
    if let Some(method) = args.method {
        builder = builder.alignment_method(method.into());
    }
    if let Some(resize) = args.resize {
        builder = builder.resize_strategy(resize.into());
    }
    if let Some(percent) = args.overlap_threshold {
        builder = builder.overlap_threshold_percent(percent);
    }
    if let Some(threshold) = args.confidence_threshold {
        builder = builder.confidence_threshold(threshold);
    }
    if let Some(width) = args.feather_width {
        builder = builder.feather_width(width);
    }
    if let Some(seed) = args.seed {
        builder = builder.feature_seed(seed);
    }
    if args.allow_low_confidence {
        builder = builder.allow_low_confidence(true);
    }
    Ok(builder.build()?)
}

fn load_tiles(args: &StitchArgs, session: &mut StitchSession) -> Result<()> {
    if !args.files.is_empty() {
        let report = session.load_files(&args.files);
        for (quadrant, path) in &report.loaded {
            tracing::info!(quadrant = %quadrant, path = %path.display(), "Loaded tile");
        }
        for path in &report.ambiguous {
            eprintln!(
                "Cannot tell the quadrant of {}; pass it with --nw/--ne/--sw/--se",
                path.display()
            );
        }
        for (path, err) in &report.errors {
            eprintln!("Skipping {}: {}", path.display(), err);
        }
    }

    if let Some(ref reference) = args.reference {
        let siblings = find_siblings_by_suffix(reference)
            .with_context(|| format!("Failed to find tiles next to {}", reference.display()))?;
        for (quadrant, path) in siblings {
            session
                .assign(quadrant, &path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
        }
    }

    let explicit = [
        (Quadrant::NW, &args.nw),
        (Quadrant::NE, &args.ne),
        (Quadrant::SW, &args.sw),
        (Quadrant::SE, &args.se),
    ];
    for (quadrant, path) in explicit {
        if let Some(path) = path {
            session
                .assign(quadrant, path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
        }
    }

    Ok(())
}

pub fn run(args: &StitchArgs) -> Result<()> {
    let config = build_config(args)?;

    let mut session = StitchSession::default();
    load_tiles(args, &mut session)?;
    if session.tiles().is_empty() {
        bail!("No tiles to stitch");
    }

    crate::summary::print_stitch_plan(session.tiles(), &config, &args.output.output);

    let parameters_path = args.params.clone().unwrap_or_else(default_parameters_path);
    let output = StitchOutput {
        image_path: Some(args.output.output.clone()),
        parameters_path: Some(parameters_path.clone()),
    };
    let job = session.start_stitch(config, output)?;
    let result = drive_job(job).context("Stitching failed")?;

    crate::summary::print_result(&result);
    println!("\nOutput saved to {}", args.output.output.display());
    println!("Alignment saved to {}", parameters_path.display());

    Ok(())
}
