pub mod config;
mod orchestrator;
pub mod types;

pub use config::{
    AlignmentMethod, BlendMode, Interpolation, MissingFill, OutputFormat, ResizeStrategy, StitchingConfig,
    StitchingConfigBuilder,
};
pub use orchestrator::{run_chip_stitch, run_stitch, stitch_quadrants, ChipOutput, StitchOutput};
pub use types::{CancelToken, NoOpReporter, PipelineStage, ProgressEvent, ProgressReporter};
