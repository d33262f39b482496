use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use nsew_core::chip::{locate_chip_images, ChipNaming, DEFAULT_CHIP_TEMPLATE};
use nsew_core::io::FileImageLoader;
use nsew_core::params::{default_parameters_path, load_parameters};
use nsew_core::pipeline::ChipOutput;
use nsew_core::session::StitchSession;

use super::stitch::OutputArgs;
use crate::progress::drive_job;

#[derive(Args)]
pub struct ChipArgs {
    /// Alignment parameter file written by `nsew stitch`
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// Chip file stem; `{prefix}` is the original stem without its quadrant code
    #[arg(long, default_value = DEFAULT_CHIP_TEMPLATE)]
    pub template: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn run(args: &ChipArgs) -> Result<()> {
    let config = args.output.builder()?.build()?;

    let params_path = args.params.clone().unwrap_or_else(default_parameters_path);
    let parameters = load_parameters(&params_path)
        .with_context(|| format!("Failed to load alignment {}", params_path.display()))?;

    let naming = ChipNaming::new(&args.template);
    let set = locate_chip_images(parameters, &params_path, &naming, &FileImageLoader);
    crate::summary::print_chip_plan(&set, &config, &args.output.output);

    let mut session = StitchSession::default();
    let output = ChipOutput {
        image_path: Some(args.output.output.clone()),
    };
    let job = session.start_chip_stitch(set, config, output)?;
    let result = drive_job(job).context("Chip stitching failed")?;

    crate::summary::print_result(&result);
    println!("\nOutput saved to {}", args.output.output.display());

    Ok(())
}
