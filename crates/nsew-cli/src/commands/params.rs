use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use nsew_core::params::{default_parameters_path, inspect_parameters_file, load_parameters};

#[derive(Args)]
pub struct ParamsArgs {
    /// Alignment parameter file (defaults to the one `nsew stitch` writes)
    pub file: Option<PathBuf>,

    /// Warn about original images that no longer exist
    #[arg(long)]
    pub check_files: bool,
}

pub fn run(args: &ParamsArgs) -> Result<()> {
    let path = args.file.clone().unwrap_or_else(default_parameters_path);
    let report = inspect_parameters_file(&path, args.check_files);

    if report.is_valid {
        if let Ok(params) = load_parameters(&path) {
            crate::summary::print_parameters(&path, &params);
        }
    }
    crate::summary::print_validation(&report);

    if !report.is_valid {
        bail!("{} is not a usable alignment file", path.display());
    }
    Ok(())
}
