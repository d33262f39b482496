use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use console::Style;
use nsew_core::identify::{identify_filename, split_code_suffix};

#[derive(Args)]
pub struct IdentifyArgs {
    /// Image files to classify
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

pub fn run(args: &IdentifyArgs) -> Result<()> {
    let found = Style::new().green().bold();
    let ambiguous = Style::new().dim().yellow();
    let hint = Style::new().dim();

    for path in &args.files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let label = match identify_filename(&name).quadrant() {
            Some(quadrant) => found.apply_to(quadrant.to_string()),
            None => ambiguous.apply_to("?".to_string()),
        };

        // A trailing code is what chip lookup keys on; show the prefix it leaves.
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        match split_code_suffix(stem) {
            Some((prefix, _)) => println!("  {:<4}{}  {}", label, name, hint.apply_to(format!("prefix \"{prefix}\""))),
            None => println!("  {:<4}{}", label, name),
        }
    }

    Ok(())
}
