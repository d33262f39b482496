use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use console::Style;
use nsew_core::chip::ChipImageSet;
use nsew_core::params::{AlignmentParameters, ValidationReport};
use nsew_core::pipeline::StitchingConfig;
use nsew_core::quality::QualityCategory;
use nsew_core::{Border, Quadrant, QuadrantImage, StitchedResult};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
    error: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
            error: Style::new().red().bold(),
        }
    }
}

fn print_title(s: &Styles, title: &str) {
    println!();
    println!("  {}", s.title.apply_to(title));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(title.chars().count())));
    println!();
}

fn print_compositing(s: &Styles, config: &StitchingConfig) {
    println!("  {}", s.header.apply_to("Compositing"));
    println!("    {:<14}{}", s.label.apply_to("Blend"), s.method.apply_to(config.blend_mode()));
    if config.blend_mode() == nsew_core::pipeline::BlendMode::Feather {
        println!(
            "    {:<14}{}",
            s.label.apply_to("Band"),
            s.value.apply_to(format!("{} px", config.feather_width()))
        );
    }
    println!(
        "    {:<14}{}",
        s.label.apply_to("Fill"),
        s.method.apply_to(config.missing_quadrant_fill())
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Format"),
        s.value.apply_to(format!("{} (level {})", config.output_format(), config.compression_level()))
    );
    println!();
}

/// Tiles and settings about to be stitched.
pub fn print_stitch_plan(tiles: &BTreeMap<Quadrant, Arc<QuadrantImage>>, config: &StitchingConfig, output: &Path) {
    let s = Styles::new();
    print_title(&s, "NSEW Stitch");

    for quadrant in Quadrant::ALL {
        match tiles.get(&quadrant) {
            Some(tile) => {
                let (w, h) = tile.dimensions();
                println!(
                    "  {:<14}{} {}",
                    s.label.apply_to(quadrant),
                    s.path.apply_to(tile.path.display()),
                    s.label.apply_to(format!("{w}x{h}"))
                );
            }
            None => println!("  {:<14}{}", s.label.apply_to(quadrant), s.disabled.apply_to("missing")),
        }
    }
    println!("  {:<14}{}", s.label.apply_to("Output"), s.path.apply_to(output.display()));
    println!();

    println!("  {}", s.header.apply_to("Alignment"));
    println!("    {:<14}{}", s.label.apply_to("Method"), s.method.apply_to(config.alignment_method()));
    println!("    {:<14}{}", s.label.apply_to("Resize"), s.method.apply_to(config.resize_strategy()));
    println!(
        "    {:<14}{}",
        s.label.apply_to("Thresholds"),
        s.value.apply_to(format!(
            "{:.0}% overlap, {:.2} confidence",
            config.overlap_threshold_percent(),
            config.confidence_threshold()
        ))
    );
    if config.allow_low_confidence() {
        println!("    {:<14}{}", s.label.apply_to("Fallback"), s.disabled.apply_to("nominal placement"));
    }
    println!();

    print_compositing(&s, config);
}

/// Chips found for a saved alignment and the settings used to combine them.
pub fn print_chip_plan(set: &ChipImageSet, config: &StitchingConfig, output: &Path) {
    let s = Styles::new();
    print_title(&s, "NSEW Chip Stitch");

    println!("  {:<14}{}", s.label.apply_to("Alignment"), s.path.apply_to(set.source_path.display()));
    println!("  {:<14}{}", s.label.apply_to("Recorded"), s.value.apply_to(&set.parameters.timestamp));
    for (quadrant, chip) in &set.chips {
        match chip {
            Some(path) => {
                let note = match set.mismatch(*quadrant) {
                    Some(m) => format!(
                        " (resize {}x{} -> {}x{})",
                        m.found.0, m.found.1, m.expected.0, m.expected.1
                    ),
                    None => String::new(),
                };
                println!(
                    "  {:<14}{}{}",
                    s.label.apply_to(quadrant),
                    s.path.apply_to(path.display()),
                    s.disabled.apply_to(note)
                );
            }
            None => println!("  {:<14}{}", s.label.apply_to(quadrant), s.disabled.apply_to("placeholder")),
        }
    }
    println!("  {:<14}{}", s.label.apply_to("Output"), s.path.apply_to(output.display()));
    println!();

    print_compositing(&s, config);
}

pub fn print_result(result: &StitchedResult) {
    let s = Styles::new();
    let quality = &result.quality;
    let category = quality.category();
    let category_style = match category {
        QualityCategory::Excellent | QualityCategory::Good => &s.method,
        QualityCategory::Acceptable => &s.disabled,
        QualityCategory::Poor => &s.error,
    };

    println!();
    println!("  {}", s.header.apply_to("Result"));
    let (w, h) = result.full_resolution;
    println!("    {:<14}{}", s.label.apply_to("Size"), s.value.apply_to(format!("{w}x{h}")));
    println!(
        "    {:<14}{} {}",
        s.label.apply_to("Confidence"),
        s.value.apply_to(format!("{:.2}", quality.overall_confidence)),
        category_style.apply_to(category)
    );

    for border in Border::ALL {
        if let (Some(confidence), Some(overlap)) = (quality.border_confidence(border), quality.overlap_percent(border)) {
            println!(
                "    {:<14}{}",
                s.label.apply_to(format!("{border} border")),
                s.value.apply_to(format!("{confidence:.2} at {overlap:.1}% overlap"))
            );
        }
    }
    if quality.total_matches > 0 {
        println!(
            "    {:<14}{}",
            s.label.apply_to("Matches"),
            s.value.apply_to(format!(
                "{} ({:.0}% inliers)",
                quality.total_matches,
                quality.inlier_ratio * 100.0
            ))
        );
    }

    if let Some(ref chip) = result.chip_metadata {
        println!(
            "    {:<14}{}",
            s.label.apply_to("Chips"),
            s.value.apply_to(format!(
                "{} found, {} placeholder(s)",
                chip.chips_found, chip.placeholders_generated
            ))
        );
        let resized = chip.transformations.iter().filter(|t| t.was_resized).count();
        if resized > 0 {
            println!("    {:<14}{}", s.label.apply_to("Resized"), s.value.apply_to(resized));
        }
    }

    println!(
        "    {:<14}{}",
        s.label.apply_to("Time"),
        s.value.apply_to(format!("{:.2}s", result.processing_time.as_secs_f64()))
    );

    for warning in &quality.warnings {
        println!("    {} {}", s.disabled.apply_to("warning:"), warning);
    }
}

pub fn print_parameters(path: &Path, params: &AlignmentParameters) {
    let s = Styles::new();
    print_title(&s, "NSEW Alignment");

    println!("  {:<14}{}", s.label.apply_to("File"), s.path.apply_to(path.display()));
    println!("  {:<14}{}", s.label.apply_to("Version"), s.value.apply_to(&params.version));
    println!("  {:<14}{}", s.label.apply_to("Timestamp"), s.value.apply_to(&params.timestamp));
    println!(
        "  {:<14}{}",
        s.label.apply_to("Stitched"),
        s.path.apply_to(params.stitched_image_path.display())
    );
    if let Some((w, h)) = params.final_dimensions {
        println!("  {:<14}{}", s.label.apply_to("Canvas"), s.value.apply_to(format!("{w}x{h}")));
    }
    println!();

    println!("  {}", s.header.apply_to("Quadrants"));
    for alignment in &params.quadrants {
        let (w, h) = alignment.dimensions;
        let (dx, dy) = alignment.position_shift;
        println!(
            "    {:<4}{} {}",
            s.method.apply_to(alignment.quadrant),
            s.value.apply_to(format!("{w}x{h} at ({dx:.1}, {dy:.1})")),
            s.path.apply_to(alignment.original_image_path.display())
        );
    }
    println!();
}

pub fn print_validation(report: &ValidationReport) {
    let s = Styles::new();
    for error in &report.errors {
        println!("  {} {}", s.error.apply_to("error:"), error);
    }
    for warning in &report.warnings {
        println!("  {} {}", s.disabled.apply_to("warning:"), warning);
    }
    if report.is_valid {
        println!("  {}", s.method.apply_to("Valid"));
    }
}
