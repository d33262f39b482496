mod common;

use std::collections::BTreeSet;

use nsew_core::chip::{locate_chip_images, stitch_chips, ChipNaming};
use nsew_core::io::FileImageLoader;
use nsew_core::pipeline::{BlendMode, Interpolation, StitchingConfig};
use nsew_core::tile::SampleType;
use nsew_core::{Quadrant, TileImage};

fn write_chip(dir: &std::path::Path, quadrant: Quadrant, dims: (u32, u32), value: f32) {
    let tile = TileImage::filled(dims, 1, value);
    common::write_gray_png(&dir.join(format!("sample_{}_chip.png", quadrant.code())), &tile);
}

#[test]
fn test_two_missing_chips_become_placeholders() {
    let dir = tempfile::tempdir().unwrap();
    let params = common::scene_parameters(dir.path());
    let final_dimensions = params.final_dimensions.unwrap();
    write_chip(dir.path(), Quadrant::NW, (160, 128), 0.8);
    write_chip(dir.path(), Quadrant::SE, (160, 128), 0.8);

    let set = locate_chip_images(params, &dir.path().join("params.json"), &ChipNaming::default(), &FileImageLoader);
    assert_eq!(set.missing, vec![Quadrant::NE, Quadrant::SW]);

    let config = StitchingConfig::builder().blend_mode(BlendMode::Linear).build().unwrap();
    let result = stitch_chips(&set, &config, &FileImageLoader).unwrap();
    assert!(result.is_chip_stitch);
    assert_eq!(result.full_resolution, final_dimensions);

    let meta = result.chip_metadata.as_ref().unwrap();
    assert_eq!(meta.placeholders_generated, 2);
    assert_eq!(meta.chips_found, 2);
    let placeholders: BTreeSet<Quadrant> = meta.placeholder_quadrants.iter().copied().collect();
    assert_eq!(placeholders, BTreeSet::from([Quadrant::NE, Quadrant::SW]));
    assert_eq!(meta.source_alignment_path, dir.path().join("params.json"));
    assert_eq!(meta.source_alignment_timestamp, set.parameters.timestamp);

    assert_eq!(result.quality.overall_confidence, 0.5);
    assert_eq!(result.source_tiles.len(), 2);
    // Far corner of NE is covered by the NE placeholder only.
    assert_eq!(result.image.data[[2, 270, 0]], 0.0);
}

#[test]
fn test_mismatched_chip_is_resized_to_recorded_size() {
    let dir = tempfile::tempdir().unwrap();
    let params = common::scene_parameters(dir.path());
    for q in Quadrant::ALL {
        let dims = if q == Quadrant::SW { (80, 64) } else { (160, 128) };
        write_chip(dir.path(), q, dims, 0.5);
    }

    let set = locate_chip_images(params, &dir.path().join("params.json"), &ChipNaming::default(), &FileImageLoader);
    assert_eq!(set.mismatches.len(), 1);
    assert_eq!(set.mismatches[0].quadrant, Quadrant::SW);

    let config = StitchingConfig::builder().interpolation(Interpolation::Cubic).build().unwrap();
    let result = stitch_chips(&set, &config, &FileImageLoader).unwrap();
    let meta = result.chip_metadata.unwrap();
    let resized: Vec<_> = meta.transformations.iter().filter(|t| t.was_resized).collect();
    assert_eq!(resized.len(), 1);
    assert_eq!(resized[0].quadrant, Quadrant::SW);
    assert_eq!(resized[0].original_dimensions, (80, 64));
    assert_eq!(resized[0].final_dimensions, (160, 128));
    assert_eq!(resized[0].interpolation, Some(Interpolation::Cubic));
    assert_eq!(meta.placeholders_generated, 0);
    assert_eq!(result.quality.overall_confidence, 1.0);
    assert_eq!(result.image.sample_type, SampleType::U8);
}

#[test]
fn test_no_chips_gives_all_placeholder_result() {
    let dir = tempfile::tempdir().unwrap();
    let set = locate_chip_images(
        common::scene_parameters(dir.path()),
        &dir.path().join("params.json"),
        &ChipNaming::default(),
        &FileImageLoader,
    );
    assert_eq!(set.missing.len(), 4);
    let result = stitch_chips(&set, &StitchingConfig::default(), &FileImageLoader).unwrap();
    assert_eq!(result.chip_metadata.unwrap().placeholders_generated, 4);
    assert_eq!(result.quality.overall_confidence, 0.0);
}

#[test]
fn test_custom_template() {
    let dir = tempfile::tempdir().unwrap();
    let tile = TileImage::filled((160, 128), 1, 0.3);
    common::write_gray_png(&dir.path().join("CHIP-NW.png"), &tile);
    let set = locate_chip_images(
        common::scene_parameters(dir.path()),
        &dir.path().join("params.json"),
        &ChipNaming::new("chip-{code}"),
        &FileImageLoader,
    );
    assert!(set.chips[&Quadrant::NW].is_some());
    assert_eq!(set.found(), 1);
}
