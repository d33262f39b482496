mod common;

use std::path::PathBuf;

use nsew_core::params::{
    inspect_parameters_file, load_parameters, save_parameters, validate_parameters, AlignmentParameters,
    QuadrantAlignment,
};
use nsew_core::{Quadrant, StitchError};

fn record(final_dimensions: Option<(u32, u32)>, origin_offset: Option<(f64, f64)>) -> AlignmentParameters {
    AlignmentParameters {
        version: "1.0".into(),
        timestamp: "2024-03-01T12:30:00+01:00".into(),
        stitched_image_path: PathBuf::from("/data/out/stitched.tiff"),
        quadrants: vec![
            QuadrantAlignment {
                quadrant: Quadrant::NW,
                original_image_path: PathBuf::from("/data/in/s_NW.tif"),
                dimensions: (2048, 1536),
                position_shift: (0.0, 0.0),
            },
            QuadrantAlignment {
                quadrant: Quadrant::NE,
                original_image_path: PathBuf::from("/data/in/s_NE.tif"),
                dimensions: (2048, 1536),
                position_shift: (1740.25, -3.5),
            },
        ],
        final_dimensions,
        origin_offset,
    }
}

// ---------------------------------------------------------------------------
// Round trip
// ---------------------------------------------------------------------------

#[test]
fn test_round_trip_with_optional_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("params.json");
    let params = record(Some((3788, 1540)), Some((0.0, 3.5)));
    save_parameters(&params, &path).unwrap();
    assert_eq!(load_parameters(&path).unwrap(), params);
}

#[test]
fn test_round_trip_without_optional_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("params.json");
    let params = record(None, None);
    save_parameters(&params, &path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(!text.contains("origin_offset"));
    assert!(!text.contains("null"));
    assert_eq!(load_parameters(&path).unwrap(), params);
}

#[test]
fn test_save_overwrites_and_leaves_no_stray_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("params.json");
    save_parameters(&record(None, None), &path).unwrap();
    save_parameters(&record(Some((1, 1)), None), &path).unwrap();
    assert_eq!(load_parameters(&path).unwrap().final_dimensions, Some((1, 1)));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_wire_format_shape() {
    let json = serde_json::to_value(record(Some((10, 20)), Some((1.5, 2.5)))).unwrap();
    assert_eq!(json["quadrants"][1]["quadrant"], "NE");
    assert_eq!(json["quadrants"][1]["dimensions"], serde_json::json!([2048, 1536]));
    assert_eq!(json["quadrants"][1]["position_shift"], serde_json::json!([1740.25, -3.5]));
    assert_eq!(json["final_dimensions"], serde_json::json!([10, 20]));
}

// ---------------------------------------------------------------------------
// Loading errors
// ---------------------------------------------------------------------------

#[test]
fn test_unknown_version_fails_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("params.json");
    let mut params = record(None, None);
    params.version = "7.2".into();
    save_parameters(&params, &path).unwrap();
    assert!(matches!(load_parameters(&path), Err(StitchError::UnsupportedVersion(v)) if v == "7.2"));
}

#[test]
fn test_older_version_and_unknown_fields_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("params.json");
    std::fs::write(
        &path,
        r#"{
            "version": "0.9",
            "timestamp": "2023-01-01T00:00:00Z",
            "stitched_image_path": "a.tiff",
            "quadrants": [],
            "microscope": "unused"
        }"#,
    )
    .unwrap();
    let params = load_parameters(&path).unwrap();
    assert_eq!(params.version, "0.9");
    assert_eq!(params.final_dimensions, None);
}

#[test]
fn test_missing_version_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("params.json");
    std::fs::write(&path, r#"{"timestamp": "x"}"#).unwrap();
    assert!(matches!(load_parameters(&path), Err(StitchError::ParamsMalformed { .. })));
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn test_valid_record_passes() {
    let report = validate_parameters(&record(Some((3788, 1540)), Some((0.0, 0.0))), false);
    assert!(report.is_valid, "{:?}", report.errors);
    assert!(report.warnings.is_empty());
}

#[test]
fn test_empty_quadrant_list_is_error() {
    let mut params = record(None, None);
    params.quadrants.clear();
    let report = validate_parameters(&params, false);
    assert!(!report.is_valid);
    assert!(report.errors.iter().any(|e| e.contains("no quadrant")));
}

#[test]
fn test_structural_errors_collected() {
    let mut params = record(Some((0, 10)), Some((f64::NAN, 0.0)));
    params.quadrants[1].quadrant = Quadrant::NW;
    params.quadrants[0].dimensions = (0, 5);
    params.quadrants[0].position_shift = (f64::INFINITY, 0.0);
    let report = validate_parameters(&params, false);
    assert!(!report.is_valid);
    assert_eq!(report.errors.len(), 5, "{:?}", report.errors);
}

#[test]
fn test_missing_original_is_warning_only_when_checking() {
    let params = record(None, None);
    assert!(validate_parameters(&params, false).warnings.is_empty());
    let report = validate_parameters(&params, true);
    assert!(report.is_valid);
    assert_eq!(report.warnings.len(), 2);
}

#[test]
fn test_migratable_version_and_bad_timestamp_warn() {
    let mut params = record(None, None);
    params.version = "0.3".into();
    params.timestamp = "yesterday".into();
    let report = validate_parameters(&params, false);
    assert!(report.is_valid);
    assert_eq!(report.warnings.len(), 2);
}

#[test]
fn test_inspect_folds_load_failures() {
    let dir = tempfile::tempdir().unwrap();
    let report = inspect_parameters_file(&dir.path().join("absent.json"), false);
    assert!(!report.is_valid);
    assert_eq!(report.errors.len(), 1);

    let path = dir.path().join("params.json");
    save_parameters(&common::scene_parameters(dir.path()), &path).unwrap();
    let report = inspect_parameters_file(&path, true);
    assert!(report.is_valid);
    assert_eq!(report.warnings.len(), 4);
}
