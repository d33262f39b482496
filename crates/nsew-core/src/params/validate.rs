use std::collections::BTreeSet;
use std::path::Path;

use super::{load_parameters, version_support, AlignmentParameters, VersionSupport};

/// Outcome of checking a parameter record. Never an error in itself.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn from_findings(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

/// Check a parameter record for structural problems.
///
/// With `check_file_existence`, original images that are no longer on disk
/// produce warnings.
pub fn validate_parameters(params: &AlignmentParameters, check_file_existence: bool) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if params.version.trim().is_empty() {
        errors.push("version is empty".to_string());
    } else {
        match version_support(&params.version) {
            VersionSupport::Current => {}
            VersionSupport::Migratable => {
                warnings.push(format!("version {} is older than the current schema", params.version))
            }
            VersionSupport::Unsupported => errors.push(format!("unsupported version {}", params.version)),
        }
    }

    if params.timestamp.trim().is_empty() {
        errors.push("timestamp is empty".to_string());
    } else if chrono::DateTime::parse_from_rfc3339(&params.timestamp).is_err() {
        warnings.push(format!("timestamp {:?} is not RFC 3339", params.timestamp));
    }

    if params.stitched_image_path.as_os_str().is_empty() {
        errors.push("stitched_image_path is empty".to_string());
    }

    if params.quadrants.is_empty() {
        errors.push("no quadrant alignments".to_string());
    }

    let mut seen = BTreeSet::new();
    for alignment in &params.quadrants {
        let q = alignment.quadrant;
        if !seen.insert(q) {
            errors.push(format!("duplicate entry for {q}"));
        }
        let (w, h) = alignment.dimensions;
        if w == 0 || h == 0 {
            errors.push(format!("{q} has non-positive dimensions {w}x{h}"));
        }
        let (dx, dy) = alignment.position_shift;
        if !dx.is_finite() || !dy.is_finite() {
            errors.push(format!("{q} has a non-finite position shift"));
        }
        if check_file_existence && !alignment.original_image_path.is_file() {
            warnings.push(format!(
                "{q} original image {} no longer exists",
                alignment.original_image_path.display()
            ));
        }
    }

    if let Some((w, h)) = params.final_dimensions {
        if w == 0 || h == 0 {
            errors.push(format!("final dimensions {w}x{h} are non-positive"));
        }
    }
    if let Some((ox, oy)) = params.origin_offset {
        if !ox.is_finite() || !oy.is_finite() {
            errors.push("origin offset is non-finite".to_string());
        }
    }

    ValidationReport::from_findings(errors, warnings)
}

/// Load and validate a parameter file, reporting load failures as errors.
pub fn inspect_parameters_file(path: &Path, check_file_existence: bool) -> ValidationReport {
    match load_parameters(path) {
        Ok(params) => validate_parameters(&params, check_file_existence),
        Err(e) => ValidationReport::from_findings(vec![e.to_string()], Vec::new()),
    }
}
