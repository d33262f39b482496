use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::consts::IMAGE_EXTENSIONS;
use crate::identify::split_code_suffix;
use crate::io::ImageLoader;
use crate::params::{AlignmentParameters, QuadrantAlignment};

use super::{ChipImageSet, ChipNaming, DimensionMismatch};

/// Find the chip image for every quadrant recorded in `parameters`.
///
/// Chips are looked up next to the original tile, matching the expected stem
/// case-insensitively with any known image extension; the original's own
/// extension wins when several exist. Found chips are measured with
/// `loader` and compared with the recorded dimensions.
pub fn locate_chip_images(
    parameters: AlignmentParameters,
    source_path: &Path,
    naming: &ChipNaming,
    loader: &dyn ImageLoader,
) -> ChipImageSet {
    let mut chips = BTreeMap::new();
    let mut missing = Vec::new();
    let mut mismatches = Vec::new();

    for alignment in &parameters.quadrants {
        let quadrant = alignment.quadrant;
        let found = find_chip(alignment, naming);
        match &found {
            Some(path) => {
                debug!(quadrant = %quadrant, path = %path.display(), "Found chip image");
                match loader.dimensions(path) {
                    Ok(dims) if dims != alignment.dimensions => {
                        warn!(
                            quadrant = %quadrant,
                            found_width = dims.0,
                            found_height = dims.1,
                            expected_width = alignment.dimensions.0,
                            expected_height = alignment.dimensions.1,
                            "Chip size differs from the recorded tile"
                        );
                        mismatches.push(DimensionMismatch {
                            quadrant,
                            chip_path: path.clone(),
                            found: dims,
                            expected: alignment.dimensions,
                        });
                    }
                    Ok(_) => {}
                    Err(e) => warn!(quadrant = %quadrant, error = %e, "Could not read chip dimensions"),
                }
            }
            None => missing.push(quadrant),
        }
        chips.insert(quadrant, found);
    }

    info!(
        found = chips.values().filter(|p| p.is_some()).count(),
        missing = missing.len(),
        mismatched = mismatches.len(),
        "Located chip images"
    );

    ChipImageSet {
        parameters,
        source_path: source_path.to_path_buf(),
        chips,
        missing,
        mismatches,
    }
}

fn find_chip(alignment: &QuadrantAlignment, naming: &ChipNaming) -> Option<PathBuf> {
    let original = &alignment.original_image_path;
    let Some(stem) = original.file_stem().and_then(|s| s.to_str()) else {
        warn!(path = %original.display(), "Original tile path has no file name");
        return None;
    };
    let Some((prefix, code_quadrant)) = split_code_suffix(stem) else {
        warn!(
            quadrant = %alignment.quadrant,
            path = %original.display(),
            "Original tile name has no quadrant code; chip cannot be derived"
        );
        return None;
    };
    if code_quadrant != alignment.quadrant {
        debug!(
            recorded = %alignment.quadrant,
            named = %code_quadrant,
            "Original name code differs from recorded quadrant; using the recorded one"
        );
    }

    let expected = naming.chip_stem(prefix, alignment.quadrant).to_lowercase();
    let preferred = original.extension().and_then(|e| e.to_str()).map(str::to_lowercase);
    let dir = match original.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Cannot scan directory for chips");
            return None;
        }
    };

    let mut candidates: Vec<(usize, PathBuf)> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter_map(|path| {
            let stem = path.file_stem()?.to_str()?.to_lowercase();
            let ext = path.extension()?.to_str()?.to_lowercase();
            if stem != expected {
                return None;
            }
            let rank = if preferred.as_deref() == Some(ext.as_str()) {
                0
            } else {
                1 + IMAGE_EXTENSIONS.iter().position(|&e| e == ext)?
            };
            Some((rank, path))
        })
        .collect();
    candidates.sort();
    candidates.into_iter().next().map(|(_, path)| path)
}
