use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, StitchError};
use crate::quadrant::Quadrant;

/// Split a file stem into (shared prefix, quadrant) using its last two characters.
///
/// `"sample_NE"` gives `("sample_", NE)`. The code match is case-insensitive;
/// the prefix is returned verbatim.
pub fn split_code_suffix(stem: &str) -> Option<(&str, Quadrant)> {
    let split = stem.char_indices().rev().nth(1).map(|(i, _)| i)?;
    let (prefix, code) = stem.split_at(split);
    Quadrant::from_code(code).map(|q| (prefix, q))
}

/// Find the sibling tiles of `reference` that share its prefix.
///
/// The reference's stem must end in a quadrant code. For each of the four
/// codes, `{prefix}{CODE}{ext}` is probed in the same directory, with the
/// code in upper and then lower case. Whatever exists is returned; a partial
/// set is not an error.
pub fn find_siblings_by_suffix(reference: &Path) -> Result<BTreeMap<Quadrant, PathBuf>> {
    let stem = reference
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| StitchError::InvalidFileName(reference.display().to_string()))?;
    let (prefix, _) = split_code_suffix(stem).ok_or_else(|| {
        StitchError::InvalidFileName(format!(
            "{} does not end in a quadrant code (NE, NW, SE, SW)",
            reference.display()
        ))
    })?;
    let ext = reference
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    let dir = reference.parent().unwrap_or(Path::new("."));

    let mut found = BTreeMap::new();
    for quadrant in Quadrant::ALL {
        let code = quadrant.code();
        let candidates = [
            dir.join(format!("{prefix}{code}{ext}")),
            dir.join(format!("{prefix}{}{ext}", code.to_lowercase())),
        ];
        if let Some(path) = candidates.into_iter().find(|p| p.is_file()) {
            debug!(quadrant = %quadrant, path = %path.display(), "Found sibling tile");
            found.insert(quadrant, path);
        }
    }

    Ok(found)
}
