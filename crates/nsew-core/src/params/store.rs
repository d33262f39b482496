use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::consts::DEFAULT_PARAMS_FILENAME;
use crate::error::{Result, StitchError};

use super::{version_support, AlignmentParameters, VersionSupport};

/// `.nsew_alignment.json` in the working directory.
pub fn default_parameters_path() -> PathBuf {
    PathBuf::from(DEFAULT_PARAMS_FILENAME)
}

/// Write `params` as pretty JSON. The file is staged next to `path` and
/// renamed into place, so readers never see a partial file.
pub fn save_parameters(params: &AlignmentParameters, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let json = serde_json::to_string_pretty(params).map_err(|e| StitchError::ParamsMalformed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(json.as_bytes())?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|e| StitchError::Io(e.error))?;

    info!(path = %path.display(), quadrants = params.quadrants.len(), "Saved alignment parameters");
    Ok(())
}

/// Read a parameter file.
///
/// Missing file, invalid JSON and unsupported schema versions are reported
/// as distinct errors. Unknown fields are ignored.
pub fn load_parameters(path: &Path) -> Result<AlignmentParameters> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StitchError::ParamsNotFound(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };
    let malformed = |message: String| StitchError::ParamsMalformed {
        path: path.to_path_buf(),
        message,
    };

    let value: serde_json::Value = serde_json::from_str(&text).map_err(|e| malformed(e.to_string()))?;
    let version = value
        .get("version")
        .and_then(|v| v.as_str())
        .ok_or_else(|| malformed("missing \"version\" field".into()))?;
    match version_support(version) {
        VersionSupport::Current => {}
        VersionSupport::Migratable => {
            warn!(path = %path.display(), version, "Reading older alignment parameter version");
        }
        VersionSupport::Unsupported => return Err(StitchError::UnsupportedVersion(version.to_string())),
    }

    serde_json::from_value(value).map_err(|e| malformed(e.to_string()))
}
