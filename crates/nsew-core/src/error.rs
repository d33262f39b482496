use std::path::PathBuf;

use thiserror::Error;

/// Why a single image file could not be loaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadErrorKind {
    NotFound,
    UnsupportedFormat,
    Corrupted,
}

impl std::fmt::Display for LoadErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "file not found"),
            Self::UnsupportedFormat => write!(f, "unsupported format"),
            Self::Corrupted => write!(f, "corrupted file"),
        }
    }
}

#[derive(Error, Debug)]
pub enum StitchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cannot load {path}: {kind} ({message})")]
    ImageLoad {
        path: PathBuf,
        kind: LoadErrorKind,
        message: String,
    },

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("No tiles to stitch")]
    NoTiles,

    #[error("Insufficient geometry: {0}")]
    InsufficientGeometry(String),

    #[error("Alignment parameter file not found: {0}")]
    ParamsNotFound(PathBuf),

    #[error("Malformed alignment parameter file {path}: {message}")]
    ParamsMalformed { path: PathBuf, message: String },

    #[error("Unsupported alignment parameter version: {0}")]
    UnsupportedVersion(String),

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error("Stitching cancelled")]
    Cancelled,

    #[error("Worker error: {0}")]
    Worker(String),
}

impl StitchError {
    pub fn load(path: impl Into<PathBuf>, kind: LoadErrorKind, message: impl Into<String>) -> Self {
        Self::ImageLoad {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StitchError>;
