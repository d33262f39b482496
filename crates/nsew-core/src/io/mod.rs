//! Image decode and encode collaborators.

pub mod loader;
pub mod writer;

pub use loader::{load_quadrant_image, FileImageLoader, ImageLoader, TileMetadata};
pub use writer::{FileImageWriter, ImageWriter};
