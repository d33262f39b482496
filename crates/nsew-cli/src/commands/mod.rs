pub mod chip;
pub mod config;
pub mod identify;
pub mod params;
pub mod stitch;
