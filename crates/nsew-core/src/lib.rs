pub mod align;
pub mod chip;
pub mod compose;
pub mod consts;
pub mod error;
pub mod features;
pub mod filters;
pub mod identify;
pub mod io;
pub mod params;
pub mod pipeline;
pub mod quadrant;
pub mod quality;
pub mod result;
pub mod session;
pub mod tile;

pub use error::{LoadErrorKind, Result, StitchError};
pub use quadrant::{Border, Quadrant};
pub use result::StitchedResult;
pub use tile::{QuadrantImage, TileImage};
