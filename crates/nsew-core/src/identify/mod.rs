//! Quadrant inference from file names.

mod keyword;
mod suffix;

pub use keyword::{identify_filename, parse_keyword, Identification};
pub use suffix::{find_siblings_by_suffix, split_code_suffix};
