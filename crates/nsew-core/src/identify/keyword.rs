use std::path::Path;

use crate::quadrant::Quadrant;

const NE_TOKENS: [&str; 4] = ["NE", "NORTHEAST", "TOPRIGHT", "RIGHTTOP"];
const NW_TOKENS: [&str; 4] = ["NW", "NORTHWEST", "TOPLEFT", "LEFTTOP"];
const SE_TOKENS: [&str; 4] = ["SE", "SOUTHEAST", "BOTTOMRIGHT", "RIGHTBOTTOM"];
const SW_TOKENS: [&str; 4] = ["SW", "SOUTHWEST", "BOTTOMLEFT", "LEFTBOTTOM"];

/// Characters treated as word separators in file names.
const SEPARATORS: [char; 4] = ['_', '-', ' ', '.'];

/// Outcome of identifying a file name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Identification {
    Identified(Quadrant),
    /// No keyword, only single-axis keywords, or conflicting keywords.
    Ambiguous,
}

impl Identification {
    pub fn quadrant(self) -> Option<Quadrant> {
        match self {
            Self::Identified(q) => Some(q),
            Self::Ambiguous => None,
        }
    }
}

fn normalize(keyword: &str) -> String {
    keyword
        .chars()
        .filter(|c| !SEPARATORS.contains(c))
        .collect::<String>()
        .to_uppercase()
}

/// Parse a single spatial keyword ("ne", "north_east", "Top-Left", ...).
///
/// Only keywords naming both axes resolve. Single-axis keywords such as
/// "NORTH" or "LEFT" return `None`: they leave the grid cell undetermined.
pub fn parse_keyword(keyword: &str) -> Option<Quadrant> {
    let clean = normalize(keyword);
    let table = [
        (Quadrant::NE, &NE_TOKENS),
        (Quadrant::NW, &NW_TOKENS),
        (Quadrant::SE, &SE_TOKENS),
        (Quadrant::SW, &SW_TOKENS),
    ];
    table
        .iter()
        .find(|(_, tokens)| tokens.contains(&clean.as_str()))
        .map(|(q, _)| *q)
}

/// Infer the quadrant of a file from its name.
///
/// The stem is split on separators; every token and every pair of adjacent
/// tokens is tried with [`parse_keyword`]. A single distinct hit identifies
/// the tile; no hit or several different hits are ambiguous.
pub fn identify_filename(name: &str) -> Identification {
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    let tokens: Vec<&str> = stem
        .split(|c: char| SEPARATORS.contains(&c))
        .filter(|t| !t.is_empty())
        .collect();

    let mut found: Vec<Quadrant> = Vec::new();
    let mut record = |q: Option<Quadrant>| {
        if let Some(q) = q {
            if !found.contains(&q) {
                found.push(q);
            }
        }
    };

    for token in &tokens {
        record(parse_keyword(token));
    }
    for pair in tokens.windows(2) {
        record(parse_keyword(&format!("{}{}", pair[0], pair[1])));
    }

    match found.as_slice() {
        [q] => Identification::Identified(*q),
        _ => Identification::Ambiguous,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_separators() {
        assert_eq!(normalize("north_east"), "NORTHEAST");
        assert_eq!(normalize("top-left"), "TOPLEFT");
    }

    #[test]
    fn test_pair_join_resolves_split_keyword() {
        assert_eq!(
            identify_filename("scan_north_east.tif"),
            Identification::Identified(Quadrant::NE)
        );
    }
}
