use serde::{Deserialize, Serialize};

/// Position of a tile in the 2x2 grid.
///
/// ```text
/// [0,0] NW | [0,1] NE
/// ---------|---------
/// [1,0] SW | [1,1] SE
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quadrant {
    NW,
    NE,
    SW,
    SE,
}

impl Quadrant {
    /// All quadrants in grid order (row-major).
    pub const ALL: [Quadrant; 4] = [Quadrant::NW, Quadrant::NE, Quadrant::SW, Quadrant::SE];

    /// (row, col) cell in the 2x2 grid.
    pub fn grid_position(self) -> (usize, usize) {
        match self {
            Self::NW => (0, 0),
            Self::NE => (0, 1),
            Self::SW => (1, 0),
            Self::SE => (1, 1),
        }
    }

    pub fn from_grid_position(row: usize, col: usize) -> Option<Self> {
        match (row, col) {
            (0, 0) => Some(Self::NW),
            (0, 1) => Some(Self::NE),
            (1, 0) => Some(Self::SW),
            (1, 1) => Some(Self::SE),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NE => "North-East",
            Self::NW => "North-West",
            Self::SE => "South-East",
            Self::SW => "South-West",
        }
    }

    /// Canonical two-letter code, as used in file names and the parameter file.
    pub fn code(self) -> &'static str {
        match self {
            Self::NE => "NE",
            Self::NW => "NW",
            Self::SE => "SE",
            Self::SW => "SW",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|q| q.code().eq_ignore_ascii_case(code))
    }

    /// The two borders this quadrant takes part in.
    pub fn borders(self) -> [Border; 2] {
        match self {
            Self::NW => [Border::North, Border::West],
            Self::NE => [Border::North, Border::East],
            Self::SW => [Border::South, Border::West],
            Self::SE => [Border::South, Border::East],
        }
    }
}

impl std::fmt::Display for Quadrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Which way two neighbouring tiles are arranged across a border.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BorderAxis {
    /// Tiles side by side; the second tile lies to the right.
    Horizontal,
    /// Tiles stacked; the second tile lies below.
    Vertical,
}

/// Shared edge between two adjacent quadrants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Border {
    North,
    South,
    East,
    West,
}

impl Border {
    pub const ALL: [Border; 4] = [Border::North, Border::South, Border::East, Border::West];

    /// The two tiles sharing this border, first = left (or top).
    pub fn quadrants(self) -> (Quadrant, Quadrant) {
        match self {
            Self::North => (Quadrant::NW, Quadrant::NE),
            Self::South => (Quadrant::SW, Quadrant::SE),
            Self::East => (Quadrant::NE, Quadrant::SE),
            Self::West => (Quadrant::NW, Quadrant::SW),
        }
    }

    pub fn axis(self) -> BorderAxis {
        match self {
            Self::North | Self::South => BorderAxis::Horizontal,
            Self::East | Self::West => BorderAxis::Vertical,
        }
    }

    pub fn other(self, quadrant: Quadrant) -> Option<Quadrant> {
        let (a, b) = self.quadrants();
        if quadrant == a {
            Some(b)
        } else if quadrant == b {
            Some(a)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Border {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::North => write!(f, "North"),
            Self::South => write!(f, "South"),
            Self::East => write!(f, "East"),
            Self::West => write!(f, "West"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_position_roundtrip() {
        for q in Quadrant::ALL {
            let (row, col) = q.grid_position();
            assert_eq!(Quadrant::from_grid_position(row, col), Some(q));
        }
    }

    #[test]
    fn test_border_membership() {
        for q in Quadrant::ALL {
            for border in q.borders() {
                assert!(border.other(q).is_some(), "{q} should sit on {border}");
            }
        }
        assert_eq!(Border::North.other(Quadrant::SE), None);
    }

    #[test]
    fn test_serialized_as_code() {
        let json = serde_json::to_string(&Quadrant::NE).unwrap();
        assert_eq!(json, "\"NE\"");
    }
}
