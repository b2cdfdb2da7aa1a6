//! D8 flow-direction codes.
//!
//! Each cell drains into exactly one of its eight neighbours. Two
//! power-of-two encodings are in common use:
//!
//! ```text
//!   ESRI               Whitebox
//!   32  64  128        64  128   1
//!   16   x    1        32    x   2
//!    8   4    2        16    8   4
//! ```
//!
//! Code 0 marks a pit or outlet. Row 0 is the northern edge, so "south"
//! means `row + 1`.

use serde::{Deserialize, Serialize};

/// One of the eight compass directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::N,
        Direction::NE,
        Direction::E,
        Direction::SE,
        Direction::S,
        Direction::SW,
        Direction::W,
        Direction::NW,
    ];

    /// `(d_col, d_row)` step to the neighbour in this direction.
    pub fn offset(self) -> (i64, i64) {
        match self {
            Direction::N => (0, -1),
            Direction::NE => (1, -1),
            Direction::E => (1, 0),
            Direction::SE => (1, 1),
            Direction::S => (0, 1),
            Direction::SW => (-1, 1),
            Direction::W => (-1, 0),
            Direction::NW => (-1, -1),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::N => Direction::S,
            Direction::NE => Direction::SW,
            Direction::E => Direction::W,
            Direction::SE => Direction::NW,
            Direction::S => Direction::N,
            Direction::SW => Direction::NE,
            Direction::W => Direction::E,
            Direction::NW => Direction::SE,
        }
    }
}

/// Flow-direction code scheme of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum D8Encoding {
    #[default]
    Esri,
    Whitebox,
}

impl D8Encoding {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "esri" | "arcgis" => Some(D8Encoding::Esri),
            "whitebox" | "wbt" => Some(D8Encoding::Whitebox),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            D8Encoding::Esri => "esri",
            D8Encoding::Whitebox => "whitebox",
        }
    }

    /// Direction a cell drains towards.
    ///
    /// Returns `None` for pits (0), nodata, NaN, fractional values and codes
    /// outside the scheme; such cells contribute to no neighbour.
    pub fn decode(self, code: f32) -> Option<Direction> {
        if !code.is_finite() || code <= 0.0 || code > 128.0 || code.fract() != 0.0 {
            return None;
        }
        let code = code as u32;
        let dir = match (self, code) {
            (D8Encoding::Esri, 1) => Direction::E,
            (D8Encoding::Esri, 2) => Direction::SE,
            (D8Encoding::Esri, 4) => Direction::S,
            (D8Encoding::Esri, 8) => Direction::SW,
            (D8Encoding::Esri, 16) => Direction::W,
            (D8Encoding::Esri, 32) => Direction::NW,
            (D8Encoding::Esri, 64) => Direction::N,
            (D8Encoding::Esri, 128) => Direction::NE,
            (D8Encoding::Whitebox, 1) => Direction::NE,
            (D8Encoding::Whitebox, 2) => Direction::E,
            (D8Encoding::Whitebox, 4) => Direction::SE,
            (D8Encoding::Whitebox, 8) => Direction::S,
            (D8Encoding::Whitebox, 16) => Direction::SW,
            (D8Encoding::Whitebox, 32) => Direction::W,
            (D8Encoding::Whitebox, 64) => Direction::NW,
            (D8Encoding::Whitebox, 128) => Direction::N,
            _ => return None,
        };
        Some(dir)
    }

    /// Code for a direction.
    pub fn encode(self, dir: Direction) -> u8 {
        match (self, dir) {
            (D8Encoding::Esri, Direction::E) => 1,
            (D8Encoding::Esri, Direction::SE) => 2,
            (D8Encoding::Esri, Direction::S) => 4,
            (D8Encoding::Esri, Direction::SW) => 8,
            (D8Encoding::Esri, Direction::W) => 16,
            (D8Encoding::Esri, Direction::NW) => 32,
            (D8Encoding::Esri, Direction::N) => 64,
            (D8Encoding::Esri, Direction::NE) => 128,
            (D8Encoding::Whitebox, Direction::NE) => 1,
            (D8Encoding::Whitebox, Direction::E) => 2,
            (D8Encoding::Whitebox, Direction::SE) => 4,
            (D8Encoding::Whitebox, Direction::S) => 8,
            (D8Encoding::Whitebox, Direction::SW) => 16,
            (D8Encoding::Whitebox, Direction::W) => 32,
            (D8Encoding::Whitebox, Direction::NW) => 64,
            (D8Encoding::Whitebox, Direction::N) => 128,
        }
    }
}

impl std::fmt::Display for D8Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_roundtrip_both_encodings() {
        for encoding in [D8Encoding::Esri, D8Encoding::Whitebox] {
            for dir in Direction::ALL {
                let code = encoding.encode(dir);
                assert_eq!(encoding.decode(code as f32), Some(dir));
            }
        }
    }

    #[test]
    fn test_esri_and_whitebox_differ() {
        assert_eq!(D8Encoding::Esri.decode(1.0), Some(Direction::E));
        assert_eq!(D8Encoding::Whitebox.decode(1.0), Some(Direction::NE));
        assert_eq!(D8Encoding::Esri.decode(64.0), Some(Direction::N));
        assert_eq!(D8Encoding::Whitebox.decode(128.0), Some(Direction::N));
    }

    #[test]
    fn test_non_contributing_codes() {
        let esri = D8Encoding::Esri;
        assert_eq!(esri.decode(0.0), None);
        assert_eq!(esri.decode(-1.0), None);
        assert_eq!(esri.decode(3.0), None);
        assert_eq!(esri.decode(4.5), None);
        assert_eq!(esri.decode(255.0), None);
        assert_eq!(esri.decode(f32::NAN), None);
    }

    #[test]
    fn test_offsets_are_opposite() {
        for dir in Direction::ALL {
            let (dc, dr) = dir.offset();
            let (oc, or) = dir.opposite().offset();
            assert_eq!((dc + oc, dr + or), (0, 0));
        }
    }

    #[test]
    fn test_encoding_from_str() {
        assert_eq!(D8Encoding::from_str("ESRI"), Some(D8Encoding::Esri));
        assert_eq!(D8Encoding::from_str("whitebox"), Some(D8Encoding::Whitebox));
        assert_eq!(D8Encoding::from_str("taudem"), None);
    }
}
