//! # Location Codec
//!
//! Bidirectional mapping between human-readable bin locations and linear
//! relay matrix indexes.
//!
//! ## The Addressing Scheme
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     8×4 Relay Matrix Addressing                         │
//! │                                                                         │
//! │          col 1   col 2   col 3   col 4                                 │
//! │  row A │   0   │   1   │   2   │   3   │                               │
//! │  row B │   4   │   5   │   6   │   7   │                               │
//! │  row C │   8   │   9   │  10   │  11   │   ◄── "C2" = 2*4 + 1 = 9     │
//! │  row D │  12   │  13   │  14   │  15   │                               │
//! │  row E │  16   │  17   │  18   │  19   │                               │
//! │  row F │  20   │  21   │  22   │  23   │                               │
//! │  row G │  24   │  25   │  26   │  27   │                               │
//! │  row H │  28   │  29   │  30   │  31   │                               │
//! │                                                                         │
//! │  index = (letter - 'A') * 4 + (digit - 1)                              │
//! │                                                                         │
//! │  The mapping is a bijection over the 32 valid codes:                   │
//! │  from_index(code.index()) == code, always.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use vendo_core::location::LocationCode;
//!
//! let loc: LocationCode = "c2".parse().unwrap(); // case-insensitive
//! assert_eq!(loc.index(), 9);
//! assert_eq!(loc.to_string(), "C2"); // canonical uppercase
//! assert_eq!(LocationCode::from_index(9).unwrap(), loc);
//! ```

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};
use crate::{BIN_COUNT, MATRIX_COLS, MATRIX_ROWS};

// =============================================================================
// LocationCode
// =============================================================================

/// A validated bin location: row letter `A`..`H` plus column digit `1`..`4`.
///
/// ## Invariants
/// - `row` is always in `0..8`, `col` always in `0..4` - the constructors
///   are the only way to build one, so an existing value is always valid.
/// - Never mutated after parsing; only translated to/from a matrix index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocationCode {
    row: u8,
    col: u8,
}

impl LocationCode {
    /// Builds a location from zero-based row and column indexes.
    ///
    /// Fails with `IndexOutOfRange` when either axis is outside the matrix.
    pub fn new(row: u8, col: u8) -> CoreResult<Self> {
        if row >= MATRIX_ROWS {
            return Err(CoreError::IndexOutOfRange {
                index: row as usize,
                max: MATRIX_ROWS as usize,
            });
        }
        if col >= MATRIX_COLS {
            return Err(CoreError::IndexOutOfRange {
                index: col as usize,
                max: MATRIX_COLS as usize,
            });
        }
        Ok(LocationCode { row, col })
    }

    /// Decodes a linear matrix index (`0..32`) back into a location.
    ///
    /// Inverse of [`LocationCode::index`]:
    /// `from_index(x.index()) == x` for every valid location.
    pub fn from_index(index: usize) -> CoreResult<Self> {
        if index >= BIN_COUNT as usize {
            return Err(CoreError::IndexOutOfRange {
                index,
                max: BIN_COUNT as usize,
            });
        }
        Ok(LocationCode {
            row: (index / MATRIX_COLS as usize) as u8,
            col: (index % MATRIX_COLS as usize) as u8,
        })
    }

    /// Encodes this location to its linear matrix index in `[0, 32)`.
    ///
    /// ## Formula
    /// `index = row * 4 + col` where `A` → row 0 and digit `1` → col 0.
    #[inline]
    pub const fn index(&self) -> usize {
        self.row as usize * MATRIX_COLS as usize + self.col as usize
    }

    /// Zero-based row index (`A` = 0 … `H` = 7).
    #[inline]
    pub const fn row(&self) -> u8 {
        self.row
    }

    /// Zero-based column index (`1` = 0 … `4` = 3).
    #[inline]
    pub const fn col(&self) -> u8 {
        self.col
    }

    /// The row letter of the canonical form (`A`..`H`).
    #[inline]
    pub const fn row_letter(&self) -> char {
        (b'A' + self.row) as char
    }

    /// The column digit of the canonical form (`1`..`4`).
    #[inline]
    pub const fn col_digit(&self) -> char {
        (b'1' + self.col) as char
    }
}

// =============================================================================
// Parsing
// =============================================================================

impl FromStr for LocationCode {
    type Err = CoreError;

    /// Parses a two-character code like `"C2"` (case-insensitive).
    ///
    /// Fails with `InvalidLocation` when the string is not exactly two
    /// characters, the letter is outside `A`-`H`, or the digit is outside
    /// `1`-`4`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| CoreError::InvalidLocation {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let mut chars = s.chars();
        let (letter, digit) = match (chars.next(), chars.next(), chars.next()) {
            (Some(l), Some(d), None) => (l, d),
            _ => return Err(invalid("must be exactly 2 characters")),
        };

        let letter = letter.to_ascii_uppercase();
        if !('A'..='H').contains(&letter) {
            return Err(invalid("row letter must be A-H"));
        }
        if !('1'..='4').contains(&digit) {
            return Err(invalid("column digit must be 1-4"));
        }

        Ok(LocationCode {
            row: letter as u8 - b'A',
            col: digit as u8 - b'1',
        })
    }
}

/// Renders the canonical uppercase form (`"C2"`).
impl fmt::Display for LocationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row_letter(), self.col_digit())
    }
}

// =============================================================================
// Serde (round-trips as the 2-character string)
// =============================================================================
// The catalog file stores locations as the plain 2-character string:
// `"location": "A1"`. Custom impls keep that wire shape while still parsing
// through the validating constructor.

impl Serialize for LocationCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LocationCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_codes() {
        let a1: LocationCode = "A1".parse().unwrap();
        assert_eq!(a1.index(), 0);

        let b1: LocationCode = "B1".parse().unwrap();
        assert_eq!(b1.index(), 4);

        let c2: LocationCode = "C2".parse().unwrap();
        assert_eq!(c2.index(), 9);

        let h4: LocationCode = "H4".parse().unwrap();
        assert_eq!(h4.index(), 31);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let lower: LocationCode = "c2".parse().unwrap();
        let upper: LocationCode = "C2".parse().unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.to_string(), "C2");
    }

    #[test]
    fn test_parse_rejects_malformed_codes() {
        for bad in ["", "A", "A9", "A0", "Z1", "11", "1A", "C22", " C2"] {
            assert!(
                bad.parse::<LocationCode>().is_err(),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn test_roundtrip_all_32_codes() {
        // decode(encode(x)) == x over the full matrix
        for row in b'A'..=b'H' {
            for col in b'1'..=b'4' {
                let code = format!("{}{}", row as char, col as char);
                let loc: LocationCode = code.parse().unwrap();
                assert_eq!(LocationCode::from_index(loc.index()).unwrap(), loc);
                assert_eq!(loc.to_string(), code);
            }
        }
    }

    #[test]
    fn test_encode_is_injective() {
        let mut seen = std::collections::HashSet::new();
        for row in b'A'..=b'H' {
            for col in b'1'..=b'4' {
                let loc: LocationCode = format!("{}{}", row as char, col as char)
                    .parse()
                    .unwrap();
                assert!(seen.insert(loc.index()), "duplicate index {}", loc.index());
            }
        }
        assert_eq!(seen.len(), 32);
    }

    #[test]
    fn test_from_index_rejects_out_of_range() {
        assert!(LocationCode::from_index(32).is_err());
        assert!(LocationCode::from_index(100).is_err());
        assert!(matches!(
            LocationCode::from_index(32),
            Err(CoreError::IndexOutOfRange { index: 32, max: 32 })
        ));
    }

    #[test]
    fn test_new_rejects_out_of_range_axes() {
        assert!(LocationCode::new(8, 0).is_err());
        assert!(LocationCode::new(0, 4).is_err());
        assert!(LocationCode::new(7, 3).is_ok());
    }

    #[test]
    fn test_serde_string_shape() {
        let loc: LocationCode = "C2".parse().unwrap();
        assert_eq!(serde_json::to_string(&loc).unwrap(), "\"C2\"");

        let back: LocationCode = serde_json::from_str("\"c2\"").unwrap();
        assert_eq!(back, loc);

        assert!(serde_json::from_str::<LocationCode>("\"Z9\"").is_err());
    }
}
