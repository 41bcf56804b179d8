//! Well label handling for both plate formats.
//!
//! - 384-well labels map to a 1-based row-major index (A1 = 1, A24 = 24,
//!   B1 = 25, ..., P24 = 384) through a table built once.
//! - 96-well labels parse into a [`Well96Key`] used as the in-plate sort key.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Row letters of a 384-well plate.
pub const ROWS_384: &str = "ABCDEFGHIJKLMNOP";

/// Columns per row on a 384-well plate.
pub const COLUMNS_384: u16 = 24;

/// Wells on one 384-well plate.
pub const WELLS_PER_384_PLATE: u16 = 384;

static WELL_384_INDEX: Lazy<HashMap<String, u16>> = Lazy::new(|| {
    let mut index = HashMap::with_capacity(WELLS_PER_384_PLATE as usize);
    let mut position = 1;
    for row in ROWS_384.chars() {
        for column in 1..=COLUMNS_384 {
            index.insert(format!("{}{}", row, column), position);
            position += 1;
        }
    }
    index
});

// Anchored at the start only: trailing characters are ignored.
static WELL_96_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-H])([0-9]{1,2})").expect("valid 96-well pattern"));

/// 1-based row-major index of a 384-well label, `None` if unrecognized.
///
/// Lookup is exact: `"a1"` and `"A01"` are not recognized.
pub fn well_384_index(label: &str) -> Option<u16> {
    WELL_384_INDEX.get(label).copied()
}

/// Sort key for a 96-well label: row letter, then column number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Well96Key {
    pub row: char,
    pub column: u8,
}

impl Well96Key {
    /// Key given to labels that do not parse; sorts after every real well.
    pub const UNRECOGNIZED: Well96Key = Well96Key { row: 'Z', column: 99 };

    /// Parse a label such as `"B3"`; unparseable labels get [`Self::UNRECOGNIZED`].
    pub fn parse(label: &str) -> Self {
        WELL_96_PATTERN
            .captures(label)
            .and_then(|caps| {
                let row = caps.get(1)?.as_str().chars().next()?;
                let column = caps.get(2)?.as_str().parse().ok()?;
                Some(Well96Key { row, column })
            })
            .unwrap_or(Self::UNRECOGNIZED)
    }

    pub fn is_recognized(&self) -> bool {
        *self != Self::UNRECOGNIZED
    }
}
