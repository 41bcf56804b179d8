//! Global 384-well position calculation.
//!
//! Four consecutive 96-well plates share one 384-well plate group:
//!
//! ```text
//! Plate 1..=4  → group 0 → positions    1..=384
//! Plate 5..=8  → group 1 → positions  385..=768
//! ...
//! position = floor((Plate - 1) / 4) * 384 + index(384 Well)
//! ```

use super::wells::{well_384_index, WELLS_PER_384_PLATE};
use crate::models::{Dataset, Record, POSITION_COLUMN};

/// Physical plates folded into one 384-well plate group.
pub const PLATES_PER_GROUP: f64 = 4.0;

/// Highest plate group whose positions still fit in a `u64`.
pub const MAX_PLATE_GROUP: u64 = u64::MAX / WELLS_PER_384_PLATE as u64 - 1;

/// Zero-based 384-well plate group for a plate number.
///
/// Plates below 1, non-finite values and plates past [`MAX_PLATE_GROUP`]
/// have no group.
pub fn plate_group(plate: f64) -> Option<u64> {
    if !plate.is_finite() || plate < 1.0 {
        return None;
    }
    let group = ((plate - 1.0) / PLATES_PER_GROUP).floor();
    if group > MAX_PLATE_GROUP as f64 {
        return None;
    }
    Some(group as u64)
}

/// First and last plate number of a plate group, e.g. group 1 → (5, 8).
pub fn plates_in_group(group: u64) -> Option<(u64, u64)> {
    let per_group = PLATES_PER_GROUP as u64;
    let first = group.checked_mul(per_group)?.checked_add(1)?;
    let last = first.checked_add(per_group - 1)?;
    Some((first, last))
}

/// Global position of a well, `None` when either input is missing or invalid.
pub fn global_384_position(plate: Option<f64>, well_384: Option<&str>) -> Option<u64> {
    let group = plate_group(plate?)?;
    let local = well_384_index(well_384?)?;
    group
        .checked_mul(u64::from(WELLS_PER_384_PLATE))?
        .checked_add(u64::from(local))
}

impl Record {
    /// Recompute the derived position from Plate and 384 Well.
    pub fn with_global_position(mut self) -> Self {
        self.global_384_position = global_384_position(self.plate, self.well_384.as_deref());
        self
    }
}

/// Add the derived position to every record.
///
/// The position column is appended to the column list if not already present.
pub fn assign_global_positions(dataset: Dataset) -> Dataset {
    let Dataset { mut columns, records } = dataset;

    if !columns.iter().any(|c| c == POSITION_COLUMN) {
        columns.push(POSITION_COLUMN.to_string());
    }

    let records = records.into_iter().map(Record::with_global_position).collect();
    Dataset::new(columns, records)
}
