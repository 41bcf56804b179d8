//! Stable re-ordering of sortable records.
//!
//! Only rows with Plate, 96 Well and 384 Well all present take part in the
//! sort. Every other row stays in its slot:
//!
//! ```text
//! original:  S  S  -  S  -       (S = sortable slot, - = incomplete row)
//! sorted:    a  b     c
//! result:    a  b  -  c  -
//! ```

use std::cmp::Ordering;

use super::wells::Well96Key;
use crate::error::{SortError, SortResult};
use crate::models::{Dataset, Record, ViewMode};

/// Clone the sortable records, in original order.
pub fn extract_sortable(dataset: &Dataset) -> Vec<Record> {
    dataset
        .records
        .iter()
        .filter(|r| r.is_sortable())
        .cloned()
        .collect()
}

/// Stable sort by Plate ascending, then 96-well key.
pub fn sort_by_96_layout(records: &mut [Record]) {
    records.sort_by_cached_key(|record| {
        let key = record
            .well_96
            .as_deref()
            .map(Well96Key::parse)
            .unwrap_or(Well96Key::UNRECOGNIZED);
        (PlateKey(record.plate), key)
    });
}

/// Stable sort by global 384-well position; records without one go last.
pub fn sort_by_384_layout(records: &mut [Record]) {
    records.sort_by(|a, b| compare_nulls_last(a.global_384_position, b.global_384_position));
}

fn compare_nulls_last(a: Option<u64>, b: Option<u64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Total order over plate numbers, missing plates last.
#[derive(Debug, Clone, Copy)]
struct PlateKey(Option<f64>);

impl PartialEq for PlateKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PlateKey {}

impl PartialOrd for PlateKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PlateKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0, other.0) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

/// Put `sorted` back into the sortable slots of `original`.
///
/// Incomplete rows are emitted unchanged at their original index. Fails if the
/// number of sorted records differs from the number of sortable slots.
pub fn inject_sorted_back(original: &Dataset, sorted: Vec<Record>) -> SortResult<Dataset> {
    let slots = original.sortable_count();
    if slots != sorted.len() {
        return Err(SortError::CardinalityMismatch { slots, sorted: sorted.len() });
    }

    let mut sorted_iter = sorted.into_iter();
    let mut records = Vec::with_capacity(original.len());

    for record in &original.records {
        if record.is_sortable() {
            let next = sorted_iter
                .next()
                .ok_or(SortError::CardinalityMismatch { slots, sorted: records.len() })?;
            records.push(next);
        } else {
            records.push(record.clone());
        }
    }

    Ok(Dataset::new(original.columns.clone(), records))
}

/// Sort a dataset for the given view mode, keeping incomplete rows in place.
///
/// Positions must already be assigned for [`ViewMode::Layout384`] to be
/// meaningful; see [`super::assign_global_positions`].
pub fn sort_by_view_mode(dataset: &Dataset, mode: ViewMode) -> SortResult<Dataset> {
    let mut sortable = extract_sortable(dataset);

    match mode {
        ViewMode::Layout96 => sort_by_96_layout(&mut sortable),
        ViewMode::Layout384 => sort_by_384_layout(&mut sortable),
    }

    inject_sorted_back(dataset, sortable)
}
