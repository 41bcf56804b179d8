//! Transformation module.
//!
//! This module handles the plate layout conversion:
//! - Wells: 384-well index table and 96-well sort keys
//! - Position: Global 384-well position per record
//! - Sorter: Stable sort and re-injection into original slots
//! - Pipeline: Load, validate, position, sort

pub mod pipeline;
pub mod position;
pub mod sorter;
pub mod wells;

pub use pipeline::*;
pub use position::{assign_global_positions, global_384_position, plate_group, plates_in_group};
pub use sorter::{extract_sortable, inject_sorted_back, sort_by_view_mode};
pub use wells::{well_384_index, Well96Key};
