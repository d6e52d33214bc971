//! Census ACS loading and joining.
//!
//! Each ACS export is narrowed to the columns in its [`TableSpec`], keyed by
//! the ZCTA code extracted from the `NAME` label, coerced to numbers, and
//! left-joined onto the ZCTA layer.

pub mod join;
pub mod label;
pub mod sources;
pub mod table;

pub use join::{JoinReport, left_join};
pub use table::{CensusTable, ColumnSpec, Coercion, TableSpec};
