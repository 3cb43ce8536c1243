//! Tabular input and output containers.

mod accessor;
mod table;

pub use accessor::{SampleAccessor, TableRow};
pub use table::{HomogenTable, Table};
