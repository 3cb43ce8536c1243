//! Dense numeric tables.
//!
//! The [`Table`] trait is the read-only contract the trainer and the
//! inference engine consume. [`HomogenTable`] is the dense, row-major `f32`
//! implementation used for inputs and for every result table.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::context::{ExecutionContext, Residency};
use crate::error::{Error, Result};

/// Read-only view of an `M × N` numeric matrix.
///
/// Implementations must tolerate concurrent readers.
pub trait Table: Sync {
    /// Number of rows (`M`).
    fn row_count(&self) -> usize;

    /// Number of columns (`N`).
    fn column_count(&self) -> usize;

    /// Element at `(row, column)`.
    fn get(&self, row: usize, column: usize) -> f32;

    /// `true` when the table holds at least one element.
    fn has_data(&self) -> bool {
        self.row_count() > 0 && self.column_count() > 0
    }
}

/// Dense row-major `f32` table.
#[derive(Debug, Clone, PartialEq)]
pub struct HomogenTable {
    /// Shape: `[row_count, column_count]`.
    data: Array2<f32>,
    residency: Residency,
}

impl HomogenTable {
    /// A table with no rows and no columns.
    pub fn empty() -> Self {
        Self {
            data: Array2::zeros((0, 0)),
            residency: Residency::Host,
        }
    }

    /// Host-resident table from a row-major buffer.
    ///
    /// # Errors
    ///
    /// [`Error::Data`] if `data.len() != row_count * column_count`.
    pub fn from_vec(data: Vec<f32>, row_count: usize, column_count: usize) -> Result<Self> {
        let len = data.len();
        let data = Array2::from_shape_vec((row_count, column_count), data).map_err(|_| {
            Error::data(format!(
                "buffer of length {len} cannot be viewed as {row_count}x{column_count}"
            ))
        })?;
        Ok(Self::from_array(data))
    }

    /// Host-resident table from a row-major slice (copied).
    pub fn from_slice(data: &[f32], row_count: usize, column_count: usize) -> Result<Self> {
        Self::from_vec(data.to_vec(), row_count, column_count)
    }

    /// Host-resident table wrapping an existing array.
    pub fn from_array(data: Array2<f32>) -> Self {
        Self {
            data,
            residency: Residency::Host,
        }
    }

    /// Table resident on `ctx`'s backend, from a row-major slice.
    ///
    /// This is how accelerator-resident inputs are created.
    pub fn on(
        ctx: &ExecutionContext,
        data: &[f32],
        row_count: usize,
        column_count: usize,
    ) -> Result<Self> {
        Ok(Self::from_slice(data, row_count, column_count)?.with_residency(ctx.residency()))
    }

    /// Single-column table (`M × 1`).
    pub fn column_vector(values: Vec<f32>) -> Self {
        Self::from_array(Array1::from_vec(values).insert_axis(Axis(1)))
    }

    /// Single-row table (`1 × N`).
    pub fn row_vector(values: Vec<f32>) -> Self {
        Self::from_array(Array1::from_vec(values).insert_axis(Axis(0)))
    }

    /// Re-tag the residency of this table.
    pub fn with_residency(mut self, residency: Residency) -> Self {
        self.residency = residency;
        self
    }

    #[inline]
    pub fn residency(&self) -> Residency {
        self.residency
    }

    #[inline]
    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }

    #[inline]
    pub fn row(&self, row: usize) -> ArrayView1<'_, f32> {
        self.data.row(row)
    }

    #[inline]
    pub fn column(&self, column: usize) -> ArrayView1<'_, f32> {
        self.data.column(column)
    }

    /// Row-major copy of all elements.
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }

    pub fn into_array(self) -> Array2<f32> {
        self.data
    }
}

impl Default for HomogenTable {
    fn default() -> Self {
        Self::empty()
    }
}

impl Table for HomogenTable {
    #[inline]
    fn row_count(&self) -> usize {
        self.data.nrows()
    }

    #[inline]
    fn column_count(&self) -> usize {
        self.data.ncols()
    }

    #[inline]
    fn get(&self, row: usize, column: usize) -> f32 {
        self.data[[row, column]]
    }
}

impl Table for ArrayView2<'_, f32> {
    #[inline]
    fn row_count(&self) -> usize {
        self.nrows()
    }

    #[inline]
    fn column_count(&self) -> usize {
        self.ncols()
    }

    #[inline]
    fn get(&self, row: usize, column: usize) -> f32 {
        self[[row, column]]
    }
}
