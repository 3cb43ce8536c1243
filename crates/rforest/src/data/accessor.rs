//! Per-row feature access used by tree traversal.
//!
//! [`SampleAccessor`] is the minimal interface a traversal needs: one
//! feature value by index. It is implemented for plain slices and arrays so
//! single rows can be scored without wrapper types, and for [`TableRow`],
//! a zero-copy handle onto one row of any [`Table`].

use super::Table;

/// Read-only feature access for a single sample (row).
pub trait SampleAccessor {
    /// Get the feature value at the given index.
    fn feature(&self, index: usize) -> f32;

    /// Number of features in this sample.
    fn n_features(&self) -> usize;
}

impl SampleAccessor for [f32] {
    #[inline]
    fn feature(&self, index: usize) -> f32 {
        self[index]
    }

    #[inline]
    fn n_features(&self) -> usize {
        self.len()
    }
}

impl<const N: usize> SampleAccessor for [f32; N] {
    #[inline]
    fn feature(&self, index: usize) -> f32 {
        self[index]
    }

    #[inline]
    fn n_features(&self) -> usize {
        N
    }
}

impl<T: AsRef<[f32]> + ?Sized> SampleAccessor for &T {
    #[inline]
    fn feature(&self, index: usize) -> f32 {
        self.as_ref()[index]
    }

    #[inline]
    fn n_features(&self) -> usize {
        self.as_ref().len()
    }
}

impl SampleAccessor for ndarray::ArrayView1<'_, f32> {
    #[inline]
    fn feature(&self, index: usize) -> f32 {
        self[index]
    }

    #[inline]
    fn n_features(&self) -> usize {
        self.len()
    }
}

/// One row of a [`Table`], borrowed.
#[derive(Clone, Copy)]
pub struct TableRow<'a, T: Table + ?Sized> {
    table: &'a T,
    row: usize,
}

impl<'a, T: Table + ?Sized> TableRow<'a, T> {
    #[inline]
    pub fn new(table: &'a T, row: usize) -> Self {
        debug_assert!(row < table.row_count());
        Self { table, row }
    }
}

impl<T: Table + ?Sized> SampleAccessor for TableRow<'_, T> {
    #[inline]
    fn feature(&self, index: usize) -> f32 {
        self.table.get(self.row, index)
    }

    #[inline]
    fn n_features(&self) -> usize {
        self.table.column_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::HomogenTable;

    #[test]
    fn slices_and_arrays_expose_features() {
        let row = [0.5f32, 1.5, 2.5];
        assert_eq!(row.feature(1), 1.5);
        assert_eq!(row.n_features(), 3);
        assert_eq!((&row[..]).feature(2), 2.5);
    }

    #[test]
    fn table_row_reads_through_table() {
        let table = HomogenTable::from_vec(vec![1.0, 2.0, 3.0, 4.0], 2, 2).unwrap();
        let row = TableRow::new(&table, 1);
        assert_eq!(row.feature(0), 3.0);
        assert_eq!(row.feature(1), 4.0);
        assert_eq!(row.n_features(), 2);
    }
}
