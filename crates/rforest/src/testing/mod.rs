//! Test helpers: deterministic synthetic data and reference datasets.
//!
//! Used by unit tests, the integration suites and the benchmarks.

mod data;

pub use data::{random_dense_f32, reference_dataset, synthetic_regression_targets, ReferenceDataset};

use crate::data::HomogenTable;
use crate::error::Result;

/// Random `rows × cols` feature table with a noisy linear target.
///
/// Returns `(x, y)`; values of `x` are uniform in `[0, 1)`.
pub fn synthetic_regression(
    rows: usize,
    cols: usize,
    seed: u64,
    noise_amplitude: f32,
) -> Result<(HomogenTable, HomogenTable)> {
    let features = random_dense_f32(rows, cols, seed, 0.0, 1.0);
    let (targets, _) =
        synthetic_regression_targets(&features, rows, cols, seed.wrapping_add(1), noise_amplitude);
    let x = HomogenTable::from_vec(features, rows, cols)?;
    Ok((x, HomogenTable::column_vector(targets)))
}

/// Mean squared error between two equally long slices.
pub fn mean_squared_error(predicted: &[f32], expected: &[f32]) -> f64 {
    assert_eq!(predicted.len(), expected.len());
    if predicted.is_empty() {
        return 0.0;
    }
    let sum: f64 = predicted
        .iter()
        .zip(expected)
        .map(|(&p, &e)| {
            let d = p as f64 - e as f64;
            d * d
        })
        .sum();
    sum / predicted.len() as f64
}
