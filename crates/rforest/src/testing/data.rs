use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data::HomogenTable;
use crate::error::Result;

/// Generate random dense features in row-major order.
///
/// Values are uniform in `[min, max)`.
pub fn random_dense_f32(rows: usize, cols: usize, seed: u64, min: f32, max: f32) -> Vec<f32> {
    assert!(max >= min);
    let mut rng = StdRng::seed_from_u64(seed);
    let width = max - min;
    (0..rows * cols)
        .map(|_| min + rng.gen::<f32>() * width)
        .collect()
}

/// Regression targets as a linear function of the features plus uniform noise.
///
/// The first feature always carries the largest weight. Returns
/// `(targets, weights)`.
pub fn synthetic_regression_targets(
    features_row_major: &[f32],
    rows: usize,
    cols: usize,
    seed: u64,
    noise_amplitude: f32,
) -> (Vec<f32>, Vec<f32>) {
    assert_eq!(features_row_major.len(), rows * cols);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut weights: Vec<f32> = (0..cols).map(|_| rng.gen::<f32>() * 0.5).collect();
    if let Some(first) = weights.first_mut() {
        *first = 2.0;
    }

    let targets = features_row_major
        .chunks(cols.max(1))
        .take(rows)
        .map(|row| {
            let y: f32 = row.iter().zip(&weights).map(|(x, w)| x * w).sum();
            if noise_amplitude > 0.0 {
                y + (rng.gen::<f32>() * 2.0 - 1.0) * noise_amplitude
            } else {
                y
            }
        })
        .collect();

    (targets, weights)
}

/// Small two-feature regression problem with a held-out set.
///
/// The target grows smoothly with both features; a forest trained with
/// default settings predicts the held-out rows with an MSE well under
/// [`ReferenceDataset::MSE_THRESHOLD`].
#[derive(Debug, Clone)]
pub struct ReferenceDataset {
    pub x_train: HomogenTable,
    pub y_train: HomogenTable,
    pub x_test: HomogenTable,
    pub y_test: HomogenTable,
}

impl ReferenceDataset {
    pub const MSE_THRESHOLD: f64 = 0.05;
}

const X_TRAIN: [f32; 20] = [
    0.1, 0.25, 0.15, 0.35, 0.25, 0.55, 0.3, 0.65, 0.4, 0.85, 0.45, 0.95, 0.55, 1.15, 0.6, 1.25,
    0.7, 1.45, 0.8, 1.65,
];
const Y_TRAIN: [f32; 10] = [
    0.0079, 0.0160, 0.0407, 0.0573, 0.0989, 0.1240, 0.1827, 0.2163, 0.2919, 0.3789,
];
const X_TEST: [f32; 10] = [0.2, 0.45, 0.35, 0.75, 0.5, 1.05, 0.65, 1.35, 0.75, 1.55];
const Y_TEST: [f32; 5] = [0.0269, 0.0767, 0.1519, 0.2527, 0.3340];

/// The 10-row training / 5-row test reference dataset.
pub fn reference_dataset() -> Result<ReferenceDataset> {
    Ok(ReferenceDataset {
        x_train: HomogenTable::from_slice(&X_TRAIN, 10, 2)?,
        y_train: HomogenTable::column_vector(Y_TRAIN.to_vec()),
        x_test: HomogenTable::from_slice(&X_TEST, 5, 2)?,
        y_test: HomogenTable::column_vector(Y_TEST.to_vec()),
    })
}
