//! Feature bucketing and per-node histograms.
//!
//! Training never compares raw feature values while growing a tree. Each
//! feature is cut once per training call into equal-frequency buckets
//! ([`BinCuts`]), the feature matrix is translated into bucket indices once
//! ([`BinnedMatrix`]), and every node then accumulates target statistics
//! per bucket ([`NodeHistogram`]).
//!
//! # Numerics
//!
//! Bucket statistics are kept as `(count, mean, m2)` where `m2` is the
//! centred sum of squares, updated with Welford's recurrence and combined
//! with Chan's pairwise formula. Nothing computes `Σy² − (Σy)²/n`, so
//! targets with a large offset and a tiny spread keep their precision.

use crate::data::Table;
use crate::utils::Parallelism;

// ============================================================================
// BinStats
// ============================================================================

/// Running target statistics of a set of observations.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BinStats {
    count: u32,
    mean: f64,
    m2: f64,
}

impl BinStats {
    /// Statistics of a single observation.
    #[inline]
    pub fn single(y: f64) -> Self {
        Self {
            count: 1,
            mean: y,
            m2: 0.0,
        }
    }

    /// Add one observation (Welford).
    #[inline]
    pub fn push(&mut self, y: f64) {
        self.count += 1;
        let delta = y - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (y - self.mean);
    }

    /// Combine two disjoint sets of observations (Chan et al.).
    #[inline]
    pub fn merge(&self, other: &Self) -> Self {
        if other.count == 0 {
            return *self;
        }
        if self.count == 0 {
            return *other;
        }
        let n_a = self.count as f64;
        let n_b = other.count as f64;
        let n = n_a + n_b;
        let delta = other.mean - self.mean;
        Self {
            count: self.count + other.count,
            mean: self.mean + delta * (n_b / n),
            m2: self.m2 + other.m2 + delta * delta * (n_a * n_b / n),
        }
    }

    #[inline]
    pub fn merge_in(&mut self, other: &Self) {
        *self = self.merge(other);
    }

    /// Increase of `m2` caused by pooling `self` with `other`.
    ///
    /// Equals `m2(self ∪ other) − m2(self) − m2(other)` without the
    /// cancellation of computing it that way.
    #[inline]
    pub fn pooling_gain(&self, other: &Self) -> f64 {
        if self.count == 0 || other.count == 0 {
            return 0.0;
        }
        let n_a = self.count as f64;
        let n_b = other.count as f64;
        let delta = other.mean - self.mean;
        delta * delta * (n_a * n_b / (n_a + n_b))
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Centred sum of squares, `Σ(y − mean)²`.
    #[inline]
    pub fn m2(&self) -> f64 {
        self.m2
    }

    /// Population variance, `m2 / count` (0 when empty).
    #[inline]
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    #[inline]
    pub fn sum(&self) -> f64 {
        self.mean * self.count as f64
    }

    #[inline]
    pub fn sum_of_squares(&self) -> f64 {
        self.m2 + self.mean * self.mean * self.count as f64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl FromIterator<f64> for BinStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = Self::default();
        for y in iter {
            stats.push(y);
        }
        stats
    }
}

// ============================================================================
// BinCuts
// ============================================================================

/// Equal-frequency bucket boundaries for all features.
///
/// Stores the ascending lower bound of every bucket in a CSR-like layout:
/// - `lower_bounds`: all lower bounds concatenated
/// - `ptrs`: offsets into `lower_bounds` for each feature
///
/// A value `v` of feature `f` falls into bucket `b` iff
/// `lower[b] <= v < lower[b + 1]`. The first lower bound of a feature is
/// its minimum training value; a constant feature has one bucket.
///
/// ```text
/// ptrs:          [0, 3, 4]
/// lower_bounds:  [0.1, 0.4, 0.8,   ← Feature 0: 3 buckets
///                 2.0]             ← Feature 1: constant, 1 bucket
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BinCuts {
    lower_bounds: Box<[f32]>,
    ptrs: Box<[usize]>,
}

impl BinCuts {
    /// Compute equal-frequency cuts for every column of `table`.
    ///
    /// Bucket target size is `max(ceil(n / max_bins), min_bin_size)`. Runs
    /// of equal values never straddle a boundary, and a trailing bucket
    /// smaller than `min_bin_size` is merged into its predecessor. Every
    /// feature therefore gets at most `max_bins` buckets and, when it has
    /// at least `min_bin_size` rows, no bucket smaller than `min_bin_size`.
    ///
    /// Values must be finite.
    pub fn compute<T: Table + ?Sized>(
        table: &T,
        max_bins: usize,
        min_bin_size: usize,
        parallelism: Parallelism,
    ) -> Self {
        let n_rows = table.row_count();
        let n_features = table.column_count();

        let per_feature: Vec<Vec<f32>> = parallelism.maybe_par_map(0..n_features, |f| {
            let mut values: Vec<f32> = (0..n_rows).map(|r| table.get(r, f)).collect();
            values.sort_unstable_by(f32::total_cmp);
            equal_frequency_bounds(&values, max_bins, min_bin_size)
        });

        let mut ptrs = Vec::with_capacity(n_features + 1);
        ptrs.push(0usize);
        let total: usize = per_feature.iter().map(Vec::len).sum();
        let mut lower_bounds = Vec::with_capacity(total);
        for bounds in per_feature {
            lower_bounds.extend_from_slice(&bounds);
            ptrs.push(lower_bounds.len());
        }

        Self {
            lower_bounds: lower_bounds.into_boxed_slice(),
            ptrs: ptrs.into_boxed_slice(),
        }
    }

    /// Number of features.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.ptrs.len() - 1
    }

    /// Lower bounds of the buckets of `feature`.
    #[inline]
    pub fn lower_bounds(&self, feature: usize) -> &[f32] {
        let start = self.ptrs[feature];
        let end = self.ptrs[feature + 1];
        &self.lower_bounds[start..end]
    }

    /// Number of buckets of `feature`.
    #[inline]
    pub fn n_bins(&self, feature: usize) -> usize {
        self.ptrs[feature + 1] - self.ptrs[feature]
    }

    /// Total bucket count over all features.
    #[inline]
    pub fn total_bins(&self) -> usize {
        self.lower_bounds.len()
    }

    /// Bucket of `value` for `feature`.
    ///
    /// Values below the first bound map to bucket 0.
    #[inline]
    pub fn bin_of(&self, feature: usize, value: f32) -> u32 {
        let lowers = self.lower_bounds(feature);
        lowers.partition_point(|&l| l <= value).saturating_sub(1) as u32
    }

    /// Split threshold between bucket `bin` and bucket `bin + 1`.
    ///
    /// A value goes left of this threshold iff it lies in a bucket `<= bin`.
    #[inline]
    pub fn threshold(&self, feature: usize, bin: usize) -> f32 {
        self.lower_bounds(feature)[bin + 1]
    }
}

/// Lower bounds of equal-frequency buckets over `sorted` values.
fn equal_frequency_bounds(sorted: &[f32], max_bins: usize, min_bin_size: usize) -> Vec<f32> {
    let n = sorted.len();
    if n == 0 {
        return Vec::new();
    }
    let target = n.div_ceil(max_bins.max(1)).max(min_bin_size).max(1);

    let mut bounds = vec![sorted[0]];
    let mut end = target;
    while end < n {
        // Extend over ties so equal values share a bucket.
        while end < n && sorted[end] == sorted[end - 1] {
            end += 1;
        }
        if end >= n || n - end < min_bin_size {
            break;
        }
        bounds.push(sorted[end]);
        end += target;
    }
    bounds
}

// ============================================================================
// BinnedMatrix
// ============================================================================

/// Feature matrix translated into bucket indices, column-major.
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    bins: Box<[u32]>,
    n_rows: usize,
    n_features: usize,
}

impl BinnedMatrix {
    /// Bucket every value of `table` with `cuts`, one feature per task.
    pub fn from_table<T: Table + ?Sized>(table: &T, cuts: &BinCuts, parallelism: Parallelism) -> Self {
        let n_rows = table.row_count();
        let n_features = table.column_count();
        let mut bins = vec![0u32; n_rows * n_features];
        if n_rows > 0 {
            parallelism.maybe_par_chunks_mut(&mut bins, n_rows, |feature, column| {
                for (row, bin) in column.iter_mut().enumerate() {
                    *bin = cuts.bin_of(feature, table.get(row, feature));
                }
            });
        }
        Self {
            bins: bins.into_boxed_slice(),
            n_rows,
            n_features,
        }
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Bucket indices of one feature, indexed by row.
    #[inline]
    pub fn feature_bins(&self, feature: usize) -> &[u32] {
        &self.bins[feature * self.n_rows..(feature + 1) * self.n_rows]
    }
}

// ============================================================================
// NodeHistogram
// ============================================================================

/// Per-bucket target statistics of one node, for its candidate features.
#[derive(Debug, Clone)]
pub struct NodeHistogram {
    features: Vec<u32>,
    /// `offsets[i]..offsets[i + 1]` is the bucket range of `features[i]`.
    offsets: Vec<usize>,
    stats: Vec<BinStats>,
}

impl NodeHistogram {
    /// Accumulate `targets[row]` for every row of the node.
    pub fn build(
        binned: &BinnedMatrix,
        cuts: &BinCuts,
        targets: &[f64],
        rows: &[u32],
        features: &[u32],
    ) -> Self {
        let mut offsets = Vec::with_capacity(features.len() + 1);
        offsets.push(0);
        for &f in features {
            let last = offsets[offsets.len() - 1];
            offsets.push(last + cuts.n_bins(f as usize));
        }
        let mut stats = vec![BinStats::default(); offsets[features.len()]];

        for (i, &f) in features.iter().enumerate() {
            let column = binned.feature_bins(f as usize);
            let slots = &mut stats[offsets[i]..offsets[i + 1]];
            for &row in rows {
                let row = row as usize;
                slots[column[row] as usize].push(targets[row]);
            }
        }

        Self {
            features: features.to_vec(),
            offsets,
            stats,
        }
    }

    /// Candidate features, in the order they were given.
    #[inline]
    pub fn features(&self) -> &[u32] {
        &self.features
    }

    /// Bucket statistics of the `i`-th candidate feature.
    #[inline]
    pub fn feature_stats(&self, i: usize) -> &[BinStats] {
        &self.stats[self.offsets[i]..self.offsets[i + 1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::HomogenTable;
    use approx::assert_relative_eq;

    fn cuts_for(values: &[f32], max_bins: usize, min_bin_size: usize) -> Vec<f32> {
        let table = HomogenTable::column_vector(values.to_vec());
        let cuts = BinCuts::compute(&table, max_bins, min_bin_size, Parallelism::Sequential);
        cuts.lower_bounds(0).to_vec()
    }

    #[test]
    fn welford_matches_two_pass() {
        let ys = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let stats: BinStats = ys.iter().copied().collect();
        assert_eq!(stats.count(), 8);
        assert_relative_eq!(stats.mean(), 5.0);
        assert_relative_eq!(stats.m2(), 32.0);
        assert_relative_eq!(stats.variance(), 4.0);
        assert_relative_eq!(stats.sum(), 40.0);
        assert_relative_eq!(stats.sum_of_squares(), 232.0);
    }

    #[test]
    fn merge_matches_sequential_push() {
        let a: BinStats = [1.0, 2.0, 3.0].into_iter().collect();
        let b: BinStats = [10.0, 11.0].into_iter().collect();
        let all: BinStats = [1.0, 2.0, 3.0, 10.0, 11.0].into_iter().collect();
        let merged = a.merge(&b);
        assert_eq!(merged.count(), 5);
        assert_relative_eq!(merged.mean(), all.mean(), epsilon = 1e-12);
        assert_relative_eq!(merged.m2(), all.m2(), epsilon = 1e-12);
        assert_relative_eq!(a.pooling_gain(&b), merged.m2() - a.m2() - b.m2(), epsilon = 1e-12);
        assert_eq!(a.merge(&BinStats::default()), a);
        assert_eq!(BinStats::default().merge(&b), b);
    }

    #[test]
    fn large_offset_keeps_precision() {
        // Naive sum-of-squares loses the spread entirely at this offset.
        let offset = 1e9;
        let stats: BinStats = [offset + 4.0, offset + 7.0, offset + 13.0, offset + 16.0]
            .into_iter()
            .collect();
        assert_relative_eq!(stats.variance(), 22.5, epsilon = 1e-6);
    }

    #[test]
    fn equal_frequency_cuts() {
        let values: Vec<f32> = (0..12).map(|i| i as f32).collect();
        assert_eq!(cuts_for(&values, 3, 1), vec![0.0, 4.0, 8.0]);
        assert_eq!(cuts_for(&values, 256, 1).len(), 12);
    }

    #[test]
    fn min_bin_size_limits_buckets() {
        let values: Vec<f32> = (0..12).map(|i| i as f32).collect();
        // Target size 5: buckets of 5 and 7 (trailing 2 merged).
        assert_eq!(cuts_for(&values, 256, 5), vec![0.0, 5.0]);
        // Fewer rows than the minimum: one bucket.
        assert_eq!(cuts_for(&values[..3], 256, 5), vec![0.0]);
    }

    #[test]
    fn ties_never_straddle_a_boundary() {
        let values = [1.0, 1.0, 1.0, 1.0, 2.0, 3.0, 3.0, 3.0];
        // Target size 2: the run of 3.0 pulls the second bucket up to the end.
        assert_eq!(cuts_for(&values, 4, 1), vec![1.0, 2.0]);
        assert_eq!(cuts_for(&values, 8, 1), vec![1.0, 2.0, 3.0]);

        let table = HomogenTable::column_vector(values.to_vec());
        let cuts = BinCuts::compute(&table, 8, 1, Parallelism::Sequential);
        assert_eq!(cuts.bin_of(0, 1.0), 0);
        assert_eq!(cuts.bin_of(0, 2.5), 1);
        assert_eq!(cuts.bin_of(0, 3.0), 2);
        assert_eq!(cuts.threshold(0, 0), 2.0);
    }

    #[test]
    fn constant_feature_has_one_bucket() {
        assert_eq!(cuts_for(&[5.0; 20], 16, 1), vec![5.0]);
    }

    #[test]
    fn bucket_count_bounded_by_max_bins() {
        let values: Vec<f32> = (0..1000).map(|i| (i % 97) as f32 * 0.5).collect();
        for max_bins in [2, 3, 7, 64] {
            assert!(cuts_for(&values, max_bins, 1).len() <= max_bins);
        }
    }

    #[test]
    fn binned_matrix_and_histogram() {
        let table = HomogenTable::from_vec(
            vec![0.0, 5.0, 1.0, 5.0, 2.0, 5.0, 3.0, 5.0],
            4,
            2,
        )
        .unwrap();
        let cuts = BinCuts::compute(&table, 2, 1, Parallelism::Parallel);
        assert_eq!(cuts.n_features(), 2);
        assert_eq!(cuts.n_bins(0), 2);
        assert_eq!(cuts.n_bins(1), 1);
        assert_eq!(cuts.total_bins(), 3);

        let binned = BinnedMatrix::from_table(&table, &cuts, Parallelism::Parallel);
        assert_eq!(binned.feature_bins(0), &[0, 0, 1, 1]);
        assert_eq!(binned.feature_bins(1), &[0, 0, 0, 0]);

        let targets = [1.0, 3.0, 10.0, 20.0];
        let hist = NodeHistogram::build(&binned, &cuts, &targets, &[0, 1, 2, 3, 3], &[0, 1]);
        let f0 = hist.feature_stats(0);
        assert_eq!(f0[0].count(), 2);
        assert_relative_eq!(f0[0].mean(), 2.0);
        assert_eq!(f0[1].count(), 3);
        assert_relative_eq!(f0[1].mean(), 50.0 / 3.0);
        assert_eq!(hist.feature_stats(1)[0].count(), 5);
    }
}
