//! Per-tree row sampling.
//!
//! Each tree draws its training rows from its own random stream, seeded
//! from the configuration seed and the tree index. The stream is handed
//! back to the caller so the same tree can keep using it for feature
//! selection. A tree's rows therefore never depend on which worker thread
//! grows it or in which order trees are scheduled.
//!
//! - `bootstrap = true`: `ceil(n * fraction)` draws uniformly with replacement.
//! - `bootstrap = false`: a random subset of `ceil(n * fraction)` distinct
//!   rows (all rows when the fraction is 1).
//!
//! Rows never drawn form the tree's out-of-bag set.

use fixedbitset::FixedBitSet;
use rand::prelude::*;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Odd 64-bit constant spreading tree indices over the seed space.
const TREE_SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

// ============================================================================
// BootstrapSample
// ============================================================================

/// Rows drawn for one tree.
#[derive(Debug, Clone)]
pub struct BootstrapSample {
    /// Drawn row indices, sorted, repetitions allowed.
    rows: Vec<u32>,
    /// Membership of each original row in `rows`.
    in_bag: FixedBitSet,
}

impl BootstrapSample {
    fn from_rows(mut rows: Vec<u32>, n_rows: usize) -> Self {
        rows.sort_unstable();
        let mut in_bag = FixedBitSet::with_capacity(n_rows);
        for &row in &rows {
            in_bag.insert(row as usize);
        }
        Self { rows, in_bag }
    }

    /// Drawn rows (sorted, with repetitions).
    #[inline]
    pub fn rows(&self) -> &[u32] {
        &self.rows
    }

    /// Take ownership of the drawn rows.
    pub fn into_rows(self) -> Vec<u32> {
        self.rows
    }

    /// Number of draws.
    #[inline]
    pub fn n_draws(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_in_bag(&self, row: usize) -> bool {
        self.in_bag.contains(row)
    }

    /// Number of distinct rows drawn at least once.
    pub fn n_in_bag(&self) -> usize {
        self.in_bag.count_ones(..)
    }

    /// Rows never drawn, ascending. May be empty.
    pub fn oob_rows(&self) -> Vec<u32> {
        self.in_bag.zeroes().map(|row| row as u32).collect()
    }
}

// ============================================================================
// Sampler
// ============================================================================

/// Deterministic per-tree row sampler.
#[derive(Debug, Clone, Copy)]
pub struct Sampler {
    seed: u64,
    bootstrap: bool,
    fraction: f64,
}

impl Sampler {
    /// Create a sampler. `fraction` must be in `(0, 1]`.
    pub fn new(seed: u64, bootstrap: bool, fraction: f64) -> Self {
        debug_assert!(fraction > 0.0 && fraction <= 1.0);
        Self {
            seed,
            bootstrap,
            fraction,
        }
    }

    /// Random stream owned by tree `tree_index`.
    pub fn tree_rng(&self, tree_index: usize) -> Xoshiro256PlusPlus {
        let offset = (tree_index as u64).wrapping_mul(TREE_SEED_STRIDE);
        Xoshiro256PlusPlus::seed_from_u64(self.seed.wrapping_add(offset))
    }

    /// Number of rows drawn for a table of `n_rows` rows.
    pub fn n_draws(&self, n_rows: usize) -> usize {
        if n_rows == 0 {
            return 0;
        }
        ((n_rows as f64 * self.fraction).ceil() as usize).clamp(1, n_rows)
    }

    /// Draw the rows for tree `tree_index`.
    ///
    /// Returns the sample and the tree's random stream, positioned after
    /// the draws.
    pub fn sample(&self, tree_index: usize, n_rows: usize) -> (BootstrapSample, Xoshiro256PlusPlus) {
        let mut rng = self.tree_rng(tree_index);
        let sample = self.draw(&mut rng, n_rows);
        (sample, rng)
    }

    /// Draw rows from `rng`.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R, n_rows: usize) -> BootstrapSample {
        let n_draws = self.n_draws(n_rows);
        let rows = if self.bootstrap {
            (0..n_draws)
                .map(|_| rng.gen_range(0..n_rows) as u32)
                .collect()
        } else if n_draws == n_rows {
            (0..n_rows as u32).collect()
        } else {
            // Without replacement using partial Fisher-Yates shuffle
            let mut indices: Vec<u32> = (0..n_rows as u32).collect();
            for i in 0..n_draws {
                let j = rng.gen_range(i..n_rows);
                indices.swap(i, j);
            }
            indices.truncate(n_draws);
            indices
        };
        BootstrapSample::from_rows(rows, n_rows)
    }
}
