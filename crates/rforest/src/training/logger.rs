//! Training progress logging.
//!
//! [`TrainingLogger`] turns training milestones into `tracing` events,
//! filtered by a [`Verbosity`] level chosen in the configuration. The crate
//! never installs a subscriber; events are dropped unless the application
//! installs one.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

/// Verbosity level for training output.
///
/// Levels are ordered: each level includes everything the lower levels emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub enum Verbosity {
    /// No output.
    #[default]
    Silent,
    /// Warnings only (for example, a forest with no out-of-bag rows).
    Warning,
    /// Start and end of training, summary metrics.
    Info,
    /// Per-tree details.
    Debug,
}

/// Emits training progress events at or below the configured verbosity.
#[derive(Debug)]
pub struct TrainingLogger {
    verbosity: Verbosity,
    started: Option<Instant>,
}

impl TrainingLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            started: None,
        }
    }

    #[inline]
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    #[inline]
    fn enabled(&self, level: Verbosity) -> bool {
        self.verbosity >= level
    }

    /// Record the start of a training call.
    pub fn start_training(&mut self, n_trees: usize, n_rows: usize, n_features: usize) {
        self.started = Some(Instant::now());
        if self.enabled(Verbosity::Info) {
            info!(n_trees, n_rows, n_features, "random forest training started");
        }
    }

    /// Record the bucket layout computed for the feature matrix.
    pub fn log_bins(&self, total_bins: usize, n_features: usize) {
        if self.enabled(Verbosity::Debug) {
            debug!(total_bins, n_features, "feature histogram cuts computed");
        }
    }

    /// Record one finished tree.
    pub fn log_tree(&self, tree_index: usize, n_nodes: usize, n_leaves: usize, depth: usize) {
        if self.enabled(Verbosity::Debug) {
            debug!(tree_index, n_nodes, n_leaves, depth, "tree grown");
        }
    }

    /// Record the final out-of-bag error.
    pub fn log_oob(&self, oob_error: f64, oob_rows: usize, n_rows: usize) {
        if oob_rows == 0 {
            self.warn("no observation was out of bag; out-of-bag error is NaN");
        } else if self.enabled(Verbosity::Info) {
            info!(oob_error, oob_rows, n_rows, "out-of-bag error");
        }
    }

    pub fn warn(&self, message: &str) {
        if self.enabled(Verbosity::Warning) {
            warn!("{message}");
        }
    }

    /// Record the end of a training call.
    pub fn finish_training(&self, n_trees: usize) {
        if self.enabled(Verbosity::Info) {
            let elapsed_ms = self.elapsed().as_secs_f64() * 1e3;
            info!(n_trees, elapsed_ms, "random forest training finished");
        }
    }

    /// Time since [`start_training`](Self::start_training).
    pub fn elapsed(&self) -> Duration {
        self.started.map(|t| t.elapsed()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_is_ordered() {
        assert!(Verbosity::Debug > Verbosity::Info);
        assert!(Verbosity::Info > Verbosity::Warning);
        assert!(Verbosity::Warning > Verbosity::Silent);
    }

    #[test]
    fn silent_logger_filters_everything() {
        let logger = TrainingLogger::new(Verbosity::Silent);
        assert!(!logger.enabled(Verbosity::Warning));
        assert_eq!(logger.elapsed(), Duration::ZERO);
    }

    #[test]
    fn start_records_time() {
        let mut logger = TrainingLogger::new(Verbosity::Debug);
        logger.start_training(3, 10, 2);
        logger.log_tree(0, 5, 3, 2);
        logger.log_oob(0.5, 4, 10);
        logger.finish_training(3);
        assert!(logger.started.is_some());
    }
}
