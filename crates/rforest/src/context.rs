//! Explicit execution context for training and inference.
//!
//! Every training and inference entry point takes an [`ExecutionContext`].
//! There is no process-wide default device: the caller decides where work
//! runs and how many worker threads it may use.

use crate::error::Result;
use crate::utils::{run_with_threads, Parallelism};

/// Compute backend that executes a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Host processor. Inference walks the pre-order
    /// [`HostForest`](crate::interop::HostForest) layout.
    #[default]
    Host,
    /// Accelerator device. Inference runs the level-synchronous kernel over
    /// the breadth-first [`DeviceForest`](crate::interop::DeviceForest)
    /// layout, one row block per work item.
    Device,
}

/// Where a table's buffer is considered to live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Residency {
    #[default]
    Host,
    Device,
}

impl From<Backend> for Residency {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Host => Residency::Host,
            Backend::Device => Residency::Device,
        }
    }
}

/// Backend selection plus worker-thread budget.
///
/// Thread count semantics follow [`run_with_threads`]: 0 = all cores,
/// 1 = sequential, n = exactly n threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionContext {
    backend: Backend,
    n_threads: usize,
}

impl ExecutionContext {
    /// Host context using all available cores.
    pub fn host() -> Self {
        Self {
            backend: Backend::Host,
            n_threads: 0,
        }
    }

    /// Device context using all available work-item slots.
    pub fn device() -> Self {
        Self {
            backend: Backend::Device,
            n_threads: 0,
        }
    }

    /// Set the worker-thread budget.
    pub fn with_threads(mut self, n_threads: usize) -> Self {
        self.n_threads = n_threads;
        self
    }

    /// Single-threaded context on the same backend.
    pub fn sequential(self) -> Self {
        self.with_threads(1)
    }

    #[inline]
    pub fn backend(&self) -> Backend {
        self.backend
    }

    #[inline]
    pub fn n_threads(&self) -> usize {
        self.n_threads
    }

    /// Residency of tables produced by calls on this context.
    #[inline]
    pub fn residency(&self) -> Residency {
        self.backend.into()
    }

    /// Run `f` on this context's worker pool.
    pub fn install<T: Send>(&self, f: impl FnOnce(Parallelism) -> T + Send) -> Result<T> {
        run_with_threads(self.n_threads, f)
    }
}
