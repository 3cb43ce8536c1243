//! Backend-specific predictors behind [`Inferencer`].

use crate::context::{Backend, ExecutionContext};
use crate::data::{HomogenTable, Table, TableRow};
use crate::error::{Error, Result};
use crate::interop::{DeviceForest, HostForest, ModelInterop};
use crate::model::{InferResult, Model};

/// Rows evaluated together by one work item.
pub const DEFAULT_BLOCK_SIZE: usize = 64;

#[derive(Debug, Clone)]
enum Engine {
    Host(HostForest),
    Device(DeviceForest),
}

impl Engine {
    fn n_features(&self) -> usize {
        match self {
            Engine::Host(forest) => forest.meta().n_features,
            Engine::Device(forest) => forest.meta().n_features,
        }
    }

    /// Predict rows `first_row..first_row + out.len()` of `x`.
    fn predict_block<X: Table + ?Sized>(&self, x: &X, first_row: usize, out: &mut [f64]) {
        match self {
            Engine::Host(forest) => {
                for (i, acc) in out.iter_mut().enumerate() {
                    *acc = forest.predict_row(&TableRow::new(x, first_row + i));
                }
            }
            Engine::Device(forest) => forest.predict_block(x, first_row, out),
        }
    }
}

/// A model laid out for one execution context.
///
/// Exporting the model to the backend layout happens once, in
/// [`new`](Self::new); every [`infer`](Self::infer) call reuses it.
#[derive(Debug, Clone)]
pub struct Inferencer {
    ctx: ExecutionContext,
    engine: Engine,
    block_size: usize,
}

impl Inferencer {
    /// Lay out `model` for `ctx`'s backend.
    ///
    /// # Errors
    ///
    /// [`Error::Data`] if the model has no trees.
    pub fn new(ctx: ExecutionContext, model: &Model) -> Result<Self> {
        if model.tree_count() == 0 {
            return Err(Error::data("model has no trees"));
        }
        let engine = match ctx.backend() {
            Backend::Host => Engine::Host(HostForest::export(model)),
            Backend::Device => Engine::Device(DeviceForest::export(model)),
        };
        Ok(Self {
            ctx,
            engine,
            block_size: DEFAULT_BLOCK_SIZE,
        })
    }

    /// Set the number of rows per work item (at least 1).
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    /// Predict every row of `x`.
    ///
    /// Returns an `M × 1` label table resident where the context runs. An
    /// input without rows yields an empty label table.
    ///
    /// # Errors
    ///
    /// [`Error::Data`] if `x` has fewer columns than the model has features.
    pub fn infer<X: Table + ?Sized>(&self, x: &X) -> Result<InferResult> {
        let residency = self.ctx.residency();
        if x.row_count() == 0 {
            return Ok(InferResult::new(HomogenTable::empty().with_residency(residency)));
        }
        let n_features = self.engine.n_features();
        if x.column_count() < n_features {
            return Err(Error::data(format!(
                "model expects {n_features} features, table has {} columns",
                x.column_count()
            )));
        }

        let mut predictions = vec![0.0f64; x.row_count()];
        let block_size = self.block_size;
        self.ctx.install(|parallelism| {
            parallelism.maybe_par_chunks_mut(&mut predictions, block_size, |block, out| {
                self.engine.predict_block(x, block * block_size, out);
            });
        })?;

        let labels = predictions.into_iter().map(|p| p as f32).collect();
        Ok(InferResult::new(
            HomogenTable::column_vector(labels).with_residency(residency),
        ))
    }
}
