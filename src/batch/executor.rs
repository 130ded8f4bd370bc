//! Batched parallel mapper
//!
//! Applies one function to many inputs:
//! - Inputs are cut into contiguous batches of at most `batch_size`
//! - Each batch runs concurrently on a worker pool owned by the mapper
//! - The caller blocks until the whole batch is done before the next starts
//! - Every item ends up in exactly one of successes or failures, in input order

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::attempt::{Try, TryError};
use crate::batch::types::*;

type MapFn<I, O> = dyn Fn(&I) -> anyhow::Result<O> + Send + Sync;

enum BatchOutcome {
    Completed,
    Interrupted,
}

/// Call-level errors from [`ParallelMapper::run`]
#[derive(Debug, Error)]
pub enum MapperError {
    /// `run` was called on a mapper that already ran
    #[error("Mapper has already run; create a new one for another pass")]
    AlreadyRun,

    /// The run was interrupted while waiting on a batch
    #[error("Run interrupted after {completed_batches} of {total_batches} batches")]
    Interrupted {
        /// Batches whose results were recorded
        completed_batches: usize,
        /// Batches the run was split into
        total_batches: usize,
    },

    /// The configuration failed validation
    #[error("Invalid mapper configuration: {0}")]
    InvalidConfig(#[from] TryError),

    /// The worker pool could not be built
    #[error("Failed to build worker pool: {0}")]
    Runtime(#[from] std::io::Error),

    /// A worker task was lost before reporting
    #[error("Worker join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Applies a function to every input in bounded concurrent batches.
///
/// Single use: build it with all inputs, call [`run`](Self::run) once,
/// then read [`successes`](Self::successes) and [`failures`](Self::failures).
pub struct ParallelMapper<I, O> {
    inputs: Vec<I>,
    function: Arc<MapFn<I, O>>,
    config: MapperConfig,
    progress_callback: Option<ProgressCallback>,
    interrupt: InterruptHandle,
    successes: Vec<O>,
    failures: Vec<ExecutionFailure<I>>,
    stats: Option<RunStats>,
    consumed: bool,
}

impl<I, O> std::fmt::Debug for ParallelMapper<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelMapper")
            .field("inputs", &self.inputs.len())
            .field("config", &self.config)
            .field("progress_callback", &self.progress_callback.is_some())
            .field("successes", &self.successes.len())
            .field("failures", &self.failures.len())
            .field("consumed", &self.consumed)
            .finish()
    }
}

impl<I, O> ParallelMapper<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Mapper over `inputs` with the default batch size of 100
    pub fn new<F, E>(inputs: impl IntoIterator<Item = I>, function: F) -> Self
    where
        F: Fn(&I) -> std::result::Result<O, E> + Send + Sync + 'static,
        E: Into<anyhow::Error>,
    {
        Self {
            inputs: inputs.into_iter().collect(),
            function: Arc::new(move |input: &I| {
                function(input).map_err(Into::<anyhow::Error>::into)
            }),
            config: MapperConfig::default(),
            progress_callback: None,
            interrupt: InterruptHandle::default(),
            successes: Vec::new(),
            failures: Vec::new(),
            stats: None,
            consumed: false,
        }
    }

    /// Set the batch size; zero is rejected when the mapper runs
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: MapperConfig) -> Self {
        self.config = config;
        self
    }

    /// Set progress callback
    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    /// Handle that interrupts this mapper from another thread
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Current configuration
    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Process every input, one batch at a time.
    ///
    /// Blocks the calling thread. Per-item errors never fail the call; they
    /// are collected into [`failures`](Self::failures). The call itself
    /// fails on a second run, an invalid configuration, or an interrupt.
    /// After an interrupt the results of completed batches stay available,
    /// while tasks of the interrupted batch finish in the background and
    /// their results are discarded.
    ///
    /// Safe to call from any blocking context, including
    /// `tokio::task::spawn_blocking` and another mapper's function. From
    /// async code, go through `spawn_blocking` so no async worker is parked.
    #[instrument(
        skip(self),
        fields(
            run_id = %Uuid::new_v4(),
            input_count = self.inputs.len(),
            batch_size = self.config.batch_size,
        )
    )]
    pub fn run(&mut self) -> std::result::Result<&mut Self, MapperError> {
        if self.consumed {
            warn!("Rejecting second run of a consumed mapper");
            return Err(MapperError::AlreadyRun);
        }
        self.config.validate()?;
        self.consumed = true;

        let started = Instant::now();
        let batch_size = self.config.batch_size;
        let inputs = std::mem::take(&mut self.inputs);
        let total = inputs.len();
        let total_batches = total.div_ceil(batch_size);

        info!(total, total_batches, "Starting parallel map");

        let runtime = self.build_pool()?;
        let mut remaining = inputs.into_iter().peekable();
        let mut batches_completed = 0;
        let mut completed_items = 0;
        let mut outcome = Ok(());

        while remaining.peek().is_some() {
            let batch: Vec<I> = remaining.by_ref().take(batch_size).collect();
            let batch_len = batch.len();

            match self.run_batch(&runtime, batch) {
                Ok(BatchOutcome::Completed) => {
                    batches_completed += 1;
                    completed_items += batch_len;
                    debug!(
                        batch = batches_completed,
                        items = batch_len,
                        "Batch completed"
                    );
                    if let Some(callback) = &self.progress_callback {
                        callback(completed_items, total);
                    }
                }
                Ok(BatchOutcome::Interrupted) => {
                    warn!(
                        completed_batches = batches_completed,
                        total_batches, "Parallel map interrupted"
                    );
                    outcome = Err(MapperError::Interrupted {
                        completed_batches: batches_completed,
                        total_batches,
                    });
                    break;
                }
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }

        // Never drop the pool in place: the caller may itself be on a runtime thread.
        runtime.shutdown_background();

        let stats = RunStats {
            total,
            succeeded: self.successes.len(),
            failed: self.failures.len(),
            batches_completed,
            total_batches,
            duration: started.elapsed(),
        };

        info!(
            succeeded = stats.succeeded,
            failed = stats.failed,
            batches_completed,
            success_rate = stats.success_rate(),
            duration_ms = stats.duration.as_millis(),
            "Parallel map finished"
        );

        if stats.success_rate() < 80.0 && total > 5 {
            warn!(
                success_rate = stats.success_rate(),
                failed = stats.failed,
                "High failure rate detected in parallel map"
            );
        }

        self.stats = Some(stats);
        outcome.map(|()| self)
    }

    /// Private runtime whose blocking pool is the elastic worker pool.
    /// Only its blocking pool is used, so it is never entered or blocked on.
    fn build_pool(&self) -> std::result::Result<Runtime, MapperError> {
        let max_threads = self
            .config
            .max_blocking_threads
            .unwrap_or_else(|| self.config.batch_size.max(512));

        let runtime = Builder::new_current_thread()
            .enable_all()
            .thread_name("parallel-mapper")
            .max_blocking_threads(max_threads)
            .build()?;
        Ok(runtime)
    }

    /// Submit one batch and wait for all of it, or for an interrupt
    fn run_batch(
        &mut self,
        runtime: &Runtime,
        batch: Vec<I>,
    ) -> std::result::Result<BatchOutcome, MapperError> {
        let token = self.interrupt.token().clone();
        if token.is_cancelled() {
            return Ok(BatchOutcome::Interrupted);
        }

        let handles: Vec<_> = batch
            .into_iter()
            .map(|input| {
                let function = Arc::clone(&self.function);
                runtime.spawn_blocking(move || {
                    let outcome = Try::attempt(|| (*function)(&input));
                    (input, outcome)
                })
            })
            .collect();

        let joined = futures::executor::block_on(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => None,
                results = futures::future::join_all(handles) => Some(results),
            }
        });

        let Some(results) = joined else {
            return Ok(BatchOutcome::Interrupted);
        };

        let mut join_error = None;
        for result in results {
            match result {
                Ok((_, Try::Success(output))) => self.successes.push(output),
                Ok((input, Try::Failure(cause))) => {
                    debug!(error = %cause, "Item failed");
                    self.failures.push(ExecutionFailure { input, cause });
                }
                Err(e) => {
                    error!(error = %e, "Worker task join error");
                    join_error.get_or_insert(e);
                }
            }
        }

        match join_error {
            Some(e) => Err(MapperError::Join(e)),
            None => Ok(BatchOutcome::Completed),
        }
    }

    /// Outputs of every successful input, in input order
    pub fn successes(&self) -> &[O] {
        &self.successes
    }

    /// One entry per failed input, in input order
    pub fn failures(&self) -> &[ExecutionFailure<I>] {
        &self.failures
    }

    /// Summary of the run, once `run` has been called
    pub fn stats(&self) -> Option<&RunStats> {
        self.stats.as_ref()
    }

    /// Whether `run` has been called
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Take ownership of `(successes, failures)`
    pub fn into_parts(self) -> (Vec<O>, Vec<ExecutionFailure<I>>) {
        (self.successes, self.failures)
    }
}
