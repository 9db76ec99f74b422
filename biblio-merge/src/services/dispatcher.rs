//! Batch Dispatcher
//!
//! Pulls clusters from a [`ClusterSource`], groups them into batches of
//! `batch_size`, and runs each batch on the worker pool. Completed batches are
//! handed to the [`ResultSink`] from the coordinator task itself, so the write
//! path is never shared.
//!
//! # Backpressure
//! Every submitted batch holds one permit of a `max_in_flight` semaphore until
//! its outcome has been committed. When no permit is free the coordinator
//! waits for one completion, drains every other completed batch, then retries.
//! Submitted-but-uncommitted batches therefore never exceed `max_in_flight`,
//! whatever the input volume.
//!
//! # Stopping
//! - Source exhausted: flush the partial batch, drain, return the report
//! - Cancelled: stop pulling and submitting, drop the unsubmitted partial
//!   batch, drain in-flight work, return the report with `stopped_early`
//! - Fatal error (storage or worker crash): stop submitting, drain and commit
//!   what is already in flight, then return the first error

use super::MergeWorker;
use crate::error::{PipelineError, PipelineResult};
use crate::models::Cluster;
use crate::types::{BatchOutcome, ClusterSource, ResultSink};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Dispatcher limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Clusters per batch
    pub batch_size: usize,
    /// Submitted-but-uncommitted batch limit
    pub max_in_flight: usize,
    /// Batches merged concurrently
    pub worker_count: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            max_in_flight: 32,
            worker_count: 16,
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> PipelineResult<()> {
        for (name, value) in [
            ("batch_size", self.batch_size),
            ("max_in_flight", self.max_in_flight),
            ("worker_count", self.worker_count),
        ] {
            if value < 1 {
                return Err(PipelineError::Config(format!("{} must be at least 1", name)));
            }
        }
        Ok(())
    }
}

/// Summary of one dispatcher run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub clusters_read: usize,
    pub batches_submitted: usize,
    /// Cluster count of each batch, in submission order
    pub batch_sizes: Vec<usize>,
    /// Finalized rows committed
    pub finalized: usize,
    /// Per-cluster failures committed
    pub failures: usize,
    pub peak_in_flight: usize,
    pub stopped_early: bool,
}

type BatchOutput = (OwnedSemaphorePermit, PipelineResult<BatchOutcome>);

/// Mutable state of one run, owned by the coordinator
struct RunState {
    report: RunReport,
    in_flight: JoinSet<BatchOutput>,
    first_error: Option<PipelineError>,
}

impl RunState {
    fn fail(&mut self, err: PipelineError) {
        if self.first_error.is_none() {
            error!(error = %err, "Stopping submission");
            self.first_error = Some(err);
        } else {
            warn!(error = %err, "Further error while draining");
        }
    }

    fn halted(&self) -> bool {
        self.first_error.is_some() || self.report.stopped_early
    }
}

pub struct BatchDispatcher {
    config: DispatchConfig,
    worker: MergeWorker,
    run_id: String,
}

impl BatchDispatcher {
    pub fn new(config: DispatchConfig, worker: MergeWorker, run_id: impl Into<String>) -> Self {
        Self {
            config,
            worker,
            run_id: run_id.into(),
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Drive `source` to exhaustion (or cancellation) and commit into `sink`
    ///
    /// # Errors
    /// - `Config` for invalid limits, before anything is read
    /// - `StorageUnavailable` from the source or sink, after draining
    /// - `WorkerCrash` when a batch panicked, after draining
    pub async fn run<S, K>(
        &self,
        source: &mut S,
        sink: &mut K,
        cancel: &CancellationToken,
    ) -> PipelineResult<RunReport>
    where
        S: ClusterSource + ?Sized,
        K: ResultSink + ?Sized,
    {
        self.config.validate()?;

        info!(
            run_id = %self.run_id,
            batch_size = self.config.batch_size,
            max_in_flight = self.config.max_in_flight,
            worker_count = self.config.worker_count,
            "Starting merge run"
        );

        let slots = Arc::new(Semaphore::new(self.config.max_in_flight));
        let workers = Arc::new(Semaphore::new(self.config.worker_count));
        let mut state = RunState {
            report: RunReport {
                run_id: self.run_id.clone(),
                ..Default::default()
            },
            in_flight: JoinSet::new(),
            first_error: None,
        };
        let mut pending: Vec<Cluster> = Vec::with_capacity(self.config.batch_size);

        'pull: loop {
            let page = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    state.report.stopped_early = true;
                    break 'pull;
                }
                page = source.next_page() => page,
            };

            let page = match page {
                Ok(Some(page)) => page,
                Ok(None) => break,
                Err(e) => {
                    state.fail(e);
                    break;
                }
            };

            for cluster in page {
                state.report.clusters_read += 1;
                pending.push(cluster);

                if pending.len() == self.config.batch_size {
                    let batch =
                        std::mem::replace(&mut pending, Vec::with_capacity(self.config.batch_size));
                    self.submit(batch, &mut state, sink, &slots, &workers, cancel)
                        .await;
                }
                if cancel.is_cancelled() {
                    state.report.stopped_early = true;
                }
                if state.halted() {
                    break 'pull;
                }
            }
        }

        if !state.halted() && !pending.is_empty() {
            self.submit(pending, &mut state, sink, &slots, &workers, cancel)
                .await;
        } else if !pending.is_empty() {
            debug!(clusters = pending.len(), "Dropping unsubmitted partial batch");
        }

        // Drain everything still in flight, even after an error
        while let Some(joined) = state.in_flight.join_next().await {
            self.collect(joined, &mut state, sink).await;
        }

        let report = state.report;
        match state.first_error {
            Some(err) => {
                error!(
                    run_id = %report.run_id,
                    batches = report.batches_submitted,
                    finalized = report.finalized,
                    failures = report.failures,
                    error = %err,
                    "Merge run aborted"
                );
                Err(err)
            }
            None => {
                info!(
                    run_id = %report.run_id,
                    clusters = report.clusters_read,
                    batches = report.batches_submitted,
                    finalized = report.finalized,
                    failures = report.failures,
                    peak_in_flight = report.peak_in_flight,
                    stopped_early = report.stopped_early,
                    "Merge run complete"
                );
                Ok(report)
            }
        }
    }

    /// Submit one batch, blocking on the in-flight limit
    async fn submit<K>(
        &self,
        batch: Vec<Cluster>,
        state: &mut RunState,
        sink: &mut K,
        slots: &Arc<Semaphore>,
        workers: &Arc<Semaphore>,
        cancel: &CancellationToken,
    ) where
        K: ResultSink + ?Sized,
    {
        let permit = loop {
            match slots.clone().try_acquire_owned() {
                Ok(permit) => break permit,
                Err(TryAcquireError::NoPermits) => {
                    debug!(
                        in_flight = state.in_flight.len(),
                        "In-flight limit reached, draining"
                    );
                    match state.in_flight.join_next().await {
                        Some(joined) => self.collect(joined, state, sink).await,
                        None => {
                            state.fail(PipelineError::WorkerCrash {
                                batch: None,
                                message: "in-flight slots held with no running batch".into(),
                            });
                            return;
                        }
                    }
                    while let Some(joined) = state.in_flight.try_join_next() {
                        self.collect(joined, state, sink).await;
                    }

                    if cancel.is_cancelled() {
                        state.report.stopped_early = true;
                    }
                    if state.halted() {
                        debug!(clusters = batch.len(), "Batch not submitted");
                        return;
                    }
                }
                Err(TryAcquireError::Closed) => {
                    state.fail(PipelineError::Config("in-flight limiter closed".into()));
                    return;
                }
            }
        };

        let batch_index = state.report.batches_submitted;
        let batch_len = batch.len();
        state.report.batches_submitted += 1;
        state.report.batch_sizes.push(batch_len);

        let worker = self.worker.clone();
        let workers = Arc::clone(workers);
        state.in_flight.spawn(async move {
            let result = run_batch(worker, workers, batch_index, batch).await;
            (permit, result)
        });

        let in_flight = self.config.max_in_flight - slots.available_permits();
        state.report.peak_in_flight = state.report.peak_in_flight.max(in_flight);

        debug!(batch = batch_index, clusters = batch_len, in_flight, "Batch submitted");
    }

    /// Commit one finished batch and release its in-flight slot
    async fn collect<K>(
        &self,
        joined: Result<BatchOutput, JoinError>,
        state: &mut RunState,
        sink: &mut K,
    ) where
        K: ResultSink + ?Sized,
    {
        match joined {
            Ok((permit, Ok(outcome))) => {
                let batch = outcome.batch_index;
                match sink.commit_batch(outcome).await {
                    Ok(summary) => {
                        state.report.finalized += summary.finalized;
                        state.report.failures += summary.failures;
                    }
                    Err(e) => {
                        error!(batch, error = %e, "Batch lost");
                        state.fail(e);
                    }
                }
                drop(permit);
            }
            Ok((_permit, Err(e))) => {
                error!(error = %e, "Batch lost");
                state.fail(e);
            }
            Err(join_err) => state.fail(PipelineError::WorkerCrash {
                batch: None,
                message: join_err.to_string(),
            }),
        }
    }
}

/// Run one batch on the blocking pool, bounded by the worker semaphore
async fn run_batch(
    worker: MergeWorker,
    workers: Arc<Semaphore>,
    batch_index: usize,
    batch: Vec<Cluster>,
) -> PipelineResult<BatchOutcome> {
    let _worker = workers
        .acquire_owned()
        .await
        .map_err(|_| PipelineError::WorkerCrash {
            batch: Some(batch_index),
            message: "worker pool closed".into(),
        })?;

    tokio::task::spawn_blocking(move || worker.process_batch(batch_index, batch))
        .await
        .map_err(|e| PipelineError::WorkerCrash {
            batch: Some(batch_index),
            message: panic_message(e),
        })
}

fn panic_message(err: JoinError) -> String {
    if err.is_cancelled() {
        return "task cancelled".to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
