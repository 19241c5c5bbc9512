//! Scheduler for running bounded batches of resolutions
//!
//! This module handles:
//! - Slicing the input into one invocation's worth of work
//! - Partitioning that slice into fixed-size batches
//! - Running at most `max-concurrent-batches` batches at once via a semaphore
//! - Streaming progress and the terminal event through a [`ProgressSink`]
//! - Reporting leftover work as a [`ContinuationToken`]

mod batch;
mod events;
mod progress;
mod state;
mod store;

pub use batch::{Batch, BatchJob, ContinuationToken, Invocation};
pub use events::{
    percent, ChannelSink, JsonLinesSink, MemorySink, ProgressSink, SinkError, StreamEvent,
};
pub use progress::ProgressTracker;
pub use state::InvocationState;
pub use store::{
    MemoryProgressStore, ProgressSnapshot, ProgressStore, StoreError, StoreResult,
    DEFAULT_PROGRESS_TTL,
};

use crate::config::SchedulerConfig;
use crate::resolver::{Resolve, UrlCheckResult};
use crate::ResolverError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// What one invocation produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationOutcome {
    /// Results for this invocation's slice, in input order
    pub results: Vec<UrlCheckResult>,
    /// Leftover work, or `None` when the whole list is done
    pub continuation: Option<ContinuationToken>,
    /// URLs of the original list processed so far, this invocation included
    pub processed: usize,
    pub total_urls: usize,
    /// Terminal state the invocation ended in
    pub state: InvocationState,
}

/// Tracks the invocation state machine and logs each transition
struct Lifecycle {
    state: InvocationState,
}

impl Lifecycle {
    fn new() -> Self {
        Self {
            state: InvocationState::ReceivingInput,
        }
    }

    fn transition(&mut self, next: InvocationState) -> crate::Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(ResolverError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!("Invocation state: {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }
}

/// Runs resolutions in bounded-concurrency batches
///
/// The scheduler coordinates:
/// - The per-invocation slice and continuation
/// - Global concurrency limits (max concurrent batches)
/// - Sequential, spaced-out requests within a batch
/// - The outer invocation deadline
pub struct Scheduler<R> {
    resolver: Arc<R>,
    config: SchedulerConfig,
    store: Option<Arc<dyn ProgressStore>>,
}

impl<R: Resolve + 'static> Scheduler<R> {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `resolver` - Resolves individual URLs
    /// * `config` - Batching and concurrency configuration
    pub fn new(resolver: R, config: SchedulerConfig) -> Self {
        Self::from_arc(Arc::new(resolver), config)
    }

    pub fn from_arc(resolver: Arc<R>, config: SchedulerConfig) -> Self {
        Self {
            resolver,
            config,
            store: None,
        }
    }

    /// Publishes progress snapshots to `store` for invocations given a job id
    pub fn with_progress_store(mut self, store: Arc<dyn ProgressStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Validates an invocation and computes its slice without doing any work
    pub fn plan(&self, invocation: Invocation) -> crate::Result<BatchJob> {
        Ok(invocation.into_job(self.config.per_invocation_limit)?)
    }

    /// Processes the slice of `urls` starting at `start_index`
    ///
    /// # Returns
    ///
    /// * `Ok(InvocationOutcome)` - Results and an optional continuation
    /// * `Err(ResolverError)` - Input was rejected before streaming, or the
    ///   stream failed after an `error` event was attempted
    pub async fn run(
        &self,
        urls: &[String],
        start_index: usize,
        sink: Arc<dyn ProgressSink>,
    ) -> crate::Result<InvocationOutcome> {
        let job = BatchJob::plan(urls, start_index, self.config.per_invocation_limit)?;
        self.execute(job, None, sink).await
    }

    /// Resumes a list from a continuation token
    pub async fn resume(
        &self,
        token: ContinuationToken,
        sink: Arc<dyn ProgressSink>,
    ) -> crate::Result<InvocationOutcome> {
        let job = BatchJob::from_token(token, self.config.per_invocation_limit)?;
        self.execute(job, None, sink).await
    }

    /// Runs a fresh or resumed invocation, publishing progress under `job_id`
    pub async fn invoke(
        &self,
        invocation: Invocation,
        job_id: Option<&str>,
        sink: Arc<dyn ProgressSink>,
    ) -> crate::Result<InvocationOutcome> {
        let job = self.plan(invocation)?;
        self.execute(job, job_id, sink).await
    }

    /// Streams one planned job to completion
    ///
    /// Failures before the first event is written are returned as-is. After
    /// that, an `error` event is sent (best effort) before returning.
    pub async fn execute(
        &self,
        job: BatchJob,
        job_id: Option<&str>,
        sink: Arc<dyn ProgressSink>,
    ) -> crate::Result<InvocationOutcome> {
        let mut lifecycle = Lifecycle::new();

        if job.fresh {
            lifecycle.transition(InvocationState::StreamingStart)?;
            sink.emit(StreamEvent::Start {
                total_urls: job.total_urls,
            })?;
        }

        match self.stream(&job, job_id, &mut lifecycle, sink.clone()).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::error!("Invocation failed mid-stream: {}", e);
                if let Err(transition) = lifecycle.transition(InvocationState::Error) {
                    tracing::debug!("{}", transition);
                }
                let event = StreamEvent::Error {
                    error: e.to_string(),
                    recoverable: e.is_recoverable(),
                };
                if let Err(sink_error) = sink.emit(event) {
                    tracing::warn!("Failed to emit error event: {}", sink_error);
                }
                Err(e)
            }
        }
    }

    async fn stream(
        &self,
        job: &BatchJob,
        job_id: Option<&str>,
        lifecycle: &mut Lifecycle,
        sink: Arc<dyn ProgressSink>,
    ) -> crate::Result<InvocationOutcome> {
        lifecycle.transition(InvocationState::BatchRunning)?;

        let started = Instant::now();
        let deadline = started + self.config.invocation_timeout();

        let mut tracker = ProgressTracker::new(
            sink.clone(),
            job.start_index,
            job.total_urls,
            self.config.progress_every,
        );
        if let (Some(store), Some(job_id)) = (&self.store, job_id) {
            tracker = tracker.with_store(store.clone(), job_id);
        }
        let tracker = Arc::new(tracker);

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_batches.max(1)));
        let batches = job.batches(self.config.batch_size);

        tracing::info!(
            "Resolving {} URLs ({}..{} of {}) in {} batches",
            job.len(),
            job.start_index,
            job.start_index + job.len(),
            job.total_urls,
            batches.len()
        );

        let mut handles = Vec::with_capacity(batches.len());
        for batch in batches {
            let reported = Arc::new(AtomicUsize::new(0));
            let handle = tokio::spawn(run_batch(
                self.resolver.clone(),
                semaphore.clone(),
                tracker.clone(),
                batch.urls.clone(),
                self.config.inter_request_delay(),
                deadline,
                reported.clone(),
            ));
            handles.push((batch, reported, handle));
        }

        // Each result goes into the slot of its input position
        let mut slots: Vec<Option<UrlCheckResult>> = vec![None; job.len()];
        for (batch, reported, handle) in handles {
            match handle.await {
                Ok(batch_results) => {
                    for (i, result) in batch_results.into_iter().enumerate() {
                        slots[batch.offset + i] = result;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Batch {} ({} URLs) failed: {}",
                        batch.index,
                        batch.urls.len(),
                        e
                    );
                    for (i, url) in batch.urls.iter().enumerate() {
                        slots[batch.offset + i] = Some(UrlCheckResult::processing_failed(url));
                    }
                    let unreported = batch.urls.len().saturating_sub(reported.load(Ordering::SeqCst));
                    tracker.advance(unreported);
                }
            }
        }

        let completed = slots.iter().filter(|slot| slot.is_some()).count();
        let results: Vec<UrlCheckResult> = slots.into_iter().map_while(|slot| slot).collect();
        if completed > results.len() {
            tracing::debug!(
                "Outer deadline reached: discarding {} out-of-order results",
                completed - results.len()
            );
        }

        lifecycle.transition(InvocationState::ProgressEmit)?;
        tracker.finish(results.len());

        let continuation = job.continuation(results.len());
        let processed = job.start_index + results.len();

        // The terminal state is entered only once its event has been delivered
        let (terminal, event) = match &continuation {
            Some(token) => (
                InvocationState::BatchComplete,
                StreamEvent::BatchComplete {
                    results: results.clone(),
                    processed,
                    total: job.total_urls,
                    continuation: token.clone(),
                },
            ),
            None => (
                InvocationState::Complete,
                StreamEvent::Complete {
                    success: true,
                    results: results.clone(),
                    total_processed: processed,
                    total_urls: job.total_urls,
                },
            ),
        };
        sink.emit(event)?;
        lifecycle.transition(terminal)?;

        if let (Some(store), Some(job_id)) = (&self.store, job_id) {
            let snapshot = ProgressSnapshot::new(processed, job.total_urls, continuation.is_none());
            if let Err(e) = store.set(job_id, snapshot) {
                tracing::warn!("Failed to store final progress for {}: {}", job_id, e);
            }
        }

        tracing::info!(
            "Invocation finished: {}/{} URLs processed in {:?}{}",
            processed,
            job.total_urls,
            started.elapsed(),
            if continuation.is_some() {
                ", continuation issued"
            } else {
                ""
            }
        );

        Ok(InvocationOutcome {
            results,
            continuation,
            processed,
            total_urls: job.total_urls,
            state: lifecycle.state,
        })
    }
}

/// Resolves one batch sequentially once a concurrency permit is available
///
/// URLs not started before `deadline` are left as `None`.
async fn run_batch<R: Resolve + ?Sized>(
    resolver: Arc<R>,
    semaphore: Arc<Semaphore>,
    tracker: Arc<ProgressTracker>,
    urls: Vec<String>,
    delay: Duration,
    deadline: Instant,
    reported: Arc<AtomicUsize>,
) -> Vec<Option<UrlCheckResult>> {
    let mut results: Vec<Option<UrlCheckResult>> = Vec::with_capacity(urls.len());

    let _permit = match semaphore.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            results.resize(urls.len(), None);
            return results;
        }
    };

    for (i, url) in urls.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if Instant::now() >= deadline {
            tracing::debug!(
                "Invocation deadline reached, leaving {} URLs for continuation",
                urls.len() - i
            );
            break;
        }

        let result = resolver.resolve(url).await;
        results.push(Some(result));
        reported.fetch_add(1, Ordering::SeqCst);
        tracker.advance(1);
    }

    results.resize(urls.len(), None);
    results
}
