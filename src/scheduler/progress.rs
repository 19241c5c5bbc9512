use crate::scheduler::events::{ProgressSink, StreamEvent};
use crate::scheduler::store::{ProgressSnapshot, ProgressStore};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Counters {
    completed: usize,
    last_emitted: Option<usize>,
}

/// Shared progress counter for one invocation
///
/// Batches call [`advance`](Self::advance) as URLs complete. Emission happens
/// under the counter lock, so events reach the sink one at a time and
/// `processed` never decreases.
pub struct ProgressTracker {
    sink: Arc<dyn ProgressSink>,
    store: Option<(Arc<dyn ProgressStore>, String)>,
    base: usize,
    total: usize,
    every: usize,
    counters: Mutex<Counters>,
}

impl ProgressTracker {
    /// # Arguments
    ///
    /// * `sink` - Where progress events go
    /// * `base` - URLs already processed by earlier invocations
    /// * `total` - Length of the original list
    /// * `every` - Emit after every N completions
    pub fn new(sink: Arc<dyn ProgressSink>, base: usize, total: usize, every: usize) -> Self {
        Self {
            sink,
            store: None,
            base,
            total,
            every: every.max(1),
            counters: Mutex::new(Counters::default()),
        }
    }

    /// Mirrors every emitted event into a progress store under `token`
    pub fn with_store(mut self, store: Arc<dyn ProgressStore>, token: impl Into<String>) -> Self {
        self.store = Some((store, token.into()));
        self
    }

    /// Records `n` more completed URLs
    pub fn advance(&self, n: usize) {
        if n == 0 {
            return;
        }

        let mut counters = match self.counters.lock() {
            Ok(counters) => counters,
            Err(poisoned) => poisoned.into_inner(),
        };

        let before = counters.completed;
        counters.completed += n;

        if counters.completed / self.every > before / self.every {
            let completed = counters.completed;
            self.emit(&mut counters, completed);
        }
    }

    /// Emits the closing progress event for this invocation
    ///
    /// `kept` is the number of results the invocation reports. It is skipped
    /// if an identical event was the last one sent.
    pub fn finish(&self, kept: usize) {
        let mut counters = match self.counters.lock() {
            Ok(counters) => counters,
            Err(poisoned) => poisoned.into_inner(),
        };

        let completed = kept.max(counters.last_emitted.unwrap_or(0));
        if counters.last_emitted != Some(completed) {
            self.emit(&mut counters, completed);
        }
    }

    pub fn completed(&self) -> usize {
        match self.counters.lock() {
            Ok(counters) => counters.completed,
            Err(poisoned) => poisoned.into_inner().completed,
        }
    }

    fn emit(&self, counters: &mut Counters, completed: usize) {
        let processed = self.base + completed;
        counters.last_emitted = Some(completed);

        if let Err(e) = self.sink.emit(StreamEvent::progress(processed, self.total)) {
            tracing::warn!("Failed to emit progress {}/{}: {}", processed, self.total, e);
        }

        if let Some((store, token)) = &self.store {
            let snapshot = ProgressSnapshot::new(processed, self.total, false);
            if let Err(e) = store.set(token, snapshot) {
                tracing::warn!("Failed to store progress for {}: {}", token, e);
            }
        }
    }
}
