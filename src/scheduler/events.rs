//! Streamed event framing and the sinks that carry it
//!
//! Every event is a JSON object tagged by `type`. Sinks serialize writes, so
//! events from concurrent batches never interleave within a frame.

use crate::resolver::UrlCheckResult;
use crate::scheduler::batch::ContinuationToken;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors raised while delivering an event to the caller
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Event receiver has gone away")]
    Closed,

    #[error("Event sink lock poisoned")]
    Poisoned,

    #[error("Failed to write event: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One frame of the streamed response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Start {
        total_urls: usize,
    },
    Progress {
        processed: usize,
        total: usize,
        percent: u8,
    },
    BatchComplete {
        results: Vec<UrlCheckResult>,
        processed: usize,
        total: usize,
        continuation: ContinuationToken,
    },
    Complete {
        success: bool,
        results: Vec<UrlCheckResult>,
        total_processed: usize,
        total_urls: usize,
    },
    Error {
        error: String,
        recoverable: bool,
    },
}

impl StreamEvent {
    pub fn progress(processed: usize, total: usize) -> Self {
        Self::Progress {
            processed,
            total,
            percent: percent(processed, total),
        }
    }

    /// Returns true for events after which nothing else is streamed
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::BatchComplete { .. } | Self::Complete { .. } | Self::Error { .. }
        )
    }
}

/// Integer percentage, clamped to 100
pub fn percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (processed.min(total) * 100 / total) as u8
}

/// Destination for streamed events
///
/// Implementations must serialize concurrent calls to `emit`.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: StreamEvent) -> Result<(), SinkError>;
}

/// Writes one JSON object per line to any writer
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> ProgressSink for JsonLinesSink<W> {
    fn emit(&self, event: StreamEvent) -> Result<(), SinkError> {
        let line = serde_json::to_string(&event)?;
        let mut writer = self.writer.lock().map_err(|_| SinkError::Poisoned)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// Forwards events over an unbounded channel
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<StreamEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StreamEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: StreamEvent) -> Result<(), SinkError> {
        self.tx.send(event).map_err(|_| SinkError::Closed)
    }
}

/// Keeps every event in memory
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<StreamEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the events received so far
    pub fn events(&self) -> Vec<StreamEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ProgressSink for MemorySink {
    fn emit(&self, event: StreamEvent) -> Result<(), SinkError> {
        self.events
            .lock()
            .map_err(|_| SinkError::Poisoned)?
            .push(event);
        Ok(())
    }
}
