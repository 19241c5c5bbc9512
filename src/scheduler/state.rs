/// Invocation state definitions
///
/// One invocation moves through these states exactly once, from input
/// validation to a terminal state.
use std::fmt;

/// Represents the current phase of a scheduler invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvocationState {
    // ===== Active States =====
    /// Input is being validated and sliced
    ReceivingInput,

    /// The `start` event is being sent
    StreamingStart,

    /// Batches are resolving URLs
    BatchRunning,

    /// The closing progress event is being sent
    ProgressEmit,

    // ===== Terminal States =====
    /// The slice is done and more work remains
    BatchComplete,

    /// The whole list has been resolved
    Complete,

    /// The invocation failed
    Error,
}

impl InvocationState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::BatchComplete | Self::Complete | Self::Error)
    }

    /// Returns true if `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: Self) -> bool {
        use InvocationState::*;

        match (self, next) {
            (_, Error) => !self.is_terminal(),
            (ReceivingInput, StreamingStart | BatchRunning) => true,
            (StreamingStart, BatchRunning) => true,
            (BatchRunning, ProgressEmit) => true,
            (ProgressEmit, BatchRunning | BatchComplete | Complete) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReceivingInput => "receiving_input",
            Self::StreamingStart => "streaming_start",
            Self::BatchRunning => "batch_running",
            Self::ProgressEmit => "progress_emit",
            Self::BatchComplete => "batch_complete",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for InvocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
