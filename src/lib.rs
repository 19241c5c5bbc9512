//! Redirect-Resolver: a bulk HTTP redirect chain resolver
//!
//! This crate resolves large lists of URLs to their full redirect chains under
//! per-hop and per-URL time budgets, with bounded batch concurrency, streamed
//! progress events, and continuation tokens for work that does not fit into a
//! single invocation.

pub mod config;
pub mod input;
pub mod output;
pub mod resolver;
pub mod scheduler;
pub mod url;

use thiserror::Error;

/// Main error type for Redirect-Resolver operations
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Event sink error: {0}")]
    Sink(#[from] scheduler::SinkError),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: scheduler::InvocationState,
        to: scheduler::InvocationState,
    },
}

impl ResolverError {
    /// Returns true if a caller can reasonably resume after this error
    ///
    /// A delivery failure leaves the already-resolved work intact, so
    /// resubmitting from the last known progress makes sense. Input errors and
    /// broken state transitions will fail the same way again.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Sink(_))
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors in the caller-supplied input, raised before any resolution starts
#[derive(Debug, Error)]
pub enum InputError {
    #[error("No valid URLs found in input")]
    NoValidUrls,

    #[error("Malformed continuation token: {0}")]
    MalformedContinuation(String),

    #[error("No URL column found in CSV header")]
    MissingUrlColumn,

    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse CSV input: {0}")]
    Csv(#[from] csv::Error),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Redirect-Resolver operations
pub type Result<T> = std::result::Result<T, ResolverError>;

// Re-export commonly used types
pub use config::Config;
pub use resolver::{HttpResolver, RedirectHop, Resolve, UrlCheckResult};
pub use scheduler::{ContinuationToken, InvocationOutcome, Scheduler, StreamEvent};
pub use url::{normalize_input, resolve_location};
