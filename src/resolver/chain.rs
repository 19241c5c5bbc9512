//! Hop-chain state for a single resolution attempt
//!
//! Redirect following is an explicit loop over [`HopState`]; every exit
//! condition (deadline, redirect budget, terminal status, bad `Location`) is a
//! method on the state, so the chain bookkeeping can be exercised without a
//! network.

use crate::resolver::types::{RedirectHop, UrlCheckResult};
use crate::url::resolve_location;
use crate::UrlError;
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

/// Status codes that are followed as redirects
pub const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

/// Returns true for the redirect status codes the resolver follows
pub fn is_redirect_status(status: u16) -> bool {
    REDIRECT_STATUSES.contains(&status)
}

/// Reasons a resolution attempt ends without a terminal status
///
/// The `Display` text is what ends up in [`UrlCheckResult::error`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HopError {
    #[error("Request timeout")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Too many redirects (limit {0})")]
    TooManyRedirects(usize),

    #[error("Invalid redirect URL: {0}")]
    InvalidRedirect(String),

    #[error("Method not allowed (405)")]
    MethodNotAllowed,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl HopError {
    /// Only transient failures are worth restarting the chain for
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Network(_))
    }

    pub(crate) fn from_url_error(error: UrlError, wrap: fn(String) -> Self) -> Self {
        match error {
            UrlError::Parse(detail) => wrap(detail),
            other => wrap(other.to_string()),
        }
    }
}

/// What to do after a hop's response has been received
#[derive(Debug, PartialEq, Eq)]
pub enum HopStep<'a> {
    /// Follow the given `Location` value
    Follow(&'a str),
    /// The chain ends at this response
    Stop,
}

/// Decides whether a response continues the chain
///
/// A redirect status without a `Location` header ends the chain like any other
/// terminal status.
pub fn next_step(status: u16, location: Option<&str>) -> HopStep<'_> {
    match location {
        Some(location) if is_redirect_status(status) => HopStep::Follow(location),
        _ => HopStep::Stop,
    }
}

/// Mutable state of one attempt at following a redirect chain
#[derive(Debug)]
pub struct HopState {
    current_url: Url,
    chain: Vec<RedirectHop>,
    deadline: Instant,
    max_redirects: usize,
}

impl HopState {
    /// Starts a chain at `start` with a budget measured from now
    pub fn new(start: Url, budget: Duration, max_redirects: usize) -> Self {
        Self::with_deadline(start, Instant::now() + budget, max_redirects)
    }

    pub fn with_deadline(start: Url, deadline: Instant, max_redirects: usize) -> Self {
        Self {
            current_url: start,
            chain: Vec::new(),
            deadline,
            max_redirects,
        }
    }

    /// The URL the next hop will request
    pub fn current_url(&self) -> &Url {
        &self.current_url
    }

    pub fn chain(&self) -> &[RedirectHop] {
        &self.chain
    }

    pub fn redirect_count(&self) -> usize {
        self.chain.len()
    }

    /// Time left before the chain deadline, or `None` once it has passed
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .checked_duration_since(now)
            .filter(|left| !left.is_zero())
    }

    /// Records a redirect and moves to its target
    ///
    /// # Errors
    ///
    /// * `HopError::TooManyRedirects` - the redirect budget is already spent
    /// * `HopError::InvalidRedirect` - `location` does not resolve to a fetchable URL
    ///
    /// On error the chain is left untouched.
    pub fn follow(&mut self, status: u16, location: &str) -> Result<(), HopError> {
        if self.chain.len() >= self.max_redirects {
            return Err(HopError::TooManyRedirects(self.max_redirects));
        }

        let next = resolve_location(&self.current_url, location)
            .map_err(|e| HopError::from_url_error(e, HopError::InvalidRedirect))?;

        self.chain.push(RedirectHop::new(status, location));
        self.current_url = next;
        Ok(())
    }

    /// Ends the chain cleanly at a non-redirect (or unfollowable) status
    pub fn finish(mut self, status: u16) -> ChainTrace {
        if let Some(last) = self.chain.last_mut() {
            last.final_status = Some(status);
        }

        ChainTrace {
            target_url: self.current_url.to_string(),
            chain: self.chain,
            final_status: status,
        }
    }

    /// Ends the chain with an error, keeping the hops gathered so far
    pub fn abort(self, error: HopError, observed_status: Option<u16>) -> ChainFailure {
        ChainFailure {
            target_url: self.current_url.to_string(),
            chain: self.chain,
            error,
            observed_status,
        }
    }
}

/// A chain that ended on a terminal status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTrace {
    pub target_url: String,
    pub chain: Vec<RedirectHop>,
    pub final_status: u16,
}

impl ChainTrace {
    pub fn into_result(self, source_url: &str, processing_time: u64) -> UrlCheckResult {
        let initial_status = self
            .chain
            .first()
            .map(|hop| hop.status)
            .unwrap_or(self.final_status);

        UrlCheckResult {
            source_url: source_url.to_string(),
            target_url: self.target_url,
            initial_status,
            final_status: Some(self.final_status),
            redirect_chain: self.chain,
            error: String::new(),
            processing_time,
        }
    }
}

/// A chain that ended in an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainFailure {
    pub target_url: String,
    pub chain: Vec<RedirectHop>,
    pub error: HopError,
    /// Status of the response that caused the error, if there was one
    pub observed_status: Option<u16>,
}

impl ChainFailure {
    pub fn is_retryable(&self) -> bool {
        self.error.is_retryable()
    }

    pub fn into_result(self, source_url: &str, processing_time: u64) -> UrlCheckResult {
        let initial_status = self
            .chain
            .first()
            .map(|hop| hop.status)
            .or(self.observed_status)
            .unwrap_or(0);

        UrlCheckResult {
            source_url: source_url.to_string(),
            target_url: self.target_url,
            initial_status,
            final_status: None,
            redirect_chain: self.chain,
            error: self.error.to_string(),
            processing_time,
        }
    }
}
