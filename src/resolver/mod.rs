//! Resolver module: one URL in, one [`UrlCheckResult`] out
//!
//! This module contains:
//! - The result types shared with the scheduler and output layers
//! - The explicit hop-chain state machine
//! - The HTTP fetcher for single hops
//! - [`HttpResolver`], which ties them together with the retry policy

mod chain;
mod fetcher;
mod types;

pub use chain::{
    is_redirect_status, next_step, ChainFailure, ChainTrace, HopError, HopState, HopStep,
    REDIRECT_STATUSES,
};
pub use fetcher::{build_http_client, classify_error, send_hop, HopResponse};
pub use types::{RedirectHop, UrlCheckResult, PROCESSING_FAILED};

use crate::config::{HopMethod, ResolverConfig, UserAgentConfig};
use crate::url::{normalize_input, parse_target};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Instant;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::RetryIf;
use url::Url;

/// Anything that can turn a raw URL into a check result
///
/// Implementations never fail: every failure mode is captured in the
/// returned result's `error` field.
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, url: &str) -> UrlCheckResult;
}

/// Resolves redirect chains over HTTP
pub struct HttpResolver {
    client: Client,
    config: ResolverConfig,
}

impl HttpResolver {
    /// Creates a resolver with its own HTTP client
    ///
    /// # Returns
    ///
    /// * `Ok(HttpResolver)` - Ready to resolve
    /// * `Err(reqwest::Error)` - The HTTP client could not be built
    pub fn new(config: ResolverConfig, user_agent: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(user_agent, &config)?;
        Ok(Self::with_client(client, config))
    }

    /// Creates a resolver around an existing client
    ///
    /// The client must have automatic redirects disabled.
    pub fn with_client(client: Client, config: ResolverConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Follows the chain from `start` once, with a fresh deadline
    async fn follow_chain(&self, start: &Url, attempt: usize) -> Result<ChainTrace, ChainFailure> {
        let mut state = HopState::new(
            start.clone(),
            self.config.url_timeout(),
            self.config.max_redirects,
        );
        let mut method = self.config.method;

        loop {
            let remaining = match state.remaining(Instant::now()) {
                Some(remaining) => remaining,
                None => return Err(state.abort(HopError::Timeout, None)),
            };
            let timeout = remaining.min(self.config.request_timeout());

            tracing::debug!(
                "Attempt {} hop {}: {:?} {}",
                attempt,
                state.redirect_count(),
                method,
                state.current_url()
            );

            let response = match send_hop(&self.client, method, state.current_url(), timeout).await {
                Ok(response) => response,
                Err(e) => return Err(state.abort(e, None)),
            };

            if response.status == 405 && method == HopMethod::Head {
                if self.config.head_fallback_to_get {
                    tracing::debug!("HEAD rejected by {}, retrying hop as GET", state.current_url());
                    method = HopMethod::Get;
                    continue;
                }
                return Err(state.abort(HopError::MethodNotAllowed, Some(response.status)));
            }

            match next_step(response.status, response.location.as_deref()) {
                HopStep::Follow(location) => {
                    if let Err(e) = state.follow(response.status, location) {
                        return Err(state.abort(e, Some(response.status)));
                    }
                    method = self.config.method;
                }
                HopStep::Stop => return Ok(state.finish(response.status)),
            }
        }
    }
}

#[async_trait]
impl Resolve for HttpResolver {
    /// Resolves one URL, retrying the whole chain on transient failures
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Timeout (hop or chain) | Restart from the original URL |
    /// | Network error | Restart from the original URL |
    /// | Too many redirects | Report immediately |
    /// | Invalid redirect target | Report immediately |
    /// | HEAD rejected with 405 | Report immediately |
    async fn resolve(&self, url: &str) -> UrlCheckResult {
        let started = Instant::now();
        let normalized = normalize_input(url, &self.config.default_scheme);

        let start = match parse_target(&normalized) {
            Ok(start) => start,
            Err(e) => {
                let mut result = ChainFailure {
                    target_url: normalized,
                    chain: Vec::new(),
                    error: HopError::from_url_error(e, HopError::InvalidUrl),
                    observed_status: None,
                }
                .into_result(url, 0);
                result.processing_time = started.elapsed().as_millis() as u64;
                return result;
            }
        };

        let strategy = FixedInterval::new(self.config.retry_delay()).take(self.config.max_retries);
        let resolver = self;
        let start_ref = &start;
        let mut attempt = 0;

        let outcome = RetryIf::start(
            strategy,
            move || {
                attempt += 1;
                resolver.follow_chain(start_ref, attempt)
            },
            |failure: &ChainFailure| {
                let retry = failure.is_retryable();
                if retry {
                    tracing::warn!("Retrying {} after: {}", url, failure.error);
                }
                retry
            },
        )
        .await;

        let elapsed = started.elapsed().as_millis() as u64;
        let result = match outcome {
            Ok(trace) => trace.into_result(url, elapsed),
            Err(failure) => failure.into_result(url, elapsed),
        };

        tracing::debug!(
            "Resolved {} -> {} ({} redirects, {}ms){}",
            url,
            result.target_url,
            result.redirect_count(),
            result.processing_time,
            if result.error.is_empty() {
                String::new()
            } else {
                format!(": {}", result.error)
            }
        );

        result
    }
}
