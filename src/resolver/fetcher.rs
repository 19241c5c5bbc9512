//! HTTP hop fetcher
//!
//! This module handles the network side of resolution:
//! - Building the HTTP client with an identifying user agent
//! - Issuing a single HEAD or GET request with redirects disabled
//! - Classifying client errors into timeouts and network failures

use crate::config::{HopMethod, ResolverConfig, UserAgentConfig};
use crate::resolver::chain::HopError;
use reqwest::{header::LOCATION, redirect::Policy, Client};
use std::error::Error as StdError;
use std::time::Duration;
use url::Url;

/// Upper bound for establishing a connection, independent of the hop timeout
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Status and `Location` of one hop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopResponse {
    pub status: u16,
    pub location: Option<String>,
}

/// Builds an HTTP client for redirect resolution
///
/// Redirects are never followed by the client itself; the resolver walks the
/// chain hop by hop so it can record every status and `Location`.
///
/// # Example
///
/// ```no_run
/// use redirect_resolver::config::{ResolverConfig, UserAgentConfig};
/// use redirect_resolver::resolver::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), &ResolverConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    config: &ResolverConfig,
) -> Result<Client, reqwest::Error> {
    let request_timeout = config.request_timeout();

    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(request_timeout)
        .connect_timeout(request_timeout.min(MAX_CONNECT_TIMEOUT))
        .redirect(Policy::none()) // Handle redirects manually
        .gzip(true)
        .brotli(true)
        .build()
}

/// Sends one request and returns its status and `Location` header
///
/// The body is never read; dropping the response closes it.
///
/// # Arguments
///
/// * `client` - Client built by [`build_http_client`]
/// * `method` - HEAD or GET
/// * `url` - The hop to request
/// * `timeout` - Timeout for this request, already capped by the chain deadline
pub async fn send_hop(
    client: &Client,
    method: HopMethod,
    url: &Url,
    timeout: Duration,
) -> Result<HopResponse, HopError> {
    let builder = match method {
        HopMethod::Head => client.head(url.clone()),
        HopMethod::Get => client.get(url.clone()),
    };

    let response = builder
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| classify_error(&e))?;

    let location = response
        .headers()
        .get(LOCATION)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

    Ok(HopResponse {
        status: response.status().as_u16(),
        location,
    })
}

/// Maps a client error onto the resolver's error taxonomy
///
/// | Condition | Result |
/// |-----------|--------|
/// | Timeout (connect or total) | `HopError::Timeout` |
/// | DNS, refused, reset, TLS   | `HopError::Network` with the cause chain |
pub fn classify_error(error: &reqwest::Error) -> HopError {
    if error.is_timeout() {
        HopError::Timeout
    } else {
        HopError::Network(describe_error(error))
    }
}

/// Joins an error with its sources, e.g. `error sending request: dns error: no such host`
fn describe_error(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();

    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }

    message
}
