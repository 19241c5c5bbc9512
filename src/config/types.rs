use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Redirect-Resolver
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default, rename = "user-agent")]
    pub user_agent: UserAgentConfig,
}

/// HTTP method used for each hop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HopMethod {
    #[default]
    Head,
    Get,
}

/// Per-URL resolution behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Maximum number of redirects followed before giving up
    #[serde(rename = "max-redirects")]
    pub max_redirects: usize,

    /// Timeout for a single hop (milliseconds)
    #[serde(rename = "request-timeout-ms")]
    pub request_timeout_ms: u64,

    /// Wall-clock budget for the whole hop chain of one URL (milliseconds)
    #[serde(rename = "url-timeout-ms")]
    pub url_timeout_ms: u64,

    /// Whole-URL retries after a network error or timeout
    #[serde(rename = "max-retries")]
    pub max_retries: usize,

    /// Delay between whole-URL retries (milliseconds)
    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,

    /// Scheme prepended to input that has none ("http" or "https")
    #[serde(rename = "default-scheme")]
    pub default_scheme: String,

    /// Request method for each hop
    pub method: HopMethod,

    /// Reissue a hop as GET when a server answers HEAD with 405
    #[serde(rename = "head-fallback-to-get")]
    pub head_fallback_to_get: bool,
}

impl ResolverConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn url_timeout(&self) -> Duration {
        Duration::from_millis(self.url_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Longest time one URL can take: every attempt plus the pauses between them
    pub fn max_url_budget_ms(&self) -> u64 {
        let attempts = self.max_retries as u64 + 1;
        attempts
            .saturating_mul(self.url_timeout_ms)
            .saturating_add((self.max_retries as u64).saturating_mul(self.retry_delay_ms))
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_redirects: 10,
            request_timeout_ms: 5_000,
            url_timeout_ms: 10_000,
            max_retries: 2,
            retry_delay_ms: 250,
            default_scheme: "https".to_string(),
            method: HopMethod::Head,
            head_fallback_to_get: false,
        }
    }
}

/// Batching and concurrency configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of URLs per batch
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Maximum number of batches running at once
    #[serde(rename = "max-concurrent-batches")]
    pub max_concurrent_batches: usize,

    /// Maximum number of URLs processed by a single invocation
    #[serde(rename = "per-invocation-limit")]
    pub per_invocation_limit: usize,

    /// Pause between consecutive URLs of one batch (milliseconds)
    #[serde(rename = "inter-request-delay-ms")]
    pub inter_request_delay_ms: u64,

    /// Emit a progress event every N completed URLs
    #[serde(rename = "progress-every")]
    pub progress_every: usize,

    /// Outer deadline for one invocation (milliseconds)
    #[serde(rename = "invocation-timeout-ms")]
    pub invocation_timeout_ms: u64,
}

impl SchedulerConfig {
    pub fn inter_request_delay(&self) -> Duration {
        Duration::from_millis(self.inter_request_delay_ms)
    }

    pub fn invocation_timeout(&self) -> Duration {
        Duration::from_millis(self.invocation_timeout_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_concurrent_batches: 3,
            per_invocation_limit: 100,
            inter_request_delay_ms: 100,
            progress_every: 1,
            invocation_timeout_ms: 55_000,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the client
    #[serde(rename = "client-name")]
    pub client_name: String,

    /// Version of the client
    #[serde(rename = "client-version")]
    pub client_version: String,

    /// URL with information about the client
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.client_name, self.client_version, self.contact_url
        )
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            client_name: "RedirectResolver".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/redirect-resolver".to_string(),
        }
    }
}
