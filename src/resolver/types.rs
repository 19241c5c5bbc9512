use serde::{Deserialize, Serialize};

/// Error text used for URLs whose batch failed as a whole
pub const PROCESSING_FAILED: &str = "Processing failed";

/// One redirect response within a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectHop {
    /// Redirect status code (301, 302, 303, 307 or 308)
    pub status: u16,

    /// The `Location` header value exactly as received (may be relative)
    pub url: String,

    /// Status of the hop's target; only set on the last hop of a completed chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_status: Option<u16>,
}

impl RedirectHop {
    pub fn new(status: u16, url: impl Into<String>) -> Self {
        Self {
            status,
            url: url.into(),
            final_status: None,
        }
    }
}

/// Outcome of resolving a single input URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlCheckResult {
    /// The input exactly as given
    pub source_url: String,

    /// The URL fetched when resolution stopped
    pub target_url: String,

    /// Status of the first hop, or the only status observed
    pub initial_status: u16,

    /// Status of the last hop; absent when resolution ended in an error
    #[serde(default)]
    pub final_status: Option<u16>,

    /// Redirects in the order they were followed
    #[serde(default)]
    pub redirect_chain: Vec<RedirectHop>,

    /// Empty on success
    #[serde(default)]
    pub error: String,

    /// Milliseconds spent on this URL, retries included
    pub processing_time: u64,
}

impl UrlCheckResult {
    /// Builds a result for a URL that could not be processed at all
    pub fn processing_failed(source_url: impl Into<String>) -> Self {
        Self::failure(source_url, PROCESSING_FAILED)
    }

    /// Builds a failure result with an empty chain
    pub fn failure(source_url: impl Into<String>, error: impl Into<String>) -> Self {
        let source_url = source_url.into();
        Self {
            target_url: source_url.clone(),
            source_url,
            initial_status: 0,
            final_status: None,
            redirect_chain: Vec::new(),
            error: error.into(),
            processing_time: 0,
        }
    }

    /// Returns true if resolution reached a non-redirect status without error
    pub fn is_success(&self) -> bool {
        self.error.is_empty()
    }

    /// Number of redirects that were followed
    pub fn redirect_count(&self) -> usize {
        self.redirect_chain.len()
    }

    /// Every redirect status followed by the terminal status, when there is one
    pub fn status_chain(&self) -> Vec<u16> {
        self.redirect_chain
            .iter()
            .map(|hop| hop.status)
            .chain(self.final_status)
            .collect()
    }
}
