//! Invocation planning: slicing the input, partitioning into batches, and
//! describing leftover work as a continuation token

use crate::input::clean_urls;
use crate::InputError;
use serde::{Deserialize, Serialize};

/// Descriptor a caller echoes back to resume a URL list
///
/// `remaining_urls` is always the unprocessed suffix of the original list and
/// `start_index` is the position of its first element in that list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuationToken {
    pub remaining_urls: Vec<String>,
    pub start_index: usize,
    pub total_urls: usize,
}

impl ContinuationToken {
    /// Checks that the token describes a non-empty suffix of a list
    pub fn validate(&self) -> Result<(), InputError> {
        if self.remaining_urls.is_empty() {
            return Err(InputError::MalformedContinuation(
                "remaining_urls is empty".to_string(),
            ));
        }

        if self.start_index + self.remaining_urls.len() != self.total_urls {
            return Err(InputError::MalformedContinuation(format!(
                "start_index {} plus {} remaining URLs does not match total_urls {}",
                self.start_index,
                self.remaining_urls.len(),
                self.total_urls
            )));
        }

        Ok(())
    }

    /// Parses and validates a token received from a caller
    pub fn from_json(json: &str) -> Result<Self, InputError> {
        let token: Self = serde_json::from_str(json)
            .map_err(|e| InputError::MalformedContinuation(e.to_string()))?;
        token.validate()?;
        Ok(token)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// What a caller submits to one invocation
#[derive(Debug, Clone)]
pub enum Invocation {
    /// A new URL list
    Fresh(Vec<String>),
    /// A token from an earlier `batch_complete` event
    Resume(ContinuationToken),
}

impl Invocation {
    /// Validates the input and computes this invocation's slice
    pub fn into_job(self, per_invocation_limit: usize) -> Result<BatchJob, InputError> {
        match self {
            Self::Fresh(urls) => {
                let urls = clean_urls(urls);
                BatchJob::plan(&urls, 0, per_invocation_limit)
            }
            Self::Resume(token) => BatchJob::from_token(token, per_invocation_limit),
        }
    }
}

/// A contiguous group of URLs resolved sequentially by one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Position of the batch within the invocation
    pub index: usize,
    /// Position of the batch's first URL within the job slice
    pub offset: usize,
    pub urls: Vec<String>,
}

/// The slice of work handled by a single invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    /// URLs processed by this invocation, in input order
    pub urls: Vec<String>,
    /// Position of `urls[0]` in the original list
    pub start_index: usize,
    /// Length of the original list
    pub total_urls: usize,
    /// URLs after this slice, left for later invocations
    pub remaining: Vec<String>,
    /// Whether this is the first invocation over the list
    pub fresh: bool,
}

impl BatchJob {
    /// Plans the slice `[start_index, start_index + limit)` of `urls`
    ///
    /// # Errors
    ///
    /// * `InputError::NoValidUrls` - `urls` is empty
    /// * `InputError::MalformedContinuation` - `start_index` is past the end
    pub fn plan(urls: &[String], start_index: usize, limit: usize) -> Result<Self, InputError> {
        if urls.is_empty() {
            return Err(InputError::NoValidUrls);
        }

        if start_index >= urls.len() {
            return Err(InputError::MalformedContinuation(format!(
                "start_index {} is beyond the {} submitted URLs",
                start_index,
                urls.len()
            )));
        }

        let end = start_index.saturating_add(limit.max(1)).min(urls.len());

        Ok(Self {
            urls: urls[start_index..end].to_vec(),
            start_index,
            total_urls: urls.len(),
            remaining: urls[end..].to_vec(),
            fresh: start_index == 0,
        })
    }

    /// Plans the next slice of a resumed list
    pub fn from_token(token: ContinuationToken, limit: usize) -> Result<Self, InputError> {
        token.validate()?;

        let ContinuationToken {
            mut remaining_urls,
            start_index,
            total_urls,
        } = token;

        let split = limit.max(1).min(remaining_urls.len());
        let remaining = remaining_urls.split_off(split);

        Ok(Self {
            urls: remaining_urls,
            start_index,
            total_urls,
            remaining,
            fresh: false,
        })
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Splits the slice into fixed-size batches, the last one possibly shorter
    pub fn batches(&self, batch_size: usize) -> Vec<Batch> {
        self.urls
            .chunks(batch_size.max(1))
            .enumerate()
            .map(|(index, chunk)| Batch {
                index,
                offset: index * batch_size.max(1),
                urls: chunk.to_vec(),
            })
            .collect()
    }

    /// Describes what is left after the first `completed` URLs of the slice
    ///
    /// Returns `None` when the whole original list has been processed.
    pub fn continuation(&self, completed: usize) -> Option<ContinuationToken> {
        let completed = completed.min(self.urls.len());
        let remaining_urls: Vec<String> = self.urls[completed..]
            .iter()
            .chain(self.remaining.iter())
            .cloned()
            .collect();

        if remaining_urls.is_empty() {
            return None;
        }

        Some(ContinuationToken {
            remaining_urls,
            start_index: self.start_index + completed,
            total_urls: self.total_urls,
        })
    }
}
