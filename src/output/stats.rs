//! Statistics over a set of resolution results

use crate::resolver::UrlCheckResult;
use std::collections::HashMap;

/// Resolution statistics summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSummary {
    /// Total number of URLs resolved
    pub total: usize,

    /// URLs that reached a terminal status without error
    pub successful: usize,

    /// URLs that ended in an error
    pub failed: usize,

    /// Successful URLs that followed at least one redirect
    pub redirected: usize,

    /// Mean processing time in milliseconds
    pub average_processing_ms: f64,

    /// Count of results by terminal status
    pub final_statuses: HashMap<u16, usize>,

    /// Count of failures by error message
    pub errors: HashMap<String, usize>,
}

impl ResultSummary {
    /// Builds a summary from results
    pub fn from_results(results: &[UrlCheckResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };

        let mut total_ms: u64 = 0;
        for result in results {
            total_ms = total_ms.saturating_add(result.processing_time);

            if result.is_success() {
                summary.successful += 1;
                if result.redirect_count() > 0 {
                    summary.redirected += 1;
                }
            } else {
                summary.failed += 1;
                *summary.errors.entry(error_kind(&result.error)).or_default() += 1;
            }

            if let Some(status) = result.final_status {
                *summary.final_statuses.entry(status).or_default() += 1;
            }
        }

        if summary.total > 0 {
            summary.average_processing_ms = total_ms as f64 / summary.total as f64;
        }

        summary
    }

    /// Folds another batch of results into this summary
    pub fn merge(&mut self, other: &ResultSummary) {
        let combined = self.total + other.total;
        if combined > 0 {
            self.average_processing_ms = (self.average_processing_ms * self.total as f64
                + other.average_processing_ms * other.total as f64)
                / combined as f64;
        }

        self.total = combined;
        self.successful += other.successful;
        self.failed += other.failed;
        self.redirected += other.redirected;

        for (status, count) in &other.final_statuses {
            *self.final_statuses.entry(*status).or_default() += count;
        }
        for (error, count) in &other.errors {
            *self.errors.entry(error.clone()).or_default() += count;
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total > 0 {
            (self.successful as f64 / self.total as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Groups error messages by their prefix, so that "Network error: ..." variants count together
fn error_kind(error: &str) -> String {
    match error.split_once(':') {
        Some((kind, _)) => kind.to_string(),
        None => error.to_string(),
    }
}

/// Prints a summary to stderr in a formatted manner
///
/// Stdout carries the event stream, so the report goes to stderr.
pub fn print_summary(summary: &ResultSummary) {
    eprintln!("=== Resolution Summary ===\n");

    eprintln!("Overview:");
    eprintln!("  URLs resolved: {}", summary.total);
    eprintln!("  Successful: {}", summary.successful);
    eprintln!("  Redirected: {}", summary.redirected);
    eprintln!("  Failed: {}", summary.failed);
    eprintln!(
        "  Average processing time: {:.1}ms",
        summary.average_processing_ms
    );
    eprintln!();

    if !summary.final_statuses.is_empty() {
        eprintln!("Final Statuses:");
        let mut statuses: Vec<_> = summary.final_statuses.iter().collect();
        statuses.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));

        for (status, count) in statuses {
            eprintln!("  {}: {}", status, count);
        }
        eprintln!();
    }

    if !summary.errors.is_empty() {
        eprintln!("Error Summary:");
        let mut errors: Vec<_> = summary.errors.iter().collect();
        errors.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));

        for (error, count) in errors {
            eprintln!("  {}: {}", error, count);
        }
        eprintln!();
    }

    eprintln!(
        "Success Rate: {:.1}% ({} / {} URLs resolved without error)",
        summary.success_rate(),
        summary.successful,
        summary.total
    );
}
