//! CSV export of resolution results
//!
//! One row per URL. Every field is quoted so that URLs and error text with
//! commas or quotes survive spreadsheet import.

use crate::resolver::UrlCheckResult;
use std::io::Write;

/// Column headers, in output order
pub const CSV_HEADERS: [&str; 6] = [
    "Original URL",
    "Final URL",
    "Status Chain",
    "Redirect Count",
    "Error",
    "Processing Time (ms)",
];

/// Separator used between statuses in the "Status Chain" column
pub const STATUS_SEPARATOR: &str = " → ";

/// Formats the statuses observed along a chain, e.g. `301 → 302 → 200`
pub fn format_status_chain(result: &UrlCheckResult) -> String {
    result
        .status_chain()
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(STATUS_SEPARATOR)
}

/// Writes results as CSV rows
///
/// # Arguments
///
/// * `results` - Results to export, in the order they should appear
/// * `writer` - Destination
/// * `include_header` - Whether to write the header row first; pass `false`
///   when appending to an existing export
///
/// # Returns
///
/// The number of rows written, excluding the header
pub fn write_results<W: Write>(
    results: &[UrlCheckResult],
    writer: W,
    include_header: bool,
) -> Result<usize, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(writer);

    if include_header {
        writer.write_record(CSV_HEADERS)?;
    }

    for result in results {
        writer.write_record([
            result.source_url.as_str(),
            result.target_url.as_str(),
            format_status_chain(result).as_str(),
            result.redirect_count().to_string().as_str(),
            result.error.as_str(),
            result.processing_time.to_string().as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(results.len())
}
