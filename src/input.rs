//! URL list input
//!
//! Accepts either a CSV file with a `url` (or `urls`/`link`) column, or a plain
//! list with one URL per line. Lines starting with `#` are ignored in plain
//! lists.

use crate::InputError;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const URL_COLUMNS: [&str; 3] = ["url", "urls", "link"];

/// Trims every entry and drops the empty ones, keeping order and duplicates
pub fn clean_urls<I, S>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    urls.into_iter()
        .map(|url| url.as_ref().trim().to_string())
        .filter(|url| !url.is_empty())
        .collect()
}

/// Reads a URL list from a file
///
/// # Errors
///
/// * `InputError::Io` - The file could not be read
/// * `InputError::NoValidUrls` - Nothing usable was found
pub fn read_urls(path: &Path) -> Result<Vec<String>, InputError> {
    let file = File::open(path)?;
    read_urls_from(file)
}

/// Reads a URL list from any reader
///
/// The first non-comment line decides the format: a header naming a URL
/// column selects CSV parsing, anything else is read as one URL per line.
pub fn read_urls_from<R: Read>(mut reader: R) -> Result<Vec<String>, InputError> {
    let mut content = String::new();
    reader.read_to_string(&mut content)?;

    let mut header_reader = csv_reader(content.as_bytes());
    let first = match header_reader.records().next() {
        Some(record) => record?,
        None => return Err(InputError::NoValidUrls),
    };

    let column = first.iter().position(|field| {
        URL_COLUMNS
            .iter()
            .any(|name| field.eq_ignore_ascii_case(name))
    });

    let urls = match column {
        Some(index) => {
            tracing::debug!("Reading URLs from CSV column {}", index);
            let mut urls = Vec::new();
            for record in csv_reader(content.as_bytes()).records().skip(1) {
                let record = record?;
                if let Some(url) = record.get(index) {
                    urls.push(url.to_string());
                }
            }
            urls
        }
        None => {
            if first.len() > 1 && looks_like_header(&first) {
                return Err(InputError::MissingUrlColumn);
            }
            // Whole lines, so commas inside a URL are kept
            content
                .lines()
                .filter(|line| !line.trim_start().starts_with('#'))
                .map(str::to_string)
                .collect()
        }
    };

    let urls = clean_urls(urls);
    if urls.is_empty() {
        return Err(InputError::NoValidUrls);
    }

    tracing::info!("Loaded {} URLs", urls.len());
    Ok(urls)
}

fn csv_reader(bytes: &[u8]) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(bytes)
}

/// A multi-column first row with no URL-ish field is treated as a header
fn looks_like_header(record: &csv::StringRecord) -> bool {
    !record
        .iter()
        .any(|field| field.contains('.') || field.contains("://"))
}
