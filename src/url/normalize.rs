use crate::UrlError;
use url::Url;

/// Prepends the default scheme to input that has none
///
/// The check is case-insensitive, so `HTTP://Example.com` is left alone. Input
/// starting with `//` (a scheme-relative reference) only receives the scheme.
/// Surrounding whitespace is trimmed; nothing else about the input changes, so
/// the caller's original text can still be reported verbatim.
///
/// # Examples
///
/// ```
/// use redirect_resolver::url::normalize_input;
///
/// assert_eq!(normalize_input("example.com", "https"), "https://example.com");
/// assert_eq!(normalize_input("http://example.com", "https"), "http://example.com");
/// ```
pub fn normalize_input(raw: &str, default_scheme: &str) -> String {
    let trimmed = raw.trim();
    let lowered = trimmed.to_ascii_lowercase();

    if lowered.starts_with("http://") || lowered.starts_with("https://") {
        trimmed.to_string()
    } else if let Some(rest) = trimmed.strip_prefix("//") {
        format!("{}://{}", default_scheme, rest)
    } else {
        format!("{}://{}", default_scheme, trimmed)
    }
}

/// Parses a normalized URL and checks that it can be fetched
///
/// # Returns
///
/// * `Ok(Url)` - An absolute http(s) URL with a host
/// * `Err(UrlError)` - Parse failure, unsupported scheme, or missing host
pub fn parse_target(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;
    check_fetchable(url)
}

/// Resolves a `Location` header value against the URL that returned it
///
/// Absolute locations replace the current URL entirely; relative references
/// (`/path`, `../up`, `?q=1`, `//host/path`) are joined per RFC 3986.
///
/// # Examples
///
/// ```
/// use redirect_resolver::url::resolve_location;
/// use url::Url;
///
/// let current = Url::parse("https://example.com/a/b").unwrap();
/// let next = resolve_location(&current, "/c").unwrap();
/// assert_eq!(next.as_str(), "https://example.com/c");
/// ```
pub fn resolve_location(current: &Url, location: &str) -> Result<Url, UrlError> {
    let location = location.trim();
    if location.is_empty() {
        return Err(UrlError::Parse("empty Location header".to_string()));
    }

    let next = current
        .join(location)
        .map_err(|e| UrlError::Parse(e.to_string()))?;
    check_fetchable(next)
}

fn check_fetchable(url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlError::MissingHost),
    }
}
