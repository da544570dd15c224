use crate::UrlError;
use url::Url;

/// Parses and normalizes a URL, failing if it cannot be normalized
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require an `http` or `https` scheme and a non-empty host
/// 3. Lowercase scheme and host (the `url` crate does this for HTTP(S))
/// 4. Remove trailing slashes from the path (except for root `/`)
/// 5. Remove the fragment
/// 6. Keep the query string as-is; drop it only when empty (trailing `?`)
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL
/// * `Err(UrlError)` - Failed to parse or normalize the URL
///
/// # Examples
///
/// ```
/// use knowledge_crawler::url::parse_normalized;
///
/// let url = parse_normalized("HTTP://Example.COM/docs/?page=2#top").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/docs?page=2");
/// ```
pub fn parse_normalized(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(UrlError::MissingHost(url_str.to_string())),
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url)
}

/// Normalizes a URL string, returning the input unchanged when it cannot be parsed
///
/// This is the total form of [`parse_normalized`]: it never fails. Callers that
/// need to know whether normalization succeeded should check the result with
/// [`crate::url::is_valid_url`] and drop the entry otherwise.
///
/// The function is idempotent: `normalize_url(&normalize_url(u)) == normalize_url(u)`.
///
/// # Examples
///
/// ```
/// use knowledge_crawler::url::normalize_url;
///
/// assert_eq!(normalize_url("https://EXAMPLE.com/a/"), "https://example.com/a");
/// assert_eq!(normalize_url("not a url"), "not a url");
/// ```
pub fn normalize_url(url_str: &str) -> String {
    match parse_normalized(url_str) {
        Ok(url) => url.to_string(),
        Err(_) => url_str.to_string(),
    }
}

/// Removes trailing slashes from a path, keeping the root `/`
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
