//! URL handling module for Knowledge-Crawler
//!
//! This module provides URL normalization, validity checks and site-scope
//! decisions. Everything here is pure: no I/O, no panics on malformed input.

mod domain;
mod normalize;

use ::url::Url;

// Re-export main functions
pub use domain::{base_url, site_key};
pub use normalize::{normalize_url, parse_normalized};

/// Returns true iff the URL uses `http`/`https` and has a non-empty host
///
/// # Examples
///
/// ```
/// use knowledge_crawler::url::is_valid_url;
///
/// assert!(is_valid_url("https://example.com/page"));
/// assert!(!is_valid_url("ftp://example.com/file"));
/// assert!(!is_valid_url("not a url"));
/// ```
pub fn is_valid_url(url_str: &str) -> bool {
    match Url::parse(url_str.trim()) {
        Ok(url) => {
            (url.scheme() == "http" || url.scheme() == "https")
                && url.host_str().is_some_and(|h| !h.is_empty())
        }
        Err(_) => false,
    }
}

/// Checks whether a URL lies inside the site identified by `base_site`
///
/// `base_site` is a site key as produced by [`site_key`] (`host` or
/// `host:port`). The comparison is case-insensitive. Unparsable URLs are never
/// in scope.
///
/// # Examples
///
/// ```
/// use knowledge_crawler::url::is_same_site;
///
/// assert!(is_same_site("https://EXAMPLE.com/a", "example.com"));
/// assert!(!is_same_site("https://other.com/a", "example.com"));
/// ```
pub fn is_same_site(url_str: &str, base_site: &str) -> bool {
    match Url::parse(url_str.trim()) {
        Ok(url) => site_key(&url).is_some_and(|key| key.eq_ignore_ascii_case(base_site)),
        Err(_) => false,
    }
}
