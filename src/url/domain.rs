use url::Url;

/// Returns the site key of a URL: its lowercase host plus an explicit port
///
/// Two URLs belong to the same site when their site keys are equal. Default
/// ports are already dropped by the `url` crate, so `https://example.com:443/`
/// and `https://example.com/` share the key `example.com`.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use knowledge_crawler::url::site_key;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(site_key(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(site_key(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn site_key(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    if host.is_empty() {
        return None;
    }
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

/// Returns the base URL (`scheme://host[:port]`) of a URL
///
/// Used as the `base_url` metadata on every chunk so the index can be filtered
/// by site.
pub fn base_url(url: &Url) -> Option<String> {
    let key = site_key(url)?;
    Some(format!("{}://{}", url.scheme(), key))
}
