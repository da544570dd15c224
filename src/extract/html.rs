//! HTML parser for extracting page text, title and in-site links
//!
//! Non-content elements are skipped while walking the tree rather than
//! removed from it, so the parsed document stays immutable.

use super::decode::normalize_whitespace;
use super::ExtractionError;
use crate::url::{parse_normalized, site_key};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Elements whose subtrees never contribute text or links
const IGNORED_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "aside", "header", "head", "meta", "link", "noscript",
];

/// Primary-content landmarks, tried in order
const MAIN_REGION_SELECTORS: &[&str] = &["main", "article", "[role=\"main\"]", "body"];

/// Extracted information from an HTML page
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlPage {
    /// The page title (from the first <title> tag)
    pub title: Option<String>,

    /// Visible text of the primary content region, whitespace-collapsed
    pub text: String,

    /// Normalized in-site links, in document order without duplicates
    pub links: Vec<String>,
}

/// Parses an HTML document
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags outside ignored elements, resolved against the page URL
///
/// **Exclude:**
/// - Empty and fragment-only hrefs
/// - `javascript:`, `mailto:`, `tel:` links and data URIs
/// - Links that cannot be normalized
/// - Links outside the site identified by `site`
///
/// # Arguments
///
/// * `html` - Decoded HTML content
/// * `page_url` - URL the page was served from, used to resolve relative links
/// * `site` - Site key (`host[:port]`) links must belong to
///
/// # Returns
///
/// * `Ok(HtmlPage)` - Successfully parsed page
/// * `Err(ExtractionError::HtmlParse)` - Failed to build a selector
///
/// # Example
///
/// ```
/// use knowledge_crawler::extract::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><p>Hi</p><a href="/page">Link</a></body></html>"#;
/// let page_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &page_url, "example.com").unwrap();
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_html(html: &str, page_url: &Url, site: &str) -> Result<HtmlPage, ExtractionError> {
    let document = Html::parse_document(html);

    let title = extract_title(&document)?;
    let text = extract_main_text(&document)?;
    let links = extract_links(&document, page_url, site)?;

    Ok(HtmlPage { title, text, links })
}

fn selector(css: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(css).map_err(|e| ExtractionError::HtmlParse(format!("{}: {:?}", css, e)))
}

fn is_ignored_tag(name: &str) -> bool {
    IGNORED_TAGS.contains(&name)
}

/// True if the element or any of its ancestors is an ignored element
fn inside_ignored(element: &ElementRef) -> bool {
    is_ignored_tag(element.value().name())
        || element
            .ancestors()
            .filter_map(|node| node.value().as_element())
            .any(|el| is_ignored_tag(el.name()))
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Result<Option<String>, ExtractionError> {
    let title_selector = selector("title")?;

    Ok(document
        .select(&title_selector)
        .next()
        .map(|element| normalize_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty()))
}

/// Locates the primary content region and returns its visible text
fn extract_main_text(document: &Html) -> Result<String, ExtractionError> {
    let mut region = None;
    for css in MAIN_REGION_SELECTORS {
        let sel = selector(css)?;
        if let Some(found) = document.select(&sel).find(|el| !inside_ignored(el)) {
            region = Some(found);
            break;
        }
    }
    let region = region.unwrap_or_else(|| document.root_element());

    let mut parts = Vec::new();
    collect_text(region, &mut parts);
    Ok(normalize_whitespace(&parts.join(" ")))
}

/// Pushes every non-blank text node under `element`, skipping ignored subtrees
fn collect_text<'a>(element: ElementRef<'a>, parts: &mut Vec<&'a str>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed);
            }
        } else if let Some(child_element) = ElementRef::wrap(child) {
            if !is_ignored_tag(child_element.value().name()) {
                collect_text(child_element, parts);
            }
        }
    }
}

/// Extracts normalized in-site links from the HTML document
fn extract_links(document: &Html, page_url: &Url, site: &str) -> Result<Vec<String>, ExtractionError> {
    let a_selector = selector("a[href]")?;
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&a_selector) {
        if inside_ignored(&element) {
            continue;
        }

        let Some(href) = element.value().attr("href") else {
            continue;
        };

        if let Some(link) = resolve_link(href, page_url, site) {
            if seen.insert(link.clone()) {
                links.push(link);
            }
        }
    }

    Ok(links)
}

/// Resolves a link href to a normalized, in-site absolute URL
///
/// Returns None if the link should be excluded:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel: schemes and data: URIs
/// - URLs that cannot be normalized
/// - URLs on another site
fn resolve_link(href: &str, page_url: &Url, site: &str) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let absolute = page_url.join(href).ok()?;
    let normalized = parse_normalized(absolute.as_str()).ok()?;

    match site_key(&normalized) {
        Some(key) if key.eq_ignore_ascii_case(site) => Some(normalized.to_string()),
        _ => None,
    }
}
