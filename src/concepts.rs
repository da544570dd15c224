//! Acronym concept candidates
//!
//! Indexed chunks are scanned for runs of three or more capital letters. Each
//! term is offered to the concept sink once per job, with the text around it
//! as a context snippet.

use crate::sink::ConceptSink;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Characters of context kept on each side of a term
pub const SNIPPET_CONTEXT_CHARS: usize = 150;

/// A term found in page text plus the text around it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptCandidate {
    pub term: String,
    pub snippet: String,
    pub source_url: String,
}

fn acronym_regex() -> Option<&'static Regex> {
    static ACRONYM: OnceLock<Option<Regex>> = OnceLock::new();
    ACRONYM
        .get_or_init(|| Regex::new(r"\b([A-Z]{3,})\b").ok())
        .as_ref()
}

/// Returns `(term, snippet)` for every acronym occurrence in `text`
///
/// The snippet spans up to [`SNIPPET_CONTEXT_CHARS`] characters on each side
/// of the term, trimmed, with newlines replaced by spaces.
pub fn find_acronyms(text: &str) -> Vec<(String, String)> {
    let Some(regex) = acronym_regex() else {
        return Vec::new();
    };
    regex
        .find_iter(text)
        .map(|m| {
            let start = text[..m.start()]
                .char_indices()
                .rev()
                .nth(SNIPPET_CONTEXT_CHARS - 1)
                .map(|(i, _)| i)
                .unwrap_or(0);
            let end = text[m.end()..]
                .char_indices()
                .nth(SNIPPET_CONTEXT_CHARS)
                .map(|(i, _)| m.end() + i)
                .unwrap_or(text.len());
            let snippet = text[start..end].trim().replace('\n', " ");
            (m.as_str().to_string(), snippet)
        })
        .collect()
}

/// Per-job record of terms already accepted by the concept sink
#[derive(Debug, Default)]
pub struct ConceptTracker {
    seen: HashSet<String>,
}

impl ConceptTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers the acronyms found in `text` to the sink
    ///
    /// A term is remembered (case-insensitively) only once the sink accepts it,
    /// so a rejected term is offered again on its next occurrence.
    ///
    /// # Returns
    ///
    /// Number of terms the sink accepted
    pub async fn offer(&mut self, sink: &dyn ConceptSink, text: &str, source_url: &str) -> usize {
        let mut accepted = 0;
        for (term, snippet) in find_acronyms(text) {
            let key = term.to_lowercase();
            if self.seen.contains(&key) {
                continue;
            }
            match sink.add(&term, &snippet, source_url).await {
                Ok(()) => {
                    self.seen.insert(key);
                    accepted += 1;
                }
                Err(e) => {
                    tracing::warn!("Concept sink rejected '{}' from {}: {}", term, source_url, e);
                }
            }
        }
        accepted
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
