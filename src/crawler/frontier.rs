//! Breadth-first crawl frontier
//!
//! FIFO queue of `(url, depth)` entries plus the job's visited set. A URL is
//! marked visited the moment it is first seen, so it is queued at most once
//! and fetched at most once per job.

use std::collections::{HashSet, VecDeque};

/// A URL waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Normalized URL
    pub url: String,

    /// Link distance from the seed (seed is 0)
    pub depth: u32,
}

/// Frontier queue and visited set for one job
///
/// Owned by the coordinator's control loop; never shared.
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<FrontierEntry>,
    visited: HashSet<String>,
    max_depth: u32,
}

impl Frontier {
    /// Creates a frontier seeded with `(seed, 0)`
    ///
    /// # Arguments
    ///
    /// * `seed` - Normalized seed URL
    /// * `max_depth` - Deepest level that is still fetched
    pub fn new(seed: impl Into<String>, max_depth: u32) -> Self {
        let mut frontier = Self {
            queue: VecDeque::new(),
            visited: HashSet::new(),
            max_depth,
        };
        frontier.push(seed.into(), 0);
        frontier
    }

    /// Offers a discovered URL at `depth`
    ///
    /// Already-visited URLs are ignored. URLs deeper than the maximum depth
    /// are marked visited but never queued.
    ///
    /// # Returns
    ///
    /// True if the URL was queued for fetching
    pub fn push(&mut self, url: String, depth: u32) -> bool {
        if self.visited.contains(&url) {
            return false;
        }
        self.visited.insert(url.clone());

        if depth > self.max_depth {
            tracing::debug!("Not following {} (depth {} > {})", url, depth, self.max_depth);
            return false;
        }

        tracing::debug!("Queued {} at depth {}", url, depth);
        self.queue.push_back(FrontierEntry { url, depth });
        true
    }

    /// Records a URL as visited without queueing it
    ///
    /// # Returns
    ///
    /// True if the URL had not been seen before
    pub fn mark_visited(&mut self, url: impl Into<String>) -> bool {
        self.visited.insert(url.into())
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Removes the oldest queued entry
    pub fn pop(&mut self) -> Option<FrontierEntry> {
        self.queue.pop_front()
    }

    /// Number of queued entries
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_with_depth_zero() {
        let mut frontier = Frontier::new("https://example.com", 2);
        assert!(frontier.is_visited("https://example.com"));
        assert_eq!(
            frontier.pop(),
            Some(FrontierEntry {
                url: "https://example.com".to_string(),
                depth: 0
            })
        );
        assert!(frontier.is_empty());
    }

    #[test]
    fn test_fifo_order() {
        let mut frontier = Frontier::new("https://example.com", 3);
        frontier.pop();
        assert!(frontier.push("https://example.com/a".into(), 1));
        assert!(frontier.push("https://example.com/b".into(), 1));
        assert!(frontier.push("https://example.com/c".into(), 2));

        let order: Vec<String> = std::iter::from_fn(|| frontier.pop()).map(|e| e.url).collect();
        assert_eq!(
            order,
            vec![
                "https://example.com/a",
                "https://example.com/b",
                "https://example.com/c"
            ]
        );
    }

    #[test]
    fn test_duplicates_queued_once() {
        let mut frontier = Frontier::new("https://example.com", 2);
        assert!(frontier.push("https://example.com/a".into(), 1));
        assert!(!frontier.push("https://example.com/a".into(), 1));
        assert!(!frontier.push("https://example.com".into(), 1));
        assert_eq!(frontier.len(), 2);
    }

    #[test]
    fn test_too_deep_marked_but_not_queued() {
        let mut frontier = Frontier::new("https://example.com", 1);
        frontier.pop();

        assert!(!frontier.push("https://example.com/deep".into(), 2));
        assert!(frontier.is_visited("https://example.com/deep"));
        assert!(frontier.is_empty());

        // Seen once at a fetchable depth later: still not queued again
        assert!(!frontier.push("https://example.com/deep".into(), 1));
    }

    #[test]
    fn test_max_depth_zero_only_seed() {
        let mut frontier = Frontier::new("https://example.com", 0);
        assert!(!frontier.push("https://example.com/a".into(), 1));
        assert_eq!(frontier.len(), 1);
        assert_eq!(frontier.max_depth(), 0);
    }

    #[test]
    fn test_mark_visited() {
        let mut frontier = Frontier::new("https://example.com", 1);
        assert!(frontier.mark_visited("https://example.com/final"));
        assert!(!frontier.mark_visited("https://example.com/final"));
        assert!(!frontier.push("https://example.com/final".into(), 1));
        assert_eq!(frontier.visited_count(), 2);
    }
}
