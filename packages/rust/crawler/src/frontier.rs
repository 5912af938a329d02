//! Frontier state for the crawl traversal loop.
//!
//! All state here is owned exclusively by the single traversal loop; there
//! is no locking because there is no sharing. A host program running several
//! crawls owns one independent [`CrawlState`] per crawl.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use url::Url;

/// A not-yet-visited URL paired with its discovery depth.
#[derive(Debug, Clone)]
pub struct FrontierEntry {
    pub url: Url,
    pub depth: u32,
}

/// Advisory stop signal for a running crawl.
///
/// Checked only at the top of the dequeue loop — an in-flight fetch is
/// allowed to complete.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the crawl loop to stop before its next dequeue.
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Mutable crawl state: FIFO frontier, visited set, counters, error log.
#[derive(Debug)]
pub struct CrawlState {
    pending: VecDeque<FrontierEntry>,
    /// URLs that have left the pending queue, regardless of outcome, plus
    /// asset URLs already fetched. Pages are keyed on their normalized
    /// form, assets on their full form.
    visited: HashSet<String>,
    /// Everything ever enqueued, so an entry is enqueued at most once.
    queued: HashSet<String>,
    errors: Vec<String>,
    pages_found: usize,
    pages_downloaded: usize,
}

impl CrawlState {
    /// State seeded with the start URL at depth 0.
    pub fn new(start_url: &Url) -> Self {
        let mut queued = HashSet::new();
        queued.insert(normalize_page_url(start_url));

        Self {
            pending: VecDeque::from([FrontierEntry {
                url: start_url.clone(),
                depth: 0,
            }]),
            visited: HashSet::new(),
            queued,
            errors: Vec::new(),
            pages_found: 0,
            pages_downloaded: 0,
        }
    }

    /// Pop the head of the queue (FIFO, breadth-first).
    pub fn pop(&mut self) -> Option<FrontierEntry> {
        self.pending.pop_front()
    }

    pub fn is_visited(&self, key: &str) -> bool {
        self.visited.contains(key)
    }

    /// Mark a URL as visited. Returns false if it already was.
    pub fn mark_visited(&mut self, key: impl Into<String>) -> bool {
        self.visited.insert(key.into())
    }

    /// Enqueue a discovered link at `depth`, unless it was ever enqueued or
    /// visited before. Each newly queued link counts toward `pages_found`.
    pub fn enqueue(&mut self, url: Url, depth: u32) -> bool {
        let key = normalize_page_url(&url);
        if self.visited.contains(&key) || !self.queued.insert(key) {
            return false;
        }

        self.pending.push_back(FrontierEntry { url, depth });
        self.pages_found += 1;
        true
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn note_downloaded(&mut self) {
        self.pages_downloaded += 1;
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn pages_found(&self) -> usize {
        self.pages_found
    }

    pub fn pages_downloaded(&self) -> usize {
        self.pages_downloaded
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<String> {
        self.errors
    }
}

/// Normalized form used to deduplicate page URLs: fragment and query
/// stripped. Asset URLs are deliberately deduplicated on their full form
/// instead.
pub fn normalize_page_url(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    normalized.set_query(None);
    normalized.to_string()
}
