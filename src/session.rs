use std::collections::{BTreeMap, BTreeSet};

/// Accumulated state of one crawl run.
///
/// Processed and excluded URLs only ever grow and never overlap. The driver owns
/// the session and is the only writer; fetch tasks report back to it at level
/// boundaries instead of mutating it concurrently.
#[derive(Debug, Clone, Default)]
pub struct CrawlSession {
    target_domains: BTreeSet<String>,
    processed: BTreeSet<String>,
    excluded: BTreeSet<String>,
    redirects: BTreeMap<String, String>,
    failures: BTreeMap<String, u32>,
    max_attempts: Option<u32>,
}

impl CrawlSession {
    /// `max_attempts = None` retries a failing URL for as long as it stays in the frontier.
    pub fn new(target_domains: BTreeSet<String>, max_attempts: Option<u32>) -> Self {
        Self {
            target_domains,
            max_attempts,
            ..Self::default()
        }
    }

    pub fn target_domains(&self) -> &BTreeSet<String> {
        &self.target_domains
    }

    pub fn processed(&self) -> &BTreeSet<String> {
        &self.processed
    }

    pub fn excluded(&self) -> &BTreeSet<String> {
        &self.excluded
    }

    pub fn redirects(&self) -> &BTreeMap<String, String> {
        &self.redirects
    }

    pub fn is_processed(&self, url: &str) -> bool {
        self.processed.contains(url)
    }

    pub fn is_excluded(&self, url: &str) -> bool {
        self.excluded.contains(url)
    }

    /// A URL whose fetch failed `max_attempts` times; it is never scheduled again.
    pub fn is_abandoned(&self, url: &str) -> bool {
        match (self.max_attempts, self.failures.get(url)) {
            (Some(max), Some(failed)) => *failed >= max,
            _ => false,
        }
    }

    pub fn mark_processed(&mut self, url: String) {
        debug_assert!(!self.excluded.contains(&url), "excluded url was fetched: {url}");
        self.processed.insert(url);
    }

    /// Processed URLs are never excluded; such requests are ignored.
    pub fn exclude(&mut self, url: String) {
        if self.processed.contains(&url) {
            return;
        }
        self.excluded.insert(url);
    }

    pub fn exclude_all<I>(&mut self, urls: I)
    where
        I: IntoIterator<Item = String>,
    {
        for url in urls {
            self.exclude(url);
        }
    }

    /// Later redirects observed on the same origin replace earlier ones.
    pub fn record_redirect(&mut self, from: String, to: String) {
        self.redirects.insert(from, to);
    }

    /// Returns the number of failed attempts for `url` so far.
    pub fn record_failure(&mut self, url: &str) -> u32 {
        let failed = self.failures.entry(url.to_owned()).or_insert(0);
        *failed = failed.saturating_add(1);
        *failed
    }

    /// URLs that failed at least once and were neither processed nor excluded.
    pub fn failed(&self) -> impl Iterator<Item = &str> {
        self.failures
            .keys()
            .filter(|url| !self.processed.contains(*url) && !self.excluded.contains(*url))
            .map(String::as_str)
    }
}
