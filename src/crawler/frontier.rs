//! URL frontier for a single-host crawl
//!
//! FIFO queue of targets plus the state of every URL seen so far, keyed by the
//! normalized URL. A URL enters the frontier at most once per job.

use std::collections::{HashMap, VecDeque};

use url::Url;

use super::CrawlError;

/// A URL to crawl together with its identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    /// The URL to fetch, fragment removed
    pub url: Url,
    /// Host and explicit port, lowercased
    pub normalized_host: String,
    /// Scheme, host, port and path with query, fragment and trailing slash removed
    pub normalized: String,
}

impl CrawlTarget {
    /// Parse and normalize a URL string
    pub fn parse(raw: &str) -> Result<Self, CrawlError> {
        Self::from_url(Url::parse(raw.trim())?)
    }

    /// Normalize an already-parsed URL; only http(s) URLs with a host are crawlable
    pub fn from_url(mut url: Url) -> Result<Self, CrawlError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CrawlError::InvalidSeed(format!(
                "unsupported scheme '{}' in {}",
                url.scheme(),
                url
            )));
        }
        let Some(host) = url.host_str().map(str::to_lowercase) else {
            return Err(CrawlError::InvalidSeed(format!("no host in {}", url)));
        };
        url.set_fragment(None);

        // Url::port() is None for the scheme's default port
        let normalized_host = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host,
        };
        let path = url.path().trim_end_matches('/');
        let normalized = format!("{}://{}{}", url.scheme(), normalized_host, path);

        Ok(Self {
            url,
            normalized_host,
            normalized,
        })
    }
}

/// Lifecycle of a URL within a crawl; absent from the frontier means unvisited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlState {
    Queued,
    Fetching,
    Visited,
    Skipped,
}

/// Queue and visited set for one crawl
#[derive(Debug)]
pub struct Frontier {
    seed_host: String,
    queue: VecDeque<(usize, CrawlTarget)>,
    states: HashMap<String, UrlState>,
    next_sequence: usize,
}

impl Frontier {
    /// A frontier holding only the seed
    pub fn new(seed: CrawlTarget) -> Self {
        let mut frontier = Self {
            seed_host: seed.normalized_host.clone(),
            queue: VecDeque::new(),
            states: HashMap::new(),
            next_sequence: 0,
        };
        frontier.enqueue(seed);
        frontier
    }

    /// Host every enqueued URL must share
    pub fn seed_host(&self) -> &str {
        &self.seed_host
    }

    /// Follow the seed to the host it redirected to
    pub fn rehost(&mut self, host: &str) {
        self.seed_host = host.to_string();
    }

    /// Queue a target unless it is off-host or already known
    pub fn enqueue(&mut self, target: CrawlTarget) -> bool {
        if target.normalized_host != self.seed_host || self.states.contains_key(&target.normalized) {
            return false;
        }
        self.states.insert(target.normalized.clone(), UrlState::Queued);
        self.queue.push_back((self.next_sequence, target));
        self.next_sequence += 1;
        true
    }

    /// Next queued target with its discovery sequence number
    pub fn next(&mut self) -> Option<(usize, CrawlTarget)> {
        while let Some((sequence, target)) = self.queue.pop_front() {
            if self.state(&target.normalized) == Some(UrlState::Queued) {
                return Some((sequence, target));
            }
        }
        None
    }

    fn transition(&mut self, key: &str, to: UrlState) {
        if let Some(state) = self.states.get_mut(key) {
            *state = to;
        }
    }

    pub fn mark_fetching(&mut self, key: &str) {
        self.transition(key, UrlState::Fetching);
    }

    pub fn mark_visited(&mut self, key: &str) {
        self.transition(key, UrlState::Visited);
    }

    /// Record the page a redirect landed on as visited
    ///
    /// Returns `false` when that page was already visited, so its content is a
    /// duplicate.
    pub fn record_landing(&mut self, landed: &CrawlTarget) -> bool {
        let previous = self
            .states
            .insert(landed.normalized.clone(), UrlState::Visited);
        previous != Some(UrlState::Visited)
    }

    pub fn mark_skipped(&mut self, key: &str) {
        self.transition(key, UrlState::Skipped);
    }

    /// State of a normalized URL
    pub fn state(&self, key: &str) -> Option<UrlState> {
        self.states.get(key).copied()
    }

    /// Whether nothing is waiting in the queue
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of distinct URLs seen
    pub fn known(&self) -> usize {
        self.states.len()
    }
}
