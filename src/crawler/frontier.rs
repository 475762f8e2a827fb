//! Breadth-first frontier: the pending queue and the visited set
//!
//! Everything in the pending queue is already normalized. URLs only get in
//! through [`Frontier::enqueue_new`], which normalizes them and drops the ones
//! that are visited or already recorded.

use crate::url::normalize_url;
use std::collections::{HashSet, VecDeque};

/// FIFO queue of URLs to crawl plus the URLs handled this run
#[derive(Debug, Default)]
pub struct Frontier {
    pending: VecDeque<String>,
    visited: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes `candidates` and appends the new ones in order
    ///
    /// A candidate is dropped when it fails to normalize, is in the visited
    /// set, repeats an earlier candidate of the same call, or `is_recorded`
    /// says the result store already has it. URLs that are already pending
    /// are not dropped; the dequeue side skips them once visited.
    ///
    /// Returns how many URLs were appended.
    pub fn enqueue_new<'a, I, F, E>(&mut self, candidates: I, mut is_recorded: F) -> Result<usize, E>
    where
        I: IntoIterator<Item = &'a str>,
        F: FnMut(&str) -> Result<bool, E>,
    {
        let mut batch = HashSet::new();
        let mut added = 0;

        for candidate in candidates {
            let url = match normalize_url(candidate) {
                Ok(url) => url,
                Err(e) => {
                    tracing::debug!("Dropping link {}: {}", candidate, e);
                    continue;
                }
            };

            if self.visited.contains(&url) || batch.contains(&url) {
                continue;
            }
            if is_recorded(&url)? {
                continue;
            }

            batch.insert(url.clone());
            self.pending.push_back(url);
            added += 1;
        }

        Ok(added)
    }

    /// Removes and returns the oldest pending URL
    pub fn pop(&mut self) -> Option<String> {
        self.pending.pop_front()
    }

    /// Puts a dequeued URL back at the head of the queue
    pub fn push_front(&mut self, url: String) {
        self.pending.push_front(url);
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Adds `url` to the visited set; returns false if it was already there
    pub fn mark_visited(&mut self, url: String) -> bool {
        self.visited.insert(url)
    }

    /// Pending URLs, oldest first
    pub fn pending(&self) -> impl Iterator<Item = &String> + '_ {
        self.pending.iter()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
