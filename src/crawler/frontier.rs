//! Breadth-first work queue
//!
//! The frontier hands out URLs in insertion order. Every URL is admitted at
//! most once per run: once queued it is remembered, and once visited it is
//! never handed out again.

use std::collections::{HashSet, VecDeque};

/// FIFO queue of canonical URLs with visited tracking
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<String>,
    /// Every URL ever admitted to the queue
    queued: HashSet<String>,
    visited: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a frontier seeded with the given URLs, in order
    pub fn seeded<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut frontier = Self::new();
        for url in urls {
            frontier.push(url);
        }
        frontier
    }

    /// Queues a URL unless it was queued or visited before
    ///
    /// Returns true if the URL was admitted.
    pub fn push(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.visited.contains(&url) || !self.queued.insert(url.clone()) {
            return false;
        }
        self.queue.push_back(url);
        true
    }

    /// Takes the next URL that has not been visited yet
    pub fn pop(&mut self) -> Option<String> {
        while let Some(url) = self.queue.pop_front() {
            if !self.visited.contains(&url) {
                return Some(url);
            }
        }
        None
    }

    /// Takes up to `size` unvisited URLs
    pub fn next_batch(&mut self, size: usize) -> Vec<String> {
        let mut batch = Vec::with_capacity(size.min(self.queue.len()));
        while batch.len() < size {
            match self.pop() {
                Some(url) => batch.push(url),
                None => break,
            }
        }
        batch
    }

    /// Records a visit; returns false if the URL was already visited
    pub fn mark_visited(&mut self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// True if the URL was ever queued or visited
    pub fn is_known(&self, url: &str) -> bool {
        self.queued.contains(url) || self.visited.contains(url)
    }

    /// Number of URLs waiting in the queue
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}
