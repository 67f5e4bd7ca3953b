use serde::{Deserialize, Serialize};

use crate::core::{Partition, Puzzle};

/// Result of one acquisition with per-call metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcquireResponse {
    /// Sampled puzzles, at most the normalized count
    pub puzzles: Vec<Puzzle>,

    /// Partition the query was addressed against
    pub partition: Partition,

    /// Count the query was normalized to
    pub requested: usize,

    /// Bucket lower bounds visited, in visit order
    pub buckets_visited: Vec<i32>,

    /// Buckets served from the local cache
    pub cache_hits: usize,

    /// Buckets whose fetch failed and contributed nothing
    pub fetch_failures: usize,

    /// Search latency in milliseconds
    pub latency_ms: f64,
}

impl AcquireResponse {
    /// Whether the requested count was met
    pub fn is_complete(&self) -> bool {
        self.puzzles.len() >= self.requested
    }

    /// Get display string for logging
    pub fn display(&self) -> String {
        format!(
            "{} → {}/{} puzzles ({} buckets, {} cached, {} failed) {:.1}ms",
            self.partition,
            self.puzzles.len(),
            self.requested,
            self.buckets_visited.len(),
            self.cache_hits,
            self.fetch_failures,
            self.latency_ms
        )
    }
}
