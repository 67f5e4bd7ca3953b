pub mod http;

use async_trait::async_trait;
use crate::core::Puzzle;
use crate::error::Result;

pub use http::HttpProvider;

/// Source of puzzle documents addressed by content address
#[async_trait]
pub trait PuzzleProvider: Send + Sync {
    /// Fetch and normalize every puzzle stored at `address`.
    ///
    /// A document that does not exist is an empty bucket, not an error.
    async fn fetch(&self, address: &str) -> Result<Vec<Puzzle>>;

    /// Get provider name
    fn name(&self) -> &str;
}
