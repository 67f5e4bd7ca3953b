use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::core::{Puzzle, RawPuzzle};
use crate::error::{PuzzleEngineError, Result};
use crate::providers::PuzzleProvider;

/// Fetches shard documents from the remote store over plain HTTP GET
pub struct HttpProvider {
    client: Client,
}

impl HttpProvider {
    /// Create a provider whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self { client })
    }

    /// Wrap an already configured client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PuzzleProvider for HttpProvider {
    async fn fetch(&self, address: &str) -> Result<Vec<Puzzle>> {
        let response = self
            .client
            .get(address)
            .send()
            .await
            .map_err(|e| PuzzleEngineError::Fetch {
                address: address.to_string(),
                message: format!("Request failed: {}", e),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!("No document at {}, bucket is empty", address);
            return Ok(Vec::new());
        }

        if !status.is_success() {
            return Err(PuzzleEngineError::HttpStatus {
                address: address.to_string(),
                status: status.as_u16(),
            });
        }

        // The store serves a bare array, not a wrapped object
        let raw: Vec<RawPuzzle> = response.json().await.map_err(|e| PuzzleEngineError::Fetch {
            address: address.to_string(),
            message: format!("Invalid JSON: {}", e),
        })?;

        Ok(raw.into_iter().map(Puzzle::from).collect())
    }

    fn name(&self) -> &str {
        "http"
    }
}
