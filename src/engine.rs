use futures::future::join_all;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::addressing::{address_for, resolve_partition, BucketScheme, RatingBucket};
use crate::cache::{CacheStats, PuzzleCache, SqliteCache};
use crate::config::EngineConfig;
use crate::core::{AcquireResponse, Partition, Puzzle, PuzzleQuery, SolverColor};
use crate::error::{PuzzleEngineError, Result};
use crate::governor::Governor;
use crate::providers::{HttpProvider, PuzzleProvider};

/// Puzzle acquisition orchestrator
pub struct PuzzleEngine {
    config: EngineConfig,
    scheme: BucketScheme,
    cache: Option<Arc<dyn PuzzleCache>>,
    provider: Arc<dyn PuzzleProvider>,
    governor: Governor,
}

/// Query after clamping and partition resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedQuery {
    pub rating: i32,
    pub partition: Partition,
    /// Theme tag filter, set when an opening family drives addressing
    pub theme_filter: Option<String>,
    pub color: Option<SolverColor>,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BucketSource {
    Cache,
    Network,
    Failed,
}

struct BucketOutcome {
    bucket: RatingBucket,
    puzzles: Vec<Puzzle>,
    source: BucketSource,
}

impl PuzzleEngine {
    /// Create engine with the HTTP provider, opening the durable cache at
    /// `config.cache_path` when caching is enabled
    pub async fn new(config: EngineConfig) -> Result<Self> {
        let provider = Arc::new(HttpProvider::new(config.request_timeout())?);
        Self::with_provider(config, provider).await
    }

    /// Create engine around a custom provider, cache per `config`
    pub async fn with_provider(config: EngineConfig, provider: Arc<dyn PuzzleProvider>) -> Result<Self> {
        config.validate()?;

        let cache: Option<Arc<dyn PuzzleCache>> = if config.cache_enabled {
            Some(Arc::new(SqliteCache::new(&config.cache_path, config.cache_ttl()).await?))
        } else {
            None
        };

        Self::from_parts(config, provider, cache)
    }

    /// Assemble from explicit components
    pub fn from_parts(
        config: EngineConfig,
        provider: Arc<dyn PuzzleProvider>,
        cache: Option<Arc<dyn PuzzleCache>>,
    ) -> Result<Self> {
        config.validate()?;

        tracing::info!(
            "✅ Puzzle engine ready: store={} provider={} cache={} fetches={} batch={}",
            config.base_url,
            provider.name(),
            if cache.is_some() { "on" } else { "off" },
            config.max_concurrent_fetches,
            config.batch_size
        );

        Ok(Self {
            scheme: config.bucket_scheme(),
            governor: Governor::new(config.max_concurrent_fetches),
            config,
            cache,
            provider,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Clamp rating and count, resolve the partition, picking a random theme
    /// when the query names none
    pub fn normalize(&self, query: &PuzzleQuery) -> Result<NormalizedQuery> {
        let count = query
            .count
            .filter(|c| *c > 0)
            .unwrap_or(self.config.default_count)
            .min(self.config.max_count);

        let theme = query.theme.as_deref().map(str::trim).filter(|t| !t.is_empty());
        let opening = query.opening_family.as_deref().map(str::trim).filter(|o| !o.is_empty());

        let partition = match (theme, opening) {
            (None, None) => {
                let themes: Vec<&str> = self
                    .config
                    .themes
                    .iter()
                    .map(|t| t.trim())
                    .filter(|t| !t.is_empty())
                    .collect();
                let picked = themes
                    .choose(&mut rand::thread_rng())
                    .ok_or_else(|| PuzzleEngineError::Addressing("no themes configured".to_string()))?;
                tracing::debug!("No partition requested, picked theme '{}'", picked);
                Partition::Theme(picked.to_string())
            }
            (theme, opening) => resolve_partition(theme, opening)?,
        };

        let theme_filter = match partition {
            Partition::Opening(_) => theme.map(str::to_string),
            Partition::Theme(_) => None,
        };

        Ok(NormalizedQuery {
            rating: self.scheme.clamp(query.rating),
            partition,
            theme_filter,
            color: query.color.solver(),
            count,
        })
    }

    /// Acquire up to `query.count` puzzles
    pub async fn acquire(&self, query: PuzzleQuery) -> Result<Vec<Puzzle>> {
        Ok(self.acquire_detailed(query).await?.puzzles)
    }

    /// Acquire puzzles and report how the search went.
    ///
    /// Fails only when the query cannot be addressed. Fetch and cache
    /// failures shrink the result instead.
    pub async fn acquire_detailed(&self, query: PuzzleQuery) -> Result<AcquireResponse> {
        let start = Instant::now();
        let normalized = self.normalize(&query)?;

        let plan = self
            .scheme
            .bucket_sequence(normalized.rating)
            .into_iter()
            .map(|bucket| -> Result<(RatingBucket, String)> {
                Ok((bucket, address_for(&self.config.base_url, bucket, &normalized.partition)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut accumulated: Vec<Puzzle> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut buckets_visited = Vec::new();
        let mut cache_hits = 0;
        let mut fetch_failures = 0;

        for batch in plan.chunks(self.config.batch_size) {
            let outcomes = join_all(
                batch
                    .iter()
                    .map(|(bucket, address)| self.governor.run(self.load_bucket(*bucket, address))),
            )
            .await;

            for outcome in outcomes {
                buckets_visited.push(outcome.bucket.lower);
                match outcome.source {
                    BucketSource::Cache => cache_hits += 1,
                    BucketSource::Failed => fetch_failures += 1,
                    BucketSource::Network => {}
                }

                for puzzle in outcome.puzzles {
                    if puzzle.id.is_empty() || seen.insert(puzzle.id.clone()) {
                        accumulated.push(puzzle);
                    }
                }
            }

            if accumulated.len() >= normalized.count {
                break;
            }
        }

        let puzzles = sample(filter_candidates(accumulated, &normalized), normalized.count);

        let response = AcquireResponse {
            puzzles,
            partition: normalized.partition,
            requested: normalized.count,
            buckets_visited,
            cache_hits,
            fetch_failures,
            latency_ms: start.elapsed().as_secs_f64() * 1000.0,
        };

        tracing::info!("🧩 {}", response.display());
        Ok(response)
    }

    /// Serve one bucket from cache, else from the provider
    async fn load_bucket(&self, bucket: RatingBucket, address: &str) -> BucketOutcome {
        if let Some(cache) = &self.cache {
            match cache.get(address).await {
                Ok(Some(puzzles)) => {
                    tracing::debug!("Cache hit {} ({} puzzles)", address, puzzles.len());
                    return BucketOutcome {
                        bucket,
                        puzzles,
                        source: BucketSource::Cache,
                    };
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Cache read failed for {}: {}", address, e),
            }
        }

        match self.provider.fetch(address).await {
            Ok(puzzles) => {
                tracing::debug!("Fetched {} puzzles from {}", puzzles.len(), address);
                self.write_back(address, &puzzles);
                BucketOutcome {
                    bucket,
                    puzzles,
                    source: BucketSource::Network,
                }
            }
            Err(e) => {
                tracing::warn!("Provider {} failed for {}: {}", self.provider.name(), address, e);
                BucketOutcome {
                    bucket,
                    puzzles: Vec::new(),
                    source: BucketSource::Failed,
                }
            }
        }
    }

    /// Detached cache write; failures are logged only
    fn write_back(&self, address: &str, puzzles: &[Puzzle]) {
        let Some(cache) = &self.cache else {
            return;
        };

        let cache = Arc::clone(cache);
        let address = address.to_string();
        let puzzles = puzzles.to_vec();

        tokio::spawn(async move {
            if let Err(e) = cache.put(&address, &puzzles).await {
                tracing::warn!("Failed to save {} to cache: {}", address, e);
            }
        });
    }

    /// Remove every cached bucket
    pub async fn clear_cache(&self) -> Result<()> {
        match &self.cache {
            Some(cache) => cache.clear().await,
            None => Ok(()),
        }
    }

    /// Stored cache entries, expired ones included
    pub async fn cache_size(&self) -> Result<u64> {
        match &self.cache {
            Some(cache) => cache.size().await,
            None => Ok(0),
        }
    }

    /// Get cache statistics
    pub async fn cache_stats(&self) -> Result<CacheStats> {
        match &self.cache {
            Some(cache) => cache.stats().await,
            None => Ok(CacheStats::default()),
        }
    }

    /// Delete expired cache entries
    pub async fn cleanup_cache(&self) -> Result<u64> {
        match &self.cache {
            Some(cache) => cache.cleanup_expired().await,
            None => Ok(0),
        }
    }

    /// Release the cache's storage handle
    pub async fn close(&self) -> Result<()> {
        match &self.cache {
            Some(cache) => cache.close().await,
            None => Ok(()),
        }
    }
}

/// Apply the theme and color constraints.
///
/// The FEN side to move plays the setup move, so a white solver needs `b`.
fn filter_candidates(puzzles: Vec<Puzzle>, query: &NormalizedQuery) -> Vec<Puzzle> {
    let wanted_token = query.color.map(|color| color.inverse().fen_token());

    puzzles
        .into_iter()
        .filter(|p| query.theme_filter.as_deref().map_or(true, |theme| p.has_theme(theme)))
        .filter(|p| wanted_token.map_or(true, |token| p.side_to_move() == Some(token)))
        .collect()
}

/// Uniform shuffle, then truncate
fn sample(mut puzzles: Vec<Puzzle>, count: usize) -> Vec<Puzzle> {
    puzzles.shuffle(&mut rand::thread_rng());
    puzzles.truncate(count);
    puzzles
}
