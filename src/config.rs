use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::addressing::BucketScheme;
use crate::error::{PuzzleEngineError, Result};

/// Themes a query without a partition is randomly addressed against
pub const DEFAULT_THEMES: &[&str] = &[
    "advancedPawn",
    "attraction",
    "backRankMate",
    "capturingDefender",
    "clearance",
    "deflection",
    "discoveredAttack",
    "doubleCheck",
    "endgame",
    "fork",
    "hangingPiece",
    "interference",
    "intermezzo",
    "kingsideAttack",
    "mateIn1",
    "mateIn2",
    "mateIn3",
    "middlegame",
    "pin",
    "promotion",
    "quietMove",
    "sacrifice",
    "skewer",
    "trappedPiece",
    "xRayAttack",
    "zugzwang",
];

/// Engine configuration, supplied at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base address of the content store
    pub base_url: String,

    pub bucket_width: i32,
    pub min_rating: i32,
    pub max_rating: i32,

    /// Count used when a query leaves it unset
    pub default_count: usize,

    /// Hard cap on returned puzzles
    pub max_count: usize,

    pub cache_enabled: bool,
    pub cache_path: String,
    pub cache_ttl_secs: u64,

    /// Outstanding fetch tasks allowed at once, across all batches
    pub max_concurrent_fetches: usize,

    /// Buckets dispatched per batch
    pub batch_size: usize,

    pub request_timeout_secs: u64,

    pub themes: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "https://puzzles.example.com".to_string(),
            bucket_width: 20,
            min_rating: 400,
            max_rating: 3000,
            default_count: 50,
            max_count: 500,
            cache_enabled: true,
            cache_path: "puzzle-cache.db".to_string(),
            cache_ttl_secs: 7 * 24 * 60 * 60,
            max_concurrent_fetches: 4,
            batch_size: 5,
            request_timeout_secs: 10,
            themes: DEFAULT_THEMES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl EngineConfig {
    /// Load from a YAML file; missing keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Override fields from `PUZZLE_*` environment variables
    pub fn apply_env(mut self) -> Result<Self> {
        fn parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
            match std::env::var(key) {
                Ok(value) => value
                    .trim()
                    .parse::<T>()
                    .map(Some)
                    .map_err(|_| PuzzleEngineError::Config(format!("{} has invalid value '{}'", key, value))),
                Err(_) => Ok(None),
            }
        }

        if let Some(v) = parsed("PUZZLE_BASE_URL")? {
            self.base_url = v;
        }
        if let Some(v) = parsed("PUZZLE_CACHE_PATH")? {
            self.cache_path = v;
        }
        if let Some(v) = parsed("PUZZLE_CACHE_ENABLED")? {
            self.cache_enabled = v;
        }
        if let Some(v) = parsed("PUZZLE_CACHE_TTL_SECS")? {
            self.cache_ttl_secs = v;
        }
        if let Some(v) = parsed("PUZZLE_MAX_CONCURRENT_FETCHES")? {
            self.max_concurrent_fetches = v;
        }
        if let Some(v) = parsed("PUZZLE_BATCH_SIZE")? {
            self.batch_size = v;
        }
        if let Some(v) = parsed("PUZZLE_REQUEST_TIMEOUT_SECS")? {
            self.request_timeout_secs = v;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| -> Result<()> { Err(PuzzleEngineError::Config(msg)) };

        if self.base_url.trim().is_empty() {
            return fail("base_url is empty".to_string());
        }
        if self.bucket_width <= 0 {
            return fail(format!("bucket_width must be positive, got {}", self.bucket_width));
        }
        if self.min_rating > self.max_rating {
            return fail(format!(
                "min_rating {} exceeds max_rating {}",
                self.min_rating, self.max_rating
            ));
        }
        if self.min_rating % self.bucket_width != 0 || self.max_rating % self.bucket_width != 0 {
            return fail(format!(
                "rating bounds {}..{} must be multiples of bucket_width {}",
                self.min_rating, self.max_rating, self.bucket_width
            ));
        }
        if self.max_count == 0 || self.default_count == 0 {
            return fail("max_count and default_count must be positive".to_string());
        }
        if self.max_concurrent_fetches == 0 || self.batch_size == 0 {
            return fail("max_concurrent_fetches and batch_size must be positive".to_string());
        }
        if self.themes.iter().all(|t| t.trim().is_empty()) {
            return fail("themes list is empty".to_string());
        }
        Ok(())
    }

    pub fn bucket_scheme(&self) -> BucketScheme {
        BucketScheme::new(self.bucket_width, self.min_rating, self.max_rating)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
