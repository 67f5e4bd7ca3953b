//! # Chess Puzzle Engine
//!
//! Acquires chess puzzles matching a rating, theme or opening family, solver
//! color and count from a sharded remote puzzle store:
//! - Fixed-width rating buckets with an upward-then-downward fallback sweep
//! - Bounded fetch concurrency shared across batches
//! - Durable SQLite cache with lazy TTL expiry and detached write-back
//! - Multiple interfaces: Rust library, HTTP API, CLI
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use chess_puzzle_engine::{ColorFilter, EngineConfig, PuzzleEngine, PuzzleQuery};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = PuzzleEngine::new(EngineConfig::default()).await?;
//!
//!     let puzzles = engine
//!         .acquire(PuzzleQuery::new(1500).theme("fork").color(ColorFilter::White).count(20))
//!         .await?;
//!
//!     for puzzle in &puzzles {
//!         println!("{} ({}) {}", puzzle.id, puzzle.rating, puzzle.fen);
//!     }
//!     engine.close().await?;
//!     Ok(())
//! }
//! ```

pub mod addressing;
pub mod cache;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod governor;
pub mod providers;

// Re-export primary types
pub use cache::{PuzzleCache, SqliteCache};
pub use config::EngineConfig;
pub use core::{AcquireResponse, ColorFilter, Partition, Puzzle, PuzzleQuery, SolverColor};
pub use engine::{NormalizedQuery, PuzzleEngine};
pub use error::{PuzzleEngineError, Result};
pub use governor::Governor;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
