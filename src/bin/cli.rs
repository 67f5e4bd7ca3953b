use clap::{Parser, Subcommand};
use chess_puzzle_engine::{ColorFilter, EngineConfig, PuzzleEngine, PuzzleQuery};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "puzzle-engine-cli")]
#[command(about = "Chess Puzzle Engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cache database path (overrides config)
    #[arg(long)]
    db: Option<String>,

    /// Content store base URL (overrides config)
    #[arg(long)]
    base_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire puzzles
    Acquire {
        /// Target rating
        #[arg(short, long, default_value = "1500")]
        rating: i32,

        /// Theme tag, e.g. fork
        #[arg(short, long)]
        theme: Option<String>,

        /// Opening family, e.g. Sicilian_Defense
        #[arg(short, long)]
        opening: Option<String>,

        /// Solver color: white, black or either
        #[arg(long, default_value = "either")]
        color: ColorFilter,

        /// Number of puzzles
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Disable cache
        #[arg(long)]
        no_cache: bool,

        /// Print the puzzles as JSON
        #[arg(long)]
        json: bool,
    },

    /// Get cache statistics
    Stats,

    /// Delete every cache entry
    Clear,

    /// Delete expired cache entries
    Cleanup,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "chess_puzzle_engine=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    }
    .apply_env()?;

    if let Some(db) = cli.db {
        config.cache_path = db;
    }
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if let Commands::Acquire { no_cache: true, .. } = cli.command {
        config.cache_enabled = false;
    }

    let engine = PuzzleEngine::new(config).await?;

    match cli.command {
        Commands::Acquire {
            rating,
            theme,
            opening,
            color,
            count,
            json,
            ..
        } => {
            let query = PuzzleQuery {
                rating,
                theme,
                opening_family: opening,
                color,
                count,
            };

            let response = engine.acquire_detailed(query).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&response.puzzles)?);
            } else {
                println!("🧩 {} puzzles from {}", response.puzzles.len(), response.partition);
                println!(
                    "   Buckets: {} ({} cached, {} failed)",
                    response.buckets_visited.len(),
                    response.cache_hits,
                    response.fetch_failures
                );
                println!("   Latency: {:.2}ms", response.latency_ms);

                for (i, puzzle) in response.puzzles.iter().enumerate() {
                    println!("   {}. {} [{}] {}", i + 1, puzzle.id, puzzle.rating, puzzle.fen);
                }
            }
        }

        Commands::Stats => {
            let stats = engine.cache_stats().await?;

            println!("📊 Cache Statistics:");
            println!("   Total entries: {}", stats.total_entries);
            println!("   Expired entries: {}", stats.expired_entries);

            if let Some(oldest) = stats.oldest_entry {
                println!("   Oldest entry: {}", oldest.format("%Y-%m-%d %H:%M:%S"));
            }

            if let Some(newest) = stats.newest_entry {
                println!("   Newest entry: {}", newest.format("%Y-%m-%d %H:%M:%S"));
            }
        }

        Commands::Clear => {
            engine.clear_cache().await?;
            println!("✅ Cache cleared");
        }

        Commands::Cleanup => {
            println!("🧹 Cleaning up expired entries...");

            let deleted = engine.cleanup_cache().await?;

            println!("✅ Deleted {} entries", deleted);
        }
    }

    engine.close().await?;
    Ok(())
}
