use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chess_puzzle_engine::{
    AcquireResponse, EngineConfig, PuzzleEngine, PuzzleEngineError, PuzzleQuery,
};

#[derive(Clone)]
struct AppState {
    engine: Arc<PuzzleEngine>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    cache: CacheStatsDto,
}

#[derive(Debug, Serialize)]
struct CacheStatsDto {
    total_entries: u64,
    expired_entries: u64,
    oldest_entry: Option<String>,
    newest_entry: Option<String>,
}

#[derive(Debug, Serialize)]
struct CleanupResponse {
    deleted: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "puzzle_engine_server=debug,chess_puzzle_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match std::env::var("PUZZLE_CONFIG") {
        Ok(path) => EngineConfig::from_file(path)?,
        Err(_) => EngineConfig::default(),
    }
    .apply_env()?;

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8090);

    tracing::info!("🚀 Starting Chess Puzzle Engine Server");
    tracing::info!("📦 Cache: {} (enabled={})", config.cache_path, config.cache_enabled);
    tracing::info!("🌐 Store: {}", config.base_url);

    let engine = Arc::new(PuzzleEngine::new(config).await?);
    let state = AppState {
        engine: Arc::clone(&engine),
    };

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/v1/puzzles", post(acquire_handler))
        .route("/v1/cache/stats", get(stats_handler))
        .route("/v1/cache/cleanup", post(cleanup_handler))
        .route("/v1/cache", delete(clear_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    tracing::info!("♟️ Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    engine.close().await?;
    Ok(())
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: chess_puzzle_engine::VERSION.to_string(),
    })
}

async fn acquire_handler(
    State(state): State<AppState>,
    Json(query): Json<PuzzleQuery>,
) -> Result<Json<AcquireResponse>, AppError> {
    tracing::debug!("Acquire request: {:?}", query);

    let response = state.engine.acquire_detailed(query).await?;

    Ok(Json(response))
}

async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let stats = state.engine.cache_stats().await?;

    Ok(Json(StatsResponse {
        cache: CacheStatsDto {
            total_entries: stats.total_entries,
            expired_entries: stats.expired_entries,
            oldest_entry: stats.oldest_entry.map(|t| t.to_rfc3339()),
            newest_entry: stats.newest_entry.map(|t| t.to_rfc3339()),
        },
    }))
}

async fn cleanup_handler(State(state): State<AppState>) -> Result<Json<CleanupResponse>, AppError> {
    let deleted = state.engine.cleanup_cache().await?;
    tracing::info!("🧹 Removed {} expired cache entries", deleted);
    Ok(Json(CleanupResponse { deleted }))
}

async fn clear_handler(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.engine.clear_cache().await?;
    Ok(StatusCode::NO_CONTENT)
}

// Error handling
struct AppError(PuzzleEngineError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            PuzzleEngineError::Addressing(message) => (StatusCode::BAD_REQUEST, message),
            e => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        tracing::error!("❌ Error: {} - {}", status, message);

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<PuzzleEngineError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
