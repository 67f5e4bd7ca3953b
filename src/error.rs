use thiserror::Error;

/// Main error type for the puzzle engine
#[derive(Error, Debug)]
pub enum PuzzleEngineError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// HTTP request errors
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML config errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Query cannot be mapped to any content address
    #[error("Addressing error: {0}")]
    Addressing(String),

    /// Transport failure while fetching one content address
    #[error("Fetch of '{address}' failed: {message}")]
    Fetch { address: String, message: String },

    /// Non-success, non-404 status from the content store
    #[error("Fetch of '{address}' returned HTTP {status}")]
    HttpStatus { address: String, status: u16 },

    /// Cache errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl PuzzleEngineError {
    /// Errors that belong to a single bucket and never abort a query
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Addressing(_) | Self::Config(_))
    }
}

impl From<String> for PuzzleEngineError {
    fn from(s: String) -> Self {
        PuzzleEngineError::Other(s)
    }
}

impl From<&str> for PuzzleEngineError {
    fn from(s: &str) -> Self {
        PuzzleEngineError::Other(s.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, PuzzleEngineError>;
