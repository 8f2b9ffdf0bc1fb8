//! Error types for the prediction engine

use uuid::Uuid;

/// Errors surfaced by engine operations.
///
/// Configuration problems are caught when the engine is built, never at
/// request time. Upstream failures carry the symbol and horizon so callers
/// can diagnose which request failed.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid engine configuration: {0}")]
    Configuration(String),

    #[error("upstream unavailable for {symbol} ({horizon_days}d horizon): {reason}")]
    Upstream {
        symbol: String,
        horizon_days: u32,
        reason: String,
    },

    #[error("prediction not found: {0}")]
    NotFound(Uuid),

    #[error("prediction already resolved: {0}")]
    AlreadyResolved(Uuid),

    #[error("store error: {0}")]
    Store(String),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
