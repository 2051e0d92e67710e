//! Headless runner errors.

use empire_core::error::GameError;
use thiserror::Error;

/// Result type alias using [`HeadlessError`].
pub type Result<T> = std::result::Result<T, HeadlessError>;

/// Errors raised while running, verifying or replaying games.
#[derive(Debug, Error)]
pub enum HeadlessError {
    /// Engine failure.
    #[error(transparent)]
    Game(#[from] GameError),

    /// Strategy file not found.
    #[error("Strategy file not found: {0}")]
    StrategyNotFound(String),

    /// No built-in strategy has this name.
    #[error("Unknown strategy '{0}'")]
    UnknownStrategy(String),

    /// Failed to read a file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a strategy.
    #[error("Failed to parse strategy: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Failed to write JSON output.
    #[error("Failed to encode output: {0}")]
    Json(#[from] serde_json::Error),
}
