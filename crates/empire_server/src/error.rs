//! Session host errors.

use empire_core::error::GameError;
use empire_core::ids::PlayerId;
use thiserror::Error;

use crate::SessionId;

/// Result type alias using [`ServerError`].
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors surfaced by sessions and the session manager.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Engine failure, including the game-unavailable condition after an abort.
    #[error(transparent)]
    Game(#[from] GameError),

    /// Failed to load the server configuration.
    #[error("Failed to load config '{path}': {message}")]
    Config {
        /// Path of the config file.
        path: String,
        /// Error message.
        message: String,
    },

    /// The player is not seated in this session.
    #[error("Player {0} is not part of this session")]
    UnknownPlayer(PlayerId),

    /// The player resigned or was eliminated.
    #[error("Player {0} is no longer active")]
    PlayerInactive(PlayerId),

    /// The game has already ended.
    #[error("Session {0} has finished")]
    GameOver(SessionId),

    /// No such session.
    #[error("Unknown session {0}")]
    UnknownSession(SessionId),

    /// Session limit reached.
    #[error("Server is full: {max} sessions running")]
    ServerFull {
        /// Configured session limit.
        max: usize,
    },

    /// Scenario seats more players than the server allows.
    #[error("Scenario has {players} players, limit is {max}")]
    TooManyPlayers {
        /// Players in the scenario.
        players: usize,
        /// Configured per-game limit.
        max: u8,
    },

    /// The session task stopped before answering.
    #[error("Session {0} is not running")]
    SessionClosed(SessionId),
}
