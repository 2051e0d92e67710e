//! Server configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port the transport layer listens on.
    pub port: u16,
    /// Maximum players per game.
    pub max_players: u8,
    /// Maximum concurrent sessions.
    pub max_sessions: usize,
    /// Wall-clock limit per cycle in milliseconds; `None` waits for every
    /// live player to end their turn.
    pub cycle_deadline_ms: Option<u64>,
    /// Command queue depth per session.
    pub command_buffer: usize,
    /// Event queue depth per session; slow subscribers lag past this.
    pub event_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 7777,
            max_players: 8,
            max_sessions: 64,
            cycle_deadline_ms: Some(60_000),
            command_buffer: 256,
            event_buffer: 64,
        }
    }
}

impl ServerConfig {
    /// Load from a RON file. Missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let err = |message: String| ServerError::Config {
            path: path.display().to_string(),
            message,
        };
        let text = std::fs::read_to_string(path).map_err(|e| err(e.to_string()))?;
        ron::from_str(&text).map_err(|e| err(e.to_string()))
    }

    /// The cycle deadline as a duration.
    #[must_use]
    pub fn cycle_deadline(&self) -> Option<Duration> {
        self.cycle_deadline_ms.map(Duration::from_millis)
    }
}
