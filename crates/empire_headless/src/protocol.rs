//! JSON lines written to stdout.
//!
//! Every line is one [`Event`] tagged by `type`:
//!
//! ```text
//! {"type":"ready","scenario":"duel","players":2,"planets":3,"checksum":"9f2c..."}
//! {"type":"cycle","cycle":0,"checksum":"41ab...","rejected":0,"notifications":4}
//! {"type":"game_over","cycle":57,"scores":[...]}
//! ```
//!
//! Logs go to stderr so stdout stays machine-readable.

use std::io::Write;

use empire_core::scoring::PlayerScore;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Protocol version reported in `ready`.
pub const PROTOCOL_VERSION: &str = "1.0";

/// One line of output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Scenario loaded.
    Ready {
        /// Protocol version.
        version: String,
        /// Scenario name.
        scenario: String,
        /// Seated players.
        players: usize,
        /// Planets on the map.
        planets: usize,
        /// Checksum of the initial state.
        checksum: String,
    },
    /// One cycle committed.
    Cycle {
        /// Cycle processed.
        cycle: u64,
        /// Checksum of the resulting state.
        checksum: String,
        /// Actions rejected during the cycle.
        rejected: usize,
        /// Notifications raised during the cycle.
        notifications: usize,
    },
    /// The game ended, or the cycle budget ran out.
    GameOver {
        /// Cycles completed.
        cycle: u64,
        /// Whether the engine declared the game over.
        finished: bool,
        /// Ranked scores.
        scores: Vec<PlayerScore>,
    },
    /// Outcome of a parallel determinism check.
    Verified {
        /// Runs compared.
        runs: usize,
        /// Cycles per run.
        cycles: u64,
        /// Whether every run agreed on every checksum.
        deterministic: bool,
        /// Final checksum of the first run.
        checksum: Option<String>,
        /// First cycle where some run disagreed.
        divergence: Option<u64>,
    },
    /// Outcome of replay verification.
    Replay {
        /// Cycles in the replay.
        cycles: usize,
        /// Whether every recorded checksum was reproduced.
        matched: bool,
        /// First diverging cycle.
        divergence: Option<u64>,
        /// Recorded checksum at the divergence.
        expected: Option<String>,
        /// Reproduced checksum at the divergence.
        actual: Option<String>,
    },
    /// A command failed.
    Error {
        /// What went wrong.
        message: String,
    },
}

/// Write one event as a JSON line.
pub fn emit<W: Write>(out: &mut W, event: &Event) -> Result<()> {
    serde_json::to_writer(&mut *out, event)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
