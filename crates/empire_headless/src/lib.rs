//! Headless runner for Hex Empires.
//!
//! Plays scenarios with scripted empires and no transport, for CI and
//! balance work:
//!
//! - **Runs**: one game, one JSON line per committed cycle
//! - **Determinism checks**: the same game played in parallel, checksums compared
//! - **Replays**: record a run, then re-run it and compare every checksum
//!
//! # Example
//!
//! ```bash
//! # Play the duel scenario for 100 cycles
//! cargo run -p empire_headless -- run --scenario scenarios/duel.ron --cycles 100
//!
//! # Verify determinism across 8 parallel runs
//! cargo run -p empire_headless -- verify --ring 6 --players 4 --runs 8
//!
//! # Record, then verify a replay
//! cargo run -p empire_headless -- run --record game.replay
//! cargo run -p empire_headless -- replay --file game.replay
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod error;
pub mod protocol;
pub mod runner;
pub mod strategies;
pub mod verify;

pub use error::{HeadlessError, Result};
pub use protocol::{emit, Event};
pub use runner::{orders_for, run_game, GameRun, RunConfig};
pub use strategies::Strategy;
pub use verify::{verify_determinism, VerifyReport};
