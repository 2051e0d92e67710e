//! Replay recording and verification.
//!
//! A replay stores the initial state, the rules, and for every processed
//! cycle the batch of actions that went in and the checksum that came out.
//! Re-running the batches from the initial state must reproduce every
//! checksum; the first cycle that does not is where two builds diverge.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::action::PendingAction;
use crate::canonical::StateChecksum;
use crate::error::{GameError, Result};
use crate::rules::Rules;
use crate::simulation::{advance_cycle, CycleReport, Simulation};
use crate::state::GameState;

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// One recorded cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayCycle {
    /// Cycle number.
    pub cycle: u64,
    /// Actions submitted for the cycle, in arrival order.
    pub actions: Vec<PendingAction>,
    /// Checksum of the resulting state.
    pub checksum: StateChecksum,
}

/// Result of re-running a replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// Every cycle reproduced its checksum.
    Match {
        /// Cycles replayed.
        cycles: usize,
    },
    /// A cycle produced a different checksum.
    Diverged {
        /// First cycle that differed.
        cycle: u64,
        /// Recorded checksum.
        expected: StateChecksum,
        /// Checksum produced now.
        actual: StateChecksum,
    },
}

/// Complete replay data structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Scenario name.
    pub scenario: String,
    /// Rules in force.
    pub rules: Rules,
    /// Serialized initial state.
    pub initial_state: Vec<u8>,
    /// Recorded cycles in order.
    pub cycles: Vec<ReplayCycle>,
}

impl Replay {
    /// Start recording from an initial state.
    pub fn new(scenario: impl Into<String>, state: &GameState, rules: &Rules) -> Result<Self> {
        let initial_state = bincode::serialize(state)
            .map_err(|e| GameError::Serialization(format!("Failed to serialize state: {e}")))?;
        Ok(Self {
            version: REPLAY_VERSION,
            scenario: scenario.into(),
            rules: rules.clone(),
            initial_state,
            cycles: Vec::new(),
        })
    }

    /// Record one processed cycle.
    pub fn record(&mut self, actions: Vec<PendingAction>, report: &CycleReport) {
        self.cycles.push(ReplayCycle {
            cycle: report.cycle,
            actions,
            checksum: report.checksum.clone(),
        });
    }

    /// Advance a simulation and record the cycle in one step.
    pub fn advance_and_record(
        &mut self,
        simulation: &mut Simulation,
        actions: Vec<PendingAction>,
    ) -> Result<CycleReport> {
        let report = simulation.advance(&actions)?;
        self.record(actions, &report);
        Ok(report)
    }

    /// Save the replay to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| GameError::Serialization(format!("Failed to serialize replay: {e}")))?;
        std::fs::write(path.as_ref(), bytes)?;
        Ok(())
    }

    /// Load a replay from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let replay: Self = bincode::deserialize(&bytes)
            .map_err(|e| GameError::Serialization(format!("Failed to deserialize replay: {e}")))?;

        if replay.version != REPLAY_VERSION {
            return Err(GameError::Serialization(format!(
                "Replay version mismatch: expected {}, got {}",
                REPLAY_VERSION, replay.version
            )));
        }
        Ok(replay)
    }

    /// Initial state for playback.
    pub fn initial_state(&self) -> Result<GameState> {
        bincode::deserialize(&self.initial_state)
            .map_err(|e| GameError::Serialization(format!("Failed to deserialize state: {e}")))
    }

    /// Number of recorded cycles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    /// Check if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    /// Checksum recorded for the last cycle.
    #[must_use]
    pub fn final_checksum(&self) -> Option<&StateChecksum> {
        self.cycles.last().map(|c| &c.checksum)
    }

    /// Re-run every cycle and compare checksums.
    pub fn verify(&self) -> Result<Verification> {
        let mut state = self.initial_state()?;
        for recorded in &self.cycles {
            let (next, report) = advance_cycle(&state, &self.rules, &recorded.actions)?;
            if report.checksum != recorded.checksum {
                tracing::warn!(
                    cycle = recorded.cycle,
                    expected = %recorded.checksum,
                    actual = %report.checksum,
                    "Replay diverged"
                );
                return Ok(Verification::Diverged {
                    cycle: recorded.cycle,
                    expected: recorded.checksum.clone(),
                    actual: report.checksum,
                });
            }
            state = next;
        }
        Ok(Verification::Match {
            cycles: self.cycles.len(),
        })
    }
}
