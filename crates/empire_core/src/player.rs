//! Players.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ids::{PlanetId, PlayerId};
use crate::research::ResearchState;
use crate::resources::ResourceStock;

/// Participation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerStatus {
    /// Playing.
    Active,
    /// Left the game. Holdings stay until taken or starved.
    Resigned,
    /// No planets and no fleets left.
    Eliminated,
}

/// One participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Unique identifier.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Empire-wide stock: trade escrow source, storage overflow, famine relief.
    pub stock: ResourceStock,
    /// Research progress.
    pub research: ResearchState,
    /// Planets owned. Always equal to the planets whose owner is this player.
    pub planets: BTreeSet<PlanetId>,
    /// Participation status.
    pub status: PlayerStatus,
    /// Cycle the player joined.
    pub joined_cycle: u64,
    /// Cycle the player was eliminated, if they were.
    pub eliminated_cycle: Option<u64>,
}

impl Player {
    /// Create an active player with nothing.
    #[must_use]
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            stock: ResourceStock::ZERO,
            research: ResearchState::default(),
            planets: BTreeSet::new(),
            status: PlayerStatus::Active,
            joined_cycle: 0,
            eliminated_cycle: None,
        }
    }

    /// Whether the player may submit actions.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == PlayerStatus::Active
    }

    /// Whether the player still counts toward the game-over check.
    #[must_use]
    pub fn is_eliminated(&self) -> bool {
        self.status == PlayerStatus::Eliminated
    }

    /// Cycles survived as of `cycle`.
    #[must_use]
    pub fn survival_cycles(&self, cycle: u64) -> u64 {
        self.eliminated_cycle
            .unwrap_or(cycle)
            .saturating_sub(self.joined_cycle)
    }
}
