//! Error types for the turn engine.
//!
//! Three kinds of failure exist and they are handled very differently:
//!
//! - [`ActionError`]: a single player action was malformed or unauthorized.
//!   The action is dropped and reported back to its submitter; every other
//!   action in the batch still applies.
//! - [`GameError::InvariantViolation`]: the state is inconsistent. This is
//!   fatal to the session's turn processing and nothing is produced for the
//!   cycle.
//! - Resource shortfalls (starvation, riots) are not errors at all. They are
//!   simulated outcomes and surface as notifications.

use thiserror::Error;

use crate::ids::{FleetId, PlanetId, PlayerId, TradeId};

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all engine errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Failed to parse a data file (rules, scenario).
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path or label of the source that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Scenario describes an impossible starting state.
    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    /// Serialization or deserialization of state failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Reading or writing a data, scenario or replay file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The state broke one of its structural invariants.
    #[error("State invariant violated at cycle {cycle}: {message}")]
    InvariantViolation {
        /// Cycle being processed when the violation was detected.
        cycle: u64,
        /// What was found inconsistent.
        message: String,
    },

    /// The session was aborted by an earlier invariant violation.
    #[error("Game session unavailable: aborted at cycle {cycle}")]
    SessionAborted {
        /// Cycle at which turn processing was aborted.
        cycle: u64,
    },

    /// Desync detected between two participants.
    #[error("Desync detected at cycle {cycle}: local checksum {local}, remote checksum {remote}")]
    DesyncDetected {
        /// Cycle where the checksums were compared.
        cycle: u64,
        /// Locally computed checksum.
        local: String,
        /// Checksum reported by the remote participant.
        remote: String,
    },
}

/// Reason an individual action was rejected.
///
/// Each variant maps to a stable reason code via [`ActionError::code`], which
/// is what the transport layer reports to the submitting player.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// Submitting player is not part of this game.
    #[error("Unknown player {0}")]
    UnknownPlayer(PlayerId),

    /// Submitting player has resigned or been eliminated.
    #[error("Player {0} is no longer active")]
    PlayerInactive(PlayerId),

    /// Referenced planet does not exist.
    #[error("Unknown planet {0}")]
    UnknownPlanet(PlanetId),

    /// Referenced planet belongs to someone else (or nobody).
    #[error("Planet {planet} is not owned by player {player}")]
    NotPlanetOwner {
        /// Planet referenced by the action.
        planet: PlanetId,
        /// Player that submitted the action.
        player: PlayerId,
    },

    /// Referenced fleet does not exist.
    #[error("Unknown fleet {0}")]
    UnknownFleet(FleetId),

    /// Referenced fleet belongs to someone else.
    #[error("Fleet {fleet} is not owned by player {player}")]
    NotFleetOwner {
        /// Fleet referenced by the action.
        fleet: FleetId,
        /// Player that submitted the action.
        player: PlayerId,
    },

    /// Waypoint cannot be cleared because the fleet has already departed.
    #[error("Fleet {0} has already departed")]
    FleetInFlight(FleetId),

    /// Fleet has no destination to clear.
    #[error("Fleet {0} is not travelling")]
    FleetNotTravelling(FleetId),

    /// Hex coordinate is not part of the galaxy.
    #[error("Hex ({q}, {r}) is outside the galaxy")]
    UnknownHex {
        /// Axial q coordinate.
        q: i32,
        /// Axial r coordinate.
        r: i32,
    },

    /// Not enough ships of the requested types at the source.
    #[error("Not enough ships available at the source hex")]
    InsufficientShips,

    /// A send order with no ships, or to the hex it starts at.
    #[error("Send order is empty or targets its own origin")]
    EmptySendOrder,

    /// Percentages do not sum to 100.
    #[error("Allocation must sum to 100, got {0}")]
    InvalidAllocation(u32),

    /// Build queue is at its length cap.
    #[error("Build queue is full")]
    QueueFull,

    /// No improvement slot is free on the planet.
    #[error("No free improvement slot")]
    NoImprovementSlot,

    /// Queue index out of range.
    #[error("Build queue index {0} is out of range")]
    InvalidQueueIndex(usize),

    /// Reorder would move an item past the end of the queue.
    #[error("Build queue item {0} cannot move in that direction")]
    CannotMove(usize),

    /// Demolish requested for an improvement the planet does not have.
    #[error("No improvement of that type to demolish")]
    NothingToDemolish,

    /// Research item already queued for this category.
    #[error("Research item already queued")]
    DuplicateResearchItem,

    /// Research item target is not above the current level.
    #[error("Research target level {0} already reached")]
    ResearchTargetReached(u32),

    /// No such research item queued.
    #[error("No research item queued for that category")]
    UnknownResearchItem,

    /// Trade offer is malformed (zero amounts, same resource both ways).
    #[error("Trade offer is malformed")]
    InvalidTrade,

    /// Player cannot cover the escrow for a trade offer.
    #[error("Insufficient resources to escrow the trade offer")]
    InsufficientResources,

    /// Referenced trade does not exist or is not open.
    #[error("Unknown trade {0}")]
    UnknownTrade(TradeId),

    /// Trade belongs to another player.
    #[error("Trade {trade} is not owned by player {player}")]
    NotTradeOwner {
        /// Trade referenced by the action.
        trade: TradeId,
        /// Player that submitted the action.
        player: PlayerId,
    },
}

impl ActionError {
    /// Stable reason code reported to the submitter.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownPlayer(_) => "unknown_player",
            Self::PlayerInactive(_) => "player_inactive",
            Self::UnknownPlanet(_) => "unknown_planet",
            Self::NotPlanetOwner { .. } => "not_planet_owner",
            Self::UnknownFleet(_) => "unknown_fleet",
            Self::NotFleetOwner { .. } => "not_fleet_owner",
            Self::FleetInFlight(_) => "fleet_in_flight",
            Self::FleetNotTravelling(_) => "fleet_not_travelling",
            Self::UnknownHex { .. } => "unknown_hex",
            Self::InsufficientShips => "insufficient_ships",
            Self::EmptySendOrder => "empty_send_order",
            Self::InvalidAllocation(_) => "invalid_allocation",
            Self::QueueFull => "queue_full",
            Self::NoImprovementSlot => "no_improvement_slot",
            Self::InvalidQueueIndex(_) => "invalid_queue_index",
            Self::CannotMove(_) => "cannot_move",
            Self::NothingToDemolish => "nothing_to_demolish",
            Self::DuplicateResearchItem => "duplicate_research_item",
            Self::ResearchTargetReached(_) => "research_target_reached",
            Self::UnknownResearchItem => "unknown_research_item",
            Self::InvalidTrade => "invalid_trade",
            Self::InsufficientResources => "insufficient_resources",
            Self::UnknownTrade(_) => "unknown_trade",
            Self::NotTradeOwner { .. } => "not_trade_owner",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes_are_snake_case() {
        let errors = [
            ActionError::QueueFull,
            ActionError::InvalidAllocation(90),
            ActionError::NotPlanetOwner {
                planet: PlanetId(1),
                player: PlayerId(2),
            },
        ];
        for err in errors {
            assert!(err.code().chars().all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }

    #[test]
    fn test_invariant_message() {
        let err = GameError::InvariantViolation {
            cycle: 7,
            message: "planet 3 owner mismatch".into(),
        };
        assert_eq!(
            err.to_string(),
            "State invariant violated at cycle 7: planet 3 owner mismatch"
        );
    }
}
