//! # Empire Core
//!
//! Deterministic turn engine for Hex Empires.
//!
//! This crate contains **only** deterministic logic:
//! - No networking
//! - No IO beyond loading data files and replays
//! - No randomness
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - An authoritative session host with client mirrors kept in step by checksums
//! - Headless batch runs
//! - Replay verification
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`hex`] - Axial hex grid and the galaxy map
//! - [`planet`], [`economy`], [`production`] - Planet output, feeding and build queues
//! - [`fleet`], [`combat`] - Fleet movement and battles
//! - [`research`], [`trade`] - Empire-wide research and the trade book
//! - [`simulation`] - Cycle processing
//! - [`canonical`] - Canonical serialization and state checksums
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod action;
pub mod canonical;
pub mod combat;
pub mod economy;
pub mod error;
pub mod fleet;
pub mod hex;
pub mod ids;
pub mod math;
pub mod notification;
pub mod planet;
pub mod player;
pub mod production;
pub mod replay;
pub mod research;
pub mod resources;
pub mod rules;
pub mod scenario;
pub mod scoring;
pub mod ships;
pub mod simulation;
pub mod state;
pub mod systems;
pub mod trade;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::action::{Action, PendingAction, RejectedAction};
    pub use crate::canonical::{checksum, to_canonical_string, StateChecksum};
    pub use crate::error::{ActionError, GameError, Result};
    pub use crate::fleet::{Fleet, Fleets};
    pub use crate::hex::{Galaxy, HexCoord};
    pub use crate::ids::{FleetId, PlanetId, PlayerId, TradeId};
    pub use crate::math::Fixed;
    pub use crate::notification::{Notification, NotificationKind, Phase};
    pub use crate::planet::{ImprovementType, Planet, PlanetOptions};
    pub use crate::player::{Player, PlayerStatus};
    pub use crate::production::{BuildKind, BuildQueueOp};
    pub use crate::research::{ResearchAllocation, ResearchCategory, ResearchItem};
    pub use crate::resources::{Resource, ResourceStock};
    pub use crate::rules::Rules;
    pub use crate::scenario::Scenario;
    pub use crate::scoring::PlayerScore;
    pub use crate::ships::{ShipCounts, ShipType};
    pub use crate::simulation::{advance_cycle, CycleReport, Simulation};
    pub use crate::state::GameState;
    pub use crate::trade::TradeAmount;
}
