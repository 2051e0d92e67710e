//! Player actions.
//!
//! Every inbound message is one variant of [`Action`]; the scheduler matches
//! them exhaustively. The submitting player is never taken from the payload:
//! the session host wraps each action in a [`PendingAction`] carrying the
//! identity the transport authenticated and an arrival sequence number.

use serde::{Deserialize, Serialize};

use crate::error::ActionError;
use crate::hex::HexCoord;
use crate::ids::{FleetId, PlanetId, PlayerId, TradeId};
use crate::notification::{NotificationKind, NotificationLog};
use crate::planet::{Planet, PlanetOptions};
use crate::player::PlayerStatus;
use crate::production::{apply_queue_op, BuildQueueOp};
use crate::research::{ResearchAllocation, ResearchCategory, ResearchItem};
use crate::rules::Rules;
use crate::ships::ShipCounts;
use crate::state::GameState;
use crate::trade::TradeAmount;

/// Something a player asks the engine to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Replace the research split.
    SetResearchAllocation {
        /// New split; must sum to 100.
        allocation: ResearchAllocation,
    },
    /// Queue a research goal.
    QueueResearch {
        /// Goal.
        item: ResearchItem,
    },
    /// Drop a queued research goal.
    CancelResearch {
        /// Category of the goal.
        category: ResearchCategory,
    },
    /// Open a trade offer.
    SubmitTrade {
        /// Amount given, escrowed now.
        offered: TradeAmount,
        /// Amount wanted.
        requested: TradeAmount,
    },
    /// Withdraw a trade offer.
    CancelTrade {
        /// Offer to withdraw.
        trade: TradeId,
    },
    /// Edit a planet's build queue.
    UpdateBuildQueue {
        /// Planet.
        planet: PlanetId,
        /// Edit.
        op: BuildQueueOp,
    },
    /// Change a planet's worker split or auto-spend switch.
    SetPlanetOptions {
        /// Planet.
        planet: PlanetId,
        /// New options; percentages must sum to 100.
        options: PlanetOptions,
    },
    /// Send ships from a stationary fleet to another hex.
    SendShips {
        /// Hex the ships stand at.
        from: HexCoord,
        /// Destination.
        to: HexCoord,
        /// Ships to send.
        ships: ShipCounts,
    },
    /// Recall a fleet that has not departed.
    ClearWaypoint {
        /// Fleet.
        fleet: FleetId,
    },
    /// Mark the player's turn as done.
    EndTurn,
    /// Leave the game.
    Resign,
}

/// An action with its authenticated submitter and arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    /// Submitting player, as authenticated by the transport.
    pub player: PlayerId,
    /// Arrival order assigned by the session host.
    pub sequence: u64,
    /// The action.
    pub action: Action,
}

impl PendingAction {
    /// Wrap an action.
    #[must_use]
    pub const fn new(player: PlayerId, sequence: u64, action: Action) -> Self {
        Self {
            player,
            sequence,
            action,
        }
    }
}

/// An action that was dropped, as reported back to its submitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedAction {
    /// Submitting player.
    pub player: PlayerId,
    /// Arrival order of the action.
    pub sequence: u64,
    /// Stable reason code.
    pub code: String,
    /// Human-readable reason.
    pub message: String,
}

impl RejectedAction {
    /// Build a rejection report.
    #[must_use]
    pub fn new(pending: &PendingAction, error: &ActionError) -> Self {
        Self {
            player: pending.player,
            sequence: pending.sequence,
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

/// Sort a batch into application order: arrival, then player id.
pub fn order_actions(actions: &mut [PendingAction]) {
    actions.sort_by_key(|a| (a.sequence, a.player));
}

fn owned_planet<'a>(
    state: &'a mut GameState,
    player: PlayerId,
    planet: PlanetId,
) -> Result<&'a mut Planet, ActionError> {
    let target = state
        .planets
        .get_mut(&planet)
        .ok_or(ActionError::UnknownPlanet(planet))?;
    if target.is_owned_by(player) {
        Ok(target)
    } else {
        Err(ActionError::NotPlanetOwner { planet, player })
    }
}

/// Validate and apply one action.
///
/// On error nothing has changed; the action is simply dropped.
pub fn apply_action(
    state: &mut GameState,
    rules: &Rules,
    pending: &PendingAction,
    log: &mut NotificationLog,
) -> Result<(), ActionError> {
    let player_id = pending.player;
    let cycle = state.cycle;
    let player = state
        .players
        .get_mut(&player_id)
        .ok_or(ActionError::UnknownPlayer(player_id))?;
    if !player.is_active() {
        return Err(ActionError::PlayerInactive(player_id));
    }

    match &pending.action {
        Action::SetResearchAllocation { allocation } => {
            player.research.set_allocation(allocation.clone())
        }
        Action::QueueResearch { item } => player.research.queue_item(*item),
        Action::CancelResearch { category } => player.research.cancel_item(*category).map(|_| ()),
        Action::SubmitTrade { offered, requested } => state
            .trades
            .submit(player_id, *offered, *requested, cycle, &mut player.stock)
            .map(|_| ()),
        Action::CancelTrade { trade } => state
            .trades
            .cancel(player_id, *trade, &mut player.stock)
            .map(|_| ()),
        Action::UpdateBuildQueue { planet, op } => {
            let target = owned_planet(state, player_id, *planet)?;
            apply_queue_op(target, op, rules)
        }
        Action::SetPlanetOptions { planet, options } => {
            options.validate()?;
            owned_planet(state, player_id, *planet)?.options = *options;
            Ok(())
        }
        Action::SendShips { from, to, ships } => state
            .fleets
            .send(player_id, *from, *to, ships, &state.galaxy)
            .map(|_| ()),
        Action::ClearWaypoint { fleet } => state.fleets.clear_waypoint(player_id, *fleet).map(|_| ()),
        // consumed by the session host; nothing to apply
        Action::EndTurn => Ok(()),
        Action::Resign => {
            player.status = PlayerStatus::Resigned;
            log.push(NotificationKind::PlayerResigned { player: player_id });
            Ok(())
        }
    }
}
