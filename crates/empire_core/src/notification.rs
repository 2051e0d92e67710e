//! Per-cycle notification records.
//!
//! Notifications are a pure side channel. Each phase appends records to the
//! cycle's [`NotificationLog`]; nothing ever edits or removes a record once
//! it has been pushed. Because phases run in a fixed order the log is
//! ordered by phase, then by the sorted iteration order inside each phase.
//! Consumers drain the list from the [`CycleReport`](crate::simulation::CycleReport)
//! after each cycle.

use serde::{Deserialize, Serialize};

use crate::hex::HexCoord;
use crate::ids::{FleetId, PlanetId, PlayerId, TradeId};
use crate::production::BuildKind;
use crate::research::ResearchCategory;
use crate::ships::ShipCounts;
use crate::trade::TradeAmount;

/// Cycle phases, in execution order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Phase {
    /// Player actions are validated and applied.
    Actions,
    /// Planets produce resources.
    Economy,
    /// Build queue heads accrue production.
    Production,
    /// Fleets move and arrive.
    Movement,
    /// Co-located hostile forces fight.
    Combat,
    /// Research points, trades and storage overflow settle.
    Settlement,
    /// Planets eat, grow or starve.
    Population,
    /// Elimination and game over checks.
    Resolution,
}

/// Why a player lost a planet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossReason {
    /// Population starved to zero.
    Depopulated,
    /// Taken by another player.
    Captured {
        /// New owner.
        by: PlayerId,
    },
    /// Both sides were destroyed; the planet went neutral.
    MutualDestruction,
}

/// Result of one battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleResult {
    /// The attacker was destroyed; the defender holds.
    DefenderHolds,
    /// The defender was destroyed.
    AttackerWins {
        /// Whether a planet changed hands.
        captured: bool,
    },
    /// Both sides were destroyed.
    MutualDestruction,
}

/// Everything needed to replay a battle in a UI without re-deriving it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleReport {
    /// Where the battle happened.
    pub hex: HexCoord,
    /// Planet at the hex, if any.
    pub planet: Option<PlanetId>,
    /// Attacking player.
    pub attacker: PlayerId,
    /// Defending player; `None` for a neutral planet.
    pub defender: Option<PlayerId>,
    /// Attacking fleets that took part.
    pub attacker_fleets: Vec<FleetId>,
    /// Defending fleets that took part.
    pub defender_fleets: Vec<FleetId>,
    /// Effective attacker strength.
    pub attacker_strength: u64,
    /// Effective defender strength, including planetary defense.
    pub defender_strength: u64,
    /// Ships the attacker lost.
    pub attacker_losses: ShipCounts,
    /// Ships the defender lost.
    pub defender_losses: ShipCounts,
    /// Outcome.
    pub result: BattleResult,
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    /// A build queue head finished.
    BuildCompleted {
        /// Planet that built it.
        planet: PlanetId,
        /// Planet owner.
        owner: PlayerId,
        /// What was built.
        item: BuildKind,
        /// New head of the queue, if any.
        next: Option<BuildKind>,
    },
    /// Stock was converted into production points.
    ResourcesAutoSpent {
        /// Planet that spent.
        planet: PlanetId,
        /// Planet owner.
        owner: PlayerId,
        /// Energy spent.
        energy: u32,
        /// Ore spent.
        ore: u32,
        /// Iridium spent.
        iridium: u32,
        /// Production points gained.
        points: u32,
    },
    /// Food ran short; population died.
    Starvation {
        /// Starving planet.
        planet: PlanetId,
        /// Planet owner.
        owner: PlayerId,
        /// Food that could not be covered.
        shortfall: u32,
        /// Population lost.
        deaths: u32,
        /// Population left.
        population: u32,
    },
    /// Severe shortage; production halts next cycle.
    Riot {
        /// Rioting planet.
        planet: PlanetId,
        /// Planet owner.
        owner: PlayerId,
        /// Food that could not be covered.
        shortfall: u32,
        /// Population lost.
        deaths: u32,
        /// Population left.
        population: u32,
    },
    /// A player lost a planet.
    PlanetLost {
        /// Lost planet.
        planet: PlanetId,
        /// Previous owner.
        owner: PlayerId,
        /// Why.
        reason: LossReason,
    },
    /// A fleet reached its destination.
    FleetArrived {
        /// Arriving fleet.
        fleet: FleetId,
        /// Fleet owner.
        owner: PlayerId,
        /// Destination.
        hex: HexCoord,
        /// Stationary fleet it merged into, if any.
        merged_into: Option<FleetId>,
    },
    /// A battle was fought.
    Battle(BattleReport),
    /// A research category gained a level.
    ResearchCompleted {
        /// Researching player.
        player: PlayerId,
        /// Category.
        category: ResearchCategory,
        /// New level.
        level: u32,
    },
    /// A queued research item reached its target.
    ResearchItemCompleted {
        /// Researching player.
        player: PlayerId,
        /// Category.
        category: ResearchCategory,
        /// Target level reached.
        level: u32,
    },
    /// Two offers were matched.
    TradeMatched {
        /// Earlier offer.
        trade: TradeId,
        /// Counter-offer it matched.
        counter: TradeId,
        /// Owner of `trade`.
        player: PlayerId,
        /// Owner of `counter`.
        counterparty: PlayerId,
        /// What `player` received.
        received: TradeAmount,
        /// What `counterparty` received.
        given: TradeAmount,
    },
    /// An offer expired unmatched; its escrow was refunded.
    TradeExpired {
        /// Offer.
        trade: TradeId,
        /// Owner.
        player: PlayerId,
        /// Refunded escrow.
        refunded: TradeAmount,
    },
    /// A player resigned.
    PlayerResigned {
        /// Resigning player.
        player: PlayerId,
    },
    /// A player has no planets and no fleets left.
    PlayerEliminated {
        /// Eliminated player.
        player: PlayerId,
    },
    /// The game has ended.
    GameOver {
        /// Sole remaining owner, if there is one.
        winner: Option<PlayerId>,
    },
}

/// One immutable record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Cycle being processed when it was emitted.
    pub cycle: u64,
    /// Phase that emitted it.
    pub phase: Phase,
    /// Payload.
    pub kind: NotificationKind,
}

/// Append-only notification list for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationLog {
    cycle: u64,
    phase: Phase,
    records: Vec<Notification>,
}

impl NotificationLog {
    /// Start an empty log for a cycle.
    #[must_use]
    pub fn new(cycle: u64) -> Self {
        Self {
            cycle,
            phase: Phase::Actions,
            records: Vec::new(),
        }
    }

    /// Enter a phase. Phases only move forward.
    pub fn enter(&mut self, phase: Phase) {
        debug_assert!(phase >= self.phase, "phase went backwards");
        self.phase = phase;
    }

    /// Phase currently emitting.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Append a record stamped with the current cycle and phase.
    pub fn push(&mut self, kind: NotificationKind) {
        self.records.push(Notification {
            cycle: self.cycle,
            phase: self.phase,
            kind,
        });
    }

    /// Records so far.
    #[must_use]
    pub fn records(&self) -> &[Notification] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if nothing was emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Finish the log.
    #[must_use]
    pub fn into_records(self) -> Vec<Notification> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_carry_cycle_and_phase() {
        let mut log = NotificationLog::new(4);
        log.push(NotificationKind::PlayerResigned {
            player: PlayerId(2),
        });
        log.enter(Phase::Resolution);
        log.push(NotificationKind::GameOver {
            winner: Some(PlayerId(1)),
        });

        let records = log.into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].phase, Phase::Actions);
        assert_eq!(records[1].phase, Phase::Resolution);
        assert!(records.iter().all(|n| n.cycle == 4));
    }

    #[test]
    fn test_phases_are_ordered() {
        assert!(Phase::Actions < Phase::Economy);
        assert!(Phase::Combat < Phase::Settlement);
        assert!(Phase::Population < Phase::Resolution);
    }
}
