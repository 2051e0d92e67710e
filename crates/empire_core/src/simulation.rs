//! Cycle processing.
//!
//! [`advance_cycle`] is the whole engine in one pure function: it takes the
//! committed state and the batch of actions collected during the cycle and
//! returns the next state together with everything observers need to know
//! about the transition. The input state is never touched, so a failed cycle
//! leaves the last committed state intact.
//!
//! # Phase order
//!
//! 1. Actions, in arrival order then player id
//! 2. Economy: every owned planet produces
//! 3. Production: build queue heads advance, auto-spend tops up points
//! 4. Movement: fleets in flight close in on their destinations
//! 5. Combat: every contested hex fights in ascending coordinate order
//! 6. Settlement: research accrues, trades match or expire, storage overflows
//! 7. Population: planets eat, then grow or starve
//! 8. Resolution: eliminations, cycle advance, game-over check
//!
//! After the phases the structural invariants and the per-planet resource
//! ledgers are checked, and the canonical checksum of the new state is taken.
//! Turn and connection status belong to the session host and never enter the
//! state, so they cannot move the checksum.
//!
//! # Determinism
//!
//! Everything here iterates ordered maps, uses integer or fixed-point
//! arithmetic and never reads a clock or a random source. The same state,
//! rules and actions always produce the same next state and checksum.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::action::{apply_action, order_actions, PendingAction, RejectedAction};
use crate::canonical::{checksum, to_canonical_string, StateChecksum};
use crate::combat::combat_system;
use crate::error::{GameError, Result};
use crate::fleet::movement_system;
use crate::notification::{Notification, NotificationLog, Phase};
use crate::research::ResearchCategory;
use crate::rules::Rules;
use crate::scoring::{rank_players, PlayerScore};
use crate::state::GameState;
use crate::systems::{
    close_ledgers, economy_system, elimination_system, game_over_system, open_ledgers,
    population_system, production_system, research_system, storage_system, trade_system, Ledgers,
};

/// Everything produced by one cycle besides the new state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Cycle that was processed.
    pub cycle: u64,
    /// Checksum of the state after the cycle.
    pub checksum: StateChecksum,
    /// Notifications in phase order.
    pub notifications: Vec<Notification>,
    /// Actions that were dropped, with their reasons.
    pub rejected: Vec<RejectedAction>,
    /// Resource movements per planet.
    pub ledgers: Ledgers,
    /// Whether the game ended during this cycle.
    pub game_over: bool,
}

/// Check invariants between phases when the extra validation is compiled in.
#[cfg(feature = "debug-validation")]
fn validate_phase(state: &GameState, rules: &Rules, phase: Phase) -> Result<()> {
    state.check_invariants(rules).map_err(|err| {
        tracing::error!(cycle = state.cycle, ?phase, error = %err, "Invariant broken after phase");
        err
    })
}

#[cfg(not(feature = "debug-validation"))]
#[allow(clippy::unnecessary_wraps)]
fn validate_phase(_state: &GameState, _rules: &Rules, _phase: Phase) -> Result<()> {
    Ok(())
}

/// Report an invariant failure with a canonical snapshot of the offending state.
fn invariant_failure(state: &GameState, cycle: u64, message: String) -> GameError {
    let snapshot = to_canonical_string(state)
        .unwrap_or_else(|err| format!("<snapshot unavailable: {err}>"));
    tracing::error!(cycle, %message, %snapshot, "State invariant violated; aborting turn processing");
    GameError::InvariantViolation { cycle, message }
}

/// Process one cycle.
///
/// Rejected actions are reported, not fatal. The only errors are invariant
/// violations and serialization failures, and either means the cycle produced
/// nothing.
pub fn advance_cycle(
    state: &GameState,
    rules: &Rules,
    actions: &[PendingAction],
) -> Result<(GameState, CycleReport)> {
    let cycle = state.cycle;
    let mut next = state.clone();
    let mut log = NotificationLog::new(cycle);
    let mut rejected = Vec::new();

    let mut batch = actions.to_vec();
    order_actions(&mut batch);
    for pending in &batch {
        if let Err(err) = apply_action(&mut next, rules, pending, &mut log) {
            tracing::warn!(
                cycle,
                player = %pending.player,
                sequence = pending.sequence,
                code = err.code(),
                "Action rejected: {err}"
            );
            rejected.push(RejectedAction::new(pending, &err));
        }
    }
    validate_phase(&next, rules, Phase::Actions)?;

    log.enter(Phase::Economy);
    let mut ledgers = open_ledgers(&next);
    let points = economy_system(&mut next, rules, &mut ledgers);
    tracing::debug!(cycle, planets = points.len(), "Economy phase done");

    log.enter(Phase::Production);
    production_system(&mut next, rules, &points, &mut ledgers, &mut log);
    validate_phase(&next, rules, Phase::Production)?;

    log.enter(Phase::Movement);
    let propulsion = next.research_levels(ResearchCategory::Propulsion);
    movement_system(&mut next.fleets, rules, &propulsion, &mut log);
    validate_phase(&next, rules, Phase::Movement)?;

    log.enter(Phase::Combat);
    combat_system(&mut next, rules, &mut log);
    validate_phase(&next, rules, Phase::Combat)?;

    log.enter(Phase::Settlement);
    research_system(&mut next, rules, &mut ledgers, &mut log);
    trade_system(&mut next, rules, &mut log);
    storage_system(&mut next, rules, &mut ledgers);
    validate_phase(&next, rules, Phase::Settlement)?;

    log.enter(Phase::Population);
    population_system(&mut next, rules, &mut ledgers, &mut log);
    close_ledgers(&next, &mut ledgers);

    log.enter(Phase::Resolution);
    elimination_system(&mut next, &mut log);
    next.cycle += 1;
    game_over_system(&mut next, rules, &mut log);

    if let Err(err) = next.check_invariants(rules) {
        let message = match err {
            GameError::InvariantViolation { message, .. } => message,
            other => other.to_string(),
        };
        return Err(invariant_failure(&next, cycle, message));
    }
    if let Some((planet, ledger)) = ledgers.iter().find(|(_, l)| !l.is_balanced()) {
        let message = format!("resource ledger for planet {planet} does not balance: {ledger:?}");
        return Err(invariant_failure(&next, cycle, message));
    }

    let checksum = checksum(&next)?;
    let notifications = log.into_records();
    tracing::info!(
        cycle,
        checksum = %checksum,
        notifications = notifications.len(),
        rejected = rejected.len(),
        "Cycle processed"
    );

    let report = CycleReport {
        cycle,
        checksum,
        notifications,
        rejected,
        ledgers,
        game_over: next.game_over,
    };
    Ok((next, report))
}

/// A running game: committed state, rules and abort status.
///
/// Cycles commit atomically. Once an invariant violation has been seen the
/// simulation refuses to advance again.
#[derive(Debug, Clone)]
pub struct Simulation {
    state: GameState,
    rules: Rules,
    aborted: Option<u64>,
}

impl Simulation {
    /// Start from an initial state.
    #[must_use]
    pub fn new(state: GameState, rules: Rules) -> Self {
        Self {
            state,
            rules,
            aborted: None,
        }
    }

    /// Committed state.
    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Rules in force.
    #[must_use]
    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    /// Next cycle to be processed.
    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.state.cycle
    }

    /// Cycle at which processing was aborted, if it was.
    #[must_use]
    pub fn aborted_at(&self) -> Option<u64> {
        self.aborted
    }

    /// Whether the game has ended.
    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.state.game_over
    }

    /// Process one cycle and commit it.
    pub fn advance(&mut self, actions: &[PendingAction]) -> Result<CycleReport> {
        if let Some(cycle) = self.aborted {
            return Err(GameError::SessionAborted { cycle });
        }
        match advance_cycle(&self.state, &self.rules, actions) {
            Ok((next, report)) => {
                self.state = next;
                Ok(report)
            }
            Err(err) => {
                if matches!(err, GameError::InvariantViolation { .. }) {
                    self.aborted = Some(self.state.cycle);
                }
                Err(err)
            }
        }
    }

    /// Checksum of the committed state.
    pub fn checksum(&self) -> Result<StateChecksum> {
        checksum(&self.state)
    }

    /// Ranked scores of the committed state.
    #[must_use]
    pub fn scores(&self) -> Vec<PlayerScore> {
        rank_players(&self.state, &self.rules)
    }

    /// Serialize the committed state to bytes.
    pub fn serialize_state(&self) -> Result<Vec<u8>> {
        bincode::serialize(&self.state).map_err(|e| GameError::Serialization(e.to_string()))
    }

    /// Replace the committed state with a serialized one.
    pub fn deserialize_state(&mut self, bytes: &[u8]) -> Result<()> {
        self.state =
            bincode::deserialize(bytes).map_err(|e| GameError::Serialization(e.to_string()))?;
        Ok(())
    }

    /// Cycle-by-cycle snapshots of checksums, mostly for tests and tools.
    pub fn run(
        &mut self,
        batches: impl IntoIterator<Item = Vec<PendingAction>>,
    ) -> Result<BTreeMap<u64, StateChecksum>> {
        let mut sums = BTreeMap::new();
        for batch in batches {
            if self.is_game_over() {
                break;
            }
            let report = self.advance(&batch)?;
            sums.insert(report.cycle, report.checksum);
        }
        Ok(sums)
    }
}
