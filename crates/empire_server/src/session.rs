//! One hosted game.
//!
//! A [`GameSession`] exclusively owns the authoritative [`Simulation`] for a
//! game. Actions are stamped with an arrival sequence and buffered; the next
//! cycle applies the whole buffer at once. A cycle is triggered either by
//! every live player ending their turn or by the host calling
//! [`GameSession::expire_deadline`]. Both paths end in the same
//! [`GameSession::advance`].
//!
//! Who has ended their turn and whose transport is down is host bookkeeping.
//! It lives here, not in the simulation state, so it never reaches the
//! checksum or a replay.

use std::collections::BTreeSet;

use empire_core::action::{Action, PendingAction};
use empire_core::canonical::StateChecksum;
use empire_core::error::GameError;
use empire_core::ids::PlayerId;
use empire_core::scenario::Scenario;
use empire_core::scoring::PlayerScore;
use empire_core::simulation::{CycleReport, Simulation};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Result, ServerError};
use crate::SessionId;

/// What happened to a submitted action.
#[derive(Debug, Clone)]
pub enum Submission {
    /// Buffered for the next cycle under this arrival stamp.
    Buffered {
        /// Arrival stamp.
        sequence: u64,
    },
    /// The submission completed the set of end-turns and the cycle ran.
    Advanced(CycleReport),
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    /// Session.
    pub id: SessionId,
    /// Next cycle to be processed.
    pub cycle: u64,
    /// Buffered actions.
    pub pending: usize,
    /// Live players that have not ended their turn.
    pub awaiting: Vec<PlayerId>,
    /// Checksum of the committed state.
    pub checksum: Option<StateChecksum>,
    /// Ranked scores.
    pub scores: Vec<PlayerScore>,
    /// Whether the game has ended.
    pub game_over: bool,
    /// Cycle at which the session was aborted, if it was.
    pub aborted_at: Option<u64>,
}

/// A hosted game.
#[derive(Debug)]
pub struct GameSession {
    id: SessionId,
    sim: Simulation,
    pending: Vec<PendingAction>,
    next_sequence: u64,
    ended: BTreeSet<PlayerId>,
    resigning: BTreeSet<PlayerId>,
    disconnected: BTreeSet<PlayerId>,
}

impl GameSession {
    /// Host an existing simulation.
    #[must_use]
    pub fn new(id: SessionId, sim: Simulation) -> Self {
        Self {
            id,
            sim,
            pending: Vec::new(),
            next_sequence: 0,
            ended: BTreeSet::new(),
            resigning: BTreeSet::new(),
            disconnected: BTreeSet::new(),
        }
    }

    /// Build the scenario and host it.
    pub fn from_scenario(id: SessionId, scenario: &Scenario) -> Result<Self> {
        let state = scenario.build()?;
        Ok(Self::new(id, Simulation::new(state, scenario.rules())))
    }

    /// Session id.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The hosted simulation.
    #[must_use]
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Buffered actions, in arrival order.
    #[must_use]
    pub fn pending(&self) -> &[PendingAction] {
        &self.pending
    }

    /// Whether the game ended or was aborted.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.sim.is_game_over() || self.sim.aborted_at().is_some()
    }

    /// Whether the player's transport is currently up.
    #[must_use]
    pub fn is_connected(&self, player: PlayerId) -> bool {
        !self.disconnected.contains(&player)
    }

    /// Active, connected players that have not resigned this cycle.
    #[must_use]
    pub fn live_players(&self) -> Vec<PlayerId> {
        self.sim
            .state()
            .players
            .values()
            .filter(|p| p.is_active() && self.is_connected(p.id) && !self.resigning.contains(&p.id))
            .map(|p| p.id)
            .collect()
    }

    /// Live players whose end-turn is still outstanding.
    #[must_use]
    pub fn awaiting(&self) -> Vec<PlayerId> {
        self.live_players()
            .into_iter()
            .filter(|p| !self.ended.contains(p))
            .collect()
    }

    /// Snapshot for status queries.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            id: self.id,
            cycle: self.sim.cycle(),
            pending: self.pending.len(),
            awaiting: self.awaiting(),
            checksum: self.sim.checksum().ok(),
            scores: self.sim.scores(),
            game_over: self.sim.is_game_over(),
            aborted_at: self.sim.aborted_at(),
        }
    }

    /// Accept an action from an authenticated player.
    ///
    /// A resignation discards everything else the player has buffered.
    pub fn submit(&mut self, player: PlayerId, action: Action) -> Result<Submission> {
        self.ensure_running()?;
        self.ensure_seated(player)?;

        match action {
            Action::EndTurn => {
                self.ended.insert(player);
            }
            Action::Resign => {
                let dropped = self.discard(player);
                self.resigning.insert(player);
                debug!(session = %self.id, %player, dropped, "Player resigning");
            }
            _ => {}
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.pending.push(PendingAction::new(player, sequence, action));

        if self.all_turns_in() {
            return self.advance().map(Submission::Advanced);
        }
        Ok(Submission::Buffered { sequence })
    }

    /// Record a transport connecting or dropping.
    ///
    /// A dropped player's buffered actions are discarded; if everyone still
    /// connected has ended their turn, the cycle runs.
    pub fn set_connected(&mut self, player: PlayerId, connected: bool) -> Result<Option<CycleReport>> {
        if !self.sim.state().players.contains_key(&player) {
            return Err(ServerError::UnknownPlayer(player));
        }
        if connected {
            self.disconnected.remove(&player);
            info!(session = %self.id, %player, "Player connected");
            return Ok(None);
        }

        self.disconnected.insert(player);
        let dropped = self.discard(player);
        info!(session = %self.id, %player, dropped, "Player disconnected");
        if !self.is_finished() && self.all_turns_in() {
            return self.advance().map(Some);
        }
        Ok(None)
    }

    /// The cycle deadline passed: run with whatever has been submitted.
    pub fn expire_deadline(&mut self) -> Result<CycleReport> {
        self.ensure_running()?;
        let missing = self.awaiting();
        if !missing.is_empty() {
            debug!(session = %self.id, ?missing, "Cycle deadline passed");
        }
        self.advance()
    }

    /// Apply the buffer and commit one cycle.
    ///
    /// The buffer is consumed even when the cycle fails; a failed cycle
    /// leaves the session aborted.
    pub fn advance(&mut self) -> Result<CycleReport> {
        let batch = std::mem::take(&mut self.pending);
        self.ended.clear();
        self.resigning.clear();

        let report = self.sim.advance(&batch).map_err(|err| {
            if let GameError::InvariantViolation { cycle, .. } = &err {
                warn!(session = %self.id, cycle, "Session aborted");
            }
            ServerError::from(err)
        })?;

        info!(
            session = %self.id,
            cycle = report.cycle,
            actions = batch.len(),
            rejected = report.rejected.len(),
            checksum = %report.checksum.as_str(),
            "Cycle committed"
        );
        if report.game_over {
            info!(session = %self.id, "Game over");
        }
        Ok(report)
    }

    fn ensure_running(&self) -> Result<()> {
        if let Some(cycle) = self.sim.aborted_at() {
            return Err(GameError::SessionAborted { cycle }.into());
        }
        if self.sim.is_game_over() {
            return Err(ServerError::GameOver(self.id));
        }
        Ok(())
    }

    fn ensure_seated(&self, player: PlayerId) -> Result<()> {
        let seat = self
            .sim
            .state()
            .players
            .get(&player)
            .ok_or(ServerError::UnknownPlayer(player))?;
        if !seat.is_active() || self.resigning.contains(&player) {
            return Err(ServerError::PlayerInactive(player));
        }
        Ok(())
    }

    fn all_turns_in(&self) -> bool {
        let live = self.live_players();
        !live.is_empty() && live.iter().all(|p| self.ended.contains(p))
    }

    fn discard(&mut self, player: PlayerId) -> usize {
        let before = self.pending.len();
        self.pending.retain(|p| p.player != player);
        self.ended.remove(&player);
        before - self.pending.len()
    }
}
