//! Scripted game runs.

use empire_core::action::PendingAction;
use empire_core::canonical::StateChecksum;
use empire_core::replay::Replay;
use empire_core::scenario::Scenario;
use empire_core::scoring::PlayerScore;
use empire_core::simulation::{CycleReport, Simulation};
use empire_core::state::GameState;
use tracing::{debug, info};

use crate::error::Result;
use crate::strategies::Strategy;

/// How a scenario is played out.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Cycle budget.
    pub cycles: u64,
    /// Strategies dealt to players in id order, wrapping around. Empty means
    /// nobody submits anything.
    pub strategies: Vec<Strategy>,
    /// Keep a replay of the run.
    pub record: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            cycles: 200,
            strategies: vec![Strategy::balanced()],
            record: false,
        }
    }
}

/// Outcome of one run.
#[derive(Debug, Clone)]
pub struct GameRun {
    /// Scenario name.
    pub scenario: String,
    /// Checksum after every processed cycle; index is the cycle number.
    pub checksums: Vec<StateChecksum>,
    /// Cycles completed.
    pub cycles: u64,
    /// Whether the engine declared the game over.
    pub finished: bool,
    /// Final ranked scores.
    pub scores: Vec<PlayerScore>,
    /// Actions rejected over the whole run.
    pub rejected: usize,
    /// Recording, when asked for.
    pub replay: Option<Replay>,
}

/// One batch holding every active player's orders, stamped in player order.
#[must_use]
pub fn orders_for(state: &GameState, strategies: &[Strategy]) -> Vec<PendingAction> {
    if strategies.is_empty() {
        return Vec::new();
    }
    let mut batch = Vec::new();
    let mut sequence = 0;
    for (seat, player) in state.players.values().enumerate() {
        if !player.is_active() {
            continue;
        }
        let strategy = &strategies[seat % strategies.len()];
        for action in strategy.orders(state, player.id) {
            batch.push(PendingAction::new(player.id, sequence, action));
            sequence += 1;
        }
    }
    batch
}

/// Play a scenario until the game ends or the cycle budget runs out.
///
/// `on_cycle` sees every report as it is committed.
pub fn run_game(
    scenario: &Scenario,
    config: &RunConfig,
    mut on_cycle: impl FnMut(&CycleReport) -> Result<()>,
) -> Result<GameRun> {
    let state = scenario.build()?;
    let rules = scenario.rules();
    let mut replay = if config.record {
        Some(Replay::new(scenario.name.clone(), &state, &rules)?)
    } else {
        None
    };
    let mut sim = Simulation::new(state, rules);
    let mut checksums = Vec::new();
    let mut rejected = 0;

    info!(scenario = %scenario.name, cycles = config.cycles, "Starting run");
    for _ in 0..config.cycles {
        if sim.is_game_over() {
            break;
        }
        let batch = orders_for(sim.state(), &config.strategies);
        let report = match replay.as_mut() {
            Some(replay) => replay.advance_and_record(&mut sim, batch)?,
            None => sim.advance(&batch)?,
        };
        if !report.rejected.is_empty() {
            debug!(cycle = report.cycle, rejected = ?report.rejected, "Orders rejected");
        }
        rejected += report.rejected.len();
        on_cycle(&report)?;
        checksums.push(report.checksum);
    }

    info!(
        scenario = %scenario.name,
        cycles = sim.cycle(),
        finished = sim.is_game_over(),
        "Run complete"
    );
    Ok(GameRun {
        scenario: scenario.name.clone(),
        checksums,
        cycles: sim.cycle(),
        finished: sim.is_game_over(),
        scores: sim.scores(),
        rejected,
        replay,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use empire_core::action::Action;
    use empire_core::scenario::ring_galaxy;
    use empire_test_utils::fixtures::duel;

    #[test]
    fn test_orders_are_stamped_in_player_order() {
        let batch = orders_for(&duel(), &[Strategy::balanced(), Strategy::aggressor()]);
        let stamps: Vec<u64> = batch.iter().map(|p| p.sequence).collect();
        assert_eq!(stamps, (0..batch.len() as u64).collect::<Vec<_>>());
        let first_p2 = batch.iter().position(|p| p.player.0 == 2).unwrap();
        assert!(batch[..first_p2].iter().all(|p| p.player.0 == 1));
        assert_eq!(batch[first_p2 - 1].action, Action::EndTurn);
    }

    #[test]
    fn test_no_strategies_means_no_orders() {
        assert!(orders_for(&duel(), &[]).is_empty());
    }

    #[test]
    fn test_run_respects_cycle_budget() {
        let config = RunConfig {
            cycles: 15,
            ..RunConfig::default()
        };
        let mut seen = 0;
        let run = run_game(&ring_galaxy(4, 2), &config, |_| {
            seen += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(run.checksums.len(), 15);
        assert_eq!(seen, 15);
        assert_eq!(run.cycles, 15);
        assert!(run.replay.is_none());
        assert_eq!(run.scores.len(), 2);
    }

    #[test]
    fn test_recorded_run_verifies() {
        let config = RunConfig {
            cycles: 20,
            strategies: Strategy::builtin(),
            record: true,
        };
        let run = run_game(&ring_galaxy(4, 3), &config, |_| Ok(())).unwrap();
        let replay = run.replay.unwrap();
        assert_eq!(replay.len(), run.checksums.len());
        assert_eq!(replay.final_checksum(), run.checksums.last());
        assert!(matches!(
            replay.verify().unwrap(),
            empire_core::replay::Verification::Match { .. }
        ));
    }
}
