//! Parallel determinism checks.
//!
//! The same scenario is played several times at once on the rayon pool.
//! Every run must agree on every cycle's checksum.

use empire_core::canonical::StateChecksum;
use empire_core::scenario::Scenario;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::Result;
use crate::runner::{run_game, GameRun, RunConfig};

/// Outcome of [`verify_determinism`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    /// Runs compared.
    pub runs: usize,
    /// Cycles in the reference run.
    pub cycles: u64,
    /// First cycle where some run disagreed with the first.
    pub divergence: Option<u64>,
    /// Final checksum of the first run.
    pub checksum: Option<StateChecksum>,
}

impl VerifyReport {
    /// Whether all runs agreed.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.divergence.is_none()
    }
}

/// Play `runs` copies of a scenario in parallel and compare checksums.
pub fn verify_determinism(scenario: &Scenario, config: &RunConfig, runs: usize) -> Result<VerifyReport> {
    let runs = runs.max(1);
    let config = RunConfig {
        record: false,
        ..config.clone()
    };

    let results: Vec<GameRun> = (0..runs)
        .into_par_iter()
        .map(|_| run_game(scenario, &config, |_| Ok(())))
        .collect::<Result<_>>()?;

    let Some((reference, others)) = results.split_first() else {
        return Ok(VerifyReport {
            runs: 0,
            cycles: 0,
            divergence: None,
            checksum: None,
        });
    };
    let divergence = others
        .iter()
        .filter_map(|run| first_difference(&reference.checksums, &run.checksums))
        .min();

    match divergence {
        Some(cycle) => warn!(scenario = %scenario.name, cycle, "Runs diverged"),
        None => info!(scenario = %scenario.name, runs, "All runs agree"),
    }
    Ok(VerifyReport {
        runs,
        cycles: reference.cycles,
        divergence,
        checksum: reference.checksums.last().cloned(),
    })
}

/// First index at which two checksum sequences differ, counting a missing
/// entry as a difference.
fn first_difference(a: &[StateChecksum], b: &[StateChecksum]) -> Option<u64> {
    let len = a.len().max(b.len());
    (0..len)
        .find(|&i| a.get(i) != b.get(i))
        .map(|i| i as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::Strategy;
    use empire_core::scenario::ring_galaxy;

    #[test]
    fn test_parallel_runs_agree() {
        let config = RunConfig {
            cycles: 25,
            strategies: Strategy::builtin(),
            record: true,
        };
        let report = verify_determinism(&ring_galaxy(4, 4), &config, 4).unwrap();
        assert!(report.is_deterministic());
        assert_eq!(report.runs, 4);
        assert!(report.checksum.is_some());
    }

    #[test]
    fn test_first_difference() {
        let a = StateChecksum::of_canonical("a");
        let b = StateChecksum::of_canonical("b");
        assert_eq!(first_difference(&[a.clone(), a.clone()], &[a.clone(), b]), Some(1));
        assert_eq!(first_difference(&[a.clone()], &[a.clone(), a.clone()]), Some(1));
        assert_eq!(first_difference(&[a.clone()], &[a]), None);
    }
}
