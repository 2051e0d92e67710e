//! Game-over detection and score summaries.
//!
//! ```text
//! score = planets × 1000 + production potential × 10 + cycles survived
//! ```
//!
//! Production potential is the production points the player's planets would
//! yield this cycle. Ties rank by player id.

use serde::{Deserialize, Serialize};

use crate::economy::planet_output;
use crate::ids::PlayerId;
use crate::rules::Rules;
use crate::state::GameState;

/// One line of the score table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerScore {
    /// 1-based rank.
    pub rank: u32,
    /// Player.
    pub player: PlayerId,
    /// Planets owned.
    pub planets: u32,
    /// Production points per cycle.
    pub production: u32,
    /// Cycles survived.
    pub survival_cycles: u64,
    /// Total score.
    pub score: u64,
}

/// Players who still hold something and are not eliminated.
#[must_use]
pub fn contenders(state: &GameState) -> Vec<PlayerId> {
    state
        .players
        .values()
        .filter(|p| !p.is_eliminated() && state.has_holdings(p.id))
        .map(|p| p.id)
        .collect()
}

/// Whether the game has ended or should end now.
#[must_use]
pub fn is_game_over(state: &GameState, rules: &Rules) -> bool {
    if state.game_over {
        return true;
    }
    let limit_reached = rules.max_cycles.is_some_and(|max| state.cycle >= max);
    limit_reached || (state.players.len() > 1 && contenders(state).len() <= 1)
}

/// Ranked score summary.
#[must_use]
pub fn rank_players(state: &GameState, rules: &Rules) -> Vec<PlayerScore> {
    let mut rows: Vec<PlayerScore> = state
        .players
        .values()
        .map(|player| {
            let production: u32 = player
                .planets
                .iter()
                .filter_map(|id| state.planets.get(id))
                .map(|planet| planet_output(planet, &player.research, rules).production_points)
                .fold(0, u32::saturating_add);
            let planets = u32::try_from(player.planets.len()).unwrap_or(u32::MAX);
            let survival_cycles = player.survival_cycles(state.cycle);
            PlayerScore {
                rank: 0,
                player: player.id,
                planets,
                production,
                survival_cycles,
                score: u64::from(planets) * 1000 + u64::from(production) * 10 + survival_cycles,
            }
        })
        .collect();

    rows.sort_by(|a, b| b.score.cmp(&a.score).then(a.player.cmp(&b.player)));
    for (rank, row) in (1u32..).zip(rows.iter_mut()) {
        row.rank = rank;
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::{Galaxy, HexCoord};
    use crate::ids::PlanetId;
    use crate::planet::Planet;
    use crate::player::Player;

    fn state() -> GameState {
        let mut state = GameState::new(Galaxy::hexagon(2));
        state.add_player(Player::new(PlayerId(1), "Aster")).unwrap();
        state.add_player(Player::new(PlayerId(2), "Borealis")).unwrap();
        state
            .add_planet(
                Planet::new(PlanetId(1), "A", HexCoord::ORIGIN)
                    .with_owner(PlayerId(1))
                    .with_population(10),
            )
            .unwrap();
        state
            .add_planet(
                Planet::new(PlanetId(2), "B", HexCoord::new(1, 0))
                    .with_owner(PlayerId(2))
                    .with_population(10),
            )
            .unwrap();
        state.cycle = 4;
        state
    }

    #[test]
    fn test_ties_break_by_player_id() {
        let rules = Rules::default();
        let scores = rank_players(&state(), &rules);
        assert_eq!(scores[0].player, PlayerId(1));
        assert_eq!(scores[0].score, scores[1].score);
        // 1 planet, 3 production, 4 cycles
        assert_eq!(scores[0].score, 1000 + 30 + 4);
        assert_eq!(scores[1].rank, 2);
    }

    #[test]
    fn test_single_contender_ends_game() {
        let rules = Rules::default();
        let mut state = state();
        assert!(!is_game_over(&state, &rules));
        state.transfer_planet(PlanetId(2), Some(PlayerId(1)));
        assert!(is_game_over(&state, &rules));
        assert_eq!(rank_players(&state, &rules)[0].planets, 2);
    }

    #[test]
    fn test_cycle_limit_ends_game() {
        let rules = Rules {
            max_cycles: Some(4),
            ..Rules::default()
        };
        assert!(is_game_over(&state(), &rules));
    }
}
