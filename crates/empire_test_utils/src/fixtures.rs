//! Test fixtures and helpers.
//!
//! Pre-built game states for the situations the engine is most often tested
//! against. Every fixture is built through the public constructors, so a
//! fixture that fails to build is itself a bug report.

use empire_core::action::{Action, PendingAction};
use empire_core::hex::{Galaxy, HexCoord};
use empire_core::ids::{PlanetId, PlayerId};
use empire_core::planet::{Planet, PlanetOptions};
use empire_core::player::Player;
use empire_core::rules::Rules;
use empire_core::ships::{ShipCounts, ShipType};
use empire_core::simulation::Simulation;
use empire_core::state::GameState;
use fixed::types::I32F32;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Shorthand for player ids.
#[must_use]
pub const fn player(id: u32) -> PlayerId {
    PlayerId(id)
}

/// Shorthand for planet ids.
#[must_use]
pub const fn planet(id: u32) -> PlanetId {
    PlanetId(id)
}

/// Wrap an action for submission.
#[must_use]
pub fn pending(player_id: u32, sequence: u64, action: Action) -> PendingAction {
    PendingAction::new(PlayerId(player_id), sequence, action)
}

/// An owned planet with a population.
#[must_use]
pub fn owned_planet(id: u32, name: &str, hex: HexCoord, owner: u32, population: u32) -> Planet {
    Planet::new(PlanetId(id), name, hex)
        .with_owner(PlayerId(owner))
        .with_population(population)
}

/// Worker split with everyone in one job.
#[must_use]
pub fn all_in(food: u32, ore: u32, industry: u32) -> PlanetOptions {
    PlanetOptions {
        food_percent: food,
        ore_percent: ore,
        industry_percent: industry,
        auto_spend: false,
    }
}

/// Empty game on a hexagon galaxy with `players` players named after stars.
///
/// # Panics
///
/// Panics if a player cannot be added.
#[must_use]
pub fn empty_game(radius: u32, players: u32) -> GameState {
    const NAMES: [&str; 6] = ["Aster", "Borealis", "Cygnus", "Draco", "Eridani", "Fornax"];
    let mut state = GameState::new(Galaxy::hexagon(radius));
    for id in 1..=players {
        let name = NAMES.get((id - 1) as usize).copied().unwrap_or("Outlier");
        state
            .add_player(Player::new(PlayerId(id), name))
            .expect("fixture player");
    }
    state
}

/// Two empires facing each other across a radius-3 galaxy.
///
/// Player 1 holds (-3, 0), player 2 holds (3, 0), both with population 10
/// and a frigate pair at home. A neutral world sits at the origin.
///
/// # Panics
///
/// Panics if the fixture is inconsistent.
#[must_use]
pub fn duel() -> GameState {
    let mut state = empty_game(3, 2);
    let west = HexCoord::new(-3, 0);
    let east = HexCoord::new(3, 0);
    state
        .add_planet(owned_planet(1, "Aster Prime", west, 1, 10))
        .expect("fixture planet");
    state
        .add_planet(owned_planet(2, "Borealis Prime", east, 2, 10))
        .expect("fixture planet");
    state
        .add_planet(Planet::new(PlanetId(3), "Midway", HexCoord::ORIGIN).with_population(6))
        .expect("fixture planet");
    state
        .fleets
        .spawn(PlayerId(1), ShipCounts::of(ShipType::Frigate, 2), west);
    state
        .fleets
        .spawn(PlayerId(2), ShipCounts::of(ShipType::Frigate, 2), east);
    state
}

/// [`duel`] wrapped in a simulation with default rules.
#[must_use]
pub fn duel_simulation() -> Simulation {
    Simulation::new(duel(), Rules::default())
}

/// One planet with population 10, an empty larder and the default worker
/// split: 5 food farmed against a need of 8.
///
/// The shortfall of 3 kills 3 population in the first cycle.
///
/// # Panics
///
/// Panics if the fixture is inconsistent.
#[must_use]
pub fn hungry_world() -> GameState {
    let mut state = empty_game(1, 1);
    state
        .add_planet(owned_planet(1, "Famine", HexCoord::ORIGIN, 1, 10))
        .expect("fixture planet");
    state
}

/// Two equal frigate fleets at an owned planet with no platforms.
///
/// Player 2 owns the planet and defends; player 1 attacks. Strengths are
/// equal, so both fleets are destroyed and the planet turns neutral.
///
/// # Panics
///
/// Panics if the fixture is inconsistent.
#[must_use]
pub fn standoff() -> GameState {
    let mut state = empty_game(2, 2);
    state
        .add_planet(owned_planet(1, "Contested", HexCoord::ORIGIN, 2, 10))
        .expect("fixture planet");
    state
        .add_planet(owned_planet(2, "Aster Prime", HexCoord::new(2, 0), 1, 10))
        .expect("fixture planet");
    state
        .fleets
        .spawn(PlayerId(2), ShipCounts::of(ShipType::Frigate, 5), HexCoord::ORIGIN);
    state
        .fleets
        .spawn(PlayerId(1), ShipCounts::of(ShipType::Frigate, 5), HexCoord::ORIGIN);
    state
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_are_consistent() {
        let rules = Rules::default();
        for state in [duel(), hungry_world(), standoff(), empty_game(4, 6)] {
            state.check_invariants(&rules).unwrap();
        }
    }

    #[test]
    fn test_duel_layout() {
        let state = duel();
        assert_eq!(state.players.len(), 2);
        assert_eq!(state.fleets.len(), 2);
        assert!(state.planets[&planet(3)].owner.is_none());
    }
}
