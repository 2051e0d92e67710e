//! The complete game state.
//!
//! `GameState` is plain data: every collection is ordered so iteration,
//! serialization and checksums are identical on every participant. Only
//! the scheduler mutates it, one cycle at a time.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::fleet::Fleets;
use crate::hex::{Galaxy, HexCoord};
use crate::ids::{PlanetId, PlayerId};
use crate::planet::Planet;
use crate::player::Player;
use crate::research::ResearchCategory;
use crate::rules::Rules;
use crate::trade::TradeBook;

/// Authoritative state of one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Cycles completed so far.
    pub cycle: u64,
    /// Map.
    pub galaxy: Galaxy,
    /// All planets, owned or neutral.
    pub planets: BTreeMap<PlanetId, Planet>,
    /// All players, including resigned and eliminated ones.
    pub players: BTreeMap<PlayerId, Player>,
    /// All fleets.
    pub fleets: Fleets,
    /// Open trade offers.
    pub trades: TradeBook,
    /// Set once the game has ended.
    pub game_over: bool,
}

impl GameState {
    /// An empty game on a galaxy.
    #[must_use]
    pub fn new(galaxy: Galaxy) -> Self {
        Self {
            cycle: 0,
            galaxy,
            planets: BTreeMap::new(),
            players: BTreeMap::new(),
            fleets: Fleets::new(),
            trades: TradeBook::new(),
            game_over: false,
        }
    }

    /// Add a player.
    pub fn add_player(&mut self, player: Player) -> Result<()> {
        if self.players.contains_key(&player.id) {
            return Err(GameError::InvalidScenario(format!(
                "duplicate player {}",
                player.id
            )));
        }
        self.players.insert(player.id, player);
        Ok(())
    }

    /// Place a planet in the galaxy and register it with its owner.
    pub fn add_planet(&mut self, planet: Planet) -> Result<()> {
        if self.planets.contains_key(&planet.id) {
            return Err(GameError::InvalidScenario(format!(
                "duplicate planet {}",
                planet.id
            )));
        }
        if !self.galaxy.place_planet(planet.hex, planet.id) {
            return Err(GameError::InvalidScenario(format!(
                "planet {} cannot be placed at ({}, {})",
                planet.id, planet.hex.q, planet.hex.r
            )));
        }
        if let Some(owner) = planet.owner {
            let player = self.players.get_mut(&owner).ok_or_else(|| {
                GameError::InvalidScenario(format!(
                    "planet {} owned by unknown player {owner}",
                    planet.id
                ))
            })?;
            player.planets.insert(planet.id);
        }
        self.planets.insert(planet.id, planet);
        Ok(())
    }

    /// Planet at a hex.
    #[must_use]
    pub fn planet_at(&self, hex: HexCoord) -> Option<&Planet> {
        self.galaxy
            .planet_at(hex)
            .and_then(|id| self.planets.get(&id))
    }

    /// Change a planet's owner, keeping every player's planet set in step.
    ///
    /// The build queue and riot flag always go with the old owner.
    pub fn transfer_planet(&mut self, id: PlanetId, new_owner: Option<PlayerId>) {
        let Some(planet) = self.planets.get_mut(&id) else {
            return;
        };
        if let Some(previous) = planet.owner {
            if let Some(player) = self.players.get_mut(&previous) {
                player.planets.remove(&id);
            }
        }
        match new_owner {
            Some(owner) => {
                planet.transfer_to(owner);
                if let Some(player) = self.players.get_mut(&owner) {
                    player.planets.insert(id);
                }
            }
            None => planet.revert_to_neutral(),
        }
    }

    /// Research level of every player in one category.
    #[must_use]
    pub fn research_levels(&self, category: ResearchCategory) -> BTreeMap<PlayerId, u32> {
        self.players
            .values()
            .map(|p| (p.id, p.research.level(category)))
            .collect()
    }

    /// Research multiplier (percent) of a player; neutral forces get 100.
    #[must_use]
    pub fn multiplier(&self, player: Option<PlayerId>, category: ResearchCategory, rules: &Rules) -> u32 {
        player
            .and_then(|p| self.players.get(&p))
            .map_or(100, |p| p.research.multiplier(category, rules))
    }

    /// Whether a player owns at least one planet or fleet.
    #[must_use]
    pub fn has_holdings(&self, player: PlayerId) -> bool {
        self.players
            .get(&player)
            .is_some_and(|p| !p.planets.is_empty())
            || self.fleets.any_owned_by(player)
    }

    /// Verify the structural invariants.
    ///
    /// A failure here means the engine itself is wrong; the caller must stop
    /// processing this session.
    pub fn check_invariants(&self, rules: &Rules) -> Result<()> {
        let fail = |message: String| GameError::InvariantViolation {
            cycle: self.cycle,
            message,
        };

        for player in self.players.values() {
            let owned: BTreeSet<PlanetId> = self
                .planets
                .values()
                .filter(|p| p.owner == Some(player.id))
                .map(|p| p.id)
                .collect();
            if owned != player.planets {
                return Err(fail(format!(
                    "player {} planet set {:?} does not match owned planets {:?}",
                    player.id, player.planets, owned
                )));
            }
        }

        for planet in self.planets.values() {
            if self.galaxy.planet_at(planet.hex) != Some(planet.id) {
                return Err(fail(format!(
                    "planet {} is not resident at its hex ({}, {})",
                    planet.id, planet.hex.q, planet.hex.r
                )));
            }
            if let Some(owner) = planet.owner {
                if !self.players.contains_key(&owner) {
                    return Err(fail(format!(
                        "planet {} owned by unknown player {owner}",
                        planet.id
                    )));
                }
            } else if !planet.build_queue.is_empty() {
                return Err(fail(format!("neutral planet {} has a build queue", planet.id)));
            }
            if planet.build_queue.len() > rules.max_queue_length {
                return Err(fail(format!("planet {} build queue over cap", planet.id)));
            }
            let used = planet.improvements.total() + planet.build_queue.queued_improvements();
            if used > planet.improvement_slots {
                return Err(fail(format!(
                    "planet {} uses {used} of {} improvement slots",
                    planet.id, planet.improvement_slots
                )));
            }
        }

        for cell in self.galaxy.cells() {
            if let Some(id) = cell.planet {
                if self.planets.get(&id).map(|p| p.hex) != Some(cell.coord) {
                    return Err(fail(format!(
                        "cell ({}, {}) names planet {id} which is elsewhere",
                        cell.coord.q, cell.coord.r
                    )));
                }
            }
        }

        for fleet in self.fleets.iter() {
            if fleet.ships.is_empty() {
                return Err(fail(format!("fleet {} is empty", fleet.id)));
            }
            if !fleet.ships.is_normalized() {
                return Err(fail(format!(
                    "fleet {} stores a zero ship count: {:?}",
                    fleet.id, fleet.ships
                )));
            }
            if !self.players.contains_key(&fleet.owner) {
                return Err(fail(format!(
                    "fleet {} owned by unknown player {}",
                    fleet.id, fleet.owner
                )));
            }
            if fleet.remaining_distance < crate::math::Fixed::ZERO
                || fleet.remaining_distance > fleet.total_distance
            {
                return Err(fail(format!(
                    "fleet {} remaining distance {} outside 0..={}",
                    fleet.id, fleet.remaining_distance, fleet.total_distance
                )));
            }
            if fleet.is_stationary() && fleet.total_distance != crate::math::Fixed::ZERO {
                return Err(fail(format!("stationary fleet {} has a distance", fleet.id)));
            }
            let on_map = self.galaxy.contains(fleet.origin)
                && fleet.destination.map_or(true, |d| self.galaxy.contains(d));
            if !on_map {
                return Err(fail(format!("fleet {} is off the map", fleet.id)));
            }
        }

        for offer in self.trades.iter() {
            if !self.players.contains_key(&offer.player) {
                return Err(fail(format!(
                    "trade {} owned by unknown player {}",
                    offer.id, offer.player
                )));
            }
        }

        Ok(())
    }
}
