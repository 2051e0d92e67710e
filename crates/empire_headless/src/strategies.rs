//! Scripted empires for headless playtesting.
//!
//! A strategy looks only at the committed state and turns it into the
//! actions one player submits for the next cycle. It holds no state of its
//! own, so two runs of the same scenario with the same strategies produce
//! the same action batches.

use std::path::Path;

use empire_core::action::Action;
use empire_core::hex::HexCoord;
use empire_core::ids::{PlanetId, PlayerId};
use empire_core::planet::{ImprovementType, Planet, PlanetOptions};
use empire_core::production::{BuildKind, BuildQueueOp};
use empire_core::research::{ResearchAllocation, ResearchCategory};
use empire_core::ships::{ShipCounts, ShipType};
use empire_core::state::GameState;
use serde::{Deserialize, Serialize};

use crate::error::{HeadlessError, Result};

/// A complete scripted empire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    /// Strategy name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Worker split applied to every owned planet: food, ore, industry.
    pub workers: (u32, u32, u32),
    /// Research split; must sum to 100.
    pub research: Vec<(ResearchCategory, u32)>,
    /// Items queued in rotation whenever a planet's queue runs dry.
    pub build_order: Vec<BuildKind>,
    /// Send colony ships towards unclaimed worlds.
    pub expand: bool,
    /// Cycle of the first attack.
    pub attack_cycle: u64,
    /// Cycles between attacks after the first.
    pub attack_interval: u64,
    /// Warships a stationary fleet must hold before it attacks.
    pub attack_threshold: u32,
}

impl Default for Strategy {
    fn default() -> Self {
        Self::balanced()
    }
}

impl Strategy {
    /// Load a strategy from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(HeadlessError::StrategyNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        Ok(ron::from_str(ron)?)
    }

    /// Resolve a built-in name, or load a `.ron` path.
    pub fn resolve(name: &str) -> Result<Self> {
        if Path::new(name).extension().is_some_and(|ext| ext == "ron") {
            return Self::load(name);
        }
        Self::builtin()
            .into_iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| HeadlessError::UnknownStrategy(name.to_string()))
    }

    /// Every built-in strategy.
    #[must_use]
    pub fn builtin() -> Vec<Self> {
        vec![Self::balanced(), Self::aggressor()]
    }

    /// Even economy, steady fleet, opportunistic attacks.
    #[must_use]
    pub fn balanced() -> Self {
        Self {
            name: "Balanced".to_string(),
            description: "Standard balanced gameplay".to_string(),
            workers: (50, 20, 30),
            research: ResearchAllocation::default().iter().collect(),
            build_order: vec![
                BuildKind::Improvement(ImprovementType::Farm),
                BuildKind::Starship(ShipType::Frigate),
                BuildKind::Improvement(ImprovementType::Factory),
                BuildKind::Starship(ShipType::ColonyShip),
                BuildKind::Improvement(ImprovementType::Mine),
                BuildKind::Starship(ShipType::Destroyer),
            ],
            expand: true,
            attack_cycle: 30,
            attack_interval: 10,
            attack_threshold: 6,
        }
    }

    /// Early warships and constant pressure.
    #[must_use]
    pub fn aggressor() -> Self {
        Self {
            name: "Aggressor".to_string(),
            description: "Early aggression with cheap warships".to_string(),
            workers: (45, 15, 40),
            research: vec![
                (ResearchCategory::Weapons, 50),
                (ResearchCategory::Propulsion, 30),
                (ResearchCategory::Agriculture, 20),
            ],
            build_order: vec![
                BuildKind::Starship(ShipType::Fighter),
                BuildKind::Starship(ShipType::Frigate),
                BuildKind::Improvement(ImprovementType::Factory),
                BuildKind::Starship(ShipType::Frigate),
            ],
            expand: false,
            attack_cycle: 12,
            attack_interval: 4,
            attack_threshold: 3,
        }
    }

    /// The actions `player` submits against the committed `state`.
    ///
    /// Always ends with [`Action::EndTurn`].
    #[must_use]
    pub fn orders(&self, state: &GameState, player: PlayerId) -> Vec<Action> {
        let mut orders = Vec::new();
        let owned: Vec<&Planet> = state
            .planets
            .values()
            .filter(|p| p.is_owned_by(player))
            .collect();

        if state.cycle == 0 {
            orders.push(Action::SetResearchAllocation {
                allocation: ResearchAllocation::from_pairs(self.research.iter().copied()),
            });
        }

        let (food, ore, industry) = self.workers;
        for planet in &owned {
            if planet.options.food_percent != food
                || planet.options.ore_percent != ore
                || planet.options.industry_percent != industry
            {
                orders.push(Action::SetPlanetOptions {
                    planet: planet.id,
                    options: PlanetOptions {
                        food_percent: food,
                        ore_percent: ore,
                        industry_percent: industry,
                        auto_spend: true,
                    },
                });
            }
            if planet.build_queue.is_empty() {
                if let Some(kind) = self.next_build(planet, state.cycle) {
                    orders.push(Action::UpdateBuildQueue {
                        planet: planet.id,
                        op: BuildQueueOp::Add { kind },
                    });
                }
            }
        }

        if self.expand {
            orders.extend(self.colonize(state, player));
        }
        if self.attack_due(state.cycle) {
            orders.extend(self.attack(state, player));
        }
        orders.push(Action::EndTurn);
        orders
    }

    fn next_build(&self, planet: &Planet, cycle: u64) -> Option<BuildKind> {
        if self.build_order.is_empty() {
            return None;
        }
        let len = self.build_order.len() as u64;
        let start = (cycle + u64::from(planet.id.0)) % len;
        (0..len)
            .map(|offset| self.build_order[((start + offset) % len) as usize])
            .find(|kind| match kind {
                BuildKind::Improvement(_) => planet.free_improvement_slots() > 0,
                BuildKind::Starship(_) => true,
            })
    }

    fn attack_due(&self, cycle: u64) -> bool {
        cycle >= self.attack_cycle
            && (cycle - self.attack_cycle) % self.attack_interval.max(1) == 0
    }

    /// One colony ship per stationary fleet, towards the nearest world that
    /// nobody owns.
    fn colonize(&self, state: &GameState, player: PlayerId) -> Vec<Action> {
        let targets: Vec<(PlanetId, HexCoord)> = state
            .planets
            .values()
            .filter(|p| p.owner.is_none())
            .map(|p| (p.id, p.hex))
            .collect();

        state
            .fleets
            .iter()
            .filter(|f| f.owner == player && f.colony_ships() > 0)
            .filter_map(|f| {
                let at = f.position()?;
                let to = nearest(at, &targets)?;
                Some(Action::SendShips {
                    from: at,
                    to,
                    ships: ShipCounts::of(ShipType::ColonyShip, 1),
                })
            })
            .collect()
    }

    /// Every stationary fleet over the threshold sends its warships to the
    /// nearest enemy world.
    fn attack(&self, state: &GameState, player: PlayerId) -> Vec<Action> {
        let targets: Vec<(PlanetId, HexCoord)> = state
            .planets
            .values()
            .filter(|p| p.owner.is_some_and(|owner| owner != player))
            .map(|p| (p.id, p.hex))
            .collect();

        state
            .fleets
            .iter()
            .filter(|f| f.owner == player)
            .filter_map(|f| {
                let at = f.position()?;
                let warships = warships(&f.ships);
                let count = warships.total();
                if count == 0 || count < u64::from(self.attack_threshold) {
                    return None;
                }
                let to = nearest(at, &targets)?;
                Some(Action::SendShips {
                    from: at,
                    to,
                    ships: warships,
                })
            })
            .collect()
    }
}

fn warships(ships: &ShipCounts) -> ShipCounts {
    ships
        .iter()
        .filter(|(ship, _)| *ship != ShipType::ColonyShip)
        .fold(ShipCounts::new(), |acc, (ship, count)| acc.with(ship, count))
}

/// Closest target by hex steps; ties go to the lower planet id.
fn nearest(from: HexCoord, targets: &[(PlanetId, HexCoord)]) -> Option<HexCoord> {
    targets
        .iter()
        .filter(|(_, hex)| *hex != from)
        .min_by_key(|(id, hex)| (from.steps_to(*hex), *id))
        .map(|(_, hex)| *hex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use empire_test_utils::fixtures::{duel, player};

    #[test]
    fn test_builtin_strategies_are_valid() {
        for strategy in Strategy::builtin() {
            let allocation = ResearchAllocation::from_pairs(strategy.research.iter().copied());
            allocation.validate().unwrap();
            let (food, ore, industry) = strategy.workers;
            assert_eq!(food + ore + industry, 100, "{}", strategy.name);
            assert!(!strategy.build_order.is_empty());
        }
    }

    #[test]
    fn test_resolve_by_name() {
        assert_eq!(Strategy::resolve("aggressor").unwrap().name, "Aggressor");
        assert!(matches!(
            Strategy::resolve("zerg"),
            Err(HeadlessError::UnknownStrategy(_))
        ));
        assert!(matches!(
            Strategy::resolve("/nonexistent/plan.ron"),
            Err(HeadlessError::StrategyNotFound(_))
        ));
    }

    #[test]
    fn test_opening_orders() {
        let state = duel();
        let orders = Strategy::balanced().orders(&state, player(1));
        assert!(matches!(orders[0], Action::SetResearchAllocation { .. }));
        assert!(orders
            .iter()
            .any(|a| matches!(a, Action::UpdateBuildQueue { planet, .. } if planet.0 == 1)));
        assert_eq!(orders.last(), Some(&Action::EndTurn));
    }

    #[test]
    fn test_orders_are_a_pure_function_of_state() {
        let state = duel();
        for strategy in Strategy::builtin() {
            assert_eq!(
                strategy.orders(&state, player(2)),
                strategy.orders(&state, player(2))
            );
        }
    }

    #[test]
    fn test_attack_targets_nearest_enemy() {
        let mut state = duel();
        state.cycle = 12;
        let orders = Strategy::aggressor().attack(&state, player(1));
        assert!(orders.is_empty(), "two frigates are under the threshold");

        let west = HexCoord::new(-3, 0);
        state
            .fleets
            .reinforce(player(1), west, &ShipCounts::of(ShipType::Frigate, 2));
        let orders = Strategy::aggressor().attack(&state, player(1));
        assert_eq!(
            orders,
            vec![Action::SendShips {
                from: west,
                to: HexCoord::new(3, 0),
                ships: ShipCounts::of(ShipType::Frigate, 4),
            }]
        );
    }

    #[test]
    fn test_strategy_ron_round_trip() {
        let text = ron::to_string(&Strategy::aggressor()).unwrap();
        assert_eq!(Strategy::from_ron_str(&text).unwrap(), Strategy::aggressor());
    }
}
