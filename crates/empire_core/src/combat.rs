//! Combat resolution.
//!
//! Battles are resolved with a single linear formula and no randomness.
//!
//! # Strength
//!
//! ```text
//! strength = Σ count × (attack × weapons% + defense × shields%) / 100
//!          + platforms × platform_defense        (planet owner only)
//! ```
//!
//! # Losses
//!
//! The weaker side loses every ship. The stronger side loses
//! `floor(count × loser / winner)` of each ship type, so a narrow win is
//! expensive and a lopsided one nearly free. Equal non-zero strengths
//! destroy both sides. A side with zero strength loses without inflicting
//! anything.
//!
//! # Order
//!
//! Contested hexes are resolved in coordinate order. At each hex the
//! defender is the planet owner, or else the owner of the lowest fleet id.
//! Other owners attack one at a time in ascending player id, each against
//! whoever holds the hex after the previous battle.

use std::collections::BTreeSet;

use crate::hex::HexCoord;
use crate::ids::{FleetId, PlanetId, PlayerId};
use crate::math::apply_percent;
use crate::notification::{BattleReport, BattleResult, LossReason, NotificationKind, NotificationLog};
use crate::research::ResearchCategory;
use crate::rules::Rules;
use crate::ships::{ShipCounts, ShipType};
use crate::state::GameState;

/// One side of a battle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Force {
    /// Ships taking part.
    pub ships: ShipCounts,
    /// Attack multiplier in percent.
    pub weapons_percent: u32,
    /// Defense multiplier in percent.
    pub shields_percent: u32,
    /// Flat planetary defense.
    pub fortification: u64,
}

impl Force {
    /// A force with no research bonuses and no fortification.
    #[must_use]
    pub fn new(ships: ShipCounts) -> Self {
        Self {
            ships,
            weapons_percent: 100,
            shields_percent: 100,
            fortification: 0,
        }
    }

    /// Effective strength.
    #[must_use]
    pub fn strength(&self, rules: &Rules) -> u64 {
        let weighted: u64 = self
            .ships
            .iter()
            .map(|(ship, count)| {
                let stats = rules.ship(ship);
                let per_ship = u64::from(stats.attack) * u64::from(self.weapons_percent)
                    + u64::from(stats.defense) * u64::from(self.shields_percent);
                u64::from(count) * per_ship
            })
            .sum();
        weighted / 100 + self.fortification
    }
}

/// Outcome of one engagement before any planet consequences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Engagement {
    /// Attacker strength.
    pub attacker_strength: u64,
    /// Defender strength.
    pub defender_strength: u64,
    /// Ships the attacker lost.
    pub attacker_losses: ShipCounts,
    /// Ships the defender lost.
    pub defender_losses: ShipCounts,
    /// Result; `captured` is always `false` here.
    pub result: BattleResult,
}

/// Ships lost by the winner of a battle.
#[must_use]
pub fn winner_losses(ships: &ShipCounts, winner_strength: u64, loser_strength: u64) -> ShipCounts {
    if winner_strength == 0 {
        return ShipCounts::new();
    }
    ships
        .iter()
        .map(|(ship, count)| {
            let lost = u128::from(count) * u128::from(loser_strength) / u128::from(winner_strength);
            (ship, u32::try_from(lost).unwrap_or(count).min(count))
        })
        .collect()
}

/// Resolve one battle between two forces.
#[must_use]
pub fn engage(attacker: &Force, defender: &Force, rules: &Rules) -> Engagement {
    let a = attacker.strength(rules);
    let d = defender.strength(rules);

    let (result, attacker_losses, defender_losses) = if d == 0 {
        (
            BattleResult::AttackerWins { captured: false },
            ShipCounts::new(),
            defender.ships.clone(),
        )
    } else if a == d {
        (
            BattleResult::MutualDestruction,
            attacker.ships.clone(),
            defender.ships.clone(),
        )
    } else if a > d {
        (
            BattleResult::AttackerWins { captured: false },
            winner_losses(&attacker.ships, a, d),
            defender.ships.clone(),
        )
    } else {
        (
            BattleResult::DefenderHolds,
            attacker.ships.clone(),
            winner_losses(&defender.ships, d, a),
        )
    };

    Engagement {
        attacker_strength: a,
        defender_strength: d,
        attacker_losses,
        defender_losses,
        result,
    }
}

/// Resolve every contested hex.
pub fn combat_system(state: &mut GameState, rules: &Rules, log: &mut NotificationLog) {
    let hexes: BTreeSet<HexCoord> = state.fleets.iter().filter_map(|f| f.position()).collect();
    for hex in hexes {
        resolve_hex(state, hex, rules, log);
    }
}

fn fleets_of(state: &GameState, hex: HexCoord, owner: PlayerId) -> Vec<FleetId> {
    state
        .fleets
        .stationary_at(hex)
        .into_iter()
        .filter(|id| state.fleets.get(*id).is_some_and(|f| f.owner == owner))
        .collect()
}

fn resolve_hex(state: &mut GameState, hex: HexCoord, rules: &Rules, log: &mut NotificationLog) {
    let planet = state.galaxy.planet_at(hex);
    let present = state.fleets.stationary_at(hex);

    let planet_owner = planet.and_then(|id| state.planets.get(&id)).and_then(|p| p.owner);
    let mut holder = planet_owner.or_else(|| {
        present
            .first()
            .and_then(|id| state.fleets.get(*id))
            .map(|f| f.owner)
    });

    let attackers: BTreeSet<PlayerId> = present
        .iter()
        .filter_map(|id| state.fleets.get(*id))
        .map(|f| f.owner)
        .filter(|owner| Some(*owner) != holder)
        .collect();

    for attacker in attackers {
        holder = match holder {
            None => Some(attacker),
            Some(defender) => match fight(state, hex, planet, attacker, Some(defender), rules, log) {
                BattleResult::DefenderHolds => Some(defender),
                BattleResult::AttackerWins { .. } => Some(attacker),
                BattleResult::MutualDestruction => None,
            },
        };
    }

    // a lone force at a neutral planet takes it if there is anyone to rule
    let (Some(planet_id), Some(holder)) = (planet, holder) else {
        return;
    };
    let Some(target) = state.planets.get(&planet_id) else {
        return;
    };
    if target.owner.is_some() {
        return;
    }
    let holder_fleets = fleets_of(state, hex, holder);
    if holder_fleets.is_empty() {
        return;
    }
    let has_colony = holder_fleets
        .iter()
        .filter_map(|id| state.fleets.get(*id))
        .any(|f| f.colony_ships() > 0);
    if target.population > 0 || has_colony {
        fight(state, hex, planet, holder, None, rules, log);
    }
}

fn force_of(state: &GameState, fleets: &[FleetId], player: Option<PlayerId>, rules: &Rules) -> Force {
    let ships: ShipCounts = fleets
        .iter()
        .filter_map(|id| state.fleets.get(*id))
        .flat_map(|f| f.ships.iter())
        .collect();
    Force {
        ships,
        weapons_percent: state.multiplier(player, ResearchCategory::Weapons, rules),
        shields_percent: state.multiplier(player, ResearchCategory::Shields, rules),
        fortification: 0,
    }
}

fn fight(
    state: &mut GameState,
    hex: HexCoord,
    planet: Option<PlanetId>,
    attacker: PlayerId,
    defender: Option<PlayerId>,
    rules: &Rules,
    log: &mut NotificationLog,
) -> BattleResult {
    let attacker_fleets = fleets_of(state, hex, attacker);
    let defender_fleets = defender.map_or_else(Vec::new, |d| fleets_of(state, hex, d));

    // the planet fights for its owner, or for nobody when neutral
    let defended_planet = planet.filter(|id| {
        state
            .planets
            .get(id)
            .is_some_and(|p| p.owner == defender)
    });

    let attacking = force_of(state, &attacker_fleets, Some(attacker), rules);
    let mut defending = force_of(state, &defender_fleets, defender, rules);
    if let Some(planet) = defended_planet.and_then(|id| state.planets.get(&id)) {
        defending.fortification = u64::from(planet.improvements.space_platform)
            * u64::from(rules.combat.platform_defense);
    }

    let mut engagement = engage(&attacking, &defending, rules);
    remove_losses(state, &attacker_fleets, &engagement.attacker_losses);
    remove_losses(state, &defender_fleets, &engagement.defender_losses);

    let mut planet_loss = None;
    if let Some(planet_id) = defended_planet {
        match engagement.result {
            BattleResult::AttackerWins { .. } => {
                let (captured, loss) = capture(state, planet_id, attacker, hex, rules);
                engagement.result = BattleResult::AttackerWins { captured };
                planet_loss = loss;
            }
            BattleResult::MutualDestruction => {
                if let Some(owner) = defender {
                    state.transfer_planet(planet_id, None);
                    planet_loss = Some(NotificationKind::PlanetLost {
                        planet: planet_id,
                        owner,
                        reason: LossReason::MutualDestruction,
                    });
                }
            }
            BattleResult::DefenderHolds => {}
        }
    }

    tracing::debug!(
        q = hex.q,
        r = hex.r,
        attacker = %attacker,
        attacker_strength = engagement.attacker_strength,
        defender_strength = engagement.defender_strength,
        result = ?engagement.result,
        "Battle resolved"
    );

    log.push(NotificationKind::Battle(BattleReport {
        hex,
        planet,
        attacker,
        defender,
        attacker_fleets,
        defender_fleets,
        attacker_strength: engagement.attacker_strength,
        defender_strength: engagement.defender_strength,
        attacker_losses: engagement.attacker_losses,
        defender_losses: engagement.defender_losses,
        result: engagement.result,
    }));
    if let Some(loss) = planet_loss {
        log.push(loss);
    }

    engagement.result
}

/// Take ships out of fleets in id order, dropping emptied fleets.
fn remove_losses(state: &mut GameState, fleets: &[FleetId], losses: &ShipCounts) {
    for (ship, count) in losses.iter() {
        let mut outstanding = count;
        for id in fleets {
            if outstanding == 0 {
                break;
            }
            if let Some(fleet) = state.fleets.get_mut(*id) {
                outstanding -= fleet.ships.remove(ship, outstanding);
            }
        }
    }
    for id in fleets {
        if state.fleets.get(*id).is_some_and(|f| f.ships.is_empty()) {
            state.fleets.remove(*id);
        }
    }
}

/// Hand a defeated planet to the attacker.
///
/// Returns whether the planet changed hands and the loss notification for
/// the previous owner, if any.
fn capture(
    state: &mut GameState,
    planet_id: PlanetId,
    attacker: PlayerId,
    hex: HexCoord,
    rules: &Rules,
) -> (bool, Option<NotificationKind>) {
    let Some(planet) = state.planets.get(&planet_id) else {
        return (false, None);
    };
    let previous = planet.owner;
    let mut population = apply_percent(planet.population, rules.combat.capture_retention_percent);

    if population == 0 {
        let colony = fleets_of(state, hex, attacker)
            .into_iter()
            .find(|id| state.fleets.get(*id).is_some_and(|f| f.colony_ships() > 0));
        if let Some(id) = colony {
            if let Some(fleet) = state.fleets.get_mut(id) {
                fleet.ships.remove(ShipType::ColonyShip, 1);
                if fleet.ships.is_empty() {
                    state.fleets.remove(id);
                }
            }
            population = rules.combat.colony_population;
        }
    }

    if let Some(planet) = state.planets.get_mut(&planet_id) {
        planet.population = population;
        planet.max_population = planet.max_population.max(population);
    }

    if population > 0 {
        state.transfer_planet(planet_id, Some(attacker));
        let loss = previous.map(|owner| NotificationKind::PlanetLost {
            planet: planet_id,
            owner,
            reason: LossReason::Captured { by: attacker },
        });
        (true, loss)
    } else {
        state.transfer_planet(planet_id, None);
        let loss = previous.map(|owner| NotificationKind::PlanetLost {
            planet: planet_id,
            owner,
            reason: LossReason::Depopulated,
        });
        (false, loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::Galaxy;
    use crate::planet::Planet;
    use crate::player::Player;

    fn arena() -> GameState {
        let mut state = GameState::new(Galaxy::hexagon(3));
        for id in 1..=3 {
            state
                .add_player(Player::new(PlayerId(id), format!("P{id}")))
                .unwrap();
        }
        state
    }

    fn battles(log: &NotificationLog) -> Vec<&BattleReport> {
        log.records()
            .iter()
            .filter_map(|n| match &n.kind {
                NotificationKind::Battle(report) => Some(report),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_strength_formula() {
        let rules = Rules::default();
        let mut force = Force::new(ShipCounts::of(ShipType::Fighter, 10));
        // 10 × (3 + 2)
        assert_eq!(force.strength(&rules), 50);
        force.weapons_percent = 120;
        force.fortification = 20;
        // 10 × (3 × 120 + 2 × 100) / 100 + 20
        assert_eq!(force.strength(&rules), 76);
    }

    #[test]
    fn test_winner_losses_are_proportional() {
        let ships = ShipCounts::of(ShipType::Fighter, 10).with(ShipType::Scout, 3);
        let losses = winner_losses(&ships, 100, 40);
        assert_eq!(losses.get(ShipType::Fighter), 4);
        assert_eq!(losses.get(ShipType::Scout), 1);
    }

    #[test]
    fn test_engagement_mirrors_when_roles_swap() {
        let rules = Rules::default();
        let strong = Force::new(ShipCounts::of(ShipType::Cruiser, 3));
        let weak = Force::new(ShipCounts::of(ShipType::Fighter, 4));

        let forward = engage(&strong, &weak, &rules);
        let reverse = engage(&weak, &strong, &rules);
        assert_eq!(forward.result, BattleResult::AttackerWins { captured: false });
        assert_eq!(reverse.result, BattleResult::DefenderHolds);
        assert_eq!(forward.attacker_losses, reverse.defender_losses);
        assert_eq!(forward.defender_losses, reverse.attacker_losses);
        assert_eq!(forward.attacker_strength, reverse.defender_strength);
    }

    #[test]
    fn test_equal_fleets_destroy_each_other_and_free_the_planet() {
        let rules = Rules::default();
        let mut state = arena();
        let hex = HexCoord::new(1, 0);
        state
            .add_planet(
                Planet::new(PlanetId(1), "Contested", hex)
                    .with_owner(PlayerId(1))
                    .with_population(20),
            )
            .unwrap();
        state
            .fleets
            .spawn(PlayerId(1), ShipCounts::of(ShipType::Frigate, 5), hex);
        state
            .fleets
            .spawn(PlayerId(2), ShipCounts::of(ShipType::Frigate, 5), hex);

        let mut log = NotificationLog::new(0);
        combat_system(&mut state, &rules, &mut log);

        let reports = battles(&log);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].result, BattleResult::MutualDestruction);
        assert!(state.fleets.is_empty());
        assert_eq!(state.planets[&PlanetId(1)].owner, None);
        assert!(state.players[&PlayerId(1)].planets.is_empty());
        assert!(state.check_invariants(&rules).is_ok());
    }

    #[test]
    fn test_undefended_planet_is_captured_with_retention() {
        let rules = Rules::default();
        let mut state = arena();
        let hex = HexCoord::new(0, 1);
        state
            .add_planet(
                Planet::new(PlanetId(1), "Outpost", hex)
                    .with_owner(PlayerId(1))
                    .with_population(11),
            )
            .unwrap();
        state
            .fleets
            .spawn(PlayerId(2), ShipCounts::of(ShipType::Scout, 1), hex);

        let mut log = NotificationLog::new(0);
        combat_system(&mut state, &rules, &mut log);

        let reports = battles(&log);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].defender_strength, 0);
        assert_eq!(reports[0].result, BattleResult::AttackerWins { captured: true });
        let planet = &state.planets[&PlanetId(1)];
        assert_eq!(planet.owner, Some(PlayerId(2)));
        assert_eq!(planet.population, 5);
        assert!(log.records().iter().any(|n| n.kind
            == NotificationKind::PlanetLost {
                planet: PlanetId(1),
                owner: PlayerId(1),
                reason: LossReason::Captured { by: PlayerId(2) },
            }));
    }

    #[test]
    fn test_platforms_hold_off_a_small_raid() {
        let rules = Rules::default();
        let mut state = arena();
        let hex = HexCoord::new(-1, 0);
        let mut planet = Planet::new(PlanetId(1), "Bastion", hex)
            .with_owner(PlayerId(1))
            .with_population(30);
        planet.improvements.space_platform = 2;
        state.add_planet(planet).unwrap();
        state
            .fleets
            .spawn(PlayerId(2), ShipCounts::of(ShipType::Fighter, 2), hex);

        let mut log = NotificationLog::new(0);
        combat_system(&mut state, &rules, &mut log);

        let reports = battles(&log);
        assert_eq!(reports[0].defender_strength, 20);
        assert_eq!(reports[0].result, BattleResult::DefenderHolds);
        assert!(state.fleets.is_empty());
        assert_eq!(state.planets[&PlanetId(1)].owner, Some(PlayerId(1)));
    }

    #[test]
    fn test_colony_ship_settles_empty_neutral_world() {
        let rules = Rules::default();
        let mut state = arena();
        let hex = HexCoord::new(2, 0);
        state
            .add_planet(Planet::new(PlanetId(1), "Barren", hex))
            .unwrap();
        state.fleets.spawn(
            PlayerId(3),
            ShipCounts::of(ShipType::ColonyShip, 1).with(ShipType::Scout, 1),
            hex,
        );

        let mut log = NotificationLog::new(0);
        combat_system(&mut state, &rules, &mut log);

        let planet = &state.planets[&PlanetId(1)];
        assert_eq!(planet.owner, Some(PlayerId(3)));
        assert_eq!(planet.population, 5);
        let fleet = state.fleets.iter().next().unwrap();
        assert_eq!(fleet.ships, ShipCounts::of(ShipType::Scout, 1));
    }

    #[test]
    fn test_attackers_take_turns_by_player_id() {
        let rules = Rules::default();
        let mut state = arena();
        let hex = HexCoord::new(1, 1);
        state
            .fleets
            .spawn(PlayerId(2), ShipCounts::of(ShipType::Battleship, 1), hex);
        state
            .fleets
            .spawn(PlayerId(3), ShipCounts::of(ShipType::Scout, 1), hex);
        state
            .fleets
            .spawn(PlayerId(1), ShipCounts::of(ShipType::Scout, 1), hex);

        let mut log = NotificationLog::new(0);
        combat_system(&mut state, &rules, &mut log);

        let reports = battles(&log);
        let order: Vec<PlayerId> = reports.iter().map(|r| r.attacker).collect();
        assert_eq!(order, vec![PlayerId(1), PlayerId(3)]);
        assert!(reports.iter().all(|r| r.defender == Some(PlayerId(2))));
        assert_eq!(state.fleets.len(), 1);
    }
}
