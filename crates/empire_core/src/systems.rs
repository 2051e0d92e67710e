//! Cycle phase systems.
//!
//! Each system runs one phase of a cycle over the whole game state. Systems
//! visit planets and players in id order and only read what earlier phases
//! wrote, so the scheduler can run them back to back without coordination.
//! Fleet movement and combat live in [`crate::fleet`] and [`crate::combat`].

use std::collections::BTreeMap;

use crate::economy::{auto_spend, feed, overflow, planet_output, FeedingOutcome, ResourceLedger};
use crate::ids::{PlanetId, PlayerId};
use crate::notification::{LossReason, NotificationKind, NotificationLog};
use crate::player::{Player, PlayerStatus};
use crate::production::BuildKind;
use crate::research::ResearchEvent;
use crate::resources::{Resource, ResourceStock};
use crate::rules::Rules;
use crate::scoring::{contenders, is_game_over, rank_players};
use crate::ships::ShipCounts;
use crate::state::GameState;
use crate::trade::{Settlement, TradeAmount};

/// Stock movements per planet for the cycle in progress.
pub type Ledgers = BTreeMap<PlanetId, ResourceLedger>;

/// Open a ledger for every planet.
#[must_use]
pub fn open_ledgers(state: &GameState) -> Ledgers {
    state
        .planets
        .values()
        .map(|p| (p.id, ResourceLedger::open(p.stock)))
        .collect()
}

/// Record closing stocks.
pub fn close_ledgers(state: &GameState, ledgers: &mut Ledgers) {
    for (id, ledger) in ledgers.iter_mut() {
        if let Some(planet) = state.planets.get(id) {
            ledger.closing = planet.stock;
        }
    }
}

/// Produce resources on every owned, populated planet.
///
/// Returns the production points each planet has for its build queue.
pub fn economy_system(
    state: &mut GameState,
    rules: &Rules,
    ledgers: &mut Ledgers,
) -> BTreeMap<PlanetId, u32> {
    let mut points = BTreeMap::new();
    for planet in state.planets.values_mut() {
        let Some(owner) = planet.owner.and_then(|o| state.players.get(&o)) else {
            continue;
        };
        let output = planet_output(planet, &owner.research, rules);
        planet.stock.deposit(&output.stock);
        if let Some(ledger) = ledgers.get_mut(&planet.id) {
            ledger.produced.deposit(&output.stock);
        }
        points.insert(planet.id, output.production_points);
    }
    points
}

/// Apply production points to every build queue head.
///
/// Auto-spend tops up the points from stock when enabled and the planet is
/// not rioting. Completed starships join the owner's stationary fleet at the
/// planet.
pub fn production_system(
    state: &mut GameState,
    rules: &Rules,
    points: &BTreeMap<PlanetId, u32>,
    ledgers: &mut Ledgers,
    log: &mut NotificationLog,
) {
    for planet in state.planets.values_mut() {
        let Some(owner) = planet.owner else {
            continue;
        };
        let Some(needed) = planet.build_queue.head().map(|h| h.remaining_cost) else {
            continue;
        };
        let mut available = points.get(&planet.id).copied().unwrap_or(0);

        if planet.options.auto_spend && !planet.rioting && available < needed {
            if let Some(spent) = auto_spend(&mut planet.stock, needed - available, rules) {
                available += spent.points;
                if let Some(ledger) = ledgers.get_mut(&planet.id) {
                    ledger.spent.deposit(&spent.as_stock());
                }
                log.push(NotificationKind::ResourcesAutoSpent {
                    planet: planet.id,
                    owner,
                    energy: spent.energy,
                    ore: spent.ore,
                    iridium: spent.iridium,
                    points: spent.points,
                });
            }
        }

        let Some(done) = planet.build_queue.advance(available) else {
            continue;
        };
        match done.kind {
            BuildKind::Improvement(improvement) => planet.improvements.increment(improvement),
            BuildKind::Starship(ship) => {
                state
                    .fleets
                    .reinforce(owner, planet.hex, &ShipCounts::of(ship, 1));
            }
        }
        tracing::debug!(planet = %planet.id, item = ?done.kind, "Build completed");
        log.push(NotificationKind::BuildCompleted {
            planet: planet.id,
            owner,
            item: done.kind,
            next: planet.build_queue.head().map(|h| h.kind),
        });
    }
}

/// Drain planet research into each player's research and accrue it.
pub fn research_system(
    state: &mut GameState,
    rules: &Rules,
    ledgers: &mut Ledgers,
    log: &mut NotificationLog,
) {
    for player in state.players.values_mut() {
        let mut rate = 0u32;
        for id in &player.planets {
            if let Some(planet) = state.planets.get_mut(id) {
                let drained = planet.stock.research;
                planet.stock.research = 0;
                rate = rate.saturating_add(drained);
                if let Some(ledger) = ledgers.get_mut(id) {
                    ledger.consumed.add(Resource::Research, drained);
                }
            }
        }

        for event in player.research.accrue(rate, rules) {
            log.push(match event {
                ResearchEvent::LevelUp { category, level } => NotificationKind::ResearchCompleted {
                    player: player.id,
                    category,
                    level,
                },
                ResearchEvent::ItemCompleted { category, level } => {
                    NotificationKind::ResearchItemCompleted {
                        player: player.id,
                        category,
                        level,
                    }
                }
            });
        }
    }
}

fn credit(players: &mut BTreeMap<PlayerId, Player>, player: PlayerId, amount: TradeAmount) {
    if let Some(p) = players.get_mut(&player) {
        amount.credit(&mut p.stock);
    }
}

/// Match and expire trade offers, paying out escrow.
pub fn trade_system(state: &mut GameState, rules: &Rules, log: &mut NotificationLog) {
    for settlement in state.trades.settle(state.cycle, rules.trade_expiry_cycles) {
        match settlement {
            Settlement::Matched { first, second } => {
                credit(&mut state.players, first.player, second.offered);
                credit(&mut state.players, second.player, first.offered);
                log.push(NotificationKind::TradeMatched {
                    trade: first.id,
                    counter: second.id,
                    player: first.player,
                    counterparty: second.player,
                    received: second.offered,
                    given: first.offered,
                });
            }
            Settlement::Expired(offer) => {
                credit(&mut state.players, offer.player, offer.offered);
                log.push(NotificationKind::TradeExpired {
                    trade: offer.id,
                    player: offer.player,
                    refunded: offer.offered,
                });
            }
        }
    }
}

/// Move stock above the storage cap into the owner's empire stock.
pub fn storage_system(state: &mut GameState, rules: &Rules, ledgers: &mut Ledgers) {
    for planet in state.planets.values_mut() {
        let Some(owner) = planet.owner.and_then(|o| state.players.get_mut(&o)) else {
            continue;
        };
        let excess = overflow(&mut planet.stock, rules.economy.planet_storage_cap);
        if excess.is_empty() {
            continue;
        }
        owner.stock.deposit(&excess);
        if let Some(ledger) = ledgers.get_mut(&planet.id) {
            ledger.overflowed.deposit(&excess);
        }
    }
}

/// Feed every owned planet, then grow or starve it.
///
/// A planet that starves to zero population is lost to its owner.
pub fn population_system(
    state: &mut GameState,
    rules: &Rules,
    ledgers: &mut Ledgers,
    log: &mut NotificationLog,
) {
    let ids: Vec<PlanetId> = state.planets.keys().copied().collect();
    for id in ids {
        let Some(planet) = state.planets.get_mut(&id) else {
            continue;
        };
        let Some(owner) = planet.owner else {
            continue;
        };
        let mut scratch = ResourceStock::ZERO;
        let empire = state
            .players
            .get_mut(&owner)
            .map_or(&mut scratch, |p| &mut p.stock);
        let feeding = feed(planet, empire, rules);
        let population = planet.population;

        if let Some(ledger) = ledgers.get_mut(&id) {
            ledger.consumed.add(Resource::Food, feeding.eaten);
        }

        match feeding.outcome {
            FeedingOutcome::Fed { .. } => {}
            FeedingOutcome::Starved { shortfall, deaths } => {
                tracing::debug!(planet = %id, shortfall, deaths, "Starvation");
                log.push(NotificationKind::Starvation {
                    planet: id,
                    owner,
                    shortfall,
                    deaths,
                    population,
                });
            }
            FeedingOutcome::Rioted { shortfall, deaths } => {
                tracing::debug!(planet = %id, shortfall, deaths, "Riot");
                log.push(NotificationKind::Riot {
                    planet: id,
                    owner,
                    shortfall,
                    deaths,
                    population,
                });
            }
        }

        if population == 0 {
            state.transfer_planet(id, None);
            log.push(NotificationKind::PlanetLost {
                planet: id,
                owner,
                reason: LossReason::Depopulated,
            });
        }
    }
}

/// Eliminate players with nothing left.
pub fn elimination_system(state: &mut GameState, log: &mut NotificationLog) {
    let cycle = state.cycle;
    let doomed: Vec<PlayerId> = state
        .players
        .values()
        .filter(|p| !p.is_eliminated() && !state.has_holdings(p.id))
        .map(|p| p.id)
        .collect();
    for id in doomed {
        if let Some(player) = state.players.get_mut(&id) {
            player.status = PlayerStatus::Eliminated;
            player.eliminated_cycle = Some(cycle);
        }
        tracing::info!(player = %id, cycle, "Player eliminated");
        log.push(NotificationKind::PlayerEliminated { player: id });
    }
}

/// Flag the end of the game once, naming the winner if there is one.
pub fn game_over_system(state: &mut GameState, rules: &Rules, log: &mut NotificationLog) {
    if state.game_over || !is_game_over(state, rules) {
        return;
    }
    state.game_over = true;
    let remaining = contenders(state);
    let winner = match remaining.as_slice() {
        [only] => Some(*only),
        [] => None,
        _ => rank_players(state, rules).first().map(|s| s.player),
    };
    tracing::info!(cycle = state.cycle, winner = ?winner, "Game over");
    log.push(NotificationKind::GameOver { winner });
}
