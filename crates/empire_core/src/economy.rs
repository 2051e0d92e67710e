//! Planet economy.
//!
//! Pure per-planet calculations: what a planet produces, what it eats, how
//! it converts stock into production and what happens when food runs out.
//! The phase functions in [`crate::systems`] apply these to the game state.
//!
//! # Output per cycle
//!
//! Workers are the population split by the planet's allocation (floor
//! division, remainder to industry).
//!
//! | Resource | Formula |
//! |---|---|
//! | food | (food workers + farms × farm yield) × agriculture% |
//! | ore | (ore workers + mines × mine yield) × mining% |
//! | iridium | mines × iridium per mine |
//! | production | (industry workers + factories × factory yield) × industry%, zero while rioting |
//! | energy | factories × energy per factory + platforms × energy per platform |
//! | research | population / research divisor |
//!
//! # Shortfall
//!
//! Food need is `ceil(population × food_need_percent / 100)`. Planet stock
//! pays first, then the owner's empire stock. Each unit still missing kills
//! one population. A shortfall of at least `riot_threshold_percent` of the
//! need is a riot, which halts production on the next cycle.

use serde::{Deserialize, Serialize};

use crate::math::{apply_percent, div_ceil_u32};
use crate::planet::{Planet, PlanetOptions};
use crate::research::{ResearchCategory, ResearchState};
use crate::resources::{Resource, ResourceStock};
use crate::rules::Rules;

/// Population split into work groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Workers {
    /// Farming.
    pub food: u32,
    /// Mining.
    pub ore: u32,
    /// Industry.
    pub industry: u32,
}

/// Split a population by allocation.
#[must_use]
pub fn workers(population: u32, options: &PlanetOptions) -> Workers {
    let food = apply_percent(population, options.food_percent).min(population);
    let ore = apply_percent(population, options.ore_percent).min(population - food);
    Workers {
        food,
        ore,
        industry: population - food - ore,
    }
}

/// One cycle of a planet's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlanetOutput {
    /// Resources added to the planet stock.
    pub stock: ResourceStock,
    /// Production points for the build queue.
    pub production_points: u32,
}

/// Compute what a planet produces this cycle.
#[must_use]
pub fn planet_output(planet: &Planet, research: &ResearchState, rules: &Rules) -> PlanetOutput {
    if planet.population == 0 {
        return PlanetOutput::default();
    }
    let econ = &rules.economy;
    let crew = workers(planet.population, &planet.options);
    let built = &planet.improvements;

    let food = apply_percent(
        crew.food + built.farm * econ.farm_yield,
        research.multiplier(ResearchCategory::Agriculture, rules),
    );
    let ore = apply_percent(
        crew.ore + built.mine * econ.mine_yield,
        research.multiplier(ResearchCategory::Mining, rules),
    );
    let production_points = if planet.rioting {
        0
    } else {
        apply_percent(
            crew.industry + built.factory * econ.factory_yield,
            research.multiplier(ResearchCategory::Industry, rules),
        )
    };
    let energy =
        built.factory * econ.energy_per_factory + built.space_platform * econ.energy_per_platform;
    let research_points = planet.population.checked_div(econ.research_divisor).unwrap_or(0);

    PlanetOutput {
        stock: ResourceStock {
            food,
            energy,
            research: research_points,
            ore,
            iridium: built.mine * econ.iridium_per_mine,
        },
        production_points,
    }
}

/// Food a population eats per cycle.
#[must_use]
pub fn food_need(population: u32, rules: &Rules) -> u32 {
    let scaled = u64::from(population) * u64::from(rules.economy.food_need_percent);
    u32::try_from(scaled.div_ceil(100)).unwrap_or(u32::MAX)
}

/// Stock converted into production by auto-spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AutoSpend {
    /// Energy spent.
    pub energy: u32,
    /// Ore spent.
    pub ore: u32,
    /// Iridium spent.
    pub iridium: u32,
    /// Production points gained.
    pub points: u32,
}

impl AutoSpend {
    /// Stock removed, as a resource stock.
    #[must_use]
    pub fn as_stock(&self) -> ResourceStock {
        ResourceStock {
            energy: self.energy,
            ore: self.ore,
            iridium: self.iridium,
            ..ResourceStock::ZERO
        }
    }
}

/// Convert stock into up to `needed` production points.
///
/// Order is fixed: energy at 1:1, then ore at 1:1, then iridium at
/// `iridium_point_value` points each. Only what is needed is taken; the
/// last iridium may overshoot by less than one unit's worth. Returns `None`
/// when nothing was spent.
pub fn auto_spend(stock: &mut ResourceStock, needed: u32, rules: &Rules) -> Option<AutoSpend> {
    let mut spend = AutoSpend::default();
    let mut outstanding = needed;

    spend.energy = outstanding.min(stock.energy);
    outstanding -= spend.energy;

    spend.ore = outstanding.min(stock.ore);
    outstanding -= spend.ore;

    let value = rules.economy.iridium_point_value;
    if value > 0 {
        spend.iridium = div_ceil_u32(outstanding, value).min(stock.iridium);
    }

    spend.points = spend.energy + spend.ore + spend.iridium.saturating_mul(value);
    if spend.points == 0 {
        return None;
    }
    stock.withdraw(Resource::Energy, spend.energy);
    stock.withdraw(Resource::Ore, spend.ore);
    stock.withdraw(Resource::Iridium, spend.iridium);
    Some(spend)
}

/// What feeding did to a planet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedingOutcome {
    /// Need was met. `grown` population was added.
    Fed {
        /// Population added.
        grown: u32,
    },
    /// Mild shortfall.
    Starved {
        /// Food missing.
        shortfall: u32,
        /// Population lost.
        deaths: u32,
    },
    /// Severe shortfall; the planet riots.
    Rioted {
        /// Food missing.
        shortfall: u32,
        /// Population lost.
        deaths: u32,
    },
}

/// Result of [`feed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feeding {
    /// Outcome.
    pub outcome: FeedingOutcome,
    /// Food taken from the planet stock.
    pub eaten: u32,
    /// Food taken from the empire stock.
    pub relief: u32,
}

/// Feed a planet for one cycle, then grow or starve it.
pub fn feed(planet: &mut Planet, empire: &mut ResourceStock, rules: &Rules) -> Feeding {
    let econ = &rules.economy;
    let need = food_need(planet.population, rules);

    let from_planet = need - planet.stock.withdraw(Resource::Food, need);
    let after_planet = need - from_planet;
    let relief = after_planet - empire.withdraw(Resource::Food, after_planet);
    let shortfall = after_planet - relief;

    let outcome = if shortfall == 0 {
        planet.rioting = false;
        let grown = if planet.population > 0 && planet.stock.food > 0 {
            let step = apply_percent(planet.population, econ.growth_percent).max(1);
            let room = planet.max_population.saturating_sub(planet.population);
            step.min(room)
        } else {
            0
        };
        planet.population += grown;
        FeedingOutcome::Fed { grown }
    } else {
        let deaths = shortfall.min(planet.population);
        planet.population -= deaths;
        let severity = u64::from(shortfall) * 100 / u64::from(need.max(1));
        if severity >= u64::from(econ.riot_threshold_percent) {
            planet.rioting = true;
            FeedingOutcome::Rioted { shortfall, deaths }
        } else {
            FeedingOutcome::Starved { shortfall, deaths }
        }
    };

    Feeding {
        outcome,
        eaten: from_planet,
        relief,
    }
}

/// Move everything above `cap` out of a stock. Returns what was moved.
pub fn overflow(stock: &mut ResourceStock, cap: u32) -> ResourceStock {
    let mut excess = ResourceStock::ZERO;
    for resource in Resource::ALL {
        let held = stock.get(resource);
        if held > cap {
            excess.set(resource, held - cap);
            stock.set(resource, cap);
        }
    }
    excess
}

/// Per-planet stock movements for one cycle.
///
/// `closing == opening + produced - spent - consumed - overflowed` holds for
/// every planet on every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceLedger {
    /// Stock before the economy phase.
    pub opening: ResourceStock,
    /// Produced by the economy phase.
    pub produced: ResourceStock,
    /// Converted into production by auto-spend.
    pub spent: ResourceStock,
    /// Eaten food and drained research.
    pub consumed: ResourceStock,
    /// Moved to the owner's empire stock by the storage cap.
    pub overflowed: ResourceStock,
    /// Stock after the population phase.
    pub closing: ResourceStock,
}

impl ResourceLedger {
    /// Open a ledger.
    #[must_use]
    pub fn open(stock: ResourceStock) -> Self {
        Self {
            opening: stock,
            ..Self::default()
        }
    }

    /// Check that the closing stock is fully explained by the movements.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        Resource::ALL.iter().all(|&r| {
            let inflow = u64::from(self.opening.get(r)) + u64::from(self.produced.get(r));
            let outflow = u64::from(self.spent.get(r))
                + u64::from(self.consumed.get(r))
                + u64::from(self.overflowed.get(r));
            inflow.checked_sub(outflow) == Some(u64::from(self.closing.get(r)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::HexCoord;
    use crate::ids::{PlanetId, PlayerId};
    use crate::research::CategoryProgress;

    fn planet(population: u32) -> Planet {
        Planet::new(PlanetId(1), "Ceres", HexCoord::ORIGIN)
            .with_owner(PlayerId(1))
            .with_population(population)
    }

    #[test]
    fn test_workers_remainder_goes_to_industry() {
        let split = workers(11, &PlanetOptions::default());
        assert_eq!(split, Workers { food: 5, ore: 2, industry: 4 });
    }

    #[test]
    fn test_output_of_default_planet() {
        let rules = Rules::default();
        let mut p = planet(10);
        p.improvements.farm = 1;
        p.improvements.factory = 2;
        let out = planet_output(&p, &ResearchState::default(), &rules);
        assert_eq!(out.stock.food, 10);
        assert_eq!(out.stock.ore, 2);
        assert_eq!(out.stock.energy, 4);
        assert_eq!(out.stock.research, 2);
        assert_eq!(out.production_points, 11);

        p.rioting = true;
        assert_eq!(planet_output(&p, &ResearchState::default(), &rules).production_points, 0);
    }

    #[test]
    fn test_research_multiplies_output() {
        let rules = Rules::default();
        let mut research = ResearchState::default();
        research.categories.insert(
            ResearchCategory::Agriculture,
            CategoryProgress { points: 0, level: 5 },
        );
        let out = planet_output(&planet(20), &research, &rules);
        // 10 workers at 150%
        assert_eq!(out.stock.food, 15);
    }

    #[test]
    fn test_food_need_rounds_up() {
        let rules = Rules::default();
        assert_eq!(food_need(10, &rules), 8);
        assert_eq!(food_need(11, &rules), 9);
        assert_eq!(food_need(0, &rules), 0);
    }

    #[test]
    fn test_auto_spend_priority() {
        let rules = Rules::default();
        let mut stock = ResourceStock {
            energy: 3,
            ore: 2,
            iridium: 10,
            ..ResourceStock::ZERO
        };
        let spend = auto_spend(&mut stock, 10, &rules).unwrap();
        assert_eq!(
            spend,
            AutoSpend { energy: 3, ore: 2, iridium: 3, points: 11 }
        );
        assert_eq!(stock.iridium, 7);
        assert_eq!(stock.energy, 0);

        let mut empty = ResourceStock::ZERO;
        assert!(auto_spend(&mut empty, 5, &rules).is_none());
    }

    #[test]
    fn test_starvation_scenario() {
        let rules = Rules::default();
        let mut p = planet(10);
        p.stock.food = 5;
        let mut empire = ResourceStock::ZERO;
        let feeding = feed(&mut p, &mut empire, &rules);
        assert_eq!(
            feeding.outcome,
            FeedingOutcome::Starved { shortfall: 3, deaths: 3 }
        );
        assert_eq!(feeding.eaten, 5);
        assert_eq!(p.population, 7);
        assert!(!p.rioting);
    }

    #[test]
    fn test_severe_shortage_riots_and_never_goes_negative() {
        let rules = Rules::default();
        let mut p = planet(3);
        let mut empire = ResourceStock::ZERO;
        let feeding = feed(&mut p, &mut empire, &rules);
        assert_eq!(
            feeding.outcome,
            FeedingOutcome::Rioted { shortfall: 3, deaths: 3 }
        );
        assert_eq!(p.population, 0);
        assert!(p.rioting);
    }

    #[test]
    fn test_empire_stock_relieves_famine() {
        let rules = Rules::default();
        let mut p = planet(10);
        p.stock.food = 2;
        let mut empire = ResourceStock::of(Resource::Food, 100);
        let feeding = feed(&mut p, &mut empire, &rules);
        assert_eq!(feeding.relief, 6);
        assert_eq!(empire.food, 94);
        // nothing left in stock, so no growth either
        assert_eq!(feeding.outcome, FeedingOutcome::Fed { grown: 0 });
    }

    #[test]
    fn test_growth_when_surplus() {
        let rules = Rules::default();
        let mut p = planet(40);
        p.max_population = 41;
        p.stock.food = 100;
        let mut empire = ResourceStock::ZERO;
        let feeding = feed(&mut p, &mut empire, &rules);
        // 5% of 40 is 2, capped by room
        assert_eq!(feeding.outcome, FeedingOutcome::Fed { grown: 1 });
        assert_eq!(p.population, 41);
    }

    #[test]
    fn test_overflow_caps_every_resource() {
        let mut stock = ResourceStock {
            food: 620,
            ore: 500,
            iridium: 501,
            ..ResourceStock::ZERO
        };
        let excess = overflow(&mut stock, 500);
        assert_eq!(excess.food, 120);
        assert_eq!(excess.ore, 0);
        assert_eq!(excess.iridium, 1);
        assert_eq!(stock.food, 500);
    }

    #[test]
    fn test_ledger_balance() {
        let mut ledger = ResourceLedger::open(ResourceStock::of(Resource::Food, 10));
        ledger.produced.food = 5;
        ledger.consumed.food = 8;
        ledger.closing.food = 7;
        assert!(ledger.is_balanced());
        ledger.closing.food = 8;
        assert!(!ledger.is_balanced());
    }
}
