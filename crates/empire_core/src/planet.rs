//! Planets, their improvements and player-set options.

use serde::{Deserialize, Serialize};

use crate::error::ActionError;
use crate::hex::HexCoord;
use crate::ids::{PlanetId, PlayerId};
use crate::production::BuildQueue;
use crate::resources::ResourceStock;

/// Permanent planetary improvements.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ImprovementType {
    /// Raises food output.
    Farm,
    /// Raises ore and iridium output.
    Mine,
    /// Raises production points and energy.
    Factory,
    /// Orbital defense and energy.
    SpacePlatform,
}

impl ImprovementType {
    /// All improvement types in canonical order.
    pub const ALL: [Self; 4] = [Self::Farm, Self::Mine, Self::Factory, Self::SpacePlatform];

    /// Built-in production cost.
    #[must_use]
    pub const fn builtin_cost(self) -> u32 {
        match self {
            Self::Farm => 10,
            Self::Mine => 12,
            Self::Factory => 15,
            Self::SpacePlatform => 25,
        }
    }
}

/// Built improvement counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Improvements {
    /// Farms.
    pub farm: u32,
    /// Mines.
    pub mine: u32,
    /// Factories.
    pub factory: u32,
    /// Space platforms.
    pub space_platform: u32,
}

impl Improvements {
    /// Count of one improvement type.
    #[must_use]
    pub const fn get(&self, improvement: ImprovementType) -> u32 {
        match improvement {
            ImprovementType::Farm => self.farm,
            ImprovementType::Mine => self.mine,
            ImprovementType::Factory => self.factory,
            ImprovementType::SpacePlatform => self.space_platform,
        }
    }

    fn slot(&mut self, improvement: ImprovementType) -> &mut u32 {
        match improvement {
            ImprovementType::Farm => &mut self.farm,
            ImprovementType::Mine => &mut self.mine,
            ImprovementType::Factory => &mut self.factory,
            ImprovementType::SpacePlatform => &mut self.space_platform,
        }
    }

    /// Add one built improvement.
    pub fn increment(&mut self, improvement: ImprovementType) {
        let slot = self.slot(improvement);
        *slot = slot.saturating_add(1);
    }

    /// Remove one built improvement. Returns `false` if there was none.
    pub fn decrement(&mut self, improvement: ImprovementType) -> bool {
        let slot = self.slot(improvement);
        if *slot == 0 {
            false
        } else {
            *slot -= 1;
            true
        }
    }

    /// Total built improvements.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.farm + self.mine + self.factory + self.space_platform
    }
}

/// How a planet's workers are split and whether stock may be auto-spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanetOptions {
    /// Share of workers farming, in percent.
    pub food_percent: u32,
    /// Share of workers mining, in percent.
    pub ore_percent: u32,
    /// Share of workers in industry, in percent.
    pub industry_percent: u32,
    /// Convert stocked resources into production when the head item needs it.
    pub auto_spend: bool,
}

impl Default for PlanetOptions {
    fn default() -> Self {
        Self {
            food_percent: 50,
            ore_percent: 20,
            industry_percent: 30,
            auto_spend: false,
        }
    }
}

impl PlanetOptions {
    /// Check that the three percentages sum to exactly 100.
    ///
    /// Invalid allocations are rejected at the action boundary, never clamped.
    pub fn validate(&self) -> Result<(), ActionError> {
        let sum = u64::from(self.food_percent)
            + u64::from(self.ore_percent)
            + u64::from(self.industry_percent);
        if sum == 100 {
            Ok(())
        } else {
            Err(ActionError::InvalidAllocation(
                u32::try_from(sum).unwrap_or(u32::MAX),
            ))
        }
    }
}

/// A planet. Created at game start and never removed; only ownership,
/// population and holdings change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Planet {
    /// Unique identifier.
    pub id: PlanetId,
    /// Display name.
    pub name: String,
    /// Cell the planet sits in.
    pub hex: HexCoord,
    /// Owning player; `None` means neutral.
    pub owner: Option<PlayerId>,
    /// Current population.
    pub population: u32,
    /// Population cap for growth.
    pub max_population: u32,
    /// Stocked resources.
    pub stock: ResourceStock,
    /// Built improvements.
    pub improvements: Improvements,
    /// Total improvements the planet can hold (built plus queued).
    pub improvement_slots: u32,
    /// Ordered build queue.
    pub build_queue: BuildQueue,
    /// Worker allocation and auto-spend switch.
    pub options: PlanetOptions,
    /// Set by a riot; halts production for the next cycle.
    pub rioting: bool,
}

impl Planet {
    /// Create a neutral planet with default options.
    #[must_use]
    pub fn new(id: PlanetId, name: impl Into<String>, hex: HexCoord) -> Self {
        Self {
            id,
            name: name.into(),
            hex,
            owner: None,
            population: 0,
            max_population: 100,
            stock: ResourceStock::ZERO,
            improvements: Improvements::default(),
            improvement_slots: 8,
            build_queue: BuildQueue::new(),
            options: PlanetOptions::default(),
            rioting: false,
        }
    }

    /// Builder: set owner.
    #[must_use]
    pub fn with_owner(mut self, owner: PlayerId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Builder: set population.
    #[must_use]
    pub fn with_population(mut self, population: u32) -> Self {
        self.population = population;
        self.max_population = self.max_population.max(population);
        self
    }

    /// Check whether a player owns this planet.
    #[must_use]
    pub fn is_owned_by(&self, player: PlayerId) -> bool {
        self.owner == Some(player)
    }

    /// Improvement slots still free after counting built and queued ones.
    #[must_use]
    pub fn free_improvement_slots(&self) -> u32 {
        let used = self.improvements.total() + self.build_queue.queued_improvements();
        self.improvement_slots.saturating_sub(used)
    }

    /// Drop ownership and everything tied to it.
    ///
    /// The build queue is cleared (items are removed by planet loss) and any
    /// riot ends with the old regime.
    pub fn revert_to_neutral(&mut self) {
        self.owner = None;
        self.build_queue.clear();
        self.rioting = false;
    }

    /// Hand the planet to a new owner, clearing the old owner's queue.
    pub fn transfer_to(&mut self, owner: PlayerId) {
        self.owner = Some(owner);
        self.build_queue.clear();
        self.rioting = false;
    }
}
