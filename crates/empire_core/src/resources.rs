//! Resource kinds and stockpiles.
//!
//! Stocks are unsigned and never go negative: withdrawing more than is held
//! is reported as a shortfall, which the economy turns into starvation or
//! riots rather than a negative balance.

use serde::{Deserialize, Serialize};

/// The five resources of the economy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Resource {
    /// Feeds population.
    Food,
    /// Industrial power; first in line for auto-spend.
    Energy,
    /// Drained into the owner's research each cycle.
    Research,
    /// Mined bulk material.
    Ore,
    /// Rare mined material.
    Iridium,
}

impl Resource {
    /// All resources in canonical order.
    pub const ALL: [Self; 5] = [
        Self::Food,
        Self::Energy,
        Self::Research,
        Self::Ore,
        Self::Iridium,
    ];
}

/// A stockpile of every resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceStock {
    /// Food units.
    pub food: u32,
    /// Energy units.
    pub energy: u32,
    /// Research units.
    pub research: u32,
    /// Ore units.
    pub ore: u32,
    /// Iridium units.
    pub iridium: u32,
}

impl ResourceStock {
    /// Empty stock.
    pub const ZERO: Self = Self {
        food: 0,
        energy: 0,
        research: 0,
        ore: 0,
        iridium: 0,
    };

    /// Stock holding a single resource.
    #[must_use]
    pub fn of(resource: Resource, amount: u32) -> Self {
        let mut stock = Self::ZERO;
        stock.set(resource, amount);
        stock
    }

    /// Amount held of one resource.
    #[must_use]
    pub const fn get(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Food => self.food,
            Resource::Energy => self.energy,
            Resource::Research => self.research,
            Resource::Ore => self.ore,
            Resource::Iridium => self.iridium,
        }
    }

    fn slot(&mut self, resource: Resource) -> &mut u32 {
        match resource {
            Resource::Food => &mut self.food,
            Resource::Energy => &mut self.energy,
            Resource::Research => &mut self.research,
            Resource::Ore => &mut self.ore,
            Resource::Iridium => &mut self.iridium,
        }
    }

    /// Overwrite the amount of one resource.
    pub fn set(&mut self, resource: Resource, amount: u32) {
        *self.slot(resource) = amount;
    }

    /// Add to one resource.
    pub fn add(&mut self, resource: Resource, amount: u32) {
        let slot = self.slot(resource);
        *slot = slot.saturating_add(amount);
    }

    /// Remove up to `amount` of one resource.
    ///
    /// Returns the shortfall: how much of the request could not be covered.
    pub fn withdraw(&mut self, resource: Resource, amount: u32) -> u32 {
        let slot = self.slot(resource);
        let taken = amount.min(*slot);
        *slot -= taken;
        amount - taken
    }

    /// Remove exactly `amount`, or nothing if not enough is held.
    pub fn try_spend(&mut self, resource: Resource, amount: u32) -> bool {
        if self.get(resource) >= amount {
            *self.slot(resource) -= amount;
            true
        } else {
            false
        }
    }

    /// Add every resource of another stock.
    pub fn deposit(&mut self, other: &Self) {
        for resource in Resource::ALL {
            self.add(resource, other.get(resource));
        }
    }

    /// Sum of all resources.
    #[must_use]
    pub fn total(&self) -> u64 {
        Resource::ALL
            .iter()
            .map(|&r| u64::from(self.get(r)))
            .sum()
    }

    /// Check if nothing is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
