//! Research categories, allocations and level progression.
//!
//! Each player splits their research rate over six categories by percent.
//! Levels raise stats elsewhere through [`Rules::level_multiplier`]:
//! agriculture, mining and industry scale planet output; weapons and shields
//! scale combat strength; propulsion scales fleet speed.
//!
//! A queued research item overrides the split: while any item is queued the
//! whole rate goes to the head item's category until it reaches its target.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ActionError;
use crate::math::apply_percent;
use crate::rules::Rules;

/// Research categories.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ResearchCategory {
    /// Food output.
    Agriculture,
    /// Ore output.
    Mining,
    /// Production points.
    Industry,
    /// Attack in combat.
    Weapons,
    /// Defense in combat.
    Shields,
    /// Fleet speed.
    Propulsion,
}

impl ResearchCategory {
    /// All categories in canonical order.
    pub const ALL: [Self; 6] = [
        Self::Agriculture,
        Self::Mining,
        Self::Industry,
        Self::Weapons,
        Self::Shields,
        Self::Propulsion,
    ];
}

/// Percent split of research over categories. Must sum to 100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawAllocation")]
pub struct ResearchAllocation(BTreeMap<ResearchCategory, u32>);

#[derive(Deserialize)]
struct RawAllocation(BTreeMap<ResearchCategory, u32>);

impl From<RawAllocation> for ResearchAllocation {
    fn from(raw: RawAllocation) -> Self {
        Self::from_pairs(raw.0)
    }
}

impl Default for ResearchAllocation {
    fn default() -> Self {
        Self::from_pairs([
            (ResearchCategory::Agriculture, 20),
            (ResearchCategory::Mining, 20),
            (ResearchCategory::Industry, 20),
            (ResearchCategory::Weapons, 20),
            (ResearchCategory::Shields, 10),
            (ResearchCategory::Propulsion, 10),
        ])
    }
}

impl ResearchAllocation {
    /// Build from `(category, percent)` pairs. Zero entries are dropped.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (ResearchCategory, u32)>) -> Self {
        let mut map = BTreeMap::new();
        for (category, percent) in pairs {
            if percent > 0 {
                let entry = map.entry(category).or_insert(0u32);
                *entry = entry.saturating_add(percent);
            }
        }
        Self(map)
    }

    /// Percent assigned to a category.
    #[must_use]
    pub fn get(&self, category: ResearchCategory) -> u32 {
        self.0.get(&category).copied().unwrap_or(0)
    }

    /// Non-zero shares in category order.
    pub fn iter(&self) -> impl Iterator<Item = (ResearchCategory, u32)> + '_ {
        self.0.iter().map(|(category, percent)| (*category, *percent))
    }

    /// Sum of all percentages.
    #[must_use]
    pub fn sum(&self) -> u32 {
        self.0.values().fold(0u32, |acc, p| acc.saturating_add(*p))
    }

    /// Check that the percentages sum to exactly 100.
    pub fn validate(&self) -> Result<(), ActionError> {
        match self.sum() {
            100 => Ok(()),
            other => Err(ActionError::InvalidAllocation(other)),
        }
    }
}

/// Accumulated points and reached level of one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryProgress {
    /// Points toward the next level.
    pub points: u32,
    /// Current level.
    pub level: u32,
}

/// A queued research goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchItem {
    /// Category to raise.
    pub category: ResearchCategory,
    /// Level at which the item completes.
    pub target_level: u32,
}

/// Something that happened while accruing research.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchEvent {
    /// A category reached a new level.
    LevelUp {
        /// Category.
        category: ResearchCategory,
        /// New level.
        level: u32,
    },
    /// A queued item reached its target.
    ItemCompleted {
        /// Category.
        category: ResearchCategory,
        /// Target reached.
        level: u32,
    },
}

/// A player's research standing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResearchState {
    /// Progress per category. Missing categories are at level 0.
    pub categories: BTreeMap<ResearchCategory, CategoryProgress>,
    /// Percent split used when no item is queued.
    pub allocation: ResearchAllocation,
    /// Queued items, head first. At most one per category.
    pub items: Vec<ResearchItem>,
}

impl ResearchState {
    /// Level reached in a category.
    #[must_use]
    pub fn level(&self, category: ResearchCategory) -> u32 {
        self.categories.get(&category).map_or(0, |p| p.level)
    }

    /// Stat multiplier in percent granted by a category.
    #[must_use]
    pub fn multiplier(&self, category: ResearchCategory, rules: &Rules) -> u32 {
        rules.level_multiplier(self.level(category))
    }

    /// Replace the allocation after validating it.
    pub fn set_allocation(&mut self, allocation: ResearchAllocation) -> Result<(), ActionError> {
        allocation.validate()?;
        self.allocation = allocation;
        Ok(())
    }

    /// Queue a research item.
    pub fn queue_item(&mut self, item: ResearchItem) -> Result<(), ActionError> {
        let current = self.level(item.category);
        if item.target_level <= current {
            return Err(ActionError::ResearchTargetReached(current));
        }
        if self.items.iter().any(|i| i.category == item.category) {
            return Err(ActionError::DuplicateResearchItem);
        }
        self.items.push(item);
        Ok(())
    }

    /// Remove the queued item for a category. Accumulated points are kept.
    pub fn cancel_item(&mut self, category: ResearchCategory) -> Result<ResearchItem, ActionError> {
        let index = self
            .items
            .iter()
            .position(|i| i.category == category)
            .ok_or(ActionError::UnknownResearchItem)?;
        Ok(self.items.remove(index))
    }

    /// Points needed to go from `level` to `level + 1`.
    #[must_use]
    pub fn level_cost(level: u32, rules: &Rules) -> u32 {
        rules
            .research
            .base_cost
            .max(1)
            .saturating_mul(level.saturating_add(1))
    }

    /// Spend one cycle's research rate.
    pub fn accrue(&mut self, rate: u32, rules: &Rules) -> Vec<ResearchEvent> {
        let mut events = Vec::new();
        if rate == 0 {
            return events;
        }

        match self.items.first() {
            Some(head) => {
                let category = head.category;
                self.add_points(category, rate, rules, &mut events);
            }
            None => {
                for category in ResearchCategory::ALL {
                    let points = apply_percent(rate, self.allocation.get(category));
                    if points > 0 {
                        self.add_points(category, points, rules, &mut events);
                    }
                }
            }
        }

        let mut remaining = Vec::with_capacity(self.items.len());
        for item in std::mem::take(&mut self.items) {
            if self.level(item.category) >= item.target_level {
                events.push(ResearchEvent::ItemCompleted {
                    category: item.category,
                    level: item.target_level,
                });
            } else {
                remaining.push(item);
            }
        }
        self.items = remaining;

        events
    }

    fn add_points(
        &mut self,
        category: ResearchCategory,
        points: u32,
        rules: &Rules,
        events: &mut Vec<ResearchEvent>,
    ) {
        let progress = self.categories.entry(category).or_default();
        progress.points = progress.points.saturating_add(points);
        loop {
            let cost = Self::level_cost(progress.level, rules);
            if progress.points < cost {
                break;
            }
            progress.points -= cost;
            progress.level += 1;
            events.push(ResearchEvent::LevelUp {
                category,
                level: progress.level,
            });
        }
    }
}
