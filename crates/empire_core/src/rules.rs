//! Data-driven ruleset.
//!
//! All balance numbers live here so a game can be configured from a RON
//! file. Every participant in a session must run with the same `Rules`;
//! [`Rules::fingerprint`] gives a cheap way to confirm that.
//!
//! # Example RON
//!
//! ```ron
//! Rules(
//!     max_queue_length: 8,
//!     trade_expiry_cycles: 3,
//!     ships: { Fighter: (cost: 12, attack: 3, defense: 2, speed: 3) },
//! )
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::planet::ImprovementType;
use crate::ships::{ShipStats, ShipType};

/// Economy constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyRules {
    /// Food per farm per cycle.
    pub farm_yield: u32,
    /// Ore per mine per cycle.
    pub mine_yield: u32,
    /// Iridium per mine per cycle.
    pub iridium_per_mine: u32,
    /// Production points per factory per cycle.
    pub factory_yield: u32,
    /// Energy per factory per cycle.
    pub energy_per_factory: u32,
    /// Energy per space platform per cycle.
    pub energy_per_platform: u32,
    /// One research point per this many population.
    pub research_divisor: u32,
    /// Food needed per 100 population.
    pub food_need_percent: u32,
    /// Shortfall share of need (percent) at which starvation becomes a riot.
    pub riot_threshold_percent: u32,
    /// Population growth per cycle when fed, in percent.
    pub growth_percent: u32,
    /// Per-resource planet storage; anything above overflows to the empire.
    pub planet_storage_cap: u32,
    /// Production points gained per iridium when auto-spending.
    pub iridium_point_value: u32,
}

impl Default for EconomyRules {
    fn default() -> Self {
        Self {
            farm_yield: 5,
            mine_yield: 3,
            iridium_per_mine: 1,
            factory_yield: 4,
            energy_per_factory: 2,
            energy_per_platform: 1,
            research_divisor: 5,
            food_need_percent: 80,
            riot_threshold_percent: 50,
            growth_percent: 5,
            planet_storage_cap: 500,
            iridium_point_value: 2,
        }
    }
}

/// Combat constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatRules {
    /// Defense strength contributed by each space platform.
    pub platform_defense: u32,
    /// Share of population that survives a capture, in percent.
    pub capture_retention_percent: u32,
    /// Population landed by one colony ship.
    pub colony_population: u32,
}

impl Default for CombatRules {
    fn default() -> Self {
        Self {
            platform_defense: 10,
            capture_retention_percent: 50,
            colony_population: 5,
        }
    }
}

/// Research constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchRules {
    /// Points for level 1; level `n + 1` costs `base_cost * (n + 1)`.
    pub base_cost: u32,
    /// Stat bonus per level, in percent.
    pub level_bonus_percent: u32,
}

impl Default for ResearchRules {
    fn default() -> Self {
        Self {
            base_cost: 20,
            level_bonus_percent: 10,
        }
    }
}

/// Complete ruleset for a game session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    /// Ship stat overrides; missing types use [`ShipStats::builtin`].
    pub ships: BTreeMap<ShipType, ShipStats>,
    /// Improvement cost overrides; missing types use the built-in cost.
    pub improvement_costs: BTreeMap<ImprovementType, u32>,
    /// Economy constants.
    pub economy: EconomyRules,
    /// Combat constants.
    pub combat: CombatRules,
    /// Research constants.
    pub research: ResearchRules,
    /// Maximum items in one planet's build queue.
    pub max_queue_length: usize,
    /// Cycles an unmatched trade offer stays open.
    pub trade_expiry_cycles: u64,
    /// Optional hard limit on game length.
    pub max_cycles: Option<u64>,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            ships: BTreeMap::new(),
            improvement_costs: BTreeMap::new(),
            economy: EconomyRules::default(),
            combat: CombatRules::default(),
            research: ResearchRules::default(),
            max_queue_length: 10,
            trade_expiry_cycles: 5,
            max_cycles: None,
        }
    }
}

impl Rules {
    /// Stats for a ship type.
    #[must_use]
    pub fn ship(&self, ship: ShipType) -> ShipStats {
        self.ships
            .get(&ship)
            .copied()
            .unwrap_or_else(|| ShipStats::builtin(ship))
    }

    /// Production cost of an improvement.
    #[must_use]
    pub fn improvement_cost(&self, improvement: ImprovementType) -> u32 {
        self.improvement_costs
            .get(&improvement)
            .copied()
            .unwrap_or_else(|| improvement.builtin_cost())
    }

    /// Stat multiplier in percent for a research level.
    #[must_use]
    pub fn level_multiplier(&self, level: u32) -> u32 {
        100u32.saturating_add(level.saturating_mul(self.research.level_bonus_percent))
    }

    /// Parse rules from RON text.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| GameError::DataParseError {
            path: "<rules>".to_string(),
            message: e.to_string(),
        })
    }

    /// Load rules from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        ron::from_str(&source).map_err(|e| GameError::DataParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Checksum of the canonical form of these rules.
    pub fn fingerprint(&self) -> Result<String> {
        crate::canonical::checksum(self).map(|c| c.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_fallbacks() {
        let rules = Rules::default();
        assert_eq!(rules.ship(ShipType::Cruiser), ShipStats::builtin(ShipType::Cruiser));
        assert_eq!(rules.improvement_cost(ImprovementType::Farm), 10);
        assert_eq!(rules.level_multiplier(0), 100);
        assert_eq!(rules.level_multiplier(3), 130);
    }

    #[test]
    fn test_partial_ron_override() {
        let rules = Rules::from_ron_str(
            "(max_queue_length: 4, ships: { Fighter: (cost: 12, attack: 5, defense: 2, speed: 3) }, economy: (farm_yield: 7))",
        )
        .unwrap();
        assert_eq!(rules.max_queue_length, 4);
        assert_eq!(rules.ship(ShipType::Fighter).attack, 5);
        assert_eq!(rules.ship(ShipType::Scout), ShipStats::builtin(ShipType::Scout));
        assert_eq!(rules.economy.farm_yield, 7);
        assert_eq!(rules.economy.mine_yield, 3);
        assert_eq!(rules.trade_expiry_cycles, 5);
    }

    #[test]
    fn test_bad_ron_is_a_parse_error() {
        let err = Rules::from_ron_str("(max_queue_length: \"many\")").unwrap_err();
        assert!(matches!(err, GameError::DataParseError { .. }));
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = Rules::default();
        let mut b = Rules::default();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        b.trade_expiry_cycles = 9;
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }
}
