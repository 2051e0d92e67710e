//! Starship types and fleet compositions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Every buildable starship hull.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ShipType {
    /// Fast, nearly unarmed.
    Scout,
    /// Cheap line ship.
    Fighter,
    /// Balanced escort.
    Frigate,
    /// Heavier escort.
    Destroyer,
    /// Main line ship.
    Cruiser,
    /// Slow capital ship.
    Battleship,
    /// Unarmed; settles captured planets that have no population left.
    ColonyShip,
}

impl ShipType {
    /// All ship types in canonical order.
    pub const ALL: [Self; 7] = [
        Self::Scout,
        Self::Fighter,
        Self::Frigate,
        Self::Destroyer,
        Self::Cruiser,
        Self::Battleship,
        Self::ColonyShip,
    ];
}

/// Base statistics for one ship type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipStats {
    /// Production points to build.
    pub cost: u32,
    /// Attack contribution per ship.
    pub attack: u32,
    /// Defense contribution per ship.
    pub defense: u32,
    /// Hex units travelled per cycle.
    pub speed: u32,
}

impl ShipStats {
    /// Built-in stats used when the ruleset does not override a type.
    #[must_use]
    pub const fn builtin(ship: ShipType) -> Self {
        let (cost, attack, defense, speed) = match ship {
            ShipType::Scout => (6, 1, 1, 4),
            ShipType::Fighter => (10, 3, 2, 3),
            ShipType::Frigate => (16, 4, 4, 3),
            ShipType::Destroyer => (24, 6, 5, 2),
            ShipType::Cruiser => (40, 9, 9, 2),
            ShipType::Battleship => (70, 16, 16, 1),
            ShipType::ColonyShip => (30, 0, 1, 1),
        };
        Self {
            cost,
            attack,
            defense,
            speed,
        }
    }
}

/// Ship counts per type.
///
/// Zero counts are never stored, so two compositions with the same ships
/// always serialize identically. Zero entries in incoming payloads are
/// dropped while deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RawShipCounts")]
pub struct ShipCounts(BTreeMap<ShipType, u32>);

/// Wire shape of [`ShipCounts`] before zero entries are dropped.
#[derive(Deserialize)]
struct RawShipCounts(BTreeMap<ShipType, u32>);

impl From<RawShipCounts> for ShipCounts {
    fn from(raw: RawShipCounts) -> Self {
        raw.0.into_iter().collect()
    }
}

impl ShipCounts {
    /// Empty composition.
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Composition holding `count` ships of one type.
    #[must_use]
    pub fn of(ship: ShipType, count: u32) -> Self {
        let mut counts = Self::new();
        counts.add(ship, count);
        counts
    }

    /// Builder: add ships of a type.
    #[must_use]
    pub fn with(mut self, ship: ShipType, count: u32) -> Self {
        self.add(ship, count);
        self
    }

    /// Number of ships of one type.
    #[must_use]
    pub fn get(&self, ship: ShipType) -> u32 {
        self.0.get(&ship).copied().unwrap_or(0)
    }

    /// Add ships of one type.
    pub fn add(&mut self, ship: ShipType, count: u32) {
        if count == 0 {
            return;
        }
        let entry = self.0.entry(ship).or_insert(0);
        *entry = entry.saturating_add(count);
    }

    /// Remove up to `count` ships of one type. Returns how many were removed.
    pub fn remove(&mut self, ship: ShipType, count: u32) -> u32 {
        let held = self.get(ship);
        let removed = held.min(count);
        if held - removed == 0 {
            self.0.remove(&ship);
        } else {
            self.0.insert(ship, held - removed);
        }
        removed
    }

    /// Add every ship of another composition.
    pub fn merge(&mut self, other: &Self) {
        for (ship, count) in other.iter() {
            self.add(ship, count);
        }
    }

    /// Check that every count in `other` is available here.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        other.iter().all(|(ship, count)| self.get(ship) >= count)
    }

    /// Remove every ship of `other`. Returns `false` (and changes nothing)
    /// if any count is not available.
    pub fn subtract(&mut self, other: &Self) -> bool {
        if !self.contains(other) {
            return false;
        }
        for (ship, count) in other.iter() {
            self.remove(ship, count);
        }
        true
    }

    /// Iterate non-zero counts in type order.
    pub fn iter(&self) -> impl Iterator<Item = (ShipType, u32)> + '_ {
        self.0.iter().map(|(&ship, &count)| (ship, count))
    }

    /// Total number of ships.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().map(|&c| u64::from(c)).sum()
    }

    /// Check if there are no ships.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether every stored count is non-zero.
    #[must_use]
    pub fn is_normalized(&self) -> bool {
        self.0.values().all(|&count| count > 0)
    }

    #[cfg(test)]
    pub(crate) fn from_raw(map: BTreeMap<ShipType, u32>) -> Self {
        Self(map)
    }
}

impl FromIterator<(ShipType, u32)> for ShipCounts {
    fn from_iter<I: IntoIterator<Item = (ShipType, u32)>>(iter: I) -> Self {
        let mut counts = Self::new();
        for (ship, count) in iter {
            counts.add(ship, count);
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_counts_are_not_stored() {
        let mut counts = ShipCounts::of(ShipType::Fighter, 0);
        assert!(counts.is_empty());

        counts.add(ShipType::Cruiser, 2);
        assert_eq!(counts.remove(ShipType::Cruiser, 5), 2);
        assert!(counts.is_empty());
        assert_eq!(counts, ShipCounts::new());
    }

    #[test]
    fn test_subtract_is_atomic() {
        let mut counts = ShipCounts::of(ShipType::Fighter, 3).with(ShipType::Scout, 1);
        let request = ShipCounts::of(ShipType::Fighter, 2).with(ShipType::Scout, 2);
        assert!(!counts.subtract(&request));
        assert_eq!(counts.total(), 4);

        let request = ShipCounts::of(ShipType::Fighter, 2);
        assert!(counts.subtract(&request));
        assert_eq!(counts.get(ShipType::Fighter), 1);
    }

    #[test]
    fn test_zero_entries_dropped_on_deserialize() {
        let counts: ShipCounts = serde_json::from_str(r#"{"Frigate":0,"Scout":2}"#).unwrap();
        assert_eq!(counts, ShipCounts::of(ShipType::Scout, 2));
        assert!(counts.is_normalized());

        let ghost: ShipCounts = serde_json::from_str(r#"{"Frigate":0}"#).unwrap();
        assert!(ghost.is_empty());
    }

    #[test]
    fn test_ron_shape_is_unchanged() {
        let counts = ShipCounts::of(ShipType::Cruiser, 3);
        let text = ron::to_string(&counts).unwrap();
        let back: ShipCounts = ron::from_str(&text).unwrap();
        assert_eq!(back, counts);
    }

    #[test]
    fn test_construction_order_does_not_matter() {
        let a = ShipCounts::of(ShipType::Scout, 1).with(ShipType::Battleship, 2);
        let b = ShipCounts::of(ShipType::Battleship, 2).with(ShipType::Scout, 1);
        assert_eq!(a, b);
    }
}
