//! Fleets and fleet travel.
//!
//! A fleet is either stationary (no destination, sitting at `origin`) or
//! travelling from `origin` toward `destination`. Travel is measured as
//! Euclidean distance between hex midpoints in fixed-point, and each cycle a
//! travelling fleet covers its speed: the slowest ship's speed scaled by the
//! owner's propulsion research.
//!
//! A fleet that has been given a destination but not yet moved
//! (`remaining == total`) has not departed and can still be recalled.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ActionError;
use crate::hex::{Galaxy, HexCoord};
use crate::ids::{FleetId, PlayerId};
use crate::math::{ceil_div_fixed, fixed_serde, Fixed};
use crate::notification::{NotificationKind, NotificationLog};
use crate::rules::Rules;
use crate::ships::{ShipCounts, ShipType};

/// A group of ships moving or standing together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fleet {
    /// Unique identifier.
    pub id: FleetId,
    /// Owning player.
    pub owner: PlayerId,
    /// Ship composition. Never empty for a fleet in the registry.
    pub ships: ShipCounts,
    /// Departure hex, or position when stationary.
    pub origin: HexCoord,
    /// Target hex while travelling.
    pub destination: Option<HexCoord>,
    /// Distance from origin to destination.
    #[serde(with = "fixed_serde")]
    pub total_distance: Fixed,
    /// Distance still to cover.
    #[serde(with = "fixed_serde")]
    pub remaining_distance: Fixed,
}

impl Fleet {
    /// A fleet standing at `at`.
    #[must_use]
    pub fn stationary(id: FleetId, owner: PlayerId, ships: ShipCounts, at: HexCoord) -> Self {
        Self {
            id,
            owner,
            ships,
            origin: at,
            destination: None,
            total_distance: Fixed::ZERO,
            remaining_distance: Fixed::ZERO,
        }
    }

    /// Check if the fleet has no destination.
    #[must_use]
    pub const fn is_stationary(&self) -> bool {
        self.destination.is_none()
    }

    /// Check if the fleet has left its origin.
    #[must_use]
    pub fn has_departed(&self) -> bool {
        self.destination.is_some() && self.remaining_distance < self.total_distance
    }

    /// Position of a stationary fleet.
    #[must_use]
    pub fn position(&self) -> Option<HexCoord> {
        self.is_stationary().then_some(self.origin)
    }

    /// Slowest ship speed in the fleet, before research.
    #[must_use]
    pub fn min_ship_speed(&self, rules: &Rules) -> u32 {
        self.ships
            .iter()
            .map(|(ship, _)| rules.ship(ship).speed)
            .min()
            .unwrap_or(0)
    }

    /// Hex units covered per cycle at a given propulsion level.
    #[must_use]
    pub fn speed(&self, rules: &Rules, propulsion_level: u32) -> Fixed {
        let base = Fixed::from_num(self.min_ship_speed(rules));
        let percent = Fixed::from_num(rules.level_multiplier(propulsion_level));
        base * percent / Fixed::from_num(100)
    }

    /// Cycles until arrival at `speed`; `None` if the fleet cannot move.
    #[must_use]
    pub fn eta(&self, speed: Fixed) -> Option<u32> {
        if self.is_stationary() {
            return Some(0);
        }
        if speed <= Fixed::ZERO {
            return None;
        }
        Some(ceil_div_fixed(self.remaining_distance, speed))
    }

    /// Point the fleet at a new destination from where it stands.
    pub fn set_course(&mut self, destination: HexCoord) {
        let distance = self.origin.distance_to(destination);
        self.destination = Some(destination);
        self.total_distance = distance;
        self.remaining_distance = distance;
    }

    /// Move one cycle. Returns `true` when the fleet arrived.
    pub fn advance(&mut self, speed: Fixed) -> bool {
        let Some(destination) = self.destination else {
            return false;
        };
        self.remaining_distance = (self.remaining_distance - speed).max(Fixed::ZERO);
        if self.remaining_distance > Fixed::ZERO {
            return false;
        }
        self.origin = destination;
        self.destination = None;
        self.total_distance = Fixed::ZERO;
        self.remaining_distance = Fixed::ZERO;
        true
    }

    /// Number of colony ships aboard.
    #[must_use]
    pub fn colony_ships(&self) -> u32 {
        self.ships.get(ShipType::ColonyShip)
    }
}

/// Arena of all fleets, keyed by id for sorted iteration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Fleets {
    fleets: BTreeMap<FleetId, Fleet>,
    next_id: u32,
}

impl Fleets {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fleets: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn allocate_id(&mut self) -> FleetId {
        let id = FleetId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        id
    }

    /// Add a stationary fleet and return its id.
    pub fn spawn(&mut self, owner: PlayerId, ships: ShipCounts, at: HexCoord) -> FleetId {
        let id = self.allocate_id();
        self.fleets.insert(id, Fleet::stationary(id, owner, ships, at));
        id
    }

    /// Add ships to the owner's stationary fleet at a hex, creating one if
    /// needed. Returns the fleet that received them.
    pub fn reinforce(&mut self, owner: PlayerId, at: HexCoord, ships: &ShipCounts) -> FleetId {
        match self.stationary_of(owner, at) {
            Some(id) => {
                if let Some(fleet) = self.fleets.get_mut(&id) {
                    fleet.ships.merge(ships);
                }
                id
            }
            None => self.spawn(owner, ships.clone(), at),
        }
    }

    /// The owner's lowest-id stationary fleet at a hex.
    #[must_use]
    pub fn stationary_of(&self, owner: PlayerId, at: HexCoord) -> Option<FleetId> {
        self.fleets
            .values()
            .find(|f| f.owner == owner && f.position() == Some(at))
            .map(|f| f.id)
    }

    /// All stationary fleets at a hex, in id order.
    #[must_use]
    pub fn stationary_at(&self, at: HexCoord) -> Vec<FleetId> {
        self.fleets
            .values()
            .filter(|f| f.position() == Some(at))
            .map(|f| f.id)
            .collect()
    }

    /// Split ships off a stationary fleet at `from` and send them to `to`.
    ///
    /// The source fleet is removed if it is emptied.
    pub fn send(
        &mut self,
        owner: PlayerId,
        from: HexCoord,
        to: HexCoord,
        ships: &ShipCounts,
        galaxy: &Galaxy,
    ) -> Result<FleetId, ActionError> {
        galaxy.require(from)?;
        galaxy.require(to)?;
        if ships.is_empty() || !ships.is_normalized() || from == to {
            return Err(ActionError::EmptySendOrder);
        }
        let source_id = self
            .stationary_of(owner, from)
            .ok_or(ActionError::InsufficientShips)?;
        let source = self
            .fleets
            .get_mut(&source_id)
            .ok_or(ActionError::UnknownFleet(source_id))?;
        if !source.ships.subtract(ships) {
            return Err(ActionError::InsufficientShips);
        }
        if source.ships.is_empty() {
            self.fleets.remove(&source_id);
        }

        let id = self.allocate_id();
        let mut fleet = Fleet::stationary(id, owner, ships.clone(), from);
        fleet.set_course(to);
        self.fleets.insert(id, fleet);
        Ok(id)
    }

    /// Recall a fleet that has not departed yet.
    ///
    /// Its ships return to the owner's stationary fleet at the origin. Once
    /// a fleet has moved it keeps its course.
    pub fn clear_waypoint(&mut self, player: PlayerId, id: FleetId) -> Result<FleetId, ActionError> {
        let fleet = self.fleets.get(&id).ok_or(ActionError::UnknownFleet(id))?;
        if fleet.owner != player {
            return Err(ActionError::NotFleetOwner { fleet: id, player });
        }
        if fleet.is_stationary() {
            return Err(ActionError::FleetNotTravelling(id));
        }
        if fleet.has_departed() {
            return Err(ActionError::FleetInFlight(id));
        }

        let mut fleet = self.fleets.remove(&id).ok_or(ActionError::UnknownFleet(id))?;
        let origin = fleet.origin;
        match self.stationary_of(player, origin) {
            Some(home) => {
                if let Some(home_fleet) = self.fleets.get_mut(&home) {
                    home_fleet.ships.merge(&fleet.ships);
                }
                Ok(home)
            }
            None => {
                fleet.destination = None;
                fleet.total_distance = Fixed::ZERO;
                fleet.remaining_distance = Fixed::ZERO;
                self.fleets.insert(id, fleet);
                Ok(id)
            }
        }
    }

    /// Remove a fleet.
    pub fn remove(&mut self, id: FleetId) -> Option<Fleet> {
        self.fleets.remove(&id)
    }

    /// Get a fleet by id.
    #[must_use]
    pub fn get(&self, id: FleetId) -> Option<&Fleet> {
        self.fleets.get(&id)
    }

    /// Get a mutable fleet by id.
    pub fn get_mut(&mut self, id: FleetId) -> Option<&mut Fleet> {
        self.fleets.get_mut(&id)
    }

    /// Iterate fleets in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Fleet> {
        self.fleets.values()
    }

    /// Sorted fleet ids.
    #[must_use]
    pub fn ids(&self) -> Vec<FleetId> {
        self.fleets.keys().copied().collect()
    }

    /// Check if a player owns any fleet.
    #[must_use]
    pub fn any_owned_by(&self, player: PlayerId) -> bool {
        self.fleets.values().any(|f| f.owner == player)
    }

    /// Next id that will be assigned.
    #[must_use]
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    /// Number of fleets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fleets.len()
    }

    /// Check if there are no fleets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fleets.is_empty()
    }
}

/// Advance every travelling fleet by one cycle.
///
/// Fleets move in id order. An arriving fleet merges into its owner's
/// stationary fleet at the destination when one exists; otherwise it stays
/// as a separate stationary fleet, where combat will find it if the hex is
/// contested.
pub fn movement_system(
    fleets: &mut Fleets,
    rules: &Rules,
    propulsion: &BTreeMap<PlayerId, u32>,
    log: &mut NotificationLog,
) {
    for id in fleets.ids() {
        let Some(fleet) = fleets.get_mut(id) else {
            continue;
        };
        if fleet.is_stationary() {
            continue;
        }
        let level = propulsion.get(&fleet.owner).copied().unwrap_or(0);
        let speed = fleet.speed(rules, level);
        if !fleet.advance(speed) {
            continue;
        }

        let owner = fleet.owner;
        let hex = fleet.origin;
        let merge_target = fleets
            .iter()
            .find(|f| f.id != id && f.owner == owner && f.position() == Some(hex))
            .map(|f| f.id);

        let merged_into = match merge_target {
            Some(target) => {
                if let Some(arrived) = fleets.remove(id) {
                    if let Some(home) = fleets.get_mut(target) {
                        home.ships.merge(&arrived.ships);
                    }
                }
                Some(target)
            }
            None => None,
        };

        tracing::debug!(fleet = %id, owner = %owner, q = hex.q, r = hex.r, "Fleet arrived");
        log.push(NotificationKind::FleetArrived {
            fleet: id,
            owner,
            hex,
            merged_into,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn galaxy() -> Galaxy {
        Galaxy::hexagon(4)
    }

    #[test]
    fn test_speed_is_slowest_ship_scaled_by_propulsion() {
        let rules = Rules::default();
        let fleet = Fleet::stationary(
            FleetId(1),
            PlayerId(1),
            ShipCounts::of(ShipType::Scout, 2).with(ShipType::Destroyer, 1),
            HexCoord::ORIGIN,
        );
        assert_eq!(fleet.speed(&rules, 0), Fixed::from_num(2));
        assert_eq!(
            fleet.speed(&rules, 5),
            Fixed::from_num(3)
        );
    }

    #[test]
    fn test_arrives_in_ceil_distance_over_speed() {
        let mut fleet = Fleet::stationary(
            FleetId(1),
            PlayerId(1),
            ShipCounts::of(ShipType::Destroyer, 1),
            HexCoord::ORIGIN,
        );
        fleet.set_course(HexCoord::new(5, 0));
        let speed = Fixed::from_num(2);
        assert_eq!(fleet.eta(speed), Some(3));

        let mut cycles = 0;
        let mut last = fleet.remaining_distance;
        while !fleet.advance(speed) {
            assert!(fleet.remaining_distance <= last);
            last = fleet.remaining_distance;
            cycles += 1;
        }
        assert_eq!(cycles + 1, 3);
        assert_eq!(fleet.position(), Some(HexCoord::new(5, 0)));
    }

    #[test]
    fn test_send_splits_stationary_fleet() {
        let mut fleets = Fleets::new();
        let home = fleets.spawn(
            PlayerId(1),
            ShipCounts::of(ShipType::Fighter, 5),
            HexCoord::ORIGIN,
        );
        let sent = fleets
            .send(
                PlayerId(1),
                HexCoord::ORIGIN,
                HexCoord::new(2, 0),
                &ShipCounts::of(ShipType::Fighter, 3),
                &galaxy(),
            )
            .unwrap();
        assert_eq!(fleets.get(home).unwrap().ships.get(ShipType::Fighter), 2);
        assert_eq!(fleets.get(sent).unwrap().destination, Some(HexCoord::new(2, 0)));

        let err = fleets.send(
            PlayerId(1),
            HexCoord::ORIGIN,
            HexCoord::new(2, 0),
            &ShipCounts::of(ShipType::Fighter, 3),
            &galaxy(),
        );
        assert_eq!(err, Err(ActionError::InsufficientShips));

        let off_map = fleets.send(
            PlayerId(1),
            HexCoord::ORIGIN,
            HexCoord::new(40, 0),
            &ShipCounts::of(ShipType::Fighter, 1),
            &galaxy(),
        );
        assert_eq!(off_map, Err(ActionError::UnknownHex { q: 40, r: 0 }));
    }

    #[test]
    fn test_send_refuses_zero_counts() {
        let mut fleets = Fleets::new();
        fleets.spawn(PlayerId(1), ShipCounts::of(ShipType::Frigate, 2), HexCoord::ORIGIN);
        let zero = ShipCounts::from_raw(std::collections::BTreeMap::from([(ShipType::Frigate, 0)]));
        let err = fleets.send(PlayerId(1), HexCoord::ORIGIN, HexCoord::new(2, 0), &zero, &galaxy());
        assert_eq!(err, Err(ActionError::EmptySendOrder));

        let mixed = ShipCounts::from_raw(std::collections::BTreeMap::from([
            (ShipType::Frigate, 1),
            (ShipType::Scout, 0),
        ]));
        let err = fleets.send(PlayerId(1), HexCoord::ORIGIN, HexCoord::new(2, 0), &mixed, &galaxy());
        assert_eq!(err, Err(ActionError::EmptySendOrder));
        assert_eq!(fleets.len(), 1);
    }

    #[test]
    fn test_clear_waypoint_only_before_departure() {
        let mut fleets = Fleets::new();
        let home = fleets.spawn(
            PlayerId(1),
            ShipCounts::of(ShipType::Fighter, 4),
            HexCoord::ORIGIN,
        );
        let sent = fleets
            .send(
                PlayerId(1),
                HexCoord::ORIGIN,
                HexCoord::new(3, 0),
                &ShipCounts::of(ShipType::Fighter, 1),
                &galaxy(),
            )
            .unwrap();
        assert_eq!(
            fleets.clear_waypoint(PlayerId(2), sent),
            Err(ActionError::NotFleetOwner {
                fleet: sent,
                player: PlayerId(2),
            })
        );
        assert_eq!(fleets.clear_waypoint(PlayerId(1), sent), Ok(home));
        assert_eq!(fleets.get(home).unwrap().ships.get(ShipType::Fighter), 4);
        assert!(fleets.get(sent).is_none());

        let sent = fleets
            .send(
                PlayerId(1),
                HexCoord::ORIGIN,
                HexCoord::new(3, 0),
                &ShipCounts::of(ShipType::Fighter, 1),
                &galaxy(),
            )
            .unwrap();
        fleets.get_mut(sent).unwrap().advance(Fixed::ONE);
        assert_eq!(
            fleets.clear_waypoint(PlayerId(1), sent),
            Err(ActionError::FleetInFlight(sent))
        );
        assert_eq!(
            fleets.clear_waypoint(PlayerId(1), home),
            Err(ActionError::FleetNotTravelling(home))
        );
    }

    #[test]
    fn test_arrival_merges_into_own_stationary_fleet() {
        let rules = Rules::default();
        let mut fleets = Fleets::new();
        let target = HexCoord::new(1, 0);
        let garrison = fleets.spawn(PlayerId(1), ShipCounts::of(ShipType::Scout, 1), target);
        fleets.spawn(PlayerId(1), ShipCounts::of(ShipType::Fighter, 2), HexCoord::ORIGIN);
        let moving = fleets
            .send(
                PlayerId(1),
                HexCoord::ORIGIN,
                target,
                &ShipCounts::of(ShipType::Fighter, 2),
                &galaxy(),
            )
            .unwrap();

        let mut log = NotificationLog::new(0);
        movement_system(&mut fleets, &rules, &BTreeMap::new(), &mut log);

        assert!(fleets.get(moving).is_none());
        let merged = fleets.get(garrison).unwrap();
        assert_eq!(merged.ships.get(ShipType::Fighter), 2);
        assert_eq!(
            log.records()[0].kind,
            NotificationKind::FleetArrived {
                fleet: moving,
                owner: PlayerId(1),
                hex: target,
                merged_into: Some(garrison),
            }
        );
    }
}
