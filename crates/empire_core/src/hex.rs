//! Hex-grid geometry and the galaxy map.
//!
//! Cells use axial coordinates (`q`, `r`) on a pointy-top layout scaled so
//! that neighbouring midpoints are exactly one unit apart. Travel distance is
//! the Euclidean distance between midpoints, computed in fixed-point.

use serde::{Deserialize, Serialize};

use crate::error::ActionError;
use crate::ids::PlanetId;
use crate::math::{fixed_sqrt, Fixed, Vec2Fixed};

/// Axial hex coordinate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct HexCoord {
    /// Column axis.
    pub q: i32,
    /// Row axis.
    pub r: i32,
}

/// Axial direction offsets of the six neighbours, clockwise from east.
const NEIGHBOR_OFFSETS: [(i32, i32); 6] = [(1, 0), (1, -1), (0, -1), (-1, 0), (-1, 1), (0, 1)];

impl HexCoord {
    /// Origin cell.
    pub const ORIGIN: Self = Self { q: 0, r: 0 };

    /// Create a new coordinate.
    #[must_use]
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Implied third cube coordinate.
    #[must_use]
    pub const fn s(self) -> i32 {
        -self.q - self.r
    }

    /// Midpoint of this cell in world space.
    ///
    /// `x = q + r/2`, `y = r * sqrt(3)/2`.
    #[must_use]
    pub fn midpoint(self) -> Vec2Fixed {
        let q = Fixed::from_num(self.q);
        let r = Fixed::from_num(self.r);
        let half = Fixed::from_num(2);
        let row_height = fixed_sqrt(Fixed::from_num(3)) / half;
        Vec2Fixed::new(q + r / half, r * row_height)
    }

    /// Euclidean distance between the midpoints of two cells.
    #[must_use]
    pub fn distance_to(self, other: Self) -> Fixed {
        if self == other {
            return Fixed::ZERO;
        }
        self.midpoint().distance(other.midpoint())
    }

    /// Number of steps between two cells on the grid.
    #[must_use]
    pub fn steps_to(self, other: Self) -> u32 {
        let dq = (self.q - other.q).unsigned_abs();
        let dr = (self.r - other.r).unsigned_abs();
        let ds = (self.s() - other.s()).unsigned_abs();
        dq.max(dr).max(ds)
    }

    /// The six neighbouring cells.
    #[must_use]
    pub fn neighbors(self) -> [Self; 6] {
        NEIGHBOR_OFFSETS.map(|(dq, dr)| Self::new(self.q + dq, self.r + dr))
    }

    /// All cells within `radius` steps, in sorted order.
    #[must_use]
    pub fn spiral(self, radius: u32) -> Vec<Self> {
        let radius = i32::try_from(radius).unwrap_or(i32::MAX / 2);
        let mut cells = Vec::new();
        for dq in -radius..=radius {
            let lo = (-radius).max(-dq - radius);
            let hi = radius.min(-dq + radius);
            for dr in lo..=hi {
                cells.push(Self::new(self.q + dq, self.r + dr));
            }
        }
        cells.sort_unstable();
        cells
    }
}

/// One cell of the galaxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexCell {
    /// Cell coordinate.
    pub coord: HexCoord,
    /// Resident planet, if any. Never changes once set.
    pub planet: Option<PlanetId>,
}

/// The fixed set of hex cells that make up the map.
///
/// Cells are stored sorted by coordinate so lookups are a binary search and
/// iteration order is the same for every participant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Galaxy {
    cells: Vec<HexCell>,
}

impl Galaxy {
    /// Create a galaxy from a set of coordinates. Duplicates are collapsed.
    #[must_use]
    pub fn new(coords: impl IntoIterator<Item = HexCoord>) -> Self {
        let mut coords: Vec<HexCoord> = coords.into_iter().collect();
        coords.sort_unstable();
        coords.dedup();
        Self {
            cells: coords
                .into_iter()
                .map(|coord| HexCell {
                    coord,
                    planet: None,
                })
                .collect(),
        }
    }

    /// A hexagon-shaped galaxy of the given radius around the origin.
    #[must_use]
    pub fn hexagon(radius: u32) -> Self {
        Self::new(HexCoord::ORIGIN.spiral(radius))
    }

    fn index_of(&self, coord: HexCoord) -> Option<usize> {
        self.cells.binary_search_by_key(&coord, |c| c.coord).ok()
    }

    /// Check whether a coordinate is part of the galaxy.
    #[must_use]
    pub fn contains(&self, coord: HexCoord) -> bool {
        self.index_of(coord).is_some()
    }

    /// Validate that a coordinate is part of the galaxy.
    pub fn require(&self, coord: HexCoord) -> Result<(), ActionError> {
        if self.contains(coord) {
            Ok(())
        } else {
            Err(ActionError::UnknownHex {
                q: coord.q,
                r: coord.r,
            })
        }
    }

    /// Get a cell.
    #[must_use]
    pub fn cell(&self, coord: HexCoord) -> Option<&HexCell> {
        self.index_of(coord).map(|i| &self.cells[i])
    }

    /// Planet resident at a coordinate.
    #[must_use]
    pub fn planet_at(&self, coord: HexCoord) -> Option<PlanetId> {
        self.cell(coord).and_then(|c| c.planet)
    }

    /// Place a planet in an empty cell.
    ///
    /// Returns `false` if the cell does not exist or already has a planet;
    /// a placed planet never moves.
    pub fn place_planet(&mut self, coord: HexCoord, planet: PlanetId) -> bool {
        match self.index_of(coord) {
            Some(i) if self.cells[i].planet.is_none() => {
                self.cells[i].planet = Some(planet);
                true
            }
            _ => false,
        }
    }

    /// All cells in coordinate order.
    pub fn cells(&self) -> impl Iterator<Item = &HexCell> {
        self.cells.iter()
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the galaxy has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbors_are_one_unit_apart() {
        let origin = HexCoord::ORIGIN;
        let epsilon = Fixed::ONE / Fixed::from_num(10_000);
        for neighbor in origin.neighbors() {
            let d = origin.distance_to(neighbor);
            assert!((d - Fixed::ONE).abs() < epsilon, "{neighbor:?} at {d}");
            assert_eq!(origin.steps_to(neighbor), 1);
        }
    }

    #[test]
    fn test_distance_along_q_axis_is_exact() {
        let a = HexCoord::new(0, 0);
        let b = HexCoord::new(4, 0);
        assert_eq!(a.distance_to(b), Fixed::from_num(4));
        assert_eq!(a.distance_to(a), Fixed::ZERO);
    }

    #[test]
    fn test_spiral_sizes() {
        assert_eq!(HexCoord::ORIGIN.spiral(0).len(), 1);
        assert_eq!(HexCoord::ORIGIN.spiral(1).len(), 7);
        assert_eq!(HexCoord::ORIGIN.spiral(2).len(), 19);
    }

    #[test]
    fn test_planet_placement_is_permanent() {
        let mut galaxy = Galaxy::hexagon(1);
        let cell = HexCoord::new(1, 0);
        assert!(galaxy.place_planet(cell, PlanetId(1)));
        assert!(!galaxy.place_planet(cell, PlanetId(2)));
        assert_eq!(galaxy.planet_at(cell), Some(PlanetId(1)));
        assert!(!galaxy.place_planet(HexCoord::new(5, 5), PlanetId(3)));
    }

    #[test]
    fn test_require_reports_coordinates() {
        let galaxy = Galaxy::hexagon(1);
        assert!(galaxy.require(HexCoord::ORIGIN).is_ok());
        assert_eq!(
            galaxy.require(HexCoord::new(3, -1)),
            Err(ActionError::UnknownHex { q: 3, r: -1 })
        );
    }
}
