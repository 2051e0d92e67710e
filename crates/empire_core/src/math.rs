//! Fixed-point and integer helpers for deterministic simulation.
//!
//! Travel distances are fractional (hex midpoints are not on an integer
//! lattice), so they use fixed-point. Everything else in the economy is plain
//! integer math with explicit rounding.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all fractional simulation math.
///
/// 32 integer bits and 32 fractional bits.
pub type Fixed = I32F32;

/// Serde support for fixed-point numbers.
///
/// Serializes as the raw bit representation (i64) so every participant
/// reads back exactly the same value.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Fixed-point 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

impl Vec2Fixed {
    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }
}

/// Square root of a fixed-point number using binary search.
///
/// Bit-for-bit reproducible on every platform, unlike `f64::sqrt`.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    // high must start strictly above the root so exact squares resolve exactly
    let mut high = value.max(Fixed::ONE).saturating_add(Fixed::ONE);

    for _ in 0..64 {
        let mid = low + (high - low) / Fixed::from_num(2);
        if mid == low {
            break;
        }
        let mid_sq = mid.saturating_mul(mid);
        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

/// Ceiling of a fixed-point quotient as whole turns.
///
/// Returns `0` when `divisor` is not positive.
#[must_use]
pub fn ceil_div_fixed(dividend: Fixed, divisor: Fixed) -> u32 {
    if divisor <= Fixed::ZERO || dividend <= Fixed::ZERO {
        return 0;
    }
    // on raw bits so the result matches repeated subtraction exactly
    let dividend = i128::from(dividend.to_bits());
    let divisor = i128::from(divisor.to_bits());
    let turns = (dividend + divisor - 1) / divisor;
    u32::try_from(turns).unwrap_or(u32::MAX)
}

/// Scale `value` by `percent` / 100, rounding down.
#[must_use]
pub fn apply_percent(value: u32, percent: u32) -> u32 {
    let scaled = u64::from(value) * u64::from(percent) / 100;
    u32::try_from(scaled).unwrap_or(u32::MAX)
}

/// Integer ceiling division. `divisor` of zero yields zero.
#[must_use]
pub fn div_ceil_u32(value: u32, divisor: u32) -> u32 {
    if divisor == 0 {
        0
    } else {
        value.div_ceil(divisor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_345() {
        let a = Vec2Fixed::new(Fixed::from_num(3), Fixed::from_num(0));
        let b = Vec2Fixed::new(Fixed::from_num(0), Fixed::from_num(4));
        assert_eq!(a.distance_squared(b), Fixed::from_num(25));
        assert_eq!(a.distance(b), Fixed::from_num(5));
    }

    #[test]
    fn test_sqrt_small_values() {
        let root = fixed_sqrt(Fixed::from_num(0.25));
        assert_eq!(root, Fixed::from_num(0.5));
        assert_eq!(fixed_sqrt(Fixed::ZERO), Fixed::ZERO);
        assert_eq!(fixed_sqrt(Fixed::from_num(-4)), Fixed::ZERO);
    }

    #[test]
    fn test_sqrt_is_reproducible() {
        let a = fixed_sqrt(Fixed::from_num(3));
        let b = fixed_sqrt(Fixed::from_num(3));
        assert_eq!(a.to_bits(), b.to_bits());
        let epsilon = Fixed::ONE / Fixed::from_num(10_000);
        assert!((a * a - Fixed::from_num(3)).abs() < epsilon);
    }

    #[test]
    fn test_ceil_div_fixed() {
        assert_eq!(ceil_div_fixed(Fixed::from_num(10), Fixed::from_num(4)), 3);
        assert_eq!(ceil_div_fixed(Fixed::from_num(8), Fixed::from_num(4)), 2);
        assert_eq!(ceil_div_fixed(Fixed::ZERO, Fixed::from_num(4)), 0);
        assert_eq!(ceil_div_fixed(Fixed::from_num(3), Fixed::ZERO), 0);
    }

    #[test]
    fn test_percent_helpers() {
        assert_eq!(apply_percent(10, 80), 8);
        assert_eq!(apply_percent(7, 50), 3);
        assert_eq!(div_ceil_u32(7, 2), 4);
        assert_eq!(div_ceil_u32(7, 0), 0);
    }
}
