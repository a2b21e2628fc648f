//! Trim levels and the range the search is allowed to walk.

use core::fmt;

/// A VREF trim register setting.
///
/// Output voltage moves monotonically with the level, up to measurement noise.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct TrimLevel(u8);

impl TrimLevel {
    /// Wrap a raw register value.
    pub const fn new(level: u8) -> Self {
        Self(level)
    }

    /// Get the raw register value.
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl From<u8> for TrimLevel {
    fn from(level: u8) -> Self {
        Self(level)
    }
}

impl fmt::Display for TrimLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive range of valid trim levels.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrimRange {
    min: TrimLevel,
    max: TrimLevel,
}

impl TrimRange {
    /// The 6-bit trim field: `0..=63`.
    pub const DEFAULT: TrimRange = TrimRange {
        min: TrimLevel(0),
        max: TrimLevel(63),
    };

    /// Create a range, or `None` if `min > max`.
    pub const fn new(min: u8, max: u8) -> Option<Self> {
        if min > max {
            return None;
        }
        Some(Self {
            min: TrimLevel(min),
            max: TrimLevel(max),
        })
    }

    pub const fn min(&self) -> TrimLevel {
        self.min
    }

    pub const fn max(&self) -> TrimLevel {
        self.max
    }

    pub fn contains(&self, level: TrimLevel) -> bool {
        self.min <= level && level <= self.max
    }

    /// Number of levels in the range.
    pub fn len(&self) -> u16 {
        self.max.0 as u16 - self.min.0 as u16 + 1
    }

    /// Floor midpoint of the whole range, where the first bisection step lands.
    pub fn midpoint(&self) -> TrimLevel {
        midpoint(self.min, self.max)
    }

    /// `ceil(log2(len))`: bisection steps a clean monotonic reference needs.
    pub fn max_bisection_steps(&self) -> u32 {
        let len = self.len() as u32;
        u32::BITS - (len - 1).leading_zeros()
    }
}

impl Default for TrimRange {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Floor of `(a + b) / 2` without overflowing `u8`.
pub(crate) fn midpoint(a: TrimLevel, b: TrimLevel) -> TrimLevel {
    TrimLevel(((a.0 as u16 + b.0 as u16) / 2) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_range() {
        assert!(TrimRange::new(10, 9).is_none());
        assert!(TrimRange::new(9, 9).is_some());
    }

    #[test]
    fn default_range_is_six_bit() {
        let r = TrimRange::DEFAULT;
        assert_eq!(r.len(), 64);
        assert_eq!(r.midpoint(), TrimLevel::new(31));
        assert_eq!(r.max_bisection_steps(), 6);
        assert!(r.contains(TrimLevel::new(63)));
        assert!(!r.contains(TrimLevel::new(64)));
    }

    #[test]
    fn bisection_steps_round_up() {
        assert_eq!(TrimRange::new(0, 0).unwrap().max_bisection_steps(), 0);
        assert_eq!(TrimRange::new(0, 1).unwrap().max_bisection_steps(), 1);
        assert_eq!(TrimRange::new(0, 4).unwrap().max_bisection_steps(), 3);
        assert_eq!(TrimRange::new(0, 255).unwrap().max_bisection_steps(), 8);
    }

    #[test]
    fn midpoint_floors_and_does_not_overflow() {
        assert_eq!(midpoint(TrimLevel::new(51), TrimLevel::new(55)), TrimLevel::new(53));
        assert_eq!(midpoint(TrimLevel::new(52), TrimLevel::new(53)), TrimLevel::new(52));
        assert_eq!(midpoint(TrimLevel::new(254), TrimLevel::new(255)), TrimLevel::new(254));
    }
}
