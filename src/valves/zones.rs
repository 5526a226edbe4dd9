//! Zone bitmask and ascending zone iteration.
//!
//! Bit `i` selects zone `i`.  Iteration is strictly ascending and ends at
//! the sentinel [`ZONE_COUNT`]; bits at or beyond the zone count are never
//! visited.

use serde::{Deserialize, Serialize};

use crate::config::ZONE_COUNT;

/// Mask of every wired zone.
const VALID_BITS: u16 = (1u16 << ZONE_COUNT) - 1;

/// Set of irrigation zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneMask(u16);

impl ZoneMask {
    pub const EMPTY: Self = Self(0);

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Every wired zone.
    pub const fn all() -> Self {
        Self(VALID_BITS)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if no bit lies at or beyond the zone count.
    pub const fn is_within_range(self) -> bool {
        self.0 & !VALID_BITS == 0
    }

    /// True if at least one wired zone is selected.
    pub const fn has_valid_zone(self) -> bool {
        self.0 & VALID_BITS != 0
    }

    /// Drop bits for zones that are not wired.
    pub const fn clamped(self) -> Self {
        Self(self.0 & VALID_BITS)
    }

    pub const fn contains(self, zone: u8) -> bool {
        zone < 16 && self.0 & (1 << zone) != 0
    }

    /// Next selected zone strictly after `after` (or the first one when
    /// `after` is `None`).  Returns [`ZONE_COUNT`] once exhausted.
    pub fn next_zone(self, after: Option<u8>) -> u8 {
        let start = after.map_or(0, |z| z.saturating_add(1));
        (start..ZONE_COUNT)
            .find(|&z| self.contains(z))
            .unwrap_or(ZONE_COUNT)
    }

    /// Selected wired zones in ascending order.
    pub fn iter(self) -> impl Iterator<Item = u8> {
        (0..ZONE_COUNT).filter(move |&z| self.contains(z))
    }
}

impl From<u16> for ZoneMask {
    fn from(bits: u16) -> Self {
        Self(bits)
    }
}
