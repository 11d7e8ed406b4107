//! Capability bitmask shared by bots, inputs, and modules.

use serde::{Deserialize, Serialize};
use std::ops::{BitAnd, BitOr};

/// A byte-sized capability mask. A bot carries one, every incoming turn
/// carries one, and each module declares the bits it needs; an input's mask
/// is always intersected with the bot's before any of them are consulted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(u8);

impl Permissions {
    /// Nothing is enabled.
    pub const NONE: Permissions = Permissions(0b0000_0000);
    /// Language-model round-trips are enabled.
    pub const CHAT: Permissions = Permissions(0b0000_0001);
    /// "Private" capability modules are enabled.
    pub const PRIVATE_MODULES: Permissions = Permissions(0b0000_0010);
    /// "Public" capability modules are enabled.
    pub const PUBLIC_MODULES: Permissions = Permissions(0b0000_0100);
    /// Every capability module, private or public.
    pub const ALL_MODULES: Permissions = Permissions(0b0000_0110);
    /// Everything.
    pub const ALL: Permissions = Permissions(0b1111_1111);

    /// Build a mask from raw bits.
    pub const fn from_bits(bits: u8) -> Self {
        Permissions(bits)
    }

    /// Return the raw bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True when every bit of `other` is set in `self`.
    pub const fn contains(self, other: Permissions) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when `self` and `other` share at least one bit.
    pub const fn intersects(self, other: Permissions) -> bool {
        self.0 & other.0 != 0
    }

    /// Intersect two masks.
    pub const fn mask(self, other: Permissions) -> Self {
        Permissions(self.0 & other.0)
    }
}

impl BitAnd for Permissions {
    type Output = Permissions;

    fn bitand(self, rhs: Permissions) -> Permissions {
        Permissions(self.0 & rhs.0)
    }
}

impl BitOr for Permissions {
    type Output = Permissions;

    fn bitor(self, rhs: Permissions) -> Permissions {
        Permissions(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::Permissions;
    use pretty_assertions::assert_eq;

    #[test]
    fn masking_intersects_bits() {
        let bot = Permissions::CHAT | Permissions::PRIVATE_MODULES;
        let input = Permissions::ALL;
        assert_eq!(input.mask(bot), bot);
        assert_eq!(Permissions::PUBLIC_MODULES.mask(bot), Permissions::NONE);
    }

    #[test]
    fn contains_requires_every_bit() {
        assert!(Permissions::ALL.contains(Permissions::ALL_MODULES));
        assert!(!Permissions::PRIVATE_MODULES.contains(Permissions::ALL_MODULES));
        assert!(Permissions::ALL_MODULES.intersects(Permissions::PRIVATE_MODULES));
    }

    #[test]
    fn serde_round_trip_is_transparent() {
        let mask = Permissions::ALL_MODULES;
        let json = serde_json::to_string(&mask).expect("serialize");
        assert_eq!(json, "6");
        let parsed: Permissions = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, mask);
    }
}
