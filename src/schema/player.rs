use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two split-screen player slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlayerId {
    One,
    Two,
}

impl PlayerId {
    /// Both slots in screen order (left, right).
    pub const ALL: [PlayerId; 2] = [PlayerId::One, PlayerId::Two];

    /// Zero-based slot index: 0 for `One`, 1 for `Two`.
    pub fn index(self) -> u8 {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }

    /// The opinion-target index the NPC system uses for this player.
    ///
    /// Opinion targets are one-based: slot index + 1.
    pub fn opinion_target(self) -> OpinionTarget {
        OpinionTarget(i32::from(self.index()) + 1)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One => f.write_str("player one"),
            Self::Two => f.write_str("player two"),
        }
    }
}

/// Index of a player as seen by the NPC opinion system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpinionTarget(pub i32);

/// Newtype wrapper for NPC ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NpcId(pub u64);

/// A simulation layer. Objects on a layer only render and collide with
/// cameras and bodies on the same layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Layer(pub u8);

impl Layer {
    /// Layers a 32-bit culling mask can address.
    pub const COUNT: u8 = 32;

    pub fn is_valid(self) -> bool {
        self.0 < Self::COUNT
    }

    /// Camera culling mask that selects only this layer. Empty for a layer
    /// past [`Layer::COUNT`].
    pub fn mask(self) -> u32 {
        1u32.checked_shl(u32::from(self.0)).unwrap_or(0)
    }
}

/// Amount an opinion moves after a microgame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpinionDelta {
    Raise,
    Lower,
}

impl OpinionDelta {
    pub fn from_outcome(won: bool) -> Self {
        if won {
            Self::Raise
        } else {
            Self::Lower
        }
    }

    /// Signed value: +1 or -1.
    pub fn value(self) -> i32 {
        match self {
            Self::Raise => 1,
            Self::Lower => -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opinion_target_is_index_plus_one() {
        assert_eq!(PlayerId::One.opinion_target(), OpinionTarget(1));
        assert_eq!(PlayerId::Two.opinion_target(), OpinionTarget(2));
    }

    #[test]
    fn layer_mask() {
        assert_eq!(Layer(8).mask(), 256);
        assert_eq!(Layer(9).mask(), 512);
        assert_eq!(Layer(31).mask(), 1 << 31);
    }

    #[test]
    fn out_of_range_layer_has_empty_mask() {
        assert!(!Layer(32).is_valid());
        assert_eq!(Layer(32).mask(), 0);
        assert_eq!(Layer(200).mask(), 0);
    }

    #[test]
    fn opinion_delta_values() {
        assert_eq!(OpinionDelta::from_outcome(true).value(), 1);
        assert_eq!(OpinionDelta::from_outcome(false).value(), -1);
    }
}
