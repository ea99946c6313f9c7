//! Core type definitions shared by every mirror module.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Process-stable identifier the game assigns to a unit (player, item, monster).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An address inside the remote process.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RemoteAddress(pub u64);

impl RemoteAddress {
    /// The null pointer.
    pub const NULL: Self = Self(0);

    /// Whether this is the null pointer.
    #[must_use]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Address `offset` bytes past this one.
    #[must_use]
    pub fn offset(self, offset: u64) -> Self {
        Self(self.0.wrapping_add(offset))
    }
}

impl fmt::Display for RemoteAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Unit classification
// ---------------------------------------------------------------------------

/// Kind of unit stored in the game's unit hash tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitType {
    /// A player character.
    Player,
    /// A monster, NPC or mercenary.
    Monster,
    /// A world object (shrine, chest, portal).
    Object,
    /// A missile in flight.
    Missile,
    /// An item, wherever it is stored.
    Item,
    /// A room tile.
    Tile,
}

impl UnitType {
    /// Decode the raw type tag of a unit header.
    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Player),
            1 => Some(Self::Monster),
            2 => Some(Self::Object),
            3 => Some(Self::Missile),
            4 => Some(Self::Item),
            5 => Some(Self::Tile),
            _ => None,
        }
    }
}

/// A tile position in the game world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate.
    pub x: u32,
    /// Y coordinate.
    pub y: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Game context
// ---------------------------------------------------------------------------

/// Game difficulty, which drives the resistance penalty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    /// Easiest difficulty, no penalty.
    #[default]
    Normal,
    /// Middle difficulty.
    Nightmare,
    /// Hardest difficulty.
    Hell,
}

impl Difficulty {
    /// Decode the raw difficulty stored in the act data.
    #[must_use]
    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(Self::Normal),
            1 => Some(Self::Nightmare),
            2 => Some(Self::Hell),
            _ => None,
        }
    }

    /// Points subtracted from every elemental resistance.
    #[must_use]
    pub fn resist_penalty(self) -> i32 {
        match self {
            Self::Normal => 0,
            Self::Nightmare => 40,
            Self::Hell => 100,
        }
    }
}

/// The four elemental resistances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Resist {
    /// Fire resistance.
    Fire,
    /// Lightning resistance.
    Lightning,
    /// Cold resistance.
    Cold,
    /// Poison resistance.
    Poison,
}

impl Resist {
    /// Every element, in display order.
    pub const ALL: [Self; 4] = [Self::Fire, Self::Lightning, Self::Cold, Self::Poison];
}

impl fmt::Display for Resist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fire => "Fire",
            Self::Lightning => "Lightning",
            Self::Cold => "Cold",
            Self::Poison => "Poison",
        };
        f.write_str(name)
    }
}
