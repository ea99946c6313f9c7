use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::{EntityKind, Snapshot, UnitHeader};
use crate::error::{MirrorError, Result};
use crate::layout::UnitLayout;
use crate::reader::RemoteReader;
use crate::types::{Position, UnitId};

/// Item quality, in ascending order of rarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ItemQuality {
    /// No quality assigned.
    None,
    /// Low quality.
    Inferior,
    /// Normal.
    Normal,
    /// Superior.
    Superior,
    /// Magic.
    Magic,
    /// Set item.
    Set,
    /// Rare.
    Rare,
    /// Unique.
    Unique,
    /// Crafted.
    Craft,
    /// Tempered.
    Tempered,
}

impl ItemQuality {
    /// Decode the raw quality.
    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::None,
            1 => Self::Inferior,
            2 => Self::Normal,
            3 => Self::Superior,
            4 => Self::Magic,
            5 => Self::Set,
            6 => Self::Rare,
            7 => Self::Unique,
            8 => Self::Craft,
            9 => Self::Tempered,
            _ => return None,
        })
    }

    /// Upper-case name as the game tables spell it.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Inferior => "INFERIOR",
            Self::Normal => "NORMAL",
            Self::Superior => "SUPERIOR",
            Self::Magic => "MAGIC",
            Self::Set => "SET",
            Self::Rare => "RARE",
            Self::Unique => "UNIQUE",
            Self::Craft => "CRAFT",
            Self::Tempered => "TEMPERED",
        }
    }
}

/// Inventory page an item is stored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvPage {
    /// Backpack.
    Inventory,
    /// Equipment slots.
    Equip,
    /// Trade window.
    Trade,
    /// Horadric cube.
    Cube,
    /// Stash.
    Stash,
    /// Belt.
    Belt,
    /// Not on any page (equipped, on the ground, on the cursor).
    None,
}

impl InvPage {
    /// Decode the raw page byte.
    #[must_use]
    pub fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::Inventory,
            1 => Self::Equip,
            2 => Self::Trade,
            3 => Self::Cube,
            4 => Self::Stash,
            5 => Self::Belt,
            255 => Self::None,
            _ => return None,
        })
    }
}

/// Equipment slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyLoc {
    /// Not equipped.
    None,
    /// Helm.
    Head,
    /// Amulet.
    Amulet,
    /// Body armor.
    Armor,
    /// Right hand.
    RightArm,
    /// Left hand.
    LeftArm,
    /// Right ring.
    RightRing,
    /// Left ring.
    LeftRing,
    /// Belt.
    Belt,
    /// Boots.
    Feet,
    /// Gloves.
    Gloves,
    /// Right hand, weapon switch.
    RightArmSwitch,
    /// Left hand, weapon switch.
    LeftArmSwitch,
}

impl BodyLoc {
    /// Decode the raw body-location byte.
    #[must_use]
    pub fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::None,
            1 => Self::Head,
            2 => Self::Amulet,
            3 => Self::Armor,
            4 => Self::RightArm,
            5 => Self::LeftArm,
            6 => Self::RightRing,
            7 => Self::LeftRing,
            8 => Self::Belt,
            9 => Self::Feet,
            10 => Self::Gloves,
            11 => Self::RightArmSwitch,
            12 => Self::LeftArmSwitch,
            _ => return None,
        })
    }

    /// Upper-case name as the game tables spell it.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Head => "HEAD",
            Self::Amulet => "AMULET",
            Self::Armor => "ARMOR",
            Self::RightArm => "RIGHT_ARM",
            Self::LeftArm => "LEFT_ARM",
            Self::RightRing => "RIGHT_RING",
            Self::LeftRing => "LEFT_RING",
            Self::Belt => "BELT",
            Self::Feet => "FEET",
            Self::Gloves => "GLOVES",
            Self::RightArmSwitch => "RIGHT_ARM_SWITCH",
            Self::LeftArmSwitch => "LEFT_ARM_SWITCH",
        }
    }
}

/// Item unit mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemMode {
    /// In a container (inventory, stash, cube).
    Stored,
    /// Worn by a player or mercenary.
    Equip,
    /// In the belt.
    InBelt,
    /// Lying on the ground.
    OnGround,
    /// Held on the cursor.
    OnCursor,
    /// Being dropped.
    Dropping,
    /// Inserted into a socket.
    Socketed,
}

impl ItemMode {
    /// Decode the raw unit mode of an item.
    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::Stored,
            1 => Self::Equip,
            2 => Self::InBelt,
            3 => Self::OnGround,
            4 => Self::OnCursor,
            5 => Self::Dropping,
            6 => Self::Socketed,
            _ => return None,
        })
    }
}

bitflags! {
    /// Item state flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ItemFlags: u32 {
        /// Dropped or created this session.
        const NEW_ITEM = 0x0000_0001;
        /// Identified.
        const IDENTIFIED = 0x0000_0010;
        /// Equipped by a weapon swap in progress.
        const SWITCH_IN = 0x0000_0040;
        /// Unequipped by a weapon swap in progress.
        const SWITCH_OUT = 0x0000_0080;
        /// Zero durability.
        const BROKEN = 0x0000_0100;
        /// Has sockets.
        const SOCKETED = 0x0000_0800;
        /// Sits in a vendor's store.
        const IN_STORE = 0x0000_2000;
        /// Personalized (named).
        const NAMED = 0x0000_8000;
        /// Ear of a player.
        const IS_EAR = 0x0001_0000;
        /// Low quality.
        const LOW_QUALITY = 0x0010_0000;
        /// Ethereal.
        const ETHEREAL = 0x0040_0000;
        /// Rune word.
        const RUNEWORD = 0x0400_0000;
    }
}

/// Where an item is kept, derived from its mode and page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemStorage {
    /// Worn.
    Equip,
    /// Backpack.
    Inventory,
    /// Stash (personal or shared, told apart by owner).
    Stash,
    /// Horadric cube.
    Cube,
    /// Anywhere else: ground, belt, cursor, vendor, socket.
    None,
}

/// Everything an item refresh reads beyond the header and stats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetail {
    /// Quality.
    pub quality: ItemQuality,
    /// Unit id of the owning player, mercenary or shared-stash holder.
    pub owner_id: UnitId,
    /// State flags.
    pub flags: ItemFlags,
    /// Magic prefixes. For rune words the first is the rune-word id.
    pub prefixes: [u16; 3],
    /// Equipment slot.
    pub body_loc: BodyLoc,
    /// Inventory page.
    pub inv_page: InvPage,
    /// Unit mode.
    pub mode: ItemMode,
    /// Position inside the container.
    pub position: Position,
}

impl ItemDetail {
    /// Storage derived from mode and page.
    #[must_use]
    pub fn storage(&self) -> ItemStorage {
        match (self.mode, self.inv_page) {
            (ItemMode::Equip, _) => ItemStorage::Equip,
            (ItemMode::Stored, InvPage::Inventory) => ItemStorage::Inventory,
            (ItemMode::Stored, InvPage::Stash) => ItemStorage::Stash,
            (ItemMode::Stored, InvPage::Cube) => ItemStorage::Cube,
            _ => ItemStorage::None,
        }
    }
}

/// Item kind marker for [`super::MirroredEntity`].
#[derive(Debug, Clone, Copy)]
pub struct Item;

impl EntityKind for Item {
    type Detail = ItemDetail;
    const NAME: &'static str = "item";

    fn read_detail<R: RemoteReader>(
        reader: &R,
        header: &UnitHeader,
        layout: &UnitLayout,
    ) -> Result<ItemDetail> {
        let bad = |what: &str, raw: u64| {
            MirrorError::DataFormat(format!("item {}: invalid {what} {raw}", header.unit_id))
        };

        if header.unit_data.is_null() {
            return Err(MirrorError::DataFormat(format!(
                "item {} has no item data",
                header.unit_id
            )));
        }
        let o = &layout.item;
        let block = reader.read_block(header.unit_data, o.block_len()?)?;

        let raw_quality = block.u32_at(o.quality)?;
        let raw_body_loc = block.u8_at(o.body_loc)?;
        let raw_page = block.u8_at(o.inv_page)?;
        let prefixes = [
            block.u16_at(o.prefixes)?,
            block.u16_at(o.prefixes + 2)?,
            block.u16_at(o.prefixes + 4)?,
        ];

        let position = if header.path.is_null() {
            Position::default()
        } else {
            let sp = &layout.static_path;
            Position {
                x: reader.read::<u32>(header.path.offset(sp.x))?,
                y: reader.read::<u32>(header.path.offset(sp.y))?,
            }
        };

        Ok(ItemDetail {
            quality: ItemQuality::from_raw(raw_quality)
                .ok_or_else(|| bad("quality", raw_quality.into()))?,
            owner_id: UnitId(block.u32_at(o.owner_id)?),
            flags: ItemFlags::from_bits_retain(block.u32_at(o.flags)?),
            prefixes,
            body_loc: BodyLoc::from_raw(raw_body_loc)
                .ok_or_else(|| bad("body location", raw_body_loc.into()))?,
            inv_page: InvPage::from_raw(raw_page).ok_or_else(|| bad("page", raw_page.into()))?,
            mode: ItemMode::from_raw(header.mode).ok_or_else(|| bad("mode", header.mode.into()))?,
            position,
        })
    }
}

impl Snapshot<ItemDetail> {
    /// Identified flag.
    #[must_use]
    pub fn is_identified(&self) -> bool {
        self.detail().flags.contains(ItemFlags::IDENTIFIED)
    }

    /// Ethereal flag.
    #[must_use]
    pub fn is_ethereal(&self) -> bool {
        self.detail().flags.contains(ItemFlags::ETHEREAL)
    }

    /// Rune-word flag.
    #[must_use]
    pub fn is_runeword(&self) -> bool {
        self.detail().flags.contains(ItemFlags::RUNEWORD)
    }

    /// Rune-word id, when the item is one.
    #[must_use]
    pub fn runeword_id(&self) -> Option<u16> {
        self.is_runeword().then_some(self.detail().prefixes[0])
    }

    /// Owner unit id.
    #[must_use]
    pub fn owner_id(&self) -> UnitId {
        self.detail().owner_id
    }

    /// Storage derived from mode and page.
    #[must_use]
    pub fn storage(&self) -> ItemStorage {
        self.detail().storage()
    }
}
