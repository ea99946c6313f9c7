//! Byte offsets of the remote structures the mirror reads.
//!
//! The defaults match the current 64-bit game build. Every offset can be
//! overridden from the `[layout]` section of the configuration when a patch
//! moves a field.

use serde::{Deserialize, Serialize};

use crate::error::{MirrorError, Result};

/// End of the furthest `(offset, width)` field, as a read length.
fn span_end(fields: &[(u64, u64)]) -> Result<usize> {
    let mut end = 0_u64;
    for &(offset, width) in fields {
        let field_end = offset.checked_add(width).ok_or_else(|| {
            MirrorError::Config(format!("layout offset {offset:#x} overflows"))
        })?;
        end = end.max(field_end);
    }
    usize::try_from(end)
        .map_err(|_| MirrorError::Config(format!("layout block of {end:#x} bytes is too large")))
}

/// Offsets for every structure touched by a refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitLayout {
    /// The unit header shared by all unit kinds.
    pub header: HeaderOffsets,
    /// Dynamic path (players, monsters).
    pub path: PathOffsets,
    /// Static path (items, objects).
    pub static_path: StaticPathOffsets,
    /// Stat list.
    pub stat_list: StatListOffsets,
    /// Player data (pointed to by the header's unit data).
    pub player: PlayerOffsets,
    /// Act and act-misc.
    pub act: ActOffsets,
    /// Skill list.
    pub skills: SkillOffsets,
    /// Item data (pointed to by the header's unit data).
    pub item: ItemOffsets,
}

impl UnitLayout {
    /// Check that every fixed-size block the mirror reads has a
    /// representable length.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::Config`] naming the first offending offset.
    pub fn validate(&self) -> Result<()> {
        self.header.block_len()?;
        self.stat_list.block_len()?;
        self.item.block_len()?;
        Ok(())
    }
}

/// Unit header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderOffsets {
    /// Unit type tag (`u32`).
    pub unit_type: u64,
    /// Row in the kind's txt table (`u32`).
    pub txt_file_no: u64,
    /// Unit id (`u32`).
    pub unit_id: u64,
    /// Mode (`u32`).
    pub mode: u64,
    /// Kind-specific data pointer.
    pub unit_data: u64,
    /// Act pointer.
    pub act: u64,
    /// Path pointer.
    pub path: u64,
    /// Stat list pointer.
    pub stat_list: u64,
    /// Inventory pointer.
    pub inventory: u64,
    /// Skill list pointer.
    pub skills: u64,
}

impl Default for HeaderOffsets {
    fn default() -> Self {
        Self {
            unit_type: 0x00,
            txt_file_no: 0x04,
            unit_id: 0x08,
            mode: 0x0C,
            unit_data: 0x10,
            act: 0x20,
            path: 0x38,
            stat_list: 0x88,
            inventory: 0x90,
            skills: 0x100,
        }
    }
}

impl HeaderOffsets {
    /// Bytes to read so that every header field is covered.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::Config`] if an offset overflows.
    pub fn block_len(&self) -> Result<usize> {
        span_end(&[
            (self.unit_type, 4),
            (self.txt_file_no, 4),
            (self.unit_id, 4),
            (self.mode, 4),
            (self.unit_data, 8),
            (self.act, 8),
            (self.path, 8),
            (self.stat_list, 8),
            (self.inventory, 8),
            (self.skills, 8),
        ])
    }
}

/// Dynamic path: `u16` tile coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathOffsets {
    /// X (`u16`).
    pub x: u64,
    /// Y (`u16`).
    pub y: u64,
}

impl Default for PathOffsets {
    fn default() -> Self {
        Self { x: 0x02, y: 0x06 }
    }
}

/// Static path: `u32` coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticPathOffsets {
    /// X (`u32`).
    pub x: u64,
    /// Y (`u32`).
    pub y: u64,
}

impl Default for StaticPathOffsets {
    fn default() -> Self {
        Self { x: 0x10, y: 0x14 }
    }
}

/// Stat list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatListOffsets {
    /// Pointer to the first raw stat entry.
    pub stats: u64,
    /// Number of entries (`u64`).
    pub count: u64,
    /// Active-state bitmask (`STATE_WORDS` × `u32`).
    pub state_flags: u64,
}

impl StatListOffsets {
    /// Bytes to read for the entry pointer and count.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::Config`] if an offset overflows.
    pub fn block_len(&self) -> Result<usize> {
        span_end(&[(self.stats, 8), (self.count, 8)])
    }
}

impl Default for StatListOffsets {
    fn default() -> Self {
        Self {
            stats: 0x30,
            count: 0x38,
            state_flags: 0xAC8,
        }
    }
}

/// Number of `u32` words in the active-state bitmask.
pub const STATE_WORDS: usize = 6;

/// Player data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerOffsets {
    /// Character name, NUL padded.
    pub name: u64,
    /// Length of the name buffer.
    pub name_len: usize,
}

impl Default for PlayerOffsets {
    fn default() -> Self {
        Self {
            name: 0x00,
            name_len: 16,
        }
    }
}

/// Act and act-misc.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActOffsets {
    /// Act number (`u32`).
    pub act_id: u64,
    /// Act-misc pointer.
    pub act_misc: u64,
    /// Difficulty in act-misc (`u16`).
    pub difficulty: u64,
    /// Init seed hash in act-misc (`u64`).
    pub init_seed_hash: u64,
    /// End seed hash in act-misc (`u32`).
    pub end_seed_hash: u64,
}

impl Default for ActOffsets {
    fn default() -> Self {
        Self {
            act_id: 0x20,
            act_misc: 0x78,
            difficulty: 0x830,
            init_seed_hash: 0x840,
            end_seed_hash: 0x868,
        }
    }
}

/// Skill list and skill nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillOffsets {
    /// First skill node in the skill list.
    pub first_skill: u64,
    /// Skill txt pointer in a node.
    pub skill_txt: u64,
    /// Skill id in the skill txt (`u16`).
    pub skill_id: u64,
    /// Next node pointer.
    pub next_skill: u64,
    /// Hard points (`u32`).
    pub hard_points: u64,
    /// Nodes walked before the list is considered corrupt.
    pub max_skills: usize,
}

impl Default for SkillOffsets {
    fn default() -> Self {
        Self {
            first_skill: 0x00,
            skill_txt: 0x00,
            skill_id: 0x00,
            next_skill: 0x08,
            hard_points: 0x40,
            max_skills: 256,
        }
    }
}

/// Item data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemOffsets {
    /// Quality (`u32`).
    pub quality: u64,
    /// Owner unit id (`u32`).
    pub owner_id: u64,
    /// Item flags (`u32`).
    pub flags: u64,
    /// Magic prefixes, the first doubling as rune-word id (3 × `u16`).
    pub prefixes: u64,
    /// Body location (`u8`).
    pub body_loc: u64,
    /// Inventory page (`u8`).
    pub inv_page: u64,
}

impl Default for ItemOffsets {
    fn default() -> Self {
        Self {
            quality: 0x00,
            owner_id: 0x0C,
            flags: 0x18,
            prefixes: 0x42,
            body_loc: 0x54,
            inv_page: 0x55,
        }
    }
}

impl ItemOffsets {
    /// Bytes to read so that every item-data field is covered.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::Config`] if an offset overflows.
    pub fn block_len(&self) -> Result<usize> {
        span_end(&[
            (self.quality, 4),
            (self.owner_id, 4),
            (self.flags, 4),
            (self.prefixes, 6),
            (self.body_loc, 1),
            (self.inv_page, 1),
        ])
    }
}
