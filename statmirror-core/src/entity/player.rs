use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{EntityKind, MirroredEntity, Snapshot, UnitHeader};
use crate::error::{MirrorError, Result};
use crate::layout::{STATE_WORDS, UnitLayout};
use crate::reader::{Process, RemoteReader};
use crate::resolver::{self, Resists};
use crate::roster::{Roster, RosterEntry};
use crate::tables::{ExperienceTable, StatMetadata};
use crate::types::{Difficulty, Position, RemoteAddress, UnitId};

/// Act the player is in, with the map seed hashes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActInfo {
    /// Act number.
    pub act_id: u32,
    /// Game difficulty.
    pub difficulty: Difficulty,
    /// Init seed hash.
    pub init_seed_hash: u64,
    /// End seed hash.
    pub end_seed_hash: u32,
}

/// One skill from the player's skill list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillEntry {
    /// Skill id.
    pub skill_id: u16,
    /// Points invested directly.
    pub hard_points: u32,
}

/// Everything a player refresh reads beyond the header and stats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerDetail {
    /// Character name.
    pub name: String,
    /// Act and seeds.
    pub act: ActInfo,
    /// Skill list in game order.
    pub skills: Vec<SkillEntry>,
    /// Active state ids, ascending.
    pub states: Vec<u32>,
    /// Tile position.
    pub position: Position,
}

/// Player kind marker for [`MirroredEntity`].
#[derive(Debug, Clone, Copy)]
pub struct Player;

impl EntityKind for Player {
    type Detail = PlayerDetail;
    const NAME: &'static str = "player";

    fn read_detail<R: RemoteReader>(
        reader: &R,
        header: &UnitHeader,
        layout: &UnitLayout,
    ) -> Result<PlayerDetail> {
        if header.unit_data.is_null() || header.act.is_null() {
            return Err(MirrorError::DataFormat(format!(
                "player {} is missing player or act data",
                header.unit_id
            )));
        }

        Ok(PlayerDetail {
            name: read_name(reader, header.unit_data, layout)?,
            act: read_act(reader, header.act, layout)?,
            skills: read_skills(reader, header.skills, layout)?,
            states: read_states(reader, header.stat_list, layout)?,
            position: read_position(reader, header.path, layout)?,
        })
    }
}

fn read_name<R: RemoteReader>(
    reader: &R,
    player_data: RemoteAddress,
    layout: &UnitLayout,
) -> Result<String> {
    let p = &layout.player;
    let bytes = reader.read_bytes(player_data.offset(p.name), p.name_len)?;
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
}

fn read_act<R: RemoteReader>(reader: &R, act: RemoteAddress, layout: &UnitLayout) -> Result<ActInfo> {
    let a = &layout.act;
    let act_id = reader.read::<u32>(act.offset(a.act_id))?;
    let misc = reader.read_ptr(act.offset(a.act_misc))?;
    if misc.is_null() {
        return Err(MirrorError::DataFormat(format!("act at {act} has no act-misc")));
    }

    let raw_difficulty = reader.read::<u16>(misc.offset(a.difficulty))?;
    let difficulty = Difficulty::from_raw(raw_difficulty).ok_or_else(|| {
        MirrorError::DataFormat(format!("invalid difficulty {raw_difficulty} at {misc}"))
    })?;

    Ok(ActInfo {
        act_id,
        difficulty,
        init_seed_hash: reader.read::<u64>(misc.offset(a.init_seed_hash))?,
        end_seed_hash: reader.read::<u32>(misc.offset(a.end_seed_hash))?,
    })
}

fn read_skills<R: RemoteReader>(
    reader: &R,
    skill_list: RemoteAddress,
    layout: &UnitLayout,
) -> Result<Vec<SkillEntry>> {
    if skill_list.is_null() {
        return Ok(Vec::new());
    }
    let s = &layout.skills;
    let mut skills = Vec::new();
    let mut node = reader.read_ptr(skill_list.offset(s.first_skill))?;

    while !node.is_null() {
        if skills.len() >= s.max_skills {
            return Err(MirrorError::DataFormat(format!(
                "skill list at {skill_list} exceeds {} nodes",
                s.max_skills
            )));
        }
        let txt = reader.read_ptr(node.offset(s.skill_txt))?;
        let skill_id = if txt.is_null() {
            0
        } else {
            reader.read::<u16>(txt.offset(s.skill_id))?
        };
        skills.push(SkillEntry {
            skill_id,
            hard_points: reader.read::<u32>(node.offset(s.hard_points))?,
        });
        node = reader.read_ptr(node.offset(s.next_skill))?;
    }
    Ok(skills)
}

fn read_states<R: RemoteReader>(
    reader: &R,
    stat_list: RemoteAddress,
    layout: &UnitLayout,
) -> Result<Vec<u32>> {
    if stat_list.is_null() {
        return Ok(Vec::new());
    }
    let words: Vec<u32> =
        reader.read_array(stat_list.offset(layout.stat_list.state_flags), STATE_WORDS)?;
    Ok(decode_states(&words))
}

/// State ids whose bit is set, word `i` bit `b` being state `32 * i + b`.
#[must_use]
pub fn decode_states(words: &[u32]) -> Vec<u32> {
    let mut states = Vec::new();
    for (i, word) in (0_u32..).zip(words) {
        for bit in 0..32 {
            if word & (1 << bit) != 0 {
                states.push(i * 32 + bit);
            }
        }
    }
    states
}

fn read_position<R: RemoteReader>(
    reader: &R,
    path: RemoteAddress,
    layout: &UnitLayout,
) -> Result<Position> {
    if path.is_null() {
        return Ok(Position::default());
    }
    Ok(Position {
        x: u32::from(reader.read::<u16>(path.offset(layout.path.x))?),
        y: u32::from(reader.read::<u16>(path.offset(layout.path.y))?),
    })
}

// ---------------------------------------------------------------------------
// Derived quantities
// ---------------------------------------------------------------------------

impl Snapshot<PlayerDetail> {
    /// Character name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.detail().name
    }

    /// Current life, shifted as `metadata` lists.
    #[must_use]
    pub fn life(&self, metadata: &StatMetadata) -> f32 {
        resolver::life(self.stats(), metadata)
    }

    /// Maximum life.
    #[must_use]
    pub fn max_life(&self, metadata: &StatMetadata) -> f32 {
        resolver::max_life(self.stats(), metadata)
    }

    /// Current mana.
    #[must_use]
    pub fn mana(&self, metadata: &StatMetadata) -> f32 {
        resolver::mana(self.stats(), metadata)
    }

    /// Maximum mana.
    #[must_use]
    pub fn max_mana(&self, metadata: &StatMetadata) -> f32 {
        resolver::max_mana(self.stats(), metadata)
    }

    /// Life percentage, `NAN` when max life is 0.
    #[must_use]
    pub fn life_percentage(&self, metadata: &StatMetadata) -> f32 {
        resolver::life_percentage(self.stats(), metadata)
    }

    /// Mana percentage, `NAN` when max mana is 0.
    #[must_use]
    pub fn mana_percentage(&self, metadata: &StatMetadata) -> f32 {
        resolver::mana_percentage(self.stats(), metadata)
    }

    /// Character level.
    #[must_use]
    pub fn level(&self) -> i32 {
        resolver::level(self.stats())
    }

    /// True experience total.
    #[must_use]
    pub fn experience(&self) -> i64 {
        resolver::experience(self.stats())
    }

    /// Progress through the current level, in percent.
    #[must_use]
    pub fn level_progress(&self, curve: &ExperienceTable) -> f32 {
        resolver::level_progress(self.stats(), curve)
    }

    /// Resistances at the difficulty the player is in.
    #[must_use]
    pub fn resists(&self) -> Resists {
        resolver::resists(self.stats(), self.detail().act.difficulty)
    }

    /// `name/x/y`, stable while the player stands still.
    #[must_use]
    pub fn hash_string(&self) -> String {
        let d = self.detail();
        format!("{}/{}/{}", d.name, d.position.x, d.position.y)
    }
}

// ---------------------------------------------------------------------------
// PlayerEntity
// ---------------------------------------------------------------------------

/// A mirrored player plus its link into the party roster.
///
/// The link is the player's unit id once the roster is known to list it;
/// the roster itself stays owned by whoever refreshes it.
#[derive(Debug)]
pub struct PlayerEntity {
    entity: MirroredEntity<Player>,
    roster_key: Mutex<Option<UnitId>>,
}

impl PlayerEntity {
    /// Mirror for a newly discovered player.
    #[must_use]
    pub fn new(unit_id: UnitId, address: RemoteAddress, layout: Arc<UnitLayout>) -> Self {
        Self {
            entity: MirroredEntity::new(unit_id, address, layout),
            roster_key: Mutex::new(None),
        }
    }

    /// The underlying mirror.
    #[must_use]
    pub fn entity(&self) -> &MirroredEntity<Player> {
        &self.entity
    }

    /// Unit id.
    #[must_use]
    pub fn unit_id(&self) -> UnitId {
        self.entity.unit_id()
    }

    /// See [`MirroredEntity::update`].
    pub fn update(&self, process: &Process) -> Option<Arc<Snapshot<PlayerDetail>>> {
        self.entity.update(process)
    }

    /// See [`MirroredEntity::try_update`].
    ///
    /// # Errors
    ///
    /// Returns the failure that aborted the refresh.
    pub fn try_update(&self, process: &Process) -> Result<Arc<Snapshot<PlayerDetail>>> {
        self.entity.try_update(process)
    }

    /// See [`MirroredEntity::invalidate`].
    pub fn invalidate(&self) {
        self.entity.invalidate();
    }

    /// See [`MirroredEntity::snapshot`].
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<Snapshot<PlayerDetail>>> {
        self.entity.snapshot()
    }

    /// Link to this player's entry in `roster`, if it lists one.
    ///
    /// Returns whether the player is linked afterwards. A roster that does
    /// not list the player leaves an existing link in place.
    pub fn update_roster_entry(&self, roster: &Roster) -> bool {
        let unit_id = self.unit_id();
        let mut key = self.roster_key.lock();
        if roster.get(unit_id).is_some() {
            *key = Some(unit_id);
            debug!(unit_id = %unit_id, "roster entry linked");
        } else if key.is_none() {
            warn!(unit_id = %unit_id, "player not listed in roster");
        }
        key.is_some()
    }

    /// The linked roster entry, looked up in the roster passed in.
    #[must_use]
    pub fn roster_entry<'r>(&self, roster: &'r Roster) -> Option<&'r RosterEntry> {
        self.roster_key.lock().and_then(|key| roster.get(key))
    }
}
