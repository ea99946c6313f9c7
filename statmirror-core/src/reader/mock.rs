//! In-memory stand-in for an attached process.
//!
//! [`MockProcess`] serves reads from byte regions written by the test,
//! counts every read and every context open/close, and can be detached or
//! poisoned to script remote failures. [`PlayerFixture`] and
//! [`ItemFixture`] lay out complete units following a [`UnitLayout`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use bytemuck::Pod;
use parking_lot::RwLock;

use super::MemorySource;
use crate::error::{MirrorError, Result};
use crate::layout::{STATE_WORDS, UnitLayout};
use crate::stats::RawStat;
use crate::types::{Position, RemoteAddress, UnitId};

const HEAP_BASE: u64 = 0x1000_0000;
const ALIGN: u64 = 0x10;

/// Scriptable in-memory process.
#[derive(Debug)]
pub struct MockProcess {
    regions: RwLock<BTreeMap<u64, Vec<u8>>>,
    poisoned: RwLock<Vec<u64>>,
    next_free: AtomicU64,
    detached: AtomicBool,
    reads: AtomicUsize,
    opens: AtomicUsize,
    closes: AtomicUsize,
}

impl Default for MockProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProcess {
    /// An empty, attached process.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regions: RwLock::new(BTreeMap::new()),
            poisoned: RwLock::new(Vec::new()),
            next_free: AtomicU64::new(HEAP_BASE),
            detached: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
            opens: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        }
    }

    /// Reserve a zeroed region of `len` bytes and return its address.
    pub fn alloc(&self, len: usize) -> RemoteAddress {
        let len = len.max(1) as u64;
        let stride = len.div_ceil(ALIGN) * ALIGN + ALIGN;
        let base = self.next_free.fetch_add(stride, Ordering::Relaxed);
        self.regions.write().insert(base, vec![0; len as usize]);
        RemoteAddress(base)
    }

    /// Write raw bytes. Patches the region that covers the range, or maps a
    /// new region at `address`.
    pub fn write_bytes(&self, address: RemoteAddress, bytes: &[u8]) {
        let mut regions = self.regions.write();
        let end = address.0 + bytes.len() as u64;
        let covering = regions
            .range_mut(..=address.0)
            .rev()
            .find(|(base, data)| **base + data.len() as u64 >= end);
        if let Some((base, data)) = covering {
            let start = (address.0 - *base) as usize;
            data[start..start + bytes.len()].copy_from_slice(bytes);
        } else {
            regions.insert(address.0, bytes.to_vec());
        }
    }

    /// Write one plain-old-data value.
    pub fn write<T: Pod>(&self, address: RemoteAddress, value: T) {
        self.write_bytes(address, bytemuck::bytes_of(&value));
    }

    /// Write a `u8`.
    pub fn write_u8(&self, address: RemoteAddress, value: u8) {
        self.write(address, value);
    }

    /// Write a `u16`.
    pub fn write_u16(&self, address: RemoteAddress, value: u16) {
        self.write(address, value);
    }

    /// Write a `u32`.
    pub fn write_u32(&self, address: RemoteAddress, value: u32) {
        self.write(address, value);
    }

    /// Write a `u64`.
    pub fn write_u64(&self, address: RemoteAddress, value: u64) {
        self.write(address, value);
    }

    /// Write a pointer.
    pub fn write_ptr(&self, address: RemoteAddress, target: RemoteAddress) {
        self.write_u64(address, target.0);
    }

    /// Make `open` and every read fail, as if the process exited.
    pub fn set_detached(&self, detached: bool) {
        self.detached.store(detached, Ordering::SeqCst);
    }

    /// Make every read covering `address` fail.
    pub fn poison(&self, address: RemoteAddress) {
        self.poisoned.write().push(address.0);
    }

    /// Undo every [`poison`](Self::poison).
    pub fn clear_poison(&self) {
        self.poisoned.write().clear();
    }

    /// `read_into` calls served so far (successful or not).
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Successful `open` calls.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// `close` calls.
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Reset the read and open/close counters.
    pub fn reset_counts(&self) {
        self.reads.store(0, Ordering::SeqCst);
        self.opens.store(0, Ordering::SeqCst);
        self.closes.store(0, Ordering::SeqCst);
    }

    // -----------------------------------------------------------------------
    // Unit fixtures
    // -----------------------------------------------------------------------

    /// Lay out a player unit and return the address of its header.
    pub fn add_player(&self, layout: &UnitLayout, player: &PlayerFixture) -> RemoteAddress {
        let h = &layout.header;
        let unit = self.alloc(h.block_len().expect("fixture header layout"));
        self.write_unit_header(layout, unit, 0, player.class, player.unit_id, 0);

        let p = &layout.player;
        let data = self.alloc(p.name as usize + p.name_len);
        let mut name = player.name.as_bytes().to_vec();
        name.resize(p.name_len, 0);
        self.write_bytes(data.offset(p.name), &name);
        self.write_ptr(unit.offset(h.unit_data), data);

        let path = self.alloc(layout.path.x.max(layout.path.y) as usize + 2);
        self.write_u16(path.offset(layout.path.x), player.position.x as u16);
        self.write_u16(path.offset(layout.path.y), player.position.y as u16);
        self.write_ptr(unit.offset(h.path), path);

        let a = &layout.act;
        let act = self.alloc(a.act_id.max(a.act_misc) as usize + 8);
        let misc = self.alloc(a.difficulty.max(a.init_seed_hash).max(a.end_seed_hash) as usize + 8);
        self.write_u32(act.offset(a.act_id), player.act_id);
        self.write_ptr(act.offset(a.act_misc), misc);
        self.write_u16(misc.offset(a.difficulty), player.difficulty);
        self.write_u64(misc.offset(a.init_seed_hash), player.init_seed_hash);
        self.write_u32(misc.offset(a.end_seed_hash), player.end_seed_hash);
        self.write_ptr(unit.offset(h.act), act);

        let list = self.write_skill_list(layout, &player.skills);
        self.write_ptr(unit.offset(h.skills), list);

        let stat_list = self.alloc_stat_list(layout);
        self.write_ptr(unit.offset(h.stat_list), stat_list);
        self.set_stats(layout, unit, &player.stats);
        self.set_states(layout, unit, &player.states);
        unit
    }

    /// Lay out an item unit and return the address of its header.
    pub fn add_item(&self, layout: &UnitLayout, item: &ItemFixture) -> RemoteAddress {
        let h = &layout.header;
        let unit = self.alloc(h.block_len().expect("fixture header layout"));
        self.write_unit_header(layout, unit, 4, item.txt_file_no, item.unit_id, item.mode);

        let o = &layout.item;
        let data = self.alloc(o.block_len().expect("fixture item layout"));
        self.write_u32(data.offset(o.quality), item.quality);
        self.write_u32(data.offset(o.owner_id), item.owner_id.0);
        self.write_u32(data.offset(o.flags), item.flags);
        for (i, prefix) in item.prefixes.iter().enumerate() {
            self.write_u16(data.offset(o.prefixes + 2 * i as u64), *prefix);
        }
        self.write_u8(data.offset(o.body_loc), item.body_loc);
        self.write_u8(data.offset(o.inv_page), item.inv_page);
        self.write_ptr(unit.offset(h.unit_data), data);

        let sp = &layout.static_path;
        let path = self.alloc(sp.x.max(sp.y) as usize + 4);
        self.write_u32(path.offset(sp.x), item.position.x);
        self.write_u32(path.offset(sp.y), item.position.y);
        self.write_ptr(unit.offset(h.path), path);

        let stat_list = self.alloc_stat_list(layout);
        self.write_ptr(unit.offset(h.stat_list), stat_list);
        self.set_stats(layout, unit, &item.stats);
        unit
    }

    /// Point the unit's stat list at a fresh array holding `stats`.
    pub fn set_stats(&self, layout: &UnitLayout, unit: RemoteAddress, stats: &[RawStat]) {
        let Some(list) = self.stat_list_of(layout, unit) else {
            return;
        };
        let array = self.alloc(std::mem::size_of::<RawStat>() * stats.len());
        self.write_bytes(array, bytemuck::cast_slice(stats));
        self.write_ptr(list.offset(layout.stat_list.stats), array);
        self.write_u64(list.offset(layout.stat_list.count), stats.len() as u64);
    }

    /// Set the unit's active-state bitmask from a list of state ids.
    pub fn set_states(&self, layout: &UnitLayout, unit: RemoteAddress, states: &[u32]) {
        let Some(list) = self.stat_list_of(layout, unit) else {
            return;
        };
        let mut words = [0_u32; STATE_WORDS];
        for state in states {
            if let Some(word) = words.get_mut((state / 32) as usize) {
                *word |= 1 << (state % 32);
            }
        }
        self.write_bytes(
            list.offset(layout.stat_list.state_flags),
            bytemuck::cast_slice(&words),
        );
    }

    /// Overwrite the unit id in a header, as when the game reuses the slot.
    pub fn set_unit_id(&self, layout: &UnitLayout, unit: RemoteAddress, unit_id: UnitId) {
        self.write_u32(unit.offset(layout.header.unit_id), unit_id.0);
    }

    fn write_unit_header(
        &self,
        layout: &UnitLayout,
        unit: RemoteAddress,
        unit_type: u32,
        txt_file_no: u32,
        unit_id: UnitId,
        mode: u32,
    ) {
        let h = &layout.header;
        self.write_u32(unit.offset(h.unit_type), unit_type);
        self.write_u32(unit.offset(h.txt_file_no), txt_file_no);
        self.write_u32(unit.offset(h.unit_id), unit_id.0);
        self.write_u32(unit.offset(h.mode), mode);
    }

    fn alloc_stat_list(&self, layout: &UnitLayout) -> RemoteAddress {
        let s = &layout.stat_list;
        let len = (s.stats + 8)
            .max(s.count + 8)
            .max(s.state_flags + 4 * STATE_WORDS as u64);
        self.alloc(len as usize)
    }

    fn stat_list_of(&self, layout: &UnitLayout, unit: RemoteAddress) -> Option<RemoteAddress> {
        let mut buf = [0_u8; 8];
        self.copy_out(unit.offset(layout.header.stat_list), &mut buf)
            .ok()
            .map(|()| RemoteAddress(u64::from_le_bytes(buf)))
            .filter(|addr| !addr.is_null())
    }

    fn copy_out(&self, address: RemoteAddress, buf: &mut [u8]) -> std::result::Result<(), &'static str> {
        let len = buf.len();
        let end = address.0.checked_add(len as u64).ok_or("address overflow")?;
        let touched = address.0..end.max(address.0 + 1);
        if self.poisoned.read().iter().any(|p| touched.contains(p)) {
            return Err("poisoned");
        }

        let regions = self.regions.read();
        let (base, data) = regions
            .range(..=address.0)
            .rev()
            .find(|(base, data)| **base + data.len() as u64 >= end)
            .ok_or("unmapped")?;
        let start = (address.0 - *base) as usize;
        buf.copy_from_slice(&data[start..start + len]);
        Ok(())
    }

    fn write_skill_list(&self, layout: &UnitLayout, skills: &[(u16, u32)]) -> RemoteAddress {
        let s = &layout.skills;
        let list = self.alloc(s.first_skill as usize + 8);
        let node_len = s.skill_txt.max(s.next_skill).max(s.hard_points) as usize + 8;

        let mut link = list.offset(s.first_skill);
        for (skill_id, hard_points) in skills {
            let node = self.alloc(node_len);
            let txt = self.alloc(s.skill_id as usize + 2);
            self.write_u16(txt.offset(s.skill_id), *skill_id);
            self.write_ptr(node.offset(s.skill_txt), txt);
            self.write_u32(node.offset(s.hard_points), *hard_points);
            self.write_ptr(link, node);
            link = node.offset(s.next_skill);
        }
        list
    }
}

impl MemorySource for MockProcess {
    fn open(&self) -> Result<()> {
        if self.detached.load(Ordering::SeqCst) {
            return Err(MirrorError::ProcessUnavailable("mock process detached".into()));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read_into(&self, address: RemoteAddress, buf: &mut [u8]) -> Result<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.detached.load(Ordering::SeqCst) {
            return Err(MirrorError::ProcessUnavailable("mock process detached".into()));
        }
        self.copy_out(address, buf)
            .map_err(|reason| MirrorError::RemoteRead {
                address,
                len: buf.len(),
                reason: reason.to_string(),
            })
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// A player unit to lay out with [`MockProcess::add_player`].
#[derive(Debug, Clone, Default)]
pub struct PlayerFixture {
    /// Unit id.
    pub unit_id: UnitId,
    /// Character class (the header's txt file no).
    pub class: u32,
    /// Character name; truncated to the layout's name buffer.
    pub name: String,
    /// Raw stat array.
    pub stats: Vec<RawStat>,
    /// Active state ids.
    pub states: Vec<u32>,
    /// Tile position.
    pub position: Position,
    /// Act number.
    pub act_id: u32,
    /// Raw difficulty.
    pub difficulty: u16,
    /// Init seed hash.
    pub init_seed_hash: u64,
    /// End seed hash.
    pub end_seed_hash: u32,
    /// `(skill id, hard points)` in list order.
    pub skills: Vec<(u16, u32)>,
}

/// An item unit to lay out with [`MockProcess::add_item`].
#[derive(Debug, Clone)]
pub struct ItemFixture {
    /// Unit id.
    pub unit_id: UnitId,
    /// Row in the item tables.
    pub txt_file_no: u32,
    /// Raw item mode.
    pub mode: u32,
    /// Raw quality.
    pub quality: u32,
    /// Owner unit id.
    pub owner_id: UnitId,
    /// Raw item flags.
    pub flags: u32,
    /// Magic prefixes.
    pub prefixes: [u16; 3],
    /// Raw body location.
    pub body_loc: u8,
    /// Raw inventory page.
    pub inv_page: u8,
    /// Position inside its container.
    pub position: Position,
    /// Raw stat array.
    pub stats: Vec<RawStat>,
}

impl Default for ItemFixture {
    fn default() -> Self {
        Self {
            unit_id: UnitId(0),
            txt_file_no: 0,
            mode: 0,
            quality: 2,
            owner_id: UnitId(0),
            flags: 0,
            prefixes: [0; 3],
            body_loc: 0,
            inv_page: 255,
            position: Position::default(),
            stats: Vec::new(),
        }
    }
}
