//! Static game tables: the experience curve and stat metadata.
//!
//! Both tables are loaded once at startup and shared read-only through
//! [`GameTables`] behind an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, info_span};

use crate::config::TablesConfig;
use crate::error::{MirrorError, Result};
use crate::loader::{self, Record};
use crate::metrics::spans;
use crate::stats::Stat;

/// Number of levels in the experience curve.
pub const LEVEL_COUNT: usize = 100;

/// Highest reachable character level.
pub const MAX_LEVEL: i32 = 99;

const DEFAULT_THRESHOLDS: [i64; LEVEL_COUNT] = [
    0, 500, 1_500, 3_750, 7_875, 14_175, 22_680, 32_886, 44_396, 57_715, 72_144, 90_180,
    112_725, 140_906, 176_132, 220_165, 275_207, 344_008, 430_010, 537_513, 671_891, 839_864,
    1_049_830, 1_312_287, 1_640_359, 2_050_449, 2_563_061, 3_203_826, 3_902_260, 4_663_553,
    5_493_363, 6_397_855, 7_383_752, 8_458_379, 9_629_723, 10_906_488, 12_298_162, 13_815_086,
    15_468_534, 17_270_791, 19_235_252, 21_376_515, 23_710_491, 26_254_525, 29_027_522,
    32_050_088, 35_344_686, 38_935_798, 42_850_109, 47_116_709, 51_767_302, 56_836_449,
    62_361_819, 68_384_473, 74_949_165, 82_104_680, 89_904_191, 98_405_658, 107_672_256,
    117_772_849, 128_782_495, 140_783_010, 153_863_570, 168_121_381, 183_662_396, 200_602_101,
    219_066_380, 239_192_444, 261_129_853, 285_041_630, 311_105_466, 339_515_048, 370_481_492,
    404_234_916, 441_026_148, 481_128_591, 524_840_254, 572_485_967, 624_419_793, 681_027_665,
    742_730_244, 809_986_056, 883_294_891, 963_201_521, 1_050_299_747, 1_145_236_814,
    1_248_718_217, 1_361_512_946, 1_484_459_201, 1_618_470_619, 1_764_543_065, 1_923_762_030,
    2_097_310_703, 2_286_478_756, 2_492_671_933, 2_717_422_497, 2_962_400_612, 3_229_426_756,
    3_520_485_254,
    // Level 99 cap, repeated as in experience.txt.
    3_520_485_254,
];

// ---------------------------------------------------------------------------
// Experience curve
// ---------------------------------------------------------------------------

/// Cumulative experience thresholds. The threshold for level `L` is at index `L - 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperienceTable {
    thresholds: [i64; LEVEL_COUNT],
}

impl Default for ExperienceTable {
    fn default() -> Self {
        Self {
            thresholds: DEFAULT_THRESHOLDS,
        }
    }
}

impl ExperienceTable {
    /// Build a table from explicit thresholds.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::DataFormat`] if the thresholds decrease.
    pub fn new(thresholds: [i64; LEVEL_COUNT]) -> Result<Self> {
        if let Some(level) = thresholds.windows(2).position(|w| w[1] < w[0]) {
            return Err(MirrorError::DataFormat(format!(
                "experience threshold decreases after index {level}"
            )));
        }
        Ok(Self { thresholds })
    }

    /// Build the table from `experience.txt` records.
    ///
    /// Rows whose `Level` cell is not a number in `0..100` (such as the
    /// `MaxLvl` row) are ignored; every index must be covered exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::DataFormat`] on missing, duplicated or
    /// unparsable rows.
    pub fn from_records(records: &[Record], column: &str) -> Result<Self> {
        let mut thresholds: [Option<i64>; LEVEL_COUNT] = [None; LEVEL_COUNT];

        for record in records {
            let Some(level) = record
                .get("Level")
                .and_then(|cell| cell.trim().parse::<usize>().ok())
                .filter(|level| *level < LEVEL_COUNT)
            else {
                continue;
            };

            let raw = record.get(column).ok_or_else(|| {
                MirrorError::DataFormat(format!("level {level} has no '{column}' column"))
            })?;
            let value = raw.trim().parse::<i64>().map_err(|e| {
                MirrorError::DataFormat(format!("level {level}: bad threshold '{raw}': {e}"))
            })?;

            if thresholds[level].replace(value).is_some() {
                return Err(MirrorError::DataFormat(format!("level {level} listed twice")));
            }
        }

        let mut out = [0_i64; LEVEL_COUNT];
        for (idx, slot) in thresholds.iter().enumerate() {
            out[idx] = slot.ok_or_else(|| {
                MirrorError::DataFormat(format!("experience table is missing level {idx}"))
            })?;
        }
        Self::new(out)
    }

    /// Threshold stored at `index` (the threshold for level `index + 1`).
    #[must_use]
    pub fn at(&self, index: usize) -> Option<i64> {
        self.thresholds.get(index).copied()
    }

    /// All thresholds in level order.
    #[must_use]
    pub fn thresholds(&self) -> &[i64; LEVEL_COUNT] {
        &self.thresholds
    }
}

// ---------------------------------------------------------------------------
// Stat metadata
// ---------------------------------------------------------------------------

/// Metadata for one stat, as listed in `itemstatcost.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatInfo {
    /// Internal stat name (`"fireresist"`).
    pub name: String,
    /// Fixed-point shift applied to stored values.
    pub val_shift: u32,
}

/// Stat metadata keyed by numeric stat id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatMetadata {
    by_id: HashMap<u16, StatInfo>,
}

impl StatMetadata {
    /// Build metadata from `itemstatcost.txt` records.
    ///
    /// The id column is `ID` (older files use `*ID`); a missing `ValShift`
    /// means no shift.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::DataFormat`] if a row has an unparsable id or shift.
    pub fn from_records(records: &[Record]) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(records.len());

        for record in records {
            let Some(raw_id) = record.get("ID").or_else(|| record.get("*ID")) else {
                continue;
            };
            let id = raw_id
                .trim()
                .parse::<u16>()
                .map_err(|e| MirrorError::DataFormat(format!("bad stat id '{raw_id}': {e}")))?;

            let val_shift = match record.get("ValShift").map(|s| s.trim()) {
                None | Some("") => 0,
                Some(raw) => raw.parse::<u32>().map_err(|e| {
                    MirrorError::DataFormat(format!("stat {id}: bad ValShift '{raw}': {e}"))
                })?,
            };

            let name = record.get("Stat").cloned().unwrap_or_default();
            by_id.insert(id, StatInfo { name, val_shift });
        }

        Ok(Self { by_id })
    }

    /// Metadata for a numeric stat id.
    #[must_use]
    pub fn get(&self, id: u16) -> Option<&StatInfo> {
        self.by_id.get(&id)
    }

    /// Shift to apply to `stat`: the loaded `ValShift`, or the built-in one.
    #[must_use]
    pub fn shift_for(&self, stat: Stat) -> u32 {
        self.get(stat.id())
            .map_or_else(|| stat.default_shift(), |info| info.val_shift)
    }

    /// Number of stats described.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether no stat is described.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// Process-wide immutable tables, initialised once and shared by reference.
#[derive(Debug, Clone, Default)]
pub struct GameTables {
    /// Experience curve.
    pub experience: ExperienceTable,
    /// Stat metadata (empty when no `itemstatcost.txt` was configured).
    pub stat_metadata: StatMetadata,
}

impl GameTables {
    /// Load the tables named in `config`, falling back to built-in data for
    /// anything not configured.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured file cannot be read or parsed.
    pub fn load(config: &TablesConfig) -> Result<Arc<Self>> {
        let _span = info_span!(spans::TABLES_LOAD).entered();

        let experience = match &config.experience_file {
            Some(path) => {
                let records = loader::load_tsv(path)?;
                ExperienceTable::from_records(&records, &config.experience_column)?
            }
            None => ExperienceTable::default(),
        };

        let stat_metadata = match &config.stat_cost_file {
            Some(path) => StatMetadata::from_records(&loader::load_tsv(path)?)?,
            None => StatMetadata::default(),
        };

        info!(
            custom_experience = config.experience_file.is_some(),
            stat_rows = stat_metadata.len(),
            "game tables loaded"
        );

        Ok(Arc::new(Self {
            experience,
            stat_metadata,
        }))
    }
}
