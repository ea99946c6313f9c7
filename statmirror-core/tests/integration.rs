//! Integration tests: full refresh flows against a scripted process.
//!
//! These tests drive players and items through discovery, refresh,
//! invalidation, remote failure and classification, using the in-memory
//! process from `reader::mock`.

use std::sync::Arc;
use std::thread;

use statmirror_core::classify::{BucketKind, ClassificationContext, ItemCollectionView};
use statmirror_core::config::MirrorConfig;
use statmirror_core::entity::{ItemEntity, PlayerEntity};
use statmirror_core::reader::mock::{ItemFixture, MockProcess, PlayerFixture};
use statmirror_core::reader::{MemorySource, Process};
use statmirror_core::stats::{RawStat, Stat};
use statmirror_core::tables::{ExperienceTable, GameTables, StatMetadata};
use statmirror_core::types::{Difficulty, Position, RemoteAddress, Resist, UnitId};
use statmirror_core::{MirrorError, UnitLayout};

const PLAYER: UnitId = UnitId(1);

fn raw(stat: Stat, value: i32) -> RawStat {
    RawStat {
        layer: 0,
        id: stat.id(),
        value,
    }
}

fn setup() -> (Arc<MockProcess>, Process, Arc<UnitLayout>) {
    let mock = Arc::new(MockProcess::new());
    let process = Process::new(mock.clone());
    (mock, process, Arc::new(UnitLayout::default()))
}

fn player_fixture() -> PlayerFixture {
    PlayerFixture {
        unit_id: PLAYER,
        name: "Aelric".into(),
        stats: vec![
            raw(Stat::Life, 250 << 8),
            raw(Stat::MaxLife, 500 << 8),
            raw(Stat::Mana, 0),
            raw(Stat::MaxMana, 0),
            raw(Stat::Level, 94),
            raw(Stat::Experience, (2_286_478_756_i64 - (1_i64 << 32)) as i32),
            raw(Stat::ColdResist, 60),
            raw(Stat::MaxColdResist, 5),
        ],
        position: Position { x: 100, y: 200 },
        act_id: 4,
        difficulty: 1,
        ..PlayerFixture::default()
    }
}

// ---------------------------------------------------------------------------
// Player lifecycle: discover → update → cached → invalidate → update
// ---------------------------------------------------------------------------

#[test]
fn player_lifecycle() {
    let (mock, process, layout) = setup();
    let addr = mock.add_player(&layout, &player_fixture());
    let player = PlayerEntity::new(PLAYER, addr, Arc::clone(&layout));

    // Stale with no snapshot until the first update.
    assert!(player.snapshot().is_none());

    let meta = StatMetadata::default();
    let first = player.update(&process).expect("first update");
    assert_eq!(first.name(), "Aelric");
    assert_eq!(first.life(&meta), 250.0);
    assert!(first.mana_percentage(&meta).is_nan(), "max mana 0 has no percentage");
    assert_eq!(first.experience(), 2_286_478_756);
    assert_eq!(first.level_progress(&ExperienceTable::default()), 0.0);
    assert_eq!(first.detail().act.difficulty, Difficulty::Nightmare);
    assert_eq!(first.resists().get(Resist::Cold), 20);

    // Cached: no reads, identical Arc.
    mock.reset_counts();
    let again = player.update(&process).expect("cached");
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(mock.reads(), 0);
    assert_eq!(mock.opens(), 0);

    // Remote change is only seen after invalidation.
    mock.set_stats(&layout, addr, &[raw(Stat::Life, 100 << 8), raw(Stat::MaxLife, 500 << 8)]);
    assert_eq!(player.update(&process).expect("cached").life(&meta), 250.0);
    player.invalidate();
    let refreshed = player.update(&process).expect("refreshed");
    assert_eq!(refreshed.life(&meta), 100.0);
    assert_eq!(refreshed.level(), 0, "missing level defaults to 0");

    // Old holders still see the old table.
    assert_eq!(first.life(&meta), 250.0);
}

#[test]
fn detached_process_yields_none_and_releases_nothing() {
    let (mock, process, layout) = setup();
    let addr = mock.add_player(&layout, &player_fixture());
    let player = PlayerEntity::new(PLAYER, addr, layout);
    let good = player.update(&process).expect("update");

    mock.set_detached(true);
    player.invalidate();
    assert!(player.update(&process).is_none());
    assert!(!player.entity().is_cached());
    assert!(Arc::ptr_eq(&good, &player.snapshot().expect("kept")));

    let counters = process.counters().snapshot();
    assert_eq!(counters.contexts_outstanding(), 0);
    assert_eq!(counters.updates_failed, 1);
    assert_eq!(mock.opens(), mock.closes());
}

#[test]
fn mid_refresh_failure_releases_context() {
    let (mock, process, layout) = setup();
    let addr = mock.add_player(&layout, &player_fixture());
    let player = PlayerEntity::new(PLAYER, addr, Arc::clone(&layout));

    // Header reads fine, the name buffer does not.
    let mut buf = [0_u8; 8];
    mock.read_into(addr.offset(layout.header.unit_data), &mut buf)
        .expect("read unit data pointer");
    let name_ptr = RemoteAddress(u64::from_le_bytes(buf));
    mock.reset_counts();
    mock.poison(name_ptr);

    assert!(player.update(&process).is_none());
    assert_eq!(mock.opens(), 1);
    assert_eq!(mock.closes(), 1);
    assert!(player.snapshot().is_none());
}

#[test]
fn slot_reuse_is_rejected() {
    let (mock, process, layout) = setup();
    let addr = mock.add_player(&layout, &player_fixture());
    mock.set_unit_id(&layout, addr, UnitId(99));

    let player = PlayerEntity::new(PLAYER, addr, layout);
    assert!(matches!(
        player.try_update(&process),
        Err(MirrorError::IdentityMismatch {
            expected: PLAYER,
            found: UnitId(99)
        })
    ));
}

// ---------------------------------------------------------------------------
// Items: refresh and classify
// ---------------------------------------------------------------------------

#[test]
fn refreshed_items_classify_into_buckets() {
    let (mock, process, layout) = setup();
    let merc = UnitId(2);
    let shared = UnitId(20);

    let fixtures = [
        // Equipped helm.
        ItemFixture {
            unit_id: UnitId(100),
            txt_file_no: 300,
            mode: 1,
            owner_id: PLAYER,
            body_loc: 1,
            inv_page: 255,
            ..ItemFixture::default()
        },
        // Backpack.
        ItemFixture {
            unit_id: UnitId(101),
            txt_file_no: 50,
            mode: 0,
            owner_id: PLAYER,
            inv_page: 0,
            ..ItemFixture::default()
        },
        // Mercenary armor.
        ItemFixture {
            unit_id: UnitId(102),
            txt_file_no: 310,
            mode: 1,
            owner_id: merc,
            body_loc: 3,
            inv_page: 255,
            ..ItemFixture::default()
        },
        // Shared stash tab 1.
        ItemFixture {
            unit_id: UnitId(103),
            txt_file_no: 600,
            mode: 0,
            owner_id: shared,
            inv_page: 4,
            ..ItemFixture::default()
        },
        // On the ground.
        ItemFixture {
            unit_id: UnitId(104),
            mode: 3,
            owner_id: PLAYER,
            ..ItemFixture::default()
        },
    ];

    let items: Vec<ItemEntity> = fixtures
        .iter()
        .map(|f| ItemEntity::new(f.unit_id, mock.add_item(&layout, f), Arc::clone(&layout)))
        .collect();
    let snapshots: Vec<_> = items
        .iter()
        .map(|item| item.update(&process).expect("item update"))
        .collect();

    let ctx = ClassificationContext {
        player_id: PLAYER,
        mercenary_id: Some(merc),
        shared_stash_owners: [Some(shared), None, None],
    };
    let view = ItemCollectionView::classify(&snapshots, &ctx).expect("classify");

    assert_eq!(view.len(), 4);
    assert_eq!(view.bucket(BucketKind::Equipped)[0].unit_id(), UnitId(100));
    assert_eq!(view.bucket(BucketKind::Inventory)[0].unit_id(), UnitId(101));
    assert_eq!(view.bucket(BucketKind::Mercenary)[0].unit_id(), UnitId(102));
    assert_eq!(view.bucket(BucketKind::SharedStash1)[0].unit_id(), UnitId(103));
    assert!(view.bucket(BucketKind::PersonalStash).is_empty());
}

#[test]
fn shared_tab_owned_by_player_is_a_conflict() {
    let (mock, process, layout) = setup();
    let fixture = ItemFixture {
        unit_id: UnitId(7),
        mode: 0,
        owner_id: PLAYER,
        inv_page: 4,
        ..ItemFixture::default()
    };
    let item = ItemEntity::new(fixture.unit_id, mock.add_item(&layout, &fixture), layout);
    let snapshot = item.update(&process).expect("update");

    let ctx = ClassificationContext {
        player_id: PLAYER,
        mercenary_id: None,
        shared_stash_owners: [None, Some(PLAYER), None],
    };
    assert!(matches!(
        ItemCollectionView::classify([&snapshot], &ctx),
        Err(MirrorError::ClassificationConflict { .. })
    ));
}

// ---------------------------------------------------------------------------
// Concurrency: readers never see a half-built snapshot
// ---------------------------------------------------------------------------

#[test]
fn concurrent_readers_see_whole_snapshots() {
    let (mock, process, layout) = setup();
    let addr = mock.add_player(&layout, &player_fixture());
    let player = Arc::new(PlayerEntity::new(PLAYER, addr, Arc::clone(&layout)));
    player.update(&process).expect("update");

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let player = Arc::clone(&player);
            thread::spawn(move || {
                for _ in 0..200 {
                    let snap = player.snapshot().expect("snapshot");
                    let meta = StatMetadata::default();
                    // Life and max life are always written together.
                    assert_eq!(snap.max_life(&meta), 2.0 * snap.life(&meta));
                }
            })
        })
        .collect();

    for i in 1..50 {
        mock.set_stats(
            &layout,
            addr,
            &[raw(Stat::Life, i << 8), raw(Stat::MaxLife, (2 * i) << 8)],
        );
        player.invalidate();
        player.update(&process).expect("refresh");
    }

    for reader in readers {
        reader.join().expect("reader thread");
    }
}

// ---------------------------------------------------------------------------
// Configuration and tables from disk
// ---------------------------------------------------------------------------

#[test]
fn config_and_tables_from_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let stat_cost = dir.path().join("itemstatcost.txt");
    std::fs::write(&stat_cost, "Stat\tID\tValShift\nhitpoints\t6\t8\n").expect("write");

    let config_path = dir.path().join("statmirror.toml");
    std::fs::write(
        &config_path,
        format!("[tables]\nstat_cost_file = {:?}\n", stat_cost.display().to_string()),
    )
    .expect("write");

    let config = MirrorConfig::from_file(&config_path).expect("config");
    let tables = GameTables::load(&config.tables).expect("tables");
    assert_eq!(tables.stat_metadata.len(), 1);
    assert_eq!(tables.stat_metadata.shift_for(Stat::Life), 8);
    assert_eq!(tables.experience, ExperienceTable::default());
}

#[test]
fn missing_table_file_is_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = MirrorConfig::from_toml(&format!(
        "[tables]\nexperience_file = {:?}\n",
        dir.path().join("nope.txt").display().to_string()
    ))
    .expect("config");
    assert!(matches!(
        GameTables::load(&config.tables),
        Err(MirrorError::Io(_))
    ));
}
