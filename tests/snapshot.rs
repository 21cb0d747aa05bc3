use std::fs;
use std::path::PathBuf;

use roster_stats::identity::{CachedStats, PlayerId, ResolvedStat, StatKind};
use roster_stats::stats_cache::StatsCache;

fn scratch_path(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "roster_stats_{tag}_{}_{}",
        std::process::id(),
        PlayerId::random().trimmed()
    ));
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir.join("stats_cache.json")
}

#[test]
fn snapshot_round_trips_through_disk() {
    let path = scratch_path("roundtrip");
    let cache = StatsCache::new(16, 60_000);
    let a = PlayerId::from_u128(1);
    let b = PlayerId::from_u128(2);
    let stats_a = CachedStats::new(ResolvedStat::new(Some(3.25), Some(412)), 500);
    cache.put(a, StatKind::Bedwars, stats_a);
    cache.put(b, StatKind::Duels, CachedStats::nicked(900));

    cache.save_snapshot(&path).expect("snapshot should save");
    assert!(!path.with_extension("json.tmp").exists());

    let restored = StatsCache::new(16, 60_000);
    assert_eq!(restored.load_snapshot(&path), 2);
    assert_eq!(restored.get(a, StatKind::Bedwars), Some(stats_a));
    let nicked = restored.get(b, StatKind::Duels).expect("nicked entry restored");
    assert!(nicked.nicked);
    assert_eq!(nicked.fetched_at_ms, 900);

    let _ = fs::remove_dir_all(path.parent().expect("scratch dir"));
}

#[test]
fn missing_or_outdated_snapshot_loads_nothing() {
    let path = scratch_path("outdated");
    let cache = StatsCache::new(16, 60_000);
    assert_eq!(cache.load_snapshot(&path), 0);

    fs::write(&path, r#"{"version":99,"entries":[]}"#).expect("write outdated snapshot");
    assert_eq!(cache.load_snapshot(&path), 0);

    fs::write(&path, "not json").expect("write corrupt snapshot");
    assert_eq!(cache.load_snapshot(&path), 0);
    assert!(cache.is_empty());

    let _ = fs::remove_dir_all(path.parent().expect("scratch dir"));
}

#[test]
fn restored_entries_respect_the_size_cap() {
    let path = scratch_path("cap");
    let cache = StatsCache::new(8, 60_000);
    for n in 0..8u128 {
        cache.put(
            PlayerId::from_u128(n),
            StatKind::Bedwars,
            CachedStats::new(ResolvedStat::new(Some(1.0), None), n as u64),
        );
    }
    cache.save_snapshot(&path).expect("snapshot should save");

    let small = StatsCache::new(3, 60_000);
    assert_eq!(small.load_snapshot(&path), 8);
    assert_eq!(small.len(), 3);
    // Entries are written oldest first, so the newest survive.
    for n in 5..8u128 {
        assert!(small.get(PlayerId::from_u128(n), StatKind::Bedwars).is_some());
    }

    let _ = fs::remove_dir_all(path.parent().expect("scratch dir"));
}
