use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use roster_stats::collab::{FetchSink, StaticGate, StatsSource};
use roster_stats::identity::{CachedStats, PlayerId, ResolvedStat, StatKind};
use roster_stats::metrics::GlyphTableMetrics;
use roster_stats::pipeline::{RosterEntry, RosterPipeline};
use roster_stats::stats_cache::StatsCache;
use roster_stats::throttle::FetchThrottle;

#[derive(Default)]
struct RecordingSink {
    requests: Mutex<Vec<(PlayerId, StatKind)>>,
}

impl RecordingSink {
    fn requests(&self) -> Vec<(PlayerId, StatKind)> {
        self.requests.lock().expect("sink lock").clone()
    }
}

impl FetchSink for RecordingSink {
    fn submit_fetch_request(&self, id: PlayerId, kind: StatKind) {
        self.requests.lock().expect("sink lock").push((id, kind));
    }
}

/// Answers `before` for the first `switch_after` lookups and `after` from then
/// on, like a fetch completion landing mid-row.
struct ShiftingSource {
    lookups: AtomicUsize,
    switch_after: usize,
    before: Option<CachedStats>,
    after: Option<CachedStats>,
}

impl StatsSource for ShiftingSource {
    fn resolve_cached_stat(&self, _id: PlayerId, _kind: StatKind) -> Option<CachedStats> {
        let seen = self.lookups.fetch_add(1, Ordering::SeqCst);
        if seen < self.switch_after {
            self.before
        } else {
            self.after
        }
    }
}

fn shifting_pipeline(
    before: Option<CachedStats>,
    after: Option<CachedStats>,
) -> RosterPipeline<StaticGate, ShiftingSource, Arc<RecordingSink>, GlyphTableMetrics> {
    RosterPipeline::new(
        StaticGate::default(),
        ShiftingSource {
            lookups: AtomicUsize::new(0),
            switch_after: 1,
            before,
            after,
        },
        Arc::new(RecordingSink::default()),
        Arc::new(FetchThrottle::default()),
        GlyphTableMetrics,
        StatKind::Bedwars,
    )
}

type TestPipeline =
    RosterPipeline<Arc<StaticGate>, Arc<StatsCache>, Arc<RecordingSink>, GlyphTableMetrics>;

struct Harness {
    gate: Arc<StaticGate>,
    cache: Arc<StatsCache>,
    sink: Arc<RecordingSink>,
    pipeline: TestPipeline,
}

fn harness() -> Harness {
    let gate = Arc::new(StaticGate::default());
    let cache = Arc::new(StatsCache::new(100, 60_000));
    let sink = Arc::new(RecordingSink::default());
    let pipeline = RosterPipeline::new(
        gate.clone(),
        cache.clone(),
        sink.clone(),
        Arc::new(FetchThrottle::default()),
        GlyphTableMetrics,
        StatKind::Bedwars,
    );
    Harness {
        gate,
        cache,
        sink,
        pipeline,
    }
}

fn steve() -> RosterEntry {
    RosterEntry::new(PlayerId::from_u128(0x5737), "Steve")
}

fn cache_stat(h: &Harness, entry: &RosterEntry, ratio: f64, fetched_at: u64) {
    let id = entry.id.expect("entry should have an id");
    h.cache.put(
        id,
        StatKind::Bedwars,
        CachedStats::new(ResolvedStat::new(Some(ratio), None), fetched_at),
    );
}

#[test]
fn cached_stats_render_label_and_pad_name() {
    let mut h = harness();
    let entry = steve();
    cache_stat(&h, &entry, 2.0, 0);

    let row = h.pipeline.render_row(&entry, 1_000);
    let label = row.label.expect("label should render");
    assert_eq!(label.text, "Steve§7 : §f2.00");
    assert_eq!(label.measured_extra_width, 30);
    assert_eq!(row.padded_name, format!("Steve{}", " ".repeat(8)));
    assert!(h.sink.requests().is_empty());
}

#[test]
fn cache_miss_requests_fetch_through_the_throttle() {
    let mut h = harness();
    let entry = steve();
    let id = entry.id.expect("entry should have an id");

    let row = h.pipeline.render_row(&entry, 0);
    assert!(row.label.is_none());
    assert_eq!(row.padded_name, "Steve");
    assert_eq!(h.sink.requests(), vec![(id, StatKind::Bedwars)]);

    // Rendered every frame; only one request per retry window.
    for now in (50..4_000).step_by(50) {
        h.pipeline.render_row(&entry, now);
    }
    assert_eq!(h.sink.requests().len(), 1);

    h.pipeline.render_row(&entry, 4_000);
    assert_eq!(h.sink.requests().len(), 2);
}

#[test]
fn disabled_gate_does_nothing() {
    let mut h = harness();
    let entry = steve();
    cache_stat(&h, &entry, 7.0, 0);

    h.gate.set_enabled(false);
    let row = h.pipeline.render_row(&entry, 0);
    assert!(row.label.is_none());
    assert_eq!(row.padded_name, "Steve");

    h.gate.set_enabled(true);
    h.gate.set_eligible(false);
    let miss = RosterEntry::new(PlayerId::from_u128(77), "Alex");
    assert!(h.pipeline.name_hook(&miss, 0).is_none());
    assert!(h.sink.requests().is_empty());
}

#[test]
fn synthetic_identities_are_skipped() {
    let mut h = harness();
    let npc_id = PlayerId::parse("00000000-0000-2000-8000-000000000001").expect("valid uuid");
    assert!(npc_id.is_synthetic());
    let npc = RosterEntry::new(npc_id, "Shopkeeper");

    let row = h.pipeline.render_row(&npc, 0);
    assert!(row.label.is_none());
    assert_eq!(row.padded_name, "Shopkeeper");
    assert!(h.sink.requests().is_empty());
}

#[test]
fn nicked_players_get_no_label() {
    let mut h = harness();
    let entry = steve();
    let id = entry.id.expect("entry should have an id");
    h.cache.put(id, StatKind::Bedwars, CachedStats::nicked(0));

    let row = h.pipeline.render_row(&entry, 10);
    assert!(row.label.is_none());
    assert_eq!(row.padded_name, "Steve");
    assert!(h.sink.requests().is_empty());
}

#[test]
fn stale_stats_render_and_request_refresh() {
    let h = harness();
    let mut pipeline = h.pipeline.with_refresh_after(60_000);
    let entry = steve();
    let id = entry.id.expect("entry should have an id");
    h.cache.put(
        id,
        StatKind::Bedwars,
        CachedStats::new(ResolvedStat::new(Some(3.2), Some(150)), 0),
    );

    assert!(pipeline.name_hook(&entry, 59_999).is_some());
    assert!(h.sink.requests().is_empty());

    let label = pipeline.name_hook(&entry, 60_000).expect("stale stats still render");
    assert_eq!(label.plain_text(), "[150✪] Steve : 3.20");
    assert_eq!(h.sink.requests(), vec![(id, StatKind::Bedwars)]);
}

#[test]
fn idless_row_does_not_inherit_previous_padding() {
    let mut h = harness();
    let entry = steve();
    cache_stat(&h, &entry, 2.0, 0);

    let first = h.pipeline.render_row(&entry, 0);
    assert!(first.padded_name.len() > "Steve".len());

    let bot = RosterEntry {
        id: None,
        name: "Steve".to_string(),
    };
    let second = h.pipeline.render_row(&bot, 0);
    assert!(second.label.is_none());
    assert_eq!(second.padded_name, "Steve");
    assert_eq!(h.pipeline.current_row(), None);
}

#[test]
fn width_hook_follows_the_last_captured_row() {
    let mut h = harness();
    let a = steve();
    let b = RosterEntry::new(PlayerId::from_u128(0xb0b), "Bob");
    cache_stat(&h, &a, 2.0, 0);

    h.pipeline.name_hook(&a, 0);
    assert_eq!(h.pipeline.width_hook("Steve"), format!("Steve{}", " ".repeat(8)));

    // B has no stats: its width hook must not reuse A's label.
    h.pipeline.name_hook(&b, 0);
    assert_eq!(h.pipeline.current_row(), b.id);
    assert_eq!(h.pipeline.width_hook("Bob"), "Bob");
}

#[test]
fn switching_game_requests_that_game() {
    let mut h = harness();
    let entry = steve();
    let id = entry.id.expect("entry should have an id");
    cache_stat(&h, &entry, 2.0, 0);

    h.pipeline.set_kind(StatKind::Duels);
    assert!(h.pipeline.name_hook(&entry, 0).is_none());
    assert_eq!(h.sink.requests(), vec![(id, StatKind::Duels)]);
}

#[test]
fn stats_arriving_between_hooks_do_not_pad_the_row() {
    let late = CachedStats::new(ResolvedStat::new(Some(2.0), Some(150)), 0);
    let mut pipeline = shifting_pipeline(None, Some(late));

    let row = pipeline.render_row(&steve(), 0);
    assert!(row.label.is_none());
    assert_eq!(row.padded_name, "Steve");

    // Next frame picks the stats up in both hooks.
    let row = pipeline.render_row(&steve(), 50);
    let label = row.label.expect("label should render once stats exist");
    let spaces = row.padded_name.len() - "Steve".len();
    assert_eq!(spaces, (label.measured_extra_width as usize).div_ceil(4));
}

#[test]
fn stats_vanishing_between_hooks_still_pad_the_drawn_label() {
    let early = CachedStats::new(ResolvedStat::new(Some(2.0), None), 0);
    let mut pipeline = shifting_pipeline(Some(early), None);

    let row = pipeline.render_row(&steve(), 0);
    let label = row.label.expect("label should render");
    assert_eq!(label.measured_extra_width, 30);
    assert_eq!(row.padded_name, format!("Steve{}", " ".repeat(8)));
}
