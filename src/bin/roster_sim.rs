use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use rand::Rng;
use rayon::prelude::*;

use roster_stats::clock::{Clock, ManualClock};
use roster_stats::collab::{FetchSink, StaticGate};
use roster_stats::config::Settings;
use roster_stats::identity::{
    CachedStats, PlayerId, ResolvedStat, StatKind, prestige_from_experience, ratio_from_counts,
};
use roster_stats::metrics::GlyphTableMetrics;
use roster_stats::pipeline::{RosterEntry, RosterPipeline};
use roster_stats::stats_cache::StatsCache;
use roster_stats::throttle::FetchThrottle;

const FRAME_MS: u64 = 50;

#[derive(Default)]
struct QueueSink {
    requests: Mutex<Vec<(PlayerId, StatKind)>>,
}

impl QueueSink {
    fn drain(&self) -> Vec<(PlayerId, StatKind)> {
        match self.requests.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(_) => Vec::new(),
        }
    }
}

impl FetchSink for QueueSink {
    fn submit_fetch_request(&self, id: PlayerId, kind: StatKind) {
        if let Ok(mut guard) = self.requests.lock() {
            guard.push((id, kind));
        }
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    env_logger::init();

    let settings = Settings::from_env();
    let frames = std::env::var("SIM_FRAMES")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(12_000)
        .clamp(1, 1_000_000);

    let clock = Arc::new(ManualClock::new(0));
    let cache = Arc::new(StatsCache::new(
        settings.stats_cache_max,
        settings.stats_cache_ttl_ms(),
    ));
    let sink = Arc::new(QueueSink::default());
    let throttle = Arc::new(FetchThrottle::new(settings.throttle));
    let mut pipeline = RosterPipeline::new(
        StaticGate::default(),
        cache.clone(),
        sink.clone(),
        throttle.clone(),
        GlyphTableMetrics,
        StatKind::Bedwars,
    )
    .with_refresh_after(settings.stats_cache_ttl_ms());

    let mut rng = rand::thread_rng();
    let mut roster: Vec<RosterEntry> = (0..settings.roster_size)
        .map(|idx| RosterEntry::new(PlayerId::random(), format!("Player{idx}")))
        .collect();
    let mut pending: Vec<(u64, PlayerId, StatKind)> = Vec::new();
    let mut submitted = 0usize;
    let mut failed = 0usize;
    let mut widest_padding = 0usize;

    for frame in 0..frames {
        let now = clock.advance(FRAME_MS);

        let (due, waiting): (Vec<_>, Vec<_>) =
            pending.into_iter().partition(|(at, _, _)| *at <= now);
        pending = waiting;
        for (_, id, kind) in due {
            if rng.gen_bool(settings.fetch_failure_rate) {
                failed += 1;
                continue;
            }
            let stat = ResolvedStat {
                ratio: ratio_from_counts(rng.gen_range(0..4_000), rng.gen_range(0..800)),
                prestige_level: Some(prestige_from_experience(rng.gen_range(0..10_000_000))),
            };
            cache.put(id, kind, CachedStats::new(stat, now));
        }

        for entry in &roster {
            let row = pipeline.render_row(entry, now);
            let padding = row.padded_name.len() - entry.name.len();
            widest_padding = widest_padding.max(padding);
        }

        for (id, kind) in sink.drain() {
            submitted += 1;
            pending.push((now + settings.fetch_latency_ms, id, kind));
        }

        // Roughly one leave/join every ten seconds of simulated time.
        if frame % 200 == 199 && !roster.is_empty() {
            let idx = rng.gen_range(0..roster.len());
            roster.swap_remove(idx);
            roster.push(RosterEntry::new(
                PlayerId::random(),
                format!("Player{}", settings.roster_size as u64 + frame),
            ));
        }
    }

    let snap = throttle.snapshot();
    println!("Simulated {:.1}s over {frames} frames", clock.now_ms() as f64 / 1000.0);
    println!("Fetch requests submitted: {submitted} (failed {failed})");
    println!(
        "Throttle: tracked {} allowed {} blocked {} sweeps {} evicted {}",
        snap.tracked, snap.allowed, snap.blocked, snap.sweeps, snap.evicted
    );
    println!("Cache entries: {}", cache.len());
    println!("Widest name padding: {widest_padding} spaces");

    // Many callers deciding for the same players at the same instant: each
    // player must be allowed exactly once.
    let stress = FetchThrottle::new(settings.throttle);
    let ids: Vec<PlayerId> = (0..256).map(|_| PlayerId::random()).collect();
    let allowed: usize = (0..16)
        .into_par_iter()
        .map(|_| ids.iter().filter(|id| stress.should_fetch(**id, 1_000)).count())
        .sum();
    anyhow::ensure!(
        allowed == ids.len(),
        "concurrent throttle allowed {allowed} fetches for {} players",
        ids.len()
    );
    println!("Concurrent check: {allowed} fetches for {} players", ids.len());

    let summary = serde_json::to_string_pretty(&serde_json::json!({
        "submitted": submitted,
        "failed": failed,
        "tracked": snap.tracked,
        "sweeps": snap.sweeps,
        "cache_entries": cache.len(),
    }))
    .context("serialize summary")?;
    println!("{summary}");

    Ok(())
}
