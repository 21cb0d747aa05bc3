use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rand::Rng;
use rand::seq::SliceRandom;
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::identity::{
    CachedStats, PlayerId, ResolvedStat, StatKind, prestige_from_experience, ratio_from_counts,
};
use crate::pipeline::RosterEntry;
use crate::state::{Delta, ProviderCommand};

const NAME_PARTS: [&str; 16] = [
    "Ash", "Bolt", "Crow", "Dusk", "Echo", "Flint", "Gale", "Hex", "Iris", "Jinx", "Kite", "Lynx",
    "Moss", "Nova", "Onyx", "Pike",
];

const CHURN_INTERVAL: Duration = Duration::from_secs(5);
const NPC_CHANCE: f64 = 0.08;
const NICKED_CHANCE: f64 = 0.05;

/// Simulated roster source and stats service. Roster churn runs on the
/// provider thread; fetch requests resolve on a rayon pool after a jittered
/// delay, some of them failing.
pub fn spawn_fake_provider(
    settings: Settings,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut rng = rand::thread_rng();
        let pool = build_fetch_pool(settings.fetch_parallelism);
        let mut roster: Vec<PlayerId> = Vec::new();
        let mut paused = false;

        for _ in 0..settings.roster_size {
            let entry = random_entry(&mut rng);
            if let Some(id) = entry.id {
                roster.push(id);
            }
            let _ = tx.send(Delta::PlayerJoined(entry));
        }
        let _ = tx.send(Delta::Log(format!(
            "[INFO] Roster seeded with {} players",
            roster.len()
        )));

        let mut last_churn = Instant::now();
        loop {
            match cmd_rx.recv_timeout(Duration::from_millis(200)) {
                Ok(ProviderCommand::FetchStats { id, kind }) => {
                    let tx = tx.clone();
                    let latency = settings.fetch_latency_ms;
                    let failure_rate = settings.fetch_failure_rate;
                    let job = move || resolve_fetch(id, kind, latency, failure_rate, &tx);
                    match pool.as_ref() {
                        Some(pool) => pool.spawn(job),
                        None => {
                            thread::spawn(job);
                        }
                    }
                }
                Ok(ProviderCommand::SetPaused(value)) => paused = value,
                Ok(ProviderCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }

            if paused || last_churn.elapsed() < CHURN_INTERVAL {
                continue;
            }
            last_churn = Instant::now();

            if !roster.is_empty() && rng.gen_bool(0.5) {
                let idx = rng.gen_range(0..roster.len());
                let id = roster.swap_remove(idx);
                let _ = tx.send(Delta::PlayerLeft(id));
            }
            if roster.len() < settings.roster_size {
                let entry = random_entry(&mut rng);
                if let Some(id) = entry.id {
                    roster.push(id);
                }
                let _ = tx.send(Delta::PlayerJoined(entry));
            }
        }
    })
}

fn resolve_fetch(
    id: PlayerId,
    kind: StatKind,
    latency_ms: u64,
    failure_rate: f64,
    tx: &Sender<Delta>,
) {
    let mut rng = rand::thread_rng();
    let jitter = if latency_ms == 0 {
        0
    } else {
        rng.gen_range(0..=latency_ms)
    };
    thread::sleep(Duration::from_millis(latency_ms / 2 + jitter));

    if rng.gen_bool(failure_rate) {
        let _ = tx.send(Delta::FetchFailed {
            id,
            reason: "simulated upstream timeout".to_string(),
        });
        return;
    }

    let now = SystemClock.now_ms();
    let stats = if rng.gen_bool(NICKED_CHANCE) {
        CachedStats::nicked(now)
    } else {
        CachedStats::new(random_stat(&mut rng), now)
    };
    let _ = tx.send(Delta::StatsResolved { id, kind, stats });
}

fn random_stat(rng: &mut impl Rng) -> ResolvedStat {
    let deaths: u64 = rng.gen_range(0..2_000);
    let skill = rng.gen_range(0.05..12.0_f64);
    let kills = (deaths as f64 * skill) as u64;
    let experience: i64 = if rng.gen_bool(0.1) {
        -1
    } else {
        rng.gen_range(0..12_000_000)
    };
    ResolvedStat {
        ratio: ratio_from_counts(kills, deaths),
        prestige_level: (experience >= 0).then(|| prestige_from_experience(experience)),
    }
}

fn random_entry(rng: &mut impl Rng) -> RosterEntry {
    let first = NAME_PARTS.choose(rng).copied().unwrap_or("Anon");
    let second = NAME_PARTS.choose(rng).copied().unwrap_or("Anon");
    let name = format!("{first}{second}{}", rng.gen_range(1..100));
    let id = if rng.gen_bool(NPC_CHANCE) {
        synthetic_id(rng)
    } else {
        PlayerId::random()
    };
    RosterEntry::new(id, name)
}

// Version-2 ids mark server-side NPC rows.
fn synthetic_id(rng: &mut impl Rng) -> PlayerId {
    let mut bytes: [u8; 16] = rng.r#gen();
    bytes[6] = (bytes[6] & 0x0f) | 0x20;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    PlayerId::new(Uuid::from_bytes(bytes))
}

fn build_fetch_pool(threads: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|idx| format!("stats-fetch-{idx}"))
        .build()
        .ok()
}
