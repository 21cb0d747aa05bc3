use std::sync::Barrier;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use roster_stats::clock::ManualClock;
use roster_stats::identity::PlayerId;
use roster_stats::throttle::{FetchThrottle, ThrottleConfig};

fn ids(n: u128) -> Vec<PlayerId> {
    (1..=n).map(PlayerId::from_u128).collect()
}

#[test]
fn second_call_inside_retry_window_is_blocked() {
    let throttle = FetchThrottle::default();
    let id = PlayerId::from_u128(42);

    assert!(throttle.should_fetch(id, 1_000));
    assert!(!throttle.should_fetch(id, 1_001));
    assert!(!throttle.should_fetch(id, 4_999));
    assert!(throttle.should_fetch(id, 5_000));
    assert_eq!(throttle.tracked(), 1);
}

#[test]
fn identities_are_throttled_independently() {
    let throttle = FetchThrottle::default();
    let a = PlayerId::from_u128(1);
    let b = PlayerId::from_u128(2);

    assert!(throttle.should_fetch(a, 0));
    assert!(throttle.should_fetch(b, 10));
    assert!(!throttle.should_fetch(a, 20));
    assert!(!throttle.should_fetch(b, 20));
    assert_eq!(throttle.tracked(), 2);
}

#[test]
fn scenario_from_first_sight_to_ttl_expiry() {
    let throttle = FetchThrottle::default();
    let u = PlayerId::from_u128(7);

    assert!(throttle.should_fetch(u, 0));
    assert!(!throttle.should_fetch(u, 2_000));
    assert!(throttle.should_fetch(u, 4_000));
    assert_eq!(throttle.sweeps(), 0);

    // First call past the TTL triggers the sweep, which drops U's record
    // before the lookup, so U is treated as brand new.
    assert!(throttle.should_fetch(u, 400_000));
    let snap = throttle.snapshot();
    assert_eq!(snap.sweeps, 1);
    assert_eq!(snap.evicted, 1);
    assert_eq!(snap.last_sweep_at, 400_000);
    assert_eq!(throttle.last_attempt(&u), Some(400_000));
    assert!(!throttle.should_fetch(u, 401_000));
}

#[test]
fn sweep_removes_expired_records_and_keeps_young_ones() {
    let throttle = FetchThrottle::default();
    let old = ids(50);
    let young: Vec<PlayerId> = (100..120).map(PlayerId::from_u128).collect();

    for id in &old {
        assert!(throttle.should_fetch(*id, 0));
    }
    // Sweep at 200s removes nothing: the old records are 200s old.
    for id in &young {
        assert!(throttle.should_fetch(*id, 200_000));
    }
    assert_eq!(throttle.sweeps(), 1);
    assert_eq!(throttle.tracked(), 70);

    let probe = PlayerId::from_u128(999);
    assert!(throttle.should_fetch(probe, 400_000));
    assert_eq!(throttle.sweeps(), 2);
    assert_eq!(throttle.tracked(), young.len() + 1);
    for id in &old {
        assert!(!throttle.is_tracked(id));
    }
    for id in &young {
        assert_eq!(throttle.last_attempt(id), Some(200_000));
    }
}

#[test]
fn record_exactly_at_ttl_survives_the_sweep() {
    let throttle = FetchThrottle::default();
    let id = PlayerId::from_u128(3);
    assert!(throttle.should_fetch(id, 100_000));

    assert_eq!(throttle.force_sweep(400_000), 0);
    assert!(throttle.is_tracked(&id));
    assert_eq!(throttle.force_sweep(400_001), 1);
    assert!(!throttle.is_tracked(&id));
}

#[test]
fn sweeps_run_at_most_once_per_cleanup_interval() {
    let throttle = FetchThrottle::default();
    let id = PlayerId::from_u128(1);

    for now in (60_000..120_000).step_by(250) {
        throttle.should_fetch(id, now);
    }
    assert_eq!(throttle.sweeps(), 1);
    assert_eq!(throttle.last_sweep_at(), 60_000);

    throttle.should_fetch(id, 120_000);
    assert_eq!(throttle.sweeps(), 2);
}

#[test]
fn custom_intervals_are_honoured() {
    let throttle = FetchThrottle::new(ThrottleConfig {
        retry_interval_ms: 100,
        entry_ttl_ms: 1_000,
        cleanup_interval_ms: 500,
    });
    let id = PlayerId::from_u128(5);
    assert!(throttle.should_fetch(id, 0));
    assert!(!throttle.should_fetch(id, 99));
    assert!(throttle.should_fetch(id, 100));

    assert!(throttle.should_fetch(PlayerId::from_u128(6), 1_101));
    assert!(!throttle.is_tracked(&id));
}

#[test]
fn manual_clock_drives_the_throttle() {
    let clock = ManualClock::new(0);
    let throttle = FetchThrottle::default();
    let id = PlayerId::from_u128(11);

    assert!(throttle.should_fetch_with(id, &clock));
    clock.advance(3_999);
    assert!(!throttle.should_fetch_with(id, &clock));
    clock.advance(1);
    assert!(throttle.should_fetch_with(id, &clock));
}

#[test]
fn concurrent_callers_allow_one_fetch_per_identity() {
    let throttle = FetchThrottle::default();
    let players = ids(64);
    let allowed = AtomicUsize::new(0);
    let barrier = Barrier::new(8);

    thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                barrier.wait();
                for id in &players {
                    if throttle.should_fetch(*id, 5_000) {
                        allowed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            });
        }
    });

    assert_eq!(allowed.load(Ordering::Relaxed), players.len());
    assert_eq!(throttle.tracked(), players.len());
}

#[test]
fn concurrent_callers_sweep_once() {
    let throttle = FetchThrottle::default();
    for id in ids(32) {
        throttle.should_fetch(id, 0);
    }
    let barrier = Barrier::new(8);

    thread::scope(|scope| {
        for worker in 0..8u128 {
            let throttle = &throttle;
            let barrier = &barrier;
            scope.spawn(move || {
                barrier.wait();
                for n in 0..50u128 {
                    throttle.should_fetch(PlayerId::from_u128(1_000 + worker * 100 + n), 360_000);
                }
            });
        }
    });

    let snap = throttle.snapshot();
    assert_eq!(snap.sweeps, 1);
    assert_eq!(snap.evicted, 32);
    assert_eq!(snap.tracked, 400);
}
