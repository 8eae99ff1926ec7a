//! Seed controller behaviour seen through whole sessions.
//!
//! Run with: cargo test --test seeds

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use nle_bridge::obs::{BLSTATS, CHARS, MESSAGE, NLE_BLSTATS_SIZE};
use nle_bridge::sim::demo::DemoLoader;
use nle_bridge::{Channel, ObservationBuffers, Seeds, Session, Settings};

fn module(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"").unwrap();
    path
}

/// Everything the caller can see after each step.
#[derive(Debug, PartialEq, Eq)]
struct Snapshot {
    chars: Vec<u8>,
    blstats: Vec<i64>,
    message: Vec<u8>,
}

/// Play `actions` from `seeds` and record every observation.
fn play(path: &Path, seeds: Seeds, actions: &[u8]) -> Vec<Snapshot> {
    let mut chars = vec![0u8; Channel::Chars.element_count()];
    let mut blstats = vec![0i64; NLE_BLSTATS_SIZE];
    let mut message = vec![0u8; Channel::Message.element_count()];
    let settings = Settings {
        initial_seeds: Some(seeds),
        ..Settings::default()
    };

    let mut session = Session::new(path, &DemoLoader, settings).unwrap();
    session
        .set_buffers(
            ObservationBuffers::new()
                .with(CHARS, &mut chars)
                .unwrap()
                .with(BLSTATS, &mut blstats)
                .unwrap()
                .with(MESSAGE, &mut message)
                .unwrap(),
        )
        .unwrap();
    session.start(None).unwrap();

    let snapshot = |s: &Session<'_>| Snapshot {
        chars: s.observation(CHARS).unwrap().to_vec(),
        blstats: s.observation(BLSTATS).unwrap().to_vec(),
        message: s.observation(MESSAGE).unwrap().to_vec(),
    };
    let mut snapshots = vec![snapshot(&session)];
    for &action in actions {
        if session.step(i32::from(action)).unwrap() {
            snapshots.push(snapshot(&session));
            break;
        }
        snapshots.push(snapshot(&session));
    }
    snapshots
}

const WALK: &[u8] = b"hhhhjjjjllllkkkkyubnsssssssshjkl>>>lllllssss";

#[test]
fn test_same_seeds_same_episode() {
    let dir = tempfile::tempdir().unwrap();
    let seeds = Seeds::new(1234, 5678, false);
    let a = play(&module(&dir, "a.so"), seeds, WALK);
    let b = play(&module(&dir, "b.so"), seeds, WALK);
    assert_eq!(a, b);
}

#[test]
fn test_reseed_flag_changes_nothing_before_a_reseed_point() {
    let dir = tempfile::tempdir().unwrap();
    let plain = play(&module(&dir, "a.so"), Seeds::new(1, 2, false), b"ssss");
    let reseeding = play(&module(&dir, "b.so"), Seeds::new(1, 2, true), b"ssss");
    assert_eq!(plain[0].chars, reseeding[0].chars);
}

#[test]
fn test_generation_seed_fixes_the_layout() {
    let dir = tempfile::tempdir().unwrap();
    let a = play(&module(&dir, "a.so"), Seeds::new(1, 2, false).with_lgen(Some(77)), b"");
    let b = play(&module(&dir, "b.so"), Seeds::new(3, 4, false).with_lgen(Some(77)), b"");
    assert_eq!(a[0].chars, b[0].chars);
}

#[test]
fn test_initial_seeds_are_one_shot() {
    let dir = tempfile::tempdir().unwrap();
    let path = module(&dir, "libnethack.so");
    let mut session = Session::new(&path, &DemoLoader, Settings::default()).unwrap();

    session.set_initial_seeds(Seeds::new(7, 8, true)).unwrap();
    session.start(None).unwrap();
    assert_eq!(session.get_seeds().unwrap().as_tuple(), (7, 8, true, None));
    assert!(!session.seeds_pending());

    session.reset(None).unwrap();
    let drawn = session.get_seeds().unwrap();
    assert_ne!((drawn.core, drawn.disp), (7, 8));
    assert!(drawn.reseed);
    assert_eq!(drawn.lgen, None);
}

#[test]
fn test_live_reseed_keeps_the_episode_running() {
    let dir = tempfile::tempdir().unwrap();
    let path = module(&dir, "libnethack.so");
    let mut session = Session::new(&path, &DemoLoader, Settings::default()).unwrap();
    session.start(None).unwrap();
    session.step(i32::from(b's')).unwrap();

    session
        .set_seeds(Seeds::new(11, 12, false).with_lgen(Some(13)))
        .unwrap();
    assert_eq!(
        session.get_seeds().unwrap().as_tuple(),
        (11, 12, false, Some(13))
    );
    assert!(!session.step(i32::from(b's')).unwrap());
    assert_eq!(session.steps(), 2);
}
