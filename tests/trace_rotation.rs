//! Trace recording across resets.
//!
//! Run with: cargo test --test trace_rotation

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use nle_bridge::context::{Host, InputRequest};
use nle_bridge::error::{Interrupted, LoadError};
use nle_bridge::sim::demo::DemoLoader;
use nle_bridge::trace::{FrameChannel, read_trace};
use nle_bridge::{
    BridgeError, EndCause, Lifecycle, ModuleLoader, Seeds, Session, Settings, Simulation,
    SimulationModule, ValidationError,
};

fn module(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("libnethack.so");
    std::fs::write(&path, b"").unwrap();
    path
}

fn settings() -> Settings {
    Settings {
        initial_seeds: Some(Seeds::new(3, 4, false)),
        spawn_monsters: false,
        ..Settings::default()
    }
}

fn entries(dir: &Path) -> BTreeSet<OsString> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect()
}

/// Waits for input forever, or exits before asking when `exit_at_once`.
struct Episode {
    exit_at_once: bool,
}

impl Simulation for Episode {
    fn run(&mut self, host: &mut Host) -> Result<EndCause, Interrupted> {
        host.record(b"welcome");
        if self.exit_at_once {
            return Ok(EndCause::Quit);
        }
        loop {
            host.wait_for_input(InputRequest::default())?;
            host.record(b"turn");
        }
    }
}

/// Its second episode ends before the first input request.
struct SecondEpisodeQuits(Arc<AtomicU32>);

impl SimulationModule for SecondEpisodeQuits {
    fn name(&self) -> &str {
        "second-episode-quits"
    }

    fn instantiate(&self, _settings: &Settings, _trace_name: &str) -> Box<dyn Simulation> {
        let n = self.0.fetch_add(1, Ordering::SeqCst);
        Box::new(Episode { exit_at_once: n == 1 })
    }
}

struct SecondEpisodeQuitsLoader;

impl ModuleLoader for SecondEpisodeQuitsLoader {
    fn load(&self, _path: &Path) -> Result<Arc<dyn SimulationModule>, LoadError> {
        Ok(Arc::new(SecondEpisodeQuits(Arc::new(AtomicU32::new(0)))))
    }
}

fn input_count(path: &Path) -> usize {
    read_trace(path)
        .unwrap()
        .iter()
        .filter(|f| f.channel == FrameChannel::Input)
        .count()
}

#[test]
fn test_rotation_keeps_episodes_apart() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("ep1.ttyrec");
    let second = dir.path().join("ep2.ttyrec");

    let mut session = Session::new(&module(&dir), &DemoLoader, settings()).unwrap();
    session.start(Some(&first)).unwrap();
    assert_eq!(session.trace_name(), "ep1.ttyrec");
    for _ in 0..5 {
        session.step(i32::from(b's')).unwrap();
    }

    session.reset(Some(&second)).unwrap();
    assert_eq!(session.trace_name(), "ep2.ttyrec");
    assert_eq!(session.trace_path(), Some(second.as_path()));
    for _ in 0..3 {
        session.step(i32::from(b's')).unwrap();
    }
    session.end().unwrap();

    assert_eq!(input_count(&first), 5);
    assert_eq!(input_count(&second), 3);

    let frames = read_trace(&first).unwrap();
    assert_eq!(frames[0].channel, FrameChannel::Output);
    let actions: Vec<_> = frames.iter().filter_map(|f| f.action()).collect();
    assert_eq!(actions, vec![i32::from(b's'); 5]);
}

#[test]
fn test_reset_without_path_keeps_the_sink() {
    let dir = tempfile::tempdir().unwrap();
    let trace = dir.path().join("run.ttyrec");

    let mut session = Session::new(&module(&dir), &DemoLoader, settings()).unwrap();
    session.start(Some(&trace)).unwrap();
    session.step(i32::from(b's')).unwrap();
    session.reset(None).unwrap();
    assert_eq!(session.trace_name(), "");
    assert_eq!(session.trace_path(), Some(trace.as_path()));
    session.step(i32::from(b's')).unwrap();
    session.end().unwrap();

    assert_eq!(input_count(&trace), 2);
}

#[test]
fn test_overlong_trace_path_rejected_before_anything_exists() {
    let dir = tempfile::tempdir().unwrap();
    let long = dir.path().join("t".repeat(4100));

    let mut session = Session::new(&module(&dir), &DemoLoader, settings()).unwrap();
    let before = entries(dir.path());
    assert!(matches!(
        session.start(Some(&long)),
        Err(BridgeError::Validation(ValidationError::TooLong { .. }))
    ));
    assert_eq!(entries(dir.path()), before);

    let ok = dir.path().join("ok.ttyrec");
    session.start(Some(&ok)).unwrap();
    session.step(i32::from(b's')).unwrap();

    let before = entries(dir.path());
    assert!(matches!(
        session.reset(Some(&long)),
        Err(BridgeError::Validation(ValidationError::TooLong { .. }))
    ));
    assert_eq!(entries(dir.path()), before);
    assert_eq!(session.trace_path(), Some(ok.as_path()));
    assert!(!session.step(i32::from(b's')).unwrap());
    session.end().unwrap();

    assert_eq!(input_count(&ok), 2);
}

#[test]
fn test_failed_reset_restores_the_previous_trace() {
    let dir = tempfile::tempdir().unwrap();
    let old = dir.path().join("a.ttyrec");
    let new = dir.path().join("b.ttyrec");

    let mut session = Session::new(&module(&dir), &SecondEpisodeQuitsLoader, settings()).unwrap();
    session.start(Some(&old)).unwrap();
    session.step(0).unwrap();
    session.step(0).unwrap();

    assert!(matches!(
        session.reset(Some(&new)),
        Err(BridgeError::EndedBeforeInput)
    ));
    assert_eq!(session.lifecycle(), Lifecycle::Done);
    assert_eq!(session.trace_path(), Some(old.as_path()));
    assert_eq!(session.trace_name(), "a.ttyrec");
    assert!(new.exists());

    session.reset(None).unwrap();
    assert_eq!(session.trace_path(), Some(old.as_path()));
    session.step(0).unwrap();
    session.end().unwrap();

    let welcomes = |path: &Path| {
        read_trace(path)
            .unwrap()
            .iter()
            .filter(|f| f.payload == b"welcome")
            .count()
    };
    assert_eq!(welcomes(&old), 2);
    assert_eq!(input_count(&old), 3);
    assert_eq!(welcomes(&new), 1);
    assert_eq!(input_count(&new), 0);
}
