//! Benchmarks for the step round trip.
//!
//! Every step is two context switches through the rendezvous channels plus
//! one render of the bound channels - the hot path of any training loop.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::hint::black_box;
use std::path::{Path, PathBuf};

use criterion::{Criterion, criterion_group, criterion_main};
use nle_bridge::obs::{BLSTATS, GLYPHS, NLE_BLSTATS_SIZE};
use nle_bridge::sim::demo::DemoLoader;
use nle_bridge::{Channel, ObservationBuffers, Seeds, Session, Settings};

fn module(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"").unwrap();
    path
}

fn settings() -> Settings {
    Settings {
        initial_seeds: Some(Seeds::new(42, 43, false)),
        spawn_monsters: false,
        ..Settings::default()
    }
}

fn bench_step_unbound(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::new(&module(dir.path(), "unbound.so"), &DemoLoader, settings()).unwrap();
    session.start(None).unwrap();

    c.bench_function("step_unbound", |b| {
        b.iter(|| {
            if session.step(black_box(i32::from(b's'))).unwrap() {
                session.reset(None).unwrap();
            }
        });
    });
}

fn bench_step_glyphs_blstats(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let mut glyphs = vec![0i16; Channel::Glyphs.element_count()];
    let mut blstats = vec![0i64; NLE_BLSTATS_SIZE];
    let buffers = ObservationBuffers::new()
        .with(GLYPHS, &mut glyphs)
        .unwrap()
        .with(BLSTATS, &mut blstats)
        .unwrap();
    let mut session = Session::new(&module(dir.path(), "bound.so"), &DemoLoader, settings()).unwrap();
    session.set_buffers(buffers).unwrap();
    session.start(None).unwrap();

    c.bench_function("step_glyphs_blstats", |b| {
        b.iter(|| {
            if session.step(black_box(i32::from(b's'))).unwrap() {
                session.reset(None).unwrap();
            }
            black_box(session.observation(BLSTATS));
        });
    });
}

fn bench_reset(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::new(&module(dir.path(), "reset.so"), &DemoLoader, settings()).unwrap();
    session.start(None).unwrap();

    c.bench_function("reset", |b| {
        b.iter(|| session.reset(black_box(None)).unwrap());
    });
}

criterion_group!(benches, bench_step_unbound, bench_step_glyphs_blstats, bench_reset);
criterion_main!(benches);
