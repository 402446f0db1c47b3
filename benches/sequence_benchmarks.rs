use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use loopsmith::audio::pitch::pitch_shift;
use loopsmith::fx::FxKind;
use loopsmith::sequencer::composer::{ComposeOptions, SequenceComposer};
use loopsmith::sequencer::{grid, planner, rhythm, slicer};
use loopsmith::{ScaleTable, SequenceEngine};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;

const SAMPLE_RATE: u32 = 44100;

fn sine(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / SAMPLE_RATE as f32).sin())
        .collect()
}

/// Euclidean pattern generation across common and large step counts
fn bench_rhythm(c: &mut Criterion) {
    let mut group = c.benchmark_group("rhythm");
    for (pulses, steps) in [(3, 8), (5, 16), (13, 32), (31, 64)] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("E({},{})", pulses, steps)),
            &(pulses, steps),
            |b, &(p, s)| b.iter(|| black_box(rhythm::generate(p, s))),
        );
    }
    group.finish();
}

/// Grid, plan and slicing of a 4 second clip
fn bench_slicing(c: &mut Criterion) {
    let source = sine(SAMPLE_RATE as usize * 4);
    let onsets = rhythm::generate(7, 16).unwrap();

    c.bench_function("slice_7_16_at_120", |b| {
        b.iter(|| {
            let grid = grid::compute(source.len(), 120.0, onsets.len(), SAMPLE_RATE).unwrap();
            let plan = planner::plan(&onsets, &grid).unwrap();
            black_box(slicer::slice(black_box(&source), &plan).unwrap())
        });
    });
}

/// Composition without pitch shifting (temperature 0)
fn bench_compose(c: &mut Criterion) {
    let source = sine(SAMPLE_RATE as usize * 4);
    let engine = SequenceEngine::new(SAMPLE_RATE, Arc::new(ScaleTable::builtin()));
    let notes = engine.notes().lookup("major", "C").unwrap();
    let onsets = rhythm::generate(5, 8).unwrap();
    let grid = grid::compute(source.len(), 120.0, onsets.len(), SAMPLE_RATE).unwrap();
    let plan = planner::plan(&onsets, &grid).unwrap();
    let bank = slicer::slice(&source, &plan).unwrap();
    let composer = SequenceComposer::new(ComposeOptions::default());

    c.bench_function("compose_5_8", |b| {
        let mut rng = StdRng::seed_from_u64(42);
        b.iter(|| black_box(composer.compose(&bank, &plan, &notes, 0, 120.0, &mut rng).unwrap()));
    });
}

/// Pitch shifting dominates sequence generation when the gate opens
fn bench_pitch_shift(c: &mut Criterion) {
    let mut group = c.benchmark_group("pitch_shift");
    group.sample_size(20);
    let frame = sine(11025);
    for semitones in [-12, -5, 7, 12] {
        group.bench_with_input(BenchmarkId::from_parameter(semitones), &semitones, |b, &st| {
            b.iter(|| black_box(pitch_shift(black_box(&frame), st).unwrap()))
        });
    }
    group.finish();
}

/// One bar through every effect
fn bench_effects(c: &mut Criterion) {
    let mut group = c.benchmark_group("effects");
    let bar = sine(88200);
    for kind in FxKind::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(kind), &kind, |b, &kind| {
            b.iter(|| black_box(kind.apply(black_box(&bar), SAMPLE_RATE)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_rhythm,
    bench_slicing,
    bench_compose,
    bench_pitch_shift,
    bench_effects
);
criterion_main!(benches);
