use loopsmith::sequencer::composer::{ComposeOptions, SelectionPolicy, validate_sequence};
use loopsmith::sequencer::{grid, planner, rhythm, slicer};
use loopsmith::{ChannelParams, EngineError, ErrorKind, RhythmConfig, ScaleTable, SequenceEngine};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;

const SR: u32 = 44100;

fn sine(seconds: f32) -> Vec<f32> {
    (0..(seconds * SR as f32) as usize)
        .map(|i| (2.0 * std::f32::consts::PI * 220.0 * i as f32 / SR as f32).sin() * 0.8)
        .collect()
}

fn channel(pulses: usize, steps: usize, bpm: f64, temperature: u8) -> ChannelParams {
    ChannelParams {
        channel: 0,
        bpm,
        scale_value: "major".to_string(),
        key_value: "C".to_string(),
        rhythm: RhythmConfig::new(pulses, steps).unwrap(),
        pitch_temperature: temperature,
        source_path: "assets/sine.wav".to_string(),
    }
}

fn engine() -> SequenceEngine {
    SequenceEngine::new(SR, Arc::new(ScaleTable::builtin()))
}

#[test]
fn test_four_over_eight_at_100_bpm() {
    let sequence = engine()
        .generate(&channel(4, 8, 100.0, 0), &sine(3.0), &mut StdRng::seed_from_u64(11))
        .unwrap();

    // 60 / 100 * 4 seconds
    assert_eq!(sequence.validated.len(), 105840);
    assert_eq!(sequence.raw.len(), 4);
    assert_eq!(sequence.shifted_frames, 0);
    assert_eq!(sequence.note_offsets.len(), sequence.raw.len());
}

#[test]
fn test_every_tempo_yields_exactly_one_bar() {
    let engine = engine();
    let source = sine(4.0);
    let mut rng = StdRng::seed_from_u64(5);

    for (bpm, pulses, steps) in [(90.0, 3, 8), (120.0, 5, 16), (137.5, 7, 12), (174.0, 2, 3)] {
        let sequence = engine
            .generate(&channel(pulses, steps, bpm, 0), &source, &mut rng)
            .unwrap();
        let expected = (SR as f64 * 60.0 / bpm * 4.0).round() as usize;
        assert_eq!(sequence.validated.len(), expected, "bpm {}", bpm);
        assert_eq!(sequence.raw.len(), pulses);
    }
}

#[test]
fn test_same_seed_same_sequence() {
    let engine = engine();
    let source = sine(2.0);
    let params = channel(5, 8, 120.0, 40);

    let a = engine
        .generate(&params, &source, &mut StdRng::seed_from_u64(77))
        .unwrap();
    let b = engine
        .generate(&params, &source, &mut StdRng::seed_from_u64(77))
        .unwrap();
    assert_eq!(a.validated, b.validated);
    assert_eq!(a.note_offsets, b.note_offsets);
}

#[test]
fn test_pipeline_stages_line_up() {
    let source = sine(3.0);
    let onsets = rhythm::generate(3, 8).unwrap();
    assert_eq!(onsets.to_bits(), vec![1, 0, 0, 1, 0, 0, 1, 0]);

    let grid = grid::compute(source.len(), 120.0, onsets.len(), SR).unwrap();
    assert_eq!(grid.pulse_length_samples, 11025.0);

    let plan = planner::plan(&onsets, &grid).unwrap();
    let spans: Vec<usize> = plan.frames().iter().map(|f| f.span_pulses).collect();
    assert_eq!(spans, vec![3, 3, 2]);

    let bank = slicer::slice(&source, &plan).unwrap();
    for bucket in plan.buckets() {
        let frames = bank.frames(bucket.span_pulses).unwrap();
        assert!(!frames.is_empty());
        assert!(frames.iter().all(|f| f.len() == bucket.width()));
    }
}

#[test]
fn test_repetition_policy_draws_more_frames() {
    let engine = engine().with_options(ComposeOptions {
        selection: SelectionPolicy::RepetitionCount,
        ..ComposeOptions::default()
    });
    let params = channel(4, 8, 120.0, 0);
    let source = sine(3.0);
    let prepared = engine.prepare(&params, &source).unwrap();
    let expected: usize = prepared.plan.buckets().iter().map(|b| b.repetitions).sum();

    let sequence = engine
        .generate(&params, &source, &mut StdRng::seed_from_u64(2))
        .unwrap();
    assert_eq!(sequence.raw.len(), expected);
    // Still one bar after validation
    assert_eq!(sequence.validated.len(), 88200);
}

#[test]
fn test_validate_sequence_pads_and_trims() {
    assert_eq!(validate_sequence(120.0, vec![0.5; 100000], SR).unwrap().len(), 88200);

    let padded = validate_sequence(120.0, vec![0.5; 50000], SR).unwrap();
    assert_eq!(padded.len(), 88200);
    assert!(padded[50000..].iter().all(|&s| s == 0.0));
    assert!(padded[..50000].iter().all(|&s| s == 0.5));
}

#[test]
fn test_configuration_errors_are_classified() {
    let engine = engine();
    let mut rng = StdRng::seed_from_u64(0);

    let mut params = channel(3, 8, 120.0, 0);
    params.key_value = "H".to_string();
    let err = engine.generate(&params, &sine(1.0), &mut rng).unwrap_err();
    assert!(matches!(err, EngineError::ScaleNotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let err = engine
        .generate(&channel(3, 8, 120.0, 0), &[], &mut rng)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SourceAudio);

    assert!(matches!(
        RhythmConfig::new(9, 8),
        Err(EngineError::InvalidRhythm { pulses: 9, steps: 8 })
    ));
}
