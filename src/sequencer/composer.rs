// Sequence composition
//
// Picks frames per length bucket, optionally pitch-shifts them by notes of
// the channel's scale and normalizes the result to exactly one bar.
//
// Randomness comes exclusively from the caller's generator. Draw order is
// fixed (frame picks, then note offsets, then the pitch gate) so a seeded
// generator reproduces a composition exactly.

use crate::audio::dsp_utils::{fit_to_length, flatten};
use crate::audio::pitch::pitch_shift;
use crate::error::{EngineError, EngineResult};
use crate::sequencer::grid::{DEFAULT_SAMPLE_RATE, Tempo};
use crate::sequencer::notes::NoteSequence;
use crate::sequencer::planner::{FrameLengthPlan, LengthBucket};
use crate::sequencer::slicer::{AudioFrameBank, Frame};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// How many frames are drawn from each length bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// One frame per onset of that length: the sequence spans one bar
    #[default]
    OnsetCount,
    /// The bucket's grid repetition count
    RepetitionCount,
}

impl SelectionPolicy {
    fn draw_count(self, bucket: &LengthBucket) -> usize {
        match self {
            SelectionPolicy::OnsetCount => bucket.onset_count,
            SelectionPolicy::RepetitionCount => bucket.repetitions,
        }
    }
}

/// How the pitch temperature gates shifting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PitchGate {
    /// One draw decides for the whole sequence
    #[default]
    PerSequence,
    /// Every frame draws independently
    PerFrame,
}

/// Composition options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeOptions {
    pub selection: SelectionPolicy,
    pub pitch_gate: PitchGate,
    pub sample_rate: u32,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            selection: SelectionPolicy::default(),
            pitch_gate: PitchGate::default(),
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

/// Output of one composition
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSequence {
    /// Flattened sequence, exactly one bar long
    pub validated: Vec<f32>,
    /// Selected frames in bucket order, after the pitch stage
    pub raw: Vec<Frame>,
    /// Semitone offset assigned to each raw frame
    pub note_offsets: Vec<i32>,
    /// Number of frames that were actually pitch-shifted
    pub shifted_frames: usize,
}

impl GeneratedSequence {
    pub fn was_pitch_shifted(&self) -> bool {
        self.shifted_frames > 0
    }
}

/// Truncates or zero-pads a flat sequence to one bar at `bpm`
pub fn validate_sequence(bpm: f64, sequence: Vec<f32>, sample_rate: u32) -> EngineResult<Vec<f32>> {
    let target_len = Tempo::new(bpm)?.bar_samples(sample_rate);
    Ok(fit_to_length(sequence, target_len))
}

/// Flattens frames, then normalizes to one bar
pub fn validate_frames(bpm: f64, frames: &[Frame], sample_rate: u32) -> EngineResult<Vec<f32>> {
    validate_sequence(bpm, flatten(frames), sample_rate)
}

/// Whether a single uniform draw in [0, 1) lets the pitch shift through
///
/// Temperature 0 never shifts; otherwise the draw must exceed `temperature / 100`.
pub fn pitch_gate_open(temperature: u8, draw: f64) -> bool {
    temperature != 0 && draw > temperature as f64 / 100.0
}

/// Assembles generated sequences from a frame bank
#[derive(Debug, Clone, Default)]
pub struct SequenceComposer {
    options: ComposeOptions,
}

impl SequenceComposer {
    pub fn new(options: ComposeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ComposeOptions {
        &self.options
    }

    /// Frames of a planned bucket, failing loudly if the bank cannot honor it
    fn bucket_frames<'a>(
        bank: &'a AudioFrameBank,
        bucket: &LengthBucket,
    ) -> EngineResult<&'a [Frame]> {
        let sliced = bank.bucket(bucket.span_pulses).ok_or_else(|| {
            EngineError::CompositionInvariant(format!(
                "no frames sliced for planned length {} ({} pulses)",
                bucket.length_samples, bucket.span_pulses
            ))
        })?;
        if sliced.frames.is_empty() {
            return Err(EngineError::CompositionInvariant(format!(
                "frame bucket for length {} is empty",
                bucket.length_samples
            )));
        }
        if sliced.width != bucket.width() {
            return Err(EngineError::CompositionInvariant(format!(
                "frame width {} does not match planned width {}",
                sliced.width,
                bucket.width()
            )));
        }
        Ok(&sliced.frames)
    }

    /// Picks frames (uniform, with replacement) bucket by bucket
    pub fn select_frames<R: Rng + ?Sized>(
        &self,
        bank: &AudioFrameBank,
        plan: &FrameLengthPlan,
        rng: &mut R,
    ) -> EngineResult<Vec<Frame>> {
        let mut selected = Vec::new();
        for bucket in plan.buckets() {
            let frames = Self::bucket_frames(bank, bucket)?;
            let count = self.options.selection.draw_count(bucket);
            selected.extend((0..count).map(|_| frames[rng.gen_range(0..frames.len())].clone()));
        }
        Ok(selected)
    }

    /// Composes a one-bar sequence
    ///
    /// Fails with `CompositionInvariant` when a planned bucket is missing
    /// from the bank; never returns a silently shortened sequence. The pitch
    /// temperature must be 0-100.
    pub fn compose<R: Rng + ?Sized>(
        &self,
        bank: &AudioFrameBank,
        plan: &FrameLengthPlan,
        notes: &NoteSequence,
        pitch_temperature: u8,
        bpm: f64,
        rng: &mut R,
    ) -> EngineResult<GeneratedSequence> {
        let tempo = Tempo::new(bpm)?;
        if pitch_temperature > 100 {
            return Err(EngineError::InvalidConfig(format!(
                "pitch temperature {} outside 0-100",
                pitch_temperature
            )));
        }
        let selected = self.select_frames(bank, plan, rng)?;
        let note_offsets = notes.sample(rng, selected.len());
        if note_offsets.len() != selected.len() {
            return Err(EngineError::CompositionInvariant(
                "note sequence is empty".to_string(),
            ));
        }

        let mut shifted_frames = 0;
        let raw: Vec<Frame> = match self.options.pitch_gate {
            PitchGate::PerSequence => {
                let draw = rng.gen_range(0.0..1.0);
                if pitch_gate_open(pitch_temperature, draw) {
                    shifted_frames = selected.len();
                    selected
                        .iter()
                        .zip(&note_offsets)
                        .map(|(frame, &semitones)| pitch_shift(frame, semitones))
                        .collect::<EngineResult<_>>()?
                } else {
                    selected
                }
            }
            PitchGate::PerFrame => {
                let mut out = Vec::with_capacity(selected.len());
                for (frame, &semitones) in selected.into_iter().zip(&note_offsets) {
                    let draw = rng.gen_range(0.0..1.0);
                    if pitch_gate_open(pitch_temperature, draw) {
                        shifted_frames += 1;
                        out.push(pitch_shift(&frame, semitones)?);
                    } else {
                        out.push(frame);
                    }
                }
                out
            }
        };

        let validated = fit_to_length(flatten(&raw), tempo.bar_samples(self.options.sample_rate));
        tracing::debug!(
            frames = raw.len(),
            shifted = shifted_frames,
            samples = validated.len(),
            "composed sequence"
        );

        Ok(GeneratedSequence {
            validated,
            raw,
            note_offsets,
            shifted_frames,
        })
    }

    /// Preview composition: every bucket reshuffled without replacement
    ///
    /// Draws `min(frame width, frames in bucket)` frames per bucket, which is
    /// a permutation of the bucket for any real frame length. No pitch stage
    /// and no length normalization.
    pub fn compose_auto<R: Rng + ?Sized>(
        &self,
        bank: &AudioFrameBank,
        plan: &FrameLengthPlan,
        rng: &mut R,
    ) -> EngineResult<Vec<Frame>> {
        let mut sequence = Vec::new();
        for bucket in plan.buckets() {
            let frames = Self::bucket_frames(bank, bucket)?;
            let count = bucket.width().min(frames.len());
            sequence.extend(frames.choose_multiple(rng, count).cloned());
        }
        Ok(sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::grid::GridInfo;
    use crate::sequencer::planner;
    use crate::sequencer::rhythm::OnsetPattern;
    use crate::sequencer::slicer::{self, FrameBucket};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn ramp(len: usize) -> Vec<f32> {
        (0..len).map(|i| (i % 1000) as f32 / 1000.0).collect()
    }

    fn setup(bits: &[u8], pulse: f64, source_len: usize) -> (FrameLengthPlan, AudioFrameBank) {
        let onsets = OnsetPattern::from_steps(bits.iter().map(|&b| b == 1).collect());
        let grid = GridInfo {
            pulse_length_samples: pulse,
            grid_value: (source_len as f64 / pulse).floor() * pulse - pulse,
        };
        let plan = planner::plan(&onsets, &grid).unwrap();
        let bank = slicer::slice(&ramp(source_len), &plan).unwrap();
        (plan, bank)
    }

    #[test]
    fn test_validate_truncates_and_pads() {
        let long = vec![0.5f32; 100_000];
        let validated = validate_sequence(120.0, long, 44100).unwrap();
        assert_eq!(validated.len(), 88200);
        assert!(validated.iter().all(|&s| s == 0.5));

        let short = vec![0.5f32; 50_000];
        let validated = validate_sequence(120.0, short, 44100).unwrap();
        assert_eq!(validated.len(), 88200);
        assert!(validated[..50_000].iter().all(|&s| s == 0.5));
        assert_eq!(validated[50_000..].len(), 38200);
        assert!(validated[50_000..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_validate_is_idempotent() {
        let once = validate_sequence(97.0, ramp(70_000), 44100).unwrap();
        let twice = validate_sequence(97.0, once.clone(), 44100).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_validate_frames_flattens_in_order() {
        let frames = vec![vec![1.0; 3], vec![2.0; 2]];
        let validated = validate_frames(120.0, &frames, 10).unwrap();
        // One bar at 120 bpm and 10 Hz = 20 samples
        assert_eq!(validated.len(), 20);
        assert_eq!(&validated[..6], &[1.0, 1.0, 1.0, 2.0, 2.0, 0.0]);
    }

    #[test]
    fn test_pitch_gate() {
        assert!(!pitch_gate_open(0, 0.99));
        assert!(pitch_gate_open(30, 0.5));
        assert!(!pitch_gate_open(30, 0.2));
        assert!(!pitch_gate_open(30, 0.3));
        assert!(!pitch_gate_open(100, 0.999));
    }

    #[test]
    fn test_compose_one_frame_per_onset() {
        let (plan, bank) = setup(&[1, 0, 1, 1, 0, 1, 1, 0], 1000.0, 20_000);
        let notes = NoteSequence::two_octaves(&[0, 4, 7]);
        let composer = SequenceComposer::default();
        let mut rng = StdRng::seed_from_u64(1);

        let seq = composer.compose(&bank, &plan, &notes, 0, 120.0, &mut rng).unwrap();

        assert_eq!(seq.raw.len(), 5);
        // Shortest bucket first
        assert_eq!(seq.raw[0].len(), 1000);
        assert_eq!(seq.raw[4].len(), 2000);
        assert_eq!(seq.note_offsets.len(), 5);
        assert!(!seq.was_pitch_shifted());
        assert_eq!(seq.validated.len(), 88200);
        assert!(seq.validated[8000..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_compose_repetition_policy() {
        let (plan, bank) = setup(&[1, 0, 1, 1], 1000.0, 10_000);
        let composer = SequenceComposer::new(ComposeOptions {
            selection: SelectionPolicy::RepetitionCount,
            ..ComposeOptions::default()
        });
        let notes = NoteSequence::two_octaves(&[0]);
        let mut rng = StdRng::seed_from_u64(2);

        let seq = composer.compose(&bank, &plan, &notes, 0, 120.0, &mut rng).unwrap();
        let expected: usize = plan.buckets().iter().map(|b| b.repetitions).sum();
        assert_eq!(seq.raw.len(), expected);
    }

    #[test]
    fn test_selected_frames_come_from_their_bucket() {
        let (plan, bank) = setup(&[1, 0, 0, 1, 0, 1, 0, 0], 500.0, 30_000);
        let composer = SequenceComposer::default();
        let mut rng = StdRng::seed_from_u64(3);

        let selected = composer.select_frames(&bank, &plan, &mut rng).unwrap();
        let mut offset = 0;
        for bucket in plan.buckets() {
            let frames = bank.frames(bucket.span_pulses).unwrap();
            for frame in &selected[offset..offset + bucket.onset_count] {
                assert!(frames.contains(frame));
            }
            offset += bucket.onset_count;
        }
        assert_eq!(offset, selected.len());
    }

    #[test]
    fn test_seeded_composition_is_reproducible() {
        let (plan, bank) = setup(&[1, 0, 1, 0, 1, 1, 0, 1], 700.0, 40_000);
        let notes = NoteSequence::two_octaves(&[0, 2, 4, 5, 7, 9, 11]);
        let composer = SequenceComposer::default();

        let a = composer
            .compose(&bank, &plan, &notes, 50, 110.0, &mut StdRng::seed_from_u64(42))
            .unwrap();
        let b = composer
            .compose(&bank, &plan, &notes, 50, 110.0, &mut StdRng::seed_from_u64(42))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_gate_shifts_all_or_nothing() {
        let (plan, bank) = setup(&[1, 0, 1, 0], 2000.0, 20_000);
        let notes = NoteSequence::two_octaves(&[3, 5]);
        let composer = SequenceComposer::default();

        for seed in 0..16 {
            let seq = composer
                .compose(&bank, &plan, &notes, 1, 120.0, &mut StdRng::seed_from_u64(seed))
                .unwrap();
            assert!(seq.shifted_frames == 0 || seq.shifted_frames == seq.raw.len());
            assert!(seq.raw.iter().all(|f| f.len() == 4000));
        }
    }

    #[test]
    fn test_per_frame_gate_counts_each_frame() {
        let (plan, bank) = setup(&[1, 1, 1, 1], 600.0, 10_000);
        let notes = NoteSequence::two_octaves(&[2]);
        let composer = SequenceComposer::new(ComposeOptions {
            pitch_gate: PitchGate::PerFrame,
            ..ComposeOptions::default()
        });

        let seq = composer
            .compose(&bank, &plan, &notes, 0, 120.0, &mut StdRng::seed_from_u64(9))
            .unwrap();
        assert_eq!(seq.shifted_frames, 0);
        assert_eq!(seq.raw.len(), 4);
    }

    #[test]
    fn test_missing_bucket_fails_loudly() {
        let (plan, mut bank) = setup(&[1, 0, 1, 1], 1000.0, 10_000);
        let span = plan.buckets()[0].span_pulses;
        bank.remove(span);

        let composer = SequenceComposer::default();
        let notes = NoteSequence::two_octaves(&[0]);
        let err = composer
            .compose(&bank, &plan, &notes, 0, 120.0, &mut StdRng::seed_from_u64(0))
            .unwrap_err();
        assert!(matches!(err, EngineError::CompositionInvariant(_)));

        bank.insert(span, FrameBucket { width: 1000, frames: Vec::new() });
        assert!(matches!(
            composer.compose_auto(&bank, &plan, &mut StdRng::seed_from_u64(0)),
            Err(EngineError::CompositionInvariant(_))
        ));
    }

    #[test]
    fn test_empty_note_sequence_is_an_error() {
        let (plan, bank) = setup(&[1, 0], 1000.0, 10_000);
        let composer = SequenceComposer::default();
        let err = composer
            .compose(&bank, &plan, &NoteSequence::new(Vec::new()), 0, 120.0, &mut StdRng::seed_from_u64(0))
            .unwrap_err();
        assert!(matches!(err, EngineError::CompositionInvariant(_)));
    }

    #[test]
    fn test_temperature_above_100_is_rejected() {
        let (plan, bank) = setup(&[1, 0], 1000.0, 10_000);
        let composer = SequenceComposer::default();
        let notes = NoteSequence::two_octaves(&[0, 7]);
        let err = composer
            .compose(&bank, &plan, &notes, 150, 120.0, &mut StdRng::seed_from_u64(0))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
        assert!(composer
            .compose(&bank, &plan, &notes, 100, 120.0, &mut StdRng::seed_from_u64(0))
            .is_ok());
    }

    #[test]
    fn test_compose_auto_permutes_buckets() {
        let (plan, bank) = setup(&[1, 0, 1, 1, 0, 1, 1, 0], 1000.0, 20_000);
        let composer = SequenceComposer::default();
        let mut rng = StdRng::seed_from_u64(5);

        let sequence = composer.compose_auto(&bank, &plan, &mut rng).unwrap();
        let total: usize = bank.iter().map(|(_, b)| b.frames.len()).sum();
        assert_eq!(sequence.len(), total);

        let first = plan.buckets()[0];
        let frames = bank.frames(first.span_pulses).unwrap();
        for frame in &sequence[..frames.len()] {
            assert!(frames.contains(frame));
        }
    }
}
