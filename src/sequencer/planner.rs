// Frame length planning
//
// Every onset owns the audio up to the next onset (or the end of the bar).
// Frames are grouped into buckets by their span in whole pulses, so bucket
// identity is exact even when the pulse length is fractional.

use crate::error::{EngineError, EngineResult};
use crate::sequencer::grid::GridInfo;
use crate::sequencer::rhythm::OnsetPattern;

/// One onset's frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannedFrame {
    /// Step index of the onset
    pub onset_index: usize,
    /// Steps covered by the frame, onset included
    pub span_pulses: usize,
    /// Frame length in samples (`span_pulses * pulse_length_samples`)
    pub length_samples: f64,
}

/// All planned frames sharing one length
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LengthBucket {
    pub span_pulses: usize,
    pub length_samples: f64,
    /// Number of onsets whose frame has this length
    pub onset_count: usize,
    /// Frames of this length needed to fill the grid
    pub repetitions: usize,
}

impl LengthBucket {
    /// Frame width in whole samples
    pub fn width(&self) -> usize {
        self.length_samples as usize
    }

    /// Samples covered when the bucket is repeated `repetitions` times
    pub fn covered_samples(&self) -> f64 {
        self.length_samples * self.repetitions as f64
    }
}

/// Per-onset frame lengths plus the distinct-length buckets derived from them
#[derive(Debug, Clone, PartialEq)]
pub struct FrameLengthPlan {
    grid: GridInfo,
    frames: Vec<PlannedFrame>,
    buckets: Vec<LengthBucket>,
}

impl FrameLengthPlan {
    pub fn grid(&self) -> &GridInfo {
        &self.grid
    }

    /// Frames in onset order
    pub fn frames(&self) -> &[PlannedFrame] {
        &self.frames
    }

    /// Frame lengths in onset order
    pub fn lengths(&self) -> Vec<f64> {
        self.frames.iter().map(|f| f.length_samples).collect()
    }

    /// Distinct-length buckets, shortest first
    pub fn buckets(&self) -> &[LengthBucket] {
        &self.buckets
    }

    pub fn bucket(&self, span_pulses: usize) -> Option<&LengthBucket> {
        self.buckets.iter().find(|b| b.span_pulses == span_pulses)
    }

    /// `(length, repetitions)` pairs, shortest first
    pub fn repetitions(&self) -> Vec<(f64, usize)> {
        self.buckets
            .iter()
            .map(|b| (b.length_samples, b.repetitions))
            .collect()
    }
}

/// Repetitions of a frame length needed to fill `grid_value`
///
/// Ratios below one round up, others round down; never less than one.
pub fn repetition_count(grid_value: f64, length_samples: f64) -> usize {
    let ratio = grid_value / length_samples;
    let reps = if ratio < 1.0 { ratio.ceil() } else { ratio.floor() };
    (reps as usize).max(1)
}

/// Builds the frame length plan for an onset pattern on a grid
pub fn plan(onsets: &OnsetPattern, grid: &GridInfo) -> EngineResult<FrameLengthPlan> {
    let onset_indices = onsets.onset_indices();
    if onset_indices.is_empty() {
        return Err(EngineError::InvalidRhythm {
            pulses: 0,
            steps: onsets.len(),
        });
    }
    if !(grid.pulse_length_samples > 0.0) {
        return Err(EngineError::InvalidConfig(format!(
            "pulse length must be positive, got {}",
            grid.pulse_length_samples
        )));
    }

    let last_step = onsets.len() - 1;
    let frames: Vec<PlannedFrame> = onset_indices
        .iter()
        .enumerate()
        .map(|(i, &onset_index)| {
            // The silence run ends just before the next onset, or at the bar end
            let silence_index = onset_indices
                .get(i + 1)
                .map(|next| next - 1)
                .unwrap_or(last_step);
            let span_pulses = silence_index - onset_index + 1;
            PlannedFrame {
                onset_index,
                span_pulses,
                length_samples: span_pulses as f64 * grid.pulse_length_samples,
            }
        })
        .collect();

    let mut spans: Vec<usize> = frames.iter().map(|f| f.span_pulses).collect();
    spans.sort_unstable();
    spans.dedup();

    let buckets = spans
        .into_iter()
        .map(|span_pulses| {
            let length_samples = span_pulses as f64 * grid.pulse_length_samples;
            LengthBucket {
                span_pulses,
                length_samples,
                onset_count: frames.iter().filter(|f| f.span_pulses == span_pulses).count(),
                repetitions: repetition_count(grid.grid_value, length_samples),
            }
        })
        .collect();

    Ok(FrameLengthPlan {
        grid: *grid,
        frames,
        buckets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::grid;
    use crate::sequencer::rhythm::{self, OnsetPattern};

    fn pattern(bits: &[u8]) -> OnsetPattern {
        OnsetPattern::from_steps(bits.iter().map(|&b| b == 1).collect())
    }

    fn grid_with(pulse: f64, grid_value: f64) -> GridInfo {
        GridInfo {
            pulse_length_samples: pulse,
            grid_value,
        }
    }

    #[test]
    fn test_frame_lengths_follow_silence_runs() {
        let plan = plan(&pattern(&[1, 0, 0, 1, 0]), &grid_with(2.0, 10.0)).unwrap();
        assert_eq!(plan.lengths(), vec![6.0, 4.0]);
        assert_eq!(plan.frames()[0].onset_index, 0);
        assert_eq!(plan.frames()[1].onset_index, 3);
        assert_eq!(plan.frames()[1].span_pulses, 2);
    }

    #[test]
    fn test_repetition_rounding() {
        let reps: Vec<usize> = [1.0, 2.0, 3.0, 4.0, 5.0]
            .iter()
            .map(|&len| repetition_count(10.0, len))
            .collect();
        assert_eq!(reps, vec![10, 5, 3, 2, 2]);

        // Ratio below one rounds up
        assert_eq!(repetition_count(3.0, 10.0), 1);
        // Degenerate grid still yields one frame
        assert_eq!(repetition_count(0.0, 10.0), 1);
    }

    #[test]
    fn test_buckets_sorted_with_counts() {
        let pulses = rhythm::generate(12, 16).unwrap();
        let grid = grid::compute(44100 * 3, 120.0, 16, 44100).unwrap();
        let plan = plan(&pulses, &grid).unwrap();

        assert_eq!(plan.buckets().len(), 2);
        let short = plan.buckets()[0];
        let long = plan.buckets()[1];
        assert_eq!(short.length_samples, 5512.5);
        assert_eq!(short.onset_count, 8);
        assert_eq!(short.repetitions, 23);
        assert_eq!(long.length_samples, 11025.0);
        assert_eq!(long.onset_count, 4);
        assert_eq!(long.repetitions, 11);
        assert_eq!(plan.repetitions(), vec![(5512.5, 23), (11025.0, 11)]);
    }

    #[test]
    fn test_single_onset_spans_whole_pattern() {
        let plan = plan(&pattern(&[1, 0, 0, 0]), &grid_with(100.0, 150.0)).unwrap();
        assert_eq!(plan.frames().len(), 1);
        assert_eq!(plan.frames()[0].length_samples, 400.0);
        assert_eq!(plan.buckets()[0].repetitions, 1);
    }

    #[test]
    fn test_bucket_coverage_within_one_frame_of_grid() {
        for steps in [4usize, 8, 12, 16] {
            for pulses in 1..=steps {
                for source_len in [3000usize, 44100, 132_300, 500_000] {
                    let onsets = rhythm::generate(pulses, steps).unwrap();
                    let grid = grid::compute(source_len, 97.0, steps, 44100).unwrap();
                    let plan = plan(&onsets, &grid).unwrap();
                    for bucket in plan.buckets() {
                        assert!(bucket.length_samples > 0.0);
                        let diff = (bucket.covered_samples() - grid.grid_value).abs();
                        assert!(
                            diff <= bucket.length_samples + 1e-6,
                            "E({},{}) len {}: covered {} vs grid {}",
                            pulses,
                            steps,
                            bucket.length_samples,
                            bucket.covered_samples(),
                            grid.grid_value
                        );
                    }
                    let onsets_total: usize = plan.buckets().iter().map(|b| b.onset_count).sum();
                    assert_eq!(onsets_total, pulses);
                }
            }
        }
    }

    #[test]
    fn test_lengths_are_pulse_multiples() {
        let grid = grid_with(5512.5, 93712.5);
        let plan = plan(&rhythm::generate(5, 16).unwrap(), &grid).unwrap();
        for frame in plan.frames() {
            let ratio = frame.length_samples / grid.pulse_length_samples;
            assert_eq!(ratio, ratio.round());
        }
        let total_steps: usize = plan.frames().iter().map(|f| f.span_pulses).sum();
        assert_eq!(total_steps, 16);
    }

    #[test]
    fn test_empty_pattern_rejected() {
        assert!(plan(&pattern(&[0, 0, 0]), &grid_with(2.0, 10.0)).is_err());
    }
}
