// Frame slicing - cuts the source clip into fixed-width frames per length bucket

use crate::error::{EngineError, EngineResult};
use crate::sequencer::planner::FrameLengthPlan;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// A single audio frame (mono samples)
pub type Frame = Vec<f32>;

/// Frames of one width, cut at successive offsets of the source
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBucket {
    /// Width of every frame in samples
    pub width: usize,
    pub frames: Vec<Frame>,
}

/// Sliced frames keyed by bucket span (in pulses), shortest first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioFrameBank {
    buckets: BTreeMap<usize, FrameBucket>,
}

impl AudioFrameBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames for a bucket span
    pub fn frames(&self, span_pulses: usize) -> Option<&[Frame]> {
        self.buckets.get(&span_pulses).map(|b| b.frames.as_slice())
    }

    pub fn bucket(&self, span_pulses: usize) -> Option<&FrameBucket> {
        self.buckets.get(&span_pulses)
    }

    /// Insert (or replace) a bucket
    pub fn insert(&mut self, span_pulses: usize, bucket: FrameBucket) {
        self.buckets.insert(span_pulses, bucket);
    }

    pub fn remove(&mut self, span_pulses: usize) -> Option<FrameBucket> {
        self.buckets.remove(&span_pulses)
    }

    /// Number of buckets
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total number of frames over all buckets
    pub fn frame_count(&self) -> usize {
        self.buckets.values().map(|b| b.frames.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &FrameBucket)> {
        self.buckets.iter().map(|(&span, bucket)| (span, bucket))
    }
}

/// Start offsets for `repetitions` frames of `length_samples`
///
/// Offsets step by the truncated frame width and stop before
/// `length * (repetitions - 1)`, or before `length` for a single repetition
/// so at least one frame is always cut.
pub fn frame_offsets(length_samples: f64, repetitions: usize) -> EngineResult<Vec<usize>> {
    let width = length_samples as usize;
    if width == 0 {
        return Err(EngineError::InvalidConfig(format!(
            "frame length {} is shorter than one sample",
            length_samples
        )));
    }

    let stop = if repetitions <= 1 {
        length_samples
    } else {
        length_samples * (repetitions - 1) as f64
    } as usize;

    Ok((0..stop).step_by(width).collect())
}

/// Cuts frames of one length from `source`
///
/// Frames running past the end of the source are completed with silence.
pub fn slice_bucket(
    source: &[f32],
    length_samples: f64,
    repetitions: usize,
) -> EngineResult<FrameBucket> {
    let width = length_samples as usize;
    let offsets = frame_offsets(length_samples, repetitions)?;

    let required = offsets.last().map(|&last| last + width).unwrap_or(width);
    let mut working: Cow<'_, [f32]> = Cow::Borrowed(source);
    if required > working.len() {
        working.to_mut().resize(required, 0.0);
    }

    let frames = offsets
        .iter()
        .map(|&start| working[start..start + width].to_vec())
        .collect();

    Ok(FrameBucket { width, frames })
}

/// Slices the source clip for every bucket of the plan
pub fn slice(source: &[f32], plan: &FrameLengthPlan) -> EngineResult<AudioFrameBank> {
    if source.is_empty() {
        return Err(EngineError::SourceAudio("source audio is empty".to_string()));
    }

    let mut bank = AudioFrameBank::new();
    for bucket in plan.buckets() {
        let sliced = slice_bucket(source, bucket.length_samples, bucket.repetitions)?;
        tracing::debug!(
            span = bucket.span_pulses,
            width = sliced.width,
            frames = sliced.frames.len(),
            "sliced bucket"
        );
        bank.insert(bucket.span_pulses, sliced);
    }
    Ok(bank)
}
