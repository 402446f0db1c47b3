// Channel level stages: selective mutism and volume

use crate::error::{EngineError, EngineResult};
use crate::sequencer::composer::validate_frames;
use crate::sequencer::slicer::Frame;
use rand::Rng;
use rand::seq::index;

/// Number of frames silenced for a mutism amount in [0, 1]
///
/// Rounds up, ignoring float noise below 1e-9 (0.3 of 10 frames is 3).
pub fn muted_frame_count(value: f64, frame_count: usize) -> usize {
    let exact = value * frame_count as f64;
    ((exact - 1e-9).ceil().max(0.0) as usize).min(frame_count)
}

/// Zeroes `ceil(value * frames)` distinct, randomly chosen frames
///
/// Frame lengths are kept so the bar stays aligned. Returns the silenced
/// frame indices in ascending order.
pub fn apply_selective_mutism<R: Rng + ?Sized>(
    frames: &mut [Frame],
    value: f64,
    rng: &mut R,
) -> EngineResult<Vec<usize>> {
    if !(0.0..=1.0).contains(&value) {
        return Err(EngineError::InvalidConfig(format!(
            "selective mutism value {} outside 0..=1",
            value
        )));
    }
    let count = muted_frame_count(value, frames.len());
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut muted = index::sample(rng, frames.len(), count).into_vec();
    muted.sort_unstable();
    for &i in &muted {
        frames[i].fill(0.0);
    }
    Ok(muted)
}

/// Flattens frames to one bar, then scales by `volume / 100`
pub fn apply_volume(frames: &[Frame], bpm: f64, volume: u8, sample_rate: u32) -> EngineResult<Vec<f32>> {
    if volume > 100 {
        return Err(EngineError::InvalidConfig(format!(
            "volume {} exceeds 100",
            volume
        )));
    }
    let sequence = validate_frames(bpm, frames, sample_rate)?;
    Ok(match volume {
        0 => vec![0.0; sequence.len()],
        100 => sequence,
        v => {
            let gain = v as f32 / 100.0;
            sequence.into_iter().map(|s| s * gain).collect()
        }
    })
}
