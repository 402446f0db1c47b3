// Pitch shifting by whole semitones
//
// The frame is first time-stretched by the pitch ratio (WSOLA: Hann-windowed
// overlap-add where each grain is placed at the offset best correlated with
// the previous grain's natural continuation), then resampled by the inverse
// ratio. The result has the shifted pitch and the input's length.

use crate::audio::dsp_utils::{fit_to_length, hann_window};
use crate::audio::resample::resample_by_ratio;
use crate::error::{EngineError, EngineResult};

const MAX_WINDOW: usize = 2048;
const MIN_WINDOW: usize = 256;
/// Correlation is evaluated on every n-th sample of the overlap
const CORRELATION_STRIDE: usize = 4;

/// Frequency ratio for a semitone offset
pub fn semitone_ratio(semitones: i32) -> f64 {
    2f64.powf(semitones as f64 / 12.0)
}

fn window_size_for(len: usize) -> Option<usize> {
    let mut size = MAX_WINDOW;
    while size > len / 2 && size > MIN_WINDOW {
        size /= 2;
    }
    (size <= len / 2).then_some(size)
}

#[inline]
fn sample_at(samples: &[f32], index: isize) -> f32 {
    if index < 0 {
        0.0
    } else {
        samples.get(index as usize).copied().unwrap_or(0.0)
    }
}

/// Read offset near `nominal` whose signal best continues the previous grain
fn best_offset(samples: &[f32], nominal: isize, target: isize, hop: usize, tolerance: isize) -> isize {
    let mut best = nominal;
    let mut best_corr = f32::NEG_INFINITY;
    for candidate in (nominal - tolerance).max(0)..=nominal + tolerance {
        let corr: f32 = (0..hop)
            .step_by(CORRELATION_STRIDE)
            .map(|n| {
                sample_at(samples, candidate + n as isize) * sample_at(samples, target + n as isize)
            })
            .sum();
        if corr > best_corr {
            best_corr = corr;
            best = candidate;
        }
    }
    best
}

/// Stretches `samples` in time by `factor` without changing pitch
///
/// Frames too short for a `MIN_WINDOW` analysis window are returned as-is.
pub fn time_stretch(samples: &[f32], factor: f64) -> Vec<f32> {
    let Some(window_len) = window_size_for(samples.len()) else {
        return samples.to_vec();
    };
    let out_len = (samples.len() as f64 * factor).round() as usize;
    let window = hann_window(window_len);
    let hop = window_len / 2;
    let tolerance = (window_len / 4) as isize;

    let mut output = vec![0.0f32; out_len + window_len];
    let mut weight = vec![0.0f32; out_len + window_len];

    let mut previous: Option<isize> = None;
    let mut write = 0;
    while write < out_len {
        let nominal = (write as f64 / factor).round() as isize;
        let read = match previous {
            Some(prev) => best_offset(samples, nominal, prev + hop as isize, hop, tolerance),
            None => nominal,
        };
        for (n, &w) in window.iter().enumerate() {
            output[write + n] += sample_at(samples, read + n as isize) * w;
            weight[write + n] += w;
        }
        previous = Some(read);
        write += hop;
    }

    for (sample, &w) in output.iter_mut().zip(weight.iter()) {
        if w > 1e-3 {
            *sample /= w;
        }
    }
    output.truncate(out_len);
    output
}

/// Shifts `frame` by `semitones`, keeping its length
pub fn pitch_shift(frame: &[f32], semitones: i32) -> EngineResult<Vec<f32>> {
    if semitones == 0 || frame.is_empty() {
        return Ok(frame.to_vec());
    }

    let ratio = semitone_ratio(semitones);
    let stretched = time_stretch(frame, ratio);
    // Playing the stretched frame `ratio` times faster restores the length
    let shifted = resample_by_ratio(&stretched, 1.0 / ratio)
        .map_err(|e| EngineError::PitchShift(format!("{} semitones: {}", semitones, e)))?;
    Ok(fit_to_length(shifted, frame.len()))
}
