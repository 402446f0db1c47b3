// Offline sample-rate conversion with rubato
//
// Whole buffers are pushed through a sinc resampler in fixed chunks, the
// filter tail is flushed, and the output is aligned (filter delay removed)
// and trimmed to `round(len * ratio)` samples.

use crate::error::{EngineError, EngineResult};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

const CHUNK_SIZE: usize = 1024;

fn sinc_params() -> SincInterpolationParameters {
    SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    }
}

/// Resamples a mono buffer by `ratio` (output rate / input rate)
pub fn resample_by_ratio(samples: &[f32], ratio: f64) -> EngineResult<Vec<f32>> {
    if !ratio.is_finite() || ratio <= 0.0 {
        return Err(EngineError::Resample(format!("invalid ratio {}", ratio)));
    }
    if samples.is_empty() || (ratio - 1.0).abs() < 1e-12 {
        return Ok(samples.to_vec());
    }

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, sinc_params(), CHUNK_SIZE, 1)
        .map_err(|e| EngineError::Resample(e.to_string()))?;

    let expected = (samples.len() as f64 * ratio).round() as usize;
    let delay = resampler.output_delay();
    let mut output: Vec<f32> = Vec::with_capacity(expected + delay + CHUNK_SIZE);

    let mut pos = 0;
    while samples.len() - pos >= resampler.input_frames_next() {
        let needed = resampler.input_frames_next();
        let chunk: [&[f32]; 1] = [&samples[pos..pos + needed]];
        let out = resampler
            .process(&chunk[..], None)
            .map_err(|e| EngineError::Resample(e.to_string()))?;
        output.extend_from_slice(&out[0]);
        pos += needed;
    }

    if pos < samples.len() {
        let tail: [&[f32]; 1] = [&samples[pos..]];
        let out = resampler
            .process_partial(Some(&tail[..]), None)
            .map_err(|e| EngineError::Resample(e.to_string()))?;
        output.extend_from_slice(&out[0]);
    }

    // Flush the filter until the delayed output is complete
    while output.len() < expected + delay {
        let out = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .map_err(|e| EngineError::Resample(e.to_string()))?;
        if out[0].is_empty() {
            break;
        }
        output.extend_from_slice(&out[0]);
    }

    let mut aligned: Vec<f32> = output.into_iter().skip(delay).collect();
    aligned.resize(expected, 0.0);
    Ok(aligned)
}

/// Converts a mono buffer from `from_rate` to `to_rate`
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> EngineResult<Vec<f32>> {
    if from_rate == 0 || to_rate == 0 {
        return Err(EngineError::Resample(format!(
            "invalid sample rates {} -> {}",
            from_rate, to_rate
        )));
    }
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }
    resample_by_ratio(samples, to_rate as f64 / from_rate as f64)
}
