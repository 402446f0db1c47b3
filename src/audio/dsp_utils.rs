// DSP utilities - buffer shaping, windows and sample hygiene
//
// Small helpers shared by the composer, the pitch shifter and the effects.

/// Flush denormals to zero
///
/// Very small values slow down some CPUs considerably; anything below 1e-15
/// is far under 32-bit float noise anyway.
#[inline]
pub fn flush_denormals_to_zero(x: f32) -> f32 {
    if x.abs() < 1e-15 { 0.0 } else { x }
}

/// Soft clipping with tanh
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    x.tanh()
}

/// Truncates or right-pads `samples` with silence to exactly `len` samples
pub fn fit_to_length(mut samples: Vec<f32>, len: usize) -> Vec<f32> {
    samples.resize(len, 0.0);
    samples
}

/// Concatenates frames into one buffer
pub fn flatten(frames: &[Vec<f32>]) -> Vec<f32> {
    let total = frames.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(total);
    for frame in frames {
        out.extend_from_slice(frame);
    }
    out
}

/// Periodic Hann window of `len` points
pub fn hann_window(len: usize) -> Vec<f32> {
    if len == 0 {
        return Vec::new();
    }
    (0..len)
        .map(|n| {
            let phase = 2.0 * std::f64::consts::PI * n as f64 / len as f64;
            (0.5 - 0.5 * phase.cos()) as f32
        })
        .collect()
}
