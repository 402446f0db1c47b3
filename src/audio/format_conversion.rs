// Sample format conversion between the internal f32 buffers and PCM
//
// Integer PCM of any bit depth maps to [-1.0, 1.0]; the reverse direction
// clamps first so out-of-range samples saturate instead of wrapping.

/// Convert f32 sample to i16
///
/// Maps [-1.0, 1.0] to [i16::MIN, i16::MAX]
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);

    // Asymmetric range: positive side tops out at 32767
    if clamped >= 0.0 {
        (clamped * i16::MAX as f32) as i16
    } else {
        (clamped * -(i16::MIN as f32)) as i16
    }
}

/// Convert a signed integer sample of `bits_per_sample` bits to f32
#[inline]
pub fn int_to_f32(sample: i32, bits_per_sample: u32) -> f32 {
    let bits = bits_per_sample.clamp(1, 32);
    let full_scale = (1u64 << (bits - 1)) as f32;
    (sample as f32 / full_scale).clamp(-1.0, 1.0)
}

/// Average interleaved frames of `channels` samples into one mono channel
///
/// A trailing partial frame is dropped.
pub fn downmix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => interleaved.to_vec(),
        n => interleaved
            .chunks_exact(n)
            .map(|frame| frame.iter().sum::<f32>() / n as f32)
            .collect(),
    }
}
