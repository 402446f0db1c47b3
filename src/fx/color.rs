// Waveshaping effects: bit reduction and saturation

use super::Effect;
use crate::audio::dsp_utils::soft_clip;

/// Quantizes samples to `bit_depth` bits
pub struct Bitcrush {
    bit_depth: f32,
    step: f32,
}

impl Bitcrush {
    pub fn new(bit_depth: f32) -> Self {
        let bit_depth = bit_depth.clamp(1.0, 24.0);
        Self {
            bit_depth,
            step: 2.0 / 2f32.powf(bit_depth),
        }
    }

    pub fn bit_depth(&self) -> f32 {
        self.bit_depth
    }
}

impl Default for Bitcrush {
    fn default() -> Self {
        Self::new(8.0)
    }
}

impl Effect for Bitcrush {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        (input / self.step).round() * self.step
    }

    fn reset(&mut self) {}

    fn name(&self) -> &str {
        "Bitcrush"
    }
}

/// tanh saturation after a fixed input gain
pub struct Distortion {
    gain: f32,
}

impl Distortion {
    pub fn new(drive_db: f32) -> Self {
        Self {
            gain: 10f32.powf(drive_db / 20.0),
        }
    }
}

impl Default for Distortion {
    fn default() -> Self {
        Self::new(25.0)
    }
}

impl Effect for Distortion {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        soft_clip(input * self.gain)
    }

    fn reset(&mut self) {}

    fn name(&self) -> &str {
        "Distortion"
    }
}
