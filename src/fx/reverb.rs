// Reverb - Freeverb-style room
//
// Mono Freeverb (Jezar at Dreampoint, public domain): four damped comb
// filters in parallel feeding two allpass filters in series.

use super::Effect;
use crate::audio::dsp_utils::flush_denormals_to_zero;

/// Reverb parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbParams {
    /// Room size (0.0 - 1.0, where 1.0 is largest)
    pub room_size: f32,
    /// High-frequency damping (0.0 - 1.0)
    pub damping: f32,
    pub wet_level: f32,
    pub dry_level: f32,
}

impl Default for ReverbParams {
    fn default() -> Self {
        Self {
            room_size: 0.5,
            damping: 0.5,
            wet_level: 0.33,
            dry_level: 0.4,
        }
    }
}

impl ReverbParams {
    pub fn new(room_size: f32, damping: f32, wet_level: f32, dry_level: f32) -> Self {
        Self {
            room_size: room_size.clamp(0.0, 1.0),
            damping: damping.clamp(0.0, 1.0),
            wet_level: wet_level.clamp(0.0, 1.0),
            dry_level: dry_level.clamp(0.0, 1.0),
        }
    }
}

/// Comb filter with a one-pole low-pass in the feedback path
struct CombFilter {
    buffer: Vec<f32>,
    index: usize,
    feedback: f32,
    damping: f32,
    filter_state: f32,
}

impl CombFilter {
    fn new(size: usize, feedback: f32, damping: f32) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            index: 0,
            feedback,
            damping,
            filter_state: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.index];
        self.filter_state = flush_denormals_to_zero(
            output * (1.0 - self.damping) + self.filter_state * self.damping,
        );
        self.buffer[self.index] = input + self.filter_state * self.feedback;
        self.index = (self.index + 1) % self.buffer.len();
        output
    }

    fn mute(&mut self) {
        self.buffer.fill(0.0);
        self.index = 0;
        self.filter_state = 0.0;
    }
}

struct AllpassFilter {
    buffer: Vec<f32>,
    index: usize,
}

impl AllpassFilter {
    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            index: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let buffered = self.buffer[self.index];
        self.buffer[self.index] = input + buffered * 0.5;
        self.index = (self.index + 1) % self.buffer.len();
        buffered - input
    }

    fn mute(&mut self) {
        self.buffer.fill(0.0);
        self.index = 0;
    }
}

pub struct Reverb {
    params: ReverbParams,
    combs: Vec<CombFilter>,
    allpasses: Vec<AllpassFilter>,
}

impl Reverb {
    // Tunings in samples at 44.1 kHz
    const COMB_TUNINGS: [usize; 4] = [1116, 1188, 1277, 1356];
    const ALLPASS_TUNINGS: [usize; 2] = [556, 441];

    const SCALE_WET: f32 = 3.0;
    const SCALE_DAMPING: f32 = 0.4;
    const SCALE_ROOM: f32 = 0.28;
    const OFFSET_ROOM: f32 = 0.7;

    pub fn new(params: ReverbParams, sample_rate: f32) -> Self {
        let scale = sample_rate / 44100.0;
        let feedback = params.room_size * Self::SCALE_ROOM + Self::OFFSET_ROOM;
        let damping = params.damping * Self::SCALE_DAMPING;

        let combs = Self::COMB_TUNINGS
            .iter()
            .map(|&t| CombFilter::new((t as f32 * scale) as usize, feedback, damping))
            .collect();
        let allpasses = Self::ALLPASS_TUNINGS
            .iter()
            .map(|&t| AllpassFilter::new((t as f32 * scale) as usize))
            .collect();

        Self {
            params,
            combs,
            allpasses,
        }
    }

    pub fn params(&self) -> ReverbParams {
        self.params
    }
}

impl Effect for Reverb {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let comb_sum: f32 = self.combs.iter_mut().map(|c| c.process(input)).sum();
        // Four combs share the wet gain
        let mut wet = comb_sum * Self::SCALE_WET * 0.25;
        for allpass in &mut self.allpasses {
            wet = allpass.process(wet);
        }
        input * self.params.dry_level + wet * self.params.wet_level
    }

    fn reset(&mut self) {
        self.combs.iter_mut().for_each(CombFilter::mute);
        self.allpasses.iter_mut().for_each(AllpassFilter::mute);
    }

    fn name(&self) -> &str {
        "Reverb"
    }
}
