// Post-processing effects
//
// Offline effects applied to a finished channel sequence before mixdown.
// Every effect processes one mono sample at a time through the `Effect`
// trait; `FxKind` picks the processor for a numeric effect index.

pub mod color;
pub mod delay;
pub mod level;
pub mod modulation;
pub mod params;
pub mod reverb;

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use level::{apply_selective_mutism, apply_volume};
pub use params::FxParams;

/// Common interface for all effects
pub trait Effect: Send {
    /// Process a single mono sample
    fn process(&mut self, input: f32) -> f32;

    /// Clear internal state (delay lines, filter memories, LFO phase)
    fn reset(&mut self);

    fn name(&self) -> &str;

    /// Process a whole buffer in place
    fn process_buffer(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }
}

/// Available effects, in the order of their request index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FxKind {
    Bitcrush,
    Chorus,
    Delay,
    Flanger,
    Phaser,
    Reverb,
    Distortion,
}

impl FxKind {
    pub const ALL: [FxKind; 7] = [
        FxKind::Bitcrush,
        FxKind::Chorus,
        FxKind::Delay,
        FxKind::Flanger,
        FxKind::Phaser,
        FxKind::Reverb,
        FxKind::Distortion,
    ];

    pub fn from_index(index: usize) -> EngineResult<Self> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or_else(|| EngineError::InvalidConfig(format!("unknown effect index {}", index)))
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Fresh processor with the effect's default settings
    pub fn processor(self, sample_rate: u32) -> Box<dyn Effect> {
        let sr = sample_rate as f32;
        match self {
            FxKind::Bitcrush => Box::new(color::Bitcrush::default()),
            FxKind::Chorus => Box::new(modulation::ModulatedDelay::chorus(sr)),
            FxKind::Delay => Box::new(delay::Delay::new(delay::DelayParams::default(), sr)),
            FxKind::Flanger => Box::new(modulation::ModulatedDelay::flanger(sr)),
            FxKind::Phaser => Box::new(modulation::Phaser::new(
                modulation::PhaserParams::default(),
                sr,
            )),
            FxKind::Reverb => Box::new(reverb::Reverb::new(reverb::ReverbParams::default(), sr)),
            FxKind::Distortion => Box::new(color::Distortion::default()),
        }
    }

    /// Renders the effect over a buffer; the output keeps the input length
    pub fn apply(self, samples: &[f32], sample_rate: u32) -> Vec<f32> {
        let mut processor = self.processor(sample_rate);
        let mut output = samples.to_vec();
        processor.process_buffer(&mut output);
        tracing::debug!(effect = processor.name(), samples = output.len(), "effect applied");
        output
    }
}

impl fmt::Display for FxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FxKind::Bitcrush => "Bitcrush",
            FxKind::Chorus => "Chorus",
            FxKind::Delay => "Delay",
            FxKind::Flanger => "Flanger",
            FxKind::Phaser => "Phaser",
            FxKind::Reverb => "Reverb",
            FxKind::Distortion => "Distortion",
        };
        f.write_str(name)
    }
}
