// LFO-modulated effects: chorus, flanger and phaser
//
// Chorus and flanger share one fractional delay line swept by a sine LFO;
// they differ in delay range and feedback. The phaser sweeps a cascade of
// first-order allpass stages instead.

use super::Effect;
use std::f32::consts::PI;

/// Sine LFO as a phase accumulator
#[derive(Debug, Clone, Copy)]
struct SineLfo {
    phase: f32,
    increment: f32,
}

impl SineLfo {
    fn new(rate_hz: f32, sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            increment: 2.0 * PI * rate_hz / sample_rate,
        }
    }

    /// Next value in [-1, 1]
    #[inline]
    fn next(&mut self) -> f32 {
        let value = self.phase.sin();
        self.phase += self.increment;
        if self.phase >= 2.0 * PI {
            self.phase -= 2.0 * PI;
        }
        value
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}

/// Modulated delay settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModulatedDelayParams {
    pub rate_hz: f32,
    /// Delay at the center of the sweep
    pub centre_ms: f32,
    /// Sweep amplitude around the center
    pub depth_ms: f32,
    pub feedback: f32,
    pub mix: f32,
}

impl ModulatedDelayParams {
    pub fn chorus() -> Self {
        Self {
            rate_hz: 1.0,
            centre_ms: 7.0,
            depth_ms: 2.0,
            feedback: 0.0,
            mix: 0.5,
        }
    }

    pub fn flanger() -> Self {
        Self {
            rate_hz: 0.5,
            centre_ms: 2.0,
            depth_ms: 1.5,
            feedback: 0.5,
            mix: 0.5,
        }
    }
}

/// Delay line read at a fractional, LFO-swept position
pub struct ModulatedDelay {
    params: ModulatedDelayParams,
    name: &'static str,
    buffer: Vec<f32>,
    write_pos: usize,
    samples_per_ms: f32,
    lfo: SineLfo,
}

impl ModulatedDelay {
    pub fn new(params: ModulatedDelayParams, sample_rate: f32, name: &'static str) -> Self {
        let params = ModulatedDelayParams {
            centre_ms: params.centre_ms.max(0.0),
            depth_ms: params.depth_ms.clamp(0.0, params.centre_ms.max(0.0)),
            feedback: params.feedback.clamp(0.0, 0.95),
            mix: params.mix.clamp(0.0, 1.0),
            ..params
        };
        let samples_per_ms = sample_rate / 1000.0;
        let max_delay = ((params.centre_ms + params.depth_ms) * samples_per_ms).ceil() as usize;

        Self {
            params,
            name,
            buffer: vec![0.0; max_delay + 2],
            write_pos: 0,
            samples_per_ms,
            lfo: SineLfo::new(params.rate_hz, sample_rate),
        }
    }

    pub fn chorus(sample_rate: f32) -> Self {
        Self::new(ModulatedDelayParams::chorus(), sample_rate, "Chorus")
    }

    pub fn flanger(sample_rate: f32) -> Self {
        Self::new(ModulatedDelayParams::flanger(), sample_rate, "Flanger")
    }

    /// Linear interpolation `delay` samples behind the write head
    #[inline]
    fn read(&self, delay: f32) -> f32 {
        let len = self.buffer.len();
        let whole = delay.floor() as usize;
        let frac = delay - whole as f32;
        let a = self.buffer[(self.write_pos + len - whole) % len];
        let b = self.buffer[(self.write_pos + len - whole - 1) % len];
        a + (b - a) * frac
    }
}

impl Effect for ModulatedDelay {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let sweep = self.params.centre_ms + self.params.depth_ms * self.lfo.next();
        let delay = (sweep * self.samples_per_ms).max(1.0);
        let delayed = self.read(delay);

        let len = self.buffer.len();
        self.buffer[self.write_pos] = input + self.params.feedback * delayed;
        self.write_pos = (self.write_pos + 1) % len;

        input * (1.0 - self.params.mix) + delayed * self.params.mix
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
        self.lfo.reset();
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Phaser settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaserParams {
    pub rate_hz: f32,
    /// Sweep depth (0.0 - 1.0) around the centre frequency
    pub depth: f32,
    pub centre_hz: f32,
    pub feedback: f32,
    pub mix: f32,
}

impl Default for PhaserParams {
    fn default() -> Self {
        Self {
            rate_hz: 1.0,
            depth: 0.5,
            centre_hz: 1300.0,
            feedback: 0.0,
            mix: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct AllpassStage {
    x1: f32,
    y1: f32,
}

impl AllpassStage {
    #[inline]
    fn process(&mut self, input: f32, coefficient: f32) -> f32 {
        let output = -coefficient * input + self.x1 + coefficient * self.y1;
        self.x1 = input;
        self.y1 = output;
        output
    }
}

pub struct Phaser {
    params: PhaserParams,
    stages: [AllpassStage; Self::STAGES],
    lfo: SineLfo,
    sample_rate: f32,
    last_output: f32,
}

impl Phaser {
    const STAGES: usize = 4;

    pub fn new(params: PhaserParams, sample_rate: f32) -> Self {
        let params = PhaserParams {
            depth: params.depth.clamp(0.0, 0.99),
            feedback: params.feedback.clamp(0.0, 0.9),
            mix: params.mix.clamp(0.0, 1.0),
            ..params
        };
        Self {
            params,
            stages: [AllpassStage::default(); Self::STAGES],
            lfo: SineLfo::new(params.rate_hz, sample_rate),
            sample_rate,
            last_output: 0.0,
        }
    }

    /// First-order allpass coefficient for a break frequency
    #[inline]
    fn coefficient(&self, freq: f32) -> f32 {
        let nyquist_safe = freq.clamp(20.0, self.sample_rate * 0.45);
        let t = (PI * nyquist_safe / self.sample_rate).tan();
        (t - 1.0) / (t + 1.0)
    }
}

impl Effect for Phaser {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let freq = self.params.centre_hz * (1.0 + self.params.depth * self.lfo.next());
        let coefficient = self.coefficient(freq);

        let mut wet = input + self.params.feedback * self.last_output;
        for stage in &mut self.stages {
            wet = stage.process(wet, coefficient);
        }
        self.last_output = wet;

        input * (1.0 - self.params.mix) + wet * self.params.mix
    }

    fn reset(&mut self) {
        self.stages = [AllpassStage::default(); Self::STAGES];
        self.lfo.reset();
        self.last_output = 0.0;
    }

    fn name(&self) -> &str {
        "Phaser"
    }
}
