// Delay - digital echo with feedback and dry/wet mix
//
// Circular buffer sized once at construction; processing never allocates.

use super::Effect;

/// Delay parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayParams {
    /// Delay time in milliseconds
    pub time_ms: f32,
    /// Feedback amount (0.0 - 0.99)
    pub feedback: f32,
    /// Dry/Wet mix (0.0 = fully dry, 1.0 = fully wet)
    pub mix: f32,
}

impl Default for DelayParams {
    fn default() -> Self {
        Self {
            time_ms: 500.0,
            feedback: 0.0,
            mix: 0.5,
        }
    }
}

impl DelayParams {
    /// Create new delay parameters with clamping
    pub fn new(time_ms: f32, feedback: f32, mix: f32) -> Self {
        Self {
            time_ms: time_ms.max(0.0),
            // Above 0.99 the echo never decays
            feedback: feedback.clamp(0.0, 0.99),
            mix: mix.clamp(0.0, 1.0),
        }
    }
}

pub struct Delay {
    params: DelayParams,
    buffer: Vec<f32>,
    write_pos: usize,
    delay_samples: usize,
}

impl Delay {
    pub fn new(params: DelayParams, sample_rate: f32) -> Self {
        let params = DelayParams::new(params.time_ms, params.feedback, params.mix);
        let delay_samples = ((params.time_ms / 1000.0) * sample_rate) as usize;

        Self {
            params,
            buffer: vec![0.0; delay_samples + 1],
            write_pos: 0,
            delay_samples,
        }
    }

    pub fn params(&self) -> DelayParams {
        self.params
    }

    /// Delay effect latency equals the delay time
    pub fn latency_samples(&self) -> usize {
        self.delay_samples
    }
}

impl Effect for Delay {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let len = self.buffer.len();
        let read_pos = (self.write_pos + len - self.delay_samples) % len;
        let delayed = self.buffer[read_pos];

        self.buffer[self.write_pos] = (input + self.params.feedback * delayed).clamp(-2.0, 2.0);
        self.write_pos = (self.write_pos + 1) % len;

        input * (1.0 - self.params.mix) + delayed * self.params.mix
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }

    fn name(&self) -> &str {
        "Delay"
    }
}
