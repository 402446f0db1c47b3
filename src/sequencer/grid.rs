// Grid calculation - pulse size and bar alignment in samples

use crate::error::{EngineError, EngineResult};
use std::fmt;

/// Default engine sample rate (Hz)
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Beats in one bar (the engine always works in 4/4)
pub const BEATS_PER_BAR: f64 = 4.0;

/// Tempo in beats per minute
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    /// Creates a tempo; bpm must be finite and positive
    pub fn new(bpm: f64) -> EngineResult<Self> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(EngineError::InvalidBpm(bpm));
        }
        Ok(Self { bpm })
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Duration of one beat in seconds
    pub fn beat_duration_seconds(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Duration of one bar in seconds (`60 / bpm * 4`)
    pub fn bar_duration_seconds(&self) -> f64 {
        self.beat_duration_seconds() * BEATS_PER_BAR
    }

    /// Exact number of samples in one bar, rounded to the nearest sample
    pub fn bar_samples(&self, sample_rate: u32) -> usize {
        (sample_rate as f64 * self.bar_duration_seconds()).round() as usize
    }

    /// Length of one step in samples when a bar is split into `steps`
    pub fn pulse_length_samples(&self, steps: usize, sample_rate: u32) -> f64 {
        sample_rate as f64 * self.bar_duration_seconds() / steps as f64
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} BPM", self.bpm)
    }
}

/// Pulse size and trimmed grid length for one source clip
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridInfo {
    /// Samples per step
    pub pulse_length_samples: f64,
    /// Target total length used to derive repetition counts
    pub grid_value: f64,
}

impl GridInfo {
    /// Number of whole pulses that fit in `audio_length_samples`
    pub fn whole_pulses(&self, audio_length_samples: usize) -> usize {
        (audio_length_samples as f64 / self.pulse_length_samples).floor() as usize
    }
}

/// Computes the grid for a source clip
///
/// Sources spanning at most one whole pulse keep their full length. Longer
/// sources are cut to the largest whole multiple of the pulse, minus one
/// pulse of headroom.
pub fn compute(
    audio_length_samples: usize,
    bpm: f64,
    steps: usize,
    sample_rate: u32,
) -> EngineResult<GridInfo> {
    let tempo = Tempo::new(bpm)?;
    if steps == 0 {
        return Err(EngineError::InvalidRhythm { pulses: 0, steps });
    }
    if audio_length_samples == 0 {
        return Err(EngineError::SourceAudio("source audio is empty".to_string()));
    }

    let pulse_length_samples = tempo.pulse_length_samples(steps, sample_rate);
    let whole_pulses = (audio_length_samples as f64 / pulse_length_samples).floor();

    let grid_value = if whole_pulses <= 1.0 {
        audio_length_samples as f64
    } else {
        whole_pulses * pulse_length_samples - pulse_length_samples
    };

    Ok(GridInfo {
        pulse_length_samples,
        grid_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tempo_bar_lengths() {
        let tempo = Tempo::new(120.0).unwrap();
        assert_eq!(tempo.beat_duration_seconds(), 0.5);
        assert_eq!(tempo.bar_duration_seconds(), 2.0);
        assert_eq!(tempo.bar_samples(44100), 88200);
        assert_eq!(Tempo::new(100.0).unwrap().bar_samples(44100), 105840);
        assert_eq!(tempo.to_string(), "120.0 BPM");
    }

    #[test]
    fn test_invalid_tempo() {
        assert!(matches!(Tempo::new(0.0), Err(EngineError::InvalidBpm(_))));
        assert!(Tempo::new(-90.0).is_err());
        assert!(Tempo::new(f64::NAN).is_err());
    }

    #[test]
    fn test_grid_trims_one_pulse_of_headroom() {
        let grid = compute(100_000, 120.0, 16, 44100).unwrap();
        assert_eq!(grid.pulse_length_samples, 5512.5);
        assert_eq!(grid.whole_pulses(100_000), 18);
        assert_eq!(grid.grid_value, 93712.5);
    }

    #[test]
    fn test_grid_keeps_short_sources_whole() {
        // One whole pulse only: the grid is the full source
        let grid = compute(8000, 120.0, 16, 44100).unwrap();
        assert_eq!(grid.grid_value, 8000.0);

        // Shorter than a single pulse
        let grid = compute(100, 120.0, 16, 44100).unwrap();
        assert_eq!(grid.grid_value, 100.0);
    }

    #[test]
    fn test_grid_boundary_at_two_pulses() {
        // Exactly two pulses: trimmed to one
        let grid = compute(11025, 120.0, 16, 44100).unwrap();
        assert_eq!(grid.grid_value, 5512.5);
    }

    #[test]
    fn test_grid_rejects_bad_input() {
        assert!(matches!(
            compute(0, 120.0, 16, 44100),
            Err(EngineError::SourceAudio(_))
        ));
        assert!(compute(1000, 0.0, 16, 44100).is_err());
        assert!(compute(1000, 120.0, 0, 44100).is_err());
    }
}
