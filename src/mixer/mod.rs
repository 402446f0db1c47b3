// Mixer - averages the six channel sequences into the master

use crate::error::{EngineError, EngineResult};
use crate::sequencer::composer::validate_sequence;

/// Channels in one job
pub const CHANNEL_COUNT: usize = 6;

/// Sample-wise mean of exactly six channels, each first normalized to one bar
pub fn mixdown(channels: &[Vec<f32>], bpm: f64, sample_rate: u32) -> EngineResult<Vec<f32>> {
    if channels.len() != CHANNEL_COUNT {
        return Err(EngineError::InvalidConfig(format!(
            "mixdown needs {} channels, got {}",
            CHANNEL_COUNT,
            channels.len()
        )));
    }

    let validated = channels
        .iter()
        .map(|channel| validate_sequence(bpm, channel.clone(), sample_rate))
        .collect::<EngineResult<Vec<_>>>()?;

    let len = validated.first().map(Vec::len).unwrap_or(0);
    let mut master = vec![0.0f32; len];
    for channel in &validated {
        for (out, &sample) in master.iter_mut().zip(channel) {
            *out += sample;
        }
    }
    for sample in &mut master {
        *sample /= CHANNEL_COUNT as f32;
    }

    tracing::info!(samples = master.len(), "channels mixed");
    Ok(master)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_of_six() {
        // One bar at 120 bpm and 2 Hz = 4 samples
        let channels: Vec<Vec<f32>> = (0..6).map(|i| vec![i as f32 * 0.1; 4]).collect();
        let master = mixdown(&channels, 120.0, 2).unwrap();
        assert_eq!(master.len(), 4);
        // (0 + 0.1 + ... + 0.5) / 6
        assert!(master.iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_channels_normalized_before_mixing() {
        let mut channels = vec![vec![0.6; 4]; 6];
        channels[0] = vec![0.6; 10];
        channels[1] = vec![0.6; 2];
        let master = mixdown(&channels, 120.0, 2).unwrap();
        assert_eq!(master.len(), 4);
        assert!((master[0] - 0.6).abs() < 1e-6);
        // Channel 1 is zero-padded at the end
        assert!((master[3] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_requires_six_channels() {
        let five = vec![vec![0.0; 4]; 5];
        assert!(matches!(
            mixdown(&five, 120.0, 2),
            Err(EngineError::InvalidConfig(_))
        ));
        let seven = vec![vec![0.0; 4]; 7];
        assert!(mixdown(&seven, 120.0, 2).is_err());
    }
}
