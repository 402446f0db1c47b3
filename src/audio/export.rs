// Audio Export - offline WAV rendering of sequences and mixdowns
//
// Buffers are mono f32 in [-1, 1]. Integer output is clamped and scaled with
// the shared format conversion so previews and masters match bit for bit.

use crate::audio::format_conversion::f32_to_i16;
use crate::error::EngineResult;
use crate::sequencer::grid::DEFAULT_SAMPLE_RATE;
use hound::{SampleFormat, WavSpec, WavWriter};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Seek, Write};
use std::path::Path;

/// Sample encoding of exported files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitDepth {
    /// 16-bit signed PCM
    #[default]
    Int16,
    /// 32-bit IEEE float
    Float32,
}

/// Audio export settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Sample rate (Hz)
    pub sample_rate: u32,
    pub bit_depth: BitDepth,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            bit_depth: BitDepth::Int16,
        }
    }
}

impl ExportSettings {
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    fn spec(&self) -> WavSpec {
        match self.bit_depth {
            BitDepth::Int16 => WavSpec {
                channels: 1,
                sample_rate: self.sample_rate,
                bits_per_sample: 16,
                sample_format: SampleFormat::Int,
            },
            BitDepth::Float32 => WavSpec {
                channels: 1,
                sample_rate: self.sample_rate,
                bits_per_sample: 32,
                sample_format: SampleFormat::Float,
            },
        }
    }
}

/// Writes a mono buffer as WAV into any seekable writer
pub fn write_wav<W: Write + Seek>(
    samples: &[f32],
    writer: W,
    settings: &ExportSettings,
) -> EngineResult<()> {
    let mut wav = WavWriter::new(writer, settings.spec())?;
    match settings.bit_depth {
        BitDepth::Int16 => {
            for &sample in samples {
                wav.write_sample(f32_to_i16(sample))?;
            }
        }
        BitDepth::Float32 => {
            for &sample in samples {
                wav.write_sample(sample.clamp(-1.0, 1.0))?;
            }
        }
    }
    wav.finalize()?;
    Ok(())
}

/// Encodes a mono buffer to WAV bytes, ready for the storage backend
pub fn encode_wav_bytes(samples: &[f32], settings: &ExportSettings) -> EngineResult<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 4));
    write_wav(samples, &mut cursor, settings)?;
    Ok(cursor.into_inner())
}

/// Writes a mono buffer to a WAV file, creating parent directories
pub fn export_wav<P: AsRef<Path>>(
    samples: &[f32],
    path: P,
    settings: &ExportSettings,
) -> EngineResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::io::BufWriter::new(std::fs::File::create(path)?);
    write_wav(samples, file, settings)?;
    tracing::info!(path = %path.display(), samples = samples.len(), "exported wav");
    Ok(())
}
