// Source clip decoding
//
// WAV goes through hound, FLAC through claxon and MP3 through symphonia.
// Every format ends up as a mono f32 buffer at the engine's sample rate.

use crate::audio::format_conversion::{downmix_to_mono, int_to_f32};
use crate::audio::resample::resample;
use crate::error::{EngineError, EngineResult};
use claxon::FlacReader;
use hound::{SampleFormat, WavReader};
use std::io::{Cursor, ErrorKind};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Container formats accepted for source clips
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Flac,
    Mp3,
}

impl AudioFormat {
    pub fn from_extension(extension: &str) -> EngineResult<Self> {
        match extension.trim_start_matches('.').to_lowercase().as_str() {
            "wav" | "wave" => Ok(AudioFormat::Wav),
            "flac" => Ok(AudioFormat::Flac),
            "mp3" => Ok(AudioFormat::Mp3),
            other => Err(EngineError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn from_path(path: &Path) -> EngineResult<Self> {
        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        Self::from_extension(extension)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
            AudioFormat::Mp3 => "mp3",
        }
    }
}

/// Decoded mono clip
#[derive(Debug, Clone, PartialEq)]
pub struct SourceAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl SourceAudio {
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Interleaved samples as they come out of a decoder
struct Decoded {
    interleaved: Vec<f32>,
    channels: usize,
    sample_rate: u32,
}

fn source_error(context: &str, err: impl std::fmt::Display) -> EngineError {
    EngineError::SourceAudio(format!("{}: {}", context, err))
}

fn decode_wav(bytes: Vec<u8>) -> EngineResult<Decoded> {
    let reader = WavReader::new(Cursor::new(bytes)).map_err(|e| source_error("wav", e))?;
    let spec = reader.spec();

    let interleaved = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| source_error("wav", e))?,
        SampleFormat::Int => {
            let bits = spec.bits_per_sample as u32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| int_to_f32(s, bits)))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| source_error("wav", e))?
        }
    };

    Ok(Decoded {
        interleaved,
        channels: spec.channels as usize,
        sample_rate: spec.sample_rate,
    })
}

fn decode_flac(bytes: Vec<u8>) -> EngineResult<Decoded> {
    let mut reader = FlacReader::new(Cursor::new(bytes)).map_err(|e| source_error("flac", e))?;
    let info = reader.streaminfo();

    let interleaved = reader
        .samples()
        .map(|s| s.map(|s| int_to_f32(s, info.bits_per_sample)))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| source_error("flac", e))?;

    Ok(Decoded {
        interleaved,
        channels: info.channels as usize,
        sample_rate: info.sample_rate,
    })
}

fn decode_compressed(bytes: Vec<u8>, extension: &str) -> EngineResult<Decoded> {
    let stream = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
    let mut hint = Hint::new();
    hint.with_extension(extension);

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| source_error(extension, e))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| EngineError::SourceAudio(format!("{}: no audio track", extension)))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .map_err(|e| source_error(extension, e))?;

    let mut interleaved = Vec::new();
    let mut channels = params.channels.map(|c| c.count()).unwrap_or(1);
    let mut sample_rate = params.sample_rate.unwrap_or(0);

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(source_error(extension, e)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                channels = spec.channels.count();
                sample_rate = spec.rate;
                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                interleaved.extend_from_slice(buffer.samples());
            }
            // Corrupt packets are skipped
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::warn!(error = e, "skipping undecodable packet");
            }
            Err(e) => return Err(source_error(extension, e)),
        }
    }

    Ok(Decoded {
        interleaved,
        channels,
        sample_rate,
    })
}

/// Decodes an in-memory clip and converts it to mono at `target_rate`
pub fn decode_audio(bytes: Vec<u8>, extension: &str, target_rate: u32) -> EngineResult<SourceAudio> {
    if bytes.is_empty() {
        return Err(EngineError::SourceAudio("source file is empty".to_string()));
    }

    let format = AudioFormat::from_extension(extension)?;
    let decoded = match format {
        AudioFormat::Wav => decode_wav(bytes)?,
        AudioFormat::Flac => decode_flac(bytes)?,
        AudioFormat::Mp3 => decode_compressed(bytes, format.extension())?,
    };

    if decoded.sample_rate == 0 {
        return Err(EngineError::SourceAudio("unknown sample rate".to_string()));
    }
    let mono = downmix_to_mono(&decoded.interleaved, decoded.channels);
    if mono.is_empty() {
        return Err(EngineError::SourceAudio("no samples decoded".to_string()));
    }

    let samples = resample(&mono, decoded.sample_rate, target_rate)?;
    tracing::debug!(
        format = format.extension(),
        channels = decoded.channels,
        from = decoded.sample_rate,
        to = target_rate,
        samples = samples.len(),
        "decoded source audio"
    );

    Ok(SourceAudio {
        samples,
        sample_rate: target_rate,
    })
}

/// Reads and decodes a clip from disk
pub fn load_audio<P: AsRef<Path>>(path: P, target_rate: u32) -> EngineResult<SourceAudio> {
    let path = path.as_ref();
    let format = AudioFormat::from_path(path)?;
    let bytes = std::fs::read(path)?;
    decode_audio(bytes, format.extension(), target_rate)
}
