// Job orchestration
//
// Three stages, each reading and writing through the storage backend:
//   JobRunner  - job document + source clip -> per-channel sequence artifact
//   FxRunner   - sequence artifact -> mutism, volume and effect -> channel mixdown
//   MixRunner  - six channel mixdowns -> master WAV

use crate::audio::export::{ExportSettings, encode_wav_bytes};
use crate::audio::loader::{AudioFormat, decode_audio};
use crate::config::{EngineSettings, JobConfig, JobPaths};
use crate::error::{EngineError, EngineResult};
use crate::fx::{FxKind, FxParams, apply_selective_mutism, apply_volume};
use crate::mixer::{CHANNEL_COUNT, mixdown};
use crate::sequencer::engine::SequenceEngine;
use crate::sequencer::grid::Tempo;
use crate::sequencer::rhythm::RhythmConfig;
use crate::sequencer::slicer::Frame;
use crate::storage::Storage;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Stored output of the sequence stage for one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceArtifact {
    pub channel: usize,
    pub bpm: f64,
    pub sample_rate: u32,
    pub rhythm: RhythmConfig,
    pub note_offsets: Vec<i32>,
    pub pitch_shifted: bool,
    /// Selected frames after the pitch stage, before bar normalization
    pub frames: Vec<Frame>,
}

/// Stored output of the post-processing stage for one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMixdown {
    pub channel: usize,
    pub bpm: f64,
    pub sample_rate: u32,
    pub effect: Option<FxKind>,
    pub muted_frames: Vec<usize>,
    pub samples: Vec<f32>,
}

fn fetch_json<T: for<'de> Deserialize<'de>>(storage: &dyn Storage, key: &str) -> EngineResult<T> {
    let bytes = storage.fetch(key)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn store_json<T: Serialize>(storage: &dyn Storage, key: &str, value: &T) -> EngineResult<()> {
    storage.store(key, &serde_json::to_vec(value)?)
}

fn load_job(storage: &dyn Storage, paths: &JobPaths) -> EngineResult<JobConfig> {
    JobConfig::from_slice(&storage.fetch(paths.job_document())?)
}

/// Generates channel sequences from stored jobs
pub struct JobRunner {
    storage: Arc<dyn Storage>,
    engine: SequenceEngine,
    export: ExportSettings,
}

impl JobRunner {
    pub fn new(storage: Arc<dyn Storage>, settings: &EngineSettings) -> EngineResult<Self> {
        let table = Arc::new(settings.load_scale_table()?);
        let engine = SequenceEngine::new(settings.sample_rate, table)
            .with_options(settings.compose_options());
        Ok(Self {
            storage,
            engine,
            export: settings.export_settings(),
        })
    }

    pub fn engine(&self) -> &SequenceEngine {
        &self.engine
    }

    /// Runs the sequence stage for one channel and returns the artifact key
    ///
    /// A preview WAV of the one-bar sequence is stored next to the artifact.
    pub fn execute<R: Rng + ?Sized>(
        &self,
        job_id: &str,
        channel: usize,
        rng: &mut R,
    ) -> EngineResult<String> {
        let paths = JobPaths::new(job_id, "")?;
        let job = load_job(self.storage.as_ref(), &paths)?;
        let params = job.channel(channel)?;
        self.engine.validate(&params)?;

        let format = AudioFormat::from_path(Path::new(&params.source_path))?;
        let bytes = self.storage.fetch(&params.source_path)?;
        let source = decode_audio(bytes, format.extension(), self.engine.sample_rate())?;

        let sequence = self.engine.generate(&params, &source.samples, rng)?;

        let artifact_key = paths.sequence_artifact(channel);
        let artifact = SequenceArtifact {
            channel,
            bpm: params.bpm,
            sample_rate: self.engine.sample_rate(),
            rhythm: params.rhythm,
            pitch_shifted: sequence.was_pitch_shifted(),
            note_offsets: sequence.note_offsets,
            frames: sequence.raw,
        };
        store_json(self.storage.as_ref(), &artifact_key, &artifact)?;
        self.storage.store(
            &paths.sequence_preview(channel),
            &encode_wav_bytes(&sequence.validated, &self.export)?,
        )?;

        tracing::info!(job = paths.job_name(), channel, key = %artifact_key, "sequence stored");
        Ok(artifact_key)
    }
}

/// Applies channel post-processing to stored sequences
pub struct FxRunner {
    storage: Arc<dyn Storage>,
}

impl FxRunner {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Mutism, volume and effect for one channel; returns the mixdown key
    pub fn execute<R: Rng + ?Sized>(
        &self,
        job_id: &str,
        channel: usize,
        random_id: &str,
        params: &FxParams,
        rng: &mut R,
    ) -> EngineResult<String> {
        let paths = JobPaths::new(job_id, random_id)?;
        let effect = params.effect(channel)?;
        let volume = if params.is_enabled(channel)? {
            params.volume(channel)?
        } else {
            0
        };

        let artifact: SequenceArtifact =
            fetch_json(self.storage.as_ref(), &paths.sequence_artifact(channel))?;
        let mut frames = artifact.frames;

        let muted_frames = apply_selective_mutism(&mut frames, params.mutism_amount(), rng)?;
        let leveled = apply_volume(&frames, artifact.bpm, volume, artifact.sample_rate)?;
        let samples = match effect {
            Some(kind) => kind.apply(&leveled, artifact.sample_rate),
            None => leveled,
        };

        let key = paths.channel_mixdown(channel);
        let mixdown = ChannelMixdown {
            channel,
            bpm: artifact.bpm,
            sample_rate: artifact.sample_rate,
            effect,
            muted_frames,
            samples,
        };
        store_json(self.storage.as_ref(), &key, &mixdown)?;

        tracing::info!(
            job = paths.job_name(),
            channel,
            effect = ?effect,
            muted = mixdown.muted_frames.len(),
            "channel mixdown stored"
        );
        Ok(key)
    }
}

/// Mixes the six channel mixdowns of one request into the master
pub struct MixRunner {
    storage: Arc<dyn Storage>,
    export: ExportSettings,
}

impl MixRunner {
    pub fn new(storage: Arc<dyn Storage>, export: ExportSettings) -> Self {
        Self { storage, export }
    }

    /// Returns the storage key of the master WAV
    pub fn execute(&self, job_id: &str, random_id: &str) -> EngineResult<String> {
        let paths = JobPaths::new(job_id, random_id)?;
        let bpm = Tempo::new(load_job(self.storage.as_ref(), &paths)?.bpm()?)?.bpm();

        let mut channels = Vec::with_capacity(CHANNEL_COUNT);
        for channel in 0..CHANNEL_COUNT {
            let mixdown: ChannelMixdown = fetch_json(self.storage.as_ref(), &paths.channel_mixdown(channel))
                .map_err(|e| match e {
                    EngineError::StorageNotFound(key) => EngineError::StorageNotFound(format!(
                        "{} (channel {} has not been processed)",
                        key, channel
                    )),
                    other => other,
                })?;
            if mixdown.sample_rate != self.export.sample_rate {
                return Err(EngineError::InvalidConfig(format!(
                    "channel {} rendered at {} Hz, master expects {} Hz",
                    channel, mixdown.sample_rate, self.export.sample_rate
                )));
            }
            channels.push(mixdown.samples);
        }

        let master = mixdown(&channels, bpm, self.export.sample_rate)?;
        let key = paths.master_mixdown();
        self.storage.store(&key, &encode_wav_bytes(&master, &self.export)?)?;

        tracing::info!(job = paths.job_name(), key = %key, "master mixdown stored");
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn sine_wav(seconds: f32) -> Vec<u8> {
        let samples: Vec<f32> = (0..(seconds * 44100.0) as usize)
            .map(|i| (2.0 * std::f32::consts::PI * 330.0 * i as f32 / 44100.0).sin() * 0.5)
            .collect();
        encode_wav_bytes(&samples, &ExportSettings::default()).unwrap()
    }

    fn job_json() -> String {
        r#"{
            "local_paths": ["0.wav", "1.wav", "2.wav", "3.wav", "4.wav", "5.wav"],
            "cloud_paths": ["assets/0.wav", "assets/1.wav", "assets/2.wav", "assets/3.wav", "assets/4.wav", "assets/5.wav"],
            "bpm": [120],
            "scale_value": ["minor"],
            "key_value": ["A"],
            "rythm_config_list": [[3, 8], [4, 8], [5, 8], [2, 5], [7, 12], [1, 4]],
            "pitch_temperature_knob_list": [[0], [0], [0], [0], [0], [0]]
        }"#
        .to_string()
    }

    fn seeded_storage() -> Arc<MemoryStorage> {
        let storage = Arc::new(MemoryStorage::new());
        storage.store("job_ids/demo.json", job_json().as_bytes()).unwrap();
        let wav = sine_wav(2.0);
        for ch in 0..CHANNEL_COUNT {
            storage.store(&format!("assets/{}.wav", ch), &wav).unwrap();
        }
        storage
    }

    #[test]
    fn test_sequence_stage_stores_artifact_and_preview() {
        let storage = seeded_storage();
        let runner = JobRunner::new(storage.clone(), &EngineSettings::default()).unwrap();

        let key = runner
            .execute("job_ids/demo.json", 0, &mut StdRng::seed_from_u64(1))
            .unwrap();
        assert_eq!(key, "sequences/demo_0.json");

        let artifact: SequenceArtifact = fetch_json(storage.as_ref(), &key).unwrap();
        assert_eq!(artifact.frames.len(), 3);
        assert_eq!(artifact.rhythm, RhythmConfig::new(3, 8).unwrap());
        let total: usize = artifact.frames.iter().map(Vec::len).sum();
        assert_eq!(total, 88200);
        assert!(storage.exists("sequences/demo_0.wav").unwrap());
    }

    #[test]
    fn test_missing_source_is_storage_error() {
        let storage = seeded_storage();
        storage.delete("assets/2.wav").unwrap();
        let runner = JobRunner::new(storage, &EngineSettings::default()).unwrap();
        assert!(matches!(
            runner.execute("demo", 2, &mut StdRng::seed_from_u64(0)),
            Err(EngineError::StorageNotFound(_))
        ));
    }

    #[test]
    fn test_full_pipeline() {
        let storage = seeded_storage();
        let settings = EngineSettings::default();
        let runner = JobRunner::new(storage.clone(), &settings).unwrap();
        let fx = FxRunner::new(storage.clone());
        let mix = MixRunner::new(storage.clone(), settings.export_settings());
        let mut rng = StdRng::seed_from_u64(9);

        let params =
            FxParams::parse("F_0_2_4_5_6", "100_80_80_80_80_80", "T_T_T_T_T_F", "T", "0.25")
                .unwrap();
        for ch in 0..CHANNEL_COUNT {
            runner.execute("demo", ch, &mut rng).unwrap();
            fx.execute("demo", ch, "abcd1234", &params, &mut rng).unwrap();
        }

        let dry: ChannelMixdown =
            fetch_json(storage.as_ref(), "mixdown/mixdown_abcd1234_demo_0.json").unwrap();
        assert_eq!(dry.effect, None);
        assert_eq!(dry.samples.len(), 88200);
        // ceil(0.25 * 3 frames)
        assert_eq!(dry.muted_frames.len(), 1);

        let disabled: ChannelMixdown =
            fetch_json(storage.as_ref(), "mixdown/mixdown_abcd1234_demo_5.json").unwrap();
        assert!(disabled.samples.iter().all(|&s| s == 0.0));

        let key = mix.execute("demo", "abcd1234").unwrap();
        assert_eq!(key, "mixdown/mixdown_abcd1234_demo_master.wav");
        let reader = hound::WavReader::new(std::io::Cursor::new(storage.fetch(&key).unwrap())).unwrap();
        assert_eq!(reader.len(), 88200);
    }

    #[test]
    fn test_stored_artifact_with_bad_rhythm_is_rejected() {
        let storage = MemoryStorage::new();
        let artifact = r#"{"channel":0,"bpm":120.0,"sample_rate":44100,
            "rhythm":{"pulses":0,"steps":8},"note_offsets":[],"pitch_shifted":false,"frames":[]}"#;
        storage.store("sequences/demo_0.json", artifact.as_bytes()).unwrap();

        let result: EngineResult<SequenceArtifact> = fetch_json(&storage, "sequences/demo_0.json");
        assert!(matches!(result, Err(EngineError::Json(_))));
    }

    #[test]
    fn test_mix_requires_every_channel() {
        let storage = seeded_storage();
        let mix = MixRunner::new(storage, ExportSettings::default());
        assert!(matches!(
            mix.execute("demo", "nope"),
            Err(EngineError::StorageNotFound(_))
        ));
    }
}
