// Job documents and storage layout
//
// A job document holds per-channel lists (source paths, rhythms,
// temperatures) plus job-wide tempo, scale and key. Documents may arrive as
// "pseudo JSON": an array whose first element is a JSON string in which
// JavaScript `undefined` values still appear.

use crate::error::{EngineError, EngineResult};
use crate::mixer::CHANNEL_COUNT;
use crate::sequencer::rhythm::RhythmConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

const UNDEFINED: &str = "undefined";

/// Replaces `undefined` object values with `null`
///
/// Only values directly following a `"key":` and followed by `,` or `}` are
/// rewritten; array items and string contents are left alone.
pub fn sanitize_pseudo_json(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find(UNDEFINED) {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + UNDEFINED.len()..];

        let follows_key = out
            .trim_end()
            .strip_suffix(':')
            .is_some_and(|head| head.trim_end().ends_with('"'));
        let ends_value = matches!(after.trim_start().chars().next(), Some(',' | '}'));

        out.push_str(if follows_key && ends_value { "null" } else { UNDEFINED });
        rest = after;
    }
    out.push_str(rest);
    out
}

/// Job document as stored under `job_ids/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(default)]
    pub local_paths: Vec<Option<String>>,
    #[serde(default)]
    pub cloud_paths: Vec<Option<String>>,
    pub bpm: Vec<f64>,
    pub scale_value: Vec<String>,
    pub key_value: Vec<String>,
    /// Per channel `[pulses, steps]`
    pub rythm_config_list: Vec<Vec<i64>>,
    /// Per channel `[temperature]`
    pub pitch_temperature_knob_list: Vec<Vec<i64>>,
}

/// Validated parameters for one channel of a job
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelParams {
    pub channel: usize,
    pub bpm: f64,
    pub scale_value: String,
    pub key_value: String,
    pub rhythm: RhythmConfig,
    /// 0 - 100
    pub pitch_temperature: u8,
    /// Storage key of the source clip
    pub source_path: String,
}

fn missing(field: &str, channel: usize) -> EngineError {
    EngineError::InvalidConfig(format!("job has no {} for channel {}", field, channel))
}

fn first<'a, T>(list: &'a [T], field: &str) -> EngineResult<&'a T> {
    list.first()
        .ok_or_else(|| EngineError::InvalidConfig(format!("job has no {}", field)))
}

impl JobConfig {
    /// Parses a plain or pseudo JSON job document
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        let document = match value {
            Value::Array(items) => match items.into_iter().next() {
                Some(Value::String(inner)) => serde_json::from_str(&sanitize_pseudo_json(&inner))?,
                Some(other) => other,
                None => {
                    return Err(EngineError::InvalidConfig(
                        "job document is an empty array".to_string(),
                    ));
                }
            },
            other => other,
        };
        Ok(serde_json::from_value(document)?)
    }

    pub fn from_slice(bytes: &[u8]) -> EngineResult<Self> {
        let json = std::str::from_utf8(bytes)
            .map_err(|e| EngineError::InvalidConfig(format!("job document is not UTF-8: {}", e)))?;
        Self::from_json_str(json)
    }

    pub fn to_json_string(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Job tempo, shared by all channels
    pub fn bpm(&self) -> EngineResult<f64> {
        let bpm = *first(&self.bpm, "bpm")?;
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(EngineError::InvalidBpm(bpm));
        }
        Ok(bpm)
    }

    /// Validated parameters of channel `index`
    pub fn channel(&self, index: usize) -> EngineResult<ChannelParams> {
        if index >= CHANNEL_COUNT {
            return Err(EngineError::InvalidChannel(index));
        }

        let rhythm = self
            .rythm_config_list
            .get(index)
            .ok_or_else(|| missing("rhythm", index))
            .and_then(|pair| RhythmConfig::from_pair(pair))?;

        let temperature = *self
            .pitch_temperature_knob_list
            .get(index)
            .and_then(|knob| knob.first())
            .ok_or_else(|| missing("pitch temperature", index))?;
        let pitch_temperature = u8::try_from(temperature)
            .ok()
            .filter(|t| *t <= 100)
            .ok_or_else(|| {
                EngineError::InvalidConfig(format!(
                    "pitch temperature {} for channel {} outside 0-100",
                    temperature, index
                ))
            })?;

        let source_path = self
            .cloud_paths
            .get(index)
            .cloned()
            .flatten()
            .or_else(|| self.local_paths.get(index).cloned().flatten())
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| missing("source path", index))?;

        Ok(ChannelParams {
            channel: index,
            bpm: self.bpm()?,
            scale_value: first(&self.scale_value, "scale")?.clone(),
            key_value: first(&self.key_value, "key")?.clone(),
            rhythm,
            pitch_temperature,
            source_path,
        })
    }
}

/// Random id shared by the artifacts of one mixdown
pub fn random_mix_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Storage keys used by one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    job_key: String,
    job_name: String,
    random_id: String,
}

impl JobPaths {
    /// `job_id` is either a storage key (`job_ids/<name>.json`) or a bare name
    pub fn new(job_id: &str, random_id: &str) -> EngineResult<Self> {
        let name = job_id
            .trim()
            .trim_start_matches("job_ids/")
            .trim_end_matches(".json");
        if name.is_empty() || name.contains('/') || name.contains("..") {
            return Err(EngineError::InvalidConfig(format!("invalid job id '{}'", job_id)));
        }
        if random_id.contains('/') {
            return Err(EngineError::InvalidConfig(format!(
                "invalid random id '{}'",
                random_id
            )));
        }
        Ok(Self {
            job_key: format!("job_ids/{}.json", name),
            job_name: name.to_string(),
            random_id: random_id.to_string(),
        })
    }

    /// Job name without prefix and extension
    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn random_id(&self) -> &str {
        &self.random_id
    }

    pub fn job_document(&self) -> &str {
        &self.job_key
    }

    pub fn sequence_artifact(&self, channel: usize) -> String {
        format!("sequences/{}_{}.json", self.job_name, channel)
    }

    pub fn sequence_preview(&self, channel: usize) -> String {
        format!("sequences/{}_{}.wav", self.job_name, channel)
    }

    pub fn channel_mixdown(&self, channel: usize) -> String {
        format!("mixdown/mixdown_{}_{}_{}.json", self.random_id, self.job_name, channel)
    }

    pub fn master_mixdown(&self) -> String {
        format!("mixdown/mixdown_{}_{}_master.wav", self.random_id, self.job_name)
    }

    /// Scratch file for this job inside `work_dir`
    pub fn work_file(&self, work_dir: &Path, suffix: &str) -> PathBuf {
        work_dir.join(format!("{}_{}", self.job_name, suffix))
    }
}
