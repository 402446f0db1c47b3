// Engine configuration
//
// Settings come from an optional RON file, then environment overrides.
// Job documents (per-request parameters) live in `job`.

pub mod job;

use crate::audio::export::{BitDepth, ExportSettings};
use crate::error::{EngineError, EngineResult};
use crate::sequencer::composer::{ComposeOptions, PitchGate, SelectionPolicy};
use crate::sequencer::grid::DEFAULT_SAMPLE_RATE;
use crate::sequencer::notes::ScaleTable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use job::{ChannelParams, JobConfig, JobPaths, random_mix_id, sanitize_pseudo_json};

const ENV_WORK_DIR: &str = "LOOPSMITH_WORK_DIR";
const ENV_STORAGE_ROOT: &str = "LOOPSMITH_STORAGE_ROOT";
const ENV_SCALE_TABLE: &str = "LOOPSMITH_SCALE_TABLE";
const ENV_SEED: &str = "LOOPSMITH_SEED";
const ENV_SAMPLE_RATE: &str = "LOOPSMITH_SAMPLE_RATE";

/// Process-wide engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub sample_rate: u32,
    /// Scratch directory for intermediate renders
    pub work_dir: PathBuf,
    /// Root of the local storage backend
    pub storage_root: PathBuf,
    /// JSON scale table; the built-in table is used when absent
    pub scale_table: Option<PathBuf>,
    /// Fixed RNG seed for reproducible renders
    pub seed: Option<u64>,
    pub selection: SelectionPolicy,
    pub pitch_gate: PitchGate,
    pub bit_depth: BitDepth,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            work_dir: default_work_dir(),
            storage_root: PathBuf::from("./storage"),
            scale_table: None,
            seed: None,
            selection: SelectionPolicy::default(),
            pitch_gate: PitchGate::default(),
            bit_depth: BitDepth::default(),
        }
    }
}

fn default_work_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("loopsmith").join("temp"))
        .unwrap_or_else(|| PathBuf::from("./temp"))
}

impl EngineSettings {
    /// Parses settings from RON; missing fields keep their defaults
    pub fn from_ron_str(ron_str: &str) -> EngineResult<Self> {
        let settings: EngineSettings = ron::de::from_str(ron_str)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads a RON file and applies environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let mut settings = Self::from_ron_str(&contents)?;
        settings.apply_env()?;
        Ok(settings)
    }

    /// File settings when a path is given, defaults otherwise; env always applies
    pub fn load_or_default(path: Option<&Path>) -> EngineResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let mut settings = Self::default();
                settings.apply_env()?;
                Ok(settings)
            }
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> EngineResult<()> {
        std::fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }

    pub fn to_ron_string(&self) -> EngineResult<String> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    pub fn apply_env(&mut self) -> EngineResult<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from `lookup`; blank values are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F) -> EngineResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(value) = get(ENV_WORK_DIR) {
            self.work_dir = PathBuf::from(value);
        }
        if let Some(value) = get(ENV_STORAGE_ROOT) {
            self.storage_root = PathBuf::from(value);
        }
        if let Some(value) = get(ENV_SCALE_TABLE) {
            self.scale_table = Some(PathBuf::from(value));
        }
        if let Some(value) = get(ENV_SEED) {
            let seed = value.trim().parse::<u64>().map_err(|_| {
                EngineError::InvalidConfig(format!("{} must be an unsigned integer", ENV_SEED))
            })?;
            self.seed = Some(seed);
        }
        if let Some(value) = get(ENV_SAMPLE_RATE) {
            self.sample_rate = value.trim().parse::<u32>().map_err(|_| {
                EngineError::InvalidConfig(format!("{} must be a positive integer", ENV_SAMPLE_RATE))
            })?;
        }
        self.validate()
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.sample_rate == 0 {
            return Err(EngineError::InvalidConfig(
                "sample_rate must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Built-in table unless a JSON table is configured
    pub fn load_scale_table(&self) -> EngineResult<ScaleTable> {
        match &self.scale_table {
            Some(path) => ScaleTable::load(path),
            None => Ok(ScaleTable::builtin()),
        }
    }

    pub fn compose_options(&self) -> ComposeOptions {
        ComposeOptions {
            selection: self.selection,
            pitch_gate: self.pitch_gate,
            sample_rate: self.sample_rate,
        }
    }

    pub fn export_settings(&self) -> ExportSettings {
        ExportSettings {
            sample_rate: self.sample_rate,
            bit_depth: self.bit_depth,
        }
    }
}
