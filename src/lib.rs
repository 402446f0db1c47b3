// Loopsmith - procedural rhythmic sequence engine

pub mod audio;
pub mod config;
pub mod error;
pub mod fx;
pub mod job;
pub mod logging;
pub mod mixer;
pub mod sequencer;
pub mod storage;

// Re-export commonly used types for convenience
pub use config::{ChannelParams, EngineSettings, JobConfig, JobPaths};
pub use error::{EngineError, EngineResult, ErrorKind};
pub use fx::{FxKind, FxParams};
pub use job::{ChannelMixdown, FxRunner, JobRunner, MixRunner, SequenceArtifact};
pub use sequencer::{
    GeneratedSequence, OnsetPattern, RhythmConfig, ScaleTable, SequenceComposer, SequenceEngine,
    Tempo,
};
pub use storage::{LocalStorage, MemoryStorage, Storage};
