// Error types shared by the sequence engine and its I/O collaborators

/// Broad failure category, used by callers to decide how to surface an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid job parameters; nothing was sliced or rendered
    Configuration,
    /// Source audio missing, empty or undecodable
    SourceAudio,
    /// The frame bank does not satisfy the plan it was built from
    CompositionInvariant,
    /// Storage collaborator failure
    Storage,
    /// Filesystem failure
    Io,
    /// Serialization or audio container failure
    Encoding,
}

/// Engine error types
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid rhythm config: {pulses} pulses over {steps} steps")]
    InvalidRhythm { pulses: usize, steps: usize },

    #[error("Channel index {0} out of range (expected 0-5)")]
    InvalidChannel(usize),

    #[error("No note sequence for scale '{scale}' in key '{key}'")]
    ScaleNotFound { scale: String, key: String },

    #[error("Invalid bpm: {0}")]
    InvalidBpm(f64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Source audio error: {0}")]
    SourceAudio(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Composition invariant violated: {0}")]
    CompositionInvariant(String),

    #[error("Pitch shift failed: {0}")]
    PitchShift(String),

    #[error("Resampling failed: {0}")]
    Resample(String),

    #[error("Object not found in storage: {0}")]
    StorageNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RON error: {0}")]
    Ron(String),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

impl EngineError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidRhythm { .. }
            | EngineError::InvalidChannel(_)
            | EngineError::ScaleNotFound { .. }
            | EngineError::InvalidBpm(_)
            | EngineError::InvalidConfig(_) => ErrorKind::Configuration,
            EngineError::SourceAudio(_)
            | EngineError::UnsupportedFormat(_)
            | EngineError::PitchShift(_)
            | EngineError::Resample(_) => ErrorKind::SourceAudio,
            EngineError::CompositionInvariant(_) => ErrorKind::CompositionInvariant,
            EngineError::StorageNotFound(_) | EngineError::Storage(_) => ErrorKind::Storage,
            EngineError::Io(_) => ErrorKind::Io,
            EngineError::Json(_) | EngineError::Ron(_) | EngineError::Wav(_) => {
                ErrorKind::Encoding
            }
        }
    }

    /// Configuration errors abort a job before any audio work starts
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}

impl From<ron::error::SpannedError> for EngineError {
    fn from(err: ron::error::SpannedError) -> Self {
        EngineError::Ron(err.to_string())
    }
}

impl From<ron::Error> for EngineError {
    fn from(err: ron::Error) -> Self {
        EngineError::Ron(err.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
