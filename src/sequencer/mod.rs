// Sequencer module
// Euclidean rhythms, grid math, frame slicing and sequence composition

pub mod composer;
pub mod engine;
pub mod grid;
pub mod notes;
pub mod planner;
pub mod rhythm;
pub mod slicer;

pub use composer::{
    ComposeOptions, GeneratedSequence, PitchGate, SelectionPolicy, SequenceComposer,
    validate_frames, validate_sequence,
};
pub use engine::{PreparedChannel, SequenceEngine};
pub use grid::{DEFAULT_SAMPLE_RATE, GridInfo, Tempo};
pub use notes::{NoteSequence, NoteSequenceProvider, ScaleRow, ScaleTable};
pub use planner::{FrameLengthPlan, LengthBucket, PlannedFrame};
pub use rhythm::{OnsetPattern, RhythmConfig};
pub use slicer::{AudioFrameBank, Frame, FrameBucket};
