// Audio module - decoding, resampling, pitch shifting and WAV export

pub mod dsp_utils;
pub mod export;
pub mod format_conversion;
pub mod loader;
pub mod pitch;
pub mod resample;

pub use export::{BitDepth, ExportSettings, encode_wav_bytes, export_wav};
pub use loader::{AudioFormat, SourceAudio, decode_audio, load_audio};
pub use pitch::pitch_shift;
pub use resample::resample;
