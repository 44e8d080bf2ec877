//! flac-batch
//!
//! Converts batches of FLAC files (optionally zipped with a cue sheet) to
//! MP3 with ffmpeg, applies ReplayGain with mp3gain and packages the result
//! as `processed_files.zip`. A cue sheet's declared duration is checked
//! against the audio before anything is converted.

pub mod audio;
pub mod conversion;
pub mod core;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod workspace;

#[cfg(test)]
mod test_fixtures;

pub use error::{PipelineError, Result};
