//! Audio conversion module
//!
//! Transcodes FLAC to MP3 with ffmpeg and applies ReplayGain with mp3gain.
//! All subprocesses go through a [`ToolRunner`].

mod batch;
mod ffmpeg;
mod replaygain;
mod runner;

pub use batch::{dedupe_sources, derivatives, transcode_all};
pub use ffmpeg::{convert_file, derivative_path, transcode_command, ConversionResult};
pub use replaygain::{normalize_all, read_track_gain, GainResult};
pub use runner::{run_checked, verify_tool, SystemRunner, ToolCommand, ToolOutput, ToolRunner};
