//! Cue-sheet style index documents
//!
//! Only the declared total duration (`duration=<seconds>`) is read. Tracks,
//! offsets and timestamps are ignored.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::error::{PipelineError, Result};

static DURATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"duration=(\d+\.\d+)").expect("duration pattern is valid")
});

/// Extract the first `duration=<float>` value from an index document
///
/// The value needs a fractional part; `duration=240` does not count.
pub fn parse_duration(document: &str) -> Result<f64> {
    DURATION_PATTERN
        .captures(document)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .ok_or_else(|| PipelineError::MissingDuration("index document".to_string()))
}

/// Read an index document from disk and parse its duration
pub fn read_index_document(path: &Path) -> Result<f64> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    parse_duration(&text).map_err(|_| PipelineError::MissingDuration(path.display().to_string()))
}
