//! Cross-checking an index document against the audio it describes

use std::path::Path;

use super::index::read_index_document;
use super::probe::DurationProbe;
use crate::error::{PipelineError, Result};

/// Largest accepted difference between declared and probed duration
pub const DURATION_TOLERANCE_SECS: f64 = 1.0;

/// Whether two durations agree within `tolerance` (inclusive)
pub fn validate(index_duration: f64, asset_duration: f64, tolerance: f64) -> bool {
    (index_duration - asset_duration).abs() <= tolerance
}

/// Read the index, probe the asset and compare them
///
/// Returns `Mismatch` when both durations are known but disagree. Callers
/// treat every `Err` as a rejection.
pub fn validate_pairing(index_path: &Path, asset_path: &Path, probe: &dyn DurationProbe) -> Result<()> {
    let index = read_index_document(index_path)?;
    let asset = probe.probe_duration(asset_path)?;

    if validate(index, asset, DURATION_TOLERANCE_SECS) {
        log::info!(
            "Index {:?} matches {:?} ({:.2}s vs {:.2}s)",
            index_path.file_name().unwrap_or_default(),
            asset_path.file_name().unwrap_or_default(),
            index,
            asset
        );
        Ok(())
    } else {
        Err(PipelineError::Mismatch { index, asset })
    }
}
