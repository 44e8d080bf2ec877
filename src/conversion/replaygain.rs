//! ReplayGain loudness normalization with mp3gain
//!
//! Runs on exactly the derivatives the transcoder handed back, never on a
//! directory listing. After a successful run the written track gain is read
//! back from the file's tags for the report.

use lofty::{ItemKey, TaggedFileExt};
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::runner::{run_checked, ToolCommand, ToolRunner};
use crate::core::DerivativeAsset;

/// Outcome of normalizing one derivative
#[derive(Debug, Clone, Serialize)]
pub struct GainResult {
    pub path: PathBuf,
    pub success: bool,
    /// `REPLAYGAIN_TRACK_GAIN` as written by mp3gain, when readable
    pub track_gain: Option<String>,
    pub error: Option<String>,
}

/// -r : apply track gain
/// -k : lower gain to avoid clipping
pub fn replaygain_command(mp3gain_path: &Path, file: &Path) -> ToolCommand {
    ToolCommand::new(mp3gain_path).arg("-r").arg("-k").arg(file)
}

/// Read the track gain tag from an MP3, if present
pub fn read_track_gain(path: &Path) -> Option<String> {
    let tagged_file = match lofty::read_from_path(path) {
        Ok(f) => f,
        Err(e) => {
            log::debug!("Could not read tags from {:?}: {}", path, e);
            return None;
        }
    };

    tagged_file
        .tags()
        .iter()
        .find_map(|tag| tag.get_string(&ItemKey::ReplayGainTrackGain))
        .map(str::to_string)
}

pub fn normalize_file(runner: &dyn ToolRunner, mp3gain_path: &Path, file: &Path) -> GainResult {
    let name = file.file_name().unwrap_or_default();
    match run_checked(runner, &replaygain_command(mp3gain_path, file)) {
        Ok(_) => {
            let track_gain = read_track_gain(file);
            match &track_gain {
                Some(gain) => log::info!("ReplayGain applied to {:?} ({})", name, gain),
                None => log::info!("ReplayGain applied to {:?}", name),
            }
            GainResult {
                path: file.to_path_buf(),
                success: true,
                track_gain,
                error: None,
            }
        }
        Err(e) => {
            log::error!("Failed to apply ReplayGain to {:?}: {}", name, e);
            GainResult {
                path: file.to_path_buf(),
                success: false,
                track_gain: None,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Normalize every derivative; failures are recorded, not propagated
pub fn normalize_all(
    runner: &dyn ToolRunner,
    mp3gain_path: &Path,
    derivatives: &[DerivativeAsset],
) -> Vec<GainResult> {
    log::info!("Applying ReplayGain to {} MP3 file(s)", derivatives.len());
    derivatives
        .iter()
        .map(|d| normalize_file(runner, mp3gain_path, &d.path))
        .collect()
}
