//! FFmpeg transcoding of a single source file

use serde::Serialize;
use std::path::{Path, PathBuf};

use super::runner::{run_checked, ToolCommand, ToolRunner};
use crate::core::DerivativeAsset;

/// Result of a file conversion
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    /// Original input file path
    pub input_path: PathBuf,
    /// Path to the converted output file
    pub output_path: PathBuf,
    /// Whether conversion was successful
    pub success: bool,
    /// Error message if conversion failed
    pub error: Option<String>,
}

impl ConversionResult {
    pub fn failed(input_path: &Path, output_path: &Path, error: impl Into<String>) -> Self {
        Self {
            input_path: input_path.to_path_buf(),
            output_path: output_path.to_path_buf(),
            success: false,
            error: Some(error.into()),
        }
    }

    /// The derivative this conversion produced, if it succeeded
    pub fn derivative(&self) -> Option<DerivativeAsset> {
        self.success
            .then(|| DerivativeAsset::new(self.output_path.clone(), self.input_path.clone()))
    }
}

/// Where the MP3 for `input_path` lands: same stem, `.mp3` extension
pub fn derivative_path(input_path: &Path, output_dir: &Path) -> PathBuf {
    let file_stem = input_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output_dir.join(format!("{}.mp3", file_stem))
}

/// Build the transcoder command
///
/// -y               : Overwrite output file without asking
/// -i <input>       : Input file
/// -map_metadata 0  : Copy all tags from the input
pub fn transcode_command(ffmpeg_path: &Path, input_path: &Path, output_path: &Path) -> ToolCommand {
    ToolCommand::new(ffmpeg_path)
        .arg("-y")
        .arg("-i")
        .arg(input_path)
        .arg("-map_metadata")
        .arg("0")
        .arg(output_path)
}

/// Convert a single audio file to MP3, keeping its metadata
pub fn convert_file(
    runner: &dyn ToolRunner,
    ffmpeg_path: &Path,
    input_path: &Path,
    output_path: &Path,
) -> ConversionResult {
    log::debug!("Converting: {} -> {}", input_path.display(), output_path.display());

    let command = transcode_command(ffmpeg_path, input_path, output_path);
    match run_checked(runner, &command) {
        Ok(_) => {
            log::info!(
                "Converted {:?} to {:?}",
                input_path.file_name().unwrap_or_default(),
                output_path.file_name().unwrap_or_default()
            );
            ConversionResult {
                input_path: input_path.to_path_buf(),
                output_path: output_path.to_path_buf(),
                success: true,
                error: None,
            }
        }
        Err(e) => {
            log::error!(
                "Error processing {:?}: {}",
                input_path.file_name().unwrap_or_default(),
                e
            );
            ConversionResult::failed(input_path, output_path, e.to_string())
        }
    }
}

/// Convert a file, creating the output directory if needed
pub fn convert_file_with_mkdir(
    runner: &dyn ToolRunner,
    ffmpeg_path: &Path,
    input_path: &Path,
    output_dir: &Path,
) -> ConversionResult {
    let output_path = derivative_path(input_path, output_dir);

    if !output_dir.exists()
        && let Err(e) = std::fs::create_dir_all(output_dir)
    {
        return ConversionResult::failed(
            input_path,
            &output_path,
            format!("Failed to create output directory: {}", e),
        );
    }

    convert_file(runner, ffmpeg_path, input_path, &output_path)
}
