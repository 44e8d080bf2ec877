//! Batch transcoding
//!
//! Sources are coalesced by path before anything runs. Each file is
//! converted independently; a failure is recorded in its result and the
//! rest of the batch carries on.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use super::ffmpeg::{convert_file_with_mkdir, derivative_path, ConversionResult};
use super::runner::ToolRunner;
use crate::core::{DerivativeAsset, SourceAsset};

/// Unique source paths in a stable order
pub fn dedupe_sources(sources: &[SourceAsset]) -> Vec<PathBuf> {
    sources
        .iter()
        .map(|s| s.path.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Convert every unique source into `output_dir`
pub fn transcode_all(
    runner: &dyn ToolRunner,
    ffmpeg_path: &Path,
    sources: &[SourceAsset],
    output_dir: &Path,
) -> Vec<ConversionResult> {
    let unique = dedupe_sources(sources);
    log::info!(
        "Converting {} FLAC file(s) to MP3 ({} duplicate(s) skipped)",
        unique.len(),
        sources.len() - unique.len()
    );

    let mut claimed_outputs = HashSet::new();
    let mut results = Vec::with_capacity(unique.len());

    for input_path in unique {
        let output_path = derivative_path(&input_path, output_dir);

        // Two sources with the same stem in different folders would write the same MP3
        if !claimed_outputs.insert(output_path.clone()) {
            log::error!(
                "Skipping {:?}: another source already produces {:?}",
                input_path,
                output_path.file_name().unwrap_or_default()
            );
            results.push(ConversionResult::failed(
                &input_path,
                &output_path,
                "duplicate output name in batch",
            ));
            continue;
        }

        results.push(convert_file_with_mkdir(runner, ffmpeg_path, &input_path, output_dir));
    }

    let failed = results.iter().filter(|r| !r.success).count();
    if failed > 0 {
        log::warn!("{} of {} conversion(s) failed", failed, results.len());
    }
    results
}

/// Derivatives from the successful conversions, in conversion order
pub fn derivatives(results: &[ConversionResult]) -> Vec<DerivativeAsset> {
    results.iter().filter_map(ConversionResult::derivative).collect()
}
