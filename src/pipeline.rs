//! Batch pipeline
//!
//! Drives one batch through its states:
//! upload → validate → transcode → normalize → package.
//!
//! Validation failures stop the batch before any transcoding. Failures of
//! individual files while transcoding or normalizing are recorded in the
//! report and the batch still gets packaged with whatever succeeded.

use crate::audio::{validate_pairing, DurationProbe};
use crate::conversion::{derivatives, normalize_all, transcode_all, ToolRunner};
use crate::core::{BatchReport, BatchState, PipelineSettings, Upload};
use crate::workspace::{Batch, WorkspaceManager, ARCHIVE_NAME};

pub const STATUS_NO_UPLOADS: &str = "No files uploaded.";
pub const STATUS_MISMATCH: &str = "CUE and FLAC file mismatch detected. Skipping processing.";
pub const STATUS_NOTHING_TO_DO: &str =
    "No valid FLAC files found or an error occurred during processing.";
pub const STATUS_PACKAGE_FAILED: &str = "Processing finished but the download archive could not be created.";

pub struct BatchPipeline<'a> {
    settings: &'a PipelineSettings,
    workspace: &'a WorkspaceManager,
    runner: &'a dyn ToolRunner,
    probe: &'a dyn DurationProbe,
}

impl<'a> BatchPipeline<'a> {
    pub fn new(
        settings: &'a PipelineSettings,
        workspace: &'a WorkspaceManager,
        runner: &'a dyn ToolRunner,
        probe: &'a dyn DurationProbe,
    ) -> Self {
        Self {
            settings,
            workspace,
            runner,
            probe,
        }
    }

    /// Run one batch to completion and report what happened
    pub fn run(&self, uploads: &[Upload]) -> BatchReport {
        let batch = match self.workspace.begin_batch() {
            Ok(batch) => batch,
            Err(e) => {
                log::error!("Could not create batch directory: {}", e);
                let mut report = BatchReport::new(uuid::Uuid::nil());
                report.advance(BatchState::Rejected);
                report.finish(STATUS_NOTHING_TO_DO);
                return report;
            }
        };

        let mut report = BatchReport::new(batch.id());
        self.process(&batch, uploads, &mut report);

        if let Err(e) = self.workspace.finish_batch(&batch) {
            log::warn!("Failed to remove batch directory {:?}: {}", batch.dir(), e);
        }
        report
    }

    fn process(&self, batch: &Batch, uploads: &[Upload], report: &mut BatchReport) {
        if uploads.is_empty() {
            log::warn!("No files uploaded.");
            report.finish(STATUS_NO_UPLOADS);
            return;
        }

        log::info!("Processing {} uploaded file(s).", uploads.len());
        let mut upload_failed = false;
        for upload in uploads {
            if let Err(e) = self.workspace.stage_upload(batch, upload) {
                log::error!("Error processing {}: {}", upload.name, e);
                upload_failed = true;
            }
        }

        let sources = match self.workspace.collect_sources(batch) {
            Ok(sources) => sources,
            Err(e) => {
                log::error!("Failed to scan batch directory: {}", e);
                upload_failed = true;
                Vec::new()
            }
        };
        report.sources = sources;
        report.index_document = self.workspace.find_index(batch);
        report.advance(BatchState::Populated);

        if upload_failed || report.sources.is_empty() {
            log::warn!("No valid FLAC files found or processing failed.");
            report.advance(BatchState::Rejected);
            report.finish(STATUS_NOTHING_TO_DO);
            return;
        }

        // The index describes one file; it is checked against the first source
        if let Some(index) = report.index_document.clone() {
            let first = report.sources[0].path.clone();
            if let Err(e) = validate_pairing(&index, &first, self.probe) {
                log::error!("Error while validating CUE and FLAC match: {}", e);
                log::error!("CUE and FLAC file mismatch detected. Skipping processing.");
                report.rejection = Some(e.to_string());
                report.advance(BatchState::Rejected);
                report.finish(STATUS_MISMATCH);
                return;
            }
        }
        report.advance(BatchState::Validated);

        report.conversions = transcode_all(
            self.runner,
            &self.settings.ffmpeg_path,
            &report.sources,
            self.workspace.output_dir(),
        );
        report.advance(BatchState::Transcoded);

        let produced = derivatives(&report.conversions);
        report.gains = normalize_all(self.runner, &self.settings.mp3gain_path, &produced);
        report.advance(BatchState::Normalized);

        match self.workspace.package(&produced) {
            Ok(archive) => {
                report.archive = Some(archive);
                report.advance(BatchState::Packaged);
                let status = format!(
                    "Processed {} of {} file(s). Download: {}",
                    produced.len(),
                    report.conversions.len(),
                    ARCHIVE_NAME
                );
                report.finish(status);
            }
            Err(e) => {
                log::error!("Failed to create download archive: {}", e);
                report.finish(STATUS_PACKAGE_FAILED);
            }
        }
    }
}
