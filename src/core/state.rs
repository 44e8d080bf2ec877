//! Batch state and the report produced by one pipeline run

use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::SourceAsset;
use crate::conversion::{ConversionResult, GainResult};
use crate::error::{PipelineError, Result};

/// Where a batch is in its lifecycle
///
/// `Empty → Populated → Validated | Rejected → Transcoded → Normalized → Packaged`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Empty,
    Populated,
    Validated,
    Rejected,
    Transcoded,
    Normalized,
    Packaged,
}

impl BatchState {
    /// Whether `next` is a legal successor of this state
    pub fn can_advance_to(self, next: BatchState) -> bool {
        use BatchState::*;
        matches!(
            (self, next),
            (Empty, Populated)
                | (Empty, Rejected)
                | (Populated, Validated)
                | (Populated, Rejected)
                | (Validated, Transcoded)
                | (Transcoded, Normalized)
                | (Normalized, Packaged)
        )
    }
}

/// Everything known about one batch once the pipeline returns
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub state: BatchState,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
    pub sources: Vec<SourceAsset>,
    pub index_document: Option<PathBuf>,
    /// Why validation rejected the batch, if it did
    pub rejection: Option<String>,
    pub conversions: Vec<ConversionResult>,
    pub gains: Vec<GainResult>,
    pub archive: Option<PathBuf>,
    /// Short user-facing message
    pub status: String,
}

impl BatchReport {
    pub fn new(batch_id: Uuid) -> Self {
        Self {
            batch_id,
            state: BatchState::Empty,
            started_at: Local::now(),
            finished_at: None,
            sources: Vec::new(),
            index_document: None,
            rejection: None,
            conversions: Vec::new(),
            gains: Vec::new(),
            archive: None,
            status: String::new(),
        }
    }

    /// Move to `next`, logging the transition
    pub fn advance(&mut self, next: BatchState) {
        if !self.state.can_advance_to(next) {
            log::warn!(
                "Batch {}: unexpected transition {:?} -> {:?}",
                self.batch_id,
                self.state,
                next
            );
        }
        log::debug!("Batch {}: {:?} -> {:?}", self.batch_id, self.state, next);
        self.state = next;
    }

    pub fn finish(&mut self, status: impl Into<String>) {
        self.status = status.into();
        self.finished_at = Some(Local::now());
    }

    pub fn is_packaged(&self) -> bool {
        self.state == BatchState::Packaged
    }

    pub fn converted_count(&self) -> usize {
        self.conversions.iter().filter(|c| c.success).count()
    }

    pub fn failed_count(&self) -> usize {
        self.conversions.iter().filter(|c| !c.success).count()
            + self.gains.iter().filter(|g| !g.success).count()
    }

    /// Write the report as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PipelineError::Config(format!("failed to serialize report: {}", e)))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
