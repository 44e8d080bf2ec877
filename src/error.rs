//! Error types shared by every stage of the batch pipeline

use thiserror::Error;

/// Errors produced while staging, validating, converting or packaging a batch
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No duration could be found (index document or probe output)
    #[error("duration not found: {0}")]
    MissingDuration(String),

    /// An external tool could not be run, timed out, or exited non-zero
    #[error("{tool} failed: {reason}")]
    ToolInvocation { tool: String, reason: String },

    /// Index and asset durations differ by more than the tolerance
    #[error("index duration {index:.2}s does not match audio duration {asset:.2}s")]
    Mismatch { index: f64, asset: f64 },

    /// Uploaded bytes could not be persisted to the workspace
    #[error("failed to write upload {name}: {source}")]
    UploadWrite {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub fn tool(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ToolInvocation {
            tool: tool.into(),
            reason: reason.into(),
        }
    }
}
