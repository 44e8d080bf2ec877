//! Core types shared across the pipeline
//!
//! This module contains:
//! - Pipeline settings (paths, tool locations, timeouts)
//! - Upload, source and derivative asset types
//! - Batch state machine and the per-run report

mod assets;
mod settings;
mod state;

pub use assets::{DerivativeAsset, SourceAsset, Upload};
pub use settings::{PipelineSettings, ProbeBackend};
pub use state::{BatchReport, BatchState};
