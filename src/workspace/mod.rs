//! Workspace directory management
//!
//! The workspace is a temp directory for uploads and an output directory for
//! derivatives and the download archive:
//! - Each batch stages its uploads in its own `temp_dir/batch-<uuid>/`, so a
//!   batch only ever sees the files it was given
//! - `reset()` clears audio and archive files left at the top of both dirs
//! - Leftover batch directories from interrupted runs can be swept

mod archive;

pub use archive::{extract_zip, list_entries, write_zip};

use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::audio::{is_index_document, is_lossless_audio, FileKind};
use crate::core::{DerivativeAsset, PipelineSettings, SourceAsset, Upload};
use crate::error::{PipelineError, Result};

/// Name of the download archive written to the output directory
pub const ARCHIVE_NAME: &str = "processed_files.zip";

const BATCH_DIR_PREFIX: &str = "batch-";

/// Staging area for one batch
#[derive(Debug, Clone)]
pub struct Batch {
    id: Uuid,
    dir: PathBuf,
}

impl Batch {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Owns the temp and output directories
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    temp_dir: PathBuf,
    output_dir: PathBuf,
}

impl WorkspaceManager {
    /// Create the manager, making sure both directories exist
    pub fn new(settings: &PipelineSettings) -> Result<Self> {
        let temp_dir = settings.temp_dir.clone();
        let output_dir = settings.output_dir();
        fs::create_dir_all(&temp_dir)?;
        fs::create_dir_all(&output_dir)?;
        log::debug!("Workspace ready: temp {:?}, output {:?}", temp_dir, output_dir);
        Ok(Self {
            temp_dir,
            output_dir,
        })
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn archive_path(&self) -> PathBuf {
        self.output_dir.join(ARCHIVE_NAME)
    }

    /// Delete FLAC, MP3 and ZIP files from both directories
    ///
    /// Subdirectories and other files are left alone. Safe to call
    /// repeatedly; returns how many files were removed.
    pub fn reset(&self) -> Result<usize> {
        log::info!("Clearing temporary and output directories.");
        let mut removed = 0;

        for dir in [&self.temp_dir, &self.output_dir] {
            if !dir.exists() {
                continue;
            }
            for entry in fs::read_dir(dir)? {
                let path = entry?.path();
                if !path.is_file() {
                    continue;
                }
                if FileKind::from_path(&path).is_some_and(FileKind::is_disposable) {
                    fs::remove_file(&path)?;
                    log::info!("Deleted file: {:?}", path.file_name().unwrap_or_default());
                    removed += 1;
                }
            }
        }

        Ok(removed)
    }

    /// Create a fresh staging directory for a batch
    pub fn begin_batch(&self) -> Result<Batch> {
        let id = Uuid::new_v4();
        let dir = self.temp_dir.join(format!("{}{}", BATCH_DIR_PREFIX, id));
        fs::create_dir_all(&dir)?;
        log::debug!("Created batch {} at {:?}", id, dir);
        Ok(Batch { id, dir })
    }

    /// Write one upload into the batch, expanding archives in place
    ///
    /// Returns the detected kind, or `None` if the file type is not handled.
    pub fn stage_upload(&self, batch: &Batch, upload: &Upload) -> Result<Option<FileKind>> {
        // Only the final component is trusted
        let name = Path::new(&upload.name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let path = batch.dir.join(&name);

        let Some(kind) = FileKind::from_path(&path) else {
            log::warn!("Ignoring upload with unsupported type: {}", upload.name);
            return Ok(None);
        };
        if kind == FileKind::Compressed {
            log::warn!("Ignoring already compressed upload: {}", upload.name);
            return Ok(None);
        }

        fs::write(&path, &upload.bytes).map_err(|source| PipelineError::UploadWrite {
            name: upload.name.clone(),
            source,
        })?;

        if kind == FileKind::Archive {
            let count = extract_zip(&path, &batch.dir)?;
            log::info!("Extracted {} file(s) from {}", count, name);
        } else {
            log::debug!("Staged {} ({} bytes)", name, upload.bytes.len());
        }

        Ok(Some(kind))
    }

    /// Every FLAC file in the batch, including ones from expanded archives
    pub fn collect_sources(&self, batch: &Batch) -> Result<Vec<SourceAsset>> {
        let mut sources = Vec::new();
        for entry in WalkDir::new(&batch.dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                PipelineError::Io(e.into_io_error().unwrap_or_else(|| {
                    std::io::Error::other("filesystem loop in batch directory")
                }))
            })?;
            if entry.file_type().is_file() && is_lossless_audio(entry.path()) {
                sources.push(SourceAsset::from_path(entry.path())?);
            }
        }
        Ok(sources)
    }

    /// First index document in the batch, by sorted path
    pub fn find_index(&self, batch: &Batch) -> Option<PathBuf> {
        WalkDir::new(&batch.dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .find(|e| e.file_type().is_file() && is_index_document(e.path()))
            .map(|e| e.into_path())
    }

    /// Write the download archive containing exactly `derivatives`
    pub fn package(&self, derivatives: &[DerivativeAsset]) -> Result<PathBuf> {
        let archive_path = self.archive_path();
        let files: Vec<PathBuf> = derivatives.iter().map(|d| d.path.clone()).collect();
        write_zip(&archive_path, &files)?;
        log::info!("Packaged {} file(s) into {:?}", files.len(), archive_path);
        Ok(archive_path)
    }

    /// Remove a batch's staging directory
    pub fn finish_batch(&self, batch: &Batch) -> Result<()> {
        if batch.dir.exists() {
            fs::remove_dir_all(&batch.dir)?;
            log::debug!("Removed batch directory {:?}", batch.dir);
        }
        Ok(())
    }

    /// Remove batch directories left behind by earlier runs
    pub fn cleanup_stale_batches(&self) -> Result<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.temp_dir)?.flatten() {
            let path = entry.path();
            let is_batch = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(BATCH_DIR_PREFIX));
            if is_batch && path.is_dir() {
                match fs::remove_dir_all(&path) {
                    Ok(()) => {
                        log::info!("Cleaned up old batch: {:?}", path);
                        removed += 1;
                    }
                    Err(e) => log::warn!("Failed to clean old batch {:?}: {}", path, e),
                }
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{test_settings, zip_bytes};
    use tempfile::TempDir;

    fn workspace(temp: &TempDir) -> WorkspaceManager {
        WorkspaceManager::new(&test_settings(temp.path())).unwrap()
    }

    #[test]
    fn test_new_creates_directories() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);
        assert!(ws.temp_dir().is_dir());
        assert!(ws.output_dir().is_dir());
        assert!(ws.archive_path().ends_with(ARCHIVE_NAME));
    }

    #[test]
    fn test_reset_removes_only_audio_and_archives() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);
        for name in ["a.flac", "b.mp3", "c.zip", "d.txt"] {
            fs::write(ws.temp_dir().join(name), b"x").unwrap();
        }
        fs::write(ws.output_dir().join("e.MP3"), b"x").unwrap();

        let removed = ws.reset().unwrap();

        assert_eq!(removed, 4);
        assert!(!ws.temp_dir().join("a.flac").exists());
        assert!(!ws.temp_dir().join("b.mp3").exists());
        assert!(!ws.temp_dir().join("c.zip").exists());
        assert!(ws.temp_dir().join("d.txt").exists());
        assert!(!ws.output_dir().join("e.MP3").exists());
        // The output dir lives inside temp and must survive
        assert!(ws.output_dir().is_dir());
    }

    #[test]
    fn test_reset_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);
        fs::write(ws.temp_dir().join("a.flac"), b"x").unwrap();
        fs::write(ws.temp_dir().join("notes.txt"), b"x").unwrap();

        assert_eq!(ws.reset().unwrap(), 1);
        assert_eq!(ws.reset().unwrap(), 0);
        assert!(ws.temp_dir().join("notes.txt").exists());
    }

    #[test]
    fn test_reset_leaves_subdirectories() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);
        let batch = ws.begin_batch().unwrap();
        fs::write(batch.dir().join("kept.flac"), b"x").unwrap();

        ws.reset().unwrap();
        assert!(batch.dir().join("kept.flac").exists());
    }

    #[test]
    fn test_stage_flac_and_cue() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);
        let batch = ws.begin_batch().unwrap();

        let kind = ws.stage_upload(&batch, &Upload::new("song.flac", b"fLaC".to_vec())).unwrap();
        assert_eq!(kind, Some(FileKind::Lossless));
        let kind = ws
            .stage_upload(&batch, &Upload::new("album.cue", b"duration=1.0".to_vec()))
            .unwrap();
        assert_eq!(kind, Some(FileKind::Index));

        let sources = ws.collect_sources(&batch).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].file_name, "song.flac");
        assert_eq!(sources[0].byte_len, 4);
        assert_eq!(ws.find_index(&batch), Some(batch.dir().join("album.cue")));
    }

    #[test]
    fn test_stage_ignores_unsupported_types() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);
        let batch = ws.begin_batch().unwrap();

        assert_eq!(ws.stage_upload(&batch, &Upload::new("cover.jpg", vec![1])).unwrap(), None);
        assert_eq!(ws.stage_upload(&batch, &Upload::new("old.mp3", vec![1])).unwrap(), None);
        assert!(!batch.dir().join("cover.jpg").exists());
    }

    #[test]
    fn test_stage_strips_directory_components() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);
        let batch = ws.begin_batch().unwrap();

        ws.stage_upload(&batch, &Upload::new("../../escape.flac", vec![1])).unwrap();
        assert!(batch.dir().join("escape.flac").exists());
    }

    #[test]
    fn test_stage_archive_expands_into_batch() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);
        let batch = ws.begin_batch().unwrap();
        let bytes = zip_bytes(&[
            ("Album/02.flac", "two"),
            ("Album/01.flac", "one"),
            ("Album/album.cue", "duration=10.0"),
        ]);

        let kind = ws.stage_upload(&batch, &Upload::new("album.zip", bytes)).unwrap();
        assert_eq!(kind, Some(FileKind::Archive));

        let names: Vec<String> = ws
            .collect_sources(&batch)
            .unwrap()
            .into_iter()
            .map(|s| s.file_name)
            .collect();
        assert_eq!(names, vec!["01.flac", "02.flac"]);
        assert!(ws.find_index(&batch).is_some());
    }

    #[test]
    fn test_batches_do_not_see_each_other() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);
        // Leftovers from a previous run, at the top level and in an old batch
        fs::write(ws.temp_dir().join("leftover.flac"), b"x").unwrap();
        let old = ws.begin_batch().unwrap();
        fs::write(old.dir().join("old.flac"), b"x").unwrap();

        let batch = ws.begin_batch().unwrap();
        ws.stage_upload(&batch, &Upload::new("new.flac", vec![1])).unwrap();

        let sources = ws.collect_sources(&batch).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].file_name, "new.flac");
        assert_ne!(old.id(), batch.id());
    }

    #[test]
    fn test_stage_write_failure_is_upload_write() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);
        let batch = ws.begin_batch().unwrap();
        ws.finish_batch(&batch).unwrap();

        let err = ws
            .stage_upload(&batch, &Upload::new("song.flac", vec![1]))
            .unwrap_err();
        assert!(matches!(err, PipelineError::UploadWrite { .. }));
    }

    #[test]
    fn test_package_contains_only_given_derivatives() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);
        let a = ws.output_dir().join("a.mp3");
        fs::write(&a, b"a").unwrap();
        fs::write(ws.output_dir().join("stale.mp3"), b"s").unwrap();

        let archive = ws
            .package(&[DerivativeAsset::new(a, PathBuf::from("/in/a.flac"))])
            .unwrap();

        assert_eq!(list_entries(&archive).unwrap(), vec!["a.mp3"]);
    }

    #[test]
    fn test_finish_and_cleanup_batches() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);
        let done = ws.begin_batch().unwrap();
        ws.finish_batch(&done).unwrap();
        assert!(!done.dir().exists());
        // Finishing twice is fine
        ws.finish_batch(&done).unwrap();

        ws.begin_batch().unwrap();
        ws.begin_batch().unwrap();
        fs::create_dir(ws.temp_dir().join("unrelated")).unwrap();

        assert_eq!(ws.cleanup_stale_batches().unwrap(), 2);
        assert!(ws.temp_dir().join("unrelated").is_dir());
        assert!(ws.output_dir().is_dir());
    }
}
