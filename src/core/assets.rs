//! Files moving through a batch: uploads, sources and derivatives

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Raw bytes handed over by whatever front end collected the files
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a local file as an upload, keeping only its file name
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { name, bytes })
    }
}

/// A lossless file found in the batch staging directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceAsset {
    pub path: PathBuf,
    pub file_name: String,
    pub byte_len: u64,
}

impl SourceAsset {
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let byte_len = std::fs::metadata(path)?.len();
        Ok(Self {
            path: path.to_path_buf(),
            file_name: file_name_of(path),
            byte_len,
        })
    }
}

/// An MP3 produced from exactly one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivativeAsset {
    pub path: PathBuf,
    pub file_name: String,
    pub source: PathBuf,
}

impl DerivativeAsset {
    pub fn new(path: PathBuf, source: PathBuf) -> Self {
        Self {
            file_name: file_name_of(&path),
            path,
            source,
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
