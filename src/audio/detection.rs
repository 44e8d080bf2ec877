use std::path::Path;

/// What a file in the workspace is, judged by its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// FLAC source
    Lossless,
    /// MP3 derivative
    Compressed,
    /// ZIP bundle
    Archive,
    /// Cue sheet
    Index,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "flac" => Some(Self::Lossless),
            "mp3" => Some(Self::Compressed),
            "zip" => Some(Self::Archive),
            "cue" => Some(Self::Index),
            _ => None,
        }
    }

    /// Kinds removed when the workspace is reset
    pub fn is_disposable(self) -> bool {
        matches!(self, Self::Lossless | Self::Compressed | Self::Archive)
    }
}

pub fn is_lossless_audio(path: &Path) -> bool {
    FileKind::from_path(path) == Some(FileKind::Lossless)
}

pub fn is_index_document(path: &Path) -> bool {
    FileKind::from_path(path) == Some(FileKind::Index)
}
