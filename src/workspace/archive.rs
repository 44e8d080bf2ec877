//! ZIP expansion for uploaded bundles and packaging of the download

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::Result;

/// Expand every entry of a ZIP into `dest`
///
/// Entries whose path would escape `dest` are skipped, as is an entry that
/// would overwrite the archive itself. Returns the number of files written.
pub fn extract_zip(archive_path: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(archive_path)?;
    extract_from(BufReader::new(file), dest, archive_path)
}

fn extract_from<R: Read + Seek>(reader: R, dest: &Path, archive_path: &Path) -> Result<usize> {
    let mut archive = ZipArchive::new(reader)?;
    let mut extracted = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            log::warn!("Skipping unsafe archive entry: {}", entry.name());
            continue;
        };
        let target = dest.join(relative);
        if target == archive_path {
            log::warn!("Skipping archive entry that shadows the archive: {}", entry.name());
            continue;
        }

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
        extracted += 1;
    }

    Ok(extracted)
}

/// Write `files` into a new ZIP at `archive_path`, flattened to their file names
pub fn write_zip(archive_path: &Path, files: &[PathBuf]) -> Result<()> {
    let file = File::create(archive_path)?;
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        writer.start_file(name.as_str(), options)?;
        let mut src = File::open(path)?;
        io::copy(&mut src, &mut writer)?;
        log::info!("Added {} to ZIP.", name);
    }

    writer.finish()?;
    Ok(())
}

/// Names of the entries in a ZIP, in archive order
pub fn list_entries(archive_path: &Path) -> Result<Vec<String>> {
    let mut archive = ZipArchive::new(BufReader::new(File::open(archive_path)?))?;
    let names = (0..archive.len())
        .map(|i| archive.by_index(i).map(|entry| entry.name().to_string()))
        .collect::<zip::result::ZipResult<Vec<_>>>()?;
    Ok(names)
}
