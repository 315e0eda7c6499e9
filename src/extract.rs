//! Staging extraction of downloaded export archives

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Extract a ZIP export archive into a staging directory
///
/// Entries with unsafe paths (absolute or escaping the destination) are
/// skipped. Returns the paths of the extracted files.
pub fn extract_archive(archive_path: &Path, dest_path: &Path) -> Result<Vec<PathBuf>> {
    debug!(?archive_path, ?dest_path, "extracting export archive");

    std::fs::create_dir_all(dest_path)?;

    let file = std::fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| Error::Extraction {
        archive: archive_path.to_path_buf(),
        reason: format!("failed to read ZIP archive: {}", e),
    })?;

    let mut extracted_files = Vec::new();

    for i in 0..archive.len() {
        let entry = archive.by_index(i).map_err(|e| Error::Extraction {
            archive: archive_path.to_path_buf(),
            reason: format!("failed to read ZIP entry: {}", e),
        })?;

        if let Some(path) = extract_entry(entry, dest_path, archive_path)? {
            extracted_files.push(path);
        }
    }

    info!(
        ?archive_path,
        extracted_count = extracted_files.len(),
        "export archive extracted"
    );
    Ok(extracted_files)
}

/// Extract a single entry to disk, creating directories as needed
fn extract_entry(
    mut entry: zip::read::ZipFile,
    dest_path: &Path,
    archive_path: &Path,
) -> Result<Option<PathBuf>> {
    let entry_path = match entry.enclosed_name() {
        Some(path) => dest_path.join(path),
        None => {
            warn!("skipping entry with unsafe path");
            return Ok(None);
        }
    };

    if entry.is_dir() {
        std::fs::create_dir_all(&entry_path)?;
        return Ok(None);
    }

    if let Some(parent) = entry_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut outfile = std::fs::File::create(&entry_path)?;
    std::io::copy(&mut entry, &mut outfile).map_err(|e| Error::Extraction {
        archive: archive_path.to_path_buf(),
        reason: format!("failed to extract entry: {}", e),
    })?;

    Ok(Some(entry_path))
}
