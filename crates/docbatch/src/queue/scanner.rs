//! Discovery of convertible files in folders and drop targets.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::QueueError;

/// Extensions picked up by folder scans.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "pdf", "docx", "pptx", "html", "htm", "md", "csv", "xlsx", "jpg", "jpeg", "png", "gif", "bmp",
    "tiff", "mp3", "mp4", "wav", "avi", "mov",
];

/// Extensions accepted by drop targets. Also takes structured text.
pub const DROP_EXTENSIONS: &[&str] = &[
    "pdf", "docx", "pptx", "html", "htm", "md", "csv", "xlsx", "jpg", "jpeg", "png", "gif", "bmp",
    "tiff", "mp3", "mp4", "wav", "avi", "mov", "xml", "json",
];

pub fn is_supported(path: &Path, allow_list: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            allow_list.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Lists supported files under `dir`, sorted and without duplicates.
pub fn scan_directory(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, QueueError> {
    if !dir.is_dir() {
        return Err(QueueError::InvalidInput {
            path: dir.to_path_buf(),
            reason: "not an existing directory".to_string(),
        });
    }

    let files = collect(dir, recursive, SUPPORTED_EXTENSIONS)?;

    info!("Scanned {} supported files in {}", files.len(), dir.display());
    Ok(files)
}

/// Expands dropped paths into the files a drop target accepts.
///
/// Directories are scanned recursively. Files with other extensions and
/// paths that no longer exist are dropped silently.
pub fn filter_dropped<I, P>(paths: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut accepted = BTreeSet::new();

    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            match collect(path, true, DROP_EXTENSIONS) {
                Ok(found) => accepted.extend(found),
                Err(e) => debug!("Skipping dropped folder {}: {}", path.display(), e),
            }
        } else if path.is_file() && is_supported(path, DROP_EXTENSIONS) {
            accepted.insert(path.to_path_buf());
        }
    }

    accepted.into_iter().collect()
}

fn collect(dir: &Path, recursive: bool, allow_list: &[&str]) -> Result<Vec<PathBuf>, QueueError> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut found = BTreeSet::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(max_depth) {
        let entry = match entry {
            Ok(entry) => entry,
            // Only an unreadable root fails the scan.
            Err(e) if e.depth() == 0 => {
                return Err(QueueError::ScanFailed {
                    path: dir.to_path_buf(),
                    source: e,
                })
            }
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                continue;
            }
        };

        // Symlinked documents count; the walk itself does not follow links.
        let path = entry.path();
        let is_file = entry.file_type().is_file()
            || (entry.path_is_symlink() && path.is_file());
        if !is_file {
            continue;
        }

        if is_supported(path, allow_list) {
            debug!("Found document: {}", path.display());
            found.insert(path.to_path_buf());
        }
    }

    Ok(found.into_iter().collect())
}
