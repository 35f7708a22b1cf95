//! Recursive image discovery.
//!
//! Walks a folder tree and collects every file whose name ends in one of the
//! recognised image extensions. The match is case-insensitive, so `IMG.JPG`
//! is queued alongside `img.jpg`.

use crate::config::CompiledFilters;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions recognised as images, without the leading dot.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "img"];

/// Returns true if `path` has one of the [`IMAGE_EXTENSIONS`].
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Collects image files below a root folder.
#[derive(Debug, Clone)]
pub struct ImageScanner {
    filters: CompiledFilters,
}

impl ImageScanner {
    pub fn new(filters: CompiledFilters) -> Self {
        Self { filters }
    }

    /// Scans `root` recursively and returns the image paths in walk order.
    ///
    /// Entries are visited in file-name order within each directory, so the
    /// result is stable across runs on the same tree. Anything below
    /// `skip_dir` is ignored; the session passes its save root here so that
    /// already classified images are never picked up again. Directories are
    /// compared by canonical path, so `sorted` and `./sorted` are the same.
    ///
    /// Unreadable entries are logged and skipped.
    pub fn scan(&self, root: &Path, skip_dir: Option<&Path>) -> Vec<PathBuf> {
        let mut images = Vec::new();
        let skip_dir = skip_dir.and_then(|dir| fs::canonicalize(dir).ok());

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| match &skip_dir {
                Some(skip) => !(entry.file_type().is_dir() && is_same_dir(entry.path(), skip)),
                None => true,
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !is_image_file(entry.path()) {
                continue;
            }

            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            if !self.filters.should_include(relative) {
                tracing::debug!("filtered out {}", entry.path().display());
                continue;
            }

            images.push(entry.into_path());
        }

        tracing::debug!("scanned {}: {} images", root.display(), images.len());
        images
    }
}

fn is_same_dir(dir: &Path, canonical: &Path) -> bool {
    fs::canonicalize(dir).is_ok_and(|dir| dir == canonical)
}

impl Default for ImageScanner {
    fn default() -> Self {
        Self::new(CompiledFilters::permissive())
    }
}
