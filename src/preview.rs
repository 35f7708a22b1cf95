//! Inspection of the image under the cursor.
//!
//! Sniffs the file content to report its real type and reads the pixel
//! dimensions from the header, which is all the front end needs to size the
//! image for display.

use crate::session::DisplaySize;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Bytes read from the start of a file for content sniffing.
const SNIFF_LEN: u64 = 8192;

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("Failed to load image: {}: {source}", .path.display())]
    Unreadable { path: PathBuf, source: io::Error },
    #[error("Failed to load image: {}: {reason}", .path.display())]
    Undecodable { path: PathBuf, reason: String },
}

/// What the front end shows about an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub path: PathBuf,
    /// MIME type detected from content, when recognised.
    pub mime_type: Option<String>,
    pub dimensions: DisplaySize,
}

/// Reads the type and dimensions of the image at `path`.
///
/// # Errors
///
/// Returns `Unreadable` if the file cannot be opened and `Undecodable` if its
/// header is not a supported image format.
pub fn inspect(path: &Path) -> Result<ImageInfo, PreviewError> {
    let mut head = Vec::new();
    File::open(path)
        .and_then(|file| file.take(SNIFF_LEN).read_to_end(&mut head))
        .map_err(|source| PreviewError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

    let mime_type = infer::get(&head).map(|kind| kind.mime_type().to_string());

    let (width, height) =
        image::image_dimensions(path).map_err(|e| PreviewError::Undecodable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    Ok(ImageInfo {
        path: path.to_path_buf(),
        mime_type,
        dimensions: DisplaySize::new(width, height),
    })
}
