/// Low-level file moves used by the triage session.
///
/// This module provides the two filesystem primitives the session relies on:
/// creating a destination directory if it is absent, and moving a single file
/// to an exact destination path. A move is a plain rename when source and
/// destination share a volume, and a copy followed by a delete otherwise.
use std::fs;
use std::io;
use std::path::Path;

/// Creates `dir` (and any missing parents) if it does not exist yet.
///
/// Calling this on an existing directory is a no-op.
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir)
}

/// Moves `source` to exactly `destination`.
///
/// The destination's parent directory must already exist and the
/// destination itself must not; callers check for collisions first.
///
/// # Errors
///
/// Returns the underlying I/O error if neither the rename nor the
/// cross-volume fallback succeeds. On failure the source file is left in
/// place and no partial copy remains at the destination.
///
/// # Examples
///
/// ```no_run
/// use imgtriage::file_mover::move_file;
/// use std::path::Path;
///
/// move_file(Path::new("/photos/a.jpg"), Path::new("/sorted/cats/a.jpg"))
///     .expect("move failed");
/// ```
pub fn move_file(source: &Path, destination: &Path) -> io::Result<()> {
    if destination.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("destination already exists: {}", destination.display()),
        ));
    }

    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            tracing::debug!(
                "rename across volumes, copying {} -> {}",
                source.display(),
                destination.display()
            );
            copy_then_remove(source, destination)
        }
        Err(e) => Err(e),
    }
}

fn copy_then_remove(source: &Path, destination: &Path) -> io::Result<()> {
    if let Err(e) = fs::copy(source, destination) {
        let _ = fs::remove_file(destination);
        return Err(e);
    }

    if let Err(e) = fs::remove_file(source) {
        // Roll back so the file exists in exactly one place.
        let _ = fs::remove_file(destination);
        return Err(e);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_dir_creates_nested_directories() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested = temp_dir.path().join("a").join("b");

        ensure_dir(&nested).expect("Failed to create directory");
        assert!(nested.is_dir());

        // Second call is a no-op
        ensure_dir(&nested).expect("Second call should succeed");
    }

    #[test]
    fn test_move_file_to_exact_destination() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("photo.jpg");
        fs::write(&source, b"jpeg bytes").expect("Failed to write test file");

        let dest_dir = temp_dir.path().join("cats");
        ensure_dir(&dest_dir).expect("Failed to create directory");
        let destination = dest_dir.join("photo.jpg");

        move_file(&source, &destination).expect("Failed to move file");

        assert!(!source.exists());
        assert_eq!(fs::read(&destination).unwrap(), b"jpeg bytes");
    }

    #[test]
    fn test_move_file_refuses_existing_destination() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("a.png");
        let destination = temp_dir.path().join("b.png");
        fs::write(&source, b"new").unwrap();
        fs::write(&destination, b"old").unwrap();

        let err = move_file(&source, &destination).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert!(source.exists());
        assert_eq!(fs::read(&destination).unwrap(), b"old");
    }

    #[test]
    fn test_move_missing_source_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = move_file(
            &temp_dir.path().join("missing.jpg"),
            &temp_dir.path().join("out.jpg"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_copy_then_remove_moves_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("photo.jpg");
        let destination = temp_dir.path().join("copy.jpg");
        fs::write(&source, b"jpeg bytes").unwrap();

        copy_then_remove(&source, &destination).expect("Failed to copy file");

        assert!(!source.exists());
        assert_eq!(fs::read(&destination).unwrap(), b"jpeg bytes");
    }

    #[test]
    fn test_failed_copy_leaves_no_destination() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("album");
        fs::create_dir(&source).unwrap();
        let destination = temp_dir.path().join("album.jpg");

        assert!(copy_then_remove(&source, &destination).is_err());
        assert!(source.is_dir());
        assert!(!destination.exists());
    }
}
