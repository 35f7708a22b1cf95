/// The image triage state machine.
///
/// A [`TriageSession`] owns the queue of images still to be sorted, a cursor
/// pointing at the image currently shown, and a stack of undoable moves.
/// Classifying the current image moves it into `save_root/<folder>/` and
/// drops it from the queue; undo moves the most recent file back and rebuilds
/// the queue from disk.
///
/// The session has no UI dependency. A front end calls the operations below
/// and renders whatever they report.
///
/// # Examples
///
/// ```no_run
/// use imgtriage::category_store::CategoryStore;
/// use imgtriage::session::{ClassifyOutcome, TriageSession};
/// use std::path::Path;
///
/// let store = CategoryStore::load("classify_button.json");
/// let mut session = TriageSession::default();
/// session.open_folder(Path::new("/photos/unsorted")).unwrap();
/// session.set_save_root(Path::new("/photos/sorted")).unwrap();
///
/// if let Some(category) = store.categories().first() {
///     match session.classify(category).unwrap() {
///         ClassifyOutcome::Moved { destination, .. } => println!("-> {}", destination.display()),
///         other => println!("{:?}", other),
///     }
/// }
/// ```
use crate::category_store::Category;
use crate::file_mover;
use crate::scanner::ImageScanner;
use chrono::{DateTime, Local};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Smallest edge accepted for a pinned display size.
pub const MIN_DISPLAY_EDGE: u32 = 100;

/// Navigation direction for [`TriageSession::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Prev,
    Next,
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySize {
    pub width: u32,
    pub height: u32,
}

impl DisplaySize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Record needed to reverse one classify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoEntry {
    /// Where the file was moved to.
    pub destination_path: PathBuf,
    /// Directory the file came from.
    pub origin_directory: PathBuf,
    pub moved_at: DateTime<Local>,
}

/// Result of [`TriageSession::open_folder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Loaded(usize),
    EmptyFolder,
}

/// Result of a successful [`TriageSession::classify`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifyOutcome {
    /// The queue was empty; nothing happened.
    NothingQueued,
    /// The image was moved and more images remain.
    Moved {
        destination: PathBuf,
        remaining: usize,
    },
    /// The image was moved and the queue is now empty.
    QueueExhausted { destination: PathBuf },
    /// A file already exists at the destination. The image stays queued and
    /// the cursor moved on to the next image.
    Collision { destination: PathBuf },
}

/// Result of a successful [`TriageSession::undo`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoOutcome {
    /// Path the file was restored to.
    pub restored: PathBuf,
    /// Queue length after the rescan.
    pub queued: usize,
}

/// Errors reported by the triage session. None of them change session state.
#[derive(Debug, Error)]
pub enum TriageError {
    #[error("Source folder does not exist: {}", .0.display())]
    SourceNotFound(PathBuf),
    #[error("Save folder does not exist: {}", .0.display())]
    InvalidSaveRoot(PathBuf),
    #[error("No save folder set")]
    SaveRootUnset,
    #[error("Failed to move {} to {}: {source}", .from.display(), .to.display())]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    #[error("Nothing to undo")]
    NothingToUndo,
}

pub type TriageResult<T> = Result<T, TriageError>;

/// Scales `image` to fit inside `viewport`, keeping its aspect ratio.
///
/// The image may be scaled up as well as down. A zero-sized image or viewport
/// yields a zero size.
///
/// # Examples
///
/// ```
/// use imgtriage::session::{compute_fit_size, DisplaySize};
///
/// let fit = compute_fit_size(DisplaySize::new(100, 200), DisplaySize::new(800, 400));
/// assert_eq!(fit, DisplaySize::new(200, 400));
/// ```
pub fn compute_fit_size(image: DisplaySize, viewport: DisplaySize) -> DisplaySize {
    if image.width == 0 || image.height == 0 || viewport.width == 0 || viewport.height == 0 {
        return DisplaySize::new(0, 0);
    }

    let scale = f64::min(
        f64::from(viewport.height) / f64::from(image.height),
        f64::from(viewport.width) / f64::from(image.width),
    );

    DisplaySize::new(
        (f64::from(image.width) * scale).round() as u32,
        (f64::from(image.height) * scale).round() as u32,
    )
}

/// Queue, cursor and undo history for one folder-cleaning pass.
#[derive(Debug, Default)]
pub struct TriageSession {
    scanner: ImageScanner,
    source_dir: Option<PathBuf>,
    save_root: Option<PathBuf>,
    queue: Vec<PathBuf>,
    cursor: usize,
    undo_stack: Vec<UndoEntry>,
    pinned_size: Option<DisplaySize>,
}

impl TriageSession {
    pub fn new(scanner: ImageScanner) -> Self {
        Self {
            scanner,
            ..Default::default()
        }
    }

    /// Scans `path` recursively and replaces the queue with the result.
    ///
    /// The cursor resets to the first image. The undo history is kept.
    ///
    /// # Errors
    ///
    /// Returns `SourceNotFound` if `path` is not a directory; the session is
    /// left as it was.
    pub fn open_folder(&mut self, path: &Path) -> TriageResult<ScanOutcome> {
        if !path.is_dir() {
            return Err(TriageError::SourceNotFound(path.to_path_buf()));
        }

        self.source_dir = Some(path.to_path_buf());
        self.queue = self.scanner.scan(path, self.save_root.as_deref());
        self.cursor = 0;
        self.pinned_size = None;

        tracing::debug!("opened {} with {} images", path.display(), self.queue.len());

        if self.queue.is_empty() {
            Ok(ScanOutcome::EmptyFolder)
        } else {
            Ok(ScanOutcome::Loaded(self.queue.len()))
        }
    }

    /// Sets the folder that category subfolders are created under.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSaveRoot` if `path` is not an existing directory.
    pub fn set_save_root(&mut self, path: &Path) -> TriageResult<()> {
        if !path.is_dir() {
            return Err(TriageError::InvalidSaveRoot(path.to_path_buf()));
        }
        self.save_root = Some(path.to_path_buf());
        Ok(())
    }

    pub fn source_dir(&self) -> Option<&Path> {
        self.source_dir.as_deref()
    }

    pub fn save_root(&self) -> Option<&Path> {
        self.save_root.as_deref()
    }

    /// The image under the cursor, if any.
    pub fn current(&self) -> Option<&Path> {
        self.queue.get(self.cursor).map(PathBuf::as_path)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn queue(&self) -> &[PathBuf] {
        &self.queue
    }

    /// Number of images from the cursor to the end of the queue.
    pub fn remaining(&self) -> usize {
        self.queue.len().saturating_sub(self.cursor)
    }

    /// Undo history, oldest first.
    pub fn undo_history(&self) -> &[UndoEntry] {
        &self.undo_stack
    }

    /// Moves the cursor one step. Does nothing at either end of the queue.
    pub fn advance(&mut self, direction: Direction) {
        let moved = match direction {
            Direction::Prev if self.cursor > 0 => {
                self.cursor -= 1;
                true
            }
            Direction::Next if self.cursor + 1 < self.queue.len() => {
                self.cursor += 1;
                true
            }
            _ => false,
        };

        if moved {
            self.pinned_size = None;
        }
    }

    /// Moves the current image into `save_root/<category folder>/`.
    ///
    /// The move is all or nothing: on error the file, queue, cursor and undo
    /// history are unchanged. The undo entry is recorded immediately after the
    /// filesystem move returns.
    ///
    /// # Errors
    ///
    /// * `SaveRootUnset` if no save folder has been set
    /// * `MoveFailed` if the destination folder cannot be created or the move fails
    pub fn classify(&mut self, category: &Category) -> TriageResult<ClassifyOutcome> {
        let Some(image) = self.queue.get(self.cursor).cloned() else {
            return Ok(ClassifyOutcome::NothingQueued);
        };
        let save_root = self.save_root.as_ref().ok_or(TriageError::SaveRootUnset)?;

        let target_dir = save_root.join(&category.destination_folder);
        let move_failed = |source| TriageError::MoveFailed {
            from: image.clone(),
            to: target_dir.clone(),
            source,
        };

        let file_name = image.file_name().ok_or_else(|| {
            move_failed(io::Error::new(
                io::ErrorKind::InvalidInput,
                "image path has no file name",
            ))
        })?;
        let destination = target_dir.join(file_name);

        file_mover::ensure_dir(&target_dir).map_err(move_failed)?;

        if destination.exists() {
            tracing::debug!("collision at {}, skipping", destination.display());
            self.advance(Direction::Next);
            return Ok(ClassifyOutcome::Collision { destination });
        }

        let origin_directory = image
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        file_mover::move_file(&image, &destination).map_err(|source| TriageError::MoveFailed {
            from: image.clone(),
            to: destination.clone(),
            source,
        })?;
        self.undo_stack.push(UndoEntry {
            destination_path: destination.clone(),
            origin_directory,
            moved_at: Local::now(),
        });

        tracing::debug!("moved {} -> {}", image.display(), destination.display());

        self.queue.remove(self.cursor);
        self.pinned_size = None;

        if self.queue.is_empty() {
            self.cursor = 0;
            return Ok(ClassifyOutcome::QueueExhausted { destination });
        }

        self.cursor = self.cursor.min(self.queue.len() - 1);
        Ok(ClassifyOutcome::Moved {
            destination,
            remaining: self.queue.len(),
        })
    }

    /// Reverses the most recent classify and rescans the source folder.
    ///
    /// The restored image rejoins the queue at whatever position the scan
    /// puts it. The cursor keeps its index, clamped to the new queue.
    ///
    /// # Errors
    ///
    /// * `NothingToUndo` if no classify has been recorded
    /// * `MoveFailed` if the file cannot be moved back, for instance because
    ///   its original path is occupied again; the entry stays on the stack
    pub fn undo(&mut self) -> TriageResult<UndoOutcome> {
        let entry = self.undo_stack.pop().ok_or(TriageError::NothingToUndo)?;

        let restored = match entry.destination_path.file_name() {
            Some(name) => entry.origin_directory.join(name),
            None => entry.origin_directory.clone(),
        };

        if let Err(source) = file_mover::ensure_dir(&entry.origin_directory)
            .and_then(|()| file_mover::move_file(&entry.destination_path, &restored))
        {
            let err = TriageError::MoveFailed {
                from: entry.destination_path.clone(),
                to: restored,
                source,
            };
            self.undo_stack.push(entry);
            return Err(err);
        }

        tracing::debug!(
            "restored {} -> {}",
            entry.destination_path.display(),
            restored.display()
        );

        self.rescan();
        Ok(UndoOutcome {
            restored,
            queued: self.queue.len(),
        })
    }

    /// The size to draw the current image at.
    ///
    /// A pinned size wins; otherwise the image is fitted to `viewport`.
    pub fn display_size(&self, image: DisplaySize, viewport: DisplaySize) -> DisplaySize {
        self.pinned_size
            .unwrap_or_else(|| compute_fit_size(image, viewport))
    }

    /// Overrides the display size until the current image changes.
    pub fn pin_display_size(&mut self, size: DisplaySize) {
        self.pinned_size = Some(DisplaySize::new(
            size.width.max(MIN_DISPLAY_EDGE),
            size.height.max(MIN_DISPLAY_EDGE),
        ));
    }

    pub fn pinned_display_size(&self) -> Option<DisplaySize> {
        self.pinned_size
    }

    fn rescan(&mut self) {
        let Some(source) = self.source_dir.as_deref() else {
            return;
        };

        self.queue = self.scanner.scan(source, self.save_root.as_deref());
        self.cursor = self.cursor.min(self.queue.len().saturating_sub(1));
        self.pinned_size = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Setup {
        _temp_dir: TempDir,
        source: PathBuf,
        save: PathBuf,
        session: TriageSession,
    }

    fn setup(files: &[&str]) -> Setup {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("source");
        let save = temp_dir.path().join("save");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&save).unwrap();
        for name in files {
            let path = source.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, name.as_bytes()).unwrap();
        }

        let mut session = TriageSession::default();
        session.open_folder(&source).unwrap();
        session.set_save_root(&save).unwrap();

        Setup {
            _temp_dir: temp_dir,
            source,
            save,
            session,
        }
    }

    fn cats() -> Category {
        Category {
            name: "Category_1".to_string(),
            shortcut: "q".to_string(),
            destination_folder: "cats".to_string(),
        }
    }

    #[test]
    fn test_compute_fit_size() {
        assert_eq!(
            compute_fit_size(DisplaySize::new(4000, 2000), DisplaySize::new(800, 400)),
            DisplaySize::new(800, 400)
        );
        assert_eq!(
            compute_fit_size(DisplaySize::new(100, 200), DisplaySize::new(800, 400)),
            DisplaySize::new(200, 400)
        );
        assert_eq!(
            compute_fit_size(DisplaySize::new(300, 100), DisplaySize::new(800, 600)),
            DisplaySize::new(800, 267)
        );
        assert_eq!(
            compute_fit_size(DisplaySize::new(0, 100), DisplaySize::new(800, 600)),
            DisplaySize::new(0, 0)
        );
    }

    #[test]
    fn test_open_folder_counts_and_resets() {
        let mut s = setup(&["a.jpg", "b.png", "c.txt"]);
        assert_eq!(s.session.queue().len(), 2);
        s.session.advance(Direction::Next);
        assert_eq!(s.session.cursor(), 1);

        let outcome = s.session.open_folder(&s.source).unwrap();
        assert_eq!(outcome, ScanOutcome::Loaded(2));
        assert_eq!(s.session.cursor(), 0);
    }

    #[test]
    fn test_open_folder_empty_and_missing() {
        let mut s = setup(&["notes.txt"]);
        assert_eq!(
            s.session.open_folder(&s.source).unwrap(),
            ScanOutcome::EmptyFolder
        );
        assert!(s.session.current().is_none());

        let missing = s.source.join("missing");
        assert!(matches!(
            s.session.open_folder(&missing),
            Err(TriageError::SourceNotFound(_))
        ));
        assert_eq!(s.session.source_dir(), Some(s.source.as_path()));
    }

    #[test]
    fn test_set_save_root_requires_directory() {
        let mut s = setup(&[]);
        let missing = s.save.join("nope");
        assert!(matches!(
            s.session.set_save_root(&missing),
            Err(TriageError::InvalidSaveRoot(_))
        ));
        assert_eq!(s.session.save_root(), Some(s.save.as_path()));
    }

    #[test]
    fn test_advance_clamps_without_wrapping() {
        let mut s = setup(&["a.jpg", "b.jpg", "c.jpg"]);

        s.session.advance(Direction::Prev);
        assert_eq!(s.session.cursor(), 0);

        s.session.advance(Direction::Next);
        s.session.advance(Direction::Next);
        s.session.advance(Direction::Next);
        assert_eq!(s.session.cursor(), 2);
        assert_eq!(s.session.current(), Some(s.source.join("c.jpg").as_path()));
        assert_eq!(s.session.remaining(), 1);
    }

    #[test]
    fn test_classify_moves_and_records_undo() {
        let mut s = setup(&["a.jpg", "b.jpg"]);

        let outcome = s.session.classify(&cats()).unwrap();
        let destination = s.save.join("cats").join("a.jpg");
        assert_eq!(
            outcome,
            ClassifyOutcome::Moved {
                destination: destination.clone(),
                remaining: 1
            }
        );
        assert!(destination.exists());
        assert!(!s.source.join("a.jpg").exists());
        assert_eq!(s.session.current(), Some(s.source.join("b.jpg").as_path()));

        let history = s.session.undo_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].destination_path, destination);
        assert_eq!(history[0].origin_directory, s.source);
    }

    #[test]
    fn test_classify_last_image_clamps_cursor() {
        let mut s = setup(&["a.jpg", "b.jpg", "c.jpg"]);
        s.session.advance(Direction::Next);
        s.session.advance(Direction::Next);

        s.session.classify(&cats()).unwrap();
        assert_eq!(s.session.cursor(), 1);
        assert_eq!(s.session.current(), Some(s.source.join("b.jpg").as_path()));
    }

    #[test]
    fn test_classify_until_exhausted() {
        let mut s = setup(&["a.jpg"]);

        let outcome = s.session.classify(&cats()).unwrap();
        assert!(matches!(outcome, ClassifyOutcome::QueueExhausted { .. }));
        assert!(s.session.current().is_none());

        assert_eq!(
            s.session.classify(&cats()).unwrap(),
            ClassifyOutcome::NothingQueued
        );
    }

    #[test]
    fn test_classify_requires_save_root() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.jpg"), b"a").unwrap();
        let mut session = TriageSession::default();
        session.open_folder(temp_dir.path()).unwrap();

        assert!(matches!(
            session.classify(&cats()),
            Err(TriageError::SaveRootUnset)
        ));
        assert_eq!(session.queue().len(), 1);
    }

    #[test]
    fn test_collision_skips_and_advances() {
        let mut s = setup(&["a.jpg", "b.jpg"]);
        fs::create_dir_all(s.save.join("cats")).unwrap();
        fs::write(s.save.join("cats").join("a.jpg"), b"existing").unwrap();

        let outcome = s.session.classify(&cats()).unwrap();
        assert_eq!(
            outcome,
            ClassifyOutcome::Collision {
                destination: s.save.join("cats").join("a.jpg")
            }
        );
        assert!(s.source.join("a.jpg").exists());
        assert_eq!(s.session.queue().len(), 2);
        assert_eq!(s.session.cursor(), 1);
        assert!(s.session.undo_history().is_empty());
        assert_eq!(
            fs::read(s.save.join("cats").join("a.jpg")).unwrap(),
            b"existing"
        );
    }

    #[test]
    fn test_failed_move_leaves_session_unchanged() {
        let mut s = setup(&["a.jpg", "b.jpg"]);
        // A plain file where the category folder should go
        fs::write(s.save.join("cats"), b"not a directory").unwrap();
        s.session.advance(Direction::Next);

        let result = s.session.classify(&cats());

        assert!(matches!(result, Err(TriageError::MoveFailed { .. })));
        assert_eq!(s.session.queue().len(), 2);
        assert_eq!(s.session.cursor(), 1);
        assert_eq!(s.session.current(), Some(s.source.join("b.jpg").as_path()));
        assert!(s.session.undo_history().is_empty());
        assert!(s.source.join("b.jpg").exists());
    }

    #[test]
    fn test_relative_save_root_inside_source_is_not_rescanned() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::create_dir_all(root.join("sorted")).unwrap();
        fs::create_dir_all(root.join("other")).unwrap();
        fs::write(root.join("a.jpg"), b"a").unwrap();
        fs::write(root.join("b.jpg"), b"b").unwrap();

        // Same folders as the save root, reached through a different path
        let source = root.join("other").join("..");
        let mut session = TriageSession::default();
        session.set_save_root(&root.join("sorted")).unwrap();
        session.open_folder(&source).unwrap();

        session.classify(&cats()).unwrap();
        session.classify(&cats()).unwrap();
        let outcome = session.undo().unwrap();

        assert_eq!(outcome.queued, 1);
        assert_eq!(session.queue(), &[source.join("b.jpg")]);
        assert!(root.join("sorted").join("cats").join("a.jpg").exists());
    }

    #[test]
    fn test_undo_on_fresh_session() {
        let mut s = setup(&["a.jpg", "b.jpg"]);
        s.session.advance(Direction::Next);

        assert!(matches!(s.session.undo(), Err(TriageError::NothingToUndo)));
        assert_eq!(s.session.queue().len(), 2);
        assert_eq!(s.session.cursor(), 1);
    }

    #[test]
    fn test_classify_then_undo_restores_file() {
        let mut s = setup(&["a.jpg", "b.jpg"]);

        s.session.classify(&cats()).unwrap();
        let outcome = s.session.undo().unwrap();

        assert_eq!(outcome.restored, s.source.join("a.jpg"));
        assert_eq!(outcome.queued, 2);
        assert_eq!(fs::read(s.source.join("a.jpg")).unwrap(), b"a.jpg");
        assert!(!s.save.join("cats").join("a.jpg").exists());
        assert!(s.session.queue().contains(&s.source.join("a.jpg")));
        assert!(s.session.undo_history().is_empty());
    }

    #[test]
    fn test_undo_into_occupied_origin_keeps_entry() {
        let mut s = setup(&["a.jpg", "b.jpg"]);
        s.session.classify(&cats()).unwrap();
        fs::write(s.source.join("a.jpg"), b"replacement").unwrap();

        assert!(matches!(
            s.session.undo(),
            Err(TriageError::MoveFailed { .. })
        ));
        assert_eq!(s.session.undo_history().len(), 1);
        assert!(s.save.join("cats").join("a.jpg").exists());
    }

    #[test]
    fn test_undo_from_nested_folder() {
        let mut s = setup(&["a.jpg", "nested/b.jpg"]);
        s.session.advance(Direction::Next);
        s.session.classify(&cats()).unwrap();
        assert_eq!(s.session.queue().len(), 1);

        s.session.undo().unwrap();
        assert!(s.source.join("nested").join("b.jpg").exists());
        assert_eq!(s.session.queue().len(), 2);
        assert_eq!(s.session.cursor(), 0);
    }

    #[test]
    fn test_save_root_inside_source_is_not_rescanned() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().to_path_buf();
        let save = source.join("sorted");
        fs::create_dir_all(&save).unwrap();
        fs::write(source.join("a.jpg"), b"a").unwrap();
        fs::write(source.join("b.jpg"), b"b").unwrap();

        let mut session = TriageSession::default();
        session.set_save_root(&save).unwrap();
        session.open_folder(&source).unwrap();
        session.classify(&cats()).unwrap();
        session.classify(&cats()).unwrap();
        session.undo().unwrap();

        assert_eq!(session.queue(), &[source.join("b.jpg")]);
    }

    #[test]
    fn test_pinned_size_cleared_on_navigation() {
        let mut s = setup(&["a.jpg", "b.jpg"]);
        let image = DisplaySize::new(100, 200);
        let viewport = DisplaySize::new(800, 400);

        s.session.pin_display_size(DisplaySize::new(50, 300));
        assert_eq!(
            s.session.display_size(image, viewport),
            DisplaySize::new(MIN_DISPLAY_EDGE, 300)
        );

        s.session.advance(Direction::Next);
        assert!(s.session.pinned_display_size().is_none());
        assert_eq!(
            s.session.display_size(image, viewport),
            DisplaySize::new(200, 400)
        );
    }

    #[test]
    fn test_pinned_size_survives_boundary_noop() {
        let mut s = setup(&["a.jpg"]);
        s.session.pin_display_size(DisplaySize::new(300, 300));
        s.session.advance(Direction::Next);
        assert!(s.session.pinned_display_size().is_some());
    }
}
