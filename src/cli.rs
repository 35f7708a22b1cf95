//! Command-line interface module for imgtriage.
//!
//! This module handles:
//! - Command dispatch for the one-shot commands (scan, category editing)
//! - The interactive triage loop, which reads one key or `:command` per line

use crate::category_store::CategoryStore;
use crate::config::TriageConfig;
use crate::output::OutputFormatter;
use crate::preview;
use crate::scanner::ImageScanner;
use crate::session::{ClassifyOutcome, Direction, DisplaySize, ScanOutcome, TriageSession};
use crate::shortcut::{KeyAction, ShortcutRouter, normalize_key};
use anyhow::{Context, Result, bail};
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

/// Represents a CLI command to execute.
#[derive(Debug, Clone)]
pub enum TriageCommand {
    /// Interactively sort `source` into subfolders of `save_root`.
    Triage { source: PathBuf, save_root: PathBuf },
    /// List the images a session on `source` would queue.
    Scan { source: PathBuf },
    ListCategories,
    ShowCategory { name: String },
    AddCategory { shortcut: String, folder: String },
    RenameCategory { old_name: String, new_name: String },
    DeleteCategory { name: String },
}

/// Counters reported when the interactive loop ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoopSummary {
    pub moved: usize,
    pub collisions: usize,
    pub undone: usize,
}

/// Runs the CLI application with the given command.
///
/// # Examples
///
/// ```no_run
/// use imgtriage::cli::{run_cli, TriageCommand};
/// use imgtriage::config::TriageConfig;
///
/// let config = TriageConfig::default();
/// run_cli(TriageCommand::ListCategories, &config).unwrap();
/// ```
pub fn run_cli(command: TriageCommand, config: &TriageConfig) -> Result<()> {
    let mut store = CategoryStore::load(&config.store_path);

    match command {
        TriageCommand::Triage { source, save_root } => {
            let stdin = io::stdin();
            let summary = run_triage(&source, &save_root, &mut store, config, stdin.lock())?;
            OutputFormatter::header("SESSION SUMMARY");
            OutputFormatter::plain(&format!(
                "Moved: {}  Skipped: {}  Undone: {}",
                summary.moved, summary.collisions, summary.undone
            ));
            Ok(())
        }
        TriageCommand::Scan { source } => scan_preview(&source, config),
        TriageCommand::ListCategories => {
            OutputFormatter::category_table(store.categories());
            Ok(())
        }
        TriageCommand::ShowCategory { name } => {
            let category = store
                .get(&name)
                .with_context(|| format!("No category named '{}'", name))?;
            OutputFormatter::category_detail(category);
            Ok(())
        }
        TriageCommand::AddCategory { shortcut, folder } => {
            add_category(&mut store, config, &shortcut, &folder)?;
            Ok(())
        }
        TriageCommand::RenameCategory { old_name, new_name } => {
            if new_name.trim().is_empty() {
                bail!("New category name must not be empty");
            }
            store.rename(&old_name, &new_name)?;
            OutputFormatter::success(&format!("Renamed {} to {}", old_name, new_name));
            Ok(())
        }
        TriageCommand::DeleteCategory { name } => {
            store.delete(&name)?;
            OutputFormatter::success(&format!("Deleted {}", name));
            Ok(())
        }
    }
}

/// Opens a session on `source`, sets `save_root` and runs the key loop on `input`.
///
/// # Errors
///
/// Fails if the scan filters do not compile or either folder is missing.
/// An empty source folder is reported but is not an error.
pub fn run_triage<R: BufRead>(
    source: &Path,
    save_root: &Path,
    store: &mut CategoryStore,
    config: &TriageConfig,
    input: R,
) -> Result<LoopSummary> {
    let filters = config
        .compile_filters()
        .context("Error compiling scan filters")?;
    let mut session = TriageSession::new(ImageScanner::new(filters));

    session.set_save_root(save_root)?;

    let spinner = OutputFormatter::scan_spinner(&format!("Scanning {}", source.display()));
    let scanned = session.open_folder(source);
    spinner.finish_and_clear();

    match scanned? {
        ScanOutcome::EmptyFolder => {
            OutputFormatter::warning("No images in this folder, open another one");
            return Ok(LoopSummary::default());
        }
        ScanOutcome::Loaded(count) => {
            OutputFormatter::info(&format!("Loaded {} images from {}", count, source.display()));
        }
    }

    if store.is_empty() {
        OutputFormatter::warning("No categories yet, add one with :add KEY FOLDER");
    }

    let router = ShortcutRouter::new(config.keys.clone());
    print_key_help(&router);
    render_current(&session, config);

    run_triage_loop(&mut session, store, config, &router, input)
}

/// Reads lines from `input` and applies each one to the session.
///
/// A line is either a key (`q`, `Shift`, ...) or a `:command`. The loop ends
/// at end of input or on `:quit`.
pub fn run_triage_loop<R: BufRead>(
    session: &mut TriageSession,
    store: &mut CategoryStore,
    config: &TriageConfig,
    router: &ShortcutRouter,
    input: R,
) -> Result<LoopSummary> {
    let mut summary = LoopSummary::default();

    for line in input.lines() {
        let line = line.context("Error reading input")?;
        let line = line.trim();

        if let Some(command) = line.strip_prefix(':') {
            match run_shell_command(command, session, store, config) {
                ShellFlow::Quit => break,
                ShellFlow::Continue => continue,
            }
        }

        let Some(token) = normalize_key(line) else {
            continue;
        };

        match router.route(&token, store.categories()) {
            KeyAction::Prev => {
                session.advance(Direction::Prev);
                render_current(session, config);
            }
            KeyAction::Next => {
                session.advance(Direction::Next);
                render_current(session, config);
            }
            KeyAction::Undo => match session.undo() {
                Ok(outcome) => {
                    summary.undone += 1;
                    OutputFormatter::success(&format!(
                        "Restored {}",
                        outcome.restored.display()
                    ));
                    render_current(session, config);
                }
                Err(e) => OutputFormatter::warning(&e.to_string()),
            },
            KeyAction::Classify(category) => match session.classify(category) {
                Ok(ClassifyOutcome::Moved { destination, .. }) => {
                    summary.moved += 1;
                    OutputFormatter::success(&format!("Moved to {}", destination.display()));
                    render_current(session, config);
                }
                Ok(ClassifyOutcome::QueueExhausted { destination }) => {
                    summary.moved += 1;
                    OutputFormatter::success(&format!("Moved to {}", destination.display()));
                    OutputFormatter::info("No images left");
                }
                Ok(ClassifyOutcome::Collision { destination }) => {
                    summary.collisions += 1;
                    OutputFormatter::warning(&format!(
                        "A file named {} already exists, skipped",
                        destination.display()
                    ));
                    render_current(session, config);
                }
                Ok(ClassifyOutcome::NothingQueued) => {
                    OutputFormatter::info("No images left");
                }
                Err(e) => OutputFormatter::error(&e.to_string()),
            },
            KeyAction::Unbound => {
                OutputFormatter::warning(&format!("No category bound to '{}'", token));
            }
        }
    }

    Ok(summary)
}

enum ShellFlow {
    Continue,
    Quit,
}

fn run_shell_command(
    command: &str,
    session: &mut TriageSession,
    store: &mut CategoryStore,
    config: &TriageConfig,
) -> ShellFlow {
    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    let result: Result<()> = match (name, args.as_slice()) {
        ("q" | "quit", _) => return ShellFlow::Quit,
        ("help" | "h", _) => {
            print_shell_help();
            Ok(())
        }
        ("categories" | "c", []) => {
            OutputFormatter::category_table(store.categories());
            Ok(())
        }
        ("categories" | "c", [category_name]) => store
            .get(category_name)
            .map(OutputFormatter::category_detail)
            .with_context(|| format!("No category named '{}'", category_name)),
        ("history", _) => {
            OutputFormatter::undo_history(session.undo_history());
            Ok(())
        }
        ("add", [key, folder]) => add_category(store, config, key, folder).map(|_| ()),
        ("rename", [old_name, new_name]) => store
            .rename(old_name, new_name)
            .map(|()| OutputFormatter::success(&format!("Renamed {} to {}", old_name, new_name)))
            .map_err(Into::into),
        ("delete", [category_name]) => store
            .delete(category_name)
            .map(|removed| OutputFormatter::success(&format!("Deleted {}", removed.name)))
            .map_err(Into::into),
        ("size", [width, height]) => parse_size(width, height).map(|size| {
            session.pin_display_size(size);
            render_current(session, config);
        }),
        ("open", [dir]) => open_folder(session, Path::new(dir), config),
        ("save", [dir]) => session
            .set_save_root(Path::new(dir))
            .map(|()| OutputFormatter::success(&format!("Saving into {}", dir)))
            .map_err(Into::into),
        _ => Err(anyhow::anyhow!(
            "Unknown command ':{}', type :help for a list",
            command
        )),
    };

    if let Err(e) = result {
        OutputFormatter::error(&format!("{:#}", e));
    }
    ShellFlow::Continue
}

fn add_category(
    store: &mut CategoryStore,
    config: &TriageConfig,
    shortcut: &str,
    folder: &str,
) -> Result<String> {
    let key = normalize_key(shortcut).unwrap_or_default();
    let name = store.insert(&key, folder)?;

    OutputFormatter::success(&format!("{} saved ({} -> {}/)", name, key, folder));
    if ShortcutRouter::new(config.keys.clone()).is_reserved(&key) {
        OutputFormatter::warning(&format!(
            "'{}' is a navigation key and will not classify",
            key
        ));
    }
    Ok(name)
}

fn open_folder(session: &mut TriageSession, dir: &Path, config: &TriageConfig) -> Result<()> {
    match session.open_folder(dir)? {
        ScanOutcome::EmptyFolder => {
            OutputFormatter::warning("No images in this folder, open another one");
        }
        ScanOutcome::Loaded(count) => {
            OutputFormatter::info(&format!("Loaded {} images from {}", count, dir.display()));
            render_current(session, config);
        }
    }
    Ok(())
}

fn parse_size(width: &str, height: &str) -> Result<DisplaySize> {
    let width = width
        .parse()
        .with_context(|| format!("Invalid width '{}'", width))?;
    let height = height
        .parse()
        .with_context(|| format!("Invalid height '{}'", height))?;
    Ok(DisplaySize::new(width, height))
}

/// Prints the status line for the image under the cursor.
fn render_current(session: &TriageSession, config: &TriageConfig) {
    let Some(path) = session.current() else {
        OutputFormatter::info("No images left");
        return;
    };

    let viewport = DisplaySize::new(config.viewport.width, config.viewport.height);
    let size = match preview::inspect(path) {
        Ok(info) => {
            let fitted = session.display_size(info.dimensions, viewport);
            Some((fitted.width, fitted.height))
        }
        Err(e) => {
            OutputFormatter::warning(&e.to_string());
            None
        }
    };

    OutputFormatter::image_status(path, session.remaining(), size);
}

fn print_key_help(router: &ShortcutRouter) {
    let keys = router.bindings();
    OutputFormatter::plain(&format!(
        "Keys: {} = previous, {} = next, {} = undo, category shortcut = classify, :help for commands",
        keys.prev, keys.next, keys.undo
    ));
}

fn print_shell_help() {
    OutputFormatter::header("COMMANDS");
    for (usage, what) in [
        (":categories [NAME]", "list categories or show one"),
        (":add KEY FOLDER", "add a category"),
        (":rename OLD NEW", "rename a category"),
        (":delete NAME", "delete a category"),
        (":history", "list undoable moves, newest first"),
        (":size W H", "pin the display size until the next image"),
        (":open DIR", "scan another source folder"),
        (":save DIR", "change the save folder"),
        (":quit", "leave"),
    ] {
        OutputFormatter::plain(&format!("  {:<20} {}", usage, what));
    }
}

/// Lists what a session on `source` would queue, without moving anything.
fn scan_preview(source: &Path, config: &TriageConfig) -> Result<()> {
    if !source.is_dir() {
        bail!("Source folder does not exist: {}", source.display());
    }

    let filters = config
        .compile_filters()
        .context("Error compiling scan filters")?;
    let scanner = ImageScanner::new(filters);

    let spinner = OutputFormatter::scan_spinner(&format!("Scanning {}", source.display()));
    let images = scanner.scan(source, None);
    spinner.finish_and_clear();

    if images.is_empty() {
        OutputFormatter::warning("No images found.");
        return Ok(());
    }

    OutputFormatter::header(&format!("{} images in {}", images.len(), source.display()));
    for image in &images {
        OutputFormatter::plain(&format!(" - {}", image.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("640", "480").unwrap(), DisplaySize::new(640, 480));
        assert!(parse_size("wide", "480").is_err());
    }

    #[test]
    fn test_loop_classifies_by_key_and_quits() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("in");
        let save = temp_dir.path().join("out");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&save).unwrap();
        fs::write(source.join("a.jpg"), b"a").unwrap();
        fs::write(source.join("b.jpg"), b"b").unwrap();

        let config = TriageConfig::default();
        let mut store = CategoryStore::load(temp_dir.path().join("store.json"));
        store.insert("q", "cats").unwrap();

        let input = Cursor::new("q\n:quit\nq\n");
        let summary = run_triage(&source, &save, &mut store, &config, input).unwrap();

        assert_eq!(summary.moved, 1);
        assert!(save.join("cats").join("a.jpg").exists());
        assert!(source.join("b.jpg").exists());
    }

    #[test]
    fn test_add_category_normalizes_key() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut store = CategoryStore::load(temp_dir.path().join("store.json"));

        let name = add_category(&mut store, &TriageConfig::default(), "Q", "cats").unwrap();
        assert_eq!(store.get(&name).unwrap().shortcut, "q");

        assert!(add_category(&mut store, &TriageConfig::default(), "  ", "dogs").is_err());
        assert_eq!(store.len(), 1);
    }
}
