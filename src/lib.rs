//! imgtriage - manual image triage into category folders
//!
//! This library provides the pieces of a keyboard-driven image sorter: a
//! persistent store of categories and their shortcut keys, a triage session
//! that moves the current image into a category folder with undo, shortcut
//! routing, and TOML configuration for scan filters and navigation keys.

pub mod category_store;
pub mod cli;
pub mod config;
pub mod file_mover;
pub mod output;
pub mod preview;
pub mod scanner;
pub mod session;
pub mod shortcut;

pub use category_store::{Category, CategoryStore, StoreError};
pub use config::{CompiledFilters, ConfigError, TriageConfig};
pub use scanner::ImageScanner;
pub use session::{
    ClassifyOutcome, Direction, DisplaySize, ScanOutcome, TriageError, TriageSession, UndoEntry,
    compute_fit_size,
};
pub use shortcut::{KeyAction, ShortcutRouter, normalize_key, resolve};

pub use cli::{TriageCommand, run_cli};
