//! Output formatting and styling module.
//!
//! Provides a centralized interface for all terminal output of the triage
//! shell: coloured status messages, the category table, the per-image status
//! line and the scan spinner.

use crate::category_store::Category;
use crate::session::UndoEntry;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Manages all shell output with consistent styling.
///
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use imgtriage::output::OutputFormatter;
    /// OutputFormatter::success("Moved to cats/");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a spinner shown while a folder is being scanned.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use imgtriage::output::OutputFormatter;
    /// let spinner = OutputFormatter::scan_spinner("Scanning /photos");
    /// spinner.finish_and_clear();
    /// ```
    pub fn scan_spinner(message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Prints one line describing the image under the cursor.
    pub fn image_status(path: &Path, remaining: usize, size: Option<(u32, u32)>) {
        let size_info = size
            .map(|(w, h)| format!(" [{}x{}]", w, h))
            .unwrap_or_default();
        println!(
            "{} {}{}  {} {}",
            "▶".cyan(),
            path.display(),
            size_info.dimmed(),
            "remaining:".dimmed(),
            remaining.to_string().green()
        );
    }

    /// Prints the categories as a table in store order.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use imgtriage::category_store::CategoryStore;
    /// use imgtriage::output::OutputFormatter;
    ///
    /// let store = CategoryStore::load("classify_button.json");
    /// OutputFormatter::category_table(store.categories());
    /// ```
    pub fn category_table(categories: &[Category]) {
        Self::header("CATEGORIES");

        if categories.is_empty() {
            println!("(none)");
            return;
        }

        let name_width = categories
            .iter()
            .map(|c| c.name.chars().count())
            .max()
            .unwrap_or(0)
            .max(8);
        let key_width = categories
            .iter()
            .map(|c| c.shortcut.chars().count())
            .max()
            .unwrap_or(0)
            .max(3);

        println!(
            "{:<nw$} | {:<kw$} | {}",
            "Category".bold(),
            "Key".bold(),
            "Folder".bold(),
            nw = name_width,
            kw = key_width
        );
        println!("{}", "-".repeat(name_width + key_width + 16));

        for category in categories {
            println!(
                "{:<nw$} | {:<kw$} | {}",
                category.name,
                category.shortcut,
                category.destination_folder,
                nw = name_width,
                kw = key_width
            );
        }
    }

    /// Prints the detail of a single category.
    pub fn category_detail(category: &Category) {
        println!("{} {}", "Category:".bold(), category.name);
        println!("{} {}", "Shortcut:".bold(), category.shortcut.green());
        println!("{} {}", "Folder:  ".bold(), category.destination_folder);
    }

    /// Prints the undo history, newest first.
    pub fn undo_history(entries: &[UndoEntry]) {
        Self::header("UNDO HISTORY");

        if entries.is_empty() {
            println!("(empty)");
            return;
        }

        for (i, entry) in entries.iter().rev().enumerate() {
            println!(
                "{:3}. [{}] {} {} {}",
                i + 1,
                entry.moved_at.format("%H:%M:%S"),
                entry.destination_path.display(),
                "←".dimmed(),
                entry.origin_directory.display()
            );
        }
    }
}
