use clap::{Parser, Subcommand};
use imgtriage::cli::{TriageCommand, run_cli};
use imgtriage::config::TriageConfig;
use imgtriage::output::OutputFormatter;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "imgtriage", version, about = "Sort a folder of images into categories, one key at a time")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactively sort the images of a folder
    Triage {
        /// Folder with the images to sort
        source: PathBuf,

        /// Folder the category subfolders are created in
        #[arg(short, long)]
        save: PathBuf,
    },
    /// List the images a triage session would queue
    Scan {
        source: PathBuf,
    },
    /// Manage categories
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },
}

#[derive(Subcommand, Debug)]
enum CategoryAction {
    /// List all categories
    List,
    /// Show one category
    Show { name: String },
    /// Add a category with an auto-generated name
    Add {
        /// Shortcut key (e.g. q, Shift)
        #[arg(short, long)]
        key: String,

        /// Destination subfolder name
        #[arg(short, long)]
        folder: String,
    },
    /// Rename a category
    Rename { old_name: String, new_name: String },
    /// Delete a category
    Delete { name: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match TriageConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            OutputFormatter::error(&format!("Error loading configuration: {}", e));
            return ExitCode::FAILURE;
        }
    };

    let command = match cli.command {
        Commands::Triage { source, save } => TriageCommand::Triage {
            source,
            save_root: save,
        },
        Commands::Scan { source } => TriageCommand::Scan { source },
        Commands::Category { action } => match action {
            CategoryAction::List => TriageCommand::ListCategories,
            CategoryAction::Show { name } => TriageCommand::ShowCategory { name },
            CategoryAction::Add { key, folder } => TriageCommand::AddCategory {
                shortcut: key,
                folder,
            },
            CategoryAction::Rename { old_name, new_name } => {
                TriageCommand::RenameCategory { old_name, new_name }
            }
            CategoryAction::Delete { name } => TriageCommand::DeleteCategory { name },
        },
    };

    if let Err(e) = run_cli(command, &config) {
        OutputFormatter::error(&format!("{:#}", e));
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
