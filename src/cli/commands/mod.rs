//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod batch;
mod documents;
mod helpers;
mod init;
mod version;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use clausewise::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "clausewise")]
#[command(about = "Legal document analysis with batch processing and version tracking")]
#[command(version)]
pub struct Cli {
    /// Data directory (overrides config file and CLAUSEWISE_DATA_DIR)
    #[arg(long, short = 'd', global = true)]
    data: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory
    Init,

    /// Analyze a single document and start its version history
    Analyze {
        /// Path to the document
        file: PathBuf,
    },

    /// Inspect analyzed documents
    Documents {
        #[command(subcommand)]
        command: DocumentCommands,
    },

    /// Show aggregate statistics over analyzed documents
    Stats,

    /// Analyze several documents concurrently
    Batch {
        #[command(subcommand)]
        command: BatchCommands,
    },

    /// Track and compare document versions
    Version {
        #[command(subcommand)]
        command: VersionCommands,
    },
}

#[derive(Subcommand)]
enum DocumentCommands {
    /// List analyzed documents, newest first
    List,
    /// Show the full analysis of a document
    Show {
        /// Document ID
        id: String,
    },
}

#[derive(Subcommand)]
enum BatchCommands {
    /// Submit files as a new batch and process them
    Submit {
        /// Files to analyze
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Number of concurrent workers (overrides config)
        #[arg(short, long, env = "CLAUSEWISE_WORKERS")]
        workers: Option<usize>,
    },
    /// Show the progress of a batch
    Status {
        /// Batch ID
        id: String,
    },
    /// Show the aggregated results of a batch
    Results {
        /// Batch ID
        id: String,
    },
    /// List batches, newest first
    List,
}

#[derive(Subcommand)]
enum VersionCommands {
    /// Analyze a file as the next version of a document
    Add {
        /// Lineage (original document) ID
        document_id: String,
        /// Path to the new revision
        file: PathBuf,
    },
    /// List the versions of a document
    List {
        /// Lineage (original document) ID
        document_id: String,
    },
    /// Show a single version record
    Show {
        /// Version (document) ID
        version_id: String,
    },
    /// Compare two analyzed documents
    Compare {
        /// Older document ID
        id1: String,
        /// Newer document ID
        id2: String,
    },
    /// Make an earlier version current again
    Restore {
        /// Version (document) ID
        version_id: String,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        data: cli.data,
    };
    let (settings, _config) = load_settings_with_options(options).await;

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Analyze { file } => documents::cmd_analyze(&settings, &file).await,
        Commands::Documents { command } => match command {
            DocumentCommands::List => documents::cmd_list(&settings).await,
            DocumentCommands::Show { id } => documents::cmd_show(&settings, &id).await,
        },
        Commands::Stats => documents::cmd_stats(&settings).await,
        Commands::Batch { command } => match command {
            BatchCommands::Submit { files, workers } => {
                batch::cmd_submit(&settings, files, workers).await
            }
            BatchCommands::Status { id } => batch::cmd_status(&settings, &id).await,
            BatchCommands::Results { id } => batch::cmd_results(&settings, &id).await,
            BatchCommands::List => batch::cmd_list(&settings).await,
        },
        Commands::Version { command } => match command {
            VersionCommands::Add { document_id, file } => {
                version::cmd_add(&settings, &document_id, &file).await
            }
            VersionCommands::List { document_id } => {
                version::cmd_list(&settings, &document_id).await
            }
            VersionCommands::Show { version_id } => {
                version::cmd_show(&settings, &version_id).await
            }
            VersionCommands::Compare { id1, id2 } => {
                version::cmd_compare(&settings, &id1, &id2).await
            }
            VersionCommands::Restore { version_id } => {
                version::cmd_restore(&settings, &version_id).await
            }
        },
    }
}
