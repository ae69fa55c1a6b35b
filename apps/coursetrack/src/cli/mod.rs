//! # coursetrack CLI
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `init` - Initialize a new database
//! - `import` - Load a catalog snapshot (JSON or binary)
//! - `export` - Write the catalog out as a snapshot
//! - `status` - Show store statistics
//! - `dashboard` - Show the four counts for a user
//! - `enrolled` - List a user's enrolled courses
//! - `in-progress` - List a user's in-progress courses
//! - `compact` - Compact the redb database

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use coursetrack::config::{Backend, TrackerConfig};
use coursetrack_core::{TrackerError, UserId};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// coursetrack - course status dashboard
///
/// Classifies a learner's courses as enrolled, completed, in progress or
/// criteria-undefined, and lists the courses behind each count.
#[derive(Parser, Debug)]
#[command(name = "coursetrack")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// TOML configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the database (overrides the config file)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend (overrides the config file)
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<Backend>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Snapshot encodings accepted by `export`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SnapshotFormat {
    Json,
    Binary,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides the config file)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Initialize a new empty database
    Init {
        /// Overwrite an existing database
        #[arg(short, long)]
        force: bool,
    },

    /// Import a catalog snapshot
    Import {
        /// Snapshot file (JSON or binary)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Export the catalog as a snapshot
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        #[arg(short = 't', long, value_enum, default_value = "json")]
        format: SnapshotFormat,
    },

    /// Show store statistics
    Status,

    /// Show dashboard counts for a user
    Dashboard {
        /// User id
        #[arg(short, long)]
        user: u64,
    },

    /// List the courses a user is enrolled in
    Enrolled {
        /// User id
        #[arg(short, long)]
        user: u64,
    },

    /// List the courses a user has in progress
    InProgress {
        /// User id
        #[arg(short, long)]
        user: u64,
    },

    /// Compact the redb database file
    Compact,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Resolve configuration, then run the command.
pub async fn execute(cli: Cli) -> Result<(), TrackerError> {
    let mut config = TrackerConfig::load(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.storage.database = database;
    }
    if let Some(backend) = cli.backend {
        config.storage.backend = backend;
    }

    let output = Output {
        json: cli.json_mode,
        verbose: cli.verbose,
    };

    match cli.command {
        Some(Commands::Server { host, port }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cmd_server(&config).await
        }
        Some(Commands::Init { force }) => cmd_init(&config, force),
        Some(Commands::Import { file }) => cmd_import(&config, output, &file),
        Some(Commands::Export { output: path, format }) => cmd_export(&config, &path, format),
        Some(Commands::Status) | None => cmd_status(&config, output),
        Some(Commands::Dashboard { user }) => cmd_dashboard(&config, output, UserId(user)),
        Some(Commands::Enrolled { user }) => cmd_enrolled(&config, output, UserId(user)),
        Some(Commands::InProgress { user }) => cmd_in_progress(&config, output, UserId(user)),
        Some(Commands::Compact) => cmd_compact(&config),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_report_command_with_globals() {
        let cli = Cli::try_parse_from([
            "coursetrack",
            "--json-mode",
            "-B",
            "file",
            "in-progress",
            "-u",
            "42",
        ])
        .expect("parse");

        assert!(cli.json_mode);
        assert_eq!(cli.backend, Some(Backend::File));
        assert!(matches!(cli.command, Some(Commands::InProgress { user: 42 })));
    }

    #[test]
    fn rejects_unknown_backend() {
        assert!(Cli::try_parse_from(["coursetrack", "-B", "sqlite", "status"]).is_err());
    }
}
