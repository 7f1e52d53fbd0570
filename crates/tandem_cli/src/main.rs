//! Tandem CLI
//!
//! Command-line tools for inspecting Tandem changes.
//!
//! # Commands
//!
//! - `transform` - Reconcile two concurrent changes
//! - `rebase` - Reconcile an incoming queue against an outgoing queue
//! - `apply` - Apply changes to a text

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Tandem command-line change tools.
#[derive(Parser)]
#[command(name = "tandem")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(global = true, short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile two changes made concurrently on the same text
    Transform {
        /// First change as JSON, e.g. '{"type":"insert","position":0,"text":"a","from":"x"}'
        a: String,

        /// Second change as JSON
        b: String,

        /// Base text to check convergence against
        #[arg(short, long)]
        base: Option<String>,
    },

    /// Reconcile an incoming queue against an outgoing queue
    Rebase {
        /// JSON file with `incoming` and `outgoing` change arrays, or `-` for stdin
        file: PathBuf,
    },

    /// Apply a JSON array of changes to a text
    Apply {
        /// Text to apply the changes to
        #[arg(short, long)]
        base: String,

        /// Changes as a JSON array
        changes: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Transform { a, b, base } => {
            commands::transform::run(&a, &b, base.as_deref(), &cli.format)?;
        }
        Commands::Rebase { file } => {
            commands::rebase::run(&file, &cli.format)?;
        }
        Commands::Apply { base, changes } => {
            commands::apply::run(&base, &changes, &cli.format)?;
        }
        Commands::Version => {
            println!("Tandem CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
