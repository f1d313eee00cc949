//! BucketDB CLI
//!
//! Command-line tools for BucketDB.
//!
//! # Commands
//!
//! - `trace` - Replay an operation script and print the journal trace
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// BucketDB command-line tools.
#[derive(Parser)]
#[command(name = "bucketdb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an operation script against an in-memory store and print the
    /// recorded write operations
    Trace {
        /// Path to the script file
        script: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so they never mix with the trace on stdout.
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
        Commands::Trace { script, format } => {
            commands::trace::run(&script, &format)?;
        }
        Commands::Version => {
            println!("BucketDB CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("BucketDB Core v{}", bucketdb_core::VERSION);
        }
    }

    Ok(())
}
