//! vecseg CLI
//!
//! Offline inspection tools for vecseg index and binlog files.
//!
//! # Commands
//!
//! - `inspect-trie` - Load a string trie index from its two blobs and query it
//! - `inspect-binlog` - Decode a binlog file, or one row of it
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use commands::inspect_binlog::{BinlogArgs, ColumnType};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// vecseg command-line inspection tools.
#[derive(Parser)]
#[command(name = "vecseg")]
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
    /// Load a string trie index and run membership queries against it
    InspectTrie {
        /// File holding the serialized trie blob
        #[arg(long)]
        trie: PathBuf,

        /// File holding the row-to-string-id table
        #[arg(long)]
        ids: PathBuf,

        /// Report rows whose value starts with this prefix
        #[arg(long)]
        prefix: Option<String>,

        /// Report rows whose value equals any of these
        #[arg(long = "in", num_args = 1..)]
        in_values: Vec<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Decode the rows of a binlog file
    InspectBinlog {
        /// Binlog file
        #[arg(long)]
        path: PathBuf,

        /// Element type of the column
        #[arg(long = "type", value_enum)]
        column_type: ColumnType,

        /// Vector dimension
        #[arg(long, default_value = "0")]
        dim: usize,

        /// Bytes before the first row
        #[arg(long, default_value = "0")]
        header: u64,

        /// Values are big-endian
        #[arg(long)]
        big_endian: bool,

        /// Decode only this row
        #[arg(long)]
        row: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::InspectTrie {
            trie,
            ids,
            prefix,
            in_values,
            format,
        } => {
            let report = commands::inspect_trie::run(&trie, &ids, prefix.as_deref(), &in_values)?;
            commands::print(&report, &format)?;
        }
        Commands::InspectBinlog {
            path,
            column_type,
            dim,
            header,
            big_endian,
            row,
            format,
        } => {
            let args = BinlogArgs {
                column_type,
                dim,
                header,
                big_endian,
                row,
            };
            let report = commands::inspect_binlog::run(&path, &args)?;
            commands::print(&report, &format)?;
        }
        Commands::Version => {
            println!("vecseg CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
