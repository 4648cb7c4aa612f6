//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// contentpipe content build pipeline CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root; all configured paths are resolved against it
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Config file name, relative to root (default: content.toml)
    #[arg(short = 'C', long, default_value = "content.toml")]
    pub config: PathBuf,

    /// Default source directory (relative to root)
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Default target directory (relative to root)
    #[arg(short, long)]
    pub target: Option<PathBuf>,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Process every matching file and write artifacts and indexes
    Build,

    /// Build once, then keep outputs in sync with file changes
    Watch {
        /// Debounce window in milliseconds (overrides [watch.debounce_ms])
        #[arg(short, long)]
        debounce: Option<u64>,
    },
}

impl Cli {
    pub const fn is_watch(&self) -> bool {
        matches!(self.command, Commands::Watch { .. })
    }
}
