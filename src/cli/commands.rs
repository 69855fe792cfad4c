//! CLI command definitions using clap.
//!
//! - fix: run the repair loop on a script
//! - exec: run a script once in the sandbox
//! - diagnose: run once and print the classified error
//! - cache: inspect or clear the fix cache
//! - languages: list configured runtimes

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Fixloop - run a script in a container and let a model fix it until it works
#[derive(Parser, Debug)]
#[command(name = "fixloop")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run, diagnose and fix a script until it succeeds or the budget is spent
    Fix {
        /// Script to repair
        file: PathBuf,

        /// Language tag (defaults to the file extension)
        #[arg(short, long)]
        language: Option<String>,

        /// Maximum executions (overrides session.max_attempts)
        #[arg(short, long)]
        max_attempts: Option<u32>,

        /// Ask before applying each fix
        #[arg(short, long)]
        interactive: bool,

        /// Write the fixed source back to FILE on success
        #[arg(long)]
        in_place: bool,

        /// Bypass the fix cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Run a script once in the sandbox and print its output
    Exec {
        file: PathBuf,

        #[arg(short, long)]
        language: Option<String>,
    },

    /// Run a script once and print the classified error
    Diagnose {
        file: PathBuf,

        #[arg(short, long)]
        language: Option<String>,

        /// Print the error record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fix cache maintenance
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// List supported languages and their runtimes
    Languages,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheCommands {
    /// Show entry and hit counts
    Stats,
    /// Remove every cached fix
    Clear,
}
