//! CLI argument parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// SandLoop CLI
#[derive(Debug, Parser)]
#[command(
    name = "sl",
    about = "Run an LLM agent confined to one working directory",
    version = env!("CARGO_PKG_VERSION"),
    after_help = "Logs are written to: ~/.local/share/sandloop/logs/sandloop.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, help = "Log level (trace, debug, info, warn, error)")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one session for a prompt
    Run {
        /// Working directory the agent is confined to
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Maximum planner rounds (overrides config)
        #[arg(short = 'n', long)]
        max_iterations: Option<u32>,

        /// Print tool arguments and results
        #[arg(short, long)]
        verbose: bool,

        /// The request for the agent
        #[arg(required = true, trailing_var_arg = true)]
        prompt: Vec<String>,
    },

    /// Print the tools advertised to the planner as JSON
    Tools,
}
