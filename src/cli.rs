use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "episonext")]
#[command(author, version, about = "Next-episode recommendations for continue-watching lists")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Enrich a JSON watch list and print the result
    Enrich {
        /// JSON file holding an array of watch items
        #[arg(required = true)]
        items: PathBuf,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// Monitor the series in a JSON watch list and print events as JSON lines
    Monitor {
        /// JSON file holding an array of watch items
        #[arg(required = true)]
        items: PathBuf,

        /// Seconds between passes (overrides config)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Run a single pass and exit
        #[arg(long)]
        once: bool,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
