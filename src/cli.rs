//! Command line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CONFIG_FILENAME;

#[derive(Parser)]
#[command(
    name = "docweave",
    version,
    about = "Generate Ginkgo E2E test files from tagged documentation"
)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, default_value = CONFIG_FILENAME)]
    pub config: PathBuf,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Parse and convert without writing any files.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate test files from documentation.
    Generate,
    /// Check the configuration and documentation without writing files.
    Validate,
}
