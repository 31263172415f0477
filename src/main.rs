//! # Boost CI
//!
//! This is the binary entry point for the `boost-ci` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Initializing logging from `--log-level` (or `RUST_LOG`).
//! - Executing the appropriate command and turning library errors into a
//!   non-zero exit status.
//!
//! The pipeline itself lives in the `boost_ci` library crate; the binary is a
//! thin wrapper around it.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
