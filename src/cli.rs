//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;

use crate::commands;

/// Boost CI - Build and test a Boost library inside the superproject
#[derive(Parser, Debug)]
#[command(name = "boost-ci")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stage the library, run one build backend and report the results
    Build(commands::build::BuildArgs),

    /// Show what `build` would do, without doing it
    Plan(commands::plan::PlanArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        self.init_logging();

        match self.command {
            Commands::Build(args) => commands::build::execute(args, &self.color),
            Commands::Plan(args) => commands::plan::execute(args, &self.color),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }

    /// `RUST_LOG` wins over `--log-level` when it is set.
    fn init_logging(&self) {
        let mut builder = env_logger::Builder::new();
        builder.filter_level(self.log_level);
        if let Ok(filters) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filters);
        }
        builder.format_timestamp(None).format_target(false);
        // A logger may already be installed when commands run in-process.
        let _ = builder.try_init();
    }
}
