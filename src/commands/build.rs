//! # Build Command Implementation
//!
//! This module implements the `build` subcommand, which runs the complete
//! pipeline for one backend:
//!
//! 1. Configure the environment the library's test suite reads
//! 2. Stage the sources into the superproject workspace (`~/boost-root`)
//! 3. Run the backend's stages, stopping at the first failure
//! 4. Collect and upload coverage when requested
//!
//! Every option can also be given through a `BOOST_CI_*` environment
//! variable, so CI matrices can set them without long command lines.
//! Boolean options take a value (`--coverage 1`, `--clean=false`).

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args};

use boost_ci::backends::{StageOutcome, StageReport};
use boost_ci::config::{parse_bool, AddressModel, BackendKind, BuildConfiguration, Stdlib, Superproject};
use boost_ci::defaults;
use boost_ci::orchestrator::Pipeline;
use boost_ci::output::{emoji, OutputConfig};
use boost_ci::platform::Platform;
use boost_ci::process::SystemRunner;
use boost_ci::report::{CoverageOutcome, RunReport};
use boost_ci::workspace::Layout;

/// Options describing one pipeline run, shared by `build` and `plan`.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Backend to run: b2, cmake or docs
    #[arg(long, value_name = "KIND", env = "BOOST_CI_BUILD_KIND")]
    pub build_kind: BackendKind,

    /// Absolute path of the library checkout to test
    #[arg(long, value_name = "DIR", env = "BOOST_CI_SOURCE_DIR")]
    pub source_dir: PathBuf,

    /// CMake generator
    #[arg(long, value_name = "NAME", env = "BOOST_CI_GENERATOR", default_value = "Ninja")]
    pub generator: String,

    /// Build shared libraries in the CMake builds
    #[arg(long, value_name = "BOOL", env = "BOOST_CI_BUILD_SHARED_LIBS", action = ArgAction::Set, value_parser = parse_bool, default_value = "1")]
    pub build_shared_libs: bool,

    /// Run the tests under valgrind
    #[arg(long, value_name = "BOOL", env = "BOOST_CI_VALGRIND", action = ArgAction::Set, value_parser = parse_bool, default_value = "0")]
    pub valgrind: bool,

    /// Build with coverage instrumentation and upload the results
    #[arg(long, value_name = "BOOL", env = "BOOST_CI_COVERAGE", action = ArgAction::Set, value_parser = parse_bool, default_value = "0")]
    pub coverage: bool,

    /// Delete the workspace and start from a fresh clone
    #[arg(long, value_name = "BOOL", env = "BOOST_CI_CLEAN", action = ArgAction::Set, value_parser = parse_bool, default_value = "0")]
    pub clean: bool,

    /// The database server supports SHA-256 authentication (MySQL 8+)
    #[arg(long, value_name = "BOOL", env = "BOOST_CI_IS_MYSQL8", action = ArgAction::Set, value_parser = parse_bool, default_value = "1")]
    pub is_mysql8: bool,

    /// Run the CMake builds that consume the prebuilt b2 distribution
    #[arg(long, value_name = "BOOL", env = "BOOST_CI_CMAKE_STANDALONE_TESTS", action = ArgAction::Set, value_parser = parse_bool, default_value = "1")]
    pub cmake_standalone_tests: bool,

    /// b2 toolset
    #[arg(long, env = "BOOST_CI_TOOLSET", default_value = "clang")]
    pub toolset: String,

    /// C++ standard for the b2 build
    #[arg(long, env = "BOOST_CI_CXXSTD", default_value = "20")]
    pub cxxstd: String,

    /// b2 build variant
    #[arg(long, env = "BOOST_CI_VARIANT", default_value = "release")]
    pub variant: String,

    /// Standard library: native or libc++
    #[arg(long, env = "BOOST_CI_STDLIB", default_value = "native")]
    pub stdlib: Stdlib,

    /// Address model: 32 or 64
    #[arg(long, env = "BOOST_CI_ADDRESS_MODEL", default_value = "64")]
    pub address_model: AddressModel,

    /// Host running the database server for integration tests
    #[arg(long, value_name = "HOST", env = "BOOST_CI_SERVER_HOST", default_value = "localhost")]
    pub server_host: String,

    /// Library name inside the superproject (libs/<NAME>)
    #[arg(long, value_name = "NAME", env = "BOOST_CI_LIBRARY", default_value = defaults::LIBRARY)]
    pub library: String,

    /// Superproject repository to clone
    #[arg(long, value_name = "URL", env = "BOOST_CI_SUPERPROJECT_URL", default_value = defaults::SUPERPROJECT_URL)]
    pub superproject_url: String,

    /// Superproject branch to clone
    #[arg(long, value_name = "BRANCH", env = "BOOST_CI_SUPERPROJECT_BRANCH", default_value = defaults::SUPERPROJECT_BRANCH)]
    pub superproject_branch: String,

    /// Workspace directory (defaults to ~/boost-root)
    #[arg(long, value_name = "DIR", env = "BOOST_CI_WORKSPACE")]
    pub workspace: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn to_configuration(&self) -> Result<BuildConfiguration> {
        let superproject = Superproject::new(&self.superproject_url, &self.superproject_branch)
            .with_context(|| format!("Invalid superproject URL '{}'", self.superproject_url))?;
        if self.superproject_branch.trim().is_empty() {
            bail!("Superproject branch must not be empty");
        }

        let config = BuildConfiguration {
            library: self.library.clone(),
            toolset: self.toolset.clone(),
            cxxstd: self.cxxstd.clone(),
            variant: self.variant.clone(),
            stdlib: self.stdlib,
            address_model: self.address_model,
            clean: self.clean,
            build_shared_libs: self.build_shared_libs,
            valgrind: self.valgrind,
            coverage: self.coverage,
            standalone_tests: self.cmake_standalone_tests,
            server_host: self.server_host.clone(),
            is_full_variant: self.is_mysql8,
            generator: self.generator.clone(),
            superproject,
            ..BuildConfiguration::new(self.build_kind, &self.source_dir)
        };
        config.validate()?;
        Ok(config)
    }

    pub fn layout(&self) -> Result<Layout> {
        let layout = Layout::for_current_user()?;
        Ok(match &self.workspace {
            Some(root) => layout.with_root(root),
            None => layout,
        })
    }
}

/// Stage the library, run one build backend and report the results
#[derive(Args, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Write a JSON report of the run to FILE
    #[arg(long, value_name = "FILE", env = "BOOST_CI_REPORT")]
    pub report: Option<PathBuf>,
}

/// Execute the `build` command.
///
/// Exits with an error when staging or any build stage fails. Stage and
/// coverage failures are reported after the stage summary and the JSON
/// report, so both cover the stages that ran.
pub fn execute(args: BuildArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let config = args.config.to_configuration()?;
    let runner = SystemRunner;
    let pipeline = Pipeline::new(&runner, Platform::current(), args.config.layout()?);

    println!(
        "{} Building {} with the {} backend",
        emoji(&out, "🔨", "[BUILD]"),
        config.library,
        config.backend
    );

    let report = pipeline.run(&config).map_err(|e| {
        println!("{} {}", emoji(&out, "❌", "[FAIL]"), out.bad("Build failed"));
        anyhow::Error::new(e)
    })?;

    print_summary(&out, &report);

    if let Some(path) = &args.report {
        report
            .write_json(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!(
            "{} Report written to {}",
            emoji(&out, "📄", "[REPORT]"),
            path.display()
        );
    }

    if let Some(e) = report.stage_error() {
        println!("{} {}", emoji(&out, "❌", "[FAIL]"), out.bad("Build failed"));
        return Err(e.into());
    }
    if let Some(message) = report.coverage_error() {
        bail!("Coverage processing failed: {}", message);
    }
    Ok(())
}

fn print_summary(out: &OutputConfig, report: &RunReport) {
    println!();
    println!(
        "{} Workspace: {}{}",
        emoji(out, "📁", "[WS]"),
        report.workspace.display(),
        if report.fresh { " (fresh)" } else { "" }
    );
    for stage in &report.stages {
        println!("   {}", stage_line(out, stage));
    }
    match &report.coverage {
        Some(CoverageOutcome::Uploaded(coverage)) => println!(
            "{} Coverage uploaded ({} files)",
            emoji(out, "📊", "[COV]"),
            coverage.files.len()
        ),
        Some(CoverageOutcome::Failed { .. }) => {
            println!("{} {}", emoji(out, "❌", "[FAIL]"), out.bad("Coverage failed"))
        }
        None => {}
    }
}

fn stage_line(out: &OutputConfig, stage: &StageReport) -> String {
    match &stage.outcome {
        StageOutcome::Passed => format!(
            "{} {}",
            emoji(out, "✅", "[PASS]"),
            out.good(&stage.name)
        ),
        StageOutcome::Skipped { reason } => format!(
            "{} {} {}",
            emoji(out, "⏭️", "[SKIP]"),
            stage.name,
            out.muted(&format!("({})", reason))
        ),
        StageOutcome::Failed { .. } => format!(
            "{} {}",
            emoji(out, "❌", "[FAIL]"),
            out.bad(&stage.name)
        ),
    }
}
