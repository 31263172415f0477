//! # Pipeline Orchestration
//!
//! [`Pipeline::run`] drives one complete run for a [`BuildConfiguration`]:
//!
//! 1. Validate the configuration
//! 2. Configure the process environment for the library's test suite
//! 3. Stage the sources into the superproject workspace
//! 4. Run the stages of the selected backend, stopping at the first failure
//! 5. Post-process and upload coverage, when requested and the instrumented
//!    tests actually ran and no stage failed
//!
//! [`Pipeline::plan`] computes the same steps without performing any of them.

use log::{error, info, warn};

use crate::backends::{self, cmake, BuildContext, BuildStage, StageReport};
use crate::config::{BackendKind, BuildConfiguration};
use crate::coverage::CoveragePostProcessor;
use crate::environment::{EnvChange, EnvironmentConfigurator};
use crate::error::Result;
use crate::platform::Platform;
use crate::process::{CommandSpec, ProcessRunner};
use crate::report::{CoverageOutcome, RunReport};
use crate::workspace::{DependencyStager, Layout, StagingPlan};

/// Everything a run would do, computed without side effects.
#[derive(Debug, Clone)]
pub struct Plan {
    pub environment: Vec<EnvChange>,
    pub staging: StagingPlan,
    pub stages: Vec<BuildStage>,
    /// Expected stage outcomes, assuming every stage that runs passes.
    pub outcomes: Vec<StageReport>,
    /// Coverage capture and upload, empty when coverage will not run.
    pub coverage: Vec<CommandSpec>,
}

/// The top-level driver.
pub struct Pipeline<'a> {
    runner: &'a dyn ProcessRunner,
    platform: Platform,
    layout: Layout,
}

impl<'a> Pipeline<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, platform: Platform, layout: Layout) -> Self {
        Self {
            runner,
            platform,
            layout,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Execute a full run.
    ///
    /// Configuration and staging failures abort the run with an error. A
    /// failing stage stops the backend and is recorded in the returned
    /// report, as is a coverage failure; see [`RunReport::succeeded`].
    pub fn run(&self, config: &BuildConfiguration) -> Result<RunReport> {
        config.validate()?;
        info!(
            "Running {} backend for {} on {}",
            config.backend,
            config.source_dir.display(),
            self.platform
        );

        self.environment(config).configure(
            &self.layout.root,
            &config.server_host,
            config.is_full_variant,
        );

        let workspace = self.stager(config).stage(
            &config.source_dir,
            config.clean,
            backends::install_kind(config.backend),
        )?;

        let stages = backends::plan_stages(&self.context(config));
        let reports = backends::run_stages(self.runner, &stages);

        let coverage = if reports.iter().any(|r| r.failure().is_some()) {
            None
        } else if collects_coverage(config, &reports) {
            let processor = self.coverage(config);
            Some(match processor.extract() {
                Ok(report) => CoverageOutcome::Uploaded(report),
                Err(e) => {
                    error!("{}", e);
                    CoverageOutcome::Failed {
                        message: e.to_string(),
                    }
                }
            })
        } else {
            if config.coverage {
                warn!("Coverage requested but the standalone tests did not run; nothing to collect");
            }
            None
        };

        Ok(RunReport {
            backend: config.backend,
            workspace: workspace.root,
            fresh: workspace.fresh,
            stages: reports,
            coverage,
        })
    }

    /// What [`run`](Self::run) would do in the current workspace state.
    pub fn plan(&self, config: &BuildConfiguration) -> Result<Plan> {
        config.validate()?;
        self.stager(config).check_source(&config.source_dir)?;

        let environment = self.environment(config).changes(
            &self.layout.root,
            &config.server_host,
            config.is_full_variant,
        );
        let staging = self
            .stager(config)
            .plan(config.clean, backends::install_kind(config.backend));
        let stages = backends::plan_stages(&self.context(config));
        let outcomes = backends::preview(&stages);

        let coverage = if collects_coverage(config, &outcomes) {
            let processor = self.coverage(config);
            vec![processor.capture_command(), processor.upload_command()]
        } else {
            Vec::new()
        };

        Ok(Plan {
            environment,
            staging,
            stages,
            outcomes,
            coverage,
        })
    }

    fn environment(&self, config: &BuildConfiguration) -> EnvironmentConfigurator {
        EnvironmentConfigurator::new(self.platform, config.env_prefix())
    }

    fn stager(&self, config: &BuildConfiguration) -> DependencyStager<'a> {
        DependencyStager::new(
            self.runner,
            self.platform,
            &self.layout.root,
            &config.library,
            config.superproject.clone(),
        )
    }

    fn context<'c>(&'c self, config: &'c BuildConfiguration) -> BuildContext<'c> {
        BuildContext {
            config,
            layout: &self.layout,
            platform: self.platform,
        }
    }

    fn coverage(&self, config: &BuildConfiguration) -> CoveragePostProcessor<'a> {
        CoveragePostProcessor::new(
            self.runner,
            self.layout.library_dir(&config.library),
            &config.library,
        )
    }
}

/// Coverage is collected from the instrumented standalone test run only.
fn collects_coverage(config: &BuildConfiguration, reports: &[StageReport]) -> bool {
    config.coverage
        && config.backend == BackendKind::Cmake
        && reports
            .iter()
            .any(|r| r.name == cmake::STANDALONE_STAGE && r.passed())
}
