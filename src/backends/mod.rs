//! # Build Backends
//!
//! A run executes exactly one backend, selected by
//! [`BackendKind`](crate::config::BackendKind):
//!
//! - **`b2`**: one `b2` invocation building unit tests, integration tests and
//!   examples.
//! - **`cmake`**: up to six independent CMake builds, each validating a
//!   different way of consuming the library.
//! - **`docs`**: the documentation release build.
//!
//! Every backend is described the same way: a list of [`BuildStage`]s, each
//! with its own build directory and steps. Planning a backend is pure; the
//! [`run_stages`] executor turns the plan into side effects. The `plan` CLI
//! command prints the same stages that `build` executes.
//!
//! ## Stage ordering and skips
//!
//! Stages run strictly in order. A stage may require an [`Artifact`] produced
//! by an earlier stage (the prebuilt `b2` distribution); when that artifact
//! was not produced the stage is skipped, never attempted. Stages can also be
//! disabled up front by the configuration. The first failing stage aborts
//! the backend and nothing after it runs.

pub mod b2;
pub mod cmake;
pub mod docs;

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use log::{debug, error, info};
use serde::Serialize;

use crate::config::{BackendKind, BuildConfiguration};
use crate::error::Result;
use crate::filesystem::{remove_dir_all_force, replace_tree};
use crate::platform::Platform;
use crate::process::{CommandSpec, ProcessRunner};
use crate::workspace::{InstallKind, Layout};

/// Everything a backend needs to plan its stages.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub config: &'a BuildConfiguration,
    pub layout: &'a Layout,
    pub platform: Platform,
}

impl BuildContext<'_> {
    /// `libs/<library>` inside the workspace.
    pub fn library_dir(&self) -> PathBuf {
        self.layout.library_dir(&self.config.library)
    }
}

/// Outputs one stage leaves behind for later stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Artifact {
    /// Boost installed by `b2` into `~/b2-distro`.
    B2Distro,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::B2Distro => f.write_str("b2-distro"),
        }
    }
}

/// One action inside a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Run(CommandSpec),
    RemoveDir(PathBuf),
    WriteFile { path: PathBuf, contents: String },
    /// Replace `dst` with a copy of `src`.
    ReplaceTree { src: PathBuf, dst: PathBuf },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Run(command) => write!(f, "{}", command),
            Step::RemoveDir(path) => write!(f, "remove {}", path.display()),
            Step::WriteFile { path, .. } => write!(f, "write {}", path.display()),
            Step::ReplaceTree { src, dst } => {
                write!(f, "copy {} to {}", src.display(), dst.display())
            }
        }
    }
}

/// A named configure/build/test cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStage {
    pub name: &'static str,
    /// Build directory, created before the first step runs.
    pub dir: Option<PathBuf>,
    pub steps: Vec<Step>,
    pub requires: Vec<Artifact>,
    pub produces: Vec<Artifact>,
    /// Set when the configuration rules the stage out.
    pub disabled: Option<String>,
}

impl BuildStage {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            dir: None,
            steps: Vec::new(),
            requires: Vec::new(),
            produces: Vec::new(),
            disabled: None,
        }
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn run(self, command: CommandSpec) -> Self {
        self.step(Step::Run(command))
    }

    pub fn requires(mut self, artifact: Artifact) -> Self {
        self.requires.push(artifact);
        self
    }

    pub fn produces(mut self, artifact: Artifact) -> Self {
        self.produces.push(artifact);
        self
    }

    /// Disable the stage when `condition` holds.
    pub fn disabled_if(mut self, condition: bool, reason: &str) -> Self {
        if condition && self.disabled.is_none() {
            self.disabled = Some(reason.to_string());
        }
        self
    }

    /// Why the stage will not run, given the artifacts available so far.
    pub fn skip_reason(&self, available: &HashSet<Artifact>) -> Option<String> {
        if let Some(reason) = &self.disabled {
            return Some(reason.clone());
        }
        self.requires
            .iter()
            .find(|artifact| !available.contains(artifact))
            .map(|artifact| format!("requires {}, which was not produced", artifact))
    }
}

/// Result of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StageOutcome {
    Passed,
    Skipped { reason: String },
    /// The stage ran and one of its steps failed.
    Failed { message: String },
}

/// Outcome of one stage of a backend run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub name: String,
    #[serde(flatten)]
    pub outcome: StageOutcome,
}

impl StageReport {
    pub fn passed(&self) -> bool {
        self.outcome == StageOutcome::Passed
    }

    /// Error message of a failed stage.
    pub fn failure(&self) -> Option<&str> {
        match &self.outcome {
            StageOutcome::Failed { message } => Some(message),
            _ => None,
        }
    }
}

/// Dependency set the backend stages the workspace with.
pub fn install_kind(kind: BackendKind) -> InstallKind {
    match kind {
        BackendKind::B2 | BackendKind::Cmake => InstallKind::Library,
        BackendKind::Docs => InstallKind::Docs,
    }
}

/// Stages of the configured backend, in execution order.
pub fn plan_stages(ctx: &BuildContext<'_>) -> Vec<BuildStage> {
    match ctx.config.backend {
        BackendKind::B2 => b2::stages(ctx),
        BackendKind::Cmake => cmake::stages(ctx),
        BackendKind::Docs => docs::stages(ctx),
    }
}

/// Predict each stage's outcome assuming every stage that runs succeeds.
pub fn preview(stages: &[BuildStage]) -> Vec<StageReport> {
    let mut available = HashSet::new();
    stages
        .iter()
        .map(|stage| {
            let outcome = match stage.skip_reason(&available) {
                Some(reason) => StageOutcome::Skipped { reason },
                None => {
                    available.extend(stage.produces.iter().copied());
                    StageOutcome::Passed
                }
            };
            StageReport {
                name: stage.name.to_string(),
                outcome,
            }
        })
        .collect()
}

/// Execute `stages` in order, stopping at the first failure.
///
/// The failing stage is the last report; stages after it are neither run
/// nor reported.
pub fn run_stages(runner: &dyn ProcessRunner, stages: &[BuildStage]) -> Vec<StageReport> {
    let mut available = HashSet::new();
    let mut reports = Vec::with_capacity(stages.len());

    for stage in stages {
        let name = stage.name.to_string();
        if let Some(reason) = stage.skip_reason(&available) {
            info!("Skipping stage '{}': {}", stage.name, reason);
            reports.push(StageReport {
                name,
                outcome: StageOutcome::Skipped { reason },
            });
            continue;
        }

        info!("Running stage '{}'", stage.name);
        if let Err(e) = run_stage(runner, stage) {
            error!("Stage '{}' failed: {}", stage.name, e);
            reports.push(StageReport {
                name,
                outcome: StageOutcome::Failed {
                    message: e.to_string(),
                },
            });
            break;
        }
        available.extend(stage.produces.iter().copied());
        reports.push(StageReport {
            name,
            outcome: StageOutcome::Passed,
        });
    }

    reports
}

fn run_stage(runner: &dyn ProcessRunner, stage: &BuildStage) -> Result<()> {
    if let Some(dir) = &stage.dir {
        fs::create_dir_all(dir)?;
    }

    for step in &stage.steps {
        match step {
            Step::Run(command) => runner.run(command)?,
            Step::RemoveDir(path) => {
                debug!("removing {}", path.display());
                remove_dir_all_force(path)?;
            }
            Step::WriteFile { path, contents } => {
                debug!("writing {}", path.display());
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(path, contents)?;
            }
            Step::ReplaceTree { src, dst } => {
                replace_tree(src, dst, &[])?;
            }
        }
    }

    Ok(())
}
