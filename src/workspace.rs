//! # Superproject Workspace Staging
//!
//! This module owns the shared superproject checkout (`~/boost-root` by
//! default) that every backend builds in. [`DependencyStager::stage`] makes
//! sure the checkout exists, that `libs/<library>` holds the current source
//! tree, and that a freshly cloned checkout has its submodules and `b2`
//! bootstrapped.
//!
//! ## Fresh vs. reused workspaces
//!
//! The expensive steps (clone, submodule fetch, dependency install,
//! bootstrap) only run when the workspace did not exist at the start of the
//! call. A reused workspace only gets its library sources refreshed. Passing
//! `clean` deletes the workspace first, which makes the call fresh again and
//! is the remedy for any half-staged checkout.
//!
//! The stager never changes the process working directory; every command it
//! runs carries the workspace root as its explicit working directory.

use std::path::{Path, PathBuf};

use glob::Pattern;
use log::{debug, info};
use serde::Serialize;

use crate::config::Superproject;
use crate::defaults;
use crate::error::{Error, Result};
use crate::filesystem::{copy_tree, remove_dir_all_force, resolve};
use crate::platform::Platform;
use crate::process::{path_arg, CommandSpec, ProcessRunner};

/// Which dependency set a workspace is prepared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallKind {
    /// The library, its tests and examples.
    Library,
    /// The documentation toolchain on top of the library.
    Docs,
}

impl InstallKind {
    /// Superproject submodules fetched on a fresh workspace.
    pub fn submodules(self) -> &'static [&'static str] {
        match self {
            Self::Library => &["tools/boostdep"],
            Self::Docs => &[
                "libs/context",
                "tools/boostdep",
                "tools/boostbook",
                "tools/docca",
                "tools/quickbook",
            ],
        }
    }
}

/// Per-user locations the pipeline reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub home: PathBuf,
    /// Workspace root, the superproject checkout.
    pub root: PathBuf,
}

impl Layout {
    /// The default layout under `home`.
    pub fn new(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let root = home.join(defaults::WORKSPACE_DIR_NAME);
        Self { home, root }
    }

    /// The default layout for the current user.
    pub fn for_current_user() -> Result<Self> {
        Ok(Self::new(defaults::home_dir()?))
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// `libs/<library>` inside the workspace.
    pub fn library_dir(&self, library: &str) -> PathBuf {
        self.root.join("libs").join(library)
    }

    /// Install prefix of the prebuilt `b2` distribution.
    pub fn b2_distro(&self) -> PathBuf {
        self.home.join("b2-distro")
    }

    /// Install prefix used by the CMake install build.
    pub fn cmake_distro(&self) -> PathBuf {
        self.home.join("cmake-distro")
    }

    /// `b2` user configuration read by the docs build.
    pub fn user_config_jam(&self) -> PathBuf {
        self.home.join("user-config.jam")
    }
}

/// A staged superproject checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workspace {
    pub root: PathBuf,
    /// Where the library sources were staged.
    pub library_dir: PathBuf,
    /// The workspace was created by this staging call.
    pub fresh: bool,
}

/// What a staging call will do, computed without side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingPlan {
    /// The existing workspace is deleted first.
    pub remove_existing: bool,
    pub fresh: bool,
    /// Superproject clone, run before the sources are copied.
    pub clone: Option<CommandSpec>,
    /// Named setup commands run after the sources are copied.
    pub setup: Vec<(&'static str, CommandSpec)>,
}

impl StagingPlan {
    /// Every command of the plan, in execution order.
    pub fn commands(&self) -> impl Iterator<Item = &CommandSpec> {
        self.clone.iter().chain(self.setup.iter().map(|(_, c)| c))
    }
}

/// Prepares the superproject workspace.
pub struct DependencyStager<'a> {
    runner: &'a dyn ProcessRunner,
    platform: Platform,
    root: PathBuf,
    library: String,
    superproject: Superproject,
}

impl<'a> DependencyStager<'a> {
    pub fn new(
        runner: &'a dyn ProcessRunner,
        platform: Platform,
        root: impl Into<PathBuf>,
        library: impl Into<String>,
        superproject: Superproject,
    ) -> Self {
        Self {
            runner,
            platform,
            root: root.into(),
            library: library.into(),
            superproject,
        }
    }

    pub fn library_dir(&self) -> PathBuf {
        self.root.join("libs").join(&self.library)
    }

    /// Stage `source_dir` into the workspace.
    ///
    /// Safe to call repeatedly; see the module documentation for which steps
    /// are skipped on a reused workspace.
    pub fn stage(&self, source_dir: &Path, clean: bool, kind: InstallKind) -> Result<Workspace> {
        self.check_source(source_dir)?;

        let plan = self.plan(clean, kind);

        if plan.remove_existing {
            info!("Removing existing workspace {}", self.root.display());
            remove_dir_all_force(&self.root).map_err(|e| Error::staging("clean", e))?;
        }

        match &plan.clone {
            Some(clone) => {
                info!("Cloning superproject into {}", self.root.display());
                self.runner
                    .run(clone)
                    .map_err(|e| Error::staging("clone", e))?;
            }
            None => info!("Reusing workspace {}", self.root.display()),
        }

        self.copy_sources(source_dir, clean)
            .map_err(|e| Error::staging("copy sources", e))?;

        for (step, command) in &plan.setup {
            self.runner
                .run(command)
                .map_err(|e| Error::staging(*step, e))?;
        }

        Ok(Workspace {
            root: self.root.clone(),
            library_dir: self.library_dir(),
            fresh: plan.fresh,
        })
    }

    /// Reject source directories that cannot be staged into this workspace.
    ///
    /// The source must be absolute and must not overlap the workspace root:
    /// copying the slot onto itself truncates every file, and a clean would
    /// delete the sources before they are copied.
    pub fn check_source(&self, source_dir: &Path) -> Result<()> {
        if !source_dir.is_absolute() {
            return Err(Error::Config {
                message: format!(
                    "source directory must be absolute: {}",
                    source_dir.display()
                ),
                hint: None,
            });
        }

        let source = resolve(source_dir);
        let root = resolve(&self.root);
        if source.starts_with(&root) || root.starts_with(&source) {
            return Err(Error::Config {
                message: format!(
                    "source directory {} overlaps the workspace {}",
                    source_dir.display(),
                    self.root.display()
                ),
                hint: Some(
                    "Check out the library outside the workspace, or pass --workspace"
                        .to_string(),
                ),
            });
        }
        Ok(())
    }

    /// The commands [`stage`](Self::stage) would run given the current state
    /// of the workspace directory.
    pub fn plan(&self, clean: bool, kind: InstallKind) -> StagingPlan {
        let exists = self.root.exists();
        let remove_existing = clean && exists;
        let fresh = remove_existing || !exists;

        StagingPlan {
            remove_existing,
            fresh,
            clone: fresh.then(|| self.clone_command()),
            setup: if fresh {
                self.setup_commands(kind)
            } else {
                Vec::new()
            },
        }
    }

    fn clone_command(&self) -> CommandSpec {
        CommandSpec::new("git").args([
            "clone".to_string(),
            "-b".to_string(),
            self.superproject.branch.clone(),
            "--depth".to_string(),
            defaults::CLONE_DEPTH.to_string(),
            self.superproject.url.to_string(),
            path_arg(&self.root),
        ])
    }

    /// Submodule fetch, dependency install and bootstrap for a fresh
    /// checkout.
    fn setup_commands(&self, kind: InstallKind) -> Vec<(&'static str, CommandSpec)> {
        let in_root = |command: CommandSpec| command.current_dir(&self.root);
        let mut commands = vec![(
            "submodules",
            in_root(CommandSpec::new("git").args([
                "config".to_string(),
                "submodule.fetchJobs".to_string(),
                defaults::SUBMODULE_FETCH_JOBS.to_string(),
            ])),
        )];

        for submodule in kind.submodules() {
            commands.push((
                "submodules",
                in_root(CommandSpec::new("git").args([
                    "submodule",
                    "update",
                    "-q",
                    "--init",
                    *submodule,
                ])),
            ));
        }

        let depinst = CommandSpec::new("python").arg("tools/boostdep/depinst/depinst.py");
        let depinst = match kind {
            InstallKind::Library => depinst.args(["--include", "example", self.library.as_str()]),
            InstallKind::Docs => depinst.arg("../tools/quickbook"),
        };
        commands.push(("dependency install", in_root(depinst)));

        let (program, args) = self.platform.bootstrap_command();
        commands.push((
            "bootstrap",
            in_root(CommandSpec::new(program).args(args.iter().copied())),
        ));
        commands.push(("bootstrap", in_root(CommandSpec::new("b2").arg("headers"))));

        commands
    }

    /// Put the current sources into `libs/<library>`.
    ///
    /// The slot is copied over in place so build directories created inside
    /// it by earlier runs survive; it is removed first on `clean` or when the
    /// platform cannot overwrite in place.
    fn copy_sources(&self, source_dir: &Path, clean: bool) -> Result<()> {
        let library_dir = self.library_dir();
        if library_dir.exists() && (clean || !self.platform.overwrites_in_place()) {
            debug!("removing staged sources {}", library_dir.display());
            remove_dir_all_force(&library_dir)?;
        }

        let exclude = [Pattern::new(defaults::BUILD_DIR_GLOB)?];
        let copied = copy_tree(source_dir, &library_dir, &exclude)?;
        info!(
            "Staged {} files from {} into {}",
            copied,
            source_dir.display(),
            library_dir.display()
        );
        Ok(())
    }
}
