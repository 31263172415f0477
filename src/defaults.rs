//! Default values for boost-ci configuration.
//!
//! This module provides centralized default values used across the pipeline,
//! ensuring the staging logic, the backends and the CLI agree on them.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Superproject repository cloned into a fresh workspace.
pub const SUPERPROJECT_URL: &str = "https://github.com/boostorg/boost.git";

/// Superproject branch cloned into a fresh workspace.
pub const SUPERPROJECT_BRANCH: &str = "master";

/// History depth of the superproject clone.
pub const CLONE_DEPTH: u32 = 1;

/// Parallel submodule fetches configured on a fresh workspace.
pub const SUBMODULE_FETCH_JOBS: u32 = 8;

/// Job parallelism hint passed to every build tool invocation.
pub const BUILD_JOBS: u32 = 4;

/// Library staged into the superproject when none is given.
pub const LIBRARY: &str = "mysql";

/// Name of the workspace directory under the user's home.
pub const WORKSPACE_DIR_NAME: &str = "boost-root";

/// Glob for local build output directories that are never staged.
pub const BUILD_DIR_GLOB: &str = "__build*__";

/// Returns the user's home directory.
///
/// The workspace and the install prefixes live under it, so a missing or
/// relative home is a configuration error.
pub fn home_dir() -> Result<PathBuf> {
    absolute_home(dirs::home_dir())
}

fn absolute_home(home: Option<PathBuf>) -> Result<PathBuf> {
    match home {
        Some(home) if home.is_absolute() => Ok(home),
        Some(home) => Err(Error::Config {
            message: format!("home directory is not absolute: {}", home.display()),
            hint: Some("Set HOME to an absolute path".to_string()),
        }),
        None => Err(Error::Config {
            message: "could not determine the home directory".to_string(),
            hint: Some("Set HOME to an absolute path".to_string()),
        }),
    }
}
