//! Shared test utilities for the CLI end-to-end tests.
//!
//! The fixture provides a temporary directory with a library checkout and,
//! on Unix, a directory of fake build tools. Each fake tool appends its
//! command line to a log file and exits with a configurable status, so a
//! complete `boost-ci build` can run without git, b2 or cmake installed.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! let fixture = TestFixture::new().with_library_sources();
//! fixture.command().arg("plan").args(fixture.config_args("b2")).assert().success();
//! ```

use assert_fs::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    pub use super::TestFixture;
}

/// Tools the pipeline invokes during a `b2` or `cmake` build.
#[allow(dead_code)]
pub const BUILD_TOOLS: &[&str] = &["git", "python", "bash", "b2", "cmake", "ctest"];

/// A temporary directory holding a library checkout, a workspace location
/// and optionally fake tools.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add a minimal library checkout under `mysql/`.
    pub fn with_library_sources(self) -> Self {
        self.with_file("mysql/include/boost/mysql.hpp", "#pragma once\n")
            .with_file("mysql/test/CMakeLists.txt", "# tests\n")
            .with_file("mysql/__build_local__/CMakeCache.txt", "")
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Install fake executables that log their invocation and succeed.
    #[cfg(unix)]
    #[allow(dead_code)]
    pub fn with_fake_tools(self, tools: &[&str]) -> Self {
        for tool in tools {
            self.install_tool(tool, 0);
        }
        self
    }

    /// Install a fake executable that logs its invocation and exits with
    /// `code`.
    #[cfg(unix)]
    #[allow(dead_code)]
    pub fn with_failing_tool(self, tool: &str, code: i32) -> Self {
        self.install_tool(tool, code);
        self
    }

    #[cfg(unix)]
    fn install_tool(&self, tool: &str, code: i32) {
        use std::os::unix::fs::PermissionsExt;

        let bin = self.bin_dir();
        fs::create_dir_all(&bin).expect("Failed to create bin dir");
        let path = bin.join(tool);
        let script = format!(
            "#!/bin/sh\necho \"{} $*\" >> \"{}\"\nexit {}\n",
            tool,
            self.log_path().display(),
            code
        );
        fs::write(&path, script).expect("Failed to write fake tool");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Failed to make fake tool executable");
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn source_dir(&self) -> PathBuf {
        self.path().join("mysql")
    }

    pub fn workspace(&self) -> PathBuf {
        self.path().join("boost-root")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.path().join("bin")
    }

    pub fn log_path(&self) -> PathBuf {
        self.path().join("tools.log")
    }

    /// Command lines recorded by the fake tools, in order.
    #[allow(dead_code)]
    pub fn tool_log(&self) -> Vec<String> {
        fs::read_to_string(self.log_path())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// `--build-kind`, `--source-dir` and `--workspace` for this fixture.
    pub fn config_args(&self, build_kind: &str) -> Vec<String> {
        vec![
            "--build-kind".to_string(),
            build_kind.to_string(),
            "--source-dir".to_string(),
            self.source_dir().display().to_string(),
            "--workspace".to_string(),
            self.workspace().display().to_string(),
        ]
    }

    /// A `boost-ci` command isolated from the caller's environment: home in
    /// the temp dir, fake tools first on `PATH` and no `BOOST_CI_*` overrides.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("boost-ci");
        let path = std::env::var_os("PATH").unwrap_or_default();
        let mut entries = vec![self.bin_dir()];
        entries.extend(std::env::split_paths(&path));
        cmd.env("PATH", std::env::join_paths(entries).expect("valid PATH"))
            .env("HOME", self.path())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        for (key, _) in std::env::vars_os() {
            if key.to_string_lossy().starts_with("BOOST_CI_") {
                cmd.env_remove(key);
            }
        }
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
