//! # Build Configuration
//!
//! The immutable record that drives a single pipeline run. The CLI builds a
//! [`BuildConfiguration`] from flags, the pipeline validates it once and then
//! only ever borrows it.
//!
//! Option values that arrive as text (booleans, backend kinds, stdlib and
//! address model) are parsed here so the accepted spellings are defined in a
//! single place.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;
use url::Url;

use crate::defaults;
use crate::error::{Error, Result};

/// The build strategy a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// A single `b2` invocation building tests and examples.
    B2,
    /// The CMake validation matrix.
    Cmake,
    /// Documentation generation.
    Docs,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::B2 => "b2",
            Self::Cmake => "cmake",
            Self::Docs => "docs",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "b2" => Ok(Self::B2),
            "cmake" => Ok(Self::Cmake),
            "docs" => Ok(Self::Docs),
            other => Err(format!(
                "unknown build kind '{}' (expected b2, cmake or docs)",
                other
            )),
        }
    }
}

/// C++ standard library flavour passed to `b2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stdlib {
    #[serde(rename = "native")]
    Native,
    #[serde(rename = "libc++")]
    Libcxx,
}

impl Stdlib {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Libcxx => "libc++",
        }
    }
}

impl fmt::Display for Stdlib {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stdlib {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "native" => Ok(Self::Native),
            "libc++" => Ok(Self::Libcxx),
            other => Err(format!(
                "unknown stdlib '{}' (expected native or libc++)",
                other
            )),
        }
    }
}

/// Target address width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AddressModel {
    #[serde(rename = "32")]
    Bits32,
    #[serde(rename = "64")]
    Bits64,
}

impl AddressModel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bits32 => "32",
            Self::Bits64 => "64",
        }
    }
}

impl fmt::Display for AddressModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AddressModel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "32" => Ok(Self::Bits32),
            "64" => Ok(Self::Bits64),
            other => Err(format!(
                "unknown address model '{}' (expected 32 or 64)",
                other
            )),
        }
    }
}

/// Where the superproject is cloned from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Superproject {
    pub url: Url,
    pub branch: String,
}

impl Superproject {
    pub fn new(url: &str, branch: &str) -> Result<Self> {
        Ok(Self {
            url: Url::parse(url)?,
            branch: branch.to_string(),
        })
    }
}

impl Default for Superproject {
    fn default() -> Self {
        Self {
            url: Url::parse(defaults::SUPERPROJECT_URL).expect("default superproject URL is valid"),
            branch: defaults::SUPERPROJECT_BRANCH.to_string(),
        }
    }
}

/// Everything a pipeline run needs to know, fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildConfiguration {
    pub backend: BackendKind,
    /// Absolute path of the library checkout being tested.
    pub source_dir: PathBuf,
    /// Library name inside the superproject (`libs/<library>`).
    pub library: String,
    pub toolset: String,
    pub cxxstd: String,
    pub variant: String,
    pub stdlib: Stdlib,
    pub address_model: AddressModel,
    /// Destroy and recreate the workspace before staging.
    pub clean: bool,
    pub build_shared_libs: bool,
    pub valgrind: bool,
    pub coverage: bool,
    /// Run the builds that consume the prebuilt `b2` distribution.
    pub standalone_tests: bool,
    /// Host running the database server used by integration tests.
    pub server_host: String,
    /// The server supports SHA-256 authentication (MySQL 8 and later).
    pub is_full_variant: bool,
    /// CMake generator.
    pub generator: String,
    pub superproject: Superproject,
}

impl BuildConfiguration {
    /// A configuration with every option at its default.
    pub fn new(backend: BackendKind, source_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            source_dir: source_dir.into(),
            library: defaults::LIBRARY.to_string(),
            toolset: "clang".to_string(),
            cxxstd: "20".to_string(),
            variant: "release".to_string(),
            stdlib: Stdlib::Native,
            address_model: AddressModel::Bits64,
            clean: false,
            build_shared_libs: true,
            valgrind: false,
            coverage: false,
            standalone_tests: true,
            server_host: "localhost".to_string(),
            is_full_variant: true,
            generator: "Ninja".to_string(),
            superproject: Superproject::default(),
        }
    }

    /// Check the invariants the pipeline relies on.
    pub fn validate(&self) -> Result<()> {
        if !self.source_dir.is_absolute() {
            return Err(Error::Config {
                message: format!(
                    "source directory must be absolute: {}",
                    self.source_dir.display()
                ),
                hint: Some("Pass an absolute path to --source-dir".to_string()),
            });
        }

        let valid_library = !self.library.is_empty()
            && self
                .library
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_library {
            return Err(Error::Config {
                message: format!("invalid library name '{}'", self.library),
                hint: Some("Library names look like 'mysql' or 'date_time'".to_string()),
            });
        }

        for (name, value) in [
            ("toolset", &self.toolset),
            ("cxxstd", &self.cxxstd),
            ("variant", &self.variant),
            ("generator", &self.generator),
            ("server host", &self.server_host),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config {
                    message: format!("{} must not be empty", name),
                    hint: None,
                });
            }
        }

        Ok(())
    }

    /// Prefix of the environment variables the library's test suite reads,
    /// e.g. `BOOST_MYSQL_`.
    pub fn env_prefix(&self) -> String {
        format!("BOOST_{}_", self.library.to_ascii_uppercase())
    }
}

/// Parse a boolean option.
///
/// Accepts `1`/`0`, `true`/`false`, `on`/`off` and `yes`/`no`, ignoring case
/// and surrounding whitespace.
pub fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(Error::Config {
            message: format!("boolean value expected, got '{}'", value),
            hint: Some("Use 1 or 0".to_string()),
        }),
    }
}
