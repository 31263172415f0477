//! Process-wide environment set up before any tool runs.
//!
//! The changes are computed as a list of [`EnvChange`] values first, so the
//! `plan` command can show them, and then applied to the current process.
//! Child processes inherit them. Nothing here is ever rolled back.

use std::env;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use log::debug;

use crate::platform::Platform;

/// One mutation of the process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvChange {
    /// Put `entry` in front of the list variable `var`.
    Prepend { var: String, entry: PathBuf },
    Set { var: String, value: String },
    Unset { var: String },
}

impl fmt::Display for EnvChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvChange::Prepend { var, entry } => {
                write!(f, "prepend {} to {}", entry.display(), var)
            }
            EnvChange::Set { var, value } => write!(f, "{}={}", var, value),
            EnvChange::Unset { var } => write!(f, "unset {}", var),
        }
    }
}

/// Applies the environment the library's build and test suite expect.
#[derive(Debug, Clone)]
pub struct EnvironmentConfigurator {
    platform: Platform,
    /// Prefix of the test-suite variables, e.g. `BOOST_MYSQL_`.
    prefix: String,
}

impl EnvironmentConfigurator {
    pub fn new(platform: Platform, prefix: impl Into<String>) -> Self {
        Self {
            platform,
            prefix: prefix.into(),
        }
    }

    /// Compute the changes without touching the environment.
    pub fn changes(
        &self,
        boost_root: &Path,
        server_host: &str,
        is_full_variant: bool,
    ) -> Vec<EnvChange> {
        let mut changes = vec![
            EnvChange::Prepend {
                var: "PATH".to_string(),
                entry: boost_root.to_path_buf(),
            },
            EnvChange::Set {
                var: self.var("SERVER_HOST"),
                value: server_host.to_string(),
            },
        ];

        if !self.platform.supports_unix_sockets() {
            changes.push(EnvChange::Set {
                var: self.var("NO_UNIX_SOCKET_TESTS"),
                value: "1".to_string(),
            });
        }

        changes.push(if is_full_variant {
            EnvChange::Unset {
                var: self.var("NO_SHA256_TESTS"),
            }
        } else {
            EnvChange::Set {
                var: self.var("NO_SHA256_TESTS"),
                value: "1".to_string(),
            }
        });

        changes
    }

    /// Compute and apply the changes to the current process.
    pub fn configure(&self, boost_root: &Path, server_host: &str, is_full_variant: bool) {
        for change in self.changes(boost_root, server_host, is_full_variant) {
            self.apply(&change);
        }
    }

    fn apply(&self, change: &EnvChange) {
        debug!("env: {}", change);
        match change {
            EnvChange::Prepend { var, entry } => {
                let mut value = OsString::from(entry.as_os_str());
                if let Some(previous) = env::var_os(var).filter(|v| !v.is_empty()) {
                    value.push(self.platform.path_list_separator().to_string());
                    value.push(previous);
                }
                env::set_var(var, value);
            }
            EnvChange::Set { var, value } => env::set_var(var, value),
            EnvChange::Unset { var } => env::remove_var(var),
        }
    }

    fn var(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }
}
