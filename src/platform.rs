//! Platform differences that influence the pipeline.
//!
//! Every Windows/POSIX decision the pipeline makes is answered here so the
//! backends never test `cfg!(windows)` themselves.

use std::fmt;
use std::path::PathBuf;

/// Host platform family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Windows,
    Posix,
}

impl Platform {
    /// Detect the platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Posix
        }
    }

    pub fn is_windows(self) -> bool {
        self == Self::Windows
    }

    /// Separator used in `PATH`-like environment variables.
    pub fn path_list_separator(self) -> char {
        match self {
            Self::Windows => ';',
            Self::Posix => ':',
        }
    }

    /// Command that bootstraps `b2` inside a freshly cloned superproject.
    pub fn bootstrap_command(self) -> (&'static str, &'static [&'static str]) {
        match self {
            Self::Windows => ("cmd", &["/q", "/c", "bootstrap.bat"]),
            Self::Posix => ("bash", &["bootstrap.sh"]),
        }
    }

    /// OpenSSL install root for the given address model.
    ///
    /// Only Windows runners need it spelled out; elsewhere the system
    /// OpenSSL is found by the build tools.
    pub fn openssl_root(self, address_model: &str) -> Option<String> {
        match self {
            Self::Windows => Some(format!("C:\\openssl-{}", address_model)),
            Self::Posix => None,
        }
    }

    /// Extra entries for `CMAKE_PREFIX_PATH` that every CMake configure needs.
    pub fn cmake_prefix_path(self) -> Vec<PathBuf> {
        match self {
            Self::Windows => vec![PathBuf::from("C:\\openssl-64")],
            Self::Posix => Vec::new(),
        }
    }

    /// Environment variable the dynamic loader searches for shared libraries.
    ///
    /// Windows resolves DLLs through `PATH`, so nothing extra is set there.
    pub fn library_path_var(self) -> Option<&'static str> {
        match self {
            Self::Windows => None,
            Self::Posix => Some("LD_LIBRARY_PATH"),
        }
    }

    /// Whether UNIX domain socket tests can run on this platform.
    pub fn supports_unix_sockets(self) -> bool {
        !self.is_windows()
    }

    /// Whether staged sources can be copied over an existing component slot.
    ///
    /// Read-only files left by a Windows checkout cannot be overwritten, so
    /// the slot is removed and copied afresh there.
    pub fn overwrites_in_place(self) -> bool {
        !self.is_windows()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Posix => "posix",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
