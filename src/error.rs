//! # Error Handling
//!
//! This module defines the centralized error type for `boost-ci`. It uses the
//! `thiserror` library to describe every failure mode of a pipeline run with
//! enough context that an operator can act on it without re-running.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Each variant corresponds to one class of
//!   failure in the pipeline:
//!   - configuration errors (rejected before anything runs),
//!   - process failures (a tool could not be spawned or exited non-zero),
//!   - staging failures (the superproject checkout could not be prepared),
//!   - build stage failures (one of the backend stages failed),
//!   - coverage failures (post-processing or upload of coverage data),
//!   - filesystem and I/O errors.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! A stage that is skipped because its inputs are unavailable is not an error
//! and has no variant here.

use thiserror::Error;

/// Main error type for boost-ci operations
#[derive(Error, Debug)]
pub enum Error {
    /// The build configuration was rejected before the pipeline started.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Config {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// An external program could not be started at all.
    #[error("Failed to spawn {program}: {message}")]
    Spawn { program: String, message: String },

    /// An external program ran and exited unsuccessfully.
    ///
    /// `code` is `None` when the process was terminated by a signal.
    #[error("Command failed{}: {command}", code.map(|c| format!(" with exit code {}", c)).unwrap_or_else(|| " (terminated by signal)".to_string()))]
    Process { command: String, code: Option<i32> },

    /// Preparing the superproject workspace failed.
    #[error("Staging error during {step}: {source}")]
    Staging {
        step: String,
        #[source]
        source: Box<Error>,
    },

    /// One of the backend build stages failed.
    #[error("Build stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },

    /// Coverage capture, filtering or upload failed.
    #[error("Coverage processing error: {message}")]
    Coverage { message: String },

    /// A filesystem utility operation failed.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A directory traversal error, wrapped from `walkdir::Error`.
    #[error("Directory traversal error: {0}")]
    Walk(#[from] walkdir::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// A serialization error, wrapped from `serde_json::Error`.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap an error as a failure of the named staging step.
    pub fn staging(step: impl Into<String>, source: Error) -> Self {
        Error::Staging {
            step: step.into(),
            source: Box::new(source),
        }
    }

    /// Failure of the named build stage, as recorded in its report.
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a coverage post-processing failure.
    pub fn is_coverage(&self) -> bool {
        matches!(self, Error::Coverage { .. })
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config() {
        let error = Error::Config {
            message: "source directory must be absolute".to_string(),
            hint: None,
        };
        let display = format!("{}", error);
        assert!(display.contains("Configuration error"));
        assert!(display.contains("must be absolute"));
        assert!(!display.contains("hint:"));
    }

    #[test]
    fn test_error_display_config_with_hint() {
        let error = Error::Config {
            message: "bad value".to_string(),
            hint: Some("Use 1 or 0".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("hint:"));
        assert!(display.contains("Use 1 or 0"));
    }

    #[test]
    fn test_error_display_process_with_code() {
        let error = Error::Process {
            command: "b2 headers".to_string(),
            code: Some(2),
        };
        let display = format!("{}", error);
        assert!(display.contains("exit code 2"));
        assert!(display.contains("b2 headers"));
    }

    #[test]
    fn test_error_display_process_signal() {
        let error = Error::Process {
            command: "ctest".to_string(),
            code: None,
        };
        assert!(format!("{}", error).contains("terminated by signal"));
    }

    #[test]
    fn test_error_display_stage_includes_message() {
        let source = Error::Process {
            command: "cmake --build .".to_string(),
            code: Some(1),
        };
        let error = Error::stage("install", source.to_string());
        let display = format!("{}", error);
        assert!(display.contains("Build stage 'install' failed"));
        assert!(display.contains("cmake --build ."));
    }

    #[test]
    fn test_error_display_staging() {
        let error = Error::staging(
            "clone",
            Error::Spawn {
                program: "git".to_string(),
                message: "not found".to_string(),
            },
        );
        let display = format!("{}", error);
        assert!(display.contains("Staging error during clone"));
        assert!(display.contains("Failed to spawn git"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("File not found"));
    }

    #[test]
    fn test_error_from_glob_error() {
        let glob_error = glob::Pattern::new("[").unwrap_err();
        let error: Error = glob_error.into();
        assert!(format!("{}", error).contains("Glob pattern error"));
    }

    #[test]
    fn test_is_coverage() {
        let error = Error::Coverage {
            message: "upload failed".to_string(),
        };
        assert!(error.is_coverage());
        assert!(!Error::Filesystem {
            message: "x".to_string()
        }
        .is_coverage());
    }
}
