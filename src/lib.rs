//! # Boost CI Library
//!
//! This library implements the build-orchestration pipeline behind the
//! `boost-ci` command-line tool. It tests a Boost library that is developed
//! in its own repository but built as part of the Boost superproject: the
//! library's sources are staged into a superproject checkout, one build
//! backend is driven over them, and coverage data is optionally filtered and
//! uploaded.
//!
//! ## Quick Example
//!
//! ```
//! use boost_ci::config::{BackendKind, BuildConfiguration};
//! use boost_ci::orchestrator::Pipeline;
//! use boost_ci::platform::Platform;
//! use boost_ci::process::RecordingRunner;
//! use boost_ci::workspace::Layout;
//!
//! let config = BuildConfiguration::new(BackendKind::Cmake, "/src/mysql");
//! let runner = RecordingRunner::new();
//! let pipeline = Pipeline::new(&runner, Platform::Posix, Layout::new("/nonexistent-home"));
//!
//! // Planning never runs anything.
//! let plan = pipeline.plan(&config).unwrap();
//! assert_eq!(plan.stages.len(), 6);
//! assert!(runner.commands().is_empty());
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: The immutable [`BuildConfiguration`] of a
//!   run, with the backend selection and all build options.
//! - **Process Execution (`process`)**: Every external tool runs through the
//!   [`ProcessRunner`] trait, with explicit working directory and environment.
//! - **Workspace (`workspace`)**: The superproject checkout shared between
//!   runs, and the [`DependencyStager`] that prepares it.
//! - **Backends (`backends`)**: `b2`, `cmake` and `docs`, each planned as an
//!   ordered list of build stages.
//! - **Coverage (`coverage`)**: Reduces an `lcov` capture to the library's
//!   public headers before uploading it.
//! - **Orchestrator (`orchestrator`)**: Ties everything together into a run
//!   producing a [`RunReport`].
//!
//! [`BuildConfiguration`]: config::BuildConfiguration
//! [`ProcessRunner`]: process::ProcessRunner
//! [`DependencyStager`]: workspace::DependencyStager
//! [`RunReport`]: report::RunReport

pub mod backends;
pub mod config;
pub mod coverage;
pub mod defaults;
pub mod environment;
pub mod error;
pub mod filesystem;
pub mod orchestrator;
pub mod output;
pub mod platform;
pub mod process;
pub mod report;
pub mod workspace;
