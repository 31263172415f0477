//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the `boost-ci`
//! command-line tool. Each subcommand is defined in its own file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic by calling into the `boost_ci` library.
//!
//! `build` and `plan` share their options through `build::ConfigArgs`, so a
//! plan always describes exactly the run the same flags would start.

pub mod build;
pub mod completions;
pub mod plan;
