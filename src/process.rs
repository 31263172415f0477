//! # External Process Execution
//!
//! Every build tool the pipeline drives (`git`, `b2`, `cmake`, `ctest`,
//! `lcov`, `codecov`, bootstrap scripts) is invoked through the
//! [`ProcessRunner`] trait. A command is an atomic step: it either exits
//! successfully or the whole step fails.
//!
//! - **`SystemRunner`** spawns real processes, inheriting stdout and stderr so
//!   tool diagnostics reach the operator verbatim.
//! - **`RecordingRunner`** records commands instead of running them, with an
//!   optional hook to simulate side effects or failures. Tests use it to
//!   observe the exact command sequence of a pipeline run.

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Mutex;

use log::{debug, info};

use crate::error::{Error, Result};

/// A fully described external command: program, arguments, working
/// directory and environment overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory; `None` inherits the caller's.
    pub cwd: Option<PathBuf>,
    /// Variables added to the inherited environment.
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Whether any argument equals `arg`.
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// Value of an environment override, if one was set.
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Trait for running external commands - allows recording in tests
pub trait ProcessRunner: Send + Sync {
    /// Runs the command to completion. Any non-zero exit is an error.
    fn run(&self, command: &CommandSpec) -> Result<()>;
}

/// The default implementation of `ProcessRunner`, which spawns real
/// processes and waits for them.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, command: &CommandSpec) -> Result<()> {
        info!("+ {}", command);
        if let Some(cwd) = &command.cwd {
            debug!("  in {}", cwd.display());
        }

        let mut process = Command::new(&command.program);
        process
            .args(&command.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(cwd) = &command.cwd {
            process.current_dir(cwd);
        }
        for (key, value) in &command.env {
            process.env(key, value);
        }

        let status = process.status().map_err(|e| Error::Spawn {
            program: command.program.clone(),
            message: e.to_string(),
        })?;

        if !status.success() {
            return Err(Error::Process {
                command: command.to_string(),
                code: status.code(),
            });
        }

        Ok(())
    }
}

type Hook = Box<dyn Fn(&CommandSpec) -> Result<()> + Send + Sync>;

/// A `ProcessRunner` that records every command instead of spawning it.
///
/// The optional hook runs for each recorded command; returning an error from
/// it simulates a failing tool, writing files from it simulates a tool's
/// output.
#[derive(Default)]
pub struct RecordingRunner {
    commands: Mutex<Vec<CommandSpec>>,
    hook: Option<Hook>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `hook` for every command after recording it.
    pub fn with_hook<F>(hook: F) -> Self
    where
        F: Fn(&CommandSpec) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            commands: Mutex::new(Vec::new()),
            hook: Some(Box::new(hook)),
        }
    }

    /// Fails every command matching `predicate` with exit code 1.
    pub fn failing_on<F>(predicate: F) -> Self
    where
        F: Fn(&CommandSpec) -> bool + Send + Sync + 'static,
    {
        Self::with_hook(move |command| {
            if predicate(command) {
                Err(Error::Process {
                    command: command.to_string(),
                    code: Some(1),
                })
            } else {
                Ok(())
            }
        })
    }

    /// All commands recorded so far, in execution order.
    pub fn commands(&self) -> Vec<CommandSpec> {
        self.commands
            .lock()
            .map(|commands| commands.clone())
            .unwrap_or_default()
    }

    /// Recorded commands rendered as `program args...` lines.
    pub fn command_lines(&self) -> Vec<String> {
        self.commands().iter().map(ToString::to_string).collect()
    }

    /// Number of recorded invocations of `program`.
    pub fn count(&self, program: &str) -> usize {
        self.commands()
            .iter()
            .filter(|c| c.program == program)
            .count()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        if let Ok(mut commands) = self.commands.lock() {
            commands.clear();
        }
    }
}

impl ProcessRunner for RecordingRunner {
    fn run(&self, command: &CommandSpec) -> Result<()> {
        debug!("(recorded) + {}", command);
        self.commands
            .lock()
            .map_err(|_| Error::Filesystem {
                message: "recording runner lock poisoned".to_string(),
            })?
            .push(command.clone());
        match &self.hook {
            Some(hook) => hook(command),
            None => Ok(()),
        }
    }
}

/// Render a path as a command-line argument.
pub fn path_arg(path: impl AsRef<Path>) -> String {
    path.as_ref().display().to_string()
}

/// Join paths into a `;`-separated CMake list.
pub fn cmake_list<I, P>(paths: I) -> String
where
    I: IntoIterator<Item = P>,
    P: AsRef<OsStr>,
{
    paths
        .into_iter()
        .map(|p| Path::new(p.as_ref()).display().to_string())
        .collect::<Vec<_>>()
        .join(";")
}

/// `ON`/`OFF` spelling of a CMake boolean.
pub fn cmake_bool(value: bool) -> &'static str {
    if value {
        "ON"
    } else {
        "OFF"
    }
}
