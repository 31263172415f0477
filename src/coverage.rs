//! # Coverage Post-Processing
//!
//! After a coverage build, `lcov` captures the counters of the whole library
//! directory. Upload services compute coverage for every file they are
//! given, which would count tests and examples, so the capture is reduced to
//! the library's public headers before it is uploaded.
//!
//! The upload target also expects paths relative to the repository root, so
//! every `SF:` entry is rewritten relative to the staged library directory.
//! Filtering and rewriting happen in-process on the lcov tracefile format:
//!
//! ```text
//! TN:
//! SF:/home/ci/boost-root/libs/mysql/include/boost/mysql/connection.hpp
//! DA:12,3
//! end_of_record
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use log::{info, warn};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::process::{CommandSpec, ProcessRunner};

/// Name of the tracefile written inside the library directory.
pub const TRACEFILE: &str = "coverage.info";

const SOURCE_PREFIX: &str = "SF:";
const END_OF_RECORD: &str = "end_of_record";

/// Per-file section of a tracefile.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    lines: Vec<String>,
}

impl Record {
    /// Path from the record's `SF:` line.
    pub fn source_file(&self) -> Option<&str> {
        self.lines
            .iter()
            .find_map(|line| line.strip_prefix(SOURCE_PREFIX))
    }

    fn set_source_file(&mut self, path: &str) {
        for line in &mut self.lines {
            if line.starts_with(SOURCE_PREFIX) {
                *line = format!("{}{}", SOURCE_PREFIX, path);
            }
        }
    }
}

/// An lcov tracefile.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tracefile {
    records: Vec<Record>,
}

impl Tracefile {
    pub fn parse(text: &str) -> Self {
        let mut records = Vec::new();
        let mut current = Record::default();

        for line in text.lines() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            if line == END_OF_RECORD {
                records.push(std::mem::take(&mut current));
            } else {
                current.lines.push(line.to_string());
            }
        }
        if !current.lines.is_empty() {
            warn!("tracefile ends without end_of_record; keeping trailing lines");
            records.push(current);
        }

        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Source files of all records, in order.
    pub fn source_files(&self) -> Vec<&str> {
        self.records.iter().filter_map(Record::source_file).collect()
    }

    /// Keep only the public headers of `library`, with paths made relative
    /// to `library_dir`.
    ///
    /// Records outside `library_dir` and records without a source file are
    /// dropped.
    pub fn into_public_headers(self, library_dir: &Path, library: &str) -> Result<Self> {
        let headers = Pattern::new(&format!("include/boost/{}/**", library))?;
        let root = library_dir.display().to_string();

        let records = self
            .records
            .into_iter()
            .filter_map(|mut record| {
                let relative = relativize(record.source_file()?, &root)?;
                if !headers.matches(&relative) {
                    return None;
                }
                record.set_source_file(&relative);
                Some(record)
            })
            .collect();

        Ok(Self { records })
    }
}

impl fmt::Display for Tracefile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.records {
            for line in &record.lines {
                writeln!(f, "{}", line)?;
            }
            writeln!(f, "{}", END_OF_RECORD)?;
        }
        Ok(())
    }
}

/// Path of `path` below `root`, with `/` separators and no leading
/// separator. `None` when `path` is not below `root`.
pub fn relativize(path: &str, root: &str) -> Option<String> {
    let root = root.trim_end_matches(['/', '\\']);
    let rest = path.strip_prefix(root)?;
    if !rest.starts_with(['/', '\\']) {
        return None;
    }
    let relative = rest.trim_start_matches(['/', '\\']).replace('\\', "/");
    if relative.is_empty() {
        None
    } else {
        Some(relative)
    }
}

/// The upload-ready result of coverage post-processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    pub tracefile: PathBuf,
    /// Retained source files, relative to the library root.
    pub files: Vec<String>,
}

/// Captures, filters and uploads coverage data of a staged library.
pub struct CoveragePostProcessor<'a> {
    runner: &'a dyn ProcessRunner,
    library_dir: PathBuf,
    library: String,
}

impl<'a> CoveragePostProcessor<'a> {
    pub fn new(
        runner: &'a dyn ProcessRunner,
        library_dir: impl Into<PathBuf>,
        library: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            library_dir: library_dir.into(),
            library: library.into(),
        }
    }

    pub fn tracefile(&self) -> PathBuf {
        self.library_dir.join(TRACEFILE)
    }

    /// `lcov` capture limited to the library directory.
    pub fn capture_command(&self) -> CommandSpec {
        CommandSpec::new("lcov")
            .current_dir(&self.library_dir)
            .args([
                "--capture",
                "--no-external",
                "--directory",
                ".",
                "-o",
                TRACEFILE,
            ])
    }

    pub fn upload_command(&self) -> CommandSpec {
        CommandSpec::new("codecov")
            .current_dir(&self.library_dir)
            .args(["-Z", "-f", TRACEFILE])
    }

    /// Capture, filter, rewrite and upload. Every failure is a coverage
    /// error.
    pub fn extract(&self) -> Result<CoverageReport> {
        self.runner
            .run(&self.capture_command())
            .map_err(|e| coverage_error("capture", e))?;

        let path = self.tracefile();
        let text = fs::read_to_string(&path).map_err(|e| Error::Coverage {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        let captured = Tracefile::parse(&text);
        let captured_count = captured.records().len();

        let filtered = captured
            .into_public_headers(&self.library_dir, &self.library)
            .map_err(|e| coverage_error("filter", e))?;
        fs::write(&path, filtered.to_string()).map_err(|e| Error::Coverage {
            message: format!("cannot write {}: {}", path.display(), e),
        })?;
        info!(
            "Kept {} of {} coverage records (public headers of {})",
            filtered.records().len(),
            captured_count,
            self.library
        );

        self.runner
            .run(&self.upload_command())
            .map_err(|e| coverage_error("upload", e))?;

        Ok(CoverageReport {
            tracefile: path,
            files: filtered
                .source_files()
                .into_iter()
                .map(str::to_string)
                .collect(),
        })
    }
}

fn coverage_error(step: &str, source: Error) -> Error {
    Error::Coverage {
        message: format!("{} failed: {}", step, source),
    }
}
