//! Machine-readable summary of a pipeline run.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::backends::StageReport;
use crate::config::BackendKind;
use crate::coverage::CoverageReport;
use crate::error::{Error, Result};

/// What happened to the coverage data of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CoverageOutcome {
    Uploaded(CoverageReport),
    /// Post-processing failed after the build itself had passed.
    Failed { message: String },
}

/// Outcome of a run that got past staging.
///
/// A failing stage ends the stage list with a `failed` entry; configuration
/// and staging failures abort the run with an error instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub backend: BackendKind,
    pub workspace: PathBuf,
    /// The workspace was created by this run.
    pub fresh: bool,
    pub stages: Vec<StageReport>,
    /// `None` when coverage was not requested, could not be collected or a
    /// stage failed.
    pub coverage: Option<CoverageOutcome>,
}

impl RunReport {
    /// Message of a coverage failure, if one happened.
    pub fn coverage_error(&self) -> Option<&str> {
        match &self.coverage {
            Some(CoverageOutcome::Failed { message }) => Some(message),
            _ => None,
        }
    }

    /// The stage failure that aborted the run, if any.
    pub fn stage_error(&self) -> Option<Error> {
        self.stages
            .iter()
            .find_map(|stage| stage.failure().map(|m| Error::stage(&stage.name, m)))
    }

    /// Whether every part of the run succeeded, coverage included.
    pub fn succeeded(&self) -> bool {
        self.stage_error().is_none() && self.coverage_error().is_none()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as pretty-printed JSON, creating parent directories.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()? + "\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::StageOutcome;
    use tempfile::TempDir;

    fn report(coverage: Option<CoverageOutcome>) -> RunReport {
        RunReport {
            backend: BackendKind::Cmake,
            workspace: PathBuf::from("/home/ci/boost-root"),
            fresh: true,
            stages: vec![
                StageReport {
                    name: "b2-distro".to_string(),
                    outcome: StageOutcome::Passed,
                },
                StageReport {
                    name: "find-package-tests".to_string(),
                    outcome: StageOutcome::Skipped {
                        reason: "coverage enabled".to_string(),
                    },
                },
            ],
            coverage,
        }
    }

    #[test]
    fn test_json_shape() {
        let report = report(Some(CoverageOutcome::Uploaded(CoverageReport {
            tracefile: PathBuf::from("/home/ci/boost-root/libs/mysql/coverage.info"),
            files: vec!["include/boost/mysql/connection.hpp".to_string()],
        })));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(json["backend"], "cmake");
        assert_eq!(json["fresh"], true);
        assert_eq!(json["stages"][0]["status"], "passed");
        assert_eq!(json["stages"][1]["reason"], "coverage enabled");
        assert_eq!(json["coverage"]["status"], "uploaded");
        assert_eq!(
            json["coverage"]["files"][0],
            "include/boost/mysql/connection.hpp"
        );
        assert!(report.succeeded());
    }

    #[test]
    fn test_coverage_failure_keeps_stage_results() {
        let report = report(Some(CoverageOutcome::Failed {
            message: "upload failed".to_string(),
        }));
        assert_eq!(report.coverage_error(), Some("upload failed"));
        assert!(!report.succeeded());
        assert!(report.stages[0].passed());
    }

    #[test]
    fn test_failed_stage_is_reported() {
        let mut report = report(None);
        report.stages[1] = StageReport {
            name: "superproject-tests".to_string(),
            outcome: StageOutcome::Failed {
                message: "Command failed with exit code 8: ctest".to_string(),
            },
        };

        let err = report.stage_error().unwrap();
        assert!(matches!(err, Error::Stage { ref stage, .. } if stage == "superproject-tests"));
        assert!(err.to_string().contains("exit code 8"));
        assert!(!report.succeeded());

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["stages"][0]["status"], "passed");
        assert_eq!(json["stages"][1]["status"], "failed");
    }

    #[test]
    fn test_write_json_creates_parent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out/report.json");

        report(None).write_json(&path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"coverage\": null"));
        assert!(written.ends_with("}\n"));
    }
}
