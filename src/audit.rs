//! Running the checker over a set of files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::checker::Checker;
use crate::verdict::FileReport;

/// Totals of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditSummary {
    pub checked: usize,
    pub passed: usize,
}

impl AuditSummary {
    pub fn from_reports(reports: &[FileReport]) -> Self {
        Self {
            checked: reports.len(),
            passed: reports.iter().filter(|r| r.verdict.passed()).count(),
        }
    }

    pub fn failed(&self) -> usize {
        self.checked - self.passed
    }

    pub fn all_passed(&self) -> bool {
        self.passed == self.checked
    }
}

/// Checks many files, sequentially or on a worker pool
#[derive(Debug, Clone, Default)]
pub struct Auditor {
    checker: Checker,
    label: Option<String>,
}

impl Auditor {
    pub fn new(checker: Checker) -> Self {
        Self {
            checker,
            label: None,
        }
    }

    /// Label attached to every report
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    fn report(&self, path: &Path) -> FileReport {
        let verdict = self.checker.file_encoding_ok(path);
        tracing::debug!(path = %path.display(), passed = verdict.passed(), "checked");
        let report = FileReport::new(path, verdict);
        match &self.label {
            Some(label) => report.with_label(label.clone()),
            None => report,
        }
    }

    /// Check every file; reports come back in input order.
    ///
    /// `jobs <= 1` runs on the calling thread, otherwise on a rayon pool of
    /// that many threads. Both produce the same reports.
    pub fn run(&self, files: &[PathBuf], jobs: usize) -> Result<Vec<FileReport>> {
        if jobs <= 1 {
            return Ok(files.iter().map(|path| self.report(path)).collect());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .context("Failed to build worker pool")?;

        Ok(pool.install(|| files.par_iter().map(|path| self.report(path)).collect()))
    }
}
