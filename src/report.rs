//! TAP output for check results

use std::io::Write;

use anyhow::Result;

use crate::audit::AuditSummary;
use crate::verdict::FileReport;

/// Writes TAP: plan line, one assertion per file, diagnostics, summary
pub struct TapReporter<W: Write> {
    writer: W,
    next: usize,
}

impl<W: Write> TapReporter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, next: 1 }
    }

    /// Declare the number of assertions up front
    pub fn plan(&mut self, count: usize) -> Result<()> {
        writeln!(self.writer, "1..{}", count)?;
        Ok(())
    }

    /// Skip the whole run
    pub fn skip_all(&mut self, reason: &str) -> Result<()> {
        writeln!(self.writer, "1..0 # SKIP {}", reason)?;
        Ok(())
    }

    /// Emit one assertion
    pub fn report(&mut self, report: &FileReport) -> Result<()> {
        let status = if report.verdict.passed() { "ok" } else { "not ok" };
        let name = escape_name(&report.name());
        writeln!(self.writer, "{} {} - {}", status, self.next, name)?;
        if let Some(reason) = report.verdict.reason() {
            writeln!(self.writer, "#   {}: {}", reason.code(), reason)?;
        }
        self.next += 1;
        Ok(())
    }

    pub fn summary(&mut self, summary: &AuditSummary) -> Result<()> {
        writeln!(self.writer, "# checked {}, passed {}", summary.checked, summary.passed)?;
        Ok(())
    }

    /// Plan, every assertion, then the summary
    pub fn report_all(&mut self, reports: &[FileReport]) -> Result<AuditSummary> {
        self.plan(reports.len())?;
        for report in reports {
            self.report(report)?;
        }
        let summary = AuditSummary::from_reports(reports);
        self.summary(&summary)?;
        self.writer.flush()?;
        Ok(summary)
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// `#` in a test name would start a TAP directive
fn escape_name(name: &str) -> String {
    name.replace('#', "\\#")
}

/// Render reports to a TAP string
pub fn to_tap(reports: &[FileReport]) -> Result<String> {
    let mut reporter = TapReporter::new(Vec::new());
    reporter.report_all(reports)?;
    Ok(String::from_utf8(reporter.into_inner())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::{FailReason, Region, Verdict};

    #[test]
    fn test_tap_output() {
        let reports = vec![
            FileReport::new("lib/Foo.pm", Verdict::Pass).with_label("encoding"),
            FileReport::new(
                "bin/tool",
                Verdict::Fail(FailReason::UndeclaredUtf8 { region: Region::Code, line: 3 }),
            ),
        ];
        let tap = to_tap(&reports).unwrap();
        assert_eq!(
            tap,
            "1..2\n\
             ok 1 - encoding: lib/Foo.pm\n\
             not ok 2 - bin/tool\n\
             #   UNDECLARED_UTF8: UTF-8 code content without an encoding declaration (line 3)\n\
             # checked 2, passed 1\n"
        );
    }

    #[test]
    fn test_hash_in_name_is_escaped() {
        let reports = vec![FileReport::new("t/#draft# SKIP.t", Verdict::Pass)];
        let tap = to_tap(&reports).unwrap();
        assert_eq!(tap.lines().nth(1), Some("ok 1 - t/\\#draft\\# SKIP.t"));
    }

    #[test]
    fn test_empty_run() {
        assert_eq!(to_tap(&[]).unwrap(), "1..0\n# checked 0, passed 0\n");
    }

    #[test]
    fn test_skip_all() {
        let mut reporter = TapReporter::new(Vec::new());
        reporter.skip_all("release only").unwrap();
        assert_eq!(reporter.into_inner(), b"1..0 # SKIP release only\n");
    }
}
