//! Consistency checking: detected encoding vs. declared mode
//!
//! ## Decision table
//!
//! Evaluated in order, first match wins:
//!
//! 1. BOM at offset 0 → `BOM_PRESENT`
//! 2. invalid UTF-8 while declared `utf8` → `INVALID_UTF8_IN_UTF8_MODE`
//! 3. valid multi-byte UTF-8 while declared `latin1` → `UNDECLARED_UTF8`
//! 4. invalid UTF-8 while declared `latin1` → pass (8-bit bytes are fine)
//! 5. anything else → pass
//!
//! A file is checked per declaration stream (code and documentation) and,
//! inside a stream, per run of lines sharing one effective mode.

use std::fs;
use std::path::{Path, PathBuf};

use crate::classifier::{has_utf8_bom, Classifier};
use crate::declaration::{scan, Line, SourceLayout};
use crate::verdict::{Classification, FailReason, Mode, Region, Verdict};

/// Why a file could not be loaded
#[derive(Debug, thiserror::Error)]
#[error("{}: {source}", .path.display())]
pub struct ReadError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Read a whole file; the handle is closed before returning
pub fn read_source(path: &Path) -> Result<Vec<u8>, ReadError> {
    fs::read(path).map_err(|source| ReadError {
        path: path.to_path_buf(),
        source,
    })
}

/// Outcome of the decision table for a single run of bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consistency {
    Pass,
    BomPresent,
    InvalidUtf8InUtf8Mode,
    UndeclaredUtf8,
}

/// Reconcile classification, BOM status and declared mode
pub fn check_consistency(classification: &Classification, bom: bool, mode: Mode) -> Consistency {
    if bom {
        return Consistency::BomPresent;
    }

    match (classification, mode) {
        (Classification::InvalidUtf8 { .. }, Mode::Utf8) => Consistency::InvalidUtf8InUtf8Mode,
        (Classification::ValidUtf8, Mode::Latin1) => Consistency::UndeclaredUtf8,
        (Classification::InvalidUtf8 { .. }, Mode::Latin1) => Consistency::Pass,
        _ => Consistency::Pass,
    }
}

/// Consecutive lines of one stream under the same effective mode
struct Run {
    mode: Mode,
    bytes: Vec<u8>,
    /// (offset into `bytes`, line number) for each line
    starts: Vec<(usize, usize)>,
}

impl Run {
    fn new(mode: Mode) -> Self {
        Self {
            mode,
            bytes: Vec::new(),
            starts: Vec::new(),
        }
    }

    fn push(&mut self, line: &Line<'_>) {
        self.starts.push((self.bytes.len(), line.number));
        self.bytes.extend_from_slice(line.bytes);
    }

    /// File line number holding byte `offset` of this run
    fn line_of(&self, offset: usize) -> usize {
        let idx = self.starts.partition_point(|&(start, _)| start <= offset);
        self.starts[idx.saturating_sub(1)].1
    }

    fn first_non_ascii_line(&self) -> usize {
        let offset = self
            .bytes
            .iter()
            .position(|b| !b.is_ascii())
            .unwrap_or(0);
        self.line_of(offset)
    }
}

fn runs(lines: &[Line<'_>], mode_at: impl Fn(usize) -> Mode) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for line in lines {
        let mode = mode_at(line.number);
        match runs.last_mut() {
            Some(run) if run.mode == mode => run.push(line),
            _ => {
                let mut run = Run::new(mode);
                run.push(line);
                runs.push(run);
            }
        }
    }
    runs
}

/// Checks files for encoding consistency
#[derive(Debug, Clone, Copy, Default)]
pub struct Checker {
    classifier: Classifier,
}

impl Checker {
    pub fn new(classifier: Classifier) -> Self {
        Self { classifier }
    }

    /// Check a file on disk; read errors become a failing verdict
    pub fn file_encoding_ok(&self, path: &Path) -> Verdict {
        match read_source(path) {
            Ok(data) => self.check_bytes(&data),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err.source, "read failed");
                Verdict::Fail(FailReason::Io(err.to_string()))
            }
        }
    }

    /// Check a file's full contents
    pub fn check_bytes(&self, data: &[u8]) -> Verdict {
        let bom = has_utf8_bom(data);
        let layout = SourceLayout::parse(data);

        // Line 1 always lands in the code stream, so the BOM is seen there
        let code = self.check_region(&layout, Region::Code, bom);
        let doc = self.check_region(&layout, Region::Doc, false);

        // Earliest failure in the file wins, code first on a tie; a BOM has
        // no line and sorts before everything
        let failure = match (code, doc) {
            (Some(c), Some(d)) => {
                if d.line() < c.line() {
                    Some(d)
                } else {
                    Some(c)
                }
            }
            (c, d) => c.or(d),
        };

        match failure {
            Some(reason) => Verdict::Fail(reason),
            None => Verdict::Pass,
        }
    }

    /// First failure of one declaration stream
    fn check_region(
        &self,
        layout: &SourceLayout<'_>,
        region: Region,
        bom: bool,
    ) -> Option<FailReason> {
        let lines = layout.lines(region);
        let declarations = scan(region, lines);

        for run in runs(lines, |line| declarations.mode_at(line)) {
            let classification = self.classifier.classify(&run.bytes);
            let reason = match check_consistency(&classification, bom, run.mode) {
                Consistency::Pass => continue,
                Consistency::BomPresent => FailReason::BomPresent,
                Consistency::InvalidUtf8InUtf8Mode => FailReason::InvalidUtf8InUtf8Mode {
                    region,
                    line: run.line_of(classification.offending_offset().unwrap_or(0)),
                },
                Consistency::UndeclaredUtf8 => FailReason::UndeclaredUtf8 {
                    region,
                    line: run.first_non_ascii_line(),
                },
            };
            return Some(reason);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::reference_validator;

    fn checker() -> Checker {
        Checker::new(Classifier::with_validator(reference_validator()))
    }

    fn code(verdict: &Verdict) -> Option<&'static str> {
        verdict.reason().map(|r| r.code())
    }

    #[test]
    fn test_decision_table() {
        let invalid = Classification::InvalidUtf8 { offset: 0 };
        let table = [
            (Classification::StrictAscii, true, Mode::Latin1, Consistency::BomPresent),
            (Classification::ValidUtf8, true, Mode::Utf8, Consistency::BomPresent),
            (invalid, false, Mode::Utf8, Consistency::InvalidUtf8InUtf8Mode),
            (Classification::ValidUtf8, false, Mode::Latin1, Consistency::UndeclaredUtf8),
            (invalid, false, Mode::Latin1, Consistency::Pass),
            (Classification::ValidUtf8, false, Mode::Utf8, Consistency::Pass),
            (Classification::StrictAscii, false, Mode::Utf8, Consistency::Pass),
            (Classification::StrictAscii, false, Mode::Latin1, Consistency::Pass),
        ];
        for (classification, bom, mode, expected) in table {
            assert_eq!(
                check_consistency(&classification, bom, mode),
                expected,
                "{:?} bom={} mode={:?}",
                classification,
                bom,
                mode
            );
        }
    }

    #[test]
    fn test_bom_always_fails() {
        let v = checker().check_bytes(b"\xEF\xBB\xBF#!/usr/bin/perl\nuse utf8;\n");
        assert_eq!(v, Verdict::Fail(FailReason::BomPresent));
        let v = checker().check_bytes(b"\xEF\xBB\xBF");
        assert_eq!(code(&v), Some("BOM_PRESENT"));
    }

    #[test]
    fn test_bom_takes_precedence_over_content() {
        let src = b"\xEF\xBB\xBFuse utf8;\nmy $s = \"\xFF\";\n\n=pod\n\nJos\xC3\xA9\n\n=cut\n";
        assert_eq!(checker().check_bytes(src), Verdict::Fail(FailReason::BomPresent));

        let src = b"\xEF\xBB\xBF# comment\n=head1 NAME\n\nJos\xC3\xA9\n";
        assert_eq!(checker().check_bytes(src), Verdict::Fail(FailReason::BomPresent));
    }

    #[test]
    fn test_qw_encoding_declaration() {
        let src = b"use encoding qw(utf8);\nmy $s = \"caf\xC3\xA9\";\n";
        assert!(checker().check_bytes(src).passed());

        let src = b"use encoding qw(latin1);\nmy $s = \"caf\xC3\xA9\";\n";
        assert_eq!(
            checker().check_bytes(src),
            Verdict::Fail(FailReason::UndeclaredUtf8 { region: Region::Code, line: 1 })
        );
    }

    #[test]
    fn test_ascii_passes_in_any_mode() {
        assert!(checker().check_bytes(b"print 1;\n").passed());
        assert!(checker().check_bytes(b"use utf8;\nprint 1;\n").passed());
        assert!(checker().check_bytes(b"no utf8;\nprint 1;\n").passed());
        assert!(checker().check_bytes(b"").passed());
    }

    #[test]
    fn test_undeclared_utf8() {
        let v = checker().check_bytes(b"my $s = \"caf\xC3\xA9\";\n");
        assert_eq!(
            v,
            Verdict::Fail(FailReason::UndeclaredUtf8 { region: Region::Code, line: 1 })
        );

        let v = checker().check_bytes(b"use utf8;\nmy $s = \"caf\xC3\xA9\";\n");
        assert!(v.passed());
    }

    #[test]
    fn test_latin1_byte() {
        assert!(checker().check_bytes(b"my $s = \"\xFF\";\n").passed());

        let v = checker().check_bytes(b"use utf8;\nmy $s = \"\xFF\";\n");
        assert_eq!(
            v,
            Verdict::Fail(FailReason::InvalidUtf8InUtf8Mode { region: Region::Code, line: 2 })
        );
    }

    #[test]
    fn test_utf8_before_declaration_is_undeclared() {
        let v = checker().check_bytes(b"my $s = \"\xC3\xA9\";\nuse utf8;\nmy $t = \"\xC3\xA9\";\n");
        assert_eq!(
            v,
            Verdict::Fail(FailReason::UndeclaredUtf8 { region: Region::Code, line: 1 })
        );
    }

    #[test]
    fn test_no_utf8_switches_back() {
        let src = b"use utf8;\nmy $a = \"\xC3\xA9\";\nno utf8;\nmy $b = \"\xE9\";\n";
        assert!(checker().check_bytes(src).passed());

        let src = b"use utf8;\nmy $a = \"\xC3\xA9\";\nno utf8;\nmy $b = \"\xC3\xA9\";\n";
        assert_eq!(
            checker().check_bytes(src),
            Verdict::Fail(FailReason::UndeclaredUtf8 { region: Region::Code, line: 4 })
        );
    }

    #[test]
    fn test_author_comment_is_stripped() {
        let src = b"# Copyright J\xF6rg M\xFCller\nuse utf8;\nmy $s = \"\xC3\xA9\";\n";
        assert!(checker().check_bytes(src).passed());
    }

    #[test]
    fn test_trailing_comment_is_classified() {
        let src = b"use utf8;\nmy $x = 1; # J\xF6rg\n";
        assert_eq!(
            checker().check_bytes(src),
            Verdict::Fail(FailReason::InvalidUtf8InUtf8Mode { region: Region::Code, line: 2 })
        );
    }

    #[test]
    fn test_doc_checked_independently() {
        // Code declared, doc not
        let src = b"use utf8;\nmy $s = \"\xC3\xA9\";\n\n=head1 AUTHOR\n\nJos\xC3\xA9\n\n=cut\n";
        assert_eq!(
            checker().check_bytes(src),
            Verdict::Fail(FailReason::UndeclaredUtf8 { region: Region::Doc, line: 6 })
        );

        let src = b"use utf8;\n\n=encoding utf8\n\n=head1 AUTHOR\n\nJos\xC3\xA9\n\n=cut\n";
        assert!(checker().check_bytes(src).passed());
    }

    #[test]
    fn test_doc_latin1_does_not_downgrade_code() {
        let src = b"use utf8;\n\n=encoding latin1\n\nJ\xF6rg\n\n=cut\n\nmy $s = \"\xC3\xA9\";\n";
        assert!(checker().check_bytes(src).passed());
    }

    #[test]
    fn test_doc_declared_utf8_with_invalid_bytes() {
        let src = b"=encoding utf8\n\nJ\xF6rg\n\n=cut\n";
        assert_eq!(
            checker().check_bytes(src),
            Verdict::Fail(FailReason::InvalidUtf8InUtf8Mode { region: Region::Doc, line: 3 })
        );
    }

    #[test]
    fn test_earliest_failure_wins() {
        // Doc failure on line 3 comes before code failure on line 7
        let src = b"=pod\n\nJos\xC3\xA9\n\n=cut\n\nmy $s = \"\xC3\xA9\";\n";
        assert_eq!(
            checker().check_bytes(src),
            Verdict::Fail(FailReason::UndeclaredUtf8 { region: Region::Doc, line: 3 })
        );
    }

    #[test]
    fn test_check_is_idempotent() {
        let src = b"use utf8;\nmy $s = \"\xFF\";\n";
        let c = checker();
        assert_eq!(c.check_bytes(src), c.check_bytes(src));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let v = checker().file_encoding_ok(&dir.path().join("missing.pl"));
        assert_eq!(code(&v), Some("IO_ERROR"));
    }

    #[test]
    fn test_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Foo.pm");
        fs::write(&path, b"package Foo;\nuse utf8;\nour $NAME = \"\xC3\xA9\";\n1;\n").unwrap();
        assert!(checker().file_encoding_ok(&path).passed());
    }
}
