//! Check data structures

use std::fmt;
use std::path::PathBuf;

/// Byte-level classification of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Every byte is 0x7F or below (includes the empty buffer)
    StrictAscii,
    /// At least one multi-byte sequence, and the whole buffer is valid UTF-8
    ValidUtf8,
    /// Not valid UTF-8; `offset` is where the first invalid sequence starts
    InvalidUtf8 { offset: usize },
}

impl Classification {
    /// Offset of the first invalid sequence; only set for `InvalidUtf8`
    pub fn offending_offset(&self) -> Option<usize> {
        match self {
            Classification::InvalidUtf8 { offset } => Some(*offset),
            _ => None,
        }
    }
}

/// Declared encoding mode.
///
/// Two-state machine: starts in `Latin1`, moved only by recognized
/// declaration lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Latin1,
    Utf8,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Latin1 => write!(f, "latin1"),
            Mode::Utf8 => write!(f, "utf8"),
        }
    }
}

/// Which declaration stream a line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// Executable source, declared with `use utf8` / `no utf8`
    Code,
    /// Documentation blocks, declared with `=encoding`
    Doc,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Code => write!(f, "code"),
            Region::Doc => write!(f, "documentation"),
        }
    }
}

/// Why a file failed the check
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailReason {
    /// UTF-8 byte order mark at offset 0
    #[error("UTF-8 byte order mark at start of file")]
    BomPresent,

    /// UTF-8 declared, but the bytes are not valid UTF-8
    #[error("invalid UTF-8 in {region} declared as utf8 (line {line})")]
    InvalidUtf8InUtf8Mode { region: Region, line: usize },

    /// Multi-byte UTF-8 content with no declaration switching to UTF-8
    #[error("UTF-8 {region} content without an encoding declaration (line {line})")]
    UndeclaredUtf8 { region: Region, line: usize },

    /// File could not be read
    #[error("cannot read file: {0}")]
    Io(String),
}

impl FailReason {
    /// Stable machine-readable code for this reason
    pub fn code(&self) -> &'static str {
        match self {
            FailReason::BomPresent => "BOM_PRESENT",
            FailReason::InvalidUtf8InUtf8Mode { .. } => "INVALID_UTF8_IN_UTF8_MODE",
            FailReason::UndeclaredUtf8 { .. } => "UNDECLARED_UTF8",
            FailReason::Io(_) => "IO_ERROR",
        }
    }

    /// Line the failure points at, if it has one
    pub fn line(&self) -> Option<usize> {
        match self {
            FailReason::InvalidUtf8InUtf8Mode { line, .. }
            | FailReason::UndeclaredUtf8 { line, .. } => Some(*line),
            FailReason::BomPresent | FailReason::Io(_) => None,
        }
    }
}

/// Result of checking one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(FailReason),
}

impl Verdict {
    pub fn passed(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    /// Failure reason; `None` when passed
    pub fn reason(&self) -> Option<&FailReason> {
        match self {
            Verdict::Pass => None,
            Verdict::Fail(reason) => Some(reason),
        }
    }
}

/// One file's verdict, ready for the reporter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    /// Optional human label shown before the path
    pub label: Option<String>,
    pub verdict: Verdict,
}

impl FileReport {
    pub fn new(path: impl Into<PathBuf>, verdict: Verdict) -> Self {
        Self {
            path: path.into(),
            label: None,
            verdict,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Assertion name: `label: path` or just `path`
    pub fn name(&self) -> String {
        match &self.label {
            Some(label) => format!("{}: {}", label, self.path.display()),
            None => self.path.display().to_string(),
        }
    }
}
