//! Audit configuration

use std::collections::BTreeSet;

/// Directory names never descended into
pub const DEFAULT_IGNORED_DIRS: &[&str] = &[".git", ".svn", ".hg", ".bzr", "CVS", "_darcs", "RCS"];

/// File extensions treated as source or documentation
pub const DEFAULT_EXTENSIONS: &[&str] = &["pl", "pm", "t", "pod", "PL", "psgi", "cgi"];

/// Interpreter names recognized on a `#!` first line
pub const DEFAULT_INTERPRETER_MARKERS: &[&str] = &["perl"];

/// Environment variable that enables release-only checking
pub const RELEASE_ENV: &str = "RELEASE_TESTING";

/// Immutable configuration, built once and passed by reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditConfig {
    pub ignored_dirs: BTreeSet<String>,
    pub extensions: BTreeSet<String>,
    pub interpreter_markers: Vec<String>,
    /// Skip the whole run unless [`RELEASE_ENV`] is set
    pub require_release_env: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            ignored_dirs: DEFAULT_IGNORED_DIRS.iter().map(|s| s.to_string()).collect(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            interpreter_markers: DEFAULT_INTERPRETER_MARKERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            require_release_env: false,
        }
    }
}

impl AuditConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add directory names to skip
    pub fn with_ignored_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    /// Replace the recognized extensions (a leading `.` is dropped)
    pub fn with_extensions<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = exts
            .into_iter()
            .map(|e| {
                let e: String = e.into();
                e.trim_start_matches('.').to_string()
            })
            .collect();
        self
    }

    pub fn with_release_gate(mut self, enabled: bool) -> Self {
        self.require_release_env = enabled;
        self
    }

    pub fn is_ignored_dir(&self, name: &str) -> bool {
        self.ignored_dirs.contains(name)
    }

    pub fn has_extension(&self, ext: &str) -> bool {
        self.extensions.contains(ext)
    }

    /// Reason to skip the run, if the release gate is closed.
    ///
    /// `env` looks up a variable; pass `|k| std::env::var(k).ok()` in
    /// production.
    pub fn skip_reason(&self, env: impl Fn(&str) -> Option<String>) -> Option<String> {
        if !self.require_release_env {
            return None;
        }
        match env(RELEASE_ENV) {
            Some(value) if !value.is_empty() && value != "0" => None,
            _ => Some(format!("these tests are for release testing; set {}=1", RELEASE_ENV)),
        }
    }
}
