//! Locating source and documentation files

use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::config::AuditConfig;

/// Longest first line looked at when sniffing
const SNIFF_LIMIT: usize = 256;

/// Find files to check under `roots`.
///
/// Directories are walked recursively, skipping ignored directory names.
/// A file is picked if its extension is recognized, or its first line is a
/// `#!` line naming a known interpreter, or a batch wrapper line. Roots that
/// name a file directly are always included. Results are sorted.
pub fn discover_files(roots: &[PathBuf], config: &AuditConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for root in roots {
        let meta = fs::metadata(root)
            .with_context(|| format!("Failed to stat: {}", root.display()))?;

        if meta.is_file() {
            files.push(root.clone());
            continue;
        }

        let walker = WalkDir::new(root).follow_links(false).into_iter().filter_entry(|e| {
            e.depth() == 0
                || !e.file_type().is_dir()
                || !e.file_name().to_str().is_some_and(|name| config.is_ignored_dir(name))
        });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            if is_source_file(entry.path(), config) {
                files.push(entry.into_path());
            } else {
                tracing::trace!(path = %entry.path().display(), "not a source file");
            }
        }
    }

    files.sort();
    files.dedup();
    tracing::debug!(count = files.len(), "discovered files");
    Ok(files)
}

/// Extension match, or a recognizable first line
pub fn is_source_file(path: &Path, config: &AuditConfig) -> bool {
    let by_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| config.has_extension(ext));
    if by_ext {
        return true;
    }

    match read_first_line(path) {
        Ok(line) => is_script_line(&line, config),
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "cannot sniff first line");
            false
        }
    }
}

/// First line of a file, at most [`SNIFF_LIMIT`] bytes
fn read_first_line(path: &Path) -> std::io::Result<Vec<u8>> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file).take(SNIFF_LIMIT as u64);
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line)?;
    Ok(line)
}

/// `#!` line naming an interpreter, or a batch wrapper first line
pub fn is_script_line(line: &[u8], config: &AuditConfig) -> bool {
    // A BOM in front of the shebang is exactly what should be reported
    let line = line.strip_prefix(&crate::classifier::UTF8_BOM).unwrap_or(line);
    let text = String::from_utf8_lossy(line);

    if let Some(rest) = text.strip_prefix("#!") {
        return config
            .interpreter_markers
            .iter()
            .any(|marker| rest.contains(marker.as_str()));
    }

    is_batch_wrapper(&text)
}

/// `@rem = '--*-Perl-*--` style first line of a batch-file wrapper
fn is_batch_wrapper(text: &str) -> bool {
    let lower = text.trim_start().to_ascii_lowercase();
    lower.starts_with("@rem") && lower.contains("perl")
}
