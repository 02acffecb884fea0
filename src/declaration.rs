//! Source layout and encoding declaration scanning
//!
//! A file is cut into lines (on raw bytes, the content may not be UTF-8)
//! and each line is assigned to one of two streams:
//!
//! - **code**: executable source, minus whole-line `#` comments. Mode is
//!   switched by `use utf8` / `no utf8` (and `use encoding '...'`).
//! - **doc**: documentation blocks from a `=word` line through `=cut`.
//!   Mode is switched by `=encoding NAME`.
//!
//! The two streams keep separate declaration state: a documentation
//! `=encoding latin1` never downgrades a `use utf8` in the code.

use crate::verdict::{Mode, Region};

/// One line of a file, terminator included
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// 1-based line number in the file
    pub number: usize,
    pub bytes: &'a [u8],
}

/// Lines of a file split into code and documentation streams
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLayout<'a> {
    /// Code lines with whole-line comments removed
    pub code: Vec<Line<'a>>,
    pub doc: Vec<Line<'a>>,
}

impl<'a> SourceLayout<'a> {
    /// Split `data` into code and doc streams
    pub fn parse(data: &'a [u8]) -> Self {
        let mut layout = SourceLayout::default();
        let mut in_doc = false;

        for (idx, bytes) in split_lines(data).enumerate() {
            let line = Line { number: idx + 1, bytes };

            if in_doc {
                layout.doc.push(line);
                if bytes.starts_with(b"=cut") && !is_ident_byte(bytes.get(4).copied()) {
                    in_doc = false;
                }
                continue;
            }

            if starts_doc_block(bytes) {
                in_doc = !bytes.starts_with(b"=cut");
                layout.doc.push(line);
            } else if !is_comment_line(bytes) {
                layout.code.push(line);
            }
        }

        layout
    }

    pub fn lines(&self, region: Region) -> &[Line<'a>] {
        match region {
            Region::Code => &self.code,
            Region::Doc => &self.doc,
        }
    }
}

/// Split on `\n`, keeping the terminator with its line
fn split_lines(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    data.split_inclusive(|&b| b == b'\n')
}

/// `=` followed by a letter at column 0 opens a documentation block
fn starts_doc_block(line: &[u8]) -> bool {
    line.len() >= 2 && line[0] == b'=' && line[1].is_ascii_alphabetic()
}

/// Whole-line comment: first non-whitespace byte is `#`
pub fn is_comment_line(line: &[u8]) -> bool {
    line.iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|&b| b == b'#')
}

fn is_ident_byte(b: Option<u8>) -> bool {
    b.is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// A recognized declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclarationEvent {
    pub mode: Mode,
    /// 1-based line number the declaration is on
    pub line: usize,
}

/// Ordered declarations of one stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationState {
    events: Vec<DeclarationEvent>,
}

impl DeclarationState {
    pub fn events(&self) -> &[DeclarationEvent] {
        &self.events
    }

    /// Effective mode at `line`: the nearest declaration on or before it,
    /// or `Latin1` when none precedes it
    pub fn mode_at(&self, line: usize) -> Mode {
        self.events
            .iter()
            .take_while(|e| e.line <= line)
            .last()
            .map(|e| e.mode)
            .unwrap_or_default()
    }
}

/// Scan a stream's lines for declarations, in order
pub fn scan(region: Region, lines: &[Line<'_>]) -> DeclarationState {
    let mut events = Vec::new();
    for line in lines {
        let found = match region {
            Region::Code => code_declaration(line.bytes),
            Region::Doc => doc_declaration(line.bytes),
        };
        if let Some(mode) = found {
            tracing::trace!(line = line.number, %region, %mode, "encoding declaration");
            events.push(DeclarationEvent { mode, line: line.number });
        }
    }
    DeclarationState { events }
}

/// Mode switch from `use utf8;`, `no utf8;` or `use encoding 'NAME';`.
///
/// Every `;`-separated statement on the line is examined, the last one wins.
pub fn code_declaration(line: &[u8]) -> Option<Mode> {
    let mut mode = None;
    for statement in line.split(|&b| b == b';') {
        let statement = statement.trim_ascii();
        if statement.starts_with(b"#") {
            // Trailing comment, nothing after it is code
            break;
        }
        if let Some(found) = statement_declaration(statement) {
            mode = Some(found);
        }
    }
    mode
}

fn statement_declaration(statement: &[u8]) -> Option<Mode> {
    let (negated, rest) = if let Some(rest) = keyword(statement, b"use") {
        (false, rest)
    } else if let Some(rest) = keyword(statement, b"no") {
        (true, rest)
    } else {
        return None;
    };

    if let Some(args) = keyword(rest, b"utf8") {
        // `use utf8` takes no arguments; anything else is not this pragma
        if !args.is_empty() {
            return None;
        }
        return Some(if negated { Mode::Latin1 } else { Mode::Utf8 });
    }

    if let Some(args) = keyword(rest, b"encoding") {
        if negated {
            return Some(Mode::Latin1);
        }
        let name = unquote(first_word(strip_qw(args)));
        if name.is_empty() {
            return None;
        }
        return Some(mode_for_charset(name));
    }

    None
}

/// `=encoding NAME` in a documentation block
pub fn doc_declaration(line: &[u8]) -> Option<Mode> {
    let rest = keyword(line, b"=encoding")?;
    let name = first_word(rest);
    if name.is_empty() {
        return None;
    }
    Some(mode_for_charset(name))
}

/// Any spelling of UTF-8 is `Utf8`; every other charset is 8-bit `Latin1`
pub fn mode_for_charset(name: &[u8]) -> Mode {
    let normalized: Vec<u8> = name
        .iter()
        .filter(|b| !matches!(b, b'-' | b'_'))
        .map(|b| b.to_ascii_lowercase())
        .collect();
    if normalized == b"utf8" {
        Mode::Utf8
    } else {
        Mode::Latin1
    }
}

/// Strip a leading keyword that is followed by whitespace or the end of input
fn keyword<'a>(input: &'a [u8], word: &[u8]) -> Option<&'a [u8]> {
    let rest = input.strip_prefix(word)?;
    match rest.first() {
        None => Some(rest),
        Some(b) if b.is_ascii_whitespace() => Some(rest.trim_ascii_start()),
        Some(_) => None,
    }
}

fn first_word(input: &[u8]) -> &[u8] {
    let input = input.trim_ascii_start();
    let end = input
        .iter()
        .position(|b| b.is_ascii_whitespace() || b",()[]{}<>/|!".contains(b))
        .unwrap_or(input.len());
    &input[..end]
}

/// Drop a `qw` quote operator and its opening delimiter: `qw(utf8)`, `qw/utf8/`
fn strip_qw(args: &[u8]) -> &[u8] {
    if let Some(rest) = args.strip_prefix(b"qw") {
        let rest = rest.trim_ascii_start();
        if let Some(&delim) = rest.first() {
            if !delim.is_ascii_alphanumeric() && delim != b'_' {
                return &rest[1..];
            }
        }
    }
    args
}

fn unquote(word: &[u8]) -> &[u8] {
    let trimmed = word
        .iter()
        .position(|b| !matches!(b, b'\'' | b'"'))
        .map(|start| &word[start..])
        .unwrap_or(&[]);
    let end = trimmed
        .iter()
        .position(|b| matches!(b, b'\'' | b'"'))
        .unwrap_or(trimmed.len());
    &trimmed[..end]
}
