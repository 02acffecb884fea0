//! # emx-srcenc
//!
//! Source tree encoding audit.
//!
//! Every source and documentation file is classified at the byte level as
//! strict ASCII, valid UTF-8, or invalid UTF-8, and the result is checked
//! against what the file declares about itself.
//!
//! ## Declarations
//!
//! Code starts out in `latin1` mode, where any 8-bit byte is acceptable.
//! `use utf8;` switches to `utf8` mode, `no utf8;` switches back.
//! Documentation blocks (`=head1` ... `=cut`) carry their own mode through
//! `=encoding NAME` and are checked independently of the code.
//!
//! Whole-line `#` comments are ignored, so a legacy author name in a header
//! comment does not count as content. Trailing comments after code do count.
//!
//! ## Verdicts
//!
//! Rules, in order (first match wins):
//! 1. UTF-8 byte order mark at offset 0 → `BOM_PRESENT`
//! 2. invalid UTF-8 in `utf8` mode → `INVALID_UTF8_IN_UTF8_MODE`
//! 3. valid multi-byte UTF-8 in `latin1` mode → `UNDECLARED_UTF8`
//! 4. otherwise → pass
//!
//! An unreadable file fails with `IO_ERROR`; it never stops the run.
//!
//! ```rust
//! use emx_srcenc::{Checker, Verdict};
//!
//! let checker = Checker::default();
//! assert_eq!(checker.check_bytes(b"use utf8;\nmy $s = \"caf\xC3\xA9\";\n"), Verdict::Pass);
//!
//! let verdict = checker.check_bytes(b"my $s = \"caf\xC3\xA9\";\n");
//! assert_eq!(verdict.reason().map(|r| r.code()), Some("UNDECLARED_UTF8"));
//! ```

pub mod audit;
pub mod checker;
pub mod classifier;
pub mod config;
pub mod declaration;
pub mod discover;
pub mod report;
pub mod verdict;

pub use audit::{AuditSummary, Auditor};
pub use checker::{check_consistency, Checker, Consistency, ReadError};
pub use classifier::{
    has_utf8_bom, reference_validator, select_validator, validator_by_name, Classifier,
    ReferenceValidator, Utf8Validator,
};
#[cfg(feature = "simd")]
pub use classifier::SimdValidator;
pub use config::AuditConfig;
pub use declaration::{DeclarationEvent, DeclarationState, SourceLayout};
pub use discover::discover_files;
pub use report::TapReporter;
pub use verdict::{Classification, FailReason, FileReport, Mode, Region, Verdict};
