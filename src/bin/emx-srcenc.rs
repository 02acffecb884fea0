//! emx-srcenc CLI
//!
//! Check a source tree's file encodings and print TAP.

use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use emx_srcenc::{
    discover_files, reference_validator, select_validator, validator_by_name, AuditConfig,
    Auditor, Checker, Classifier, TapReporter, Utf8Validator,
};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "emx-srcenc")]
#[command(author = "nzinfo <li.monan@gmail.com>")]
#[command(version)]
#[command(about = "Source file encoding audit (ASCII / UTF-8 / Latin-1)")]
struct Cli {
    /// Files and directories to check
    #[arg(default_value = ".")]
    roots: Vec<PathBuf>,

    /// Extra directory name to skip (repeatable)
    #[arg(long = "ignore-dir", value_name = "NAME")]
    ignore_dirs: Vec<String>,

    /// File extension to check, replaces the default set (repeatable)
    #[arg(long = "ext", value_name = "EXT")]
    extensions: Vec<String>,

    /// Skip everything unless RELEASE_TESTING is set
    #[arg(long)]
    release_only: bool,

    /// Number of worker threads
    #[arg(short = 'j', long, default_value_t = 1)]
    jobs: usize,

    /// Label put in front of every assertion name
    #[arg(long)]
    label: Option<String>,

    /// UTF-8 validator implementation
    #[arg(long, value_enum, default_value_t = ValidatorChoice::Auto)]
    validator: ValidatorChoice,

    /// Verbose output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ValidatorChoice {
    /// Fastest one compiled in
    Auto,
    /// Portable state machine
    Reference,
    /// simdutf8 (needs the `simd` feature)
    Simd,
}

impl ValidatorChoice {
    fn resolve(self) -> Result<&'static dyn Utf8Validator> {
        match self {
            ValidatorChoice::Auto => Ok(select_validator()),
            ValidatorChoice::Reference => Ok(reference_validator()),
            ValidatorChoice::Simd => validator_by_name("simd")
                .ok_or_else(|| anyhow!("simd validator not built in; enable the `simd` feature")),
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = AuditConfig::new()
        .with_ignored_dirs(cli.ignore_dirs.iter().cloned())
        .with_release_gate(cli.release_only);
    if !cli.extensions.is_empty() {
        config = config.with_extensions(cli.extensions.iter().cloned());
    }

    let stdout = io::stdout();
    let mut reporter = TapReporter::new(stdout.lock());

    if let Some(reason) = config.skip_reason(|key| std::env::var(key).ok()) {
        reporter.skip_all(&reason)?;
        return Ok(ExitCode::SUCCESS);
    }

    let classifier = Classifier::with_validator(cli.validator.resolve()?);
    tracing::debug!(validator = classifier.validator_name(), "validator selected");
    let checker = Checker::new(classifier);

    let files = discover_files(&cli.roots, &config)?;

    let mut auditor = Auditor::new(checker);
    if let Some(label) = &cli.label {
        auditor = auditor.with_label(label.clone());
    }
    let reports = auditor.run(&files, cli.jobs)?;
    let summary = reporter.report_all(&reports)?;

    tracing::info!(checked = summary.checked, passed = summary.passed, "audit finished");

    if summary.all_passed() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
