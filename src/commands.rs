//! Core CLI commands for idiom: check and fix.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tokio_util::sync::CancellationToken;

use crate::analysis::{self, FileReport};
use crate::config::Config;
use crate::diagnostics;
use crate::error;
use crate::fixer::{self, FileEdit};
use crate::types::FixStatus;
use crate::walker;

/// Output format for `check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// One compiler-style line per finding.
    Text,
    /// A JSON array of findings.
    Json,
}

/// Discover, read, and analyze the requested paths under `root`.
///
/// # Errors
///
/// Returns errors from config loading, discovery, or analysis.
fn run_analysis(root: &Path, paths: &[PathBuf], offer_fixes: bool) -> Result<Vec<FileReport>, error::Error> {
    let config = Config::load(root)?;
    let files = walker::discover(root, paths, &config)?;
    tracing::debug!(files = files.len(), "discovered sources");
    return analysis::analyze(files, &config, offer_fixes, &CancellationToken::new());
}

/// Analyze sources and report redundant qualifications.
/// Exit code 1 when anything is reported, 0 otherwise.
///
/// # Errors
///
/// Returns errors from config loading, discovery, or analysis.
pub fn check(paths: &[PathBuf], format: Format) -> Result<ExitCode, error::Error> {
    let root = PathBuf::from(".");
    let reports = run_analysis(&root, paths, false)?;
    let found = reports.iter().any(|r| return !r.diagnostics.is_empty());

    match format {
        Format::Json => println!("{}", diagnostics::render_json(&reports)),
        Format::Text => {
            print!("{}", diagnostics::render_text(&reports));
            if found {
                println!();
            }
            println!("{}", diagnostics::render_summary(&reports));
        },
    }

    if found {
        return Ok(ExitCode::from(1));
    }
    return Ok(ExitCode::SUCCESS);
}

/// Apply every safe fix and report what was fixed and what was withheld.
/// Exit code 1 when findings remain after fixing, 0 otherwise.
///
/// # Errors
///
/// Returns errors from analysis or from writing files back.
pub fn fix(paths: &[PathBuf]) -> Result<ExitCode, error::Error> {
    let root = PathBuf::from(".");
    let reports = run_analysis(&root, paths, true)?;
    if reports.iter().all(|r| return r.diagnostics.is_empty()) {
        eprintln!("No redundant qualifications, nothing to fix.");
        return Ok(ExitCode::SUCCESS);
    }

    let edits = fixer::apply(&root, &reports)?;
    let report = render_fix_report(&reports, &edits);
    print!("{report}");

    let remaining: usize = edits.iter().map(|e| return e.skipped).sum::<usize>().saturating_add(withheld_count(&reports));
    if remaining > 0 {
        return Ok(ExitCode::from(1));
    }
    return Ok(ExitCode::SUCCESS);
}

/// Number of findings whose fix was judged unsafe.
fn withheld_count(reports: &[FileReport]) -> usize {
    return reports
        .iter()
        .flat_map(|r| return &r.diagnostics)
        .filter(|d| return matches!(d.fix, FixStatus::Withheld { .. }))
        .count();
}

/// Build a markdown report of applied and withheld fixes.
fn render_fix_report(reports: &[FileReport], edits: &[FileEdit]) -> String {
    let mut out = String::new();
    let applied: usize = edits.iter().map(|e| return e.applied).sum();

    if applied > 0 {
        let _ = writeln!(out, "## Fixed\n");
        for edit in edits.iter().filter(|e| return e.applied > 0) {
            let _ = writeln!(out, "- {} ({} qualifications removed)", edit.path.display(), edit.applied);
        }
    }

    let mut withheld = Vec::new();
    for report in reports {
        for diagnostic in &report.diagnostics {
            if let FixStatus::Withheld { rejection } = &diagnostic.fix {
                withheld.push(format!(
                    "- {}:{}  `{}` ({rejection})",
                    report.path.display(),
                    diagnostic.span.line,
                    diagnostic.argument,
                ));
            }
        }
    }
    for edit in edits.iter().filter(|e| return e.skipped > 0) {
        withheld.push(format!("- {}  ({} overlapping edits skipped)", edit.path.display(), edit.skipped));
    }

    if !withheld.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(out, "## Not fixed\n");
        for line in &withheld {
            let _ = writeln!(out, "{line}");
        }
    }

    return out;
}
