//! Applies offered fixes back to the files on disk.

use std::path::{Path, PathBuf};

use crate::analysis::FileReport;
use crate::error::Error;
use crate::types::{Fix, FixStatus};

/// What one `apply` pass did to a single file.
#[derive(Debug, PartialEq, Eq)]
pub struct FileEdit {
    /// Number of fixes applied.
    pub applied: usize,
    /// Path relative to the project root.
    pub path: PathBuf,
    /// Fixes dropped because they overlapped an earlier one.
    pub skipped: usize,
}

/// Apply fixes to `source`, returning the rewritten text and the number of
/// fixes skipped for overlapping an already applied edit.
/// Fixes whose span falls outside the text are skipped too.
pub fn apply_to_source(source: &str, fixes: &[&Fix]) -> (String, usize) {
    let mut ordered: Vec<&Fix> = fixes.to_vec();
    ordered.sort_by(|a, b| return b.span.start.cmp(&a.span.start));

    let mut output = source.to_string();
    let mut floor = usize::MAX;
    let mut skipped = 0_usize;
    for fix in ordered {
        let (start, end) = (fix.span.start, fix.span.end());
        if end > floor || output.get(start..end).is_none() {
            skipped = skipped.saturating_add(1);
            continue;
        }
        output.replace_range(start..end, &fix.replacement);
        floor = start;
    }

    return (output, skipped);
}

/// Rewrite every file in `reports` that carries an offered fix.
/// Files are only written when their content changes.
///
/// # Errors
///
/// Returns `Error::Io` if a file cannot be written.
pub fn apply(root: &Path, reports: &[FileReport]) -> Result<Vec<FileEdit>, Error> {
    let mut edits = Vec::new();

    for report in reports {
        let fixes: Vec<&Fix> = report
            .diagnostics
            .iter()
            .filter_map(|d| {
                return match &d.fix {
                    FixStatus::Offered { fix } => Some(fix),
                    FixStatus::NotRequested | FixStatus::Withheld { .. } => None,
                };
            })
            .collect();
        if fixes.is_empty() {
            continue;
        }

        let (output, skipped) = apply_to_source(&report.source, &fixes);
        let applied = fixes.len().saturating_sub(skipped);
        if applied > 0 && output != report.source {
            std::fs::write(root.join(&report.path), output)?;
            tracing::debug!(path = %report.path.display(), applied, skipped, "rewrote file");
        }

        edits.push(FileEdit {
            applied,
            path: report.path.clone(),
            skipped,
        });
    }

    return Ok(edits);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::config::Config;
    use crate::types::Span;
    use tokio_util::sync::CancellationToken;

    fn removal(start: usize, len: usize) -> Fix {
        Fix {
            replacement: String::new(),
            span: Span { column: 1, len, line: 1, start },
        }
    }

    #[test]
    fn removes_prefixes_from_the_end_backwards() {
        let source = "A.B.C(); A.B.D();";
        let first = removal(0, 4);
        let second = removal(9, 4);
        let (output, skipped) = apply_to_source(source, &[&first, &second]);
        assert_eq!(output, "C(); D();");
        assert_eq!(skipped, 0);
    }

    #[test]
    fn overlapping_fix_is_skipped() {
        let source = "A.B.C.D();";
        let outer = removal(0, 6);
        let inner = removal(2, 2);
        let (output, skipped) = apply_to_source(source, &[&outer, &inner]);
        assert_eq!(output, "A.C.D();");
        assert_eq!(skipped, 1);
    }

    #[test]
    fn out_of_range_fix_is_skipped() {
        let fix = removal(40, 2);
        let (output, skipped) = apply_to_source("short", &[&fix]);
        assert_eq!(output, "short");
        assert_eq!(skipped, 1);
    }

    #[test]
    fn rewrites_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let source = "\
using Foo.Bar;
namespace Foo.Bar { class Baz { public static void Run() { } } }
namespace App { class P { void M() { Foo.Bar.Baz.Run(); } } }
";
        std::fs::write(dir.path().join("P.cs"), source).unwrap();

        let files = vec![crate::walker::SourceFile {
            path: PathBuf::from("P.cs"),
            source: source.to_string(),
        }];
        let reports = analyze(files, &Config::default(), true, &CancellationToken::new()).unwrap();
        let edits = apply(dir.path(), &reports).unwrap();

        assert_eq!(edits, vec![FileEdit {
            applied: 1,
            path: PathBuf::from("P.cs"),
            skipped: 0,
        }]);
        let rewritten = std::fs::read_to_string(dir.path().join("P.cs")).unwrap();
        assert!(rewritten.contains("{ Baz.Run(); }"));
        assert!(rewritten.starts_with("using Foo.Bar;\n"));
    }

    #[test]
    fn withheld_fixes_leave_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let source = "\
namespace Foo.Bar { class Baz { public static void Run() { } } }
namespace App { class P { void M() { Foo.Bar.Baz.Run(); } } }
";
        std::fs::write(dir.path().join("P.cs"), source).unwrap();

        let files = vec![crate::walker::SourceFile {
            path: PathBuf::from("P.cs"),
            source: source.to_string(),
        }];
        let reports = analyze(files, &Config::default(), true, &CancellationToken::new()).unwrap();
        let edits = apply(dir.path(), &reports).unwrap();

        assert!(edits.is_empty());
        assert_eq!(std::fs::read_to_string(dir.path().join("P.cs")).unwrap(), source);
    }
}
