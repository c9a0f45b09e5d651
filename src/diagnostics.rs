use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;

use crate::analysis::FileReport;
use crate::config::CONFIG_FILE;
use crate::error::Error;
use crate::grammar::SUPPORTED_EXTENSIONS;
use crate::rule::DIAGNOSTIC_ID;
use crate::types::{Diagnostic, FixStatus};

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened, why, and how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::FileNotFound { path } => format!("\
# Error: File Not Found

`{}` does not exist.
", path.display()),

        Error::FileTooLarge { file, size_bytes, max_bytes } => {
            render_file_too_large(file, *size_bytes, *max_bytes)
        },
        Error::InvalidExternType { entry, reason } => render_invalid_extern_type(entry, reason),

        Error::Io(e) => format!("\
# Error: I/O

{e}
"),

        Error::ParseFailed { file, reason } => format!("\
# Error: Parse Failed

Could not parse `{}`: {reason}
", file.display()),

        Error::TomlDe(e) => format!("\
# Error: Invalid TOML

`{CONFIG_FILE}` could not be read:

{e}
"),

        Error::UnknownRule { id } => render_unknown_rule(id),
        Error::UnsupportedLanguage { ext } => render_unsupported_language(ext),
    };
}

fn render_file_too_large(file: &Path, size_bytes: u64, max_bytes: u64) -> String {
    return format!("\
# Error: File Too Large

`{}` is {size_bytes} bytes (max {max_bytes}).

## Fix

Exclude it in `{CONFIG_FILE}`:

    exclude = [\"{}\"]
", file.display(), file.display());
}

fn render_invalid_extern_type(entry: &str, reason: &str) -> String {
    return format!("\
# Error: Invalid Extern Type

`{entry}` in `{CONFIG_FILE}` is not a usable type path: {reason}.

## Fix

Write the fully qualified name, with `+` for nested types:

    extern_types = [\"System.Console\", \"System.Environment+SpecialFolder\"]
");
}

fn render_unknown_rule(id: &str) -> String {
    return format!("\
# Error: Unknown Rule

`[rules.{id}]` in `{CONFIG_FILE}` does not name a known rule.

## Known rules

- `{DIAGNOSTIC_ID}`
");
}

fn render_unsupported_language(ext: &str) -> String {
    let mut out = format!("\
# Error: Unsupported Language

No tree-sitter grammar for `.{ext}` files.

## Supported extensions

");
    for supported in SUPPORTED_EXTENSIONS {
        let _ = writeln!(out, "- `.{supported}`");
    }
    return out;
}

/// Render findings as compiler-style lines, one per diagnostic, followed by
/// the offending source line and any fix note.
pub fn render_text(reports: &[FileReport]) -> String {
    let mut out = String::new();
    for report in reports {
        for diagnostic in &report.diagnostics {
            render_diagnostic_text(&mut out, &report.path, &report.source, diagnostic);
        }
    }
    return out;
}

fn render_diagnostic_text(out: &mut String, path: &Path, source: &str, diagnostic: &Diagnostic) {
    let span = diagnostic.span;
    let _ = writeln!(
        out,
        "{}:{}:{}: {}[{}]: {}",
        path.display(),
        span.line,
        span.column,
        diagnostic.severity.label(),
        diagnostic.rule_id,
        diagnostic.message,
    );

    let line_index = usize::try_from(span.line.saturating_sub(1)).unwrap_or(usize::MAX);
    if let Some(line) = source.lines().nth(line_index) {
        let _ = writeln!(out, "    {line}");
    }

    match &diagnostic.fix {
        FixStatus::NotRequested => {},
        FixStatus::Offered { fix } => {
            let removed = source.get(fix.span.start..fix.span.end()).unwrap_or("");
            let _ = writeln!(out, "    fix: remove `{removed}`");
        },
        FixStatus::Withheld { rejection } => {
            let _ = writeln!(out, "    fix withheld: {rejection}");
        },
    }
}

/// One line summary printed after the findings.
pub fn render_summary(reports: &[FileReport]) -> String {
    let files = reports.len();
    let findings: usize = reports.iter().map(|r| return r.diagnostics.len()).sum();
    if findings == 0 {
        return format!("No redundant qualifications in {files} files");
    }
    let affected = reports.iter().filter(|r| return !r.diagnostics.is_empty()).count();
    return format!("{findings} redundant qualifications in {affected} of {files} files");
}

#[derive(Serialize)]
struct JsonFinding<'a> {
    #[serde(flatten)]
    diagnostic: &'a Diagnostic,
    file: String,
}

/// Render findings as a JSON array, one object per diagnostic.
pub fn render_json(reports: &[FileReport]) -> String {
    let findings: Vec<JsonFinding<'_>> = reports
        .iter()
        .flat_map(|report| {
            let file = report.path.to_string_lossy().replace('\\', "/");
            return report.diagnostics.iter().map(move |diagnostic| {
                return JsonFinding {
                    diagnostic,
                    file: file.clone(),
                };
            });
        })
        .collect();

    // Plain data with string keys; serialization cannot fail.
    return serde_json::to_string_pretty(&findings).unwrap_or_default();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze_source;
    use crate::config::Config;
    use std::path::PathBuf;

    const SOURCE: &str = "\
namespace Foo.Bar { class Baz { public static void Run() { } } }
namespace App { class P { void M() { Foo.Bar.Baz.Run(); } } }
";

    fn reports(offer_fixes: bool) -> Vec<FileReport> {
        let path = PathBuf::from("src/P.cs");
        let diagnostics = analyze_source(&path, SOURCE, &Config::default(), offer_fixes).unwrap();
        vec![FileReport {
            diagnostics,
            path,
            source: SOURCE.to_string(),
        }]
    }

    #[test]
    fn text_output_is_compiler_style() {
        let text = render_text(&reports(false));
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("src/P.cs:2:38: warning[WI01001]: Type name 'Foo.Bar.Baz' is unnecessarily qualified")
        );
        assert_eq!(
            lines.next(),
            Some("    namespace App { class P { void M() { Foo.Bar.Baz.Run(); } } }")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn text_output_explains_withheld_fix() {
        let text = render_text(&reports(true));
        assert!(text.contains("fix withheld: short name is not in scope"));
    }

    #[test]
    fn summary_counts_findings() {
        assert_eq!(render_summary(&reports(false)), "1 redundant qualifications in 1 of 1 files");
        assert_eq!(render_summary(&[]), "No redundant qualifications in 0 files");
    }

    #[test]
    fn json_output_carries_file_and_rule() {
        let json: serde_json::Value = serde_json::from_str(&render_json(&reports(false))).unwrap();
        let first = &json[0];
        assert_eq!(first["file"], "src/P.cs");
        assert_eq!(first["rule_id"], "WI01001");
        assert_eq!(first["argument"], "Foo.Bar.Baz");
        assert_eq!(first["severity"], "warning");
        assert_eq!(first["span"]["line"], 2);
        assert_eq!(first["fix"]["status"], "not_requested");
    }

    #[test]
    fn unknown_rule_lists_known_rules() {
        let md = render_error(&Error::UnknownRule { id: "XX0000".to_string() });
        assert!(md.starts_with("# Error: Unknown Rule"));
        assert!(md.contains("- `WI01001`"));
    }

    #[test]
    fn unsupported_language_lists_extensions() {
        let md = render_error(&Error::UnsupportedLanguage { ext: "vb".to_string() });
        assert!(md.contains("`.vb`"));
        assert!(md.contains("- `.cs`"));
    }
}
