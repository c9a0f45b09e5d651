//! Drives a whole run: parse every file, build the symbol table, scan.

#[cfg(test)]
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;

use rayon::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::Error;
use crate::grammar;
use crate::rule::{RedundancyRule, RuleDescriptor};
use crate::scanner::QualificationScanner;
use crate::symbols::{self, FileDeclarations, FileScopes, SemanticModel, SymbolTable};
use crate::syntax;
use crate::types::{Diagnostic, ExpressionNode};
use crate::walker::SourceFile;

/// Findings for one file, in document order.
#[derive(Debug)]
pub struct FileReport {
    /// Findings in document order.
    pub diagnostics: Vec<Diagnostic>,
    /// Path relative to the project root.
    pub path: PathBuf,
    /// The text the findings refer to.
    pub source: String,
}

/// A file after parsing, ready to scan once the table is complete.
struct ParsedUnit {
    /// Declarations contributed to the table.
    declarations: FileDeclarations,
    /// Path relative to the project root.
    path: PathBuf,
    /// Lexical scopes for the oracle.
    scopes: FileScopes,
    /// File text.
    source: String,
    /// Lowered expression tree.
    tree: ExpressionNode,
}

/// Analyze a set of files.
///
/// Files are parsed and scanned in parallel; the result is ordered by path
/// so repeated runs on unchanged input produce identical output.
/// A cancelled run returns whatever was completed, never partial findings for a node.
///
/// # Errors
///
/// Returns `Error::InvalidExternType` for a bad config entry, or parse errors
/// (`Error::FileTooLarge`, `Error::ParseFailed`, `Error::UnsupportedLanguage`)
/// from any file.
pub fn analyze(
    files: Vec<SourceFile>,
    config: &Config,
    offer_fixes: bool,
    cancel: &CancellationToken,
) -> Result<Vec<FileReport>, Error> {
    let started = Instant::now();
    let units: Vec<ParsedUnit> = files.into_par_iter().map(parse_unit).collect::<Result<_, _>>()?;

    let mut table = SymbolTable::default();
    for entry in &config.extern_types {
        table.add_extern_type(entry)?;
    }
    for unit in &units {
        table.add_file(&unit.declarations);
    }
    tracing::debug!(files = units.len(), elapsed = ?started.elapsed(), "symbol table built");

    let scanner = QualificationScanner::new(RedundancyRule::new(RuleDescriptor::default())).with_fixes(offer_fixes);
    let descriptor = scanner.rule().descriptor();
    let enabled = config.rule_enabled(descriptor.id, descriptor.enabled_by_default);
    if !enabled {
        tracing::info!(rule = descriptor.id, "rule disabled by config");
    }

    let mut reports: Vec<FileReport> = units
        .into_par_iter()
        .map(|unit| {
            let diagnostics = if enabled {
                let model = SemanticModel::new(&table, &unit.scopes);
                scanner.scan_tree(&unit.tree, &model, cancel).collect()
            } else {
                Vec::new()
            };
            return FileReport {
                diagnostics,
                path: unit.path,
                source: unit.source,
            };
        })
        .collect();
    reports.sort_by(|a, b| return a.path.cmp(&b.path));

    let total: usize = reports.iter().map(|r| return r.diagnostics.len()).sum();
    tracing::debug!(diagnostics = total, elapsed = ?started.elapsed(), "analysis finished");
    return Ok(reports);
}

/// Analyze a single in-memory source as if it were the whole program.
#[cfg(test)]
pub fn analyze_source(
    path: &Path,
    source: &str,
    config: &Config,
    offer_fixes: bool,
) -> Result<Vec<Diagnostic>, Error> {
    let file = SourceFile {
        path: path.to_path_buf(),
        source: source.to_string(),
    };
    let reports = analyze(vec![file], config, offer_fixes, &CancellationToken::new())?;
    return Ok(reports.into_iter().flat_map(|r| return r.diagnostics).collect());
}

/// Parse one file and extract everything the later phases need.
///
/// # Errors
///
/// Returns grammar or parse errors for the file.
fn parse_unit(file: SourceFile) -> Result<ParsedUnit, Error> {
    let language = grammar::language_for_path(&file.path)?;
    let tree = syntax::parse_source(&file.path, &file.source, &language)?;
    let root = tree.root_node();
    if root.has_error() {
        tracing::debug!(path = %file.path.display(), "source has syntax errors; analyzing what parsed");
    }

    let (declarations, scopes) = symbols::collect(root, &file.source);
    let lowered = syntax::lower(root, &file.source);
    return Ok(ParsedUnit {
        declarations,
        path: file.path,
        scopes,
        source: file.source,
        tree: lowered,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FixRejection, FixStatus};

    const QUALIFIED: &str = r#"
using System;
namespace Foo.Bar
{
    public class Baz
    {
        public class Hello
        {
            public static void World()
            {
                Console.WriteLine("hello, world");
            }
        }
    }
}
namespace App
{
    static class Program
    {
        static void Main(string[] args)
        {
            Foo.Bar.Baz.Hello.World();
        }
    }
}"#;

    fn run(source: &str) -> Vec<Diagnostic> {
        analyze_source(Path::new("Program.cs"), source, &Config::default(), false).unwrap()
    }

    #[test]
    fn empty_source_has_no_diagnostics() {
        assert!(run("").is_empty());
    }

    #[test]
    fn simple_names_have_no_diagnostics() {
        let source = r#"
using System;
namespace App
{
    static class Program
    {
        static void Main(string[] args)
        {
            Console.WriteLine("hello, world");
        }
    }
}"#;
        assert!(run(source).is_empty());
    }

    #[test]
    fn qualified_call_reports_namespace_prefix_once() {
        let diagnostics = run(QUALIFIED);
        assert_eq!(diagnostics.len(), 1);

        let diagnostic = &diagnostics[0];
        assert_eq!(diagnostic.argument, "Foo.Bar.Baz");
        assert_eq!(&QUALIFIED[diagnostic.span.start..diagnostic.span.end()], "Foo.Bar.Baz");
        assert_eq!(diagnostic.span.line, 22);
    }

    #[test]
    fn deeper_namespace_still_reports_once() {
        let source = QUALIFIED
            .replace("namespace Foo.Bar\n", "namespace Foo.Bar.Qux\n")
            .replace("Foo.Bar.Baz.Hello.World();", "Foo.Bar.Qux.Baz.Hello.World();");
        let diagnostics = run(&source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].argument, "Foo.Bar.Qux.Baz");
    }

    #[test]
    fn undeclared_identifier_is_silent() {
        let source = "class P { void M() { Undeclared.Thing.Call(); } }";
        assert!(run(source).is_empty());
    }

    #[test]
    fn extern_types_make_library_qualification_visible() {
        let source = "class P { void M() { System.Console.WriteLine(); } }";
        let config = Config::parse("extern_types = [\"System.Console\"]\n").unwrap();
        let diagnostics = analyze_source(Path::new("P.cs"), source, &config, false).unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].argument, "System.Console");
    }

    #[test]
    fn disabled_rule_reports_nothing() {
        let config = Config::parse("[rules.WI01001]\nenabled = false\n").unwrap();
        let diagnostics = analyze_source(Path::new("Program.cs"), QUALIFIED, &config, false).unwrap();
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn fix_offered_when_using_is_present() {
        let source = QUALIFIED.replace("using System;", "using System;\nusing Foo.Bar;");
        let diagnostics = analyze_source(Path::new("Program.cs"), &source, &Config::default(), true).unwrap();

        let FixStatus::Offered { fix } = &diagnostics[0].fix else {
            panic!("expected an offered fix, got {:?}", diagnostics[0].fix);
        };
        assert_eq!(&source[fix.span.start..fix.span.end()], "Foo.Bar.");
        assert_eq!(fix.replacement, "");
    }

    #[test]
    fn fix_withheld_without_using() {
        let diagnostics = analyze_source(Path::new("Program.cs"), QUALIFIED, &Config::default(), true).unwrap();
        assert!(matches!(diagnostics[0].fix, FixStatus::Withheld { .. }));
    }

    fn with_using(source: &str) -> String {
        source.replace("using System;", "using System;\nusing Foo.Bar;")
    }

    fn rejection(diagnostic: &Diagnostic) -> &FixRejection {
        let FixStatus::Withheld { rejection } = &diagnostic.fix else {
            panic!("expected a withheld fix, got {:?}", diagnostic.fix);
        };
        rejection
    }

    #[test]
    fn fix_withheld_when_parameter_shares_short_name() {
        let source = with_using(QUALIFIED).replace("Main(string[] args)", "Main(string[] Baz)");
        let diagnostics = analyze_source(Path::new("Program.cs"), &source, &Config::default(), true).unwrap();

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(rejection(&diagnostics[0]), &FixRejection::ResolvesElsewhere { target: "Baz".to_string() });
    }

    #[test]
    fn fix_withheld_when_local_shares_short_name() {
        let source = with_using(QUALIFIED).replace(
            "Foo.Bar.Baz.Hello.World();",
            "int Baz = 0;\n            Foo.Bar.Baz.Hello.World();",
        );
        let diagnostics = analyze_source(Path::new("Program.cs"), &source, &Config::default(), true).unwrap();

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(rejection(&diagnostics[0]), &FixRejection::ResolvesElsewhere { target: "Baz".to_string() });
    }

    #[test]
    fn local_named_like_namespace_root_is_not_a_namespace() {
        let source = QUALIFIED.replace(
            "Foo.Bar.Baz.Hello.World();",
            "var Foo = new object();\n            Foo.Bar.Baz.Hello.World();",
        );
        assert!(run(&source).is_empty());
    }

    #[test]
    fn as_and_is_operands_are_not_reported() {
        let source = QUALIFIED.replace(
            "Foo.Bar.Baz.Hello.World();",
            "object o = args;\n            var a = o as Foo.Bar.Baz;\n            var b = o is Foo.Bar.Baz;",
        );
        assert!(run(&source).is_empty());
    }

    #[test]
    fn global_alias_chain_is_reported() {
        let source = QUALIFIED.replace("Foo.Bar.Baz.Hello.World();", "global::Foo.Bar.Baz.Hello.World();");
        let diagnostics = run(&source);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].argument, "global::Foo.Bar.Baz");
    }

    #[test]
    fn global_alias_fix_removes_whole_prefix() {
        let source = with_using(QUALIFIED).replace("Foo.Bar.Baz.Hello.World();", "global::Foo.Bar.Baz.Hello.World();");
        let diagnostics = analyze_source(Path::new("Program.cs"), &source, &Config::default(), true).unwrap();

        let FixStatus::Offered { fix } = &diagnostics[0].fix else {
            panic!("expected an offered fix, got {:?}", diagnostics[0].fix);
        };
        assert_eq!(&source[fix.span.start..fix.span.end()], "global::Foo.Bar.");
    }

    #[test]
    fn analysis_is_idempotent() {
        assert_eq!(run(QUALIFIED), run(QUALIFIED));
    }

    #[test]
    fn types_declared_in_other_files_resolve() {
        let files = vec![
            SourceFile {
                path: PathBuf::from("Lib.cs"),
                source: "namespace Lib.Core { public class Widget { public static void Make() { } } }".to_string(),
            },
            SourceFile {
                path: PathBuf::from("App.cs"),
                source: "class P { void M() { Lib.Core.Widget.Make(); } }".to_string(),
            },
        ];
        let reports = analyze(files, &Config::default(), false, &CancellationToken::new()).unwrap();

        assert_eq!(reports[0].path, PathBuf::from("App.cs"));
        assert_eq!(reports[0].diagnostics.len(), 1);
        assert_eq!(reports[0].diagnostics[0].argument, "Lib.Core.Widget");
        assert!(reports[1].diagnostics.is_empty());
    }
}
