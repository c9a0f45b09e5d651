//! Finds member accesses that spell out a type's namespace path.
//!
//! Every redundantly qualified chain such as `Foo.Bar.Baz.Hello.World` holds
//! one member access per dot. The inner ones name a namespace inside a
//! namespace, or a member or nested type inside a type. Exactly one of them
//! names a type that sits directly in a namespace, so matching only that case
//! reports each chain once no matter how deep it is.

use tokio_util::sync::CancellationToken;

use crate::oracle::SymbolOracle;
use crate::rule::RedundancyRule;
use crate::types::{Diagnostic, ExpressionNode, FixStatus};

/// Classifies member-access nodes against an oracle.
/// Carries configuration only, so one scanner can serve many threads.
#[derive(Debug, Clone, Default)]
pub struct QualificationScanner {
    /// Compute a fix for every finding.
    offer_fixes: bool,
    /// The rule that decides reportability.
    rule: RedundancyRule,
}

impl QualificationScanner {
    /// Build a scanner around `rule`. Fixes are off until requested.
    pub const fn new(rule: RedundancyRule) -> Self {
        return Self { offer_fixes: false, rule };
    }

    /// Request a `FixStatus` on every diagnostic.
    #[must_use]
    pub const fn with_fixes(mut self, offer_fixes: bool) -> Self {
        self.offer_fixes = offer_fixes;
        return self;
    }

    /// The rule this scanner reports with.
    pub const fn rule(&self) -> &RedundancyRule {
        return &self.rule;
    }

    /// Analyze one node. Anything other than a member access whose symbol is
    /// a namespaced type produces nothing.
    pub fn scan(&self, node: &ExpressionNode, oracle: &dyn SymbolOracle) -> Option<Diagnostic> {
        let ExpressionNode::MemberAccess(access) = node else {
            return None;
        };

        let symbol = oracle.resolve(node);
        if !symbol.is_namespaced_type() {
            tracing::trace!(text = %access.text, line = node.span().line, kind = ?symbol.kind, "member access skipped");
            return None;
        }

        let mut diagnostic = self.rule.evaluate(access, &symbol)?;
        if self.offer_fixes {
            diagnostic.fix = match self.rule.suggest_fix(access, &symbol, oracle) {
                Ok(fix) => FixStatus::Offered { fix },
                Err(rejection) => FixStatus::Withheld { rejection },
            };
        }
        return Some(diagnostic);
    }

    /// Lazily walk `root` depth-first in document order, scanning every node.
    pub fn scan_tree<'a>(
        &'a self,
        root: &'a ExpressionNode,
        oracle: &'a dyn SymbolOracle,
        cancel: &'a CancellationToken,
    ) -> Scan<'a> {
        return Scan {
            cancel,
            oracle,
            scanner: self,
            stack: vec![root],
        };
    }
}

/// Iterator returned by `QualificationScanner::scan_tree`.
/// Each call to `scan_tree` starts a fresh walk over the same tree.
pub struct Scan<'a> {
    /// Stops the walk when signalled.
    cancel: &'a CancellationToken,
    /// Resolves each visited node.
    oracle: &'a dyn SymbolOracle,
    /// Configuration for the walk.
    scanner: &'a QualificationScanner,
    /// Nodes still to visit; the next one is on top.
    stack: Vec<&'a ExpressionNode>,
}

impl Iterator for Scan<'_> {
    type Item = Diagnostic;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            if self.cancel.is_cancelled() {
                self.stack.clear();
                return None;
            }

            self.stack.extend(node.children().into_iter().rev());

            let Some(diagnostic) = self.scanner.scan(node, self.oracle) else {
                continue;
            };
            // A cancel that lands mid-node discards that node's result.
            if self.cancel.is_cancelled() {
                self.stack.clear();
                return None;
            }
            return Some(diagnostic);
        }
        return None;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rstest::rstest;

    use super::*;
    use crate::oracle::ScopeLookup;
    use crate::types::{MemberAccess, ResolvedSymbol, SimpleName, Span, SymbolKind};

    /// Resolves nodes by their exact text.
    #[derive(Default)]
    struct StubOracle {
        symbols: HashMap<String, ResolvedSymbol>,
    }

    impl StubOracle {
        fn namespace(mut self, name: &str) -> Self {
            let parent = name.rsplit_once('.').map(|(p, _)| p).unwrap_or("");
            self.symbols.insert(name.to_string(), ResolvedSymbol {
                containing_namespace: parent.to_string(),
                containing_type: None,
                kind: SymbolKind::Namespace,
                qualified_name: name.to_string(),
            });
            self
        }

        fn ty(mut self, name: &str, container: Option<&str>) -> Self {
            let (parent, _) = name.rsplit_once('.').unwrap_or(("", name));
            self.symbols.insert(name.to_string(), ResolvedSymbol {
                containing_namespace: parent.to_string(),
                containing_type: container.map(str::to_string),
                kind: SymbolKind::NamedType,
                qualified_name: name.to_string(),
            });
            self
        }

        fn member(mut self, name: &str, owner: &str) -> Self {
            self.symbols.insert(name.to_string(), ResolvedSymbol {
                containing_namespace: String::new(),
                containing_type: Some(owner.to_string()),
                kind: SymbolKind::Member,
                qualified_name: name.to_string(),
            });
            self
        }
    }

    impl SymbolOracle for StubOracle {
        fn lookup_in_scope(&self, _offset: usize, _name: &str) -> ScopeLookup {
            ScopeLookup::NotFound
        }

        fn resolve(&self, node: &ExpressionNode) -> ResolvedSymbol {
            let text = match node {
                ExpressionNode::Identifier(name) => &name.text,
                ExpressionNode::MemberAccess(access) => &access.text,
                ExpressionNode::AliasQualified(_) | ExpressionNode::Other { .. } => {
                    return ResolvedSymbol::unknown();
                },
            };
            self.symbols.get(text).cloned().unwrap_or_else(ResolvedSymbol::unknown)
        }
    }

    fn span(start: usize, len: usize) -> Span {
        Span { column: u32::try_from(start).unwrap() + 1, len, line: 1, start }
    }

    /// Build the left-nested member-access chain for a dotted path.
    fn chain(path: &str) -> ExpressionNode {
        let mut segments = path.split('.');
        let first = segments.next().unwrap();
        let mut node = ExpressionNode::Identifier(SimpleName {
            identifier: first.to_string(),
            span: span(0, first.len()),
            text: first.to_string(),
        });
        let mut end = first.len();
        for segment in segments {
            let name_start = end + 1;
            end = name_start + segment.len();
            node = ExpressionNode::MemberAccess(MemberAccess {
                left: Box::new(node),
                name: SimpleName {
                    identifier: segment.to_string(),
                    span: span(name_start, segment.len()),
                    text: segment.to_string(),
                },
                span: span(0, end),
                text: path[..end].to_string(),
            });
        }
        node
    }

    /// Wrap a chain in an invocation-like node, as the host tree would.
    fn statement(path: &str) -> ExpressionNode {
        let callee = chain(path);
        let span = Span { len: callee.span().len + 2, ..callee.span() };
        ExpressionNode::Other { children: vec![callee], span }
    }

    fn collect(root: &ExpressionNode, oracle: &StubOracle) -> Vec<Diagnostic> {
        let scanner = QualificationScanner::default();
        let cancel = CancellationToken::new();
        scanner.scan_tree(root, oracle, &cancel).collect()
    }

    fn hello_world_oracle(namespace_path: &[&str]) -> StubOracle {
        let mut oracle = StubOracle::default();
        let mut prefix = String::new();
        for segment in namespace_path {
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(segment);
            oracle = oracle.namespace(&prefix);
        }
        let baz = format!("{prefix}.Baz");
        let hello = format!("{baz}.Hello");
        oracle
            .ty(&baz, None)
            .ty(&hello, Some(&baz))
            .member(&format!("{hello}.World"), &hello)
    }

    #[test]
    fn empty_tree_has_no_diagnostics() {
        let root = ExpressionNode::Other { children: Vec::new(), span: span(0, 0) };
        assert!(collect(&root, &StubOracle::default()).is_empty());
    }

    #[test]
    fn non_member_access_is_a_no_op() {
        let scanner = QualificationScanner::default();
        let oracle = StubOracle::default().ty("Baz", None);
        let node = chain("Baz");
        assert!(scanner.scan(&node, &oracle).is_none());
    }

    #[test]
    fn simple_names_have_no_diagnostics() {
        let oracle = StubOracle::default()
            .ty("Console", None)
            .member("Console.WriteLine", "Console");
        assert!(collect(&statement("Console.WriteLine"), &oracle).is_empty());
    }

    #[test]
    fn namespace_and_member_accesses_only_have_no_diagnostics() {
        let oracle = StubOracle::default()
            .namespace("Foo")
            .namespace("Foo.Bar")
            .member("Foo.Bar.Qux", "Foo");
        assert!(collect(&statement("Foo.Bar.Qux"), &oracle).is_empty());
    }

    #[rstest]
    #[case(&["Foo"], "Foo.Baz")]
    #[case(&["Foo", "Bar"], "Foo.Bar.Baz")]
    #[case(&["Foo", "Bar", "Qux"], "Foo.Bar.Qux.Baz")]
    #[case(&["A", "B", "C", "D", "E"], "A.B.C.D.E.Baz")]
    fn qualified_chain_reported_exactly_once(#[case] namespaces: &[&str], #[case] expected: &str) {
        let oracle = hello_world_oracle(namespaces);
        let path = format!("{expected}.Hello.World");
        let diagnostics = collect(&statement(&path), &oracle);

        assert_eq!(diagnostics.len(), 1);
        let diagnostic = &diagnostics[0];
        assert_eq!(diagnostic.argument, expected);
        assert_eq!(diagnostic.span, span(0, expected.len()));
    }

    #[test]
    fn unresolved_symbol_is_skipped_silently() {
        let diagnostics = collect(&statement("Nope.Missing.Type"), &StubOracle::default());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn rescanning_yields_identical_sequence() {
        let oracle = hello_world_oracle(&["Foo", "Bar"]);
        let root = ExpressionNode::Other {
            children: vec![statement("Foo.Bar.Baz.Hello.World"), statement("Foo.Bar.Baz")],
            span: span(0, 40),
        };
        let scanner = QualificationScanner::default();
        let cancel = CancellationToken::new();

        let first: Vec<Diagnostic> = scanner.scan_tree(&root, &oracle, &cancel).collect();
        let second: Vec<Diagnostic> = scanner.scan_tree(&root, &oracle, &cancel).collect();
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn cancelled_scan_yields_nothing() {
        let oracle = hello_world_oracle(&["Foo", "Bar"]);
        let root = statement("Foo.Bar.Baz.Hello.World");
        let scanner = QualificationScanner::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(scanner.scan_tree(&root, &oracle, &cancel).count(), 0);
    }

    /// Cancels the run from inside `resolve`, as a host would mid-node.
    struct CancellingOracle {
        cancel: CancellationToken,
        inner: StubOracle,
    }

    impl SymbolOracle for CancellingOracle {
        fn lookup_in_scope(&self, offset: usize, name: &str) -> ScopeLookup {
            self.inner.lookup_in_scope(offset, name)
        }

        fn resolve(&self, node: &ExpressionNode) -> ResolvedSymbol {
            self.cancel.cancel();
            self.inner.resolve(node)
        }
    }

    #[test]
    fn cancel_during_resolution_discards_the_node() {
        let cancel = CancellationToken::new();
        let oracle = CancellingOracle {
            cancel: cancel.clone(),
            inner: hello_world_oracle(&["Foo", "Bar"]),
        };
        let root = chain("Foo.Bar.Baz");
        let scanner = QualificationScanner::default();

        assert!(scanner.scan(&root, &oracle).is_some());
        assert!(cancel.is_cancelled());

        let fresh = CancellationToken::new();
        let oracle = CancellingOracle {
            cancel: fresh.clone(),
            inner: hello_world_oracle(&["Foo", "Bar"]),
        };
        assert_eq!(scanner.scan_tree(&root, &oracle, &fresh).count(), 0);
    }

    #[test]
    fn fixes_are_computed_only_on_request() {
        let oracle = hello_world_oracle(&["Foo", "Bar"]);
        let root = statement("Foo.Bar.Baz.Hello.World");
        let cancel = CancellationToken::new();

        let plain: Vec<Diagnostic> = QualificationScanner::default()
            .scan_tree(&root, &oracle, &cancel)
            .collect();
        assert_eq!(plain[0].fix, FixStatus::NotRequested);

        let scanner = QualificationScanner::default().with_fixes(true);
        let with_fixes: Vec<Diagnostic> = scanner.scan_tree(&root, &oracle, &cancel).collect();
        assert!(matches!(with_fixes[0].fix, FixStatus::Withheld { .. }));
    }
}
