//! Core domain types: syntax nodes handed to the rule, resolved symbols, and findings.
use serde::Serialize;

/// Location of a node in its source file.
/// Line and column are 1-based and only used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    /// One-based column (in bytes) of the first character.
    pub column: u32,
    /// Length in bytes.
    pub len: usize,
    /// One-based line of the first character.
    pub line: u32,
    /// Byte offset of the first character.
    pub start: usize,
}

impl Span {
    /// Byte offset one past the last character.
    pub const fn end(&self) -> usize {
        return self.start.saturating_add(self.len);
    }
}

/// A node of the host-supplied expression tree.
/// The analyzer only ever reads these; it never rewrites the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpressionNode {
    /// `alias::Name`, most often `global::Foo`.
    AliasQualified(AliasQualifiedName),
    /// A bare name such as `Foo`.
    Identifier(SimpleName),
    /// `left.name`.
    MemberAccess(MemberAccess),
    /// Anything else; kept only so nested member accesses stay reachable.
    Other {
        /// Child nodes in document order.
        children: Vec<ExpressionNode>,
        /// Extent of the node.
        span: Span,
    },
}

impl ExpressionNode {
    /// Extent of the node in the source.
    pub const fn span(&self) -> Span {
        return match self {
            ExpressionNode::AliasQualified(qualified) => qualified.span,
            ExpressionNode::Identifier(name) => name.span,
            ExpressionNode::MemberAccess(access) => access.span,
            ExpressionNode::Other { span, .. } => *span,
        };
    }

    /// Direct children in document order.
    pub fn children(&self) -> Vec<&ExpressionNode> {
        return match self {
            ExpressionNode::AliasQualified(_) | ExpressionNode::Identifier(_) => Vec::new(),
            ExpressionNode::MemberAccess(access) => vec![access.left.as_ref()],
            ExpressionNode::Other { children, .. } => children.iter().collect(),
        };
    }
}

/// An alias-qualified name such as `global::Foo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasQualifiedName {
    /// The alias left of `::`.
    pub alias: SimpleName,
    /// The name right of `::`.
    pub name: SimpleName,
    /// Extent of the whole name.
    pub span: Span,
}

/// A member-access expression, `left.name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberAccess {
    /// The operand to the left of the final dot.
    pub left: Box<ExpressionNode>,
    /// The right-hand simple name.
    pub name: SimpleName,
    /// Extent of the whole expression.
    pub span: Span,
    /// Exact source text of the whole expression, e.g. `Foo.Bar.Baz`.
    pub text: String,
}

/// A simple (possibly generic) name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleName {
    /// The bare identifier used for lookup: `List` for `List<int>`.
    pub identifier: String,
    /// Extent of the name.
    pub span: Span,
    /// Exact source text, including any type argument list.
    pub text: String,
}

/// What kind of entity a name denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SymbolKind {
    /// A parameter or local variable.
    Local,
    /// Field, method, property, event, or enum member.
    Member,
    /// A class, struct, interface, record, enum, or delegate.
    NamedType,
    /// A namespace.
    Namespace,
    /// Resolution failed.
    Unknown,
}

/// The oracle's answer for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSymbol {
    /// Namespace the entity lives in; empty for the global namespace.
    pub containing_namespace: String,
    /// Qualified name of the enclosing type, absent for top-level entities.
    pub containing_type: Option<String>,
    /// Kind of entity.
    pub kind: SymbolKind,
    /// Fully qualified name, e.g. `Foo.Bar.Baz`.
    pub qualified_name: String,
}

impl ResolvedSymbol {
    /// A type reachable through a namespace path rather than an outer type.
    pub fn is_namespaced_type(&self) -> bool {
        return self.kind == SymbolKind::NamedType && self.containing_type.is_none();
    }

    /// The answer for anything the oracle cannot classify.
    pub const fn unknown() -> Self {
        return Self {
            containing_namespace: String::new(),
            containing_type: None,
            kind: SymbolKind::Unknown,
            qualified_name: String::new(),
        };
    }
}

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Worth fixing; never fails a build on its own.
    Warning,
}

impl Severity {
    /// Lowercase label used in text output.
    pub const fn label(self) -> &'static str {
        return match self {
            Severity::Warning => "warning",
        };
    }
}

/// One finding reported by a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// The single message-format argument, the full qualified text.
    pub argument: String,
    /// Suggested rewrite, when one was requested.
    pub fix: FixStatus,
    /// Rendered message.
    pub message: String,
    /// Stable rule identifier, e.g. `WI01001`.
    pub rule_id: &'static str,
    /// Severity of the finding.
    pub severity: Severity,
    /// Extent of the reported member access.
    pub span: Span,
}

/// A text edit: replace `span` with `replacement`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fix {
    /// Replacement text. Empty means delete.
    pub replacement: String,
    /// The qualification prefix, including the trailing dot.
    pub span: Span,
}

/// Why an automatic fix was not offered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FixRejection {
    /// The short name would match several symbols at this location.
    Ambiguous {
        /// Qualified names of the colliding candidates.
        candidates: Vec<String>,
    },
    /// The short name does not resolve at this location (missing `using`).
    NotInScope,
    /// The short name resolves, but to a different entity.
    ResolvesElsewhere {
        /// Qualified name the short form would bind to.
        target: String,
    },
}

impl std::fmt::Display for FixRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return match self {
            FixRejection::Ambiguous { candidates } => {
                write!(f, "short name is ambiguous ({})", candidates.join(", "))
            },
            FixRejection::NotInScope => write!(f, "short name is not in scope"),
            FixRejection::ResolvesElsewhere { target } => {
                write!(f, "short name would bind to `{target}`")
            },
        };
    }
}

/// Outcome of the code-fix step for one diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FixStatus {
    /// The host only asked for analysis.
    NotRequested,
    /// A safe rewrite.
    Offered {
        /// The edit to apply.
        fix: Fix,
    },
    /// The fix was computed but is unsafe to apply.
    Withheld {
        /// Reason the fix is unsafe.
        rejection: FixRejection,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, len: usize) -> Span {
        Span { column: 1, len, line: 1, start }
    }

    #[test]
    fn span_end_is_exclusive() {
        let s = span(4, 3);
        assert_eq!(s.end(), 7);
        assert_eq!(span(0, 0).end(), 0);
    }

    #[test]
    fn nested_types_are_not_namespaced() {
        let nested = ResolvedSymbol {
            containing_namespace: "Foo.Bar".to_string(),
            containing_type: Some("Foo.Bar.Baz".to_string()),
            kind: SymbolKind::NamedType,
            qualified_name: "Foo.Bar.Baz.Hello".to_string(),
        };
        assert!(!nested.is_namespaced_type());
        assert!(!ResolvedSymbol::unknown().is_namespaced_type());
    }
}
