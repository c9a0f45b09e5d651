//! The redundant-qualification rule: decides reportability for a matched
//! member access and computes the code fix.

use serde::Serialize;

use crate::oracle::{ScopeLookup, SymbolOracle};
use crate::types::{Diagnostic, Fix, FixRejection, FixStatus, MemberAccess, ResolvedSymbol, Severity, Span};

/// Stable identifier reported with every finding of this rule.
pub const DIAGNOSTIC_ID: &str = "WI01001";

/// Static description of a rule, supplied at construction time.
#[derive(Debug, Clone, Serialize)]
pub struct RuleDescriptor {
    /// Grouping label shown by `idiom info`.
    pub category: &'static str,
    /// Longer explanation of what the rule checks.
    pub description: &'static str,
    /// Whether the rule runs when the config says nothing about it.
    pub enabled_by_default: bool,
    /// Stable identifier.
    pub id: &'static str,
    /// Message with a single `{0}` placeholder.
    pub message_format: &'static str,
    /// Severity of every finding.
    pub severity: Severity,
    /// One-line summary.
    pub title: &'static str,
}

impl RuleDescriptor {
    /// Substitute the single message argument.
    pub fn format_message(&self, argument: &str) -> String {
        return self.message_format.replace("{0}", argument);
    }
}

impl Default for RuleDescriptor {
    fn default() -> Self {
        return Self {
            category: "Lang",
            description: "A type referenced through its full namespace path can be \
                          referenced by its simple name when that name is in scope.",
            enabled_by_default: true,
            id: DIAGNOSTIC_ID,
            message_format: "Type name '{0}' is unnecessarily qualified",
            severity: Severity::Warning,
            title: "Unnecessary namespace qualification",
        };
    }
}

/// Pure per-node classification. Holds no state between nodes.
#[derive(Debug, Clone, Default)]
pub struct RedundancyRule {
    /// Identity and wording of the findings.
    descriptor: RuleDescriptor,
}

impl RedundancyRule {
    /// Build a rule reporting with the given descriptor.
    pub const fn new(descriptor: RuleDescriptor) -> Self {
        return Self { descriptor };
    }

    /// The descriptor this rule reports with.
    pub const fn descriptor(&self) -> &RuleDescriptor {
        return &self.descriptor;
    }

    /// Report `access` if its written form carries a qualification prefix.
    /// The caller has already established that `symbol` is a namespaced type.
    pub fn evaluate(&self, access: &MemberAccess, symbol: &ResolvedSymbol) -> Option<Diagnostic> {
        if !symbol.is_namespaced_type() {
            return None;
        }

        let full_text = access.text.as_str();
        let short_text = access.name.text.as_str();
        if full_text == short_text {
            return None;
        }

        return Some(Diagnostic {
            argument: full_text.to_string(),
            fix: FixStatus::NotRequested,
            message: self.descriptor.format_message(full_text),
            rule_id: self.descriptor.id,
            severity: self.descriptor.severity,
            span: access.span,
        });
    }

    /// Compute the rewrite that drops the qualification prefix.
    ///
    /// The fix is only offered when the short identifier, looked up in the
    /// scopes enclosing the access, binds to exactly the matched type. A local
    /// or parameter of the same name counts as binding elsewhere.
    ///
    /// # Errors
    ///
    /// Returns the `FixRejection` describing why the shortened form would not
    /// mean the same thing.
    pub fn suggest_fix(
        &self,
        access: &MemberAccess,
        symbol: &ResolvedSymbol,
        oracle: &dyn SymbolOracle,
    ) -> Result<Fix, FixRejection> {
        match oracle.lookup_in_scope(access.span.start, &access.name.identifier) {
            ScopeLookup::Ambiguous(candidates) => return Err(FixRejection::Ambiguous { candidates }),
            ScopeLookup::NotFound => return Err(FixRejection::NotInScope),
            ScopeLookup::Unique(bound) if bound != *symbol => {
                return Err(FixRejection::ResolvesElsewhere { target: bound.qualified_name });
            },
            ScopeLookup::Unique(_) => {},
        }

        return Ok(Fix {
            replacement: String::new(),
            span: qualification_prefix(access),
        });
    }
}

/// Span from the start of the access up to the final name, covering `Foo.Bar.`.
fn qualification_prefix(access: &MemberAccess) -> Span {
    let len = access.name.span.start.saturating_sub(access.span.start);
    return Span {
        column: access.span.column,
        len,
        line: access.span.line,
        start: access.span.start,
    };
}
