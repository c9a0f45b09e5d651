//! The symbol-resolution capability the rule consumes.
//!
//! The rule never looks at declarations itself. It asks an oracle what a node
//! denotes and whether a short name would bind unambiguously at a location.
//! `symbols::SemanticModel` is the real implementation; tests use stubs.

use crate::types::{ExpressionNode, ResolvedSymbol};

/// Result of looking up a simple name in the scopes enclosing an offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeLookup {
    /// Several candidates are visible; using the name would not compile.
    Ambiguous(Vec<String>),
    /// Nothing named this is visible.
    NotFound,
    /// Exactly one entity is visible under this name.
    Unique(ResolvedSymbol),
}

/// Maps syntax nodes to the semantic entities they denote.
///
/// Implementations are queried concurrently from several scanner threads, so
/// they must be read-only once built.
pub trait SymbolOracle: Sync {
    /// Look up `name` as it would bind at byte `offset`.
    fn lookup_in_scope(&self, offset: usize, name: &str) -> ScopeLookup;

    /// Classify `node`. Failure is `ResolvedSymbol::unknown()`, never an error.
    fn resolve(&self, node: &ExpressionNode) -> ResolvedSymbol;
}
