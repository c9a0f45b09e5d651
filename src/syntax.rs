//! Tree-sitter parsing and lowering of the C# CST into `ExpressionNode` trees.
use std::path::Path;

use tree_sitter::{Language, Node, Parser, Tree};

use crate::error::Error;
use crate::types::{AliasQualifiedName, ExpressionNode, MemberAccess, SimpleName, Span};

/// Maximum source file size (16 MiB).
pub const MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Parents whose children are written in type syntax, not expression syntax.
const TYPE_CONTEXT_KINDS: &[&str] = &[
    "array_type",
    "attribute",
    "base_list",
    "catch_declaration",
    "file_scoped_namespace_declaration",
    "namespace_declaration",
    "nullable_type",
    "pointer_type",
    "ref_type",
    "sizeof_expression",
    "tuple_element",
    "type_argument_list",
    "type_parameter_constraint",
    "typeof_expression",
    "using_directive",
];

/// Fields that hold a declared name or a type rather than an expression.
const TYPE_FIELDS: &[&str] = &["name", "returns", "type"];

/// Patterns after `is` that C# reads as a type when they spell a dotted name.
const TYPE_OR_CONSTANT_PATTERNS: &[&str] = &[
    "and_pattern",
    "constant_pattern",
    "negated_pattern",
    "or_pattern",
    "parenthesized_pattern",
];

/// Whether a node sits in expression syntax or type syntax.
/// Only expression syntax produces member accesses; `Foo.Bar.Baz x;` does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Expression,
    Type,
}

/// Parse source into a tree-sitter tree.
///
/// # Errors
///
/// Returns `Error::FileTooLarge` if the source exceeds the size limit,
/// or `Error::ParseFailed` if the language cannot be set or parsing fails.
pub fn parse_source(file_path: &Path, source: &str, language: &Language) -> Result<Tree, Error> {
    let source_len: u64 = source.len().try_into().unwrap_or(u64::MAX);
    if source_len > MAX_FILE_SIZE {
        return Err(Error::FileTooLarge {
            file: file_path.to_path_buf(),
            size_bytes: source_len,
            max_bytes: MAX_FILE_SIZE,
        });
    }

    let mut parser = Parser::new();
    parser.set_language(language).map_err(|e| {
        return Error::ParseFailed {
            file: file_path.to_path_buf(),
            reason: e.to_string(),
        };
    })?;

    return parser.parse(source, None).ok_or_else(|| {
        return Error::ParseFailed {
            file: file_path.to_path_buf(),
            reason: "tree-sitter returned None".to_string(),
        };
    });
}

/// Span of a tree-sitter node.
pub fn span_of(node: Node<'_>) -> Span {
    let position = node.start_position();
    return Span {
        column: u32::try_from(position.column).unwrap_or(u32::MAX).saturating_add(1),
        len: node.end_byte().saturating_sub(node.start_byte()),
        line: u32::try_from(position.row).unwrap_or(u32::MAX).saturating_add(1),
        start: node.start_byte(),
    };
}

/// Source text covered by a node, or `""` if the range is not valid UTF-8.
pub fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    return node.utf8_text(source.as_bytes()).unwrap_or("");
}

/// Lower a whole compilation unit. The root is always `Other`, so an empty
/// file lowers to an empty tree.
pub fn lower(root: Node<'_>, source: &str) -> ExpressionNode {
    return ExpressionNode::Other {
        children: lower_children(root, source, Position::Expression),
        span: span_of(root),
    };
}

/// Lower every named child of `node`, dropping subtrees with nothing to scan.
fn lower_children(node: Node<'_>, source: &str, position: Position) -> Vec<ExpressionNode> {
    let mut cursor = node.walk();
    return node
        .named_children(&mut cursor)
        .filter_map(|child| return lower_node(child, source, child_position(node, child, position)))
        .collect();
}

/// Decide the syntactic position of `child` from its parent's.
fn child_position(parent: Node<'_>, child: Node<'_>, parent_position: Position) -> Position {
    if is_type_operand(parent, child) {
        return Position::Type;
    }
    if parent_position == Position::Type && TYPE_OR_CONSTANT_PATTERNS.contains(&parent.kind()) {
        return Position::Type;
    }
    if child.kind().ends_with("_expression") {
        return Position::Expression;
    }
    if parent_position == Position::Type || TYPE_CONTEXT_KINDS.contains(&parent.kind()) {
        return Position::Type;
    }
    let in_type_field = TYPE_FIELDS
        .iter()
        .any(|field| return parent.child_by_field_name(field) == Some(child));
    if in_type_field {
        return Position::Type;
    }
    return Position::Expression;
}

/// The right operand of `as` or `is`, or a dotted pattern after `is`.
fn is_type_operand(parent: Node<'_>, child: Node<'_>) -> bool {
    return match parent.kind() {
        "as_expression" | "is_expression" => parent.child_by_field_name("right") == Some(child),
        "is_pattern_expression" => {
            parent.child_by_field_name("pattern") == Some(child)
                && TYPE_OR_CONSTANT_PATTERNS.contains(&child.kind())
        },
        _ => false,
    };
}

/// Lower one CST node.
fn lower_node(node: Node<'_>, source: &str, position: Position) -> Option<ExpressionNode> {
    return match node.kind() {
        "comment" | "using_directive" => None,
        "identifier" => Some(ExpressionNode::Identifier(simple_name(node, source)?)),
        "member_access_expression" if position == Position::Type => None,
        "member_access_expression" => Some(lower_access(node, source, "expression")),
        "qualified_name" if position == Position::Expression => {
            Some(lower_access(node, source, "qualifier"))
        },
        "alias_qualified_name" if position == Position::Expression => lower_alias_qualified(node, source),
        _ => lower_other(node, source, position),
    };
}

/// Lower a node that is not itself interesting, keeping it only if some
/// descendant is.
fn lower_other(node: Node<'_>, source: &str, position: Position) -> Option<ExpressionNode> {
    let children = lower_children(node, source, position);
    if children.is_empty() {
        return None;
    }
    return Some(ExpressionNode::Other {
        children,
        span: span_of(node),
    });
}

/// Lower `left.name` where the left operand lives in `left_field`.
/// Pointer access (`p->x`) and names that are not simple names fall back to `Other`.
fn lower_access(node: Node<'_>, source: &str, left_field: &str) -> ExpressionNode {
    let mut cursor = node.walk();
    let left = node
        .child_by_field_name(left_field)
        .or_else(|| return node.named_children(&mut cursor).next());
    let name = node
        .child_by_field_name("name")
        .or_else(|| return node.named_children(&mut cursor).last());

    let (Some(left), Some(name_node)) = (left, name) else {
        return opaque(node, source);
    };
    let Some(name) = simple_name(name_node, source) else {
        return opaque(node, source);
    };
    let operator = source.get(left.end_byte()..name_node.start_byte()).unwrap_or("");
    if operator.contains("->") {
        return opaque(node, source);
    }

    let left = lower_node(left, source, Position::Expression).unwrap_or_else(|| {
        return ExpressionNode::Other {
            children: Vec::new(),
            span: span_of(left),
        };
    });

    return ExpressionNode::MemberAccess(MemberAccess {
        left: Box::new(left),
        name,
        span: span_of(node),
        text: node_text(node, source).to_string(),
    });
}

/// Lower `alias::Name`; anything else under `::` is dropped.
fn lower_alias_qualified(node: Node<'_>, source: &str) -> Option<ExpressionNode> {
    let alias = simple_name(node.child_by_field_name("alias")?, source)?;
    let name = simple_name(node.child_by_field_name("name")?, source)?;
    return Some(ExpressionNode::AliasQualified(AliasQualifiedName {
        alias,
        name,
        span: span_of(node),
    }));
}

/// A node kept as `Other` regardless of content.
fn opaque(node: Node<'_>, source: &str) -> ExpressionNode {
    return ExpressionNode::Other {
        children: lower_children(node, source, Position::Expression),
        span: span_of(node),
    };
}

/// Read an `identifier` or `generic_name` node as a simple name.
fn simple_name(node: Node<'_>, source: &str) -> Option<SimpleName> {
    let identifier = match node.kind() {
        "identifier" => node_text(node, source),
        "generic_name" => {
            let mut cursor = node.walk();
            let ident = node
                .named_children(&mut cursor)
                .find(|c| return c.kind() == "identifier")?;
            node_text(ident, source)
        },
        _ => return None,
    };
    if identifier.is_empty() {
        return None;
    }

    return Some(SimpleName {
        identifier: identifier.to_string(),
        span: span_of(node),
        text: node_text(node, source).to_string(),
    });
}
