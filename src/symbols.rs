//! Lightweight C# symbol model: declarations, scopes, and name lookup.
//!
//! This is deliberately shallow. It knows namespaces, types (with nesting),
//! member names, and the names of locals and parameters, and it binds simple
//! names the way C# does for those entities: locals first, then enclosing
//! types, then each enclosing namespace from the inside out together with the
//! `using` directives declared at that level. Inheritance and overloads are
//! out of reach, which is fine because anything it cannot bind is reported as
//! unknown and skipped.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::ops::Range;

use tree_sitter::Node;

use crate::error::Error;
use crate::oracle::{ScopeLookup, SymbolOracle};
use crate::syntax::node_text;
use crate::types::{AliasQualifiedName, ExpressionNode, ResolvedSymbol, SymbolKind};

/// Node kinds that declare a type.
const TYPE_DECLARATION_KINDS: &[&str] = &[
    "class_declaration",
    "delegate_declaration",
    "enum_declaration",
    "interface_declaration",
    "record_declaration",
    "struct_declaration",
];

/// Node kinds whose extent bounds the locals declared directly inside them.
const LOCAL_SCOPE_KINDS: &[&str] = &[
    "anonymous_method_expression",
    "arrow_expression_clause",
    "block",
    "catch_clause",
    "compilation_unit",
    "fixed_statement",
    "for_statement",
    "foreach_statement",
    "lambda_expression",
    "switch_expression_arm",
    "switch_section",
    "using_statement",
];

/// Pattern and designation kinds that introduce names through `name` fields.
const DESIGNATION_KINDS: &[&str] = &[
    "declaration_expression",
    "declaration_pattern",
    "parenthesized_variable_designation",
    "recursive_pattern",
    "var_pattern",
];

// ── Per-file collection ────────────────────────────────────────────────

/// A type declaration as written in one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredType {
    /// Member names declared directly in the body.
    pub members: Vec<String>,
    /// Simple name.
    pub name: String,
    /// Namespace the declaration sits in; empty for global.
    pub namespace: String,
    /// Simple names of the enclosing types, outermost first.
    pub outer: Vec<String>,
}

/// Everything one file contributes to the symbol table.
#[derive(Debug, Default)]
pub struct FileDeclarations {
    /// Fully qualified namespace names, as declared.
    pub namespaces: Vec<String>,
    /// Types in declaration order, outer before nested.
    pub types: Vec<DeclaredType>,
}

/// One `using` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsingDirective {
    /// `using Alias = Some.Target;`
    Alias {
        /// The alias introduced.
        alias: String,
        /// Dotted path the alias stands for.
        target: String,
    },
    /// `using Some.Namespace;`
    Namespace(String),
    /// `using static Some.Type;`
    Static(String),
}

/// A namespace block and the usings written inside it.
#[derive(Debug, Clone)]
struct NamespaceScope {
    /// Byte range the block covers.
    extent: Range<usize>,
    /// Fully qualified name.
    name: String,
    /// Directives declared at the top of the block.
    usings: Vec<UsingDirective>,
}

/// A type body, for member and nested-type lookup from inside it.
#[derive(Debug, Clone)]
struct TypeScope {
    /// Byte range of the declaration.
    extent: Range<usize>,
    /// Fully qualified name.
    qualified_name: String,
}

/// A parameter, local variable, pattern variable, or local function.
#[derive(Debug, Clone)]
struct LocalScope {
    /// Byte range in which the name is visible.
    extent: Range<usize>,
    /// Declared name.
    name: String,
}

/// Lexical scopes of one file.
#[derive(Debug, Default)]
pub struct FileScopes {
    /// Compilation-unit usings.
    file_usings: Vec<UsingDirective>,
    /// Locals and parameters, in document order.
    locals: Vec<LocalScope>,
    /// Namespace blocks, in document order.
    namespaces: Vec<NamespaceScope>,
    /// Type bodies, in document order.
    types: Vec<TypeScope>,
}

/// Walk a compilation unit and collect its declarations and scopes.
pub fn collect(root: Node<'_>, source: &str) -> (FileDeclarations, FileScopes) {
    let mut collector = Collector {
        declarations: FileDeclarations::default(),
        scopes: FileScopes::default(),
        source,
    };
    collector.compilation_unit(root);
    collector.locals(root);
    return (collector.declarations, collector.scopes);
}

/// Mutable state for one collection walk.
struct Collector<'s> {
    /// Declarations found so far.
    declarations: FileDeclarations,
    /// Scopes found so far.
    scopes: FileScopes,
    /// The file's text.
    source: &'s str,
}

impl Collector<'_> {
    /// Top level: file usings, namespaces, and types. A file-scoped namespace
    /// applies to every sibling after it.
    fn compilation_unit(&mut self, root: Node<'_>) {
        let mut namespace = String::new();
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            match child.kind() {
                "using_directive" => {
                    if let Some(using) = parse_using(node_text(child, self.source)) {
                        self.scopes.file_usings.push(using);
                    }
                },
                "file_scoped_namespace_declaration" => {
                    let Some(name) = declared_name(child, self.source) else { continue };
                    namespace = name;
                    self.declare_namespace(&namespace);
                    self.scopes.namespaces.push(NamespaceScope {
                        extent: child.start_byte()..root.end_byte(),
                        name: namespace.clone(),
                        usings: Vec::new(),
                    });
                },
                _ => self.member(child, &namespace, &[]),
            }
        }
    }

    /// A declaration inside a namespace or type body.
    fn member(&mut self, node: Node<'_>, namespace: &str, outer: &[String]) {
        if node.kind() == "namespace_declaration" {
            self.namespace_block(node, namespace);
        } else if TYPE_DECLARATION_KINDS.contains(&node.kind()) {
            self.type_declaration(node, namespace, outer);
        }
    }

    /// `namespace A.B { ... }`, possibly nested in another block.
    fn namespace_block(&mut self, node: Node<'_>, parent: &str) {
        let Some(name) = declared_name(node, self.source) else { return };
        let full = join(parent, &name);
        self.declare_namespace(&full);

        let Some(body) = node.child_by_field_name("body") else { return };
        let mut usings = Vec::new();
        let mut cursor = body.walk();
        let children: Vec<Node<'_>> = body.named_children(&mut cursor).collect();
        for child in &children {
            if child.kind() == "using_directive"
                && let Some(using) = parse_using(node_text(*child, self.source))
            {
                usings.push(using);
            }
        }
        self.scopes.namespaces.push(NamespaceScope {
            extent: node.start_byte()..node.end_byte(),
            name: full.clone(),
            usings,
        });

        for child in children {
            self.member(child, &full, &[]);
        }
    }

    /// A class, struct, interface, record, enum, or delegate.
    fn type_declaration(&mut self, node: Node<'_>, namespace: &str, outer: &[String]) {
        let Some(name_node) = node.child_by_field_name("name") else { return };
        let name = node_text(name_node, self.source).to_string();
        if name.is_empty() {
            return;
        }

        let mut path: Vec<String> = outer.to_vec();
        path.push(name.clone());
        let qualified_name = join(namespace, &path.join("."));

        let body = node.child_by_field_name("body");
        let mut members = Vec::new();
        let mut nested = Vec::new();
        if let Some(body) = body {
            let mut cursor = body.walk();
            for child in body.named_children(&mut cursor) {
                if TYPE_DECLARATION_KINDS.contains(&child.kind()) {
                    nested.push(child);
                } else {
                    members.extend(member_names(child, self.source));
                }
            }
        }

        tracing::trace!(%qualified_name, members = members.len(), "type declared");
        self.declarations.types.push(DeclaredType {
            members,
            name,
            namespace: namespace.to_string(),
            outer: outer.to_vec(),
        });
        self.scopes.types.push(TypeScope {
            extent: node.start_byte()..node.end_byte(),
            qualified_name,
        });

        for child in nested {
            self.type_declaration(child, namespace, &path);
        }
    }

    /// Record every name a method body can declare, anywhere under `node`.
    fn locals(&mut self, node: Node<'_>) {
        match node.kind() {
            "parameter" => {
                let owner = node.parent().and_then(|list| return list.parent());
                self.declare_local(node.child_by_field_name("name"), owner);
            },
            "implicit_parameter" => self.declare_local(Some(node), node.parent()),
            "catch_declaration" => self.declare_local(node.child_by_field_name("name"), node.parent()),
            "foreach_statement" => {
                let left = node.child_by_field_name("left").filter(|l| return l.kind() == "identifier");
                self.declare_local(left, Some(node));
            },
            "local_function_statement" | "variable_declarator" => {
                self.declare_local(node.child_by_field_name("name"), enclosing_local_scope(node));
            },
            kind if DESIGNATION_KINDS.contains(&kind) => {
                let scope = enclosing_local_scope(node);
                let mut cursor = node.walk();
                let names: Vec<Node<'_>> = node.children_by_field_name("name", &mut cursor).collect();
                for name in names {
                    self.declare_local(Some(name), scope);
                }
            },
            _ => {},
        }

        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
        for child in children {
            self.locals(child);
        }
    }

    /// Record `name` as visible across `scope`. Fields and other non-local
    /// declarators have no local scope and are ignored.
    fn declare_local(&mut self, name: Option<Node<'_>>, scope: Option<Node<'_>>) {
        let (Some(name), Some(scope)) = (name, scope) else { return };
        if !matches!(name.kind(), "identifier" | "implicit_parameter") {
            return;
        }
        let text = node_text(name, self.source);
        if text.is_empty() {
            return;
        }
        self.scopes.locals.push(LocalScope {
            extent: scope.start_byte()..scope.end_byte(),
            name: text.to_string(),
        });
    }

    /// Record a namespace name.
    fn declare_namespace(&mut self, name: &str) {
        self.declarations.namespaces.push(name.to_string());
    }
}

/// The nearest ancestor that bounds a local declared at `node`, or `None`
/// when a type declaration comes first (a field, for instance).
fn enclosing_local_scope(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if TYPE_DECLARATION_KINDS.contains(&ancestor.kind()) {
            return None;
        }
        if LOCAL_SCOPE_KINDS.contains(&ancestor.kind()) {
            return Some(ancestor);
        }
        current = ancestor.parent();
    }
    return None;
}

/// The whitespace-free text of a declaration's `name` field.
fn declared_name(node: Node<'_>, source: &str) -> Option<String> {
    let name = node.child_by_field_name("name")?;
    let text: String = node_text(name, source).split_whitespace().collect();
    return if text.is_empty() { None } else { Some(text) };
}

/// Names declared by one member of a type body.
fn member_names(node: Node<'_>, source: &str) -> Vec<String> {
    return match node.kind() {
        "enum_member_declaration" | "event_declaration" | "method_declaration"
        | "property_declaration" => node
            .child_by_field_name("name")
            .map(|n| return vec![node_text(n, source).to_string()])
            .unwrap_or_default(),
        "event_field_declaration" | "field_declaration" => {
            let mut names = Vec::new();
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if child.kind() != "variable_declaration" {
                    continue;
                }
                let mut inner = child.walk();
                for declarator in child.named_children(&mut inner) {
                    if declarator.kind() != "variable_declarator" {
                        continue;
                    }
                    if let Some(name) = declarator.child_by_field_name("name") {
                        names.push(node_text(name, source).to_string());
                    }
                }
            }
            names
        },
        _ => Vec::new(),
    };
}

/// Parse the text of a `using` directive. Returns `None` for anything that
/// does not look like one.
pub fn parse_using(text: &str) -> Option<UsingDirective> {
    let mut rest = text.trim().trim_end_matches(';').trim();
    if let Some(r) = rest.strip_prefix("global") {
        rest = r.trim_start();
    }
    rest = rest.strip_prefix("using")?.trim_start();

    let mut is_static = false;
    loop {
        if let Some(r) = rest.strip_prefix("static ") {
            is_static = true;
            rest = r.trim_start();
        } else if let Some(r) = rest.strip_prefix("unsafe ") {
            rest = r.trim_start();
        } else {
            break;
        }
    }

    if let Some((alias, target)) = rest.split_once('=') {
        let alias = alias.trim();
        let target = normalize_path(target);
        if alias.is_empty() || target.is_empty() {
            return None;
        }
        return Some(UsingDirective::Alias {
            alias: alias.to_string(),
            target,
        });
    }

    let path = normalize_path(rest);
    if path.is_empty() {
        return None;
    }
    if is_static {
        return Some(UsingDirective::Static(path));
    }
    return Some(UsingDirective::Namespace(path));
}

/// Strip whitespace and a leading `global::`.
fn normalize_path(path: &str) -> String {
    let compact: String = path.split_whitespace().collect();
    return compact.strip_prefix("global::").unwrap_or(&compact).to_string();
}

/// `parent.name`, or `name` at the global level.
fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        return name.to_string();
    }
    return format!("{parent}.{name}");
}

// ── Symbol table ───────────────────────────────────────────────────────

/// Index into `SymbolTable::types`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(usize);

/// A type known to the table, merged across partial declarations.
#[derive(Debug)]
struct TypeSymbol {
    /// Enclosing type, if nested.
    container: Option<TypeId>,
    /// Member names.
    members: HashSet<String>,
    /// Namespace the type lives in.
    namespace: String,
    /// Nested types by simple name.
    nested: HashMap<String, TypeId>,
    /// Fully qualified name.
    qualified_name: String,
}

/// An entity a name can bind to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Entity {
    /// A parameter or local variable by name.
    Local(String),
    /// A member of a type.
    Member {
        /// Member name.
        name: String,
        /// Declaring type.
        owner: TypeId,
    },
    /// A namespace by qualified name.
    Namespace(String),
    /// A type.
    Type(TypeId),
}

/// Outcome of binding a simple name.
#[derive(Debug)]
enum Binding {
    /// Several imported candidates.
    Ambiguous(Vec<Entity>),
    /// A single entity.
    Found(Entity),
    /// Nothing.
    NotFound,
}

/// Program-wide namespaces and types, built once and then read concurrently.
#[derive(Debug, Default)]
pub struct SymbolTable {
    /// Qualified names of top-level types and nested types.
    by_qualified_name: HashMap<String, TypeId>,
    /// Every namespace and all its prefixes.
    namespaces: HashSet<String>,
    /// All types.
    types: Vec<TypeSymbol>,
}

impl SymbolTable {
    /// Merge one file's declarations.
    pub fn add_file(&mut self, declarations: &FileDeclarations) {
        for namespace in &declarations.namespaces {
            self.declare_namespace(namespace);
        }
        for declared in &declarations.types {
            let id = self.ensure_type(&declared.namespace, &declared.outer, &declared.name);
            if let Some(symbol) = self.types.get_mut(id.0) {
                symbol.members.extend(declared.members.iter().cloned());
            }
        }
    }

    /// Register a type the analyzer cannot see, such as `System.Console`.
    /// Nested types are written with `+`: `System.Environment+SpecialFolder`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidExternType` if the entry is not a dotted path of identifiers.
    pub fn add_extern_type(&mut self, entry: &str) -> Result<(), Error> {
        let invalid = |reason| {
            return Error::InvalidExternType {
                entry: entry.to_string(),
                reason,
            };
        };

        let mut parts = entry.split('+');
        let head = parts.next().unwrap_or("");
        let nested: Vec<&str> = parts.collect();
        let (namespace, name) = head.rsplit_once('.').unwrap_or(("", head));

        let segments = namespace
            .split('.')
            .filter(|s| return !namespace.is_empty() || !s.is_empty())
            .chain(std::iter::once(name))
            .chain(nested.iter().copied());
        for segment in segments {
            if !is_identifier(segment) {
                return Err(invalid("segments must be identifiers"));
            }
        }

        self.declare_namespace(namespace);
        let mut outer: Vec<String> = Vec::new();
        let mut current = name;
        for inner in nested {
            self.ensure_type(namespace, &outer, current);
            outer.push(current.to_string());
            current = inner;
        }
        self.ensure_type(namespace, &outer, current);
        return Ok(());
    }

    /// Register a namespace and every prefix of it.
    fn declare_namespace(&mut self, name: &str) {
        let mut prefix = String::new();
        for segment in name.split('.').filter(|s| return !s.is_empty()) {
            prefix = join(&prefix, segment);
            self.namespaces.insert(prefix.clone());
        }
    }

    /// Find or create a type, creating missing outer types on the way.
    fn ensure_type(&mut self, namespace: &str, outer: &[String], name: &str) -> TypeId {
        let path = outer.iter().map(String::as_str).chain(std::iter::once(name)).collect::<Vec<_>>();
        let qualified_name = join(namespace, &path.join("."));
        if let Some(id) = self.by_qualified_name.get(&qualified_name) {
            return *id;
        }

        let container = match outer.split_last() {
            Some((last, rest)) => Some(self.ensure_type(namespace, rest, last)),
            None => None,
        };
        let id = TypeId(self.types.len());
        self.types.push(TypeSymbol {
            container,
            members: HashSet::new(),
            namespace: namespace.to_string(),
            nested: HashMap::new(),
            qualified_name: qualified_name.clone(),
        });
        self.by_qualified_name.insert(qualified_name, id);
        if let Some(parent) = container.and_then(|c| return self.types.get_mut(c.0)) {
            parent.nested.insert(name.to_string(), id);
        }
        return id;
    }

    /// A type declared directly in `namespace`.
    fn top_level_type(&self, namespace: &str, name: &str) -> Option<TypeId> {
        let id = *self.by_qualified_name.get(&join(namespace, name))?;
        let symbol = self.types.get(id.0)?;
        return if symbol.container.is_none() { Some(id) } else { None };
    }

    /// Bind `name` as a member of `entity`.
    fn member_of(&self, entity: &Entity, name: &str) -> Option<Entity> {
        match entity {
            Entity::Namespace(namespace) => {
                if let Some(id) = self.top_level_type(namespace, name) {
                    return Some(Entity::Type(id));
                }
                let child = join(namespace, name);
                return self.namespaces.contains(&child).then_some(Entity::Namespace(child));
            },
            Entity::Type(id) => {
                let symbol = self.types.get(id.0)?;
                if let Some(nested) = symbol.nested.get(name) {
                    return Some(Entity::Type(*nested));
                }
                return symbol.members.contains(name).then(|| {
                    return Entity::Member {
                        name: name.to_string(),
                        owner: *id,
                    };
                });
            },
            Entity::Local(_) | Entity::Member { .. } => return None,
        }
    }

    /// Bind a dotted path from the global namespace.
    fn resolve_path(&self, path: &str) -> Option<Entity> {
        return path
            .split('.')
            .try_fold(Entity::Namespace(String::new()), |entity, segment| {
                return self.member_of(&entity, segment);
            });
    }

    /// Describe an entity in the oracle's vocabulary.
    fn describe(&self, entity: &Entity) -> ResolvedSymbol {
        match entity {
            Entity::Local(name) => {
                return ResolvedSymbol {
                    containing_namespace: String::new(),
                    containing_type: None,
                    kind: SymbolKind::Local,
                    qualified_name: name.clone(),
                };
            },
            Entity::Namespace(name) => {
                return ResolvedSymbol {
                    containing_namespace: name.rsplit_once('.').map(|(p, _)| return p).unwrap_or("").to_string(),
                    containing_type: None,
                    kind: SymbolKind::Namespace,
                    qualified_name: name.clone(),
                };
            },
            Entity::Type(id) => {
                let Some(symbol) = self.types.get(id.0) else {
                    return ResolvedSymbol::unknown();
                };
                return ResolvedSymbol {
                    containing_namespace: symbol.namespace.clone(),
                    containing_type: symbol.container.and_then(|c| return self.qualified_name(c)),
                    kind: SymbolKind::NamedType,
                    qualified_name: symbol.qualified_name.clone(),
                };
            },
            Entity::Member { name, owner } => {
                let Some(symbol) = self.types.get(owner.0) else {
                    return ResolvedSymbol::unknown();
                };
                return ResolvedSymbol {
                    containing_namespace: symbol.namespace.clone(),
                    containing_type: Some(symbol.qualified_name.clone()),
                    kind: SymbolKind::Member,
                    qualified_name: join(&symbol.qualified_name, name),
                };
            },
        }
    }

    /// Qualified name of a type.
    fn qualified_name(&self, id: TypeId) -> Option<String> {
        return self.types.get(id.0).map(|t| return t.qualified_name.clone());
    }
}

/// Whether `s` is a plain C# identifier (ASCII subset, optional `@`).
fn is_identifier(s: &str) -> bool {
    let s = s.strip_prefix('@').unwrap_or(s);
    let mut chars = s.chars();
    let Some(first) = chars.next() else { return false };
    return (first.is_alphabetic() || first == '_') && chars.all(|c| return c.is_alphanumeric() || c == '_');
}

// ── Semantic model ─────────────────────────────────────────────────────

/// The oracle for one file: the shared table plus that file's scopes.
pub struct SemanticModel<'a> {
    /// That file's scopes.
    scopes: &'a FileScopes,
    /// Program-wide declarations.
    table: &'a SymbolTable,
}

impl<'a> SemanticModel<'a> {
    /// Pair the program's table with one file's scopes.
    pub const fn new(table: &'a SymbolTable, scopes: &'a FileScopes) -> Self {
        return Self { scopes, table };
    }

    /// Bind an expression to an entity.
    fn entity_of(&self, node: &ExpressionNode) -> Option<Entity> {
        match node {
            ExpressionNode::AliasQualified(qualified) => return self.alias_qualified(qualified),
            ExpressionNode::Identifier(name) => match self.bind(name.span.start, &name.identifier) {
                Binding::Found(entity) => return Some(entity),
                Binding::Ambiguous(_) | Binding::NotFound => return None,
            },
            ExpressionNode::MemberAccess(access) => {
                let left = self.entity_of(&access.left)?;
                return self.table.member_of(&left, &access.name.identifier);
            },
            ExpressionNode::Other { .. } => return None,
        }
    }

    /// `global::Name` starts at the global namespace; any other alias must
    /// be a using alias visible at the name.
    fn alias_qualified(&self, qualified: &AliasQualifiedName) -> Option<Entity> {
        let root = if qualified.alias.identifier == "global" {
            Entity::Namespace(String::new())
        } else {
            self.namespace_levels(qualified.span.start)
                .into_iter()
                .flat_map(|(_, usings)| return usings)
                .find_map(|using| {
                    return match using {
                        UsingDirective::Alias { alias, target } if alias == qualified.alias.identifier => Some(target),
                        UsingDirective::Alias { .. } | UsingDirective::Namespace(_) | UsingDirective::Static(_) => None,
                    };
                })
                .and_then(|target| return self.table.resolve_path(&target))?
        };
        return self.table.member_of(&root, &qualified.name.identifier);
    }

    /// Bind a simple name as it would be bound at `offset`.
    fn bind(&self, offset: usize, name: &str) -> Binding {
        if let Some(local) = self.bind_local(offset, name) {
            return Binding::Found(local);
        }
        if let Some(entity) = self.bind_in_enclosing_types(offset, name) {
            return Binding::Found(entity);
        }

        for (level, usings) in self.namespace_levels(offset) {
            if let Some(id) = self.table.top_level_type(&level, name) {
                return Binding::Found(Entity::Type(id));
            }
            let namespace = join(&level, name);
            if self.table.namespaces.contains(&namespace) {
                return Binding::Found(Entity::Namespace(namespace));
            }
            match self.bind_through_usings(&usings, name) {
                Binding::NotFound => {},
                binding => return binding,
            }
        }
        return Binding::NotFound;
    }

    /// A local or parameter named `name` visible at `offset`.
    fn bind_local(&self, offset: usize, name: &str) -> Option<Entity> {
        return self
            .scopes
            .locals
            .iter()
            .filter(|local| return local.name == name && local.extent.contains(&offset))
            .max_by_key(|local| return local.extent.start)
            .map(|local| return Entity::Local(local.name.clone()));
    }

    /// Nested types and members of the types around `offset`, innermost first.
    fn bind_in_enclosing_types(&self, offset: usize, name: &str) -> Option<Entity> {
        let mut enclosing: Vec<&TypeScope> = self
            .scopes
            .types
            .iter()
            .filter(|t| return t.extent.contains(&offset))
            .collect();
        enclosing.sort_by_key(|t| return std::cmp::Reverse(t.extent.start));

        return enclosing.into_iter().find_map(|scope| {
            let id = *self.table.by_qualified_name.get(&scope.qualified_name)?;
            return self.table.member_of(&Entity::Type(id), name);
        });
    }

    /// Lookup levels at `offset`, innermost first: every prefix of the
    /// innermost namespace, then the global level, each with its usings.
    fn namespace_levels(&self, offset: usize) -> Vec<(String, Vec<UsingDirective>)> {
        let enclosing: Vec<&NamespaceScope> = self
            .scopes
            .namespaces
            .iter()
            .filter(|n| return n.extent.contains(&offset))
            .collect();
        let innermost = enclosing
            .iter()
            .max_by_key(|n| return n.extent.start)
            .map(|n| return n.name.as_str())
            .unwrap_or("");

        let mut names: Vec<String> = Vec::new();
        let mut current = innermost;
        while !current.is_empty() {
            names.push(current.to_string());
            current = current.rsplit_once('.').map(|(p, _)| return p).unwrap_or("");
        }

        let mut levels: Vec<(String, Vec<UsingDirective>)> = names
            .into_iter()
            .map(|level| {
                let usings = enclosing
                    .iter()
                    .filter(|n| return n.name == level)
                    .flat_map(|n| return n.usings.iter().cloned())
                    .collect();
                return (level, usings);
            })
            .collect();
        levels.push((String::new(), self.scopes.file_usings.clone()));
        return levels;
    }

    /// Candidates imported by one level's usings.
    fn bind_through_usings(&self, usings: &[UsingDirective], name: &str) -> Binding {
        for using in usings {
            if let UsingDirective::Alias { alias, target } = using
                && alias == name
                && let Some(entity) = self.table.resolve_path(target)
            {
                return Binding::Found(entity);
            }
        }

        let mut candidates: BTreeSet<Entity> = BTreeSet::new();
        for using in usings {
            match using {
                UsingDirective::Alias { .. } => {},
                UsingDirective::Namespace(namespace) => {
                    if let Some(id) = self.table.top_level_type(namespace, name) {
                        candidates.insert(Entity::Type(id));
                    }
                },
                UsingDirective::Static(path) => {
                    let Some(owner @ Entity::Type(_)) = self.table.resolve_path(path) else {
                        continue;
                    };
                    if let Some(entity) = self.table.member_of(&owner, name) {
                        candidates.insert(entity);
                    }
                },
            }
        }

        let mut candidates: Vec<Entity> = candidates.into_iter().collect();
        return match candidates.len() {
            0 => Binding::NotFound,
            1 => candidates.pop().map_or(Binding::NotFound, Binding::Found),
            _ => Binding::Ambiguous(candidates),
        };
    }
}

impl SymbolOracle for SemanticModel<'_> {
    fn lookup_in_scope(&self, offset: usize, name: &str) -> ScopeLookup {
        match self.bind(offset, name) {
            Binding::Ambiguous(candidates) => {
                let mut names: Vec<String> = candidates
                    .iter()
                    .map(|c| return self.table.describe(c).qualified_name)
                    .collect();
                names.sort();
                return ScopeLookup::Ambiguous(names);
            },
            Binding::Found(entity) => return ScopeLookup::Unique(self.table.describe(&entity)),
            Binding::NotFound => return ScopeLookup::NotFound,
        }
    }

    fn resolve(&self, node: &ExpressionNode) -> ResolvedSymbol {
        return self
            .entity_of(node)
            .map_or_else(ResolvedSymbol::unknown, |entity| return self.table.describe(&entity));
    }
}
