//! Host-interface program model.
//!
//! The host compiler/IDE supplies a parsed program as a semantic operation
//! tree plus a symbol table; this engine never parses C# text itself. Each
//! compilation unit owns an arena of operation nodes in document order;
//! nodes carry a parent back-reference, a source span, and the enclosing
//! method symbol. Operations form a closed tagged union so every rule can
//! pattern-match exhaustively.
//!
//! The symbol table exposes the three relation walks the rules depend on:
//! the base-type chain (`is_base_type_of`), the interface closure
//! (`implements`), and the override chain (`is_overridden_by`). All three
//! are small upward walks over explicit relations; no inheritance modeling
//! happens in this crate.

use std::collections::BTreeMap;

use serde::Serialize;

use gantry_core::patch::{Span, UnitId};
use gantry_core::text::byte_offset_to_position;
use gantry_core::types::Location;

// ============================================================================
// Symbol Ids
// ============================================================================

macro_rules! symbol_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub struct $name(pub u32);
    };
}

symbol_id!(
    /// Handle to a named type in the symbol table.
    TypeId
);
symbol_id!(
    /// Handle to a method (or constructor) in the symbol table.
    MethodId
);
symbol_id!(
    /// Handle to a property in the symbol table.
    PropertyId
);
symbol_id!(
    /// Handle to a local variable in the symbol table.
    LocalId
);

/// Handle to one operation node within one unit's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId {
    /// The unit owning the node.
    pub unit: UnitId,
    /// Index into the unit's node arena.
    pub index: u32,
}

// ============================================================================
// Symbols
// ============================================================================

/// A named type: class, interface, attribute class, or static holder of
/// extension methods.
#[derive(Debug, Clone)]
pub struct TypeSymbol {
    /// Simple name, e.g. `Counter`.
    pub name: String,
    /// Fully-qualified metadata name, e.g.
    /// `Microsoft.AspNetCore.Components.ComponentBase`.
    pub qualified_name: String,
    /// Direct base type, if any.
    pub base: Option<TypeId>,
    /// Directly declared interfaces.
    pub interfaces: Vec<TypeId>,
    /// Whether values of this type are stack-only (`ref struct`).
    pub is_ref_like: bool,
}

/// How an argument is passed to a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// Plain by-value passing.
    Value,
    /// `ref` modifier.
    Ref,
    /// `out` modifier.
    Out,
    /// `in` (readonly reference) modifier.
    In,
}

/// One declared parameter of a method or lambda.
#[derive(Debug, Clone)]
pub struct ParamSymbol {
    /// Parameter name.
    pub name: String,
    /// Declared type, when the host resolved one.
    pub ty: Option<TypeId>,
    /// Passing convention.
    pub ref_kind: RefKind,
    /// Declaration site, when the parameter has one in this session.
    pub decl: Option<(UnitId, Span)>,
    /// Span of the passing-convention modifier token (including trailing
    /// whitespace), when present. Consumed by the modifier-removal fixer.
    pub modifier_span: Option<(UnitId, Span)>,
}

impl ParamSymbol {
    /// A by-value parameter with no declaration site.
    pub fn by_value(name: impl Into<String>, ty: Option<TypeId>) -> Self {
        ParamSymbol {
            name: name.into(),
            ty,
            ref_kind: RefKind::Value,
            decl: None,
            modifier_span: None,
        }
    }
}

/// Kind of a method symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Ordinary,
    Constructor,
}

/// A method or constructor.
#[derive(Debug, Clone)]
pub struct MethodSymbol {
    /// Simple name.
    pub name: String,
    /// The type declaring this method.
    pub containing_type: TypeId,
    /// Ordinary method or constructor.
    pub kind: MethodKind,
    /// The method this one directly overrides, if any.
    pub overrides: Option<MethodId>,
    /// Declared parameters.
    pub params: Vec<ParamSymbol>,
    /// Declared return type, when the host resolved one.
    pub return_type: Option<TypeId>,
    /// Attribute classes applied to this method.
    pub attributes: Vec<TypeId>,
    /// Body root node, when the body is visible to this session.
    pub body: Option<NodeId>,
    /// Declaration sites; partial methods may have several.
    pub declarations: Vec<(UnitId, Span)>,
}

/// A property declaration.
#[derive(Debug, Clone)]
pub struct PropertySymbol {
    /// Simple name.
    pub name: String,
    /// The type declaring this property.
    pub containing_type: TypeId,
    /// Attribute classes applied to this property.
    pub attributes: Vec<TypeId>,
    /// Declaration site, when visible to this session.
    pub decl: Option<(UnitId, Span)>,
}

/// A local variable.
#[derive(Debug, Clone)]
pub struct LocalSymbol {
    /// Local name.
    pub name: String,
    /// The declaration node that introduced this local, when visible.
    pub decl_node: Option<NodeId>,
}

// ============================================================================
// Symbol Table
// ============================================================================

/// Immutable symbol table for one program snapshot.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    pub(crate) types: Vec<TypeSymbol>,
    pub(crate) methods: Vec<MethodSymbol>,
    pub(crate) properties: Vec<PropertySymbol>,
    pub(crate) locals: Vec<LocalSymbol>,
}

impl SymbolTable {
    pub fn type_symbol(&self, id: TypeId) -> &TypeSymbol {
        &self.types[id.0 as usize]
    }

    pub fn method(&self, id: MethodId) -> &MethodSymbol {
        &self.methods[id.0 as usize]
    }

    pub fn property(&self, id: PropertyId) -> &PropertySymbol {
        &self.properties[id.0 as usize]
    }

    pub fn local(&self, id: LocalId) -> &LocalSymbol {
        &self.locals[id.0 as usize]
    }

    /// Iterate all types with their handles.
    pub fn types(&self) -> impl Iterator<Item = (TypeId, &TypeSymbol)> {
        self.types
            .iter()
            .enumerate()
            .map(|(i, t)| (TypeId(i as u32), t))
    }

    /// Iterate all methods with their handles.
    pub fn methods(&self) -> impl Iterator<Item = (MethodId, &MethodSymbol)> {
        self.methods
            .iter()
            .enumerate()
            .map(|(i, m)| (MethodId(i as u32), m))
    }

    /// Iterate all properties with their handles.
    pub fn properties(&self) -> impl Iterator<Item = (PropertyId, &PropertySymbol)> {
        self.properties
            .iter()
            .enumerate()
            .map(|(i, p)| (PropertyId(i as u32), p))
    }

    /// Look up a type by fully-qualified metadata name.
    pub fn type_by_qualified_name(&self, qualified_name: &str) -> Option<TypeId> {
        self.types()
            .find(|(_, t)| t.qualified_name == qualified_name)
            .map(|(id, _)| id)
    }

    /// Look up a member method of a type by simple name.
    pub fn member_method(&self, ty: TypeId, name: &str) -> Option<MethodId> {
        self.methods()
            .find(|(_, m)| m.containing_type == ty && m.name == name)
            .map(|(id, _)| id)
    }

    /// Walk the base-type chain upward from `derived`; true when `base` is
    /// a (transitive) base type. A type is not its own base type.
    pub fn is_base_type_of(&self, base: TypeId, derived: TypeId) -> bool {
        let mut current = self.type_symbol(derived).base;
        while let Some(ty) = current {
            if ty == base {
                return true;
            }
            current = self.type_symbol(ty).base;
        }
        false
    }

    /// True when `ty` or any type in its base chain declares `interface_ty`
    /// in its interface list (including interface base chains).
    pub fn implements(&self, ty: TypeId, interface_ty: TypeId) -> bool {
        let mut current = Some(ty);
        while let Some(t) = current {
            let symbol = self.type_symbol(t);
            for &declared in &symbol.interfaces {
                if declared == interface_ty || self.is_base_type_of(interface_ty, declared) {
                    return true;
                }
            }
            current = symbol.base;
        }
        false
    }

    /// Walk the override chain upward from `method`; true when
    /// `base_method` appears at any step. Survives multi-level inheritance
    /// through intermediate classes.
    pub fn is_overridden_by(&self, base_method: MethodId, method: MethodId) -> bool {
        let mut current = self.method(method).overrides;
        while let Some(m) = current {
            if m == base_method {
                return true;
            }
            current = self.method(m).overrides;
        }
        false
    }

    /// True when the method carries the given attribute class, or an
    /// attribute class derived from it (e.g. `HttpGetAttribute` deriving
    /// `HttpMethodAttribute`).
    pub fn has_attribute(&self, method: MethodId, attribute: TypeId) -> bool {
        self.method(method)
            .attributes
            .iter()
            .any(|&a| a == attribute || self.is_base_type_of(attribute, a))
    }
}

// ============================================================================
// Operation Nodes
// ============================================================================

/// Kind of a loop operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    For,
    ForEach,
    While,
}

/// Target of a delegate creation: an inline closure or a method group.
#[derive(Debug, Clone)]
pub enum DelegateTarget {
    /// An anonymous function. The body node is a `Block` for block-bodied
    /// lambdas and any expression node for expression-bodied ones.
    Lambda {
        params: Vec<ParamSymbol>,
        body: NodeId,
        return_type: Option<TypeId>,
    },
    /// A reference to a named method, e.g. `app.MapGet("/x", Handler)`.
    MethodGroup(MethodId),
}

/// One semantically-classified unit of program behavior.
///
/// Closed set: rules pattern-match exhaustively, so adding a kind is a
/// compile-time visible event.
#[derive(Debug, Clone)]
pub enum Op {
    /// Simple, compound, or coalesce assignment.
    Assignment { target: NodeId, value: NodeId },
    /// An invocation of `method`. `receiver` is the instance expression
    /// node for chained calls; `receiver_type` its static type.
    Invocation {
        method: MethodId,
        receiver: Option<NodeId>,
        receiver_type: Option<TypeId>,
        args: Vec<NodeId>,
    },
    /// One argument of an invocation.
    Argument { value: NodeId },
    /// A loop statement. `declaration` is the loop's own variable
    /// declaration for counting loops.
    Loop {
        kind: LoopKind,
        declaration: Option<NodeId>,
        body: NodeId,
    },
    /// Reference to a property. `argument` carries the key expression for
    /// indexer accesses.
    PropertyReference {
        property: PropertyId,
        argument: Option<NodeId>,
    },
    /// Reference to a local variable.
    LocalReference { local: LocalId },
    /// Declaration of a local variable.
    LocalDeclaration {
        local: LocalId,
        initializer: Option<NodeId>,
    },
    /// Creation of a delegate value.
    DelegateCreation { target: DelegateTarget },
    /// A statement block.
    Block { statements: Vec<NodeId> },
    /// An expression used as a statement.
    ExpressionStatement { expr: NodeId },
    /// A return statement. `value_type` is the static type (or conversion
    /// target) of the returned expression.
    Return {
        value: Option<NodeId>,
        value_type: Option<TypeId>,
    },
    /// A string literal.
    StringLiteral { value: String },
    /// Anything this engine does not classify.
    Other,
}

/// Discriminant of [`Op`], used as rule trigger keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Assignment,
    Invocation,
    Argument,
    Loop,
    PropertyReference,
    LocalReference,
    LocalDeclaration,
    DelegateCreation,
    Block,
    ExpressionStatement,
    Return,
    StringLiteral,
    Other,
}

impl Op {
    /// The trigger kind of this operation.
    pub fn kind(&self) -> OpKind {
        match self {
            Op::Assignment { .. } => OpKind::Assignment,
            Op::Invocation { .. } => OpKind::Invocation,
            Op::Argument { .. } => OpKind::Argument,
            Op::Loop { .. } => OpKind::Loop,
            Op::PropertyReference { .. } => OpKind::PropertyReference,
            Op::LocalReference { .. } => OpKind::LocalReference,
            Op::LocalDeclaration { .. } => OpKind::LocalDeclaration,
            Op::DelegateCreation { .. } => OpKind::DelegateCreation,
            Op::Block { .. } => OpKind::Block,
            Op::ExpressionStatement { .. } => OpKind::ExpressionStatement,
            Op::Return { .. } => OpKind::Return,
            Op::StringLiteral { .. } => OpKind::StringLiteral,
            Op::Other => OpKind::Other,
        }
    }

    /// Child node ids, in document order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Op::Assignment { target, value } => vec![*target, *value],
            Op::Invocation { receiver, args, .. } => {
                let mut out = Vec::with_capacity(args.len() + 1);
                if let Some(r) = receiver {
                    out.push(*r);
                }
                out.extend(args.iter().copied());
                out
            }
            Op::Argument { value } => vec![*value],
            Op::Loop {
                declaration, body, ..
            } => {
                let mut out = Vec::new();
                if let Some(d) = declaration {
                    out.push(*d);
                }
                out.push(*body);
                out
            }
            Op::PropertyReference { argument, .. } => argument.iter().copied().collect(),
            Op::LocalDeclaration { initializer, .. } => initializer.iter().copied().collect(),
            Op::DelegateCreation { target } => match target {
                DelegateTarget::Lambda { body, .. } => vec![*body],
                DelegateTarget::MethodGroup(_) => Vec::new(),
            },
            Op::Block { statements } => statements.clone(),
            Op::ExpressionStatement { expr } => vec![*expr],
            Op::Return { value, .. } => value.iter().copied().collect(),
            Op::LocalReference { .. } | Op::StringLiteral { .. } | Op::Other => Vec::new(),
        }
    }
}

/// One node in a unit's operation arena.
#[derive(Debug, Clone)]
pub struct Node {
    /// Parent node, when not a root.
    pub parent: Option<NodeId>,
    /// Source span in the owning unit.
    pub span: Span,
    /// The method whose body encloses this node, when any.
    pub containing_method: Option<MethodId>,
    /// The operation itself.
    pub op: Op,
}

// ============================================================================
// Units and Program
// ============================================================================

/// One compilation unit: path, source text, and the operation arena in
/// document order.
#[derive(Debug, Clone)]
pub struct Unit {
    pub id: UnitId,
    pub path: String,
    pub source: String,
    pub(crate) nodes: Vec<Node>,
}

impl Unit {
    /// Iterate all nodes in document order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(move |(i, n)| {
            (
                NodeId {
                    unit: self.id,
                    index: i as u32,
                },
                n,
            )
        })
    }

    /// Number of nodes in this unit.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// The whole analyzed program: owned units plus the symbol table.
///
/// The program owns the tree; rules reference nodes by id and never copy
/// them. A `Program` value is immutable for the lifetime of one analysis
/// session and is rebuilt by the host whenever the snapshot changes.
#[derive(Debug, Default, Clone)]
pub struct Program {
    pub units: Vec<Unit>,
    pub symbols: SymbolTable,
}

impl Program {
    pub fn unit(&self, id: UnitId) -> &Unit {
        &self.units[id.0 as usize]
    }

    /// Look up a unit by path.
    pub fn unit_by_path(&self, path: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.path == path)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.unit(id.unit).nodes[id.index as usize]
    }

    /// Source text of a node's span.
    pub fn node_text(&self, id: NodeId) -> &str {
        let node = self.node(id);
        let unit = self.unit(id.unit);
        &unit.source[node.span.start as usize..node.span.end as usize]
    }

    /// Walk upward from `id` (inclusive) and return the first node
    /// satisfying the predicate.
    pub fn first_ancestor_or_self(
        &self,
        id: NodeId,
        mut predicate: impl FnMut(&Node) -> bool,
    ) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id);
            if predicate(node) {
                return Some(node_id);
            }
            current = node.parent;
        }
        None
    }

    /// Depth-first descendants of `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = self.node(id).op.children();
        stack.reverse();
        while let Some(next) = stack.pop() {
            out.push(next);
            let mut children = self.node(next).op.children();
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// Find the smallest node of the given kind whose span exactly matches
    /// or minimally contains `span`. Used by fixers to re-locate a finding.
    pub fn find_node_at(&self, unit: UnitId, span: Span, kind: OpKind) -> Option<NodeId> {
        self.unit(unit)
            .nodes()
            .filter(|(_, n)| n.op.kind() == kind && n.span.contains(&span))
            .min_by_key(|(_, n)| n.span.len())
            .map(|(id, _)| id)
    }

    /// Build a host-facing location for a span in a unit.
    pub fn location(&self, unit: UnitId, span: Span) -> Location {
        let u = self.unit(unit);
        let (line, col) = byte_offset_to_position(&u.source, span.start as usize);
        Location::with_span(u.path.clone(), line, col, span.start, span.end)
    }

    /// Snapshot of all unit sources, keyed by unit id, for batch apply.
    pub fn sources(&self) -> BTreeMap<UnitId, String> {
        self.units
            .iter()
            .map(|u| (u.id, u.source.clone()))
            .collect()
    }
}
