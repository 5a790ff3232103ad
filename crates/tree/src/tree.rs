//! The design tree: node and type arenas plus introspection.
//!
//! The tree owns every node and type and hands out copyable ids. All
//! structural queries the analysis passes need (array-ness, dimensions,
//! base-type recursion, enumeration literals) live here so the passes
//! never match on type shapes they do not own.

use crate::ident::{Ident, Interner};
use crate::loc::SourceLocation;
use crate::node::{Assoc, AssocKind, Node, NodeFlags, NodeKind};
use crate::types::{Range, RangeDir, Type, TypeKind};

/// Id of a node in the tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

/// Id of a type in the type arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(u32);

/// The predefined types every tree starts with.
#[derive(Debug, Clone, Copy)]
pub struct StdTypes {
    pub boolean: TypeId,
    pub false_lit: NodeId,
    pub true_lit: NodeId,
    pub universal_integer: TypeId,
    pub universal_real: TypeId,
}

/// The design tree.
pub struct Tree {
    interner: Interner,
    nodes: Vec<Node>,
    types: Vec<Type>,
    std: StdTypes,
}

impl Tree {
    /// Create an empty tree seeded with the standard universe: `boolean`
    /// with its `false`/`true` literals, `universal_integer`, and
    /// `universal_real`.
    pub fn new() -> Self {
        let mut tree = Tree {
            interner: Interner::new(),
            nodes: Vec::new(),
            types: Vec::new(),
            std: StdTypes {
                boolean: TypeId(0),
                false_lit: NodeId(0),
                true_lit: NodeId(0),
                universal_integer: TypeId(0),
                universal_real: TypeId(0),
            },
        };

        let false_ident = tree.intern("false");
        let true_ident = tree.intern("true");
        let false_lit = tree.add_node(
            NodeKind::EnumLit { ident: false_ident, pos: 0 },
            None,
            SourceLocation::default(),
        );
        let true_lit = tree.add_node(
            NodeKind::EnumLit { ident: true_ident, pos: 1 },
            None,
            SourceLocation::default(),
        );
        let boolean_ident = tree.intern("boolean");
        let boolean = tree.add_type(
            boolean_ident,
            TypeKind::Enum { literals: vec![false_lit, true_lit] },
        );
        tree.set_node_type(false_lit, boolean);
        tree.set_node_type(true_lit, boolean);

        let low = tree.add_node(
            NodeKind::IntLiteral(i64::MIN),
            None,
            SourceLocation::default(),
        );
        let high = tree.add_node(
            NodeKind::IntLiteral(i64::MAX),
            None,
            SourceLocation::default(),
        );
        let ui_ident = tree.intern("universal_integer");
        let universal_integer = tree.add_type(
            ui_ident,
            TypeKind::Integer { dim: Range::new(low, high, RangeDir::To) },
        );
        tree.set_node_type(low, universal_integer);
        tree.set_node_type(high, universal_integer);

        let ur_ident = tree.intern("universal_real");
        let universal_real = tree.add_type(ur_ident, TypeKind::Real);

        tree.std = StdTypes {
            boolean,
            false_lit,
            true_lit,
            universal_integer,
            universal_real,
        };
        tree
    }

    pub fn std(&self) -> StdTypes {
        self.std
    }

    // ---- Identifiers ----

    pub fn intern(&mut self, name: &str) -> Ident {
        self.interner.intern(name)
    }

    pub fn name(&self, id: Ident) -> &str {
        self.interner.name(id)
    }

    // ---- Nodes ----

    pub fn add_node(
        &mut self,
        kind: NodeKind,
        ty: Option<TypeId>,
        loc: SourceLocation,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            ty,
            loc,
            flags: NodeFlags::default(),
        });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    /// Patch a node's type after construction. Used by builders that must
    /// create mutually-referencing nodes and types in two steps.
    pub fn set_node_type(&mut self, id: NodeId, ty: TypeId) {
        self.nodes[id.0 as usize].ty = Some(ty);
    }

    pub fn set_flag(&mut self, id: NodeId, flags: NodeFlags) {
        self.nodes[id.0 as usize].flags |= flags;
    }

    pub fn has_flag(&self, id: NodeId, flags: NodeFlags) -> bool {
        self.nodes[id.0 as usize].flags.contains(flags)
    }

    /// The name a reference node denotes, if it is a direct reference to
    /// a named declaration.
    pub fn ref_ident(&self, id: NodeId) -> Option<Ident> {
        match self.node(id).kind {
            NodeKind::Ref(decl) => self.node(decl).kind.decl_ident(),
            _ => None,
        }
    }

    // ---- Literal builders ----

    pub fn int_literal(&mut self, ty: TypeId, loc: SourceLocation, value: i64) -> NodeId {
        self.add_node(NodeKind::IntLiteral(value), Some(ty), loc)
    }

    pub fn real_literal(&mut self, ty: TypeId, loc: SourceLocation, value: f64) -> NodeId {
        self.add_node(NodeKind::RealLiteral(value), Some(ty), loc)
    }

    /// A reference to the standard `true`/`false` literal.
    pub fn bool_literal(&mut self, loc: SourceLocation, value: bool) -> NodeId {
        let lit = if value {
            self.std.true_lit
        } else {
            self.std.false_lit
        };
        self.add_node(NodeKind::Ref(lit), Some(self.std.boolean), loc)
    }

    // ---- Types ----

    pub fn add_type(&mut self, ident: Ident, kind: TypeKind) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(Type { ident, kind });
        id
    }

    pub fn ty(&self, id: TypeId) -> &Type {
        &self.types[id.0 as usize]
    }

    pub fn type_name(&self, id: TypeId) -> &str {
        self.interner.name(self.types[id.0 as usize].ident)
    }

    /// Strip subtypes down to the underlying base type.
    pub fn type_base_recur(&self, id: TypeId) -> TypeId {
        match self.ty(id).kind {
            TypeKind::Subtype { base, .. } => self.type_base_recur(base),
            _ => id,
        }
    }

    pub fn type_is_array(&self, id: TypeId) -> bool {
        matches!(
            self.ty(self.type_base_recur(id)).kind,
            TypeKind::Carray { .. } | TypeKind::Uarray { .. }
        )
    }

    /// An array type is unconstrained until some subtype supplies its
    /// index ranges.
    pub fn type_is_unconstrained(&self, id: TypeId) -> bool {
        match self.ty(id).kind {
            TypeKind::Uarray { .. } => true,
            TypeKind::Subtype { base, constraint: None } => self.type_is_unconstrained(base),
            _ => false,
        }
    }

    pub fn type_is_integer(&self, id: TypeId) -> bool {
        matches!(
            self.ty(self.type_base_recur(id)).kind,
            TypeKind::Integer { .. }
        )
    }

    pub fn type_is_real(&self, id: TypeId) -> bool {
        matches!(self.ty(self.type_base_recur(id)).kind, TypeKind::Real)
    }

    pub fn type_is_enum(&self, id: TypeId) -> bool {
        matches!(
            self.ty(self.type_base_recur(id)).kind,
            TypeKind::Enum { .. }
        )
    }

    pub fn type_is_record(&self, id: TypeId) -> bool {
        matches!(
            self.ty(self.type_base_recur(id)).kind,
            TypeKind::Record { .. }
        )
    }

    /// Number of range dimensions directly answerable for this type.
    pub fn type_dims(&self, id: TypeId) -> usize {
        match &self.ty(id).kind {
            TypeKind::Integer { .. } => 1,
            TypeKind::Carray { dims, .. } => dims.len(),
            TypeKind::Uarray { index_constraints, .. } => index_constraints.len(),
            TypeKind::Subtype { constraint: Some(_), .. } => 1,
            TypeKind::Subtype { base, constraint: None } => self.type_dims(*base),
            _ => 0,
        }
    }

    /// The range of dimension `i`. A subtype without its own constraint
    /// answers with its base's dimension.
    pub fn type_dim(&self, id: TypeId, i: usize) -> Option<Range> {
        match &self.ty(id).kind {
            TypeKind::Integer { dim } => (i == 0).then_some(*dim),
            TypeKind::Carray { dims, .. } => dims.get(i).copied(),
            TypeKind::Subtype { constraint: Some(r), .. } => (i == 0).then_some(*r),
            TypeKind::Subtype { base, constraint: None } => self.type_dim(*base, i),
            _ => None,
        }
    }

    pub fn type_elem(&self, id: TypeId) -> Option<TypeId> {
        match self.ty(id).kind {
            TypeKind::Carray { elem, .. } | TypeKind::Uarray { elem, .. } => Some(elem),
            TypeKind::Subtype { base, .. } => self.type_elem(base),
            _ => None,
        }
    }

    /// The index subtype of dimension `i` of an unconstrained array.
    pub fn index_constraint(&self, id: TypeId, i: usize) -> Option<TypeId> {
        match &self.ty(self.type_base_recur(id)).kind {
            TypeKind::Uarray { index_constraints, .. } => index_constraints.get(i).copied(),
            _ => None,
        }
    }

    pub fn enum_literal_count(&self, id: TypeId) -> usize {
        match &self.ty(self.type_base_recur(id)).kind {
            TypeKind::Enum { literals } => literals.len(),
            _ => 0,
        }
    }

    /// The enumeration literal declaration at position `pos`.
    pub fn enum_literal(&self, id: TypeId, pos: usize) -> Option<NodeId> {
        match &self.ty(self.type_base_recur(id)).kind {
            TypeKind::Enum { literals } => literals.get(pos).copied(),
            _ => None,
        }
    }

    // ---- Traversal ----

    /// Collect every node reachable from `root` in child-before-parent
    /// order. References to declarations are links, not children, and are
    /// not followed.
    pub fn walk(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        self.walk_into(root, &mut order);
        order
    }

    fn walk_range(&self, range: &Range, out: &mut Vec<NodeId>) {
        self.walk_into(range.left, out);
        self.walk_into(range.right, out);
    }

    fn walk_assocs(&self, assocs: &[Assoc], out: &mut Vec<NodeId>) {
        for assoc in assocs {
            match &assoc.kind {
                AssocKind::Named(name) => self.walk_into(*name, out),
                AssocKind::Range(r) => self.walk_range(r, out),
                AssocKind::Pos | AssocKind::Others => {}
            }
            self.walk_into(assoc.value, out);
        }
    }

    fn walk_into(&self, id: NodeId, out: &mut Vec<NodeId>) {
        match &self.node(id).kind {
            NodeKind::IntLiteral(_)
            | NodeKind::RealLiteral(_)
            | NodeKind::StringLiteral(_)
            | NodeKind::Ref(_)
            | NodeKind::PortDecl { .. }
            | NodeKind::EnumLit { .. } => {}
            NodeKind::Fcall { params, .. } | NodeKind::Pcall { params, .. } => {
                for &p in params {
                    self.walk_into(p, out);
                }
            }
            NodeKind::TypeConv { param } => self.walk_into(*param, out),
            NodeKind::ArrayRef { value, params } => {
                self.walk_into(*value, out);
                for &p in params {
                    self.walk_into(p, out);
                }
            }
            NodeKind::ArraySlice { value, range } => {
                self.walk_into(*value, out);
                self.walk_range(range, out);
            }
            NodeKind::Aggregate { assocs } => self.walk_assocs(assocs, out),
            NodeKind::AttrRef { prefix, params, .. } => {
                self.walk_into(*prefix, out);
                for &p in params {
                    self.walk_into(p, out);
                }
            }
            NodeKind::SignalDecl { value, .. }
            | NodeKind::ConstDecl { value, .. }
            | NodeKind::VarDecl { value, .. } => {
                if let Some(v) = value {
                    self.walk_into(*v, out);
                }
            }
            NodeKind::FuncDecl { ports, .. } => {
                for &p in ports {
                    self.walk_into(p, out);
                }
            }
            NodeKind::FuncBody { ports, decls, stmts, .. } => {
                for &p in ports {
                    self.walk_into(p, out);
                }
                for &d in decls {
                    self.walk_into(d, out);
                }
                for &s in stmts {
                    self.walk_into(s, out);
                }
            }
            NodeKind::VarAssign { target, value } => {
                self.walk_into(*target, out);
                self.walk_into(*value, out);
            }
            NodeKind::SignalAssign { target, waveforms } => {
                self.walk_into(*target, out);
                for &w in waveforms {
                    self.walk_into(w, out);
                }
            }
            NodeKind::Waveform { value, delay } => {
                self.walk_into(*value, out);
                if let Some(d) = delay {
                    self.walk_into(*d, out);
                }
            }
            NodeKind::If { cond, then_stmts, else_stmts } => {
                self.walk_into(*cond, out);
                for &s in then_stmts {
                    self.walk_into(s, out);
                }
                for &s in else_stmts {
                    self.walk_into(s, out);
                }
            }
            NodeKind::Case { value, assocs } => {
                self.walk_into(*value, out);
                self.walk_assocs(assocs, out);
            }
            NodeKind::While { cond, stmts, .. } => {
                if let Some(c) = cond {
                    self.walk_into(*c, out);
                }
                for &s in stmts {
                    self.walk_into(s, out);
                }
            }
            NodeKind::For { idecl, range, stmts, .. } => {
                self.walk_into(*idecl, out);
                self.walk_range(range, out);
                for &s in stmts {
                    self.walk_into(s, out);
                }
            }
            NodeKind::Return { value } => {
                if let Some(v) = value {
                    self.walk_into(*v, out);
                }
            }
            NodeKind::Exit { cond, .. } => {
                if let Some(c) = cond {
                    self.walk_into(*c, out);
                }
            }
            NodeKind::Block { stmts } => {
                for &s in stmts {
                    self.walk_into(s, out);
                }
            }
        }
        out.push(id);
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_universe_is_seeded() {
        let tree = Tree::new();
        let std = tree.std();
        assert!(tree.type_is_enum(std.boolean));
        assert_eq!(tree.enum_literal_count(std.boolean), 2);
        assert_eq!(tree.enum_literal(std.boolean, 0), Some(std.false_lit));
        assert_eq!(tree.enum_literal(std.boolean, 1), Some(std.true_lit));
        assert!(tree.type_is_integer(std.universal_integer));
        assert!(tree.type_is_real(std.universal_real));
    }

    #[test]
    fn test_subtype_queries_recur_to_base() {
        let mut tree = Tree::new();
        let std = tree.std();
        let loc = SourceLocation::default();
        let low = tree.int_literal(std.universal_integer, loc.clone(), 0);
        let high = tree.int_literal(std.universal_integer, loc.clone(), 7);
        let ident = tree.intern("small_int");
        let small = tree.add_type(
            ident,
            TypeKind::Integer { dim: Range::new(low, high, RangeDir::To) },
        );
        let sub_ident = tree.intern("byte_index");
        let sub = tree.add_type(
            sub_ident,
            TypeKind::Subtype { base: small, constraint: None },
        );
        assert!(tree.type_is_integer(sub));
        assert_eq!(tree.type_base_recur(sub), small);
        assert_eq!(tree.type_dim(sub, 0), tree.type_dim(small, 0));
        assert_eq!(tree.type_name(sub), "byte_index");
    }

    #[test]
    fn test_walk_is_child_before_parent() {
        let mut tree = Tree::new();
        let std = tree.std();
        let loc = SourceLocation::default();
        let lhs = tree.int_literal(std.universal_integer, loc.clone(), 1);
        let rhs = tree.int_literal(std.universal_integer, loc.clone(), 2);
        let name = tree.intern("a");
        let decl = tree.add_node(
            NodeKind::VarDecl { ident: name, value: None },
            Some(std.universal_integer),
            loc.clone(),
        );
        let target = tree.add_node(NodeKind::Ref(decl), Some(std.universal_integer), loc.clone());
        let assign = tree.add_node(
            NodeKind::VarAssign { target, value: rhs },
            None,
            loc.clone(),
        );
        let block = tree.add_node(NodeKind::Block { stmts: vec![assign] }, None, loc);
        let order = tree.walk(block);
        assert_eq!(order, vec![target, rhs, assign, block]);
        // lhs is unreachable from the block
        assert!(!order.contains(&lhs));
    }

    #[test]
    fn test_elide_flag_round_trip() {
        let mut tree = Tree::new();
        let std = tree.std();
        let lit = tree.int_literal(std.universal_integer, SourceLocation::default(), 3);
        assert!(!tree.has_flag(lit, NodeFlags::ELIDE_BOUNDS));
        tree.set_flag(lit, NodeFlags::ELIDE_BOUNDS);
        assert!(tree.has_flag(lit, NodeFlags::ELIDE_BOUNDS));
    }
}
