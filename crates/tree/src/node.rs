//! Design-tree nodes.
//!
//! One sealed sum covers expressions, declarations, and statements, in the
//! tagged-union style the analysis passes dispatch over. Nodes own their
//! children by id; references to declarations (`Ref`, call targets) are
//! links, not children, so back references never form ownership cycles.

use crate::ident::Ident;
use crate::loc::SourceLocation;
use crate::tree::{NodeId, TypeId};
use crate::types::Range;

bitflags::bitflags! {
    /// Per-node flag set.
    ///
    /// `ELIDE_BOUNDS` is the single annotation the bounds checker writes:
    /// it marks an array access whose every subscript was proven in range,
    /// so later phases may skip the runtime check. `UNCONSTRAINED` marks
    /// an aggregate whose type was derived from an unconstrained array.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u8 {
        const ELIDE_BOUNDS  = 1 << 0;
        const UNCONSTRAINED = 1 << 1;
    }
}

/// Predefined dimension-indexed array attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attr {
    Length,
    Low,
    High,
    Left,
    Right,
}

/// One association inside an aggregate or a case statement.
///
/// For aggregates `value` is the element expression; for case statements
/// it is the statement executed when the choice matches.
#[derive(Debug, Clone, PartialEq)]
pub struct Assoc {
    pub kind: AssocKind,
    pub value: NodeId,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AssocKind {
    /// Positional element
    Pos,
    /// Named choice: `name => value`
    Named(NodeId),
    /// Range choice: `low to high => value`
    Range(Range),
    /// Catch-all: `others => value`
    Others,
}

/// A design-tree node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Every well-typed expression carries a type; declarations carry the
    /// declared object's type.
    pub ty: Option<TypeId>,
    pub loc: SourceLocation,
    pub flags: NodeFlags,
}

/// The sealed sum of node shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // ---- Expressions ----
    /// Integer literal
    IntLiteral(i64),
    /// Real literal
    RealLiteral(f64),
    /// String literal: one interned character literal per element
    StringLiteral(Vec<Ident>),
    /// Reference to a declaration
    Ref(NodeId),
    /// Function call with positional parameters
    Fcall { decl: NodeId, params: Vec<NodeId> },
    /// Type conversion `T(expr)`; the target type is the node's own type
    TypeConv { param: NodeId },
    /// Array element access `A(i, j, ...)`
    ArrayRef { value: NodeId, params: Vec<NodeId> },
    /// Array slice `A(l to r)` / `A(l downto r)`
    ArraySlice { value: NodeId, range: Range },
    /// Array aggregate
    Aggregate { assocs: Vec<Assoc> },
    /// Predefined attribute reference `prefix'attr(dim)`
    AttrRef { prefix: NodeId, attr: Attr, params: Vec<NodeId> },

    // ---- Declarations ----
    SignalDecl { ident: Ident, value: Option<NodeId> },
    ConstDecl { ident: Ident, value: Option<NodeId> },
    VarDecl { ident: Ident, value: Option<NodeId> },
    /// Formal parameter of a subprogram
    PortDecl { ident: Ident },
    /// Enumeration literal with its stable position
    EnumLit { ident: Ident, pos: u32 },
    /// Function declaration without a body. `builtin` names a primitive
    /// operator the evaluator can reduce directly.
    FuncDecl {
        ident: Ident,
        ports: Vec<NodeId>,
        builtin: Option<Ident>,
    },
    /// Function declaration with a body
    FuncBody {
        ident: Ident,
        ports: Vec<NodeId>,
        decls: Vec<NodeId>,
        stmts: Vec<NodeId>,
        builtin: Option<Ident>,
    },

    // ---- Statements ----
    /// Procedure call statement
    Pcall { decl: NodeId, params: Vec<NodeId> },
    VarAssign { target: NodeId, value: NodeId },
    /// Signal assignment: the target driven by a sequence of waveform
    /// elements
    SignalAssign { target: NodeId, waveforms: Vec<NodeId> },
    /// One (value, time) element of a signal assignment; only the value
    /// is inspected by the analysis passes
    Waveform { value: NodeId, delay: Option<NodeId> },
    If {
        cond: NodeId,
        then_stmts: Vec<NodeId>,
        else_stmts: Vec<NodeId>,
    },
    Case { value: NodeId, assocs: Vec<Assoc> },
    While {
        label: Ident,
        /// Absent condition means loop forever
        cond: Option<NodeId>,
        stmts: Vec<NodeId>,
    },
    For {
        label: Ident,
        /// The iteration variable's declaration
        idecl: NodeId,
        range: Range,
        stmts: Vec<NodeId>,
    },
    Return { value: Option<NodeId> },
    Exit {
        /// The label of the loop being exited
        label: Ident,
        cond: Option<NodeId>,
    },
    Block { stmts: Vec<NodeId> },
}

impl NodeKind {
    /// A short human-readable name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::IntLiteral(_) => "integer literal",
            NodeKind::RealLiteral(_) => "real literal",
            NodeKind::StringLiteral(_) => "string literal",
            NodeKind::Ref(_) => "reference",
            NodeKind::Fcall { .. } => "function call",
            NodeKind::TypeConv { .. } => "type conversion",
            NodeKind::ArrayRef { .. } => "array reference",
            NodeKind::ArraySlice { .. } => "array slice",
            NodeKind::Aggregate { .. } => "aggregate",
            NodeKind::AttrRef { .. } => "attribute reference",
            NodeKind::SignalDecl { .. } => "signal declaration",
            NodeKind::ConstDecl { .. } => "constant declaration",
            NodeKind::VarDecl { .. } => "variable declaration",
            NodeKind::PortDecl { .. } => "port declaration",
            NodeKind::EnumLit { .. } => "enumeration literal",
            NodeKind::FuncDecl { .. } => "function declaration",
            NodeKind::FuncBody { .. } => "function body",
            NodeKind::Pcall { .. } => "procedure call",
            NodeKind::VarAssign { .. } => "variable assignment",
            NodeKind::SignalAssign { .. } => "signal assignment",
            NodeKind::Waveform { .. } => "waveform element",
            NodeKind::If { .. } => "if statement",
            NodeKind::Case { .. } => "case statement",
            NodeKind::While { .. } => "while loop",
            NodeKind::For { .. } => "for loop",
            NodeKind::Return { .. } => "return statement",
            NodeKind::Exit { .. } => "exit statement",
            NodeKind::Block { .. } => "block",
        }
    }

    /// The declared name, for node kinds that declare one.
    pub fn decl_ident(&self) -> Option<Ident> {
        match self {
            NodeKind::SignalDecl { ident, .. }
            | NodeKind::ConstDecl { ident, .. }
            | NodeKind::VarDecl { ident, .. }
            | NodeKind::PortDecl { ident }
            | NodeKind::EnumLit { ident, .. }
            | NodeKind::FuncDecl { ident, .. }
            | NodeKind::FuncBody { ident, .. } => Some(*ident),
            _ => None,
        }
    }
}
