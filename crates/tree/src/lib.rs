//! Design-tree data model for the Veld VHDL front-end.
//!
//! The decorated tree produced by parsing and semantic analysis: interned
//! identifiers, source locations, one arena of nodes (expressions,
//! declarations, statements) and one arena of types, all referenced by
//! copyable ids. The analysis passes in `veld-analysis` borrow trees from
//! this crate and never own them.

pub mod ident;
pub mod loc;
pub mod node;
pub mod tree;
pub mod types;

pub use ident::{Ident, Interner};
pub use loc::SourceLocation;
pub use node::{Assoc, AssocKind, Attr, Node, NodeFlags, NodeKind};
pub use tree::{NodeId, StdTypes, Tree, TypeId};
pub use types::{Range, RangeDir, Type, TypeKind};
