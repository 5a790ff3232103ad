//! Folding primitives.
//!
//! Each primitive answers "does this node reduce, without executing user
//! code, to a value of the requested domain?" and returns `None` rather
//! than diagnosing when it does not. They are pure with respect to the
//! tree and terminate in time linear in the traversed subtree: constant
//! initializer chains are depth-capped so a malformed self-referential
//! constant fails the fold instead of recursing forever.

use veld_tree::{NodeId, NodeKind, Range, RangeDir, Tree};

/// Maximum depth of constant-reference chains followed by the primitives.
const MAX_FOLD_DEPTH: usize = 64;

/// Reduce `e` to a static integer.
///
/// Succeeds for integer literals and references to constants whose
/// initializer folds.
pub fn folded_int(tree: &Tree, e: NodeId) -> Option<i64> {
    folded_int_at(tree, e, 0)
}

fn folded_int_at(tree: &Tree, e: NodeId, depth: usize) -> Option<i64> {
    if depth > MAX_FOLD_DEPTH {
        return None;
    }
    match &tree.node(e).kind {
        NodeKind::IntLiteral(v) => Some(*v),
        NodeKind::Ref(decl) => match &tree.node(*decl).kind {
            NodeKind::ConstDecl { value: Some(init), .. } => {
                folded_int_at(tree, *init, depth + 1)
            }
            _ => None,
        },
        _ => None,
    }
}

/// Reduce `e` to a static real.
pub fn folded_real(tree: &Tree, e: NodeId) -> Option<f64> {
    folded_real_at(tree, e, 0)
}

fn folded_real_at(tree: &Tree, e: NodeId, depth: usize) -> Option<f64> {
    if depth > MAX_FOLD_DEPTH {
        return None;
    }
    match &tree.node(e).kind {
        NodeKind::RealLiteral(v) => Some(*v),
        NodeKind::Ref(decl) => match &tree.node(*decl).kind {
            NodeKind::ConstDecl { value: Some(init), .. } => {
                folded_real_at(tree, *init, depth + 1)
            }
            _ => None,
        },
        _ => None,
    }
}

/// Reduce `e` to a boolean: a reference to one of the standard
/// `false`/`true` enumeration literals.
pub fn folded_bool(tree: &Tree, e: NodeId) -> Option<bool> {
    match tree.node(e).kind {
        NodeKind::Ref(decl) => match tree.node(decl).kind {
            NodeKind::EnumLit { pos, .. } => {
                let ty = tree.node(decl).ty?;
                if tree.type_base_recur(ty) == tree.std().boolean {
                    Some(pos != 0)
                } else {
                    None
                }
            }
            _ => None,
        },
        _ => None,
    }
}

/// Reduce `e` to an enumeration literal position.
pub fn folded_enum(tree: &Tree, e: NodeId) -> Option<u32> {
    match tree.node(e).kind {
        NodeKind::Ref(decl) => match tree.node(decl).kind {
            NodeKind::EnumLit { pos, .. } => Some(pos),
            _ => None,
        },
        _ => None,
    }
}

/// The (low, high) bounds of a range whose endpoints fold to integers.
/// A null range answers with low > high.
pub fn folded_bounds(tree: &Tree, r: &Range) -> Option<(i64, i64)> {
    let left = folded_int(tree, r.left)?;
    let right = folded_int(tree, r.right)?;
    Some(match r.dir {
        RangeDir::To => (left, right),
        RangeDir::Downto => (right, left),
    })
}

/// The element count of a static range: `max(0, high - low + 1)`.
pub fn folded_length(tree: &Tree, r: &Range) -> Option<i64> {
    let (low, high) = folded_bounds(tree, r)?;
    let len = (high as i128) - (low as i128) + 1;
    Some(len.clamp(0, i64::MAX as i128) as i64)
}

/// Whether a static range is null under its direction.
pub fn range_is_null(tree: &Tree, r: &Range) -> Option<bool> {
    let (low, high) = folded_bounds(tree, r)?;
    Some(low > high)
}

/// Fold `e` in a context where semantic analysis guarantees a static
/// integer. Non-static input here is an internal-consistency breach.
pub fn assume_int(tree: &Tree, e: NodeId) -> i64 {
    match folded_int(tree, e) {
        Some(v) => v,
        None => panic!(
            "expression at {} is not a static integer",
            tree.node(e).loc
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veld_tree::{NodeKind, SourceLocation};

    fn loc() -> SourceLocation {
        SourceLocation::default()
    }

    #[test]
    fn test_folded_int_literal_and_constant_chain() {
        let mut tree = Tree::new();
        let std = tree.std();
        let lit = tree.int_literal(std.universal_integer, loc(), 42);
        assert_eq!(folded_int(&tree, lit), Some(42));

        let width = tree.intern("width");
        let decl = tree.add_node(
            NodeKind::ConstDecl { ident: width, value: Some(lit) },
            Some(std.universal_integer),
            loc(),
        );
        let reference = tree.add_node(NodeKind::Ref(decl), Some(std.universal_integer), loc());
        assert_eq!(folded_int(&tree, reference), Some(42));

        let double_width = tree.intern("double_width");
        let outer = tree.add_node(
            NodeKind::ConstDecl { ident: double_width, value: Some(reference) },
            Some(std.universal_integer),
            loc(),
        );
        let outer_ref = tree.add_node(NodeKind::Ref(outer), Some(std.universal_integer), loc());
        assert_eq!(folded_int(&tree, outer_ref), Some(42));
    }

    #[test]
    fn test_folded_int_fails_on_non_static() {
        let mut tree = Tree::new();
        let std = tree.std();
        let sig = tree.intern("s");
        let decl = tree.add_node(
            NodeKind::SignalDecl { ident: sig, value: None },
            Some(std.universal_integer),
            loc(),
        );
        let reference = tree.add_node(NodeKind::Ref(decl), Some(std.universal_integer), loc());
        assert_eq!(folded_int(&tree, reference), None);
    }

    #[test]
    fn test_folded_int_depth_cap_fails_deep_chains() {
        let mut tree = Tree::new();
        let std = tree.std();
        let mut value = tree.int_literal(std.universal_integer, loc(), 9);
        for i in 0..200 {
            let name = tree.intern(&format!("c{}", i));
            let decl = tree.add_node(
                NodeKind::ConstDecl { ident: name, value: Some(value) },
                Some(std.universal_integer),
                loc(),
            );
            value = tree.add_node(NodeKind::Ref(decl), Some(std.universal_integer), loc());
        }
        assert_eq!(folded_int(&tree, value), None);
    }

    #[test]
    fn test_folded_bool_requires_standard_literals() {
        let mut tree = Tree::new();
        let t = tree.bool_literal(loc(), true);
        let f = tree.bool_literal(loc(), false);
        assert_eq!(folded_bool(&tree, t), Some(true));
        assert_eq!(folded_bool(&tree, f), Some(false));

        // An enumeration literal of some other type is not a boolean
        let red = tree.intern("red");
        let lit = tree.add_node(NodeKind::EnumLit { ident: red, pos: 0 }, None, loc());
        let colors = tree.intern("color");
        let color_ty = tree.add_type(
            colors,
            veld_tree::TypeKind::Enum { literals: vec![lit] },
        );
        tree.set_node_type(lit, color_ty);
        let reference = tree.add_node(NodeKind::Ref(lit), Some(color_ty), loc());
        assert_eq!(folded_bool(&tree, reference), None);
        assert_eq!(folded_enum(&tree, reference), Some(0));
    }

    #[test]
    fn test_folded_bounds_respects_direction() {
        let mut tree = Tree::new();
        let std = tree.std();
        let l = tree.int_literal(std.universal_integer, loc(), 7);
        let r = tree.int_literal(std.universal_integer, loc(), 0);
        let down = Range::new(l, r, RangeDir::Downto);
        assert_eq!(folded_bounds(&tree, &down), Some((0, 7)));
        assert_eq!(folded_length(&tree, &down), Some(8));
        assert_eq!(range_is_null(&tree, &down), Some(false));
    }

    #[test]
    fn test_null_range_has_length_zero() {
        let mut tree = Tree::new();
        let std = tree.std();
        let l = tree.int_literal(std.universal_integer, loc(), 5);
        let r = tree.int_literal(std.universal_integer, loc(), 2);
        let null = Range::new(l, r, RangeDir::To);
        assert_eq!(folded_length(&tree, &null), Some(0));
        assert_eq!(range_is_null(&tree, &null), Some(true));
    }
}
