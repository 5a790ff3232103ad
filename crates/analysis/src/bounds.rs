//! Static bounds checking.
//!
//! A whole-tree semantic pass that proves, wherever statically decidable,
//! that index accesses, slice endpoints, aggregate cardinality, call-site
//! actual/formal matching, assignment conformance, case completeness, and
//! type-conversion arguments respect their declared constraints. Every
//! rule is best-effort: partial information cannot produce a diagnostic.
//!
//! The only tree mutation is the `ELIDE_BOUNDS` flag on array accesses
//! whose every subscript was proven in range.

use veld_tree::{AssocKind, NodeFlags, NodeId, NodeKind, RangeDir, Tree, TypeId, TypeKind};

use crate::diag::{Diagnostic, Diagnostics};
use crate::fold::{assume_int, folded_bounds, folded_enum, folded_int, folded_length, folded_real};

/// A closed integer interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub low: i64,
    pub high: i64,
}

/// Outcome of covering an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cover {
    Added,
    /// The overlapping sub-interval that was already covered
    Overlap { low: i64, high: i64 },
}

/// Sorted, coalescing set of closed integer intervals used by the
/// case-completeness rule.
#[derive(Debug, Default)]
pub struct IntervalSet {
    intervals: Vec<Interval>,
}

impl IntervalSet {
    pub fn new() -> Self {
        IntervalSet::default()
    }

    /// Cover `[low, high]`. Overlap with an existing interval aborts the
    /// insertion; adjacency extends an existing interval in place.
    pub fn cover(&mut self, low: i64, high: i64) -> Cover {
        let mut pos = self.intervals.len();
        for (i, it) in self.intervals.iter_mut().enumerate() {
            if it.low > high {
                pos = i;
                break;
            }
            if low <= it.high {
                return Cover::Overlap {
                    low: low.max(it.low),
                    high: high.min(it.high),
                };
            }
            if it.low.checked_sub(1) == Some(high) {
                it.low = low;
                return Cover::Added;
            }
            if it.high.checked_add(1) == Some(low) {
                it.high = high;
                return Cover::Added;
            }
        }
        self.intervals.insert(pos, Interval { low, high });
        Cover::Added
    }

    /// The uncovered segments of `[tlow, thigh]`, in ascending order.
    pub fn gaps(&self, tlow: i64, thigh: i64) -> Vec<Interval> {
        let mut gaps = Vec::new();
        let mut walk = tlow;
        for it in &self.intervals {
            if it.low != walk {
                gaps.push(Interval { low: walk, high: it.low - 1 });
            }
            walk = it.high.saturating_add(1);
        }
        if walk != thigh.saturating_add(1) {
            gaps.push(Interval { low: walk, high: thigh });
        }
        gaps
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }
}

/// The bounds-checking pass. One checker may run over many trees; its
/// error counter is cumulative.
#[derive(Debug, Default)]
pub struct BoundsChecker {
    diags: Diagnostics,
}

/// Walk the whole tree rooted at `root` and return the checker holding
/// the collected diagnostics.
pub fn bounds_check(tree: &mut Tree, root: NodeId) -> BoundsChecker {
    let mut checker = BoundsChecker::new();
    checker.check(tree, root);
    checker
}

impl BoundsChecker {
    pub fn new() -> Self {
        BoundsChecker::default()
    }

    /// Check every node reachable from `root`.
    pub fn check(&mut self, tree: &mut Tree, root: NodeId) {
        for id in tree.walk(root) {
            self.check_node(tree, id);
        }
    }

    /// Cumulative error count.
    pub fn errors(&self) -> usize {
        self.diags.error_count()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diags.all()
    }

    fn error(&mut self, tree: &Tree, at: NodeId, message: String) {
        let loc = tree.node(at).loc.clone();
        self.diags.error_at(&loc, message);
    }

    fn check_node(&mut self, tree: &mut Tree, t: NodeId) {
        match tree.node(t).kind {
            NodeKind::Fcall { .. } | NodeKind::Pcall { .. } => self.check_call_args(tree, t),
            NodeKind::ArrayRef { .. } => self.check_array_ref(tree, t),
            NodeKind::ArraySlice { .. } => self.check_array_slice(tree, t),
            NodeKind::Aggregate { .. } => self.check_aggregate(tree, t),
            NodeKind::SignalDecl { .. }
            | NodeKind::ConstDecl { .. }
            | NodeKind::VarDecl { .. } => self.check_decl(tree, t),
            NodeKind::SignalAssign { .. } => self.check_signal_assign(tree, t),
            NodeKind::VarAssign { .. } => self.check_var_assign(tree, t),
            NodeKind::Case { .. } => self.check_case(tree, t),
            NodeKind::StringLiteral(_) => self.check_string_literal(tree, t),
            NodeKind::TypeConv { .. } => self.check_type_conv(tree, t),
            NodeKind::AttrRef { .. } => self.check_attr_ref(tree, t),
            _ => {}
        }
    }

    /// The `NAME ` prefix used when the accessed value is a direct
    /// reference to a named declaration.
    fn name_prefix(&self, tree: &Tree, value: NodeId) -> String {
        match tree.ref_ident(value) {
            Some(ident) => format!("{} ", tree.name(ident)),
            None => String::new(),
        }
    }

    fn check_string_literal(&mut self, tree: &Tree, t: NodeId) {
        let Some(ty) = tree.node(t).ty else { return };
        if tree.type_is_unconstrained(ty) {
            return;
        }
        let NodeKind::StringLiteral(chars) = &tree.node(t).kind else {
            return;
        };
        let nchars = chars.len() as i64;
        let Some(dim) = tree.type_dim(ty, 0) else { return };
        if let Some(expect) = folded_length(tree, &dim)
            && expect != nchars
        {
            self.error(
                tree,
                t,
                format!(
                    "expected {} elements in string literal but have {}",
                    expect, nchars
                ),
            );
        }
    }

    fn check_call_args(&mut self, tree: &Tree, t: NodeId) {
        let (decl, params) = match &tree.node(t).kind {
            NodeKind::Fcall { decl, params } | NodeKind::Pcall { decl, params } => {
                (*decl, params.clone())
            }
            _ => return,
        };
        let ports = match &tree.node(decl).kind {
            NodeKind::FuncDecl { ports, .. } | NodeKind::FuncBody { ports, .. } => ports.clone(),
            _ => return,
        };

        for (&value, &port) in params.iter().zip(ports.iter()) {
            let (Some(ftype), Some(atype)) = (tree.node(port).ty, tree.node(value).ty) else {
                continue;
            };

            if tree.type_is_array(ftype) {
                // Check bounds of constrained array parameters
                if tree.type_is_unconstrained(atype) || tree.type_is_unconstrained(ftype) {
                    continue;
                }

                let ndims = tree.type_dims(ftype);
                for j in 0..ndims {
                    let (Some(formal_r), Some(actual_r)) =
                        (tree.type_dim(ftype, j), tree.type_dim(atype, j))
                    else {
                        continue;
                    };

                    let folded = folded_int(tree, formal_r.left)
                        .zip(folded_int(tree, formal_r.right))
                        .zip(
                            folded_int(tree, actual_r.left)
                                .zip(folded_int(tree, actual_r.right)),
                        );
                    let Some(((f_left, f_right), (a_left, a_right))) = folded else {
                        continue;
                    };

                    let a_len = match actual_r.dir {
                        RangeDir::To => a_right - a_left + 1,
                        RangeDir::Downto => a_left - a_right + 1,
                    };
                    let f_len = match formal_r.dir {
                        RangeDir::To => f_right - f_left + 1,
                        RangeDir::Downto => f_left - f_right + 1,
                    };

                    if a_len != f_len {
                        if ndims > 1 {
                            self.error(
                                tree,
                                value,
                                format!(
                                    "actual length {} for dimension {} does not match \
                                     formal length {}",
                                    a_len,
                                    j + 1,
                                    f_len
                                ),
                            );
                        } else {
                            self.error(
                                tree,
                                value,
                                format!(
                                    "actual length {} does not match formal length {}",
                                    a_len, f_len
                                ),
                            );
                        }
                    }
                }
            } else if tree.type_is_integer(ftype) {
                let Some(ival) = folded_int(tree, value) else {
                    continue;
                };
                let Some(r) = tree.type_dim(ftype, 0) else { continue };
                let Some((low, high)) = folded_bounds(tree, &r) else {
                    continue;
                };

                if ival < low || ival > high {
                    let (l, h) = match r.dir {
                        RangeDir::To => (low, high),
                        RangeDir::Downto => (high, low),
                    };
                    let pname = tree
                        .node(port)
                        .kind
                        .decl_ident()
                        .map(|id| tree.name(id).to_string())
                        .unwrap_or_default();
                    self.error(
                        tree,
                        value,
                        format!(
                            "value {} out of bounds {} {} {} for parameter {}",
                            ival,
                            l,
                            r.dir.word(),
                            h,
                            pname
                        ),
                    );
                }
            }
            // Real and enumeration formals are accepted at this layer
        }
    }

    fn check_array_ref(&mut self, tree: &mut Tree, t: NodeId) {
        let (value, params) = match &tree.node(t).kind {
            NodeKind::ArrayRef { value, params } => (*value, params.clone()),
            _ => return,
        };
        let Some(value_type) = tree.node(value).ty else { return };
        if tree.type_is_unconstrained(value_type) {
            return;
        }

        let mut nstatic = 0;
        for (i, &p) in params.iter().enumerate() {
            let Some(index) = folded_int(tree, p) else { continue };
            let Some(b) = tree.type_dim(value_type, i) else { continue };
            let (Some(left), Some(right)) =
                (folded_int(tree, b.left), folded_int(tree, b.right))
            else {
                continue;
            };

            let (low, high) = match b.dir {
                RangeDir::To => (left, right),
                RangeDir::Downto => (right, left),
            };
            if index < low || index > high {
                let name = self.name_prefix(tree, value);
                self.error(
                    tree,
                    t,
                    format!(
                        "array {}index {} out of bounds {} {} {}",
                        name,
                        index,
                        left,
                        b.dir.word(),
                        right
                    ),
                );
            } else {
                nstatic += 1;
            }
        }

        if nstatic == params.len() {
            tree.set_flag(t, NodeFlags::ELIDE_BOUNDS);
        }
    }

    fn check_array_slice(&mut self, tree: &Tree, t: NodeId) {
        let (value, r) = match &tree.node(t).kind {
            NodeKind::ArraySlice { value, range } => (*value, *range),
            _ => return,
        };
        let Some(value_type) = tree.node(value).ty else { return };
        if tree.type_is_unconstrained(value_type) {
            return;
        }

        let Some(b) = tree.type_dim(value_type, 0) else { return };
        let (Some(b_left), Some(b_right)) =
            (folded_int(tree, b.left), folded_int(tree, b.right))
        else {
            return;
        };

        let mut offending = None;
        if let Some(r_left) = folded_int(tree, r.left) {
            let out = match b.dir {
                RangeDir::To => r_left < b_left,
                RangeDir::Downto => r_left > b_left,
            };
            if out {
                offending = Some(("left", r_left));
            }
        }
        if offending.is_none()
            && let Some(r_right) = folded_int(tree, r.right)
        {
            let out = match b.dir {
                RangeDir::To => r_right > b_right,
                RangeDir::Downto => r_right < b_right,
            };
            if out {
                offending = Some(("right", r_right));
            }
        }

        if let Some((which, index)) = offending {
            let name = self.name_prefix(tree, value);
            self.error(
                tree,
                t,
                format!(
                    "{}{} slice index {} out of bounds {} {} {}",
                    name,
                    which,
                    index,
                    b_left,
                    b.dir.word(),
                    b_right
                ),
            );
        }
    }

    /// Check that a folded index lies within `[low, high]`.
    fn check_within(
        &mut self,
        tree: &Tree,
        e: NodeId,
        dir: RangeDir,
        what: &str,
        low: i64,
        high: i64,
    ) {
        if let Some(index) = folded_int(tree, e)
            && (index < low || index > high)
        {
            let (l, h) = match dir {
                RangeDir::To => (low, high),
                RangeDir::Downto => (high, low),
            };
            self.error(
                tree,
                e,
                format!(
                    "{} index {} out of bounds {} {} {}",
                    what,
                    index,
                    l,
                    dir.word(),
                    h
                ),
            );
        }
    }

    fn check_aggregate(&mut self, tree: &Tree, t: NodeId) {
        let assocs = match &tree.node(t).kind {
            NodeKind::Aggregate { assocs } => assocs.clone(),
            _ => return,
        };
        let Some(ty) = tree.node(t).ty else { return };
        if !tree.type_is_array(ty) {
            return;
        }
        let Some(type_r) = tree.type_dim(ty, 0) else { return };

        // Find the tightest static bounds for the index. An aggregate of
        // unconstrained array type takes them from the base array's index
        // subtype; both paths require literal endpoints.
        let unconstrained = tree.has_flag(t, NodeFlags::UNCONSTRAINED);
        let bounds = if unconstrained {
            let base = tree.type_base_recur(ty);
            let Some(index) = tree.index_constraint(base, 0) else { return };
            if tree.type_is_enum(index) {
                return;
            }
            let Some(base_r) = tree.type_dim(index, 0) else { return };
            if matches!(tree.node(base_r.left).kind, NodeKind::IntLiteral(_))
                && matches!(tree.node(base_r.right).kind, NodeKind::IntLiteral(_))
            {
                folded_bounds(tree, &base_r)
            } else {
                None
            }
        } else if matches!(tree.node(type_r.left).kind, NodeKind::IntLiteral(_))
            && matches!(tree.node(type_r.right).kind, NodeKind::IntLiteral(_))
        {
            folded_bounds(tree, &type_r)
        } else {
            None
        };
        let Some((low, high)) = bounds else { return };

        // Check for out of bounds indexes

        let mut known_elem_count = true;
        let mut nelems: i64 = 0;
        for assoc in &assocs {
            match assoc.kind {
                AssocKind::Named(name) => {
                    self.check_within(tree, name, type_r.dir, "aggregate", low, high);
                    nelems += 1;
                }
                AssocKind::Range(r) => {
                    self.check_within(tree, r.left, r.dir, "aggregate", low, high);
                    self.check_within(tree, r.right, r.dir, "aggregate", low, high);
                    match folded_length(tree, &r) {
                        Some(length) => nelems += length,
                        None => known_elem_count = false,
                    }
                }
                AssocKind::Others => known_elem_count = false,
                AssocKind::Pos => nelems += 1,
            }
        }

        // Check the actual against the expected element count

        if known_elem_count
            && let Some(expect) = folded_length(tree, &type_r)
            && expect != nelems
        {
            self.error(
                tree,
                t,
                format!(
                    "expected {} elements in aggregate but have {}",
                    expect, nelems
                ),
            );
        }

        // Each sub-aggregate of an unconstrained array aggregate must
        // have the same length. The rank comes from the base array; the
        // subtype constraint only describes the first dimension.

        let ndims = if unconstrained {
            tree.type_dims(tree.type_base_recur(ty))
        } else {
            tree.type_dims(ty)
        };
        if ndims > 1 && unconstrained {
            let mut length: i64 = -1;
            for assoc in &assocs {
                let Some(value_type) = tree.node(assoc.value).ty else { break };
                let Some(dim0) = tree.type_dim(value_type, 0) else { break };
                let Some(this_length) = folded_length(tree, &dim0) else { break };

                if length == -1 {
                    length = this_length;
                } else if length != this_length {
                    self.diags.error_at(
                        &assoc.loc,
                        format!(
                            "length of sub-aggregate {} does not match expected length {}",
                            this_length, length
                        ),
                    );
                }
            }
        }
    }

    fn check_decl(&mut self, tree: &Tree, t: NodeId) {
        let Some(ty) = tree.node(t).ty else { return };
        if !tree.type_is_array(ty) || matches!(tree.ty(ty).kind, TypeKind::Uarray { .. }) {
            return;
        }

        // Check the folded ranges do not violate the index constraints

        let ndims = tree.type_dims(ty);
        for i in 0..ndims {
            let Some(dim) = tree.type_dim(ty, i) else { continue };
            let Some(cons) = tree.node(dim.left).ty else { continue };
            if matches!(tree.ty(cons).kind, TypeKind::Enum { .. }) {
                continue;
            }
            let Some(bounds_r) = tree.type_dim(cons, 0) else { continue };

            let folded = folded_int(tree, dim.left)
                .zip(folded_int(tree, dim.right))
                .zip(
                    folded_int(tree, bounds_r.left).zip(folded_int(tree, bounds_r.right)),
                );
            let Some(((dim_left, dim_right), (bounds_left, bounds_right))) = folded else {
                continue;
            };

            // Only check ranges that can be determined to be non-null
            let is_null = match dim.dir {
                RangeDir::To => dim_left > dim_right,
                RangeDir::Downto => dim_left < dim_right,
            };
            if is_null {
                continue;
            }

            if dim_left < bounds_left {
                self.error(
                    tree,
                    dim.left,
                    format!(
                        "left index {} violates constraint {}",
                        dim_left,
                        tree.type_name(cons)
                    ),
                );
            }
            if dim_right > bounds_right {
                self.error(
                    tree,
                    dim.right,
                    format!(
                        "right index {} violates constraint {}",
                        dim_right,
                        tree.type_name(cons)
                    ),
                );
            }
        }
    }

    fn check_signal_assign(&mut self, tree: &Tree, t: NodeId) {
        let (target, waveforms) = match &tree.node(t).kind {
            NodeKind::SignalAssign { target, waveforms } => (*target, waveforms.clone()),
            _ => return,
        };
        for &w in &waveforms {
            if let NodeKind::Waveform { value, .. } = tree.node(w).kind {
                self.check_assignment(tree, target, value);
            }
        }
    }

    fn check_var_assign(&mut self, tree: &Tree, t: NodeId) {
        if let NodeKind::VarAssign { target, value } = tree.node(t).kind {
            self.check_assignment(tree, target, value);
        }
    }

    fn check_assignment(&mut self, tree: &Tree, target: NodeId, value: NodeId) {
        let (Some(target_type), Some(value_type)) =
            (tree.node(target).ty, tree.node(value).ty)
        else {
            return;
        };

        let check_array_length = tree.type_is_array(target_type)
            && !tree.type_is_unconstrained(target_type)
            && !tree.type_is_unconstrained(value_type);

        if check_array_length {
            let ndims = tree.type_dims(target_type);
            for i in 0..ndims {
                let (Some(tdim), Some(vdim)) =
                    (tree.type_dim(target_type, i), tree.type_dim(value_type, i))
                else {
                    continue;
                };
                let (Some(target_w), Some(value_w)) =
                    (folded_length(tree, &tdim), folded_length(tree, &vdim))
                else {
                    continue;
                };
                if target_w != value_w {
                    if i > 0 {
                        self.error(
                            tree,
                            value,
                            format!(
                                "length of dimension {} of value {} does not match \
                                 length of target {}",
                                i + 1,
                                value_w,
                                target_w
                            ),
                        );
                    } else {
                        self.error(
                            tree,
                            value,
                            format!(
                                "length of value {} does not match length of target {}",
                                value_w, target_w
                            ),
                        );
                    }
                }
            }
        }

        let check_scalar_subtype_range = !tree.type_is_array(target_type)
            && !tree.type_is_record(target_type)
            && matches!(tree.ty(target_type).kind, TypeKind::Subtype { .. });

        if check_scalar_subtype_range {
            let Some(r) = tree.type_dim(target_type, 0) else { return };

            if let Some(ivalue) = folded_int(tree, value)
                && let (Some(left), Some(right)) =
                    (folded_int(tree, r.left), folded_int(tree, r.right))
            {
                let out = match r.dir {
                    RangeDir::To => ivalue < left || ivalue > right,
                    RangeDir::Downto => ivalue > left || ivalue < right,
                };
                if out {
                    self.error(
                        tree,
                        value,
                        format!(
                            "value {} out of target bounds {} {} {}",
                            ivalue,
                            left,
                            r.dir.word(),
                            right
                        ),
                    );
                }
            }

            if let Some(pos) = folded_enum(tree, value)
                && let (Some(left), Some(right)) =
                    (folded_enum(tree, r.left), folded_enum(tree, r.right))
            {
                let out = match r.dir {
                    RangeDir::To => pos < left || pos > right,
                    RangeDir::Downto => pos > left || pos < right,
                };
                if out {
                    let value_base = tree.type_base_recur(value_type);
                    let target_base = tree.type_base_recur(target_type);
                    let lit_name = |base: TypeId, pos: u32| {
                        tree.enum_literal(base, pos as usize)
                            .and_then(|lit| tree.node(lit).kind.decl_ident())
                            .map(|id| tree.name(id).to_string())
                            .unwrap_or_default()
                    };
                    self.error(
                        tree,
                        value,
                        format!(
                            "value {} out of target bounds {} {} {}",
                            lit_name(value_base, pos),
                            lit_name(target_base, left),
                            r.dir.word(),
                            lit_name(target_base, right)
                        ),
                    );
                }
            }
        }
    }

    fn check_case(&mut self, tree: &Tree, t: NodeId) {
        let value = match &tree.node(t).kind {
            NodeKind::Case { value, .. } => *value,
            _ => return,
        };
        let Some(vtype) = tree.node(value).ty else { return };

        if tree.type_is_enum(vtype) {
            self.check_case_enum(tree, t, vtype);
        } else if tree.type_is_integer(vtype) {
            self.check_case_integer(tree, t, vtype);
        } else if tree.type_is_array(vtype) {
            self.check_case_array(tree, t, vtype);
        }
    }

    /// The choices must cover every literal of the enumeration, or the
    /// subtype's slice of it.
    fn check_case_enum(&mut self, tree: &Tree, t: NodeId, vtype: TypeId) {
        let assocs = match &tree.node(t).kind {
            NodeKind::Case { assocs, .. } => assocs.clone(),
            _ => return,
        };

        let (low, high) = if matches!(tree.ty(vtype).kind, TypeKind::Subtype { .. }) {
            let Some(r) = tree.type_dim(vtype, 0) else { return };
            assert!(
                matches!(r.dir, RangeDir::To),
                "enumeration subtype range must ascend"
            );
            let (NodeKind::Ref(ldecl), NodeKind::Ref(rdecl)) =
                (&tree.node(r.left).kind, &tree.node(r.right).kind)
            else {
                return;
            };
            let (NodeKind::EnumLit { pos: lpos, .. }, NodeKind::EnumLit { pos: rpos, .. }) =
                (&tree.node(*ldecl).kind, &tree.node(*rdecl).kind)
            else {
                panic!("enumeration subtype bound is not a literal");
            };
            (*lpos as usize, *rpos as usize)
        } else {
            let nlits = tree.enum_literal_count(vtype);
            if nlits == 0 {
                return;
            }
            (0, nlits - 1)
        };

        let mut have = vec![false; high - low + 1];
        let base = tree.type_base_recur(vtype);
        let mut have_others = false;

        for assoc in &assocs {
            let name = match assoc.kind {
                AssocKind::Others => {
                    have_others = true;
                    continue;
                }
                AssocKind::Named(name) => name,
                _ => continue,
            };
            let Some(name_ident) = tree.ref_ident(name) else { continue };

            for j in low..=high {
                let matches_literal = tree
                    .enum_literal(base, j)
                    .and_then(|lit| tree.node(lit).kind.decl_ident())
                    == Some(name_ident);
                if matches_literal {
                    if have[j - low] {
                        self.error(
                            tree,
                            name,
                            format!(
                                "choice {} appears multiple times in case statement",
                                tree.name(name_ident)
                            ),
                        );
                    } else {
                        have[j - low] = true;
                    }
                }
            }
        }

        for i in low..=high {
            if !have[i - low] && !have_others {
                let lit_name = tree
                    .enum_literal(base, i)
                    .and_then(|lit| tree.node(lit).kind.decl_ident())
                    .map(|id| tree.name(id).to_string())
                    .unwrap_or_default();
                self.error(
                    tree,
                    t,
                    format!("missing choice {} in case statement", lit_name),
                );
            }
        }
    }

    /// Every value of the discriminant's static range must be covered.
    fn check_case_integer(&mut self, tree: &Tree, t: NodeId, vtype: TypeId) {
        let assocs = match &tree.node(t).kind {
            NodeKind::Case { assocs, .. } => assocs.clone(),
            _ => return,
        };
        let Some(r0) = tree.type_dim(vtype, 0) else { return };
        let Some((tlow, thigh)) = folded_bounds(tree, &r0) else { return };

        let mut have_others = false;
        let mut covered = IntervalSet::new();

        for assoc in &assocs {
            let (low, high) = match assoc.kind {
                AssocKind::Others => {
                    have_others = true;
                    continue;
                }
                AssocKind::Named(name) => {
                    let v = assume_int(tree, name);
                    (v, v)
                }
                AssocKind::Range(r) => {
                    assert!(
                        matches!(r.dir, RangeDir::To),
                        "case range choice must ascend"
                    );
                    (assume_int(tree, r.left), assume_int(tree, r.right))
                }
                AssocKind::Pos => panic!("unexpected association in case statement"),
            };

            if low < tlow || high > thigh {
                let v = if low < tlow { low } else { high };
                self.diags.error_at(
                    &assoc.loc,
                    format!(
                        "value {} outside {} bounds {} to {}",
                        v,
                        tree.type_name(vtype),
                        tlow,
                        thigh
                    ),
                );
            } else {
                match covered.cover(low, high) {
                    Cover::Added => {}
                    Cover::Overlap { low, high } => {
                        if low == high {
                            self.diags.error_at(
                                &assoc.loc,
                                format!("value {} is already covered", low),
                            );
                        } else {
                            self.diags.error_at(
                                &assoc.loc,
                                format!("range {} to {} is already covered", low, high),
                            );
                        }
                    }
                }
            }
        }

        if !have_others {
            let gaps = covered.gaps(tlow, thigh);
            if !gaps.is_empty() {
                let mut msg = format!(
                    "case choices do not cover the following values of {}:",
                    tree.type_name(vtype)
                );
                for gap in &gaps {
                    if gap.low == gap.high {
                        msg.push_str(&format!("\n    {}", gap.low));
                    } else {
                        msg.push_str(&format!("\n    {} to {}", gap.low, gap.high));
                    }
                }
                self.error(tree, t, msg);
            }
        }
    }

    /// Array discriminants have `elemsz ^ length` possible values; all
    /// must be covered.
    fn check_case_array(&mut self, tree: &Tree, t: NodeId, vtype: TypeId) {
        let assocs = match &tree.node(t).kind {
            NodeKind::Case { assocs, .. } => assocs.clone(),
            _ => return,
        };

        // How many values each element has
        let Some(elem) = tree.type_elem(vtype) else { return };
        let elemsz: i64 = match &tree.ty(elem).kind {
            TypeKind::Subtype { .. } | TypeKind::Carray { .. } | TypeKind::Integer { .. } => {
                let Some(dim0) = tree.type_dim(elem, 0) else { return };
                let Some((low, high)) = folded_bounds(tree, &dim0) else { return };
                high - low + 1
            }
            TypeKind::Enum { literals } => literals.len() as i64,
            _ => return,
        };

        let Some(r0) = tree.type_dim(vtype, 0) else { return };
        let Some(length) = folded_length(tree, &r0) else { return };

        let expect = if elemsz > i32::MAX as i64 {
            i64::MAX
        } else {
            ipow(elemsz, length)
        };

        let mut have: i64 = 0;
        for assoc in &assocs {
            match assoc.kind {
                AssocKind::Others => have = expect,
                AssocKind::Named(_) => have += 1,
                AssocKind::Range(_) => panic!("unexpected range association in case statement"),
                AssocKind::Pos => {}
            }
        }

        if have != expect {
            if expect == i64::MAX {
                self.error(tree, t, "choices do not cover all possible values".to_string());
            } else {
                self.error(
                    tree,
                    t,
                    format!("choices cover only {} of {} possible values", have, expect),
                );
            }
        }
    }

    fn check_type_conv(&mut self, tree: &Tree, t: NodeId) {
        let NodeKind::TypeConv { param: value } = tree.node(t).kind else {
            return;
        };
        let (Some(from), Some(to)) = (tree.node(value).ty, tree.node(t).ty) else {
            return;
        };
        if !tree.type_is_integer(to) {
            return;
        }

        let folded = if tree.type_is_real(from) {
            folded_real(tree, value).map(|rval| (rval as i64, format!("{}", rval)))
        } else if tree.type_is_integer(from) {
            folded_int(tree, value).map(|ival| (ival, ival.to_string()))
        } else {
            None
        };

        if let Some((ival, argstr)) = folded
            && let Some(dim0) = tree.type_dim(to, 0)
            && let Some((b_low, b_high)) = folded_bounds(tree, &dim0)
            && (ival < b_low || ival > b_high)
        {
            self.error(
                tree,
                value,
                format!(
                    "type conversion argument {} out of bounds {} to {}",
                    argstr, b_low, b_high
                ),
            );
        }
    }

    /// The dimension argument of a predefined array attribute must name
    /// an existing dimension.
    fn check_attr_ref(&mut self, tree: &Tree, t: NodeId) {
        let (prefix, params) = match &tree.node(t).kind {
            NodeKind::AttrRef { prefix, params, .. } => (*prefix, params.clone()),
            _ => return,
        };
        let Some(&dim_expr) = params.first() else { return };
        let Some(ty) = tree.node(prefix).ty else { return };

        if tree.type_is_array(ty) && !tree.type_is_unconstrained(ty) {
            let dim = assume_int(tree, dim_expr);
            if dim < 1 || dim > tree.type_dims(ty) as i64 {
                self.error(
                    tree,
                    dim_expr,
                    format!(
                        "invalid dimension {} for type {}",
                        dim,
                        tree.type_name(ty)
                    ),
                );
            }
        }
    }
}

fn ipow(base: i64, exp: i64) -> i64 {
    base.saturating_pow(exp.clamp(0, u32::MAX as i64) as u32)
}
