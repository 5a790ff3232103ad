//! Constant folder for function calls.
//!
//! A small abstract machine that reduces pure function calls to literal
//! nodes when every input is statically known. Folding is all-or-nothing:
//! any unsupported construct, unfoldable operand, or iteration-cap breach
//! marks the evaluation failed, and the top-level entry then returns the
//! original call node untouched. Failures are never user-visible
//! diagnostics; with `NVC_EVAL_DEBUG` set they are traced as warnings so
//! maintainers can chase missed folds.

use std::sync::OnceLock;

use veld_tree::{
    Assoc, AssocKind, Ident, NodeId, NodeKind, Range, RangeDir, SourceLocation, Tree, TypeKind,
};

use crate::builtins::{self, Builtin, Reduced};
use crate::fold::{folded_bool, folded_enum, folded_int, folded_real};

/// Bindings per activation frame. Folded function bodies are short;
/// exceeding this is a programmer error, not a runtime path.
const FRAME_CAPACITY: usize = 16;

/// Hard cap on loop iterations during evaluation.
const MAX_ITERS: u32 = 1000;

/// Whether per-failure warnings are enabled. Read from the environment
/// once per process and cached.
fn eval_debug() -> bool {
    static DEBUG: OnceLock<bool> = OnceLock::new();
    *DEBUG.get_or_init(|| std::env::var_os("NVC_EVAL_DEBUG").is_some())
}

/// One activation record: name → value bindings with a link to the
/// enclosing frame through the stack below it.
#[derive(Debug, Default)]
struct Frame {
    bindings: Vec<(Ident, NodeId)>,
}

#[derive(Debug, Default)]
struct Env {
    frames: Vec<Frame>,
}

impl Env {
    fn push(&mut self) {
        self.frames.push(Frame {
            bindings: Vec::with_capacity(FRAME_CAPACITY),
        });
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    /// Bind a name in the current frame, overwriting an existing binding
    /// of the same name.
    fn bind(&mut self, name: Ident, value: NodeId) {
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        for binding in frame.bindings.iter_mut() {
            if binding.0 == name {
                binding.1 = value;
                return;
            }
        }
        assert!(
            frame.bindings.len() < FRAME_CAPACITY,
            "binding frame overflow"
        );
        frame.bindings.push((name, value));
    }

    /// Innermost binding shadows.
    fn get(&self, name: Ident) -> Option<NodeId> {
        for frame in self.frames.iter().rev() {
            for &(n, v) in &frame.bindings {
                if n == name {
                    return Some(v);
                }
            }
        }
        None
    }
}

/// Outcome of one statement: short-circuits the enclosing sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Normal,
    Fail,
    Exit(Ident),
    Return(NodeId),
}

struct Evaluator<'t> {
    tree: &'t mut Tree,
    env: Env,
    failed: bool,
}

/// Attempt to fold a function call to a literal node.
///
/// Returns either a literal tree node of equivalent value or the original
/// call node; on any doubt the original is returned and the tree is left
/// untouched apart from freshly appended literals.
pub fn eval(tree: &mut Tree, fcall: NodeId) -> NodeId {
    assert!(
        matches!(tree.node(fcall).kind, NodeKind::Fcall { .. }),
        "eval expects a function call"
    );
    tracing::debug!(location = %tree.node(fcall).loc, "attempting to fold call");

    let mut evaluator = Evaluator {
        tree,
        env: Env::default(),
        failed: false,
    };
    let result = evaluator.eval_fcall(fcall);
    if evaluator.failed { fcall } else { result }
}

impl Evaluator<'_> {
    /// Mark the evaluation failed, tracing the reason when debugging.
    fn fail(&mut self, loc: &SourceLocation, msg: &str) -> Control {
        if eval_debug() {
            tracing::warn!(location = %loc, "{}", msg);
        }
        self.failed = true;
        Control::Fail
    }

    /// A node counts as folded when it is a literal or a boolean
    /// literal reference.
    fn folded(&self, t: NodeId) -> bool {
        match &self.tree.node(t).kind {
            NodeKind::IntLiteral(_)
            | NodeKind::RealLiteral(_)
            | NodeKind::StringLiteral(_) => true,
            NodeKind::Ref(_) => folded_bool(self.tree, t).is_some(),
            _ => false,
        }
    }

    // ---- Literal construction ----

    fn int_lit_like(&mut self, like: NodeId, value: i64) -> NodeId {
        let ty = self.tree.node(like).ty;
        let loc = self.tree.node(like).loc.clone();
        self.tree.add_node(NodeKind::IntLiteral(value), ty, loc)
    }

    fn real_lit_like(&mut self, like: NodeId, value: f64) -> NodeId {
        let ty = self.tree.node(like).ty;
        let loc = self.tree.node(like).loc.clone();
        self.tree.add_node(NodeKind::RealLiteral(value), ty, loc)
    }

    fn bool_lit_like(&mut self, like: NodeId, value: bool) -> NodeId {
        let loc = self.tree.node(like).loc.clone();
        self.tree.bool_literal(loc, value)
    }

    fn reduced_lit(&mut self, like: NodeId, reduced: Reduced) -> NodeId {
        match reduced {
            Reduced::Int(v) => self.int_lit_like(like, v),
            Reduced::Real(v) => self.real_lit_like(like, v),
            Reduced::Bool(v) => self.bool_lit_like(like, v),
        }
    }

    // ---- Expressions ----

    fn eval_expr(&mut self, t: NodeId) -> NodeId {
        match self.tree.node(t).kind {
            NodeKind::Fcall { .. } => self.eval_fcall(t),
            NodeKind::Ref(_) => self.eval_ref(t),
            NodeKind::TypeConv { .. } => self.eval_type_conv(t),
            _ => t,
        }
    }

    fn eval_fcall(&mut self, t: NodeId) -> NodeId {
        let (decl, params) = match &self.tree.node(t).kind {
            NodeKind::Fcall { decl, params } => (*decl, params.clone()),
            _ => unreachable!("eval_fcall on a non-call node"),
        };

        let builtin_name = match &self.tree.node(decl).kind {
            NodeKind::FuncDecl { builtin, .. } | NodeKind::FuncBody { builtin, .. } => *builtin,
            other => panic!("call target is a {}", other.name()),
        };

        let Some(op) = builtin_name.and_then(|id| Builtin::from_name(self.tree.name(id))) else {
            return self.eval_user_call(t, decl, &params);
        };

        let args: Vec<NodeId> = params.iter().map(|&p| self.eval_expr(p)).collect();

        if op.is_universal() {
            return self.eval_universal(t, op, &args);
        }

        // Classify the arguments by attempting each folding domain;
        // dispatch to the first where every argument succeeded.
        let ints: Option<Vec<i64>> =
            args.iter().map(|&a| folded_int(self.tree, a)).collect();
        if let Some(iargs) = ints {
            return match builtins::fold_int(op, &iargs) {
                Some(r) => self.reduced_lit(t, r),
                None => t,
            };
        }

        let bools: Option<Vec<bool>> =
            args.iter().map(|&a| folded_bool(self.tree, a)).collect();
        if let Some(bargs) = bools {
            return match builtins::fold_logic(op, &bargs) {
                Some(r) => self.reduced_lit(t, r),
                None => t,
            };
        }

        let reals: Option<Vec<f64>> =
            args.iter().map(|&a| folded_real(self.tree, a)).collect();
        if let Some(rargs) = reals {
            return match builtins::fold_real(op, &rargs) {
                Some(r) => self.reduced_lit(t, r),
                None => t,
            };
        }

        let enums: Option<Vec<u32>> =
            args.iter().map(|&a| folded_enum(self.tree, a)).collect();
        if let Some(eargs) = enums {
            return match builtins::fold_enum(op, &eargs) {
                Some(r) => self.reduced_lit(t, r),
                None => t,
            };
        }

        let strings: Option<Vec<Vec<Ident>>> = args
            .iter()
            .map(|&a| match &self.tree.node(a).kind {
                NodeKind::StringLiteral(chars) => Some(chars.clone()),
                _ => None,
            })
            .collect();
        if let Some(sargs) = strings {
            return self.eval_string_call(t, op, &sargs);
        }

        t
    }

    /// Fold a call to a user-defined function by interpreting its body.
    fn eval_user_call(&mut self, t: NodeId, decl: NodeId, params: &[NodeId]) -> NodeId {
        let (ports, decls, stmts) = match &self.tree.node(decl).kind {
            NodeKind::FuncBody { ports, decls, stmts, .. } => {
                (ports.clone(), decls.clone(), stmts.clone())
            }
            // A declaration without a body cannot be interpreted
            _ => return t,
        };

        // Only scalar-returning functions are folded
        if let Some(ty) = self.tree.node(t).ty
            && self.tree.type_is_array(ty)
        {
            return t;
        }

        let mut folded_args = Vec::with_capacity(ports.len());
        for i in 0..ports.len() {
            let Some(&actual) = params.get(i) else {
                return t;
            };
            let value = self.eval_expr(actual);
            if !self.folded(value) {
                return t; // Cannot fold this function call
            }
            folded_args.push(value);
        }

        self.env.push();
        for (&port, &arg) in ports.iter().zip(folded_args.iter()) {
            let ident = match self.tree.node(port).kind.decl_ident() {
                Some(ident) => ident,
                None => panic!("function port has no name"),
            };
            self.env.bind(ident, arg);
        }

        // Bind initialized variable declarations, then run the body
        for &d in &decls {
            if let NodeKind::VarDecl { ident, value: Some(init) } = self.tree.node(d).kind {
                let value = self.eval_expr(init);
                self.env.bind(ident, value);
            }
        }
        let control = self.eval_stmts(&stmts);
        self.env.pop();

        match control {
            Control::Return(result) if self.folded(result) => result,
            _ => t,
        }
    }

    fn eval_universal(&mut self, t: NodeId, op: Builtin, args: &[NodeId]) -> NodeId {
        let folded = match op {
            Builtin::Mulri => folded_real(self.tree, args[0])
                .zip(folded_int(self.tree, args[1]))
                .map(|(r, i)| r * i as f64),
            Builtin::Mulir => folded_real(self.tree, args[1])
                .zip(folded_int(self.tree, args[0]))
                .map(|(r, i)| r * i as f64),
            Builtin::Divri => folded_real(self.tree, args[0])
                .zip(folded_int(self.tree, args[1]))
                .map(|(r, i)| r / i as f64),
            _ => unreachable!("not a universal operator"),
        };
        match folded {
            Some(value) => self.real_lit_like(t, value),
            None => panic!(
                "universal expression at {} cannot be evaluated",
                self.tree.node(t).loc
            ),
        }
    }

    fn eval_string_call(&mut self, t: NodeId, op: Builtin, args: &[Vec<Ident>]) -> NodeId {
        match op {
            Builtin::Aeq | Builtin::Aneq => {
                let invert = op == Builtin::Aneq;
                let (lhs, rhs) = (&args[0], &args[1]);
                let equal = lhs.len() == rhs.len()
                    && lhs.iter().zip(rhs.iter()).all(|(a, b)| a == b);
                self.bool_lit_like(t, equal != invert)
            }
            _ => t,
        }
    }

    fn eval_ref(&mut self, t: NodeId) -> NodeId {
        let NodeKind::Ref(decl) = self.tree.node(t).kind else {
            unreachable!("eval_ref on a non-reference node");
        };
        match &self.tree.node(decl).kind {
            NodeKind::ConstDecl { value: Some(init), .. } => {
                let init = *init;
                self.eval_expr(init)
            }
            kind => match kind.decl_ident().and_then(|ident| self.env.get(ident)) {
                Some(binding) => binding,
                None => t,
            },
        }
    }

    fn eval_type_conv(&mut self, t: NodeId) -> NodeId {
        let NodeKind::TypeConv { param } = self.tree.node(t).kind else {
            unreachable!("eval_type_conv on a non-conversion node");
        };
        let value = self.eval_expr(param);

        let (Some(from), Some(to)) = (self.tree.node(value).ty, self.tree.node(t).ty) else {
            return t;
        };
        let from_integer = matches!(self.tree.ty(from).kind, TypeKind::Integer { .. });
        let from_real = matches!(self.tree.ty(from).kind, TypeKind::Real);
        let to_integer = matches!(self.tree.ty(to).kind, TypeKind::Integer { .. });
        let to_real = matches!(self.tree.ty(to).kind, TypeKind::Real);

        if from_integer && to_real {
            if let Some(l) = folded_int(self.tree, value) {
                return self.real_lit_like(t, l as f64);
            }
        } else if from_real && to_integer {
            if let Some(l) = folded_real(self.tree, value) {
                // Truncation toward zero
                return self.int_lit_like(t, l as i64);
            }
        }

        t
    }

    // ---- Statements ----

    fn eval_stmts(&mut self, stmts: &[NodeId]) -> Control {
        for &s in stmts {
            match self.eval_stmt(s) {
                Control::Normal => {}
                control => return control,
            }
        }
        Control::Normal
    }

    fn eval_stmt(&mut self, t: NodeId) -> Control {
        let kind = self.tree.node(t).kind.clone();
        match kind {
            NodeKind::Return { value } => {
                let Some(value) = value else {
                    panic!("return statement in folded function has no value");
                };
                let result = self.eval_expr(value);
                Control::Return(result)
            }
            NodeKind::If { cond, then_stmts, else_stmts } => {
                let folded_cond = self.eval_expr(cond);
                match folded_bool(self.tree, folded_cond) {
                    Some(true) => self.eval_stmts(&then_stmts),
                    Some(false) => self.eval_stmts(&else_stmts),
                    None => {
                        let loc = self.tree.node(cond).loc.clone();
                        self.fail(&loc, "cannot constant fold expression")
                    }
                }
            }
            NodeKind::Case { value, assocs } => self.eval_case(value, &assocs),
            NodeKind::While { label, cond, stmts } => self.eval_while(t, label, cond, &stmts),
            NodeKind::For { idecl, range, stmts, .. } => self.eval_for(idecl, range, &stmts),
            NodeKind::VarAssign { target, value } => self.eval_var_assign(target, value),
            NodeKind::Block { stmts } => self.eval_stmts(&stmts),
            NodeKind::Exit { label, cond } => self.eval_exit(label, cond),
            other => {
                let loc = self.tree.node(t).loc.clone();
                self.fail(&loc, &format!("cannot evaluate {}", other.name()))
            }
        }
    }

    fn eval_case(&mut self, value: NodeId, assocs: &[Assoc]) -> Control {
        let value_loc = self.tree.node(value).loc.clone();
        if let Some(ty) = self.tree.node(value).ty
            && self.tree.type_is_array(ty)
        {
            return self.fail(&value_loc, "cannot constant fold array case");
        }

        let discriminant = self.eval_expr(value);
        let Some(v) = folded_int(self.tree, discriminant) else {
            return self.fail(&value_loc, "cannot constant fold expression");
        };

        for assoc in assocs {
            match assoc.kind {
                AssocKind::Named(name) => {
                    let folded_name = self.eval_expr(name);
                    let Some(cmp) = folded_int(self.tree, folded_name) else {
                        let loc = self.tree.node(name).loc.clone();
                        return self.fail(&loc, "cannot constant fold expression");
                    };
                    if cmp == v {
                        return self.eval_stmt(assoc.value);
                    }
                }
                AssocKind::Others => match self.eval_stmt(assoc.value) {
                    Control::Normal => {}
                    control => return control,
                },
                _ => panic!("unexpected association in case statement"),
            }
        }
        Control::Normal
    }

    fn eval_while(
        &mut self,
        t: NodeId,
        label: Ident,
        cond: Option<NodeId>,
        stmts: &[NodeId],
    ) -> Control {
        let mut iters: u32 = 0;
        loop {
            let mut cond_value = true;
            if let Some(cond) = cond {
                let folded_cond = self.eval_expr(cond);
                match folded_bool(self.tree, folded_cond) {
                    Some(b) => cond_value = b,
                    None => {
                        let loc = self.tree.node(cond).loc.clone();
                        return self.fail(&loc, "cannot constant fold expression");
                    }
                }
            }

            if !cond_value || self.failed {
                return Control::Normal;
            }
            iters += 1;
            if iters == MAX_ITERS {
                let loc = self.tree.node(t).loc.clone();
                return self.fail(&loc, "iteration limit exceeded");
            }

            match self.eval_stmts(stmts) {
                Control::Normal => {}
                Control::Exit(l) if l == label => return Control::Normal,
                control => return control,
            }
        }
    }

    fn eval_for(&mut self, idecl: NodeId, range: Range, stmts: &[NodeId]) -> Control {
        let left = self.eval_expr(range.left);
        let right = self.eval_expr(range.right);

        let (Some(l), Some(r)) = (folded_int(self.tree, left), folded_int(self.tree, right))
        else {
            self.failed = true;
            return Control::Fail;
        };

        let null = match range.dir {
            RangeDir::To => l > r,
            RangeDir::Downto => l < r,
        };
        if null {
            return Control::Normal;
        }

        let ident = match self.tree.node(idecl).kind.decl_ident() {
            Some(ident) => ident,
            None => panic!("for loop index is not a declaration"),
        };
        let step: i64 = match range.dir {
            RangeDir::To => 1,
            RangeDir::Downto => -1,
        };

        let mut ival = l;
        loop {
            let index = self.int_lit_like(left, ival);
            self.env.bind(ident, index);
            match self.eval_stmts(stmts) {
                Control::Normal => {}
                control => return control,
            }
            if ival == r {
                break;
            }
            ival += step;
        }
        Control::Normal
    }

    fn eval_var_assign(&mut self, target: NodeId, value: NodeId) -> Control {
        let NodeKind::Ref(decl) = self.tree.node(target).kind else {
            let loc = self.tree.node(target).loc.clone();
            return self.fail(&loc, "cannot evaluate this target");
        };

        let updated = self.eval_expr(value);
        if !self.folded(updated) {
            let loc = self.tree.node(value).loc.clone();
            return self.fail(&loc, "cannot constant fold expression");
        }

        let ident = match self.tree.node(decl).kind.decl_ident() {
            Some(ident) => ident,
            None => panic!("assignment target has no name"),
        };
        self.env.bind(ident, updated);
        Control::Normal
    }

    fn eval_exit(&mut self, label: Ident, cond: Option<NodeId>) -> Control {
        if let Some(cond) = cond {
            let folded_cond = self.eval_expr(cond);
            match folded_bool(self.tree, folded_cond) {
                Some(false) => return Control::Normal,
                Some(true) => {}
                None => {
                    let loc = self.tree.node(cond).loc.clone();
                    return self.fail(&loc, "cannot constant fold expression");
                }
            }
        }
        Control::Exit(label)
    }
}
