//! Static analysis and constant evaluation for the Veld VHDL front-end.
//!
//! Two tightly-coupled passes over the decorated design tree:
//!
//! - [`bounds::BoundsChecker`] proves, wherever statically decidable,
//!   that index accesses, slices, aggregates, call arguments,
//!   assignments, case choices, and type conversions respect their
//!   declared constraints, and marks fully-proven array accesses so
//!   later phases can skip the runtime check.
//! - [`eval::eval`] reduces pure function calls (including user-defined
//!   function bodies) to literal nodes when every input is statically
//!   known, returning the original call untouched otherwise.
//!
//! Both passes share the `folded_*` primitives in [`fold`], which decide
//! how much of a program is known at elaboration time.

pub mod bounds;
pub mod builtins;
pub mod diag;
pub mod eval;
pub mod fold;

pub use bounds::{BoundsChecker, Cover, Interval, IntervalSet, bounds_check};
pub use builtins::{Builtin, Reduced};
pub use diag::{Diagnostic, Diagnostics, Severity};
pub use eval::eval;
pub use fold::{
    assume_int, folded_bool, folded_bounds, folded_enum, folded_int, folded_length,
    folded_real, range_is_null,
};
