//! Set-theoretic type engine for the Tern type checker.
//!
//! Types are Boolean combinations (unions, intersections, negations) of
//! atomic type constructors: functions, tuples, tagged records, atoms,
//! integers, bitstrings and maps. Each constructor is represented as a
//! binary decision diagram over its atoms, nested under a second diagram
//! over type variables; a [`TypeRecord`] is the componentwise sum of those
//! diagrams, and a [`TyRef`] is an interned handle to a record in a
//! [`TypeStore`].
//!
//! The engine answers three questions:
//!
//! * **emptiness** -- does a type denote the empty set of values?
//!   ([`QueryCtx::is_empty`])
//! * **subtyping** -- `a ≤ b` iff `a ∧ ¬b` is empty ([`QueryCtx::is_subtype`])
//! * **tallying** -- which substitutions for the flexible type variables make
//!   a set of subtype constraints hold? ([`QueryCtx::tally`])
//!
//! Recursive types are supported throughout: records may refer back to their
//! own handle (built with [`TypeStore::fresh_recursive`]), and the decision
//! procedures guard recursion with per-query memo tables that assume
//! emptiness coinductively until proven otherwise.
//!
//! The engine is a pure function library: it owns no persistent state beyond
//! the type store, performs no I/O, and reports resource exhaustion
//! ([`Interrupted`]) instead of guessing.

use std::hash::BuildHasherDefault;

use rustc_hash::FxHasher;

pub use crate::bdd::Bdd;
pub use crate::cancellation::{CancellationSource, CancellationToken};
pub use crate::constraints::{Atomic, Bundle, SolutionSet};
pub use crate::error::{Interrupted, StructuralError};
pub use crate::store::{TyRef, TypeStore};
pub use crate::types::{QueryCtx, Symbol, TypeRecord, Var};

pub mod bdd;
mod cancellation;
pub mod constraints;
mod error;
pub mod store;
pub mod types;

pub type FxOrderSet<V> = ordermap::set::OrderSet<V, BuildHasherDefault<FxHasher>>;
