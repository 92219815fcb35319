//! Error taxonomy of the engine.
//!
//! Three failure modes are distinguished:
//!
//! * [`StructuralError`] -- malformed input at the construction boundary
//!   (e.g. an atom whose arity disagrees with the declared constructor
//!   arity). Never produced past that boundary.
//! * [`Interrupted`] -- a caller-supplied fuel or cancellation bound was hit
//!   mid-query. The caller recovers conservatively ("not empty", "no
//!   constraint").
//! * Contradictory tallying constraints are a *normal result* (an
//!   unsatisfiable [`crate::SolutionSet`]), not an error.

/// Malformed input fed to a type constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    /// An atom's arity disagrees with the arity declared for its DNF.
    #[error("arity mismatch: constructor declared arity {expected} but atom has arity {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    /// An integer range whose lower bound exceeds its upper bound.
    #[error("invalid integer range: {lo} > {hi}")]
    InvalidRange { lo: i64, hi: i64 },
}

/// A query hit its fuel budget or was cancelled by the host.
///
/// This is a distinct result variant, not a wrong answer: the memo state of
/// the interrupted query is discarded and the query can be retried with a
/// larger budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Interrupted {
    #[error("query fuel exhausted")]
    BudgetExhausted,

    #[error("query cancelled")]
    Cancelled,
}
