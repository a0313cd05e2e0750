//! Errors raised while building jet environments.

use thiserror::Error;

/// Invalid environment parameters or variable references.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum JetError {
    /// An environment needs at least one variable.
    #[error("a jet environment needs at least one variable")]
    NoVariables,
    /// The reference point does not have one entry per variable.
    #[error("reference point has {got} entries, expected {expected}")]
    ReferenceLength {
        /// Number of variables in the environment.
        expected: usize,
        /// Length of the supplied reference point.
        got: usize,
    },
    /// The monomial table would exceed [`MAX_MONOMIALS`](crate::environment::MAX_MONOMIALS).
    #[error("{num_vars} variables at order {max_order} need {count} monomials (limit {limit})")]
    TooManyMonomials {
        /// Requested variable count.
        num_vars: usize,
        /// Requested truncation order.
        max_order: u32,
        /// Monomials the table would need.
        count: usize,
        /// Configured limit.
        limit: usize,
    },
    /// A variable index was outside the environment.
    #[error("variable {index} out of range for {num_vars} variables")]
    VariableOutOfRange {
        /// The offending index.
        index: usize,
        /// Variables in the environment.
        num_vars: usize,
    },
}
