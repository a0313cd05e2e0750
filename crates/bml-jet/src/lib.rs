//! Truncated multivariate power series ("jets") for map building.
//!
//! A [`Jet`] is a polynomial in `n` variables truncated at a fixed
//! maximum total order. Every jet carries a shared [`JetEnvironment`]
//! describing the variable count, the truncation order, the reference
//! point the expansion is taken about, and the monomial tables used by
//! multiplication.
//!
//! # Layout
//!
//! ```text
//! JetEnvironment (Arc-shared)
//! ├── monomials: graded order, constant first, then x0..x(n-1), ...
//! ├── index:     exponents -> coefficient slot
//! └── products:  slot i -> [(slot j, slot i+j)] within the order limit
//! Jet
//! └── coeffs: Vec<f64>, one per monomial
//! ```
//!
//! Because the ordering is graded, the coefficient of the linear
//! monomial in variable `i` always lives at slot `1 + i`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod environment;
pub mod error;
pub mod jet;
pub mod monomial;

pub use environment::JetEnvironment;
pub use error::JetError;
pub use jet::Jet;
pub use monomial::Exponents;
