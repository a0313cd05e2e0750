//! Test fixtures for bml development.
//!
//! Propagators with observable side effects ([`fixtures`]) and a few
//! canned lines ([`lines`]) shared by the integration tests and
//! benchmarks of the other crates.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod lines;

pub use fixtures::{FailingPropagator, RecordingPropagator, ShiftPropagator};
pub use lines::{factory, five_gev_line, nested_line, FIVE_GEV};
