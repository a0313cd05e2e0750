//! Core types for beamline composition and propagation.
//!
//! This is the leaf crate above the [`bml_jet`] numeric layer. It
//! defines the phase-space conventions, the [`Coordinate`] contract that
//! lets one propagation routine serve both plain and series states,
//! the particle types, alignment and aperture descriptions, reference
//! frames for geometric edits, barnacle side-data, and the error types
//! shared by every other crate in the workspace.
//!
//! # Phase space
//!
//! | Index | Constant | Meaning |
//! |-------|----------|---------|
//! | 0 | [`phase::X`] | horizontal position [m] |
//! | 1 | [`phase::Y`] | vertical position [m] |
//! | 2 | [`phase::CDT`] | path-time deviation `c·dt` [m] |
//! | 3 | [`phase::NPX`] | `px / p_ref` |
//! | 4 | [`phase::NPY`] | `py / p_ref` |
//! | 5 | [`phase::NDP`] | `(p - p_ref) / p_ref` |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod alignment;
pub mod aperture;
pub mod barnacle;
pub mod bunch;
pub mod coordinate;
pub mod error;
pub mod frame;
pub mod particle;
pub mod phase;

pub use alignment::{Alignment, AlignmentData};
pub use aperture::Aperture;
pub use barnacle::{BarnacleList, LatticeFunctions, RingTunes};
pub use bunch::ParticleBunch;
pub use coordinate::Coordinate;
pub use error::{ConstructionError, ConstructionFault, EditError, PropagationError};
pub use frame::Frame;
pub use particle::{JetParticle, Kinematics, Particle, PhaseSpace, Species};
