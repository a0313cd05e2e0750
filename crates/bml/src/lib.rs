//! bml: beamline composition and particle propagation.
//!
//! This is the facade crate that re-exports the public API of the bml
//! sub-crates. Adding `bml` as a single dependency is enough for most
//! users.
//!
//! # Quick start
//!
//! ```rust
//! use bml::prelude::*;
//!
//! let f = ElementFactory::new(TrackingConfig::default()).unwrap();
//! let mut line = Beamline::new("CELL");
//! line.set_nominal_energy(Some(5.0));
//! line.append(f.drift("DA", 2.0).unwrap());
//! line.append(f.quadrupole("Q", 0.5, 1.3).unwrap());
//! line.append(f.drift("DB", 3.0).unwrap());
//!
//! // Plain tracking.
//! let mut p = Particle::proton_with_energy(5.0).with_state([1e-3, 0.0, 0.0, 0.0, 0.0, 0.0]);
//! line.propagate(&mut p).unwrap();
//!
//! // First-order map of the whole line.
//! let mut map = JetParticle::new(&Particle::proton_with_energy(5.0), 1).unwrap();
//! line.propagate_jet(&mut map).unwrap();
//! let m = map.jacobian();
//! assert!((m[X][X] * 1e-3 - p.state()[X]).abs() < 1e-12);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`jet`] | `bml-jet` | Truncated power series |
//! | [`core`] | `bml-core` | Particles, phase space, frames, alignment, errors |
//! | [`beamline`] | `bml-beamline` | Elements, lines, editing, visitors |
//! | [`propagators`] | `bml-propagators` | Physics, tracking config, factory |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Truncated power series (`bml-jet`).
pub use bml_jet as jet;

/// Particles, phase space, frames and errors (`bml-core`).
///
/// [`core::Particle`] carries a plain state; [`core::JetParticle`]
/// carries one jet per coordinate and yields transfer maps.
pub use bml_core as core;

/// Elements, lines and structural edits (`bml-beamline`).
pub use bml_beamline as beamline;

/// Physics propagators and the element factory (`bml-propagators`).
pub use bml_propagators as propagators;

/// Common imports for typical bml usage.
///
/// ```rust
/// use bml::prelude::*;
/// ```
pub mod prelude {
    // Phase space
    pub use bml_core::phase::{State, CDT, NDP, NPX, NPY, X, Y};
    pub use bml_core::{JetParticle, Kinematics, Particle, ParticleBunch, PhaseSpace, Species};

    // Geometry
    pub use bml_core::{Alignment, Aperture, Frame};

    // Errors
    pub use bml_core::{ConstructionError, EditError, PropagationError};

    // Lines and elements
    pub use bml_beamline::{
        Beamline, Element, ElementBuilder, ElementKind, ElmPtr, LeafElement, LineMode, Propagator,
        Visitor,
    };

    // Tracking models
    pub use bml_propagators::{ElementFactory, TrackingConfig};
}
