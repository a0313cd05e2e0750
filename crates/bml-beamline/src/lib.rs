//! Beamline elements, the propagator contract, and line editing.
//!
//! An [`Element`] is either a [`LeafElement`] (a physical segment bound
//! to a [`Propagator`]) or a nested [`Beamline`]. Lines hold shared
//! [`ElmPtr`] handles, so one element can sit in several lines and a
//! parameter change through any handle is seen by all of them.
//!
//! Tracking walks a line in order; each leaf enters its local frame
//! (alignment), runs its propagator, checks its aperture and leaves the
//! local frame. The same code path serves plain [`Particle`]s and
//! series-valued [`JetParticle`]s.
//!
//! [`Particle`]: bml_core::Particle
//! [`JetParticle`]: bml_core::JetParticle

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod beamline;
pub mod data;
pub mod edit;
pub mod element;
pub mod insert;
pub mod iter;
pub mod kind;
pub mod propagator;
pub mod sector;
pub mod slot;
pub mod visitor;

pub use beamline::{Beamline, LineMode, Neighbors};
pub use data::ElementData;
pub use edit::Touched;
pub use element::{Element, ElementBuilder, ElmPtr, Geometry, LeafElement};
pub use iter::{DeepIter, DeepReverseIter, ForwardIter, ReverseIter};
pub use kind::{ElementKind, StrengthScaling};
pub use propagator::{IdentityPropagator, Propagator, SubLinePropagator};
pub use sector::MapPropagator;
pub use slot::{make_slot, SlotPropagator};
pub use visitor::{walk_beamline, Visitor};
