//! Physics propagators for bml beamlines.
//!
//! One propagator per element family, each generic over the phase-space
//! coordinate so the same code tracks plain particles and builds
//! truncated-power-series maps:
//!
//! | family | propagators |
//! |---|---|
//! | drift, monitors | [`ExactDrift`], [`MadDrift`], [`MonitorPropagator`] |
//! | quadrupole | [`LinearQuad`], [`MultiKickQuad`], [`ThinQuadKick`] |
//! | sextupole | [`SextupoleKick`], [`ThinSextupoleKick`] |
//! | correctors | [`CorrectorKick`] |
//! | bends | [`SbendLinear`], [`RbendLinear`] |
//! | marker, srot | [`MarkerPropagator`], [`SRotation`] |
//!
//! [`ElementFactory`] builds elements with the propagators chosen by a
//! [`TrackingConfig`]; [`rebind`] switches an existing line to another
//! configuration.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod bend;
pub mod config;
pub mod drift;
pub mod factory;
pub mod kick;
pub mod marker;
pub mod monitor;
pub mod multipole;
mod physics;
pub mod quadrupole;
pub mod rebind;

pub use bend::{RbendLinear, SbendLinear};
pub use config::{BendModel, ConfigError, DriftModel, QuadModel, TrackingConfig};
pub use drift::{ExactDrift, MadDrift};
pub use factory::ElementFactory;
pub use kick::CorrectorKick;
pub use marker::{MarkerPropagator, SRotation};
pub use monitor::MonitorPropagator;
pub use multipole::{SextupoleKick, ThinSextupoleKick};
pub use quadrupole::{LinearQuad, MultiKickQuad, ThinQuadKick};
pub use rebind::{rebind, restore, Binding};
