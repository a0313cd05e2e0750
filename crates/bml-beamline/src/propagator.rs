//! The [`Propagator`] strategy contract and the structural propagators.
//!
//! A propagator advances a particle across one leaf element in the
//! element's local frame. Elements hold their propagator behind an `Rc`
//! and can be rebound at runtime with
//! [`LeafElement::set_propagator`](crate::LeafElement::set_propagator),
//! which is how a whole line is switched between tracking models.

use std::fmt;

use bml_core::phase::CDT;
use bml_core::{JetParticle, Particle, PhaseSpace, PropagationError};

use crate::element::LeafElement;
use crate::kind::ElementKind;

/// Local coordinate transformation for one element family.
///
/// # Contract
///
/// - Both entry points receive the state already in the element's local
///   frame; alignment and aperture are handled by the element.
/// - Implementations subtract [`LeafElement::reference_time`] from `cdt`
///   so that the registered reference particle stays at `cdt = 0`.
/// - Physical failure is an `Err`, never a panic.
///
/// # Examples
///
/// A propagator that shifts the horizontal position by a fixed amount:
///
/// ```
/// use bml_beamline::{ElementBuilder, ElementKind, LeafElement, Propagator};
/// use bml_core::{JetParticle, Particle, PhaseSpace, PropagationError};
/// use std::rc::Rc;
///
/// #[derive(Debug)]
/// struct Shift(f64);
///
/// impl Propagator for Shift {
///     fn name(&self) -> &str { "shift" }
///     fn accepts(&self, _kind: ElementKind) -> bool { true }
///     fn propagate(&self, _e: &LeafElement, p: &mut Particle) -> Result<(), PropagationError> {
///         p.state_mut()[0] += self.0;
///         Ok(())
///     }
///     fn propagate_jet(&self, _e: &LeafElement, p: &mut JetParticle) -> Result<(), PropagationError> {
///         let x = p.state()[0].clone();
///         p.state_mut()[0] = x + self.0;
///         Ok(())
///     }
/// }
///
/// let elm = ElementBuilder::new(ElementKind::Marker, "M")
///     .propagator(Rc::new(Shift(1e-3)))
///     .build()
///     .unwrap();
/// let mut p = Particle::proton(1.0);
/// elm.propagate(&mut p).unwrap();
/// assert_eq!(p.state()[0], 1e-3);
/// ```
pub trait Propagator: fmt::Debug {
    /// Human-readable name for diagnostics.
    fn name(&self) -> &str;

    /// Whether this propagator can drive elements of `kind`.
    fn accepts(&self, kind: ElementKind) -> bool;

    /// Advance a plain particle across `element`.
    fn propagate(&self, element: &LeafElement, particle: &mut Particle) -> Result<(), PropagationError>;

    /// Advance a series particle across `element`.
    fn propagate_jet(
        &self,
        element: &LeafElement,
        particle: &mut JetParticle,
    ) -> Result<(), PropagationError>;
}

/// Leaves the state untouched. Drives any kind; used for markers and
/// as a placeholder binding.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityPropagator;

impl Propagator for IdentityPropagator {
    fn name(&self) -> &str {
        "identity"
    }

    fn accepts(&self, _kind: ElementKind) -> bool {
        true
    }

    fn propagate(&self, _element: &LeafElement, _particle: &mut Particle) -> Result<(), PropagationError> {
        Ok(())
    }

    fn propagate_jet(
        &self,
        _element: &LeafElement,
        _particle: &mut JetParticle,
    ) -> Result<(), PropagationError> {
        Ok(())
    }
}

/// Tracks through a composite element's sub-line.
#[derive(Clone, Copy, Debug, Default)]
pub struct SubLinePropagator;

impl Propagator for SubLinePropagator {
    fn name(&self) -> &str {
        "sub_line"
    }

    fn accepts(&self, kind: ElementKind) -> bool {
        kind == ElementKind::CombinedFunction
    }

    fn propagate(&self, element: &LeafElement, particle: &mut Particle) -> Result<(), PropagationError> {
        if let Some(line) = element.sub_line() {
            line.propagate(particle)?;
        }
        particle.state_mut()[CDT] -= element.reference_time();
        Ok(())
    }

    fn propagate_jet(
        &self,
        element: &LeafElement,
        particle: &mut JetParticle,
    ) -> Result<(), PropagationError> {
        if let Some(line) = element.sub_line() {
            line.propagate_jet(particle)?;
        }
        let cdt = particle.state()[CDT].clone();
        particle.state_mut()[CDT] = cdt - element.reference_time();
        Ok(())
    }
}
