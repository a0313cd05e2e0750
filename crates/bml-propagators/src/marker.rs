//! Zero-length reference points and beam-axis rotations.

use bml_beamline::{ElementKind, LeafElement, Propagator};
use bml_core::{Alignment, JetParticle, Particle, PhaseSpace, PropagationError};

use crate::physics::finish;

/// Leaves the transverse state alone; only the reference time is removed.
#[derive(Clone, Copy, Debug, Default)]
pub struct MarkerPropagator;

impl Propagator for MarkerPropagator {
    fn name(&self) -> &str {
        "marker"
    }

    fn accepts(&self, kind: ElementKind) -> bool {
        kind == ElementKind::Marker
    }

    fn propagate(&self, element: &LeafElement, particle: &mut Particle) -> Result<(), PropagationError> {
        finish(particle, element);
        Ok(())
    }

    fn propagate_jet(
        &self,
        element: &LeafElement,
        particle: &mut JetParticle,
    ) -> Result<(), PropagationError> {
        finish(particle, element);
        Ok(())
    }
}

/// Rotates the transverse coordinates about the beam axis by the
/// element's strength [rad].
#[derive(Clone, Copy, Debug, Default)]
pub struct SRotation;

impl SRotation {
    fn track<P: PhaseSpace>(element: &LeafElement, p: &mut P) {
        Alignment::new(0.0, 0.0, element.strength()).misalign(p.state_mut());
        finish(p, element);
    }
}

impl Propagator for SRotation {
    fn name(&self) -> &str {
        "srot"
    }

    fn accepts(&self, kind: ElementKind) -> bool {
        kind == ElementKind::Srot
    }

    fn propagate(&self, element: &LeafElement, particle: &mut Particle) -> Result<(), PropagationError> {
        Self::track(element, particle);
        Ok(())
    }

    fn propagate_jet(
        &self,
        element: &LeafElement,
        particle: &mut JetParticle,
    ) -> Result<(), PropagationError> {
        Self::track(element, particle);
        Ok(())
    }
}
