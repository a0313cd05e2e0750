//! Horizontal and vertical correctors.
//!
//! Strength is the kick angle [rad]. A corrector with length applies
//! its kick at the centre, between two half-length drifts.

use bml_beamline::{ElementKind, LeafElement, Propagator};
use bml_core::{JetParticle, Particle, PhaseSpace, PropagationError};

use crate::physics::{exact_drift, finish, kick};

/// Dipole corrector kick in the plane the element's kind names.
#[derive(Clone, Copy, Debug, Default)]
pub struct CorrectorKick;

impl CorrectorKick {
    fn track<P: PhaseSpace>(element: &LeafElement, p: &mut P) -> Result<(), PropagationError> {
        let half = 0.5 * element.length();
        exact_drift(p, half, element.name())?;
        let angle = p.parameter(element.strength(), element.strength_index());
        let zero = p.coord(0.0);
        match element.kind() {
            ElementKind::VKick => kick(p, zero, angle),
            _ => kick(p, angle, zero),
        }
        exact_drift(p, half, element.name())?;
        finish(p, element);
        Ok(())
    }
}

impl Propagator for CorrectorKick {
    fn name(&self) -> &str {
        "corrector"
    }

    fn accepts(&self, kind: ElementKind) -> bool {
        matches!(kind, ElementKind::HKick | ElementKind::VKick)
    }

    fn propagate(&self, element: &LeafElement, particle: &mut Particle) -> Result<(), PropagationError> {
        Self::track(element, particle)
    }

    fn propagate_jet(
        &self,
        element: &LeafElement,
        particle: &mut JetParticle,
    ) -> Result<(), PropagationError> {
        Self::track(element, particle)
    }
}
