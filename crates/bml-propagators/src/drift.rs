//! Field-free straight sections.

use bml_beamline::{ElementKind, LeafElement, Propagator};
use bml_core::{JetParticle, Particle, PhaseSpace, PropagationError};

use crate::physics::{exact_drift, finish, mad_drift};

fn drives(kind: ElementKind) -> bool {
    matches!(
        kind,
        ElementKind::Drift | ElementKind::Monitor | ElementKind::HMonitor | ElementKind::VMonitor
    )
}

/// Exact straight-line drift.
///
/// Fails with [`PropagationError::ImaginaryMomentum`] when the transverse
/// momentum exceeds the total momentum.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExactDrift;

impl ExactDrift {
    fn track<P: PhaseSpace>(element: &LeafElement, p: &mut P) -> Result<(), PropagationError> {
        exact_drift(p, element.length(), element.name())?;
        finish(p, element);
        Ok(())
    }
}

impl Propagator for ExactDrift {
    fn name(&self) -> &str {
        "drift_exact"
    }

    fn accepts(&self, kind: ElementKind) -> bool {
        drives(kind)
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

/// First-order (MAD) drift: paraxial positions, linearized timing.
#[derive(Clone, Copy, Debug, Default)]
pub struct MadDrift;

impl MadDrift {
    fn track<P: PhaseSpace>(element: &LeafElement, p: &mut P) {
        mad_drift(p, element.length());
        finish(p, element);
    }
}

impl Propagator for MadDrift {
    fn name(&self) -> &str {
        "drift_mad"
    }

    fn accepts(&self, kind: ElementKind) -> bool {
        drives(kind)
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
