//! Beam position monitors.

use bml_beamline::{ElementKind, LeafElement, Propagator};
use bml_core::phase::{X, Y};
use bml_core::{Coordinate, JetParticle, Particle, PhaseSpace, PropagationError};
use tracing::trace;

use crate::physics::{exact_drift, finish};

/// Drift-like transport that reports the reading at the monitor's centre.
///
/// Readings go out as `trace` events with the plane the monitor
/// measures; nothing is stored on the element.
#[derive(Clone, Copy, Debug, Default)]
pub struct MonitorPropagator;

impl MonitorPropagator {
    fn track<P: PhaseSpace>(element: &LeafElement, p: &mut P) -> Result<(), PropagationError> {
        let half = 0.5 * element.length();
        exact_drift(p, half, element.name())?;
        let (x, y) = (p.state()[X].standard_part(), p.state()[Y].standard_part());
        match element.kind() {
            ElementKind::HMonitor => trace!(monitor = element.name(), x, "reading"),
            ElementKind::VMonitor => trace!(monitor = element.name(), y, "reading"),
            _ => trace!(monitor = element.name(), x, y, "reading"),
        }
        exact_drift(p, half, element.name())?;
        finish(p, element);
        Ok(())
    }
}

impl Propagator for MonitorPropagator {
    fn name(&self) -> &str {
        "monitor"
    }

    fn accepts(&self, kind: ElementKind) -> bool {
        matches!(
            kind,
            ElementKind::Monitor | ElementKind::HMonitor | ElementKind::VMonitor
        )
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
