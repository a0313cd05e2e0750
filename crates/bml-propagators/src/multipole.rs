//! Sextupoles, thick and thin.
//!
//! Strength is `B''` [T/m²] for thick magnets and `B''L` [T/m] for
//! thin ones.

use bml_beamline::{ElementKind, LeafElement, Propagator};
use bml_core::{JetParticle, Particle, PhaseSpace, PropagationError};

use crate::physics::{exact_drift, finish, normalized_strength, sextupole_kick};

/// Thick sextupole as drift, kick, drift.
#[derive(Clone, Copy, Debug, Default)]
pub struct SextupoleKick;

impl SextupoleKick {
    fn track<P: PhaseSpace>(element: &LeafElement, p: &mut P) -> Result<(), PropagationError> {
        let length = element.length();
        let k2l = normalized_strength(p, element) * length;
        exact_drift(p, 0.5 * length, element.name())?;
        sextupole_kick(p, k2l);
        exact_drift(p, 0.5 * length, element.name())?;
        finish(p, element);
        Ok(())
    }
}

impl Propagator for SextupoleKick {
    fn name(&self) -> &str {
        "sextupole"
    }

    fn accepts(&self, kind: ElementKind) -> bool {
        kind == ElementKind::Sextupole
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

/// Thin sextupole: a single kick of integrated `B''L`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThinSextupoleKick;

impl ThinSextupoleKick {
    fn track<P: PhaseSpace>(element: &LeafElement, p: &mut P) {
        let k2l = normalized_strength(p, element);
        sextupole_kick(p, k2l);
        finish(p, element);
    }
}

impl Propagator for ThinSextupoleKick {
    fn name(&self) -> &str {
        "thin_sextupole"
    }

    fn accepts(&self, kind: ElementKind) -> bool {
        kind == ElementKind::ThinSextupole
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

#[cfg(test)]
mod tests {
    use super::*;
    use bml_beamline::ElementBuilder;
    use bml_core::phase::{NPX, X};
    use std::rc::Rc;

    #[test]
    fn sextupole_is_second_order() {
        let sx = ElementBuilder::new(ElementKind::Sextupole, "SX")
            .length(0.2)
            .strength(50.0)
            .propagator(Rc::new(SextupoleKick))
            .build()
            .unwrap();
        let mut jp = JetParticle::new(&Particle::proton(10.0), 2).unwrap();
        sx.propagate_jet(&mut jp).unwrap();
        let m = jp.jacobian();
        assert_eq!(m[NPX][X], 0.0);
        assert!(jp.state()[NPX].coefficient(&[2, 0, 0, 0, 0, 0]) < 0.0);
    }

    #[test]
    fn thin_sextupole_on_axis_does_nothing() {
        let sx = ElementBuilder::new(ElementKind::ThinSextupole, "SX")
            .strength(3.0)
            .propagator(Rc::new(ThinSextupoleKick))
            .build()
            .unwrap();
        let mut p = Particle::proton(10.0);
        sx.propagate(&mut p).unwrap();
        assert_eq!(p.state(), &[0.0; 6]);
    }
}
