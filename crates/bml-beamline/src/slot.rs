//! Free-space patches between two arbitrary faces.
//!
//! A slot's exit face is a [`Frame`] relative to its entrance face. The
//! particle travels in a straight line from the entrance plane until it
//! meets the exit plane, and its coordinates are re-expressed in the
//! exit frame.

use std::rc::Rc;

use bml_core::phase::{CDT, NDP, NPX, NPY, X, Y};
use bml_core::{
    ConstructionError, Coordinate, Frame, JetParticle, Particle, PhaseSpace, PropagationError,
};

use crate::element::{ElementBuilder, Geometry, LeafElement};
use crate::kind::ElementKind;
use crate::propagator::Propagator;

/// Exact straight-line transport onto a slot's exit face.
#[derive(Clone, Copy, Debug, Default)]
pub struct SlotPropagator;

impl SlotPropagator {
    fn track<P: PhaseSpace>(element: &LeafElement, p: &mut P) -> Result<(), PropagationError> {
        let exit = match element.geometry() {
            Geometry::Patch { exit } => *exit,
            _ => Frame::straight(element.length()),
        };
        let npz = p.npz();
        let beta = p.beta();
        let o = exit.origin();
        let s = p.state();

        let mut r = Vec::with_capacity(3);
        let mut q = Vec::with_capacity(3);
        for k in 0..3 {
            let a = exit.axis(k);
            r.push((s[X].clone() - o[0]) * a[0] + (s[Y].clone() - o[1]) * a[1] - o[2] * a[2]);
            q.push(s[NPX].clone() * a[0] + s[NPY].clone() * a[1] + npz.clone() * a[2]);
        }
        let pz = q[2].standard_part();
        if pz.is_nan() || pz <= 0.0 {
            return Err(PropagationError::DegenerateGeometry {
                element: element.name().to_owned(),
                detail: format!("exit-frame longitudinal momentum {pz}"),
            });
        }

        let t = -r[2].clone() / q[2].clone();
        let path = t.clone() * (s[NDP].clone() + 1.0);
        let x = r[0].clone() + t.clone() * q[0].clone();
        let y = r[1].clone() + t * q[1].clone();
        let cdt = s[CDT].clone() + path / beta - element.reference_time();

        let s = p.state_mut();
        s[X] = x;
        s[Y] = y;
        s[NPX] = q[0].clone();
        s[NPY] = q[1].clone();
        s[CDT] = cdt;
        Ok(())
    }
}

impl Propagator for SlotPropagator {
    fn name(&self) -> &str {
        "slot"
    }

    fn accepts(&self, kind: ElementKind) -> bool {
        kind == ElementKind::Slot
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

/// A slot named `name` whose exit face is `exit`.
///
/// Its length is the straight distance between the faces' origins.
pub fn make_slot(name: impl Into<String>, exit: Frame) -> Result<LeafElement, ConstructionError> {
    ElementBuilder::new(ElementKind::Slot, name)
        .length(exit.distance())
        .geometry(Geometry::Patch { exit })
        .propagator(Rc::new(SlotPropagator))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_slot_is_a_drift() {
        let slot = make_slot("S", Frame::straight(2.0)).unwrap();
        assert_eq!(slot.length(), 2.0);
        let mut p = Particle::proton(10.0).with_state([1e-3, 0.0, 0.0, 1e-4, -2e-4, 0.0]);
        slot.propagate(&mut p).unwrap();
        let npz = (1.0_f64 - 1e-8 - 4e-8).sqrt();
        assert!((p.state()[X] - (1e-3 + 2.0 * 1e-4 / npz)).abs() < 1e-15);
        assert!((p.state()[Y] - (-2.0 * 2e-4 / npz)).abs() < 1e-15);
        assert_eq!(p.state()[NPX], 1e-4);
    }

    #[test]
    fn translated_face_shifts_position() {
        let exit = Frame::straight(1.0).translated([1e-3, 0.0, 0.0]);
        let slot = make_slot("S", exit).unwrap();
        let mut p = Particle::proton(10.0);
        slot.propagate(&mut p).unwrap();
        assert!((p.state()[X] + 1e-3).abs() < 1e-15);
        assert_eq!(p.state()[NPX], 0.0);
    }

    #[test]
    fn yawed_face_tilts_momentum() {
        let angle = 1e-3;
        let exit = Frame::straight(1.0).rotated(1, angle, [0.0, 0.0, 1.0]);
        let slot = make_slot("S", exit).unwrap();
        let mut p = Particle::proton(10.0);
        slot.propagate(&mut p).unwrap();
        assert!((p.state()[NPX].abs() - angle.sin()).abs() < 1e-15);
        assert!(p.state()[X].abs() < 1e-15);
    }

    #[test]
    fn face_turned_past_the_beam_is_degenerate() {
        let exit = Frame::straight(1.0).rotated(1, 2.0, [0.0, 0.0, 1.0]);
        let slot = make_slot("S", exit).unwrap();
        let mut p = Particle::proton(10.0);
        let err = slot.propagate(&mut p).unwrap_err();
        assert_eq!(err.code(), 3);
    }

    #[test]
    fn jet_slot_agrees_with_plain() {
        let exit = Frame::straight(1.5).rotated(0, 2e-3, [0.0, 0.0, 1.5]);
        let slot = make_slot("S", exit).unwrap();
        let start = [1e-4, -3e-4, 0.0, 2e-5, 1e-5, 1e-3];
        let mut plain = Particle::proton(10.0).with_state(start);
        let mut jet = JetParticle::new(&plain, 1).unwrap();
        slot.propagate(&mut plain).unwrap();
        slot.propagate_jet(&mut jet).unwrap();
        let from_jet = jet.to_particle();
        for k in 0..6 {
            assert!((plain.state()[k] - from_jet.state()[k]).abs() < 1e-14);
        }
    }
}
