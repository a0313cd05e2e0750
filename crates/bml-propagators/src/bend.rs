//! Dipoles, first order.
//!
//! The bend angle comes from the element's geometry; the field strength
//! is carried for bookkeeping. A sector bend's length is its arc; a
//! rectangular bend's length is its chord, and its faces are each
//! rotated by half the bend angle relative to the sector faces.

use bml_beamline::{ElementKind, Geometry, LeafElement, Propagator};
use bml_core::phase::{CDT, NDP, NPX, NPY, X, Y};
use bml_core::{JetParticle, Particle, PhaseSpace, PropagationError};

use crate::physics::{finish, mad_drift};

/// Sector-bend transfer matrix over arc length `arc` and angle `angle`.
pub(crate) fn sector_body<P: PhaseSpace>(p: &mut P, arc: f64, angle: f64) {
    if angle == 0.0 {
        mad_drift(p, arc);
        return;
    }
    let kin = *p.kinematics();
    let (beta, gamma) = (kin.beta(), kin.gamma());
    let h = angle / arc;
    let (sn, cs) = angle.sin_cos();

    let s = p.state_mut();
    let (x, npx, ndp) = (s[X].clone(), s[NPX].clone(), s[NDP].clone());
    s[X] = x.clone() * cs + npx.clone() * (sn / h) + ndp.clone() * ((1.0 - cs) / h);
    s[NPX] = x.clone() * (-h * sn) + npx.clone() * cs + ndp.clone() * sn;
    let y = s[Y].clone() + s[NPY].clone() * arc;
    s[Y] = y;
    let path = x * sn + npx * ((1.0 - cs) / h) + ndp.clone() * (arc - sn / h) + arc;
    let cdt = s[CDT].clone() + path / beta + ndp * (-arc / (beta * gamma * gamma));
    s[CDT] = cdt;
}

/// Linear edge focusing of a face rotated by `edge` [rad] on a bend of
/// curvature `h` [1/m].
pub(crate) fn edge_kick<P: PhaseSpace>(p: &mut P, h: f64, edge: f64) {
    let t = h * edge.tan();
    let s = p.state_mut();
    let npx = s[NPX].clone() + s[X].clone() * t;
    let npy = s[NPY].clone() - s[Y].clone() * t;
    s[NPX] = npx;
    s[NPY] = npy;
}

/// Linear sector bend.
#[derive(Clone, Copy, Debug, Default)]
pub struct SbendLinear;

impl SbendLinear {
    fn track<P: PhaseSpace>(element: &LeafElement, p: &mut P) {
        sector_body(p, element.length(), element.bend_angle());
        finish(p, element);
    }
}

impl Propagator for SbendLinear {
    fn name(&self) -> &str {
        "sbend_linear"
    }

    fn accepts(&self, kind: ElementKind) -> bool {
        kind == ElementKind::Sbend
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

/// Linear rectangular bend: edge, sector body over the arc, edge.
#[derive(Clone, Copy, Debug, Default)]
pub struct RbendLinear;

impl RbendLinear {
    fn track<P: PhaseSpace>(element: &LeafElement, p: &mut P) {
        let angle = element.bend_angle();
        if angle == 0.0 {
            mad_drift(p, element.length());
            finish(p, element);
            return;
        }
        let half = 0.5 * angle;
        let arc = match element.geometry() {
            Geometry::Chord { .. } => element.length() * half / half.sin(),
            _ => element.length(),
        };
        let h = angle / arc;
        edge_kick(p, h, half);
        sector_body(p, arc, angle);
        edge_kick(p, h, half);
        finish(p, element);
    }
}

impl Propagator for RbendLinear {
    fn name(&self) -> &str {
        "rbend_linear"
    }

    fn accepts(&self, kind: ElementKind) -> bool {
        kind == ElementKind::Rbend
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
    use std::rc::Rc;

    fn sbend(angle: f64) -> LeafElement {
        ElementBuilder::new(ElementKind::Sbend, "B")
            .length(2.0)
            .geometry(Geometry::Arc { angle })
            .propagator(Rc::new(SbendLinear))
            .build()
            .unwrap()
    }

    #[test]
    fn reference_orbit_stays_on_axis() {
        let mut p = Particle::proton(10.0);
        sbend(0.1).propagate(&mut p).unwrap();
        for k in [X, Y, NPX, NPY] {
            assert_eq!(p.state()[k], 0.0);
        }
        assert!((p.state()[CDT] - 2.0 / p.kinematics().beta()).abs() < 1e-12);
    }

    #[test]
    fn off_momentum_particle_is_dispersed_outwards() {
        let mut p = Particle::proton(10.0).with_state([0.0, 0.0, 0.0, 0.0, 0.0, 1e-3]);
        sbend(0.1).propagate(&mut p).unwrap();
        assert!(p.state()[X] > 0.0);
        assert!(p.state()[NPX] > 0.0);
    }

    #[test]
    fn sector_matrix_is_symplectic_horizontally() {
        let mut jp = JetParticle::new(&Particle::proton(10.0), 1).unwrap();
        sbend(0.3).propagate_jet(&mut jp).unwrap();
        let m = jp.jacobian();
        let det = m[X][X] * m[NPX][NPX] - m[X][NPX] * m[NPX][X];
        assert!((det - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rbend_edges_focus_vertically() {
        let rb = ElementBuilder::new(ElementKind::Rbend, "RB")
            .length(2.0)
            .geometry(Geometry::Chord { angle: 0.2 })
            .propagator(Rc::new(RbendLinear))
            .build()
            .unwrap();
        let mut p = Particle::proton(10.0).with_state([0.0, 1e-3, 0.0, 0.0, 0.0, 0.0]);
        rb.propagate(&mut p).unwrap();
        assert!(p.state()[NPY] < 0.0);
    }
}
