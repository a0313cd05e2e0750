//! Quadrupoles: thick linear, thick multi-kick, and thin.
//!
//! Strength is the field gradient `B'` [T/m] for thick magnets and the
//! integrated gradient `B'L` [T] for thin ones. Positive strength
//! focuses horizontally.

use bml_beamline::{ElementKind, LeafElement, Propagator};
use bml_core::phase::{CDT, NDP, NPX, NPY, X, Y};
use bml_core::{JetParticle, Particle, PhaseSpace, PropagationError};

use crate::physics::{exact_drift, finish, normalized_strength, quad_kick};

/// One plane of the linear quadrupole map: `(c, s, c', s')` with
/// `x1 = c·x0 + s·p0`, `p1 = c'·x0 + s'·p0`.
pub(crate) fn plane_matrix(k: f64, length: f64) -> [f64; 4] {
    if k > 0.0 {
        let w = k.sqrt();
        let (sn, cs) = (w * length).sin_cos();
        [cs, sn / w, -w * sn, cs]
    } else if k < 0.0 {
        let w = (-k).sqrt();
        let (sh, ch) = ((w * length).sinh(), (w * length).cosh());
        [ch, sh / w, w * sh, ch]
    } else {
        [1.0, length, 0.0, 1.0]
    }
}

/// Thick quadrupole, first-order map evaluated at the reference momentum.
#[derive(Clone, Copy, Debug, Default)]
pub struct LinearQuad;

impl LinearQuad {
    fn track<P: PhaseSpace>(element: &LeafElement, p: &mut P) {
        let length = element.length();
        let kin = *p.kinematics();
        let k1 = element.strength() / kin.brho();
        let mx = plane_matrix(k1, length);
        let my = plane_matrix(-k1, length);
        let (beta, gamma) = (kin.beta(), kin.gamma());

        let s = p.state_mut();
        let (x, npx) = (s[X].clone(), s[NPX].clone());
        let (y, npy) = (s[Y].clone(), s[NPY].clone());
        s[X] = x.clone() * mx[0] + npx.clone() * mx[1];
        s[NPX] = x * mx[2] + npx * mx[3];
        s[Y] = y.clone() * my[0] + npy.clone() * my[1];
        s[NPY] = y * my[2] + npy * my[3];
        let cdt = s[CDT].clone() + s[NDP].clone() * (-length / (beta * gamma * gamma)) + length / beta;
        s[CDT] = cdt;
        finish(p, element);
    }
}

impl Propagator for LinearQuad {
    fn name(&self) -> &str {
        "quadrupole_linear"
    }

    fn accepts(&self, kind: ElementKind) -> bool {
        kind == ElementKind::Quadrupole
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

/// Thick quadrupole as `kicks` thin kicks between exact drifts.
///
/// Slices follow the drift–kick–drift pattern with half-length drifts at
/// both ends. The kick strength honors the element's series index.
#[derive(Clone, Copy, Debug)]
pub struct MultiKickQuad {
    kicks: usize,
}

impl MultiKickQuad {
    /// A propagator using `kicks` slices; zero is raised to one.
    pub fn new(kicks: usize) -> Self {
        Self {
            kicks: kicks.max(1),
        }
    }

    /// Number of slices.
    pub fn kicks(&self) -> usize {
        self.kicks
    }

    fn track<P: PhaseSpace>(&self, element: &LeafElement, p: &mut P) -> Result<(), PropagationError> {
        let n = self.kicks as f64;
        let slice = element.length() / n;
        let k1l = normalized_strength(p, element) * slice;
        exact_drift(p, 0.5 * slice, element.name())?;
        for i in 0..self.kicks {
            quad_kick(p, k1l.clone());
            let step = if i + 1 == self.kicks { 0.5 * slice } else { slice };
            exact_drift(p, step, element.name())?;
        }
        finish(p, element);
        Ok(())
    }
}

impl Default for MultiKickQuad {
    fn default() -> Self {
        Self::new(4)
    }
}

impl Propagator for MultiKickQuad {
    fn name(&self) -> &str {
        "quadrupole_multikick"
    }

    fn accepts(&self, kind: ElementKind) -> bool {
        kind == ElementKind::Quadrupole
    }

    fn propagate(&self, element: &LeafElement, particle: &mut Particle) -> Result<(), PropagationError> {
        self.track(element, particle)
    }

    fn propagate_jet(
        &self,
        element: &LeafElement,
        particle: &mut JetParticle,
    ) -> Result<(), PropagationError> {
        self.track(element, particle)
    }
}

/// Thin quadrupole: a single kick of integrated gradient `B'L`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThinQuadKick;

impl ThinQuadKick {
    fn track<P: PhaseSpace>(element: &LeafElement, p: &mut P) {
        let k1l = normalized_strength(p, element);
        quad_kick(p, k1l);
        finish(p, element);
    }
}

impl Propagator for ThinQuadKick {
    fn name(&self) -> &str {
        "thin_quad"
    }

    fn accepts(&self, kind: ElementKind) -> bool {
        kind == ElementKind::ThinQuad
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

    fn quad(prop: Rc<dyn Propagator>, length: f64, gradient: f64) -> LeafElement {
        ElementBuilder::new(ElementKind::Quadrupole, "Q")
            .length(length)
            .strength(gradient)
            .propagator(prop)
            .build()
            .unwrap()
    }

    #[test]
    fn plane_matrix_is_symplectic() {
        for k in [-2.0, -0.1, 0.0, 0.3, 5.0] {
            let m = plane_matrix(k, 0.7);
            assert!((m[0] * m[3] - m[1] * m[2] - 1.0).abs() < 1e-12, "k = {k}");
        }
    }

    #[test]
    fn focusing_quad_pulls_towards_axis() {
        let q = quad(Rc::new(LinearQuad), 0.5, 10.0);
        let mut p = Particle::proton(5.0).with_state([1e-3, 1e-3, 0.0, 0.0, 0.0, 0.0]);
        q.propagate(&mut p).unwrap();
        assert!(p.state()[NPX] < 0.0);
        assert!(p.state()[NPY] > 0.0);
        assert!(p.state()[X] < 1e-3);
        assert!(p.state()[Y] > 1e-3);
    }

    #[test]
    fn multikick_converges_to_linear() {
        let start = [1e-3, -5e-4, 0.0, 1e-5, 2e-5, 0.0];
        let mut linear = Particle::proton(5.0).with_state(start);
        quad(Rc::new(LinearQuad), 0.5, 10.0).propagate(&mut linear).unwrap();

        let mut kicked = Particle::proton(5.0).with_state(start);
        quad(Rc::new(MultiKickQuad::new(64)), 0.5, 10.0)
            .propagate(&mut kicked)
            .unwrap();
        for k in [X, Y, NPX, NPY] {
            assert!((linear.state()[k] - kicked.state()[k]).abs() < 1e-7, "coordinate {k}");
        }
    }

    #[test]
    fn thin_quad_kick_is_proportional_to_offset() {
        let tq = ElementBuilder::new(ElementKind::ThinQuad, "TQ")
            .strength(2.0)
            .propagator(Rc::new(ThinQuadKick))
            .build()
            .unwrap();
        let mut p = Particle::proton(10.0).with_state([1e-3, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let brho = p.kinematics().brho();
        tq.propagate(&mut p).unwrap();
        assert!((p.state()[NPX] + 2.0 / brho * 1e-3).abs() < 1e-18);
    }

    #[test]
    fn indexed_strength_becomes_a_map_variable() {
        use bml_jet::JetEnvironment;
        let tq = {
            let mut e = ElementBuilder::new(ElementKind::ThinQuad, "TQ")
                .strength(2.0)
                .propagator(Rc::new(ThinQuadKick))
                .build()
                .unwrap();
            e.set_strength_indexed(2.0, 6);
            e
        };
        let start = Particle::proton(10.0).with_state([1e-3, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let mut reference = start.state().to_vec();
        reference.push(2.0);
        let env = JetEnvironment::new(7, 2, &reference).unwrap();
        let mut jp = JetParticle::with_environment(*start.kinematics(), &env).unwrap();
        tq.propagate_jet(&mut jp).unwrap();
        let brho = start.kinematics().brho();
        let d_npx_d_strength = jp.state()[NPX].derivative(6);
        assert!((d_npx_d_strength + 1e-3 / brho).abs() < 1e-15);
    }
}
