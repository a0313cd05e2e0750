//! Shared single-step maps, written once over [`PhaseSpace`].
//!
//! None of these subtract the element's reference time; propagators
//! call [`finish`] once after their last step.

use bml_core::phase::{CDT, NDP, NPX, NPY, X, Y};
use bml_core::{Coordinate, PhaseSpace, PropagationError};
use bml_beamline::LeafElement;

/// Exact field-free transport over `length`.
pub(crate) fn exact_drift<P: PhaseSpace>(
    p: &mut P,
    length: f64,
    element: &str,
) -> Result<(), PropagationError> {
    if length == 0.0 {
        return Ok(());
    }
    let s = p.state();
    let total = s[NDP].clone() + 1.0;
    let pz2 = total.clone() * total.clone()
        - s[NPX].clone() * s[NPX].clone()
        - s[NPY].clone() * s[NPY].clone();
    let check = pz2.standard_part();
    if check.is_nan() || check <= 0.0 {
        return Err(PropagationError::ImaginaryMomentum {
            element: element.to_owned(),
        });
    }
    let npz = pz2.sqrt();
    let beta = p.beta();
    let s = p.state();
    let x = s[X].clone() + s[NPX].clone() / npz.clone() * length;
    let y = s[Y].clone() + s[NPY].clone() / npz.clone() * length;
    let cdt = s[CDT].clone() + total / npz / beta * length;

    let s = p.state_mut();
    s[X] = x;
    s[Y] = y;
    s[CDT] = cdt;
    Ok(())
}

/// First-order field-free transport over `length`.
pub(crate) fn mad_drift<P: PhaseSpace>(p: &mut P, length: f64) {
    if length == 0.0 {
        return;
    }
    let k = *p.kinematics();
    let (beta, gamma) = (k.beta(), k.gamma());
    let s = p.state_mut();
    let x = s[X].clone() + s[NPX].clone() * length;
    let y = s[Y].clone() + s[NPY].clone() * length;
    let cdt = s[CDT].clone() + s[NDP].clone() * (-length / (beta * gamma * gamma)) + length / beta;
    s[X] = x;
    s[Y] = y;
    s[CDT] = cdt;
}

/// Thin transverse kicks: `npx += dx`, `npy += dy`.
pub(crate) fn kick<P: PhaseSpace>(p: &mut P, dx: P::Coord, dy: P::Coord) {
    let s = p.state_mut();
    let npx = s[NPX].clone() + dx;
    let npy = s[NPY].clone() + dy;
    s[NPX] = npx;
    s[NPY] = npy;
}

/// Thin quadrupole kick with integrated strength `k1l` [1/m].
pub(crate) fn quad_kick<P: PhaseSpace>(p: &mut P, k1l: P::Coord) {
    let s = p.state();
    let dx = -(k1l.clone() * s[X].clone());
    let dy = k1l * s[Y].clone();
    kick(p, dx, dy);
}

/// Thin sextupole kick with integrated strength `k2l` [1/m²].
pub(crate) fn sextupole_kick<P: PhaseSpace>(p: &mut P, k2l: P::Coord) {
    let s = p.state();
    let (x, y) = (s[X].clone(), s[Y].clone());
    let dx = -(k2l.clone() * (x.clone() * x.clone() - y.clone() * y.clone()) * 0.5);
    let dy = k2l * x * y;
    kick(p, dx, dy);
}

/// Strength over magnetic rigidity, honoring the element's series index.
pub(crate) fn normalized_strength<P: PhaseSpace>(p: &P, element: &LeafElement) -> P::Coord {
    let brho = p.kinematics().brho();
    p.parameter(element.strength(), element.strength_index()) / brho
}

/// Remove the element's reference time from `cdt`.
pub(crate) fn finish<P: PhaseSpace>(p: &mut P, element: &LeafElement) {
    let s = p.state_mut();
    let cdt = s[CDT].clone() - element.reference_time();
    s[CDT] = cdt;
}
