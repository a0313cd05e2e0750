//! Switching a built line between tracking models.

use std::rc::Rc;

use bml_beamline::{Beamline, ElementKind, ElmPtr, Propagator};
use tracing::{debug, warn};

use crate::config::{ConfigError, TrackingConfig};
use crate::factory::{drift_propagator, quad_propagator};

/// A leaf and the propagator it was bound to before a [`rebind`].
pub type Binding = (ElmPtr, Rc<dyn Propagator>);

/// Rebind every drift and thick quadrupole below `line` to the models
/// selected by `config`.
///
/// Leaves inside composite elements are reached as well. Returns the
/// previous bindings in deep order; pass them to [`restore`] to undo.
///
/// # Examples
///
/// ```
/// use bml_beamline::Beamline;
/// use bml_propagators::{rebind, restore, DriftModel, ElementFactory, TrackingConfig};
///
/// let f = ElementFactory::new(TrackingConfig::default()).unwrap();
/// let mut line = Beamline::new("L");
/// let d = line.append(f.drift("D", 1.0).unwrap());
///
/// let mad = TrackingConfig { drift: DriftModel::Mad, ..TrackingConfig::default() };
/// let previous = rebind(&line, &mad).unwrap();
/// assert_eq!(d.borrow().as_leaf().unwrap().propagator().name(), "drift_mad");
///
/// restore(previous);
/// assert_eq!(d.borrow().as_leaf().unwrap().propagator().name(), "drift_exact");
/// ```
pub fn rebind(line: &Beamline, config: &TrackingConfig) -> Result<Vec<Binding>, ConfigError> {
    config.validate()?;
    let drift = drift_propagator(config.drift);
    let quad = quad_propagator(config.quadrupole);
    let mut previous = Vec::new();
    let mut seen = Vec::new();
    rebind_into(line, &drift, &quad, &mut previous, &mut seen);
    debug!(line = line.name(), rebound = previous.len(), "rebind");
    Ok(previous)
}

/// Each handle is visited once, however often it appears in the line.
fn rebind_into(
    line: &Beamline,
    drift: &Rc<dyn Propagator>,
    quad: &Rc<dyn Propagator>,
    previous: &mut Vec<Binding>,
    seen: &mut Vec<ElmPtr>,
) {
    for ptr in line.deep_iter() {
        if seen.iter().any(|s| s.ptr_eq(&ptr)) {
            continue;
        }
        seen.push(ptr.clone());
        let mut elm = ptr.borrow_mut();
        let Some(leaf) = elm.as_leaf_mut() else {
            continue;
        };
        if let Some(parts) = leaf.sub_line() {
            rebind_into(parts, drift, quad, previous, seen);
            continue;
        }
        let next = match leaf.kind() {
            ElementKind::Drift => drift,
            ElementKind::Quadrupole => quad,
            _ => continue,
        };
        if let Ok(old) = leaf.set_propagator(Rc::clone(next)) {
            drop(elm);
            previous.push((ptr, old));
        }
    }
}

/// Put back bindings returned by [`rebind`], latest first.
pub fn restore(bindings: Vec<Binding>) {
    for (ptr, propagator) in bindings.into_iter().rev() {
        let mut elm = ptr.borrow_mut();
        let Some(leaf) = elm.as_leaf_mut() else {
            continue;
        };
        if let Err(err) = leaf.set_propagator(propagator) {
            warn!(element = %leaf.name(), %err, "binding not restored");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DriftModel, QuadModel};
    use crate::factory::ElementFactory;

    fn propagator_name(ptr: &ElmPtr) -> String {
        ptr.borrow().as_leaf().unwrap().propagator().name().to_owned()
    }

    #[test]
    fn reaches_nested_lines_and_composites() {
        let f = ElementFactory::new(TrackingConfig::default()).unwrap();
        let mut parts = Beamline::new("parts");
        let inner_d = parts.append(f.drift("CD", 0.1).unwrap());
        parts.append(f.thin_quad("K", 0.1).unwrap());

        let mut cell = Beamline::new("cell");
        let q = cell.append(f.quadrupole("Q", 0.5, 1.0).unwrap());
        let mut line = Beamline::new("ring");
        let d = line.append(f.drift("D", 1.0).unwrap());
        line.append(cell);
        line.append(f.combined_function("CF", parts, Some(1)).unwrap());
        let m = line.append(f.marker("M").unwrap());

        let cfg = TrackingConfig {
            drift: DriftModel::Mad,
            quadrupole: QuadModel::Linear,
            ..TrackingConfig::default()
        };
        let previous = rebind(&line, &cfg).unwrap();
        assert_eq!(previous.len(), 3);
        assert_eq!(propagator_name(&d), "drift_mad");
        assert_eq!(propagator_name(&q), "quadrupole_linear");
        assert_eq!(propagator_name(&inner_d), "drift_mad");
        assert_eq!(propagator_name(&m), "marker");

        restore(previous);
        assert_eq!(propagator_name(&d), "drift_exact");
        assert_eq!(propagator_name(&q), "quadrupole_multikick");
        assert_eq!(propagator_name(&inner_d), "drift_exact");
    }

    #[test]
    fn shared_handles_are_rebound_once() {
        let f = ElementFactory::new(TrackingConfig::default()).unwrap();
        let mut parts = Beamline::new("parts");
        let inner_d = parts.append(f.drift("CD", 0.1).unwrap());
        parts.append(f.thin_quad("K", 0.1).unwrap());
        let cf = ElmPtr::new(f.combined_function("CF", parts, Some(1)).unwrap());

        let mut line = Beamline::new("L");
        let d = line.append(f.drift("D", 1.0).unwrap());
        line.append(f.quadrupole("Q", 0.5, 1.0).unwrap());
        line.append(d.clone());
        line.append(cf.clone());
        line.append(cf);

        let mad = TrackingConfig {
            drift: DriftModel::Mad,
            ..TrackingConfig::default()
        };
        let previous = rebind(&line, &mad).unwrap();
        assert_eq!(previous.len(), 3);
        assert_eq!(propagator_name(&d), "drift_mad");
        assert_eq!(propagator_name(&inner_d), "drift_mad");

        restore(previous);
        assert_eq!(propagator_name(&d), "drift_exact");
        assert_eq!(propagator_name(&inner_d), "drift_exact");
    }

    #[test]
    fn restore_undoes_repeated_bindings_in_reverse() {
        let f = ElementFactory::new(TrackingConfig::default()).unwrap();
        let mut line = Beamline::new("L");
        let d = line.append(f.drift("D", 1.0).unwrap());
        let mad = TrackingConfig {
            drift: DriftModel::Mad,
            ..TrackingConfig::default()
        };
        let mut bindings = rebind(&line, &mad).unwrap();
        bindings.extend(rebind(&line, &TrackingConfig::default()).unwrap());
        restore(bindings);
        assert_eq!(propagator_name(&d), "drift_exact");
    }

    #[test]
    fn invalid_config_leaves_line_alone() {
        let f = ElementFactory::new(TrackingConfig::default()).unwrap();
        let mut line = Beamline::new("L");
        let d = line.append(f.drift("D", 1.0).unwrap());
        let bad = TrackingConfig {
            quadrupole: QuadModel::MultiKick { kicks: 0 },
            ..TrackingConfig::default()
        };
        assert_eq!(rebind(&line, &bad).unwrap_err(), ConfigError::ZeroKicks);
        assert_eq!(propagator_name(&d), "drift_exact");
    }
}
