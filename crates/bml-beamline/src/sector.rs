//! Sector elements: precomputed transfer maps standing in for a range
//! of a line.

use std::ops::Range;
use std::rc::Rc;

use bml_core::phase::{State, CDT, DIM};
use bml_core::{EditError, JetParticle, Particle, PhaseSpace, PropagationError};
use bml_jet::Jet;
use tracing::debug;

use crate::beamline::Beamline;
use crate::element::{ElementBuilder, ElmPtr, LeafElement};
use crate::kind::ElementKind;
use crate::propagator::Propagator;

/// Tracks through a truncated power-series map.
///
/// The map is expanded about `reference`; a plain state is mapped by
/// evaluating each component at its deviation from the reference, a
/// series state by composition.
#[derive(Debug)]
pub struct MapPropagator {
    map: [Jet; DIM],
    reference: State,
}

impl MapPropagator {
    /// Wrap a map expanded about `reference`.
    pub fn new(map: [Jet; DIM], reference: State) -> Self {
        Self { map, reference }
    }

    /// The six map components.
    pub fn map(&self) -> &[Jet; DIM] {
        &self.map
    }

    /// Expansion point.
    pub fn reference(&self) -> &State {
        &self.reference
    }

    /// First-order part of the map: `m[i][j] = ∂out_i / ∂in_j`.
    pub fn jacobian(&self) -> [[f64; DIM]; DIM] {
        std::array::from_fn(|i| std::array::from_fn(|j| self.map[i].derivative(j)))
    }
}

impl Propagator for MapPropagator {
    fn name(&self) -> &str {
        "map"
    }

    fn accepts(&self, kind: ElementKind) -> bool {
        kind == ElementKind::Sector
    }

    fn propagate(&self, element: &LeafElement, particle: &mut Particle) -> Result<(), PropagationError> {
        let state = particle.state_mut();
        let deviation: [f64; DIM] = std::array::from_fn(|i| state[i] - self.reference[i]);
        for (out, component) in state.iter_mut().zip(&self.map) {
            *out = component.evaluate(&deviation);
        }
        state[CDT] -= element.reference_time();
        Ok(())
    }

    fn propagate_jet(
        &self,
        element: &LeafElement,
        particle: &mut JetParticle,
    ) -> Result<(), PropagationError> {
        let target = particle.env().clone();
        let state = particle.state_mut();
        let deviation: Vec<Jet> = state
            .iter()
            .zip(&self.reference)
            .map(|(s, &r)| s.clone() - r)
            .collect();
        for (out, component) in state.iter_mut().zip(&self.map) {
            *out = component.compose(&target, &deviation);
        }
        let cdt = state[CDT].clone();
        state[CDT] = cdt - element.reference_time();
        Ok(())
    }
}

impl Beamline {
    /// Build a sector element equivalent to the elements strictly between
    /// the first occurrence of `from` and the next occurrence of `to`.
    ///
    /// `template` is cloned and propagated through the range; its
    /// resulting state, truncated at `order`, becomes the map. The sector
    /// is named `<from>_<to>_sector` and its length is the summed
    /// reference orbit length of the range.
    pub fn make_sector(
        &self,
        from: &ElmPtr,
        to: &ElmPtr,
        order: u32,
        template: &JetParticle,
    ) -> Result<LeafElement, EditError> {
        let range = self.interior_range(from, to)?;
        let reference = template.to_particle();
        let mut probe = template.clone();
        let mut length = 0.0;
        for handle in &self.elements()[range] {
            let elm = handle.borrow();
            elm.propagate_jet(&mut probe)?;
            length += elm.orbit_length(&reference);
        }

        let map: [Jet; DIM] = std::array::from_fn(|i| probe.state()[i].filter(0, order));
        let sector = ElementBuilder::new(
            ElementKind::Sector,
            format!("{}_{}_sector", from.name(), to.name()),
        )
        .length(length)
        .propagator(Rc::new(MapPropagator::new(map, *reference.state())))
        .build()?;
        Ok(sector)
    }

    /// Replace the elements strictly between `from` and `to` with the
    /// sector [`make_sector`](Self::make_sector) builds, returning its handle.
    pub fn sectorize(
        &mut self,
        from: &ElmPtr,
        to: &ElmPtr,
        order: u32,
        template: &JetParticle,
    ) -> Result<ElmPtr, EditError> {
        let sector = ElmPtr::new(self.make_sector(from, to, order, template)?);
        let range = self.interior_range(from, to)?;
        let replaced = range.len();
        self.invalidate_twiss();
        self.elements_mut().splice(range, [sector.clone()]);
        debug!(line = %self.name(), sector = %sector.name(), replaced, "sectorized");
        Ok(sector)
    }

    fn interior_range(&self, from: &ElmPtr, to: &ElmPtr) -> Result<Range<usize>, EditError> {
        let i = self
            .position_of(from)
            .ok_or_else(|| EditError::ElementNotFound { name: from.name() })?;
        let j = self.elements()[i + 1..]
            .iter()
            .position(|e| e.ptr_eq(to))
            .map(|k| i + 1 + k)
            .ok_or_else(|| EditError::ElementNotFound { name: to.name() })?;
        if j == i + 1 {
            return Err(EditError::EmptyRange {
                from: from.name(),
                to: to.name(),
            });
        }
        Ok(i + 1..j)
    }
}
