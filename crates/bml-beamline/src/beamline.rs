//! [`Beamline`]: an ordered sequence of shared element handles.
//!
//! A line holds [`ElmPtr`] handles, so the same element can appear in
//! several lines (or several times in one line). Structural edits act
//! on the sequence; parameter edits made through a handle are seen by
//! every holder. Position-based insertion, sectorization and geometric
//! edits live in their own modules as further `impl Beamline` blocks.

use std::ops::Range;

use bml_core::barnacle::{RING_LABEL, TWISS_LABEL};
use bml_core::phase::CDT;
use bml_core::{
    Alignment, BarnacleList, EditError, JetParticle, Particle, ParticleBunch, PhaseSpace,
    PropagationError,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::element::{Element, ElmPtr};
use crate::iter::{DeepIter, DeepReverseIter, ForwardIter, ReverseIter};
use crate::visitor::Visitor;

/// Topology of a line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineMode {
    /// Open transfer line.
    Line,
    /// Closed ring; the last element's downstream neighbor is the first.
    Ring,
    /// Not yet declared.
    #[default]
    Unknown,
}

/// Immediate neighbors of an element, as reported by [`Beamline::find`].
#[derive(Clone, Debug, Default)]
pub struct Neighbors {
    /// Element before, if any.
    pub upstream: Option<ElmPtr>,
    /// Element after, if any.
    pub downstream: Option<ElmPtr>,
}

/// Ordered, possibly nested sequence of elements.
#[derive(Debug)]
pub struct Beamline {
    name: String,
    elements: Vec<ElmPtr>,
    nominal_energy: Option<f64>,
    mode: LineMode,
    twiss_done: bool,
    barnacles: BarnacleList,
}

impl Beamline {
    /// Empty line of unknown mode.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            elements: Vec::new(),
            nominal_energy: None,
            mode: LineMode::Unknown,
            twiss_done: false,
            barnacles: BarnacleList::new(),
        }
    }

    // ── Attributes ──────────────────────────────────────────────

    /// Line name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Change the name.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Nominal total energy [GeV], if declared.
    pub fn nominal_energy(&self) -> Option<f64> {
        self.nominal_energy
    }

    /// Declare or clear the nominal energy.
    pub fn set_nominal_energy(&mut self, energy: Option<f64>) {
        self.nominal_energy = energy;
    }

    /// Topology.
    pub fn mode(&self) -> LineMode {
        self.mode
    }

    /// Declare the topology.
    pub fn set_mode(&mut self, mode: LineMode) {
        self.mode = mode;
    }

    /// Whether the line is declared a ring.
    pub fn is_ring(&self) -> bool {
        self.mode == LineMode::Ring
    }

    /// Whether lattice functions have been attached.
    pub fn twiss_done(&self) -> bool {
        self.twiss_done
    }

    /// Record whether lattice functions are attached.
    pub fn set_twiss_done(&mut self, done: bool) {
        self.twiss_done = done;
    }

    /// Attached side-data.
    pub fn barnacles(&self) -> &BarnacleList {
        &self.barnacles
    }

    /// Attached side-data, mutably.
    pub fn barnacles_mut(&mut self) -> &mut BarnacleList {
        &mut self.barnacles
    }

    // ── Sequence access ─────────────────────────────────────────

    /// Top-level handles in order.
    pub fn elements(&self) -> &[ElmPtr] {
        &self.elements
    }

    /// Number of top-level elements.
    pub fn how_many(&self) -> usize {
        self.elements.len()
    }

    /// Whether the line has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Handle at top-level index `i`.
    pub fn get(&self, i: usize) -> Option<&ElmPtr> {
        self.elements.get(i)
    }

    /// First element.
    pub fn front(&self) -> Option<&ElmPtr> {
        self.elements.first()
    }

    /// Last element.
    pub fn back(&self) -> Option<&ElmPtr> {
        self.elements.last()
    }

    /// Index of the first top-level occurrence of `target`.
    pub fn position_of(&self, target: &ElmPtr) -> Option<usize> {
        self.elements.iter().position(|e| e.ptr_eq(target))
    }

    pub(crate) fn elements_mut(&mut self) -> &mut Vec<ElmPtr> {
        &mut self.elements
    }

    // ── Iteration ───────────────────────────────────────────────

    /// Top-level handles, first to last.
    pub fn iter(&self) -> ForwardIter<'_> {
        ForwardIter::new(self)
    }

    /// Top-level handles, last to first.
    pub fn iter_rev(&self) -> ReverseIter<'_> {
        ReverseIter::new(self)
    }

    /// Leaves through every nesting level, first to last.
    pub fn deep_iter(&self) -> DeepIter<'_> {
        DeepIter::new(self)
    }

    /// Leaves through every nesting level, last to first.
    pub fn deep_iter_rev(&self) -> DeepReverseIter<'_> {
        DeepReverseIter::new(self)
    }

    // ── Editing ─────────────────────────────────────────────────

    /// Add at the tail, returning the stored handle.
    pub fn append(&mut self, element: impl Into<ElmPtr>) -> ElmPtr {
        self.invalidate_twiss();
        let handle = element.into();
        self.elements.push(handle.clone());
        handle
    }

    /// Add at the head, returning the stored handle.
    pub fn insert(&mut self, element: impl Into<ElmPtr>) -> ElmPtr {
        self.invalidate_twiss();
        let handle = element.into();
        self.elements.insert(0, handle.clone());
        handle
    }

    /// Insert immediately before the first occurrence of `target`.
    pub fn put_above(
        &mut self,
        target: &ElmPtr,
        element: impl Into<ElmPtr>,
    ) -> Result<ElmPtr, EditError> {
        let i = self.require_position(target)?;
        self.invalidate_twiss();
        let handle = element.into();
        self.elements.insert(i, handle.clone());
        Ok(handle)
    }

    /// Insert immediately after the first occurrence of `target`.
    pub fn put_below(
        &mut self,
        target: &ElmPtr,
        element: impl Into<ElmPtr>,
    ) -> Result<ElmPtr, EditError> {
        let i = self.require_position(target)?;
        self.invalidate_twiss();
        let handle = element.into();
        self.elements.insert(i + 1, handle.clone());
        Ok(handle)
    }

    /// Remove and return the handle at index `i`.
    pub fn erase(&mut self, i: usize) -> Option<ElmPtr> {
        if i >= self.elements.len() {
            return None;
        }
        self.invalidate_twiss();
        Some(self.elements.remove(i))
    }

    /// Remove the handles in an index range, clamped to the line.
    pub fn erase_range(&mut self, range: Range<usize>) -> Vec<ElmPtr> {
        let end = range.end.min(self.elements.len());
        let start = range.start.min(end);
        if start < end {
            self.invalidate_twiss();
        }
        self.elements.drain(start..end).collect()
    }

    /// Remove the first occurrence of `target`.
    pub fn remove(&mut self, target: &ElmPtr) -> Result<ElmPtr, EditError> {
        let i = self.require_position(target)?;
        self.invalidate_twiss();
        Ok(self.elements.remove(i))
    }

    /// Remove `first` through `last` inclusive.
    ///
    /// `last` is searched for at or after the first occurrence of `first`.
    pub fn remove_range(&mut self, first: &ElmPtr, last: &ElmPtr) -> Result<Vec<ElmPtr>, EditError> {
        let i = self.require_position(first)?;
        let j = self.elements[i..]
            .iter()
            .position(|e| e.ptr_eq(last))
            .map(|k| i + k)
            .ok_or_else(|| EditError::ElementNotFound { name: last.name() })?;
        self.invalidate_twiss();
        Ok(self.elements.drain(i..=j).collect())
    }

    /// Remove every handle, giving them to the caller.
    pub fn clear(&mut self) -> Vec<ElmPtr> {
        self.invalidate_twiss();
        std::mem::take(&mut self.elements)
    }

    /// Drop every handle, emptying nested lines this line alone holds.
    ///
    /// Returns the number of top-level handles dropped.
    pub fn zap(&mut self) -> usize {
        self.invalidate_twiss();
        let dropped = std::mem::take(&mut self.elements);
        let n = dropped.len();
        for handle in dropped {
            if handle.holders() == 1 {
                if let Some(line) = handle.borrow_mut().as_line_mut() {
                    line.zap();
                }
            }
        }
        n
    }

    /// Consume the line, zapping its contents.
    pub fn eliminate(mut self) {
        self.zap();
    }

    /// Structural edits make stored lattice functions stale.
    pub(crate) fn invalidate_twiss(&mut self) {
        if self.twiss_done {
            self.untwiss();
        }
    }

    fn require_position(&self, target: &ElmPtr) -> Result<usize, EditError> {
        self.position_of(target)
            .ok_or_else(|| EditError::ElementNotFound { name: target.name() })
    }

    // ── Structure ───────────────────────────────────────────────

    /// A new single-level line sharing every leaf of this one, in order.
    pub fn flatten(&self) -> Beamline {
        let mut flat = Beamline::new(self.name.clone());
        flat.nominal_energy = self.nominal_energy;
        flat.mode = self.mode;
        flat.elements = self.deep_iter().collect();
        flat
    }

    /// Whether no element is itself a line.
    pub fn is_flat(&self) -> bool {
        !self.elements.iter().any(ElmPtr::is_line)
    }

    /// A new line named `REVERSE_<name>` with the order reversed at every
    /// level. Leaves are copied.
    pub fn reverse(&self) -> Beamline {
        let mut out = Beamline::new(format!("REVERSE_{}", self.name));
        out.nominal_energy = self.nominal_energy;
        out.mode = self.mode;
        out.elements = self
            .elements
            .iter()
            .rev()
            .map(|handle| {
                let elm = handle.borrow();
                match &*elm {
                    Element::Line(line) => ElmPtr::new(line.reverse()),
                    Element::Leaf(leaf) => ElmPtr::new(leaf.clone_element()),
                }
            })
            .collect();
        out
    }

    /// Deep, independent copy with the same name, energy and mode.
    /// Barnacles are not copied.
    pub fn clone_line(&self) -> Beamline {
        let mut out = Beamline::new(self.name.clone());
        out.nominal_energy = self.nominal_energy;
        out.mode = self.mode;
        out.elements = self.elements.iter().map(ElmPtr::clone_element).collect();
        out
    }

    /// Nesting depth: -1 when empty, 0 when flat, otherwise one more
    /// than the deepest nested line.
    pub fn depth(&self) -> i32 {
        if self.elements.is_empty() {
            return -1;
        }
        let deepest = self
            .elements
            .iter()
            .filter_map(|e| e.borrow().as_line().map(Beamline::depth))
            .max()
            .unwrap_or(-1);
        deepest.max(-1) + 1
    }

    // ── Neighbors and rotation ──────────────────────────────────

    /// Neighbors of the first occurrence of `target`; rings wrap around.
    pub fn find(&self, target: &ElmPtr) -> Option<Neighbors> {
        let i = self.position_of(target)?;
        let n = self.elements.len();
        let wrap = self.is_ring();
        let upstream = match i {
            0 if wrap => self.elements.last().cloned(),
            0 => None,
            _ => Some(self.elements[i - 1].clone()),
        };
        let downstream = if i + 1 < n {
            Some(self.elements[i + 1].clone())
        } else if wrap {
            self.elements.first().cloned()
        } else {
            None
        };
        Some(Neighbors {
            upstream,
            downstream,
        })
    }

    /// Rotate so the `n`-th (1-based) occurrence of `target` comes first.
    pub fn start_at(&mut self, target: &ElmPtr, n: usize) -> Result<(), EditError> {
        let name = target.name();
        self.rotate_to_occurrence(&name, n, |e| e.ptr_eq(target))
    }

    /// Rotate so the `n`-th (1-based) element named `name` comes first.
    pub fn start_at_name(&mut self, name: &str, n: usize) -> Result<(), EditError> {
        self.rotate_to_occurrence(name, n, |e| e.borrow().name() == name)
    }

    fn rotate_to_occurrence(
        &mut self,
        name: &str,
        n: usize,
        matches: impl Fn(&ElmPtr) -> bool,
    ) -> Result<(), EditError> {
        let hits: Vec<usize> = self
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| matches(e))
            .map(|(i, _)| i)
            .collect();
        if hits.is_empty() {
            return Err(EditError::ElementNotFound { name: name.to_owned() });
        }
        let Some(&i) = n.checked_sub(1).and_then(|k| hits.get(k)) else {
            return Err(EditError::OccurrenceNotFound {
                name: name.to_owned(),
                occurrence: n,
            });
        };
        if !self.is_ring() {
            warn!(line = %self.name, element = name, "start_at on a line not declared a ring");
        }
        self.elements.rotate_left(i);
        Ok(())
    }

    // ── Queries ─────────────────────────────────────────────────

    /// Number of top-level elements.
    pub fn count_how_many(&self) -> usize {
        self.elements.len()
    }

    /// Number of leaves at every nesting level.
    pub fn count_how_many_deeply(&self) -> usize {
        self.deep_iter().count()
    }

    /// Top-level handles whose element satisfies `pred`.
    pub fn count_matching(&self, pred: impl Fn(&Element) -> bool) -> Vec<ElmPtr> {
        self.iter().filter(|e| pred(&e.borrow())).collect()
    }

    /// Leaves at every level that satisfy `pred`.
    pub fn count_matching_deeply(&self, pred: impl Fn(&Element) -> bool) -> Vec<ElmPtr> {
        self.deep_iter().filter(|e| pred(&e.borrow())).collect()
    }

    /// Sum of element lengths [m].
    pub fn length(&self) -> f64 {
        self.elements.iter().map(ElmPtr::length).sum()
    }

    /// Sum of reference-trajectory path lengths for `particle` [m].
    pub fn orbit_length(&self, particle: &Particle) -> f64 {
        self.elements
            .iter()
            .map(|e| e.borrow().orbit_length(particle))
            .sum()
    }

    /// Entrance position of every top-level element [m].
    pub fn positions(&self) -> Vec<f64> {
        let mut s = 0.0;
        self.elements
            .iter()
            .map(|e| {
                let here = s;
                s += e.length();
                here
            })
            .collect()
    }

    // ── Annotations ─────────────────────────────────────────────

    /// Discard lattice-function annotations on the line and its leaves.
    pub fn untwiss(&mut self) {
        for leaf in self.deep_iter() {
            leaf.borrow_mut().barnacles_mut().erase_all(TWISS_LABEL);
        }
        self.barnacles.erase_all(RING_LABEL);
        self.barnacles.erase_all(TWISS_LABEL);
        self.twiss_done = false;
    }

    /// Discard every barnacle labeled `label`, on the line and its leaves.
    pub fn erase_barnacles(&mut self, label: &str) -> usize {
        let mut erased = self.barnacles.erase_all(label);
        for leaf in self.deep_iter() {
            erased += leaf.borrow_mut().barnacles_mut().erase_all(label);
        }
        erased
    }

    /// Misalign every leaf. Refused, changing nothing, if the line
    /// contains a bend.
    pub fn set_alignment(&mut self, alignment: Alignment) -> bool {
        if self.deep_iter().any(|e| e.kind().is_bend()) {
            warn!(line = %self.name, "misalignment refused for a line containing bends");
            return false;
        }
        for leaf in self.deep_iter() {
            leaf.borrow_mut().set_alignment(alignment);
        }
        true
    }

    // ── Propagation ─────────────────────────────────────────────

    /// Track a plain particle through every element in order.
    pub fn propagate(&self, particle: &mut Particle) -> Result<(), PropagationError> {
        for e in &self.elements {
            e.borrow().propagate(particle)?;
        }
        Ok(())
    }

    /// Track a series particle through every element in order.
    pub fn propagate_jet(&self, particle: &mut JetParticle) -> Result<(), PropagationError> {
        for e in &self.elements {
            e.borrow().propagate_jet(particle)?;
        }
        Ok(())
    }

    /// Track every particle of a bunch; lost particles are removed.
    ///
    /// Returns each loss with the particle's index in the incoming bunch.
    pub fn propagate_bunch(&self, bunch: &mut ParticleBunch) -> Vec<(usize, PropagationError)> {
        let losses: Vec<(usize, PropagationError)> = bunch
            .particles_mut()
            .iter_mut()
            .enumerate()
            .filter_map(|(i, p)| self.propagate(p).err().map(|e| (i, e)))
            .collect();
        if !losses.is_empty() {
            let lost: Vec<usize> = losses.iter().map(|(i, _)| *i).collect();
            debug!(line = %self.name, lost = lost.len(), "particles lost");
            bunch.remove(&lost);
        }
        losses
    }

    /// Set every leaf's reference time so that `reference`, launched on
    /// its current state, accumulates no `cdt`.
    ///
    /// Composite elements register their sub-line first.
    pub fn register_reference(&self, reference: &Particle) -> Result<(), PropagationError> {
        let mut probe = reference.clone();
        self.register_with(&mut probe)
    }

    fn register_with(&self, probe: &mut Particle) -> Result<(), PropagationError> {
        for handle in &self.elements {
            let mut elm = handle.borrow_mut();
            match &mut *elm {
                Element::Line(line) => line.register_with(probe)?,
                Element::Leaf(leaf) => {
                    if let Some(sub) = leaf.sub_line() {
                        sub.register_with(&mut probe.clone())?;
                    }
                    leaf.set_reference_time(0.0);
                    probe.state_mut()[CDT] = 0.0;
                    leaf.propagate(probe)?;
                    leaf.set_reference_time(probe.state()[CDT]);
                }
            }
        }
        probe.state_mut()[CDT] = 0.0;
        Ok(())
    }

    /// Visitor dispatch; see [`Visitor::visit_beamline`].
    pub fn accept<V: Visitor + ?Sized>(&self, v: &mut V) {
        v.visit_beamline(self);
    }
}

impl<'a> IntoIterator for &'a Beamline {
    type Item = ElmPtr;
    type IntoIter = ForwardIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementBuilder, LeafElement};
    use crate::kind::ElementKind;
    use crate::propagator::IdentityPropagator;
    use bml_core::barnacle::LatticeFunctions;
    use std::rc::Rc;

    fn leaf(kind: ElementKind, name: &str, length: f64) -> LeafElement {
        ElementBuilder::new(kind, name)
            .length(length)
            .propagator(Rc::new(IdentityPropagator))
            .build()
            .unwrap()
    }

    fn drift(name: &str, length: f64) -> LeafElement {
        leaf(ElementKind::Drift, name, length)
    }

    fn names(line: &Beamline) -> Vec<String> {
        line.iter().map(|e| e.name()).collect()
    }

    fn abc() -> Beamline {
        let mut line = Beamline::new("L");
        line.append(drift("A", 1.0));
        line.append(drift("B", 2.0));
        line.append(drift("C", 3.0));
        line
    }

    // ── Editing tests ───────────────────────────────────────────

    #[test]
    fn append_insert_and_put() {
        let mut line = abc();
        let b = line.get(1).unwrap().clone();
        line.put_above(&b, drift("X", 0.0)).unwrap();
        line.put_below(&b, drift("Y", 0.0)).unwrap();
        line.insert(drift("H", 0.0));
        assert_eq!(names(&line), ["H", "A", "X", "B", "Y", "C"]);
        assert_eq!(line.how_many(), 6);
    }

    #[test]
    fn put_above_missing_target_fails() {
        let mut line = abc();
        let stranger = ElmPtr::new(drift("S", 1.0));
        let err = line.put_above(&stranger, drift("X", 0.0)).unwrap_err();
        assert_eq!(err.code(), 1);
        assert_eq!(line.how_many(), 3);
    }

    #[test]
    fn erase_and_remove() {
        let mut line = abc();
        let b = line.get(1).unwrap().clone();
        assert!(line.erase(7).is_none());
        let removed = line.remove(&b).unwrap();
        assert!(removed.ptr_eq(&b));
        assert!(line.remove(&b).is_err());
        assert_eq!(names(&line), ["A", "C"]);
        assert_eq!(line.erase_range(1..10).len(), 1);
        assert_eq!(names(&line), ["A"]);
    }

    #[test]
    fn remove_range_is_inclusive() {
        let mut line = abc();
        line.append(drift("D", 1.0));
        let (b, c) = (line.get(1).unwrap().clone(), line.get(2).unwrap().clone());
        let out = line.remove_range(&b, &c).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(names(&line), ["A", "D"]);
    }

    #[test]
    fn clear_hands_back_handles() {
        let mut line = abc();
        let held = line.clear();
        assert!(line.is_empty());
        assert_eq!(held.len(), 3);
        assert_eq!(held[0].holders(), 1);
    }

    #[test]
    fn zap_empties_uniquely_held_nested_lines() {
        let mut inner = Beamline::new("inner");
        let d = inner.append(drift("D", 1.0));
        let mut outer = Beamline::new("outer");
        outer.append(inner);
        assert_eq!(d.holders(), 2);
        assert_eq!(outer.zap(), 1);
        assert_eq!(d.holders(), 1);
    }

    // ── Structure tests ─────────────────────────────────────────

    #[test]
    fn depth_follows_nesting() {
        let mut outer = Beamline::new("outer");
        assert_eq!(outer.depth(), -1);
        outer.append(drift("A", 1.0));
        assert_eq!(outer.depth(), 0);
        outer.append(Beamline::new("empty"));
        assert_eq!(outer.depth(), 0);
        let mut inner = Beamline::new("inner");
        inner.append(drift("B", 1.0));
        outer.append(inner);
        assert_eq!(outer.depth(), 1);
        assert!(!outer.is_flat());
    }

    #[test]
    fn flatten_shares_leaves() {
        let mut inner = abc();
        inner.rename("inner");
        let mut outer = Beamline::new("outer");
        outer.set_mode(LineMode::Ring);
        outer.set_nominal_energy(Some(5.0));
        let m = outer.append(leaf(ElementKind::Marker, "M", 0.0));
        outer.append(inner);
        let flat = outer.flatten();
        assert!(flat.is_flat());
        assert_eq!(names(&flat), ["M", "A", "B", "C"]);
        assert!(flat.get(0).unwrap().ptr_eq(&m));
        assert_eq!(flat.mode(), LineMode::Ring);
        assert_eq!(flat.nominal_energy(), Some(5.0));
        assert_eq!(flat.length(), outer.length());
    }

    #[test]
    fn reverse_recurses_and_renames() {
        let mut outer = Beamline::new("outer");
        outer.append(drift("M", 0.5));
        outer.append(abc());
        let rev = outer.reverse();
        assert_eq!(rev.name(), "REVERSE_outer");
        let deep: Vec<String> = rev.deep_iter().map(|e| e.name()).collect();
        assert_eq!(deep, ["C", "B", "A", "M"]);
        assert!(!rev.get(1).unwrap().ptr_eq(outer.get(0).unwrap()));
    }

    #[test]
    fn clone_line_is_independent() {
        let line = abc();
        let copy = line.clone_line();
        copy.get(0).unwrap().borrow_mut().rename("Z");
        assert_eq!(line.get(0).unwrap().name(), "A");
        assert_eq!(copy.length(), line.length());
    }

    // ── Neighbor tests ──────────────────────────────────────────

    #[test]
    fn find_wraps_only_in_rings() {
        let mut line = abc();
        let a = line.get(0).unwrap().clone();
        let n = line.find(&a).unwrap();
        assert!(n.upstream.is_none());
        assert_eq!(n.downstream.unwrap().name(), "B");

        line.set_mode(LineMode::Ring);
        let n = line.find(&a).unwrap();
        assert_eq!(n.upstream.unwrap().name(), "C");
        let stranger = ElmPtr::new(drift("S", 1.0));
        assert!(line.find(&stranger).is_none());
    }

    #[test]
    fn start_at_rotates_to_occurrence() {
        let mut line = Beamline::new("R");
        line.set_mode(LineMode::Ring);
        let m = ElmPtr::new(leaf(ElementKind::Marker, "M", 0.0));
        line.append(drift("A", 1.0));
        line.append(m.clone());
        line.append(drift("B", 1.0));
        line.append(m.clone());
        line.append(drift("C", 1.0));

        line.start_at(&m, 2).unwrap();
        assert_eq!(names(&line), ["M", "C", "A", "M", "B"]);

        line.start_at_name("A", 1).unwrap();
        assert_eq!(names(&line), ["A", "M", "B", "M", "C"]);

        assert_eq!(line.start_at(&m, 0).unwrap_err().code(), 1);
        assert!(matches!(
            line.start_at(&m, 3),
            Err(EditError::OccurrenceNotFound { occurrence: 3, .. })
        ));
        assert!(matches!(
            line.start_at_name("nope", 1),
            Err(EditError::ElementNotFound { .. })
        ));
    }

    // ── Query tests ─────────────────────────────────────────────

    #[test]
    fn counts_and_positions() {
        let mut outer = abc();
        let mut inner = Beamline::new("inner");
        inner.append(leaf(ElementKind::Quadrupole, "Q", 0.5));
        outer.append(inner);
        assert_eq!(outer.count_how_many(), 4);
        assert_eq!(outer.count_how_many_deeply(), 4);
        assert_eq!(outer.positions(), vec![0.0, 1.0, 3.0, 6.0]);
        assert_eq!(outer.count_matching(|e| e.is_type("freeSpace")).len(), 3);
        assert_eq!(outer.count_matching_deeply(|e| e.is_type("magnet")).len(), 1);
        assert_eq!(outer.length(), 6.5);
    }

    #[test]
    fn untwiss_strips_lattice_functions() {
        let mut line = abc();
        for e in line.deep_iter() {
            e.borrow_mut()
                .barnacles_mut()
                .append(TWISS_LABEL, LatticeFunctions::default());
        }
        line.barnacles_mut().append(RING_LABEL, 0.25_f64);
        line.set_twiss_done(true);
        line.untwiss();
        assert!(!line.twiss_done());
        assert!(line.barnacles().is_empty());
        assert!(line.deep_iter().all(|e| e.borrow().barnacles().is_empty()));
    }

    fn twissed(line: &mut Beamline) {
        for e in line.deep_iter() {
            e.borrow_mut()
                .barnacles_mut()
                .append(TWISS_LABEL, LatticeFunctions::default());
        }
        line.barnacles_mut().append(RING_LABEL, 0.25_f64);
        line.set_twiss_done(true);
    }

    #[test]
    fn structural_edits_discard_lattice_functions() {
        let edits: [fn(&mut Beamline); 8] = [
            |l| drop(l.append(drift("X", 1.0))),
            |l| drop(l.insert(drift("X", 1.0))),
            |l| {
                let b = l.get(1).unwrap().clone();
                l.put_above(&b, drift("X", 1.0)).unwrap();
            },
            |l| {
                let b = l.get(1).unwrap().clone();
                l.put_below(&b, drift("X", 1.0)).unwrap();
            },
            |l| drop(l.erase(1)),
            |l| drop(l.erase_range(0..2)),
            |l| {
                let b = l.get(1).unwrap().clone();
                l.remove(&b).unwrap();
            },
            |l| {
                let (a, c) = (l.get(0).unwrap().clone(), l.get(2).unwrap().clone());
                l.remove_range(&a, &c).unwrap();
            },
        ];
        for edit in edits {
            let mut line = abc();
            let a = line.get(0).unwrap().clone();
            twissed(&mut line);
            edit(&mut line);
            assert!(!line.twiss_done());
            assert!(!line.barnacles().contains(RING_LABEL));
            assert!(!a.borrow().barnacles().contains(TWISS_LABEL));
        }
    }

    #[test]
    fn failed_edit_keeps_lattice_functions() {
        let mut line = abc();
        twissed(&mut line);
        let stranger = ElmPtr::new(drift("Z", 1.0));
        assert!(line.remove(&stranger).is_err());
        assert!(line.erase(9).is_none());
        assert!(line.twiss_done());
        assert!(line.barnacles().contains(RING_LABEL));
    }

    #[test]
    fn erase_barnacles_counts() {
        let mut line = abc();
        line.get(0).unwrap().borrow_mut().barnacles_mut().append("tag", 1_u8);
        line.barnacles_mut().append("tag", 2_u8);
        line.barnacles_mut().append("keep", 3_u8);
        assert_eq!(line.erase_barnacles("tag"), 2);
        assert!(line.barnacles().contains("keep"));
    }

    #[test]
    fn line_alignment_refused_with_bends() {
        let mut line = abc();
        assert!(line.set_alignment(Alignment::new(1e-3, 0.0, 0.0)));
        assert!(line.deep_iter().all(|e| e.borrow().alignment().is_some()));

        line.append(leaf(ElementKind::Sbend, "B", 1.0));
        assert!(!line.set_alignment(Alignment::new(2e-3, 0.0, 0.0)));
        assert_eq!(line.get(0).unwrap().borrow().alignment().unwrap().x_offset(), 1e-3);
    }
}
