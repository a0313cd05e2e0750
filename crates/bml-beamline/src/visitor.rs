//! Double-dispatch traversal over element kinds.
//!
//! Every per-kind method defaults to [`Visitor::visit_element`], so an
//! implementation overrides only the kinds it cares about.
//! [`Visitor::visit_beamline`] defaults to [`walk_beamline`], which
//! visits each child in order.

use crate::beamline::Beamline;
use crate::element::LeafElement;

/// Per-kind callbacks for [`Element::accept`](crate::Element::accept).
///
/// # Examples
///
/// Counting quadrupoles through nested lines:
///
/// ```
/// use bml_beamline::{Beamline, ElementBuilder, ElementKind, IdentityPropagator, LeafElement, Visitor};
/// use std::rc::Rc;
///
/// #[derive(Default)]
/// struct QuadCount(usize);
///
/// impl Visitor for QuadCount {
///     fn visit_element(&mut self, _e: &LeafElement) {}
///     fn visit_quadrupole(&mut self, _e: &LeafElement) {
///         self.0 += 1;
///     }
/// }
///
/// let quad = |name: &str| {
///     ElementBuilder::new(ElementKind::Quadrupole, name)
///         .length(0.5)
///         .propagator(Rc::new(IdentityPropagator))
///         .build()
///         .unwrap()
/// };
/// let mut inner = Beamline::new("cell");
/// inner.append(quad("QF"));
/// let mut outer = Beamline::new("ring");
/// outer.append(inner);
/// outer.append(quad("QD"));
///
/// let mut v = QuadCount::default();
/// outer.accept(&mut v);
/// assert_eq!(v.0, 2);
/// ```
pub trait Visitor {
    /// Fallback for every leaf kind.
    fn visit_element(&mut self, element: &LeafElement);

    /// A nested or top-level line.
    fn visit_beamline(&mut self, line: &Beamline) {
        walk_beamline(self, line);
    }

    /// A marker.
    fn visit_marker(&mut self, element: &LeafElement) {
        self.visit_element(element);
    }

    /// A drift.
    fn visit_drift(&mut self, element: &LeafElement) {
        self.visit_element(element);
    }

    /// A slot.
    fn visit_slot(&mut self, element: &LeafElement) {
        self.visit_element(element);
    }

    /// A thick quadrupole.
    fn visit_quadrupole(&mut self, element: &LeafElement) {
        self.visit_element(element);
    }

    /// A thin quadrupole.
    fn visit_thin_quad(&mut self, element: &LeafElement) {
        self.visit_element(element);
    }

    /// A thick sextupole.
    fn visit_sextupole(&mut self, element: &LeafElement) {
        self.visit_element(element);
    }

    /// A thin sextupole.
    fn visit_thin_sextupole(&mut self, element: &LeafElement) {
        self.visit_element(element);
    }

    /// A horizontal corrector.
    fn visit_hkick(&mut self, element: &LeafElement) {
        self.visit_element(element);
    }

    /// A vertical corrector.
    fn visit_vkick(&mut self, element: &LeafElement) {
        self.visit_element(element);
    }

    /// A two-plane monitor.
    fn visit_monitor(&mut self, element: &LeafElement) {
        self.visit_element(element);
    }

    /// A horizontal monitor.
    fn visit_hmonitor(&mut self, element: &LeafElement) {
        self.visit_element(element);
    }

    /// A vertical monitor.
    fn visit_vmonitor(&mut self, element: &LeafElement) {
        self.visit_element(element);
    }

    /// A sector bend.
    fn visit_sbend(&mut self, element: &LeafElement) {
        self.visit_element(element);
    }

    /// A rectangular bend.
    fn visit_rbend(&mut self, element: &LeafElement) {
        self.visit_element(element);
    }

    /// A beam-axis rotation.
    fn visit_srot(&mut self, element: &LeafElement) {
        self.visit_element(element);
    }

    /// A precomputed map.
    fn visit_sector(&mut self, element: &LeafElement) {
        self.visit_element(element);
    }

    /// A composite element.
    fn visit_combined_function(&mut self, element: &LeafElement) {
        self.visit_element(element);
    }
}

/// Visit every child of `line` in order.
pub fn walk_beamline<V: Visitor + ?Sized>(v: &mut V, line: &Beamline) {
    for elm in line.elements() {
        elm.borrow().accept(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementBuilder;
    use crate::kind::ElementKind;
    use crate::propagator::IdentityPropagator;
    use std::rc::Rc;

    fn leaf(kind: ElementKind, name: &str, length: f64) -> LeafElement {
        ElementBuilder::new(kind, name)
            .length(length)
            .propagator(Rc::new(IdentityPropagator))
            .build()
            .unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        seen: Vec<String>,
        lines: usize,
    }

    impl Visitor for Recorder {
        fn visit_element(&mut self, e: &LeafElement) {
            self.seen.push(format!("{}:{}", e.type_name(), e.name()));
        }

        fn visit_beamline(&mut self, line: &Beamline) {
            self.lines += 1;
            walk_beamline(self, line);
        }

        fn visit_drift(&mut self, _e: &LeafElement) {}
    }

    #[test]
    fn per_kind_override_and_fallback() {
        let mut inner = Beamline::new("inner");
        inner.append(leaf(ElementKind::Quadrupole, "Q", 0.5));
        inner.append(leaf(ElementKind::Drift, "D", 1.0));
        let mut outer = Beamline::new("outer");
        outer.append(leaf(ElementKind::Marker, "M", 0.0));
        outer.append(inner);

        let mut r = Recorder::default();
        outer.accept(&mut r);
        assert_eq!(r.seen, vec!["marker:M", "quadrupole:Q"]);
        assert_eq!(r.lines, 2);
    }
}
