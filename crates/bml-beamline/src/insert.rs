//! Insertion of elements at longitudinal positions.

use bml_core::EditError;
use tracing::{debug, warn};

use crate::beamline::Beamline;
use crate::element::{Element, ElmPtr};

/// Positions closer than this are treated as equal [m].
pub const POSITION_FUZZ: f64 = 1e-9;

impl Beamline {
    /// Insert `element` with its entrance at `s`, for a line starting at `s0`.
    ///
    /// At an element boundary the element is inserted without splitting.
    /// Strictly inside a nested line or a composite's sub-line the
    /// insertion recurses into it; strictly inside any other leaf the leaf
    /// is split and the element spliced between the two pieces. Returns
    /// the number of splits performed.
    pub fn insert_element_at(
        &mut self,
        s0: f64,
        s: f64,
        element: impl Into<ElmPtr>,
    ) -> Result<usize, EditError> {
        let handle = element.into();
        let end = s0 + self.length();
        if s < s0 - POSITION_FUZZ || s > end + POSITION_FUZZ {
            return Err(EditError::PositionOutOfRange { s, start: s0, end });
        }
        let splits = self.place(s0, s, handle)?;
        self.invalidate_twiss();
        Ok(splits)
    }

    fn place(&mut self, s0: f64, s: f64, handle: ElmPtr) -> Result<usize, EditError> {
        let mut here = s0;
        for i in 0..self.how_many() {
            if (s - here).abs() < POSITION_FUZZ {
                self.elements_mut().insert(i, handle);
                return Ok(0);
            }
            let current = self.elements()[i].clone();
            let length = current.length();
            let exit = here + length;
            if s < exit - POSITION_FUZZ {
                match &mut *current.borrow_mut() {
                    Element::Line(line) => return line.insert_element_at(here, s, handle),
                    Element::Leaf(leaf) if leaf.sub_line().is_some() => {
                        warn!(
                            line = %self.name(),
                            element = %leaf.name(),
                            s,
                            "inserting into a composite element"
                        );
                        return leaf.insert_into_sub_line(here, s, handle);
                    }
                    Element::Leaf(_) => {}
                }
                let (a, b) = current.borrow().split((s - here) / length)?;
                debug!(
                    line = %self.name(),
                    element = %current.name(),
                    s,
                    "split for insertion"
                );
                self.elements_mut()
                    .splice(i..=i, [ElmPtr::new(a), handle, ElmPtr::new(b)]);
                return Ok(1);
            }
            here = exit;
        }

        self.elements_mut().push(handle);
        Ok(0)
    }

    /// Insert several elements at positions measured on the unmodified line.
    ///
    /// Entries are applied in order of position; each inserted element
    /// shifts the later positions by its own length. Returns the total
    /// number of splits.
    pub fn insert_elements_from_list(
        &mut self,
        s0: f64,
        mut list: Vec<(ElmPtr, f64)>,
    ) -> Result<usize, EditError> {
        list.sort_by(|a, b| a.1.total_cmp(&b.1));
        let mut shift = 0.0;
        let mut splits = 0;
        for (element, s) in list {
            let length = element.length();
            splits += self.insert_element_at(s0, s + shift, element)?;
            shift += length;
        }
        Ok(splits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementBuilder, LeafElement};
    use crate::kind::ElementKind;
    use crate::propagator::{IdentityPropagator, SubLinePropagator};
    use bml_core::barnacle::{LatticeFunctions, TWISS_LABEL};
    use std::rc::Rc;

    fn leaf(kind: ElementKind, name: &str, length: f64) -> LeafElement {
        ElementBuilder::new(kind, name)
            .length(length)
            .propagator(Rc::new(IdentityPropagator))
            .build()
            .unwrap()
    }

    fn two_drifts() -> Beamline {
        let mut line = Beamline::new("L");
        line.append(leaf(ElementKind::Drift, "D1", 2.0));
        line.append(leaf(ElementKind::Drift, "D2", 3.0));
        line
    }

    fn names(line: &Beamline) -> Vec<String> {
        line.iter().map(|e| e.name()).collect()
    }

    #[test]
    fn boundary_insert_does_not_split() {
        let mut line = two_drifts();
        let n = line
            .insert_element_at(0.0, 2.0, leaf(ElementKind::Monitor, "BPM", 0.0))
            .unwrap();
        assert_eq!(n, 0);
        assert_eq!(names(&line), ["D1", "BPM", "D2"]);
    }

    #[test]
    fn interior_insert_splits_once() {
        let mut line = two_drifts();
        let before = line.length();
        let n = line
            .insert_element_at(10.0, 11.5, leaf(ElementKind::Marker, "M", 0.0))
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(names(&line), ["D1_CL_A", "M", "D1_CL_B", "D2"]);
        assert_eq!(line.how_many(), 4);
        assert!((line.length() - before).abs() < 1e-12);
    }

    #[test]
    fn end_boundary_appends() {
        let mut line = two_drifts();
        line.insert_element_at(0.0, 5.0, leaf(ElementKind::Marker, "END", 0.0))
            .unwrap();
        assert_eq!(line.back().unwrap().name(), "END");
    }

    #[test]
    fn out_of_range_is_rejected() {
        let mut line = two_drifts();
        let err = line
            .insert_element_at(0.0, 5.5, leaf(ElementKind::Marker, "M", 0.0))
            .unwrap_err();
        assert_eq!(err.code(), 2);
        assert_eq!(line.how_many(), 2);
    }

    #[test]
    fn insertion_recurses_into_nested_lines() {
        let mut outer = Beamline::new("outer");
        outer.append(leaf(ElementKind::Drift, "D0", 1.0));
        outer.append(two_drifts());
        outer.insert_element_at(0.0, 4.0, leaf(ElementKind::Marker, "M", 0.0))
            .unwrap();
        assert_eq!(outer.how_many(), 2);
        let deep: Vec<String> = outer.deep_iter().map(|e| e.name()).collect();
        assert_eq!(deep, ["D0", "D1", "D2_CL_A", "M", "D2_CL_B"]);
    }

    fn combined_function() -> Beamline {
        let mut parts = Beamline::new("CF_parts");
        parts.append(leaf(ElementKind::Drift, "D3", 0.1));
        parts.append(leaf(ElementKind::Quadrupole, "K", 0.1));
        parts.append(leaf(ElementKind::Drift, "D3", 0.2));
        let cf = ElementBuilder::new(ElementKind::CombinedFunction, "CF")
            .length(0.4)
            .sub_line(parts, Some(1))
            .propagator(Rc::new(SubLinePropagator))
            .build()
            .unwrap();
        let mut line = Beamline::new("L");
        line.append(cf);
        line
    }

    #[test]
    fn insertion_recurses_into_composite_sub_line() {
        let mut line = combined_function();
        let n = line
            .insert_element_at(0.0, 0.25, leaf(ElementKind::Marker, "M", 0.0))
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(line.how_many(), 1);
        let cf = line.get(0).unwrap().borrow();
        let cf = cf.as_leaf().unwrap();
        let parts: Vec<String> = cf.sub_line().unwrap().iter().map(|e| e.name()).collect();
        assert_eq!(parts, ["D3", "K", "D3_CL_A", "M", "D3_CL_B"]);
        assert_eq!(cf.active_part().unwrap().name(), "K");
        assert!((cf.length() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn thick_insertion_into_composite_grows_it() {
        let mut line = combined_function();
        line.insert_element_at(0.0, 0.05, leaf(ElementKind::Quadrupole, "Q", 0.2))
            .unwrap();
        assert!((line.length() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn splitting_the_active_part_releases_it() {
        let mut line = combined_function();
        line.insert_element_at(0.0, 0.15, leaf(ElementKind::Marker, "M", 0.0))
            .unwrap();
        let cf = line.get(0).unwrap().borrow();
        assert!(cf.as_leaf().unwrap().active_part().is_none());
    }

    #[test]
    fn insertion_discards_lattice_functions() {
        let mut outer = Beamline::new("outer");
        outer.append(leaf(ElementKind::Drift, "D0", 1.0));
        outer.append(two_drifts());
        let d0 = outer.get(0).unwrap().clone();
        d0.borrow_mut()
            .barnacles_mut()
            .append(TWISS_LABEL, LatticeFunctions::default());
        outer.set_twiss_done(true);
        outer
            .insert_element_at(0.0, 4.0, leaf(ElementKind::Marker, "M", 0.0))
            .unwrap();
        assert!(!outer.twiss_done());
        assert!(!d0.borrow().barnacles().contains(TWISS_LABEL));
    }

    #[test]
    fn list_positions_refer_to_unmodified_line() {
        let mut line = two_drifts();
        let list = vec![
            (ElmPtr::new(leaf(ElementKind::Quadrupole, "Q2", 0.5)), 4.0),
            (ElmPtr::new(leaf(ElementKind::Quadrupole, "Q1", 0.5)), 1.0),
        ];
        let splits = line.insert_elements_from_list(0.0, list).unwrap();
        assert_eq!(splits, 2);
        assert!((line.length() - 6.0).abs() < 1e-12);
        let q2 = line.iter().position(|e| e.name() == "Q2").unwrap();
        let entrance = line.positions()[q2];
        assert!((entrance - 4.5).abs() < 1e-12);
    }
}
