//! Geometric edits: displacing or rotating one element in place.
//!
//! The element itself is untouched; its free-space neighbors are
//! rebuilt as slots whose faces absorb the displacement, so every
//! element outside the edit keeps its nominal position.
//!
//! ```text
//!   ... ─ [up] ─┤ target ├─ [down] ─ ...
//!                  │ move/rotate
//!   ... ─ [slot: up exit → moved entrance] ─┤ target ├─ [slot: moved exit → down exit] ─ ...
//! ```

use bml_core::{EditError, Frame};
use smallvec::SmallVec;
use tracing::warn;

use crate::beamline::Beamline;
use crate::element::{Element, ElmPtr, Geometry};
use crate::slot::make_slot;

/// Handles an edit replaced or moved: the target, then the new upstream
/// and downstream slots where they exist.
pub type Touched = SmallVec<[ElmPtr; 3]>;

/// Translations below this are refused [m].
pub const MIN_DISPLACEMENT: f64 = 1e-9;
/// Rotations below this are refused [rad].
pub const MIN_ROTATION: f64 = 1e-9;

impl Beamline {
    /// Displace `target` horizontally by `u` [m].
    pub fn move_rel_x(&mut self, target: &ElmPtr, u: f64) -> Result<Touched, EditError> {
        self.translate(target, 0, u)
    }

    /// Displace `target` vertically by `u` [m].
    pub fn move_rel_y(&mut self, target: &ElmPtr, u: f64) -> Result<Touched, EditError> {
        self.translate(target, 1, u)
    }

    /// Displace `target` along the beam by `u` [m].
    pub fn move_rel_z(&mut self, target: &ElmPtr, u: f64) -> Result<Touched, EditError> {
        self.translate(target, 2, u)
    }

    /// Rotate `target` about its horizontal axis by `angle` [rad], pivoting
    /// at fraction `pct` of its length.
    pub fn pitch(&mut self, target: &ElmPtr, angle: f64, pct: f64) -> Result<Touched, EditError> {
        self.rotate(target, 0, angle, pct)
    }

    /// Rotate `target` about its vertical axis; see [`pitch`](Self::pitch).
    pub fn yaw(&mut self, target: &ElmPtr, angle: f64, pct: f64) -> Result<Touched, EditError> {
        self.rotate(target, 1, angle, pct)
    }

    /// Rotate `target` about the beam axis; see [`pitch`](Self::pitch).
    pub fn roll(&mut self, target: &ElmPtr, angle: f64, pct: f64) -> Result<Touched, EditError> {
        self.rotate(target, 2, angle, pct)
    }

    fn translate(&mut self, target: &ElmPtr, axis: usize, u: f64) -> Result<Touched, EditError> {
        if u.abs() < MIN_DISPLACEMENT {
            return Err(EditError::DisplacementTooSmall {
                name: target.name(),
                displacement: u,
            });
        }
        let mut delta = [0.0; 3];
        delta[axis] = u;
        let length = target.length();
        let entry = Frame::identity().translated(delta);
        let exit = Frame::straight(length).translated(delta);
        self.reframe(target, entry, exit)
    }

    fn rotate(
        &mut self,
        target: &ElmPtr,
        axis: usize,
        angle: f64,
        pct: f64,
    ) -> Result<Touched, EditError> {
        if angle.abs() < MIN_ROTATION {
            return Err(EditError::RotationTooSmall {
                name: target.name(),
                angle,
            });
        }
        let curved = match &*target.borrow() {
            Element::Leaf(leaf) => !matches!(leaf.geometry(), Geometry::Straight),
            Element::Line(line) => line.deep_iter().any(|e| e.kind().is_bend()),
        };
        if curved {
            return Err(EditError::CurvedElement { name: target.name() });
        }
        let pct = if (0.0..=1.0).contains(&pct) {
            pct
        } else {
            warn!(element = %target.name(), pct, "pivot fraction outside [0, 1]; using 0.5");
            0.5
        };
        let length = target.length();
        let pivot = [0.0, 0.0, pct * length];
        let entry = Frame::identity().rotated(axis, angle, pivot);
        let exit = Frame::straight(length).rotated(axis, angle, pivot);
        self.reframe(target, entry, exit)
    }

    /// Rebuild the neighbors of `target` so that it sits between `entry`
    /// and `exit`, both given in its nominal entrance frame.
    fn reframe(&mut self, target: &ElmPtr, entry: Frame, exit: Frame) -> Result<Touched, EditError> {
        let i = self
            .position_of(target)
            .ok_or_else(|| EditError::ElementNotFound { name: target.name() })?;
        let n = self.how_many();
        let ring = self.is_ring();
        let up = match i {
            0 if ring && n > 1 => Some(n - 1),
            0 => None,
            _ => Some(i - 1),
        };
        let down = if i + 1 < n {
            Some(i + 1)
        } else if ring && n > 1 {
            Some(0)
        } else {
            None
        };

        if let (Some(u), Some(d)) = (up, down) {
            if u == d {
                return Err(EditError::SharedNeighbor { name: self.elements()[u].name() });
            }
        }

        for k in [up, down].into_iter().flatten() {
            let neighbor = &self.elements()[k];
            if !neighbor.kind().is_free_space() {
                return Err(EditError::NotFreeSpace { name: neighbor.name() });
            }
        }

        self.invalidate_twiss();
        let mut touched = Touched::new();
        touched.push(target.clone());
        let length = target.length();

        match up {
            Some(k) => {
                let old = self.elements()[k].clone();
                let slot = make_slot(old.name(), entry.patched_onto(&exit_frame(&old)))?;
                let handle = ElmPtr::new(slot);
                self.elements_mut()[k] = handle.clone();
                touched.push(handle);
            }
            None => warn!(element = %target.name(), "no upstream neighbor to absorb the edit"),
        }

        match down {
            Some(k) => {
                let old = self.elements()[k].clone();
                let nominal = exit_frame(&old).patched_onto(&Frame::straight(length));
                let slot = make_slot(old.name(), nominal.relative_to(&exit))?;
                let handle = ElmPtr::new(slot);
                self.elements_mut()[k] = handle.clone();
                touched.push(handle);
            }
            None => warn!(element = %target.name(), "no downstream neighbor to absorb the edit"),
        }

        Ok(touched)
    }
}

/// Exit face of a free-space element relative to its entrance.
fn exit_frame(handle: &ElmPtr) -> Frame {
    match &*handle.borrow() {
        Element::Leaf(leaf) => match leaf.geometry() {
            Geometry::Patch { exit } => *exit,
            _ => Frame::straight(leaf.length()),
        },
        Element::Line(line) => Frame::straight(line.length()),
    }
}
