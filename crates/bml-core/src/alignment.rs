//! Transverse misalignment of one element.
//!
//! An [`Alignment`] is an offset of the element's axis in `x` and `y`
//! plus a roll about the beam direction. [`Alignment::misalign`] carries
//! a state from the design frame into the element's local frame;
//! [`Alignment::align`] carries it back.
//!
//! # Invariants
//!
//! - `cos_tilt` and `sin_tilt` always match `tilt`; every setter recomputes them.
//! - The transforms never call trigonometric functions.

use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;
use crate::phase::{DIM, NPX, NPY, X, Y};

/// Flat alignment record, used for persistence and construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignmentData {
    /// Horizontal offset [m].
    pub x_offset: f64,
    /// Vertical offset [m].
    pub y_offset: f64,
    /// Roll about the beam direction [rad].
    pub tilt: f64,
}

/// Offset and roll of an element relative to the design axis.
///
/// # Examples
///
/// ```
/// use bml_core::Alignment;
///
/// let a = Alignment::new(1e-3, 0.0, 0.01);
/// let mut state = [2e-3, 1e-3, 0.0, 1e-4, 0.0, 0.0];
/// let before = state;
/// a.misalign(&mut state);
/// a.align(&mut state);
/// for (x, y) in state.iter().zip(&before) {
///     assert!((x - y).abs() < 1e-15);
/// }
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "AlignmentData", into = "AlignmentData")]
pub struct Alignment {
    x_offset: f64,
    y_offset: f64,
    tilt: f64,
    cos_tilt: f64,
    sin_tilt: f64,
}

impl Alignment {
    /// Offset `(x_offset, y_offset)` [m] and roll `tilt` [rad].
    pub fn new(x_offset: f64, y_offset: f64, tilt: f64) -> Self {
        Self {
            x_offset,
            y_offset,
            tilt,
            cos_tilt: tilt.cos(),
            sin_tilt: tilt.sin(),
        }
    }

    /// No misalignment.
    pub fn null() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// True iff offsets and tilt are all exactly zero.
    pub fn is_null(&self) -> bool {
        self.x_offset == 0.0 && self.y_offset == 0.0 && self.tilt == 0.0
    }

    /// Horizontal offset [m].
    pub fn x_offset(&self) -> f64 {
        self.x_offset
    }

    /// Vertical offset [m].
    pub fn y_offset(&self) -> f64 {
        self.y_offset
    }

    /// Roll [rad].
    pub fn tilt(&self) -> f64 {
        self.tilt
    }

    /// Cached `cos(tilt)`.
    pub fn cos_tilt(&self) -> f64 {
        self.cos_tilt
    }

    /// Cached `sin(tilt)`.
    pub fn sin_tilt(&self) -> f64 {
        self.sin_tilt
    }

    /// Set the horizontal offset [m].
    pub fn set_x_offset(&mut self, x: f64) {
        self.x_offset = x;
    }

    /// Set the vertical offset [m].
    pub fn set_y_offset(&mut self, y: f64) {
        self.y_offset = y;
    }

    /// Set the roll [rad] and refresh the cached cosine and sine.
    pub fn set_tilt(&mut self, tilt: f64) {
        self.tilt = tilt;
        self.cos_tilt = tilt.cos();
        self.sin_tilt = tilt.sin();
    }

    /// Design frame to local frame: subtract the offsets, then roll by `tilt`.
    pub fn misalign<C: Coordinate>(&self, state: &mut [C; DIM]) {
        if self.x_offset != 0.0 {
            state[X] = state[X].clone() - self.x_offset;
        }
        if self.y_offset != 0.0 {
            state[Y] = state[Y].clone() - self.y_offset;
        }
        if self.tilt != 0.0 {
            let (c, s) = (self.cos_tilt, self.sin_tilt);
            rotate(state, X, Y, c, s);
            rotate(state, NPX, NPY, c, s);
        }
    }

    /// Local frame to design frame: undo the roll, then add the offsets.
    pub fn align<C: Coordinate>(&self, state: &mut [C; DIM]) {
        if self.tilt != 0.0 {
            let (c, s) = (self.cos_tilt, -self.sin_tilt);
            rotate(state, X, Y, c, s);
            rotate(state, NPX, NPY, c, s);
        }
        if self.x_offset != 0.0 {
            state[X] = state[X].clone() + self.x_offset;
        }
        if self.y_offset != 0.0 {
            state[Y] = state[Y].clone() + self.y_offset;
        }
    }

    /// Flat record of this alignment.
    pub fn data(&self) -> AlignmentData {
        AlignmentData {
            x_offset: self.x_offset,
            y_offset: self.y_offset,
            tilt: self.tilt,
        }
    }
}

impl Default for Alignment {
    fn default() -> Self {
        Self::null()
    }
}

impl From<AlignmentData> for Alignment {
    fn from(d: AlignmentData) -> Self {
        Self::new(d.x_offset, d.y_offset, d.tilt)
    }
}

impl From<Alignment> for AlignmentData {
    fn from(a: Alignment) -> Self {
        a.data()
    }
}

/// `u' = u·c + v·s`, `v' = v·c − u·s`.
fn rotate<C: Coordinate>(state: &mut [C; DIM], u: usize, v: usize, c: f64, s: f64) {
    let a = state[u].clone();
    let b = state[v].clone();
    state[u] = a.clone() * c + b.clone() * s;
    state[v] = b * c - a * s;
}
