//! Right-handed orthonormal reference frames for geometric edits.
//!
//! A [`Frame`] is an origin plus three unit axes, all expressed in a
//! parent frame. The `z` axis points along the beam. Slots (free-space
//! patches between two arbitrary faces) store their exit face as a
//! frame relative to their entrance face.

use serde::{Deserialize, Serialize};

/// Three-vector.
pub type Vec3 = [f64; 3];

/// Origin and axes of a frame, expressed in its parent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    origin: Vec3,
    axes: [Vec3; 3],
}

fn dot(a: &Vec3, b: &Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

impl Frame {
    /// The parent frame itself.
    pub fn identity() -> Self {
        Self {
            origin: [0.0; 3],
            axes: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// The exit face of a straight segment of length `length`.
    pub fn straight(length: f64) -> Self {
        Self::identity().translated([0.0, 0.0, length])
    }

    /// Build from origin and axes; `None` unless the axes are orthonormal.
    pub fn new(origin: Vec3, axes: [Vec3; 3]) -> Option<Self> {
        let frame = Self { origin, axes };
        frame.is_orthonormal(1e-9).then_some(frame)
    }

    /// Origin in the parent frame.
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Axis `i` (0 = x, 1 = y, 2 = z) in the parent frame.
    pub fn axis(&self, i: usize) -> Vec3 {
        self.axes[i]
    }

    /// Whether the axes are orthonormal within `tol`.
    pub fn is_orthonormal(&self, tol: f64) -> bool {
        (0..3).all(|i| {
            (0..3).all(|j| {
                let expect = if i == j { 1.0 } else { 0.0 };
                (dot(&self.axes[i], &self.axes[j]) - expect).abs() <= tol
            })
        })
    }

    /// Shift the origin by `delta`, given in parent coordinates.
    pub fn translated(mut self, delta: Vec3) -> Self {
        for (o, d) in self.origin.iter_mut().zip(delta) {
            *o += d;
        }
        self
    }

    /// Rotate by `angle` about the parent axis `axis` through `pivot`.
    ///
    /// Positive angles follow the right-hand rule.
    pub fn rotated(self, axis: usize, angle: f64, pivot: Vec3) -> Self {
        let (s, c) = angle.sin_cos();
        let (i, j) = match axis {
            0 => (1, 2),
            1 => (2, 0),
            _ => (0, 1),
        };
        let turn = |v: Vec3| {
            let mut out = v;
            out[i] = c * v[i] - s * v[j];
            out[j] = s * v[i] + c * v[j];
            out
        };
        let rel = [
            self.origin[0] - pivot[0],
            self.origin[1] - pivot[1],
            self.origin[2] - pivot[2],
        ];
        let r = turn(rel);
        Self {
            origin: [pivot[0] + r[0], pivot[1] + r[1], pivot[2] + r[2]],
            axes: [turn(self.axes[0]), turn(self.axes[1]), turn(self.axes[2])],
        }
    }

    /// Express `self` (given in the parent) relative to `base` (also in the parent).
    pub fn relative_to(&self, base: &Frame) -> Self {
        let d = [
            self.origin[0] - base.origin[0],
            self.origin[1] - base.origin[1],
            self.origin[2] - base.origin[2],
        ];
        let local = |v: &Vec3| [dot(&base.axes[0], v), dot(&base.axes[1], v), dot(&base.axes[2], v)];
        Self {
            origin: local(&d),
            axes: [local(&self.axes[0]), local(&self.axes[1]), local(&self.axes[2])],
        }
    }

    /// Express `self` (given relative to `base`) in `base`'s parent.
    pub fn patched_onto(&self, base: &Frame) -> Self {
        let global = |v: &Vec3| {
            let mut out = [0.0; 3];
            for (k, b) in base.axes.iter().enumerate() {
                for (o, bc) in out.iter_mut().zip(b) {
                    *o += v[k] * bc;
                }
            }
            out
        };
        let g = global(&self.origin);
        Self {
            origin: [base.origin[0] + g[0], base.origin[1] + g[1], base.origin[2] + g[2]],
            axes: [global(&self.axes[0]), global(&self.axes[1]), global(&self.axes[2])],
        }
    }

    /// Coordinates of a parent-frame point in this frame.
    pub fn to_local_point(&self, p: Vec3) -> Vec3 {
        let d = [p[0] - self.origin[0], p[1] - self.origin[1], p[2] - self.origin[2]];
        [dot(&self.axes[0], &d), dot(&self.axes[1], &d), dot(&self.axes[2], &d)]
    }

    /// Straight-line distance from the parent origin to this origin.
    pub fn distance(&self) -> f64 {
        dot(&self.origin, &self.origin).sqrt()
    }

    /// Largest componentwise difference from `other`.
    pub fn max_abs_diff(&self, other: &Frame) -> f64 {
        let mut m: f64 = 0.0;
        for k in 0..3 {
            m = m.max((self.origin[k] - other.origin[k]).abs());
            for l in 0..3 {
                m = m.max((self.axes[k][l] - other.axes[k][l]).abs());
            }
        }
        m
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::identity()
    }
}
