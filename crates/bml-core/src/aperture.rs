//! Transverse acceptance of an element.

use serde::{Deserialize, Serialize};

/// Transverse aperture, centred on the element's local axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Aperture {
    /// `|x| <= half_width && |y| <= half_height`.
    Rectangular {
        /// Half width [m].
        half_width: f64,
        /// Half height [m].
        half_height: f64,
    },
    /// `(x/a)² + (y/b)² <= 1`.
    Elliptical {
        /// Horizontal semi-axis [m].
        a: f64,
        /// Vertical semi-axis [m].
        b: f64,
    },
}

impl Aperture {
    /// Whether the transverse point `(x, y)` passes.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        match *self {
            Self::Rectangular {
                half_width,
                half_height,
            } => x.abs() <= half_width && y.abs() <= half_height,
            Self::Elliptical { a, b } => (x / a).powi(2) + (y / b).powi(2) <= 1.0,
        }
    }
}
