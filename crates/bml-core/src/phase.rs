//! Phase-space index conventions.

/// Horizontal position [m].
pub const X: usize = 0;
/// Vertical position [m].
pub const Y: usize = 1;
/// Path-time deviation `c·dt` [m].
pub const CDT: usize = 2;
/// Horizontal momentum over reference momentum.
pub const NPX: usize = 3;
/// Vertical momentum over reference momentum.
pub const NPY: usize = 4;
/// Relative momentum deviation.
pub const NDP: usize = 5;

/// Dimension of the phase space.
pub const DIM: usize = 6;

/// A plain state vector.
pub type State = [f64; DIM];
