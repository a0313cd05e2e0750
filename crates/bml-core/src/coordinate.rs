//! The numeric contract shared by plain and series-valued states.
//!
//! Propagation code is written once against [`Coordinate`] and
//! instantiated for `f64` (single-trajectory tracking) and [`Jet`]
//! (map building). Only owned arithmetic is required, so generic code
//! clones where it needs a value twice; for `f64` that is free.

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use bml_jet::Jet;

/// Arithmetic needed to carry one phase-space coordinate through an element.
pub trait Coordinate:
    Clone
    + fmt::Debug
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + Add<f64, Output = Self>
    + Sub<f64, Output = Self>
    + Mul<f64, Output = Self>
    + Div<f64, Output = Self>
{
    /// A constant of the same representation as `self`.
    fn constant_like(&self, value: f64) -> Self;

    /// Square root.
    fn sqrt(&self) -> Self;

    /// Sine.
    fn sin(&self) -> Self;

    /// Cosine.
    fn cos(&self) -> Self;

    /// Value on the reference trajectory.
    fn standard_part(&self) -> f64;
}

impl Coordinate for f64 {
    fn constant_like(&self, value: f64) -> Self {
        value
    }

    fn sqrt(&self) -> Self {
        f64::sqrt(*self)
    }

    fn sin(&self) -> Self {
        f64::sin(*self)
    }

    fn cos(&self) -> Self {
        f64::cos(*self)
    }

    fn standard_part(&self) -> f64 {
        *self
    }
}

impl Coordinate for Jet {
    fn constant_like(&self, value: f64) -> Self {
        Jet::constant(self.env(), value)
    }

    fn sqrt(&self) -> Self {
        Jet::sqrt(self)
    }

    fn sin(&self) -> Self {
        Jet::sin(self)
    }

    fn cos(&self) -> Self {
        Jet::cos(self)
    }

    fn standard_part(&self) -> f64 {
        Jet::standard_part(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bml_jet::JetEnvironment;

    fn hypot<C: Coordinate>(a: C, b: C) -> C {
        (a.clone() * a + b.clone() * b).sqrt()
    }

    #[test]
    fn generic_code_agrees_across_representations() {
        let plain = hypot(3.0, 4.0);
        let env = JetEnvironment::new(2, 2, &[3.0, 4.0]).unwrap();
        let series = hypot(Jet::variable(&env, 0).unwrap(), Jet::variable(&env, 1).unwrap());
        assert_eq!(plain, 5.0);
        assert!((series.standard_part() - 5.0).abs() < 1e-14);
        assert!((series.derivative(0) - 0.6).abs() < 1e-14);
        assert!((series.derivative(1) - 0.8).abs() < 1e-14);
    }

    #[test]
    fn constant_like_shares_environment() {
        let env = JetEnvironment::new(1, 3, &[0.0]).unwrap();
        let x = Jet::variable(&env, 0).unwrap();
        let c = x.constant_like(2.5);
        assert!(std::sync::Arc::ptr_eq(c.env(), &env));
        assert_eq!(c.standard_part(), 2.5);
    }
}
