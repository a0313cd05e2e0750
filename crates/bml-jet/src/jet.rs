//! The [`Jet`] truncated power series and its arithmetic.
//!
//! All binary operations assume both operands share one environment;
//! mixing environments is a logic error caught by `debug_assert!`.

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::sync::Arc;

use crate::environment::JetEnvironment;
use crate::error::JetError;

/// A multivariate polynomial truncated at its environment's order.
///
/// Coefficients are stored densely, one per monomial of the environment.
/// Each jet represents a function of the deviation from the environment's
/// reference point; the constant coefficient is the function's value there.
///
/// # Examples
///
/// ```
/// use bml_jet::{Jet, JetEnvironment};
///
/// let env = JetEnvironment::new(2, 3, &[1.0, 0.0]).unwrap();
/// let x = Jet::variable(&env, 0).unwrap();
/// let y = Jet::variable(&env, 1).unwrap();
/// let f = x.clone() * x + y * 3.0;
/// assert_eq!(f.standard_part(), 1.0);
/// assert_eq!(f.derivative(0), 2.0);
/// assert_eq!(f.derivative(1), 3.0);
/// ```
#[derive(Clone)]
pub struct Jet {
    env: Arc<JetEnvironment>,
    coeffs: Vec<f64>,
}

impl Jet {
    /// The zero jet.
    pub fn zero(env: &Arc<JetEnvironment>) -> Self {
        Self {
            env: Arc::clone(env),
            coeffs: vec![0.0; env.len()],
        }
    }

    /// A constant jet.
    pub fn constant(env: &Arc<JetEnvironment>, value: f64) -> Self {
        let mut jet = Self::zero(env);
        jet.coeffs[0] = value;
        jet
    }

    /// The pure deviation `d_var` (no constant part).
    pub fn delta(env: &Arc<JetEnvironment>, var: usize) -> Result<Self, JetError> {
        let mut jet = Self::zero(env);
        if var >= env.num_vars() {
            return Err(JetError::VariableOutOfRange {
                index: var,
                num_vars: env.num_vars(),
            });
        }
        if let Some(slot) = env.linear_slot(var) {
            jet.coeffs[slot] = 1.0;
        }
        Ok(jet)
    }

    /// The coordinate function `reference[var] + d_var`.
    pub fn variable(env: &Arc<JetEnvironment>, var: usize) -> Result<Self, JetError> {
        let mut jet = Self::delta(env, var)?;
        jet.coeffs[0] = env.reference()[var];
        Ok(jet)
    }

    /// The environment this jet lives in.
    pub fn env(&self) -> &Arc<JetEnvironment> {
        &self.env
    }

    /// Value at the reference point.
    pub fn standard_part(&self) -> f64 {
        self.coeffs[0]
    }

    /// All coefficients in the environment's monomial order.
    pub fn coefficients(&self) -> &[f64] {
        &self.coeffs
    }

    /// Coefficient of the monomial with the given exponents (0 if absent).
    pub fn coefficient(&self, exps: &[u8]) -> f64 {
        self.env.slot_of(exps).map_or(0.0, |slot| self.coeffs[slot])
    }

    /// First partial derivative with respect to `var` at the reference point.
    pub fn derivative(&self, var: usize) -> f64 {
        self.env.linear_slot(var).map_or(0.0, |slot| self.coeffs[slot])
    }

    /// Keep only the terms whose total order lies in `min_order..=max_order`.
    pub fn filter(&self, min_order: u32, max_order: u32) -> Self {
        let mut out = Self::zero(&self.env);
        for (slot, &c) in self.coeffs.iter().enumerate() {
            let order = self.env.order_of(slot);
            if (min_order..=max_order).contains(&order) {
                out.coeffs[slot] = c;
            }
        }
        out
    }

    /// Highest order with a nonzero coefficient, or `None` for the zero jet.
    pub fn degree(&self) -> Option<u32> {
        self.coeffs
            .iter()
            .enumerate()
            .rev()
            .find(|&(_, &c)| c != 0.0)
            .map(|(slot, _)| self.env.order_of(slot))
    }

    /// `1 / self`. A zero standard part yields non-finite coefficients.
    pub fn recip(&self) -> Self {
        let a = self.standard_part();
        let n = self.env.max_order() as usize;
        let mut terms = Vec::with_capacity(n + 1);
        let mut t = 1.0 / a;
        for _ in 0..=n {
            terms.push(t);
            t = -t / a;
        }
        self.expand(&terms)
    }

    /// Square root. A negative standard part yields NaN coefficients.
    pub fn sqrt(&self) -> Self {
        let a = self.standard_part();
        let n = self.env.max_order() as usize;
        let root = a.sqrt();
        // Taylor coefficients of sqrt(a + h): binom(1/2, k) a^(1/2 - k).
        let mut terms = Vec::with_capacity(n + 1);
        let mut binom = 1.0;
        let mut scale = root;
        for k in 0..=n {
            terms.push(binom * scale);
            binom *= (0.5 - k as f64) / (k as f64 + 1.0);
            scale /= a;
        }
        self.expand(&terms)
    }

    /// Sine.
    pub fn sin(&self) -> Self {
        let a = self.standard_part();
        self.expand(&trig_terms(a.sin(), a.cos(), self.env.max_order()))
    }

    /// Cosine.
    pub fn cos(&self) -> Self {
        let a = self.standard_part();
        self.expand(&trig_terms(a.cos(), -a.sin(), self.env.max_order()))
    }

    /// Evaluate at a deviation from the reference point.
    ///
    /// Variables beyond `deviation.len()` are taken at zero deviation.
    pub fn evaluate(&self, deviation: &[f64]) -> f64 {
        let n = self.env.num_vars();
        let order = self.env.max_order() as usize;
        let powers: Vec<Vec<f64>> = (0..n)
            .map(|v| {
                let d = deviation.get(v).copied().unwrap_or(0.0);
                let mut row = Vec::with_capacity(order + 1);
                let mut p = 1.0;
                for _ in 0..=order {
                    row.push(p);
                    p *= d;
                }
                row
            })
            .collect();
        self.coeffs
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c != 0.0)
            .map(|(slot, &c)| {
                let exps = self.env.monomial(slot);
                exps.iter()
                    .enumerate()
                    .fold(c, |acc, (v, &e)| acc * powers[v][e as usize])
            })
            .sum()
    }

    /// Substitute `args[v]` for the deviation in variable `v`.
    ///
    /// The result lives in `target`. Variables beyond `args.len()` are
    /// taken at zero deviation, so monomials involving them drop out.
    pub fn compose(&self, target: &Arc<JetEnvironment>, args: &[Jet]) -> Jet {
        let n = self.env.num_vars();
        let order = self.env.max_order() as usize;
        let mut powers: Vec<Vec<Jet>> = Vec::with_capacity(n);
        for v in 0..n {
            let mut row = Vec::with_capacity(order + 1);
            row.push(Jet::constant(target, 1.0));
            if let Some(arg) = args.get(v) {
                for e in 1..=order {
                    let next = &row[e - 1] * arg;
                    row.push(next);
                }
            }
            powers.push(row);
        }

        let mut out = Jet::zero(target);
        for (slot, &c) in self.coeffs.iter().enumerate() {
            if c == 0.0 {
                continue;
            }
            let exps = self.env.monomial(slot);
            let mut term = Jet::constant(target, c);
            let mut vanishes = false;
            for (v, &e) in exps.iter().enumerate() {
                if e == 0 {
                    continue;
                }
                match powers[v].get(e as usize) {
                    Some(p) => term = &term * p,
                    None => {
                        vanishes = true;
                        break;
                    }
                }
            }
            if !vanishes {
                out.add_in_place(&term, 1.0);
            }
        }
        out
    }

    /// Largest absolute difference between two jets' coefficients.
    pub fn max_abs_diff(&self, other: &Jet) -> f64 {
        self.coeffs
            .iter()
            .zip(&other.coeffs)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }

    /// `sum_k terms[k] * h^k` with `h = self - standard_part`.
    fn expand(&self, terms: &[f64]) -> Self {
        let mut h = self.clone();
        h.coeffs[0] = 0.0;
        let mut out = Self::constant(&self.env, terms[0]);
        let mut power = Self::constant(&self.env, 1.0);
        for &t in &terms[1..] {
            power = &power * &h;
            if power.degree().is_none() {
                break;
            }
            out.add_in_place(&power, t);
        }
        out
    }

    fn add_in_place(&mut self, other: &Jet, scale: f64) {
        debug_assert!(Arc::ptr_eq(&self.env, &other.env), "jets from different environments");
        for (a, b) in self.coeffs.iter_mut().zip(&other.coeffs) {
            *a += scale * b;
        }
    }

    fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            env: Arc::clone(&self.env),
            coeffs: self.coeffs.iter().map(|&c| f(c)).collect(),
        }
    }
}

/// Taylor coefficients of sin or cos about `a`: the derivative cycle is
/// `(f, f', -f, -f')` scaled by `1/k!`.
fn trig_terms(f: f64, df: f64, max_order: u32) -> Vec<f64> {
    let cycle = [f, df, -f, -df];
    let mut out = Vec::with_capacity(max_order as usize + 1);
    let mut factorial = 1.0;
    for k in 0..=max_order as usize {
        if k > 0 {
            factorial *= k as f64;
        }
        out.push(cycle[k % 4] / factorial);
    }
    out
}

// ── Arithmetic ──────────────────────────────────────────────────

impl<'a> Add<&'a Jet> for &'a Jet {
    type Output = Jet;
    fn add(self, rhs: &'a Jet) -> Jet {
        let mut out = self.clone();
        out.add_in_place(rhs, 1.0);
        out
    }
}

impl<'a> Sub<&'a Jet> for &'a Jet {
    type Output = Jet;
    fn sub(self, rhs: &'a Jet) -> Jet {
        let mut out = self.clone();
        out.add_in_place(rhs, -1.0);
        out
    }
}

impl<'a> Mul<&'a Jet> for &'a Jet {
    type Output = Jet;
    fn mul(self, rhs: &'a Jet) -> Jet {
        debug_assert!(Arc::ptr_eq(&self.env, &rhs.env), "jets from different environments");
        let mut out = Jet::zero(&self.env);
        for (i, &a) in self.coeffs.iter().enumerate() {
            if a == 0.0 {
                continue;
            }
            for &(j, k) in self.env.products(i) {
                let b = rhs.coeffs[j];
                if b != 0.0 {
                    out.coeffs[k] += a * b;
                }
            }
        }
        out
    }
}

impl<'a> Div<&'a Jet> for &'a Jet {
    type Output = Jet;
    fn div(self, rhs: &'a Jet) -> Jet {
        self * &rhs.recip()
    }
}

macro_rules! owned_binop {
    ($tr:ident, $method:ident) => {
        impl $tr<Jet> for Jet {
            type Output = Jet;
            fn $method(self, rhs: Jet) -> Jet {
                $tr::$method(&self, &rhs)
            }
        }
        impl<'a> $tr<&'a Jet> for Jet {
            type Output = Jet;
            fn $method(self, rhs: &'a Jet) -> Jet {
                $tr::$method(&self, rhs)
            }
        }
    };
}

owned_binop!(Add, add);
owned_binop!(Sub, sub);
owned_binop!(Mul, mul);
owned_binop!(Div, div);

impl Add<f64> for Jet {
    type Output = Jet;
    fn add(mut self, rhs: f64) -> Jet {
        self.coeffs[0] += rhs;
        self
    }
}

impl Sub<f64> for Jet {
    type Output = Jet;
    fn sub(mut self, rhs: f64) -> Jet {
        self.coeffs[0] -= rhs;
        self
    }
}

impl Mul<f64> for Jet {
    type Output = Jet;
    fn mul(self, rhs: f64) -> Jet {
        self.map(|c| c * rhs)
    }
}

impl Div<f64> for Jet {
    type Output = Jet;
    fn div(self, rhs: f64) -> Jet {
        self.map(|c| c / rhs)
    }
}

impl Add<Jet> for f64 {
    type Output = Jet;
    fn add(self, rhs: Jet) -> Jet {
        rhs + self
    }
}

impl Mul<Jet> for f64 {
    type Output = Jet;
    fn mul(self, rhs: Jet) -> Jet {
        rhs * self
    }
}

impl Neg for Jet {
    type Output = Jet;
    fn neg(self) -> Jet {
        self.map(|c| -c)
    }
}

impl Neg for &Jet {
    type Output = Jet;
    fn neg(self) -> Jet {
        self.map(|c| -c)
    }
}

impl fmt::Debug for Jet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_map();
        for (slot, &c) in self.coeffs.iter().enumerate() {
            if c != 0.0 || slot == 0 {
                list.entry(&self.env.monomial(slot), &c);
            }
        }
        list.finish()
    }
}
