//! Shared description of a jet's variables, order and reference point.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::JetError;
use crate::monomial::{self, Exponents};

/// Largest monomial table an environment will build.
pub const MAX_MONOMIALS: usize = 50_000;

/// Highest truncation order an environment accepts.
pub const MAX_ORDER: u32 = 20;

/// Variables, truncation order and monomial tables shared by a family of jets.
///
/// Environments are immutable once built and always handed out as
/// `Arc<JetEnvironment>`; jets from different environments must not be
/// mixed in arithmetic.
///
/// # Examples
///
/// ```
/// use bml_jet::JetEnvironment;
///
/// let env = JetEnvironment::new(2, 3, &[0.0, 0.0]).unwrap();
/// assert_eq!(env.num_vars(), 2);
/// assert_eq!(env.len(), 10);
/// ```
pub struct JetEnvironment {
    num_vars: usize,
    max_order: u32,
    reference: Vec<f64>,
    monomials: Vec<Exponents>,
    orders: Vec<u32>,
    index: HashMap<Exponents, usize>,
    products: Vec<Vec<(usize, usize)>>,
}

impl JetEnvironment {
    /// Build an environment of `num_vars` variables truncated at `max_order`,
    /// expanded about `reference`.
    pub fn new(num_vars: usize, max_order: u32, reference: &[f64]) -> Result<Arc<Self>, JetError> {
        if num_vars == 0 {
            return Err(JetError::NoVariables);
        }
        if reference.len() != num_vars {
            return Err(JetError::ReferenceLength {
                expected: num_vars,
                got: reference.len(),
            });
        }
        let count = monomial::count(num_vars, max_order);
        if max_order > MAX_ORDER || count > MAX_MONOMIALS {
            return Err(JetError::TooManyMonomials {
                num_vars,
                max_order,
                count,
                limit: MAX_MONOMIALS,
            });
        }

        let monomials = monomial::enumerate(num_vars, max_order);
        let orders: Vec<u32> = monomials.iter().map(|m| monomial::total_order(m)).collect();
        let index: HashMap<Exponents, usize> = monomials
            .iter()
            .enumerate()
            .map(|(i, m)| (m.clone(), i))
            .collect();

        let mut products = Vec::with_capacity(monomials.len());
        let mut sum: Exponents = Exponents::from_elem(0, num_vars);
        for (i, a) in monomials.iter().enumerate() {
            let mut row = Vec::new();
            for (j, b) in monomials.iter().enumerate() {
                if orders[i] + orders[j] > max_order {
                    // Graded order: every later j is at least as high.
                    break;
                }
                for v in 0..num_vars {
                    sum[v] = a[v] + b[v];
                }
                if let Some(&k) = index.get(&sum) {
                    row.push((j, k));
                }
            }
            products.push(row);
        }

        Ok(Arc::new(Self {
            num_vars,
            max_order,
            reference: reference.to_vec(),
            monomials,
            orders,
            index,
            products,
        }))
    }

    /// Number of independent variables.
    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    /// Truncation order.
    pub fn max_order(&self) -> u32 {
        self.max_order
    }

    /// Point the expansion is taken about.
    pub fn reference(&self) -> &[f64] {
        &self.reference
    }

    /// Number of monomials (coefficient slots).
    pub fn len(&self) -> usize {
        self.monomials.len()
    }

    /// Always false; an environment holds at least the constant monomial.
    pub fn is_empty(&self) -> bool {
        self.monomials.is_empty()
    }

    /// Exponents of the monomial at `slot`.
    pub fn monomial(&self, slot: usize) -> &[u8] {
        &self.monomials[slot]
    }

    /// Total order of the monomial at `slot`.
    pub fn order_of(&self, slot: usize) -> u32 {
        self.orders[slot]
    }

    /// Slot of the monomial with the given exponents, if within the order limit.
    pub fn slot_of(&self, exps: &[u8]) -> Option<usize> {
        if exps.len() != self.num_vars {
            return None;
        }
        self.index.get(exps).copied()
    }

    /// Slot of the first-order monomial in `var`.
    pub fn linear_slot(&self, var: usize) -> Option<usize> {
        (var < self.num_vars && self.max_order >= 1).then_some(1 + var)
    }

    pub(crate) fn products(&self, slot: usize) -> &[(usize, usize)] {
        &self.products[slot]
    }
}

impl fmt::Debug for JetEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JetEnvironment")
            .field("num_vars", &self.num_vars)
            .field("max_order", &self.max_order)
            .field("reference", &self.reference)
            .field("monomials", &self.monomials.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_variable_set() {
        assert_eq!(JetEnvironment::new(0, 2, &[]).unwrap_err(), JetError::NoVariables);
    }

    #[test]
    fn rejects_mismatched_reference() {
        let err = JetEnvironment::new(3, 2, &[0.0]).unwrap_err();
        assert_eq!(err, JetError::ReferenceLength { expected: 3, got: 1 });
    }

    #[test]
    fn rejects_huge_tables() {
        let err = JetEnvironment::new(12, 12, &[0.0; 12]).unwrap_err();
        assert!(matches!(err, JetError::TooManyMonomials { .. }));
    }

    #[test]
    fn linear_slots_follow_constant() {
        let env = JetEnvironment::new(6, 2, &[0.0; 6]).unwrap();
        for v in 0..6 {
            let slot = env.linear_slot(v).unwrap();
            assert_eq!(env.order_of(slot), 1);
            assert_eq!(env.monomial(slot)[v], 1);
        }
        assert_eq!(env.linear_slot(6), None);
    }

    #[test]
    fn product_table_stays_within_order() {
        let env = JetEnvironment::new(3, 3, &[0.0; 3]).unwrap();
        for i in 0..env.len() {
            for &(j, k) in env.products(i) {
                assert_eq!(env.order_of(i) + env.order_of(j), env.order_of(k));
            }
        }
    }

    #[test]
    fn order_zero_environment_is_constant_only() {
        let env = JetEnvironment::new(4, 0, &[0.0; 4]).unwrap();
        assert_eq!(env.len(), 1);
        assert_eq!(env.linear_slot(0), None);
    }
}
