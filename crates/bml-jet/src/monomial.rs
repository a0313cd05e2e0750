//! Monomial exponent vectors and their graded enumeration.

use smallvec::SmallVec;

/// Exponent vector of one monomial, one entry per variable.
pub type Exponents = SmallVec<[u8; 8]>;

/// Total order of a monomial.
pub fn total_order(exps: &[u8]) -> u32 {
    exps.iter().map(|&e| u32::from(e)).sum()
}

/// Number of monomials in `num_vars` variables up to `max_order`,
/// i.e. `C(num_vars + max_order, max_order)`. Saturates on overflow.
pub fn count(num_vars: usize, max_order: u32) -> usize {
    let mut acc: u128 = 1;
    for k in 1..=u128::from(max_order) {
        acc = acc * (num_vars as u128 + k) / k;
        if acc > usize::MAX as u128 {
            return usize::MAX;
        }
    }
    acc as usize
}

/// All monomials up to `max_order` in graded order.
///
/// Within one order, a larger exponent on a lower-numbered variable
/// comes first, so the first-order block reads `x0, x1, ..., x(n-1)`.
pub fn enumerate(num_vars: usize, max_order: u32) -> Vec<Exponents> {
    let mut out = Vec::with_capacity(count(num_vars, max_order));
    let mut scratch: Exponents = SmallVec::from_elem(0, num_vars);
    for order in 0..=max_order {
        fill(&mut scratch, 0, order, &mut out);
    }
    out
}

fn fill(scratch: &mut Exponents, var: usize, remaining: u32, out: &mut Vec<Exponents>) {
    if var + 1 == scratch.len() {
        scratch[var] = remaining as u8;
        out.push(scratch.clone());
        return;
    }
    for e in (0..=remaining).rev() {
        scratch[var] = e as u8;
        fill(scratch, var + 1, remaining - e, out);
    }
    scratch[var] = 0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_matches_binomial() {
        assert_eq!(count(6, 0), 1);
        assert_eq!(count(6, 1), 7);
        assert_eq!(count(6, 2), 28);
        assert_eq!(count(6, 5), 462);
        assert_eq!(count(2, 3), 10);
    }

    #[test]
    fn enumeration_is_graded_and_complete() {
        let monos = enumerate(3, 3);
        assert_eq!(monos.len(), count(3, 3));
        let orders: Vec<u32> = monos.iter().map(|m| total_order(m)).collect();
        assert!(orders.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(monos[0].as_slice(), &[0, 0, 0]);
        assert_eq!(monos[1].as_slice(), &[1, 0, 0]);
        assert_eq!(monos[2].as_slice(), &[0, 1, 0]);
        assert_eq!(monos[3].as_slice(), &[0, 0, 1]);
        assert_eq!(monos[4].as_slice(), &[2, 0, 0]);
    }

    #[test]
    fn single_variable_is_powers() {
        let monos = enumerate(1, 4);
        let flat: Vec<u8> = monos.iter().map(|m| m[0]).collect();
        assert_eq!(flat, vec![0, 1, 2, 3, 4]);
    }
}
