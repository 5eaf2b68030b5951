//! Scientific-notation cost quantities
//!
//! Edge costs are expressed as `coefficient × 10^exponent` to cover the
//! dynamic range of a schedule (nanosecond ringlets next to multi-second
//! waits, microjoules next to kilojoules) without binary floating-point
//! drift. Arithmetic aligns exponents exactly: coefficients are widened
//! to big integers during addition and comparison, so no precision is
//! ever lost along a path.
//!
//! Quantities keep the representation they were constructed with.
//! `100 × 10^-9` and `1 × 10^-7` are equal (and hash identically), but
//! the exponent each was written with is observable — cost-comparison
//! granularities are derived from the exponents a structure's costs were
//! expressed in.

use num_bigint::BigUint;
use num_traits::Zero;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A non-negative scalar quantity `coefficient × 10^exponent`
#[derive(Clone, Debug)]
pub struct Quantity {
    coefficient: BigUint,
    exponent: i32,
}

impl Quantity {
    /// Create a quantity from a coefficient and a decimal exponent
    pub fn new(coefficient: u64, exponent: i32) -> Self {
        Quantity {
            coefficient: BigUint::from(coefficient),
            exponent,
        }
    }

    /// The zero quantity
    pub fn zero() -> Self {
        Quantity {
            coefficient: BigUint::zero(),
            exponent: 0,
        }
    }

    /// Whether this quantity is zero
    pub fn is_zero(&self) -> bool {
        self.coefficient.is_zero()
    }

    /// A whole-unit quantity (seconds for time, joules for energy)
    pub fn units(n: u64) -> Self {
        Quantity::new(n, 0)
    }

    /// `n × 10^-3`
    pub fn milli(n: u64) -> Self {
        Quantity::new(n, -3)
    }

    /// `n × 10^-6`
    pub fn micro(n: u64) -> Self {
        Quantity::new(n, -6)
    }

    /// `n × 10^-9`
    pub fn nano(n: u64) -> Self {
        Quantity::new(n, -9)
    }

    /// The exponent this quantity was expressed with
    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    /// The coefficient this quantity was expressed with
    pub fn coefficient(&self) -> &BigUint {
        &self.coefficient
    }

    /// Canonical form: smallest coefficient with no trailing factor of
    /// ten, paired with the corresponding exponent. Zero canonicalizes
    /// to `(0, 0)`.
    pub fn normalized(&self) -> (BigUint, i32) {
        if self.coefficient.is_zero() {
            return (BigUint::zero(), 0);
        }
        let ten = BigUint::from(10u32);
        let mut c = self.coefficient.clone();
        let mut e = self.exponent;
        while (&c % &ten).is_zero() {
            c /= &ten;
            e += 1;
        }
        (c, e)
    }

    /// Exact sum. The result keeps the smaller of the two exponents as
    /// its representation exponent.
    pub fn add(&self, other: &Quantity) -> Quantity {
        if self.is_zero() {
            return other.clone();
        }
        if other.is_zero() {
            return self.clone();
        }
        let exponent = self.exponent.min(other.exponent);
        let coefficient = self.aligned_coefficient(exponent) + other.aligned_coefficient(exponent);
        Quantity {
            coefficient,
            exponent,
        }
    }

    /// Coefficient rescaled to the given (smaller or equal) exponent
    fn aligned_coefficient(&self, exponent: i32) -> BigUint {
        debug_assert!(exponent <= self.exponent || self.is_zero());
        if self.is_zero() {
            return BigUint::zero();
        }
        let shift = (self.exponent - exponent) as u32;
        &self.coefficient * BigUint::from(10u32).pow(shift)
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Quantity {}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quantity {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.is_zero() || other.is_zero() {
            // Avoid exponent alignment against zero's meaningless exponent
            return match (self.is_zero(), other.is_zero()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                (false, false) => unreachable!(),
            };
        }
        let exponent = self.exponent.min(other.exponent);
        self.aligned_coefficient(exponent)
            .cmp(&other.aligned_coefficient(exponent))
    }
}

impl Hash for Quantity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Hash the canonical form so value-equal quantities collide
        let (c, e) = self.normalized();
        c.hash(state);
        e.hash(state);
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exponent == 0 {
            write!(f, "{}", self.coefficient)
        } else {
            write!(f, "{}e{}", self.coefficient, self.exponent)
        }
    }
}

/// The two independent cost dimensions carried by an edge
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CostDimension {
    /// Wall-clock duration of the transition
    Time,
    /// Energy expended across the transition
    Energy,
}

impl fmt::Display for CostDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostDimension::Time => write!(f, "time"),
            CostDimension::Energy => write!(f, "energy"),
        }
    }
}

/// A two-dimensional edge cost: (time, energy)
///
/// Costs combine by per-dimension addition when accumulated along a path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Cost {
    pub time: Quantity,
    pub energy: Quantity,
}

impl Cost {
    pub fn new(time: Quantity, energy: Quantity) -> Self {
        Cost { time, energy }
    }

    /// A zero cost in both dimensions
    pub fn zero() -> Self {
        Cost {
            time: Quantity::zero(),
            energy: Quantity::zero(),
        }
    }

    /// Per-dimension sum
    pub fn add(&self, other: &Cost) -> Cost {
        Cost {
            time: self.time.add(&other.time),
            energy: self.energy.add(&other.energy),
        }
    }

    /// Project onto one dimension
    pub fn dimension(&self, dim: CostDimension) -> &Quantity {
        match dim {
            CostDimension::Time => &self.time,
            CostDimension::Energy => &self.energy,
        }
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(time: {}, energy: {})", self.time, self.energy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_representation() {
        assert_eq!(Quantity::new(100, -9), Quantity::new(1, -7));
        assert_eq!(Quantity::new(5000, 0), Quantity::new(5, 3));
        assert_ne!(Quantity::new(100, -9), Quantity::new(1, -8));
    }

    #[test]
    fn test_add_aligns_exponents() {
        // 1e-6 + 100e-9 = 1100e-9 = 1.1e-6
        let sum = Quantity::new(1, -6).add(&Quantity::new(100, -9));
        assert_eq!(sum, Quantity::new(1100, -9));
        assert_eq!(sum.exponent(), -9);
    }

    #[test]
    fn test_add_zero_is_identity() {
        let q = Quantity::new(42, -3);
        assert_eq!(q.add(&Quantity::zero()), q);
        assert_eq!(Quantity::zero().add(&q), q);
    }

    #[test]
    fn test_ordering() {
        assert!(Quantity::new(1, -6) > Quantity::new(100, -9));
        assert!(Quantity::zero() < Quantity::new(1, -30));
        assert!(Quantity::new(2, 3) > Quantity::new(1999, 0));
    }

    #[test]
    fn test_add_does_not_overflow() {
        // Wide exponent spread forces coefficients past u64
        let big = Quantity::new(u64::MAX, 10);
        let small = Quantity::new(1, -10);
        let sum = big.add(&small);
        assert!(sum > big);
        assert_eq!(sum.exponent(), -10);
    }

    #[test]
    fn test_normalized_strips_trailing_zeros() {
        let (c, e) = Quantity::new(100, -9).normalized();
        assert_eq!(c, 1u32.into());
        assert_eq!(e, -7);

        let (c, e) = Quantity::zero().normalized();
        assert!(c == 0u32.into());
        assert_eq!(e, 0);
    }

    #[test]
    fn test_cost_add_per_dimension() {
        let a = Cost::new(Quantity::new(1, -6), Quantity::new(2, 0));
        let b = Cost::new(Quantity::new(2, -6), Quantity::new(3, 0));
        let sum = a.add(&b);
        assert_eq!(sum.time, Quantity::new(3, -6));
        assert_eq!(sum.energy, Quantity::new(5, 0));
    }
}
