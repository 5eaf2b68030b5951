//! Property tests for scientific-notation cost arithmetic
//!
//! Quantities are checked against a plain big-integer model: every
//! quantity scales to an exact integer once all operands share the
//! smallest exponent involved.

use kripke_core::Quantity;
use num_bigint::BigUint;
use proptest::prelude::*;

/// The quantity as an integer at the given reference exponent
fn scaled(q: &Quantity, reference: i32) -> BigUint {
    let shift = q.exponent() - reference;
    assert!(shift >= 0, "reference exponent above operand exponent");
    q.coefficient().clone() * BigUint::from(10u32).pow(shift as u32)
}

fn arb_quantity() -> impl Strategy<Value = Quantity> {
    (any::<u64>(), -12i32..=3).prop_map(|(c, e)| Quantity::new(c, e))
}

proptest! {
    #[test]
    fn test_add_matches_integer_model(a in arb_quantity(), b in arb_quantity()) {
        let sum = a.add(&b);
        let reference = a.exponent().min(b.exponent()).min(sum.exponent());
        prop_assert_eq!(
            scaled(&a, reference) + scaled(&b, reference),
            scaled(&sum, reference)
        );
    }

    #[test]
    fn test_add_commutes(a in arb_quantity(), b in arb_quantity()) {
        prop_assert_eq!(a.add(&b), b.add(&a));
    }

    #[test]
    fn test_add_associates(a in arb_quantity(), b in arb_quantity(), c in arb_quantity()) {
        prop_assert_eq!(a.add(&b).add(&c), a.add(&b.add(&c)));
    }

    #[test]
    fn test_zero_is_identity(a in arb_quantity()) {
        prop_assert_eq!(a.add(&Quantity::zero()), a);
    }

    #[test]
    fn test_equality_ignores_representation(c in 0u64..=u64::MAX / 10, e in -11i32..=3) {
        // c * 10^e written with a one-smaller exponent
        prop_assert_eq!(Quantity::new(c, e), Quantity::new(c * 10, e - 1));
    }

    #[test]
    fn test_ordering_matches_integer_model(a in arb_quantity(), b in arb_quantity()) {
        let reference = a.exponent().min(b.exponent());
        let expected = scaled(&a, reference).cmp(&scaled(&b, reference));
        prop_assert_eq!(a.cmp(&b), expected);
    }
}
