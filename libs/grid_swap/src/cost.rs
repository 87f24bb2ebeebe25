//! Proof-cost model for grid exponents
//!
//! The on-chain validator recomputes `base^exponent` by square-and-multiply,
//! so the cost of an exponent is the number of squarings plus the number of
//! extra multiplications for the set bits below the leading one.

/// Number of significant bits in `n` (0 for 0)
pub fn bit_length(n: u64) -> u32 {
    u64::BITS - n.leading_zeros()
}

/// Multiplications needed to prove `x^exponent` by binary exponentiation
pub fn exponent_cost(exponent: i64) -> u32 {
    let n = exponent.unsigned_abs();
    if n == 0 {
        return 0;
    }
    (bit_length(n) - 1) + (n.count_ones() - 1)
}

/// Lower bound on [`exponent_cost`] over `exponent` and every exponent above it.
///
/// Stepping upward from a non-positive exponent passes through 0, so the
/// bound there is 0. For `e ≥ 2` every larger exponent has at least
/// `bit_length(e)` bits and therefore at least `bit_length(e) - 1` squarings.
pub fn cheapest_cost_ahead(exponent: i64) -> u32 {
    if exponent <= 1 {
        return 0;
    }
    bit_length(exponent as u64) - 1
}

/// Combined proof cost of a buying/selling exponent pair
pub fn pair_cost(exponent_buying: i64, exponent_selling: i64) -> u32 {
    exponent_cost(exponent_buying) + exponent_cost(exponent_selling)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_length() {
        assert_eq!(bit_length(0), 0);
        assert_eq!(bit_length(1), 1);
        assert_eq!(bit_length(2), 2);
        assert_eq!(bit_length(255), 8);
        assert_eq!(bit_length(256), 9);
    }

    #[test]
    fn test_exponent_cost_known_values() {
        assert_eq!(exponent_cost(0), 0);
        assert_eq!(exponent_cost(1), 0);
        assert_eq!(exponent_cost(2), 1);
        assert_eq!(exponent_cost(3), 2);
        assert_eq!(exponent_cost(8), 3);
        assert_eq!(exponent_cost(31), 8);
        assert_eq!(exponent_cost(32), 5);
        assert_eq!(exponent_cost(256), 8);
    }

    #[test]
    fn test_exponent_cost_ignores_sign() {
        for n in 0..200 {
            assert_eq!(exponent_cost(n), exponent_cost(-n));
        }
        assert_eq!(exponent_cost(i64::MIN), 63);
    }

    #[test]
    fn test_cheapest_cost_ahead_is_a_lower_bound() {
        for exponent in -70i64..300 {
            let cheapest = (exponent..exponent + 600)
                .map(exponent_cost)
                .min()
                .unwrap();
            assert!(
                cheapest_cost_ahead(exponent) <= cheapest,
                "bound {} above true minimum {} at {}",
                cheapest_cost_ahead(exponent),
                cheapest,
                exponent
            );
        }
    }

    #[test]
    fn test_cheapest_cost_ahead_is_tight_at_powers_of_two() {
        for k in 1..20u32 {
            let exponent = 1i64 << k;
            assert_eq!(cheapest_cost_ahead(exponent), exponent_cost(exponent));
        }
    }

    #[test]
    fn test_pair_cost() {
        assert_eq!(pair_cost(-8, 32), 8);
        assert_eq!(pair_cost(0, 0), 0);
    }
}
