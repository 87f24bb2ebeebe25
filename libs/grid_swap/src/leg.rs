//! Asset leg state: one asset of a swap on its side of the trade
//!
//! A leg prices its asset on a geometric grid anchored at the position's
//! stored price. With `g = (jump_size + 1) / jump_size`, the leg keeps the
//! exact ratio `g^exponent` as two integer power terms and moves them by one
//! base factor per step instead of re-exponentiating.
//!
//! Prices are quoted as units of the asset per unit of value, so the AMM
//! price of an asset is `liquidity * weight`:
//!
//! - buying (the pool releases the asset): `P = anchor / g^e`, and the pool
//!   can release `delta` while `(liquidity - delta) * weight >= P`.
//! - selling (the pool absorbs the asset): `P = anchor * g^e`, and the pool
//!   can absorb `delta` while `(liquidity + delta) * weight <= P`.
//!
//! Both capacities grow with the exponent while the trader's price worsens.
//!
//! The cursor is mutated in place. A leg belongs to exactly one search and
//! must not be shared between threads while that search runs; independent
//! searches each build their own legs.

use std::fmt;
use std::ops::RangeInclusive;

use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use crate::error::GridSwapError;
use crate::math::{ceil_div, ln_ratio, Price};

/// Largest exponent magnitude a leg cursor is ever seeded at
pub const MAX_GRID_EXPONENT: i64 = 1 << 24;

/// Which way the asset moves relative to the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The trader receives this asset from the pool
    Buying,
    /// The trader gives this asset to the pool
    Selling,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buying => write!(f, "buying"),
            Side::Selling => write!(f, "selling"),
        }
    }
}

/// Upper bound on the traded amount of a leg
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaxDelta {
    Bounded(BigUint),
    /// Only legal for the selling leg
    Unbounded,
}

impl MaxDelta {
    pub fn bound(&self) -> Option<&BigUint> {
        match self {
            MaxDelta::Bounded(value) => Some(value),
            MaxDelta::Unbounded => None,
        }
    }
}

/// Raw position parameters supplied by the pool-parsing layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegParams {
    /// Liquidity contributed by the protocol
    pub virtual_reserve: BigUint,
    /// Liquidity contributed by depositors
    pub balance: BigUint,
    /// Withdrawable part of `balance`; defaults to `max_delta` on the buying side
    pub available: Option<BigUint>,
    pub weight: BigUint,
    pub jump_size: BigUint,
    /// Stored reference price, valid at exponent 0
    pub anchor: BigUint,
    /// Dust floor
    pub min_delta: BigUint,
    pub max_delta: MaxDelta,
}

/// Tradeable amount of a leg at its current exponent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capacity {
    pub amount: BigUint,
    /// The AMM would allow at least the leg's ceiling, so larger exponents add nothing
    pub saturated: bool,
}

/// `grid_numerator / grid_denominator == g^exponent`
#[derive(Debug, Clone, PartialEq, Eq)]
struct GridCursor {
    exponent: i64,
    grid_numerator: BigUint,
    grid_denominator: BigUint,
}

/// One asset of a swap, with its grid cursor
#[derive(Debug, Clone)]
pub struct AssetLeg {
    side: Side,
    virtual_reserve: BigUint,
    balance: BigUint,
    liquidity: BigUint,
    weight: BigUint,
    jump_size: BigUint,
    jump_size_next: BigUint,
    anchor: BigUint,
    min_delta: BigUint,
    max_delta: MaxDelta,
    ceiling: Option<BigUint>,
    cursor: GridCursor,
}

impl AssetLeg {
    /// Validate the parameters and place the cursor at exponent 0
    pub fn new(side: Side, params: LegParams) -> Result<Self, GridSwapError> {
        let LegParams {
            virtual_reserve,
            balance,
            available,
            weight,
            jump_size,
            anchor,
            min_delta,
            max_delta,
        } = params;

        for (field, value) in [
            ("weight", &weight),
            ("jump_size", &jump_size),
            ("anchor", &anchor),
            ("min_delta", &min_delta),
        ] {
            if value.is_zero() {
                return Err(GridSwapError::NonPositiveParameter { side, field });
            }
        }

        let liquidity = &virtual_reserve + &balance;
        if liquidity.is_zero() {
            return Err(GridSwapError::EmptyLiquidity { side });
        }

        let bound = match (side, max_delta.bound()) {
            (Side::Buying, None) => return Err(GridSwapError::UnboundedBuyingLeg),
            (_, bound) => bound,
        };
        if let Some(bound) = bound {
            if min_delta > *bound {
                return Err(GridSwapError::MinDeltaExceedsMax {
                    side,
                    min_delta,
                    max_delta: bound.clone(),
                });
            }
        }

        let available = match (side, available) {
            (Side::Buying, None) => bound.cloned(),
            (_, available) => available,
        };

        let ceiling = match (bound, available) {
            (Some(bound), Some(available)) => Some(bound.clone().min(available)),
            (Some(bound), None) => Some(bound.clone()),
            (None, available) => available,
        };

        let jump_size_next = &jump_size + BigUint::one();
        Ok(Self {
            side,
            virtual_reserve,
            balance,
            liquidity,
            weight,
            jump_size,
            jump_size_next,
            anchor,
            min_delta,
            max_delta,
            ceiling,
            cursor: GridCursor {
                exponent: 0,
                grid_numerator: BigUint::one(),
                grid_denominator: BigUint::one(),
            },
        })
    }

    pub fn buying(params: LegParams) -> Result<Self, GridSwapError> {
        Self::new(Side::Buying, params)
    }

    pub fn selling(params: LegParams) -> Result<Self, GridSwapError> {
        Self::new(Side::Selling, params)
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn exponent(&self) -> i64 {
        self.cursor.exponent
    }

    pub fn virtual_reserve(&self) -> &BigUint {
        &self.virtual_reserve
    }

    pub fn balance(&self) -> &BigUint {
        &self.balance
    }

    pub fn liquidity(&self) -> &BigUint {
        &self.liquidity
    }

    pub fn weight(&self) -> &BigUint {
        &self.weight
    }

    pub fn jump_size(&self) -> &BigUint {
        &self.jump_size
    }

    pub fn anchor(&self) -> &BigUint {
        &self.anchor
    }

    pub fn min_delta(&self) -> &BigUint {
        &self.min_delta
    }

    pub fn max_delta(&self) -> &MaxDelta {
        &self.max_delta
    }

    /// `min(max_delta, available)`, `None` when unconstrained
    pub fn ceiling(&self) -> Option<&BigUint> {
        self.ceiling.as_ref()
    }

    /// Numerator of `g^exponent`
    pub fn grid_numerator(&self) -> &BigUint {
        &self.cursor.grid_numerator
    }

    /// Denominator of `g^exponent`
    pub fn grid_denominator(&self) -> &BigUint {
        &self.cursor.grid_denominator
    }

    /// Exact spot price at the current exponent
    pub fn spot_price(&self) -> Price {
        let GridCursor {
            grid_numerator,
            grid_denominator,
            ..
        } = &self.cursor;
        match self.side {
            Side::Buying => Price::new(&self.anchor * grid_denominator, grid_numerator.clone()),
            Side::Selling => Price::new(&self.anchor * grid_numerator, grid_denominator.clone()),
        }
    }

    /// Capacity at the current exponent, `None` when below the dust floor
    pub fn capacity(&self) -> Option<Capacity> {
        let derived = self.derived_capacity()?;
        let (amount, saturated) = match &self.ceiling {
            Some(ceiling) if derived >= *ceiling => (ceiling.clone(), true),
            _ => (derived, false),
        };
        (amount >= self.min_delta).then_some(Capacity { amount, saturated })
    }

    /// Capacity allowed by the AMM alone, `None` when it is zero
    fn derived_capacity(&self) -> Option<BigUint> {
        let GridCursor {
            grid_numerator,
            grid_denominator,
            ..
        } = &self.cursor;
        match self.side {
            Side::Buying => {
                let retained = ceil_div(
                    &(&self.anchor * grid_denominator),
                    &(grid_numerator * &self.weight),
                );
                (retained < self.liquidity).then(|| &self.liquidity - retained)
            }
            Side::Selling => {
                let reachable = (&self.anchor * grid_numerator) / (grid_denominator * &self.weight);
                (reachable > self.liquidity).then(|| reachable - &self.liquidity)
            }
        }
    }

    fn admits(&self, delta: &BigUint) -> bool {
        self.derived_capacity()
            .is_some_and(|capacity| capacity >= *delta)
    }

    /// Move the cursor to `exponent` one grid step at a time
    pub fn advance_to(&mut self, exponent: i64) {
        while self.cursor.exponent < exponent {
            self.step_up();
        }
        while self.cursor.exponent > exponent {
            self.step_down();
        }
    }

    fn step_up(&mut self) {
        let cursor = &mut self.cursor;
        if cursor.exponent >= 0 {
            cursor.grid_numerator *= &self.jump_size_next;
            cursor.grid_denominator *= &self.jump_size;
        } else {
            cursor.grid_numerator /= &self.jump_size;
            cursor.grid_denominator /= &self.jump_size_next;
        }
        cursor.exponent += 1;
    }

    fn step_down(&mut self) {
        let cursor = &mut self.cursor;
        if cursor.exponent > 0 {
            cursor.grid_numerator /= &self.jump_size_next;
            cursor.grid_denominator /= &self.jump_size;
        } else {
            cursor.grid_numerator *= &self.jump_size;
            cursor.grid_denominator *= &self.jump_size_next;
        }
        cursor.exponent -= 1;
    }

    /// Jump straight to `exponent`, exponentiating the bases once
    fn reset_to(&mut self, exponent: i64) {
        let exponent = exponent.clamp(-MAX_GRID_EXPONENT, MAX_GRID_EXPONENT);
        let magnitude = exponent.unsigned_abs() as u32;
        let rising = self.jump_size_next.pow(magnitude);
        let falling = self.jump_size.pow(magnitude);
        self.cursor = if exponent >= 0 {
            GridCursor {
                exponent,
                grid_numerator: rising,
                grid_denominator: falling,
            }
        } else {
            GridCursor {
                exponent,
                grid_numerator: falling,
                grid_denominator: rising,
            }
        };
    }

    /// Smallest exponent inside `window` at which `delta` fits this leg.
    ///
    /// A logarithmic estimate seeds the cursor; exact capacity checks then
    /// walk it to the true minimum. Leaves the cursor at the returned
    /// exponent. `None` when no exponent in the window admits `delta`.
    pub fn minimal_exponent_for(
        &mut self,
        delta: &BigUint,
        window: RangeInclusive<i64>,
    ) -> Option<i64> {
        if let Some(ceiling) = &self.ceiling {
            if delta > ceiling {
                return None;
            }
        }
        let low = (*window.start()).max(-MAX_GRID_EXPONENT);
        let high = (*window.end()).min(MAX_GRID_EXPONENT);
        if low > high {
            return None;
        }

        let estimate = self.estimate_exponent_for(delta)?;
        self.reset_to(estimate.clamp(low, high));

        while !self.admits(delta) {
            if self.cursor.exponent >= high {
                return None;
            }
            self.step_up();
        }
        while self.cursor.exponent > low {
            self.step_down();
            if !self.admits(delta) {
                self.step_up();
                break;
            }
        }
        Some(self.cursor.exponent)
    }

    /// Floating-point guess at the smallest feasible exponent for `delta`
    fn estimate_exponent_for(&self, delta: &BigUint) -> Option<i64> {
        let target = match self.side {
            Side::Buying => {
                if self.liquidity <= *delta {
                    return None;
                }
                &self.weight * (&self.liquidity - delta)
            }
            Side::Selling => &self.weight * (&self.liquidity + delta),
        };
        let log_gap = match self.side {
            Side::Buying => ln_ratio(&self.anchor, &target),
            Side::Selling => ln_ratio(&target, &self.anchor),
        };
        let log_step = ln_ratio(&self.jump_size_next, &self.jump_size).max(f64::MIN_POSITIVE);
        let raw = (log_gap / log_step).ceil();
        if !raw.is_finite() {
            return Some(0);
        }
        Some(raw as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(value: u64) -> BigUint {
        BigUint::from(value)
    }

    fn params(balance: u64, weight: u64, jump_size: u64, anchor: u64) -> LegParams {
        LegParams {
            virtual_reserve: big(0),
            balance: big(balance),
            available: None,
            weight: big(weight),
            jump_size: big(jump_size),
            anchor: big(anchor),
            min_delta: big(1),
            max_delta: MaxDelta::Bounded(big(balance)),
        }
    }

    #[test]
    fn test_rejects_non_positive_parameters() {
        let mut bad = params(1000, 2, 10, 100);
        bad.weight = big(0);
        assert_eq!(
            AssetLeg::buying(bad).unwrap_err(),
            GridSwapError::NonPositiveParameter {
                side: Side::Buying,
                field: "weight"
            }
        );

        let mut bad = params(1000, 2, 10, 100);
        bad.anchor = big(0);
        assert!(matches!(
            AssetLeg::selling(bad),
            Err(GridSwapError::NonPositiveParameter { field: "anchor", .. })
        ));
    }

    #[test]
    fn test_rejects_empty_liquidity() {
        let bad = params(0, 2, 10, 100);
        assert_eq!(
            AssetLeg::selling(bad).unwrap_err(),
            GridSwapError::EmptyLiquidity {
                side: Side::Selling
            }
        );
    }

    #[test]
    fn test_rejects_min_delta_above_max_delta() {
        let mut bad = params(1000, 2, 10, 100);
        bad.min_delta = big(2000);
        assert!(matches!(
            AssetLeg::buying(bad),
            Err(GridSwapError::MinDeltaExceedsMax { .. })
        ));
    }

    #[test]
    fn test_rejects_unbounded_buying_leg() {
        let mut bad = params(1000, 2, 10, 100);
        bad.max_delta = MaxDelta::Unbounded;
        assert_eq!(
            AssetLeg::buying(bad.clone()).unwrap_err(),
            GridSwapError::UnboundedBuyingLeg
        );
        bad.available = Some(big(10));
        assert_eq!(
            AssetLeg::buying(bad).unwrap_err(),
            GridSwapError::UnboundedBuyingLeg
        );
    }

    #[test]
    fn test_ceiling_is_min_of_max_delta_and_available() {
        let mut p = params(1000, 2, 10, 100);
        p.available = Some(big(300));
        let leg = AssetLeg::buying(p).unwrap();
        assert_eq!(leg.ceiling(), Some(&big(300)));
        assert_eq!(leg.liquidity(), &big(1000));

        let mut p = params(1000, 2, 10, 100);
        p.max_delta = MaxDelta::Unbounded;
        let leg = AssetLeg::selling(p).unwrap();
        assert_eq!(leg.ceiling(), None);
    }

    #[test]
    fn test_spot_price_at_zero_is_anchor() {
        let leg = AssetLeg::buying(params(1000, 2, 10, 100)).unwrap();
        assert_eq!(leg.spot_price(), Price::new(big(100), big(1)));
    }

    #[test]
    fn test_spot_price_moves_against_the_trader() {
        let mut buying = AssetLeg::buying(params(1000, 2, 10, 100)).unwrap();
        buying.advance_to(1);
        assert_eq!(buying.spot_price(), Price::new(big(1000), big(11)));

        let mut selling = AssetLeg::selling(params(1000, 2, 10, 100)).unwrap();
        selling.advance_to(-2);
        assert_eq!(selling.spot_price(), Price::new(big(10000), big(121)));
    }

    #[test]
    fn test_incremental_steps_match_direct_exponentiation() {
        let mut walked = AssetLeg::selling(params(1000, 2, 7, 100)).unwrap();
        let mut jumped = walked.clone();
        for target in [5, -3, 12, -9, 0, 1] {
            walked.advance_to(target);
            jumped.reset_to(target);
            assert_eq!(walked.cursor, jumped.cursor, "diverged at {}", target);
        }
    }

    #[test]
    fn test_buying_capacity() {
        let mut leg = AssetLeg::buying(params(1000, 2, 10, 100)).unwrap();
        // 1000 - ceil(100 / 2)
        assert_eq!(leg.capacity().unwrap().amount, big(950));

        // price 100 * 1.1^8 = 214.35..., half of it rounds up to 108
        leg.advance_to(-8);
        assert_eq!(leg.capacity().unwrap().amount, big(892));

        leg.advance_to(-40);
        assert_eq!(leg.capacity(), None);
    }

    #[test]
    fn test_selling_capacity() {
        let mut leg = AssetLeg::selling(params(1000, 2, 10, 100)).unwrap();
        assert_eq!(leg.capacity(), None);

        // floor(100 * 1.1^32 / 2) = 1055
        leg.advance_to(32);
        assert_eq!(leg.capacity().unwrap().amount, big(55));
        leg.advance_to(31);
        assert_eq!(leg.capacity(), None);
    }

    #[test]
    fn test_capacity_saturates_at_ceiling() {
        let mut p = params(1000, 2, 10, 100);
        p.available = Some(big(100));
        let mut leg = AssetLeg::buying(p).unwrap();
        let capacity = leg.capacity().unwrap();
        assert_eq!(capacity.amount, big(100));
        assert!(capacity.saturated);

        leg.advance_to(-31);
        let capacity = leg.capacity().unwrap();
        assert!(!capacity.saturated);
        assert_eq!(capacity.amount, big(40));
    }

    #[test]
    fn test_capacity_is_monotone_in_exponent() {
        for side in [Side::Buying, Side::Selling] {
            let mut p = params(5000, 3, 4, 900);
            p.max_delta = match side {
                Side::Buying => MaxDelta::Bounded(big(5000)),
                Side::Selling => MaxDelta::Unbounded,
            };
            let mut leg = AssetLeg::new(side, p).unwrap();
            let mut previous = big(0);
            for exponent in -60..60 {
                leg.advance_to(exponent);
                let amount = leg.capacity().map(|c| c.amount).unwrap_or_default();
                assert!(amount >= previous, "{} capacity fell at {}", side, exponent);
                previous = amount;
            }
        }
    }

    #[test]
    fn test_minimal_exponent_is_exact() {
        let mut buying = AssetLeg::buying(params(1000, 2, 10, 100)).unwrap();
        assert_eq!(buying.minimal_exponent_for(&big(1), -256..=256), Some(-31));
        assert_eq!(buying.exponent(), -31);

        let mut selling = AssetLeg::selling(params(1000, 2, 10, 100)).unwrap();
        assert_eq!(selling.minimal_exponent_for(&big(1), -256..=256), Some(32));
        assert_eq!(selling.minimal_exponent_for(&big(55), -256..=256), Some(32));
        assert_eq!(selling.minimal_exponent_for(&big(56), -256..=256), Some(33));
    }

    #[test]
    fn test_minimal_exponent_respects_window() {
        let mut selling = AssetLeg::selling(params(1000, 2, 10, 100)).unwrap();
        assert_eq!(selling.minimal_exponent_for(&big(1), -16..=16), None);

        let mut buying = AssetLeg::buying(params(1000, 2, 10, 100)).unwrap();
        assert_eq!(buying.minimal_exponent_for(&big(1), -16..=16), Some(-16));
    }

    #[test]
    fn test_minimal_exponent_with_very_fine_grid() {
        // g = 1 + 1e-16, so 1 unit of capacity on 1e14 liquidity needs about 100 steps
        let liquidity = BigUint::from(10u64).pow(14);
        let p = LegParams {
            virtual_reserve: big(0),
            balance: liquidity.clone(),
            available: None,
            weight: big(1),
            jump_size: BigUint::from(10u64).pow(16),
            anchor: liquidity,
            min_delta: big(1),
            max_delta: MaxDelta::Unbounded,
        };
        let mut selling = AssetLeg::selling(p).unwrap();

        let estimate = selling.estimate_exponent_for(&big(1)).unwrap();
        assert!((99..=101).contains(&estimate), "estimate {}", estimate);

        assert_eq!(selling.minimal_exponent_for(&big(1), -256..=256), Some(100));
        assert_eq!(selling.capacity().unwrap().amount, big(1));
        selling.advance_to(99);
        assert_eq!(selling.capacity(), None);
    }

    #[test]
    fn test_minimal_exponent_rejects_delta_above_ceiling() {
        let mut p = params(1000, 2, 10, 100);
        p.available = Some(big(5));
        let mut buying = AssetLeg::buying(p).unwrap();
        assert_eq!(buying.minimal_exponent_for(&big(6), -256..=256), None);
        assert_eq!(buying.minimal_exponent_for(&big(1000), -256..=256), None);
    }
}
