//! Value equation and validated pair solutions
//!
//! At a buying exponent `e_b` and a selling exponent `e_s` a trade is valid iff
//!
//! ```text
//! delta_buying  * (anchor_s * num_s * num_b)
//!     <= delta_selling * (anchor_b * den_b * den_s)
//! ```
//!
//! where `num/den` are each leg's grid terms `g^e`. This is the integer form
//! of "the value received does not exceed the value given up", the same
//! arithmetic the on-chain validator re-derives. Equality means the trade is
//! perfect; strict inequality means the selling amount was rounded up.

use std::cmp::Ordering;

use num_bigint::BigUint;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::cost::pair_cost;
use crate::leg::{AssetLeg, Capacity};
use crate::math::{ceil_div, reduce, Price};

/// Cross-multiplied value-equation coefficients at one exponent pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueEquation {
    /// `anchor_s * num_s * num_b`, multiplies `delta_buying`
    numerator: BigUint,
    /// `anchor_b * den_b * den_s`, multiplies `delta_selling`
    denominator: BigUint,
}

impl ValueEquation {
    /// Coefficients at the legs' current exponents
    pub fn at(buying: &AssetLeg, selling: &AssetLeg) -> Self {
        let numerator = selling.anchor() * selling.grid_numerator() * buying.grid_numerator();
        let denominator = buying.anchor() * buying.grid_denominator() * selling.grid_denominator();
        Self {
            numerator,
            denominator,
        }
    }

    pub fn numerator(&self) -> &BigUint {
        &self.numerator
    }

    pub fn denominator(&self) -> &BigUint {
        &self.denominator
    }

    /// `Less`/`Equal` when the trade is admissible, `Greater` when it gives away value
    pub fn check(&self, delta_buying: &BigUint, delta_selling: &BigUint) -> Ordering {
        (delta_buying * &self.numerator).cmp(&(delta_selling * &self.denominator))
    }

    /// Lowest effective price any trade at this pair can reach
    pub fn spot_ratio(&self) -> Price {
        Price::new(self.numerator.clone(), self.denominator.clone())
    }

    pub fn reduced(&self) -> ReducedRatio {
        let (selling_unit, buying_unit) = reduce(&self.numerator, &self.denominator);
        ReducedRatio {
            selling_unit,
            buying_unit,
        }
    }

    /// Bit width of the larger coefficient
    pub fn bits(&self) -> u64 {
        self.numerator.bits().max(self.denominator.bits())
    }
}

/// The value equation divided through by its gcd.
///
/// Exact trades are the multiples `k * (buying_unit, selling_unit)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReducedRatio {
    pub selling_unit: BigUint,
    pub buying_unit: BigUint,
}

impl ReducedRatio {
    /// Largest `delta_buying` that `delta_selling` pays for
    pub fn max_buying_for(&self, delta_selling: &BigUint) -> BigUint {
        delta_selling * &self.buying_unit / &self.selling_unit
    }

    /// Smallest `delta_selling` that pays for `delta_buying`
    pub fn min_selling_for(&self, delta_buying: &BigUint) -> BigUint {
        ceil_div(&(delta_buying * &self.selling_unit), &self.buying_unit)
    }
}

/// Inclusive range a leg's delta must fall in at one exponent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaBounds {
    pub min: BigUint,
    pub max: BigUint,
}

impl DeltaBounds {
    fn of(leg: &AssetLeg, capacity: &Capacity) -> Self {
        Self {
            min: leg.min_delta().clone(),
            max: capacity.amount.clone(),
        }
    }

    pub fn contains(&self, delta: &BigUint) -> bool {
        self.min <= *delta && *delta <= self.max
    }
}

/// A validated trade at one exponent pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairSolution {
    exponent_buying: i64,
    exponent_selling: i64,
    delta_buying: BigUint,
    delta_selling: BigUint,
    perfect: bool,
    equation: ValueEquation,
    bounds_buying: DeltaBounds,
    bounds_selling: DeltaBounds,
    spot_price_buying: Price,
    spot_price_selling: Price,
}

impl PairSolution {
    /// Best trade at the legs' current exponents, computing capacities first
    pub fn derive(buying: &AssetLeg, selling: &AssetLeg, max_scan_steps: u64) -> Option<Self> {
        let capacity_buying = buying.capacity()?;
        let capacity_selling = selling.capacity()?;
        Self::best_at(
            buying,
            selling,
            ValueEquation::at(buying, selling),
            &capacity_buying,
            &capacity_selling,
            max_scan_steps,
        )
    }

    /// Best trade at the legs' current exponents.
    ///
    /// Takes the largest exact multiple of the reduced ratio when one fits
    /// both legs, otherwise scans for the cheapest rounded trade.
    pub(crate) fn best_at(
        buying: &AssetLeg,
        selling: &AssetLeg,
        equation: ValueEquation,
        capacity_buying: &Capacity,
        capacity_selling: &Capacity,
        max_scan_steps: u64,
    ) -> Option<Self> {
        let ratio = equation.reduced();
        let bounds_buying = DeltaBounds::of(buying, capacity_buying);
        let bounds_selling = DeltaBounds::of(selling, capacity_selling);

        let (delta_buying, delta_selling) =
            match perfect_amounts(&ratio, &bounds_buying, &bounds_selling) {
                Some(amounts) => amounts,
                None => scan_imperfect(&ratio, &bounds_buying, &bounds_selling, max_scan_steps)?,
            };

        Some(Self::assemble(
            (buying.exponent(), selling.exponent()),
            equation,
            bounds_buying,
            bounds_selling,
            (buying.spot_price(), selling.spot_price()),
            delta_buying,
            delta_selling,
        ))
    }

    /// Checks every invariant; a failure here is an optimizer defect
    fn assemble(
        (exponent_buying, exponent_selling): (i64, i64),
        equation: ValueEquation,
        bounds_buying: DeltaBounds,
        bounds_selling: DeltaBounds,
        (spot_price_buying, spot_price_selling): (Price, Price),
        delta_buying: BigUint,
        delta_selling: BigUint,
    ) -> Self {
        assert!(
            bounds_buying.contains(&delta_buying),
            "delta_buying {} outside [{}, {}]",
            delta_buying,
            bounds_buying.min,
            bounds_buying.max
        );
        assert!(
            bounds_selling.contains(&delta_selling),
            "delta_selling {} outside [{}, {}]",
            delta_selling,
            bounds_selling.min,
            bounds_selling.max
        );
        let balance = equation.check(&delta_buying, &delta_selling);
        assert!(
            balance != Ordering::Greater,
            "value equation violated at exponents ({}, {}): buying {} selling {}",
            exponent_buying,
            exponent_selling,
            delta_buying,
            delta_selling
        );

        Self {
            exponent_buying,
            exponent_selling,
            delta_buying,
            delta_selling,
            perfect: balance == Ordering::Equal,
            equation,
            bounds_buying,
            bounds_selling,
            spot_price_buying,
            spot_price_selling,
        }
    }

    pub fn exponent_buying(&self) -> i64 {
        self.exponent_buying
    }

    pub fn exponent_selling(&self) -> i64 {
        self.exponent_selling
    }

    pub fn delta_buying(&self) -> &BigUint {
        &self.delta_buying
    }

    pub fn delta_selling(&self) -> &BigUint {
        &self.delta_selling
    }

    /// True iff the value equation holds with equality
    pub fn is_perfect(&self) -> bool {
        self.perfect
    }

    pub fn value_equation(&self) -> &ValueEquation {
        &self.equation
    }

    pub fn bounds_buying(&self) -> &DeltaBounds {
        &self.bounds_buying
    }

    pub fn bounds_selling(&self) -> &DeltaBounds {
        &self.bounds_selling
    }

    /// Spot prices of the buying and selling legs at the solution's exponents
    pub fn spot_prices(&self) -> (&Price, &Price) {
        (&self.spot_price_buying, &self.spot_price_selling)
    }

    /// `delta_selling / delta_buying`; lower is better for the trader
    pub fn effective_price(&self) -> Price {
        Price::new(self.delta_selling.clone(), self.delta_buying.clone())
    }

    pub fn effective_price_decimal(&self) -> Option<Decimal> {
        self.effective_price().to_decimal()
    }

    /// Multiplications the validator spends on both exponentiations
    pub fn cost(&self) -> u32 {
        pair_cost(self.exponent_buying, self.exponent_selling)
    }

    /// Lower effective price wins; equal prices go to the larger trade
    pub fn is_better_than(&self, other: &PairSolution) -> bool {
        match self.effective_price().cmp(&other.effective_price()) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => self.delta_buying > other.delta_buying,
        }
    }

    /// Shrink the trade to at most `requested` units bought, at the same exponents.
    ///
    /// Returns `None` when the request falls below the buying dust floor.
    pub fn resize_to_buying(&self, requested: &BigUint) -> Option<Self> {
        if *requested >= self.delta_buying {
            return Some(self.clone());
        }
        if *requested < self.bounds_buying.min {
            return None;
        }
        let delta_selling = self
            .equation
            .reduced()
            .min_selling_for(requested)
            .max(self.bounds_selling.min.clone());
        if !self.bounds_selling.contains(&delta_selling) {
            return None;
        }
        Some(Self::assemble(
            (self.exponent_buying, self.exponent_selling),
            self.equation.clone(),
            self.bounds_buying.clone(),
            self.bounds_selling.clone(),
            (self.spot_price_buying.clone(), self.spot_price_selling.clone()),
            requested.clone(),
            delta_selling,
        ))
    }
}

/// Largest `k` with `k * buying_unit` and `k * selling_unit` inside both bounds
fn perfect_amounts(
    ratio: &ReducedRatio,
    buying: &DeltaBounds,
    selling: &DeltaBounds,
) -> Option<(BigUint, BigUint)> {
    let k_low = ceil_div(&buying.min, &ratio.buying_unit)
        .max(ceil_div(&selling.min, &ratio.selling_unit));
    let k_high = (&buying.max / &ratio.buying_unit).min(&selling.max / &ratio.selling_unit);
    if k_low > k_high {
        return None;
    }
    Some((&k_high * &ratio.buying_unit, &k_high * &ratio.selling_unit))
}

/// Cheapest rounded trade when no exact multiple fits.
///
/// Walks `delta_buying` down from the largest amount the selling capacity
/// can pay for, pairing each with the smallest admissible `delta_selling`.
/// Without an exact multiple in range every candidate costs at least
/// `n/d + 1/(delta_buying * d)`, so the walk ends once that bound reaches the
/// best price found.
fn scan_imperfect(
    ratio: &ReducedRatio,
    buying: &DeltaBounds,
    selling: &DeltaBounds,
    max_scan_steps: u64,
) -> Option<(BigUint, BigUint)> {
    let high = buying.max.clone().min(ratio.max_buying_for(&selling.max));
    if high < buying.min {
        return None;
    }

    let mut best: Option<(BigUint, BigUint)> = None;
    let mut delta_buying = high;
    let mut steps = 0u64;
    loop {
        let delta_selling = ratio
            .min_selling_for(&delta_buying)
            .max(selling.min.clone());
        let improves = match &best {
            Some((best_buying, best_selling)) => {
                &delta_selling * best_buying < best_selling * &delta_buying
            }
            None => true,
        };
        if improves {
            trace!(%delta_buying, %delta_selling, "imperfect candidate");
            best = Some((delta_buying.clone(), delta_selling));
        }

        if delta_buying == buying.min {
            break;
        }
        steps += 1;
        if steps >= max_scan_steps {
            warn!(steps, %delta_buying, "imperfect scan stopped at its step cap");
            break;
        }
        delta_buying -= 1u32;

        if let Some((best_buying, best_selling)) = &best {
            let floor_price_numerator = &delta_buying * &ratio.selling_unit + 1u32;
            if best_selling * &delta_buying * &ratio.buying_unit
                <= best_buying * floor_price_numerator
            {
                break;
            }
        }
    }
    best
}
