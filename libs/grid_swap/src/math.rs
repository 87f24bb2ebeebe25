//! Exact integer and rational helpers
//!
//! Every decision that affects which trade is chosen runs through these
//! helpers on `BigUint`. Floating point only appears in [`ln_big`] and [`ln_ratio`],
//! which feed exponent estimates that are re-checked exactly afterwards, and
//! in [`Price::to_f64`] for logs.

use std::cmp::Ordering;
use std::f64::consts::LN_2;
use std::fmt;

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{ToPrimitive, Zero};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fractional digits used when rendering a [`Price`] as a `Decimal`
pub const PRICE_DECIMAL_SCALE: u32 = 12;

/// `ceil(numerator / denominator)`
pub fn ceil_div(numerator: &BigUint, denominator: &BigUint) -> BigUint {
    assert!(!denominator.is_zero(), "ceil_div by zero");
    Integer::div_ceil(numerator, denominator)
}

/// Divide both values by their greatest common divisor
pub fn reduce(a: &BigUint, b: &BigUint) -> (BigUint, BigUint) {
    let divisor = a.gcd(b);
    if divisor.is_zero() {
        return (a.clone(), b.clone());
    }
    (a / &divisor, b / &divisor)
}

/// Natural logarithm of an arbitrarily large integer.
///
/// Values wider than `f64` can hold are shifted down first and the shift is
/// added back as a multiple of `ln 2`. Zero maps to negative infinity.
pub fn ln_big(value: &BigUint) -> f64 {
    const DIRECT_BITS: u64 = 1000;

    let bits = value.bits();
    if bits <= DIRECT_BITS {
        return value.to_f64().map_or(f64::NAN, f64::ln);
    }
    let shift = bits - 64;
    let head = value >> shift;
    head.to_f64().map_or(f64::NAN, f64::ln) + shift as f64 * LN_2
}

/// Natural logarithm of `numerator / denominator`.
///
/// Ratios close to 1 go through `ln_1p` of the relative excess, so a grid
/// step like `(js + 1) / js` keeps its precision for any `js`.
pub fn ln_ratio(numerator: &BigUint, denominator: &BigUint) -> f64 {
    if numerator >= denominator {
        ln_1p_relative(&(numerator - denominator), denominator)
    } else {
        -ln_1p_relative(&(denominator - numerator), numerator)
    }
}

/// `ln(1 + excess / base)`
fn ln_1p_relative(excess: &BigUint, base: &BigUint) -> f64 {
    (ln_big(excess) - ln_big(base)).exp().ln_1p()
}

/// An exact non-negative ratio compared by cross-multiplication.
///
/// Equality is value equality: `2/4 == 1/2`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Price {
    numerator: BigUint,
    denominator: BigUint,
}

impl Price {
    pub fn new(numerator: BigUint, denominator: BigUint) -> Self {
        assert!(!denominator.is_zero(), "price denominator must be non-zero");
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

    /// Same value with numerator and denominator coprime
    pub fn reduced(&self) -> Self {
        let (numerator, denominator) = reduce(&self.numerator, &self.denominator);
        Self {
            numerator,
            denominator,
        }
    }

    /// Truncated decimal rendering, `None` when the value does not fit a `Decimal`
    pub fn to_decimal(&self) -> Option<Decimal> {
        let scaled = &self.numerator * BigUint::from(10u32).pow(PRICE_DECIMAL_SCALE) / &self.denominator;
        let mantissa = scaled.to_i128()?;
        Decimal::try_from_i128_with_scale(mantissa, PRICE_DECIMAL_SCALE).ok()
    }

    /// Approximate value for logs
    pub fn to_f64(&self) -> f64 {
        ln_ratio(&self.numerator, &self.denominator).exp()
    }
}

impl PartialEq for Price {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Price {}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Price {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.numerator * &other.denominator).cmp(&(&other.numerator * &self.denominator))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal() {
            Some(value) => write!(f, "{}", value.normalize()),
            None => write!(f, "{}/{}", self.numerator, self.denominator),
        }
    }
}
