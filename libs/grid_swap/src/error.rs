//! Error types for leg construction and optimizer misuse
//!
//! Infeasible trades are not errors: the optimizer reports them as `Ok(None)`.
//! Everything here means the caller handed over parameters that break a leg
//! invariant or search limits the search cannot honour, and the trade must
//! not be attempted.

use num_bigint::BigUint;
use thiserror::Error;

use crate::leg::Side;

/// Invariant violations detected before a search starts
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridSwapError {
    /// A parameter that must be strictly positive is zero
    #[error("{side} leg: {field} must be strictly positive")]
    NonPositiveParameter { side: Side, field: &'static str },

    /// Virtual plus deposited liquidity is zero
    #[error("{side} leg: liquidity (virtual + balance) must be strictly positive")]
    EmptyLiquidity { side: Side },

    /// Dust floor above the configured trade ceiling
    #[error("{side} leg: min_delta {min_delta} exceeds max_delta {max_delta}")]
    MinDeltaExceedsMax {
        side: Side,
        min_delta: BigUint,
        max_delta: BigUint,
    },

    /// The pool can never release an unbounded amount
    #[error("buying leg requires a bounded max_delta")]
    UnboundedBuyingLeg,

    /// A leg was passed in the wrong position
    #[error("expected a {expected} leg, got a {actual} leg")]
    SideMismatch { expected: Side, actual: Side },

    /// Search limits rejected by `SearchConfig::validate`
    #[error("invalid search configuration: {reason}")]
    InvalidConfig { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_side() {
        let err = GridSwapError::NonPositiveParameter {
            side: Side::Selling,
            field: "weight",
        };
        assert_eq!(err.to_string(), "selling leg: weight must be strictly positive");

        let err = GridSwapError::MinDeltaExceedsMax {
            side: Side::Buying,
            min_delta: BigUint::from(10u32),
            max_delta: BigUint::from(5u32),
        };
        assert_eq!(
            err.to_string(),
            "buying leg: min_delta 10 exceeds max_delta 5"
        );

        let err = GridSwapError::InvalidConfig {
            reason: "max_iterations must be positive".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid search configuration: max_iterations must be positive"
        );
    }
}
