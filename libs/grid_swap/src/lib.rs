//! # Grid Swap - Budgeted Trade Search on Geometric Price Grids
//!
//! ## Purpose
//!
//! Finds the best swap between two assets of a grid-pricing AMM position when every
//! trade must be proven on-chain within a fixed budget of multiplications. Each asset
//! prices on a geometric grid `anchor * g^exponent`; the validator recomputes both
//! powers by square-and-multiply, so only exponent pairs with a cheap binary
//! representation are eligible. Among those, the search returns the trade with the
//! lowest effective price `delta_selling / delta_buying`, ties going to the larger trade.
//!
//! ## Integration Points
//!
//! - **Input Sources**: Leg parameters parsed from pool state ([`LegParams`])
//! - **Output Destinations**: Transaction builders consuming [`PairSolution`] (exponents,
//!   amounts and the new spot prices written back as anchors)
//! - **Precision**: Arbitrary-precision integers end to end, no floating point in any
//!   decision that changes the result
//! - **Validation**: Every returned trade satisfies the integer value equation the
//!   validator checks
//!
//! ## Architecture Role
//!
//! ```text
//! LegParams ──▶ AssetLeg (grid cursor, capacity) ──┐
//!                                                  ├──▶ PairSearch ──▶ PairSolution
//! SearchConfig (budget, caps) ─────────────────────┘        │
//!                                      cost model ◀─────────┘
//! ```
//!
//! ## Performance Profile
//!
//! - **Pair Evaluation**: one or two big-integer multiplications per grid step, since
//!   cursors move incrementally instead of re-exponentiating
//! - **Search Size**: bounded by the exponent window `±2^budget` and `max_iterations`
//! - **Memory Usage**: one queue entry and one visited-set entry per exponent pair

pub mod config;
pub mod cost;
pub mod error;
pub mod leg;
pub mod math;
pub mod search;
pub mod solution;

pub use config::{SearchConfig, MAX_MULTIPLICATION_BUDGET};
pub use cost::{cheapest_cost_ahead, exponent_cost, pair_cost};
pub use error::GridSwapError;
pub use leg::{AssetLeg, Capacity, LegParams, MaxDelta, Side, MAX_GRID_EXPONENT};
pub use math::Price;
pub use search::{exponent_window, find_best_swap, PairSearch, SearchOutcome, SearchStats};
pub use solution::{DeltaBounds, PairSolution, ReducedRatio, ValueEquation};

/// Common types for grid swap calculations
pub use num_bigint::BigUint;
pub use rust_decimal::Decimal;
pub use rust_decimal_macros::dec;
