//! Budget-constrained pair search
//!
//! Breadth-first walk over `(exponent_buying, exponent_selling)` starting at
//! the smallest exponents that admit each leg's dust floor. Raising either
//! exponent only ever grows capacity and worsens price, so the walk moves
//! upward and cuts a branch as soon as it cannot produce a better trade:
//!
//! - over-budget pairs forward the walk while a cheaper exponent can still
//!   lie ahead, and are otherwise abandoned
//! - a pair whose spot ratio is already worse than the best price found is
//!   dropped with everything above it
//! - a perfect trade ends its branch, since every successor prices higher
//! - a saturated leg is not raised further, since its capacity stops growing
//!
//! Each pair is evaluated with exact integer arithmetic; ties on price go to
//! the larger trade.

use std::collections::{HashSet, VecDeque};
use std::ops::RangeInclusive;

use tracing::{debug, trace, warn};

use crate::config::{SearchConfig, MAX_MULTIPLICATION_BUDGET};
use crate::cost::{cheapest_cost_ahead, pair_cost};
use crate::error::GridSwapError;
use crate::leg::{AssetLeg, Side};
use crate::solution::{PairSolution, ValueEquation};

/// Exponents whose cost can fit `budget`: `|e| <= 2^budget`
pub fn exponent_window(budget: u32) -> RangeInclusive<i64> {
    let reach = 1i64 << budget.min(MAX_MULTIPLICATION_BUDGET);
    -reach..=reach
}

/// Counters describing one search
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SearchStats {
    /// Pairs taken off the queue
    pub pairs_visited: usize,
    /// Pairs over the multiplication budget
    pub over_budget: usize,
    /// Over-budget pairs with no affordable exponent ahead
    pub budget_exhausted: usize,
    /// Pairs dropped because their spot ratio was already too expensive
    pub price_pruned: usize,
    /// Pairs whose coefficients exceeded `max_integer_bits`
    pub oversized: usize,
    /// Pairs that produced an exact trade
    pub perfect_found: usize,
    /// The iteration cap stopped the walk early
    pub truncated: bool,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best: Option<PairSolution>,
    pub stats: SearchStats,
}

/// Breadth-first queue of exponent pairs, each enqueued at most once
struct Frontier {
    queue: VecDeque<(i64, i64)>,
    seen: HashSet<(i64, i64)>,
    window: RangeInclusive<i64>,
}

impl Frontier {
    fn new(window: RangeInclusive<i64>) -> Self {
        Self {
            queue: VecDeque::new(),
            seen: HashSet::new(),
            window,
        }
    }

    fn push(&mut self, pair: (i64, i64)) {
        if self.window.contains(&pair.0)
            && self.window.contains(&pair.1)
            && self.seen.insert(pair)
        {
            self.queue.push_back(pair);
        }
    }

    fn pop(&mut self) -> Option<(i64, i64)> {
        self.queue.pop_front()
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }
}

/// Pair search optimizer
#[derive(Debug, Clone, Default)]
pub struct PairSearch {
    config: SearchConfig,
}

impl PairSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Best trade between the two legs within the budget, or `None` if none exists
    pub fn optimize(
        &self,
        buying: AssetLeg,
        selling: AssetLeg,
    ) -> Result<Option<PairSolution>, GridSwapError> {
        self.run(buying, selling).map(|outcome| outcome.best)
    }

    /// Like [`PairSearch::optimize`], also reporting search statistics.
    ///
    /// Fails with [`GridSwapError::InvalidConfig`] before touching the legs
    /// when the configuration does not validate.
    pub fn run(
        &self,
        mut buying: AssetLeg,
        mut selling: AssetLeg,
    ) -> Result<SearchOutcome, GridSwapError> {
        self.config
            .validate()
            .map_err(|err| GridSwapError::InvalidConfig {
                reason: err.to_string(),
            })?;
        expect_side(&buying, Side::Buying)?;
        expect_side(&selling, Side::Selling)?;

        let budget = self.config.multiplication_budget;
        let window = exponent_window(budget);
        let mut stats = SearchStats::default();

        let min_buying = buying.min_delta().clone();
        let min_selling = selling.min_delta().clone();
        let seeds = (
            buying.minimal_exponent_for(&min_buying, window.clone()),
            selling.minimal_exponent_for(&min_selling, window.clone()),
        );
        let (Some(seed_buying), Some(seed_selling)) = seeds else {
            debug!(budget, "dust floor unreachable inside the exponent window");
            return Ok(SearchOutcome { best: None, stats });
        };
        debug!(seed_buying, seed_selling, budget, "starting pair search");

        let mut frontier = Frontier::new(window);
        frontier.push((seed_buying, seed_selling));
        let mut best: Option<PairSolution> = None;

        while let Some((exponent_buying, exponent_selling)) = frontier.pop() {
            if stats.pairs_visited >= self.config.max_iterations {
                warn!(
                    max_iterations = self.config.max_iterations,
                    pending = frontier.pending() + 1,
                    "pair search stopped at its iteration cap"
                );
                stats.truncated = true;
                break;
            }
            stats.pairs_visited += 1;

            if pair_cost(exponent_buying, exponent_selling) > budget {
                stats.over_budget += 1;
                let ahead =
                    cheapest_cost_ahead(exponent_buying) + cheapest_cost_ahead(exponent_selling);
                if ahead <= budget {
                    frontier.push((exponent_buying + 1, exponent_selling));
                    frontier.push((exponent_buying, exponent_selling + 1));
                } else {
                    stats.budget_exhausted += 1;
                }
                continue;
            }

            buying.advance_to(exponent_buying);
            selling.advance_to(exponent_selling);
            let equation = ValueEquation::at(&buying, &selling);

            if let Some(current) = &best {
                let spot_ratio = equation.spot_ratio();
                if spot_ratio > current.effective_price() {
                    stats.price_pruned += 1;
                    trace!(
                        exponent_buying,
                        exponent_selling,
                        spot_ratio = spot_ratio.to_f64(),
                        "spot ratio above best price"
                    );
                    continue;
                }
            }

            let oversized = self
                .config
                .max_integer_bits
                .is_some_and(|limit| equation.bits() > limit);
            let (capacity_buying, capacity_selling) = if oversized {
                stats.oversized += 1;
                trace!(exponent_buying, exponent_selling, bits = equation.bits(), "coefficients too wide");
                (None, None)
            } else {
                (buying.capacity(), selling.capacity())
            };
            trace!(
                exponent_buying,
                exponent_selling,
                feasible_buying = capacity_buying.is_some(),
                feasible_selling = capacity_selling.is_some(),
                "visiting pair"
            );

            if let (Some(cap_buying), Some(cap_selling)) = (&capacity_buying, &capacity_selling) {
                if let Some(candidate) = PairSolution::best_at(
                    &buying,
                    &selling,
                    equation,
                    cap_buying,
                    cap_selling,
                    self.config.max_scan_steps,
                ) {
                    let perfect = candidate.is_perfect();
                    if best
                        .as_ref()
                        .map_or(true, |current| candidate.is_better_than(current))
                    {
                        debug!(
                            exponent_buying,
                            exponent_selling,
                            delta_buying = %candidate.delta_buying(),
                            delta_selling = %candidate.delta_selling(),
                            price = %candidate.effective_price(),
                            perfect,
                            "improved best trade"
                        );
                        best = Some(candidate);
                    }
                    if perfect {
                        stats.perfect_found += 1;
                        continue;
                    }
                }
            }

            if capacity_buying.as_ref().map_or(true, |c| !c.saturated) {
                frontier.push((exponent_buying + 1, exponent_selling));
            }
            if capacity_selling.as_ref().map_or(true, |c| !c.saturated) {
                frontier.push((exponent_buying, exponent_selling + 1));
            }
        }

        debug!(
            pairs_visited = stats.pairs_visited,
            over_budget = stats.over_budget,
            price_pruned = stats.price_pruned,
            found = best.is_some(),
            "pair search finished"
        );
        Ok(SearchOutcome { best, stats })
    }
}

fn expect_side(leg: &AssetLeg, expected: Side) -> Result<(), GridSwapError> {
    if leg.side() != expected {
        return Err(GridSwapError::SideMismatch {
            expected,
            actual: leg.side(),
        });
    }
    Ok(())
}

/// Best trade within `budget` multiplications, using default search limits.
///
/// Budgets above [`MAX_MULTIPLICATION_BUDGET`] are rejected as an invalid configuration.
pub fn find_best_swap(
    buying: AssetLeg,
    selling: AssetLeg,
    budget: u32,
) -> Result<Option<PairSolution>, GridSwapError> {
    PairSearch::new(SearchConfig::with_budget(budget)).optimize(buying, selling)
}
