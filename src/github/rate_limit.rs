//! Rate limit accounting for GitHub GraphQL runs.
//!
//! Every GraphQL response carries a `rateLimit { remaining cost }` block.
//! The [`RateLimitGovernor`] folds those observations into a single budget
//! that only ever decreases within a run, and decides when the walker must
//! stop fetching new work so that in-flight items can still be written back.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;

/// Rate limit block returned alongside every GraphQL query.
///
/// # Example
///
/// ```
/// use github_upvotes::github::rate_limit::RateLimit;
///
/// let info = RateLimit::new(4999, 1);
/// assert!(!info.is_exhausted());
/// assert_eq!(info.remaining(), 4999);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct RateLimit {
    /// Points left in the current window.
    remaining: u64,
    /// Points charged for the query that returned this block.
    #[serde(default)]
    cost: u64,
}

impl RateLimit {
    /// Creates a new rate limit observation.
    #[must_use]
    pub const fn new(remaining: u64, cost: u64) -> Self {
        Self { remaining, cost }
    }

    /// Returns the remaining points in the current window.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Returns the cost of the query that produced this observation.
    #[must_use]
    pub const fn cost(&self) -> u64 {
        self.cost
    }

    /// Returns true if the rate limit has been exhausted.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// Default number of points held back for write-backs and resumption.
pub const DEFAULT_RESERVE_FLOOR: u64 = 10;

const UNKNOWN: u64 = u64::MAX;

/// Shared, monotonically decreasing view of the remaining API budget.
///
/// Observations from concurrent tasks can arrive out of order, so a later
/// response never raises the stored value. Mutations are charged one point
/// locally because their responses do not report the budget.
#[derive(Debug)]
pub struct RateLimitGovernor {
    remaining: AtomicU64,
    initial: AtomicU64,
    reserve_floor: u64,
}

impl RateLimitGovernor {
    /// Creates a governor with no observations yet.
    #[must_use]
    pub const fn new(reserve_floor: u64) -> Self {
        Self {
            remaining: AtomicU64::new(UNKNOWN),
            initial: AtomicU64::new(UNKNOWN),
            reserve_floor,
        }
    }

    /// Folds a response's rate limit block into the budget.
    pub fn observe(&self, rate_limit: RateLimit) {
        let reported = rate_limit.remaining();
        // Only the first observation seeds the starting budget.
        let _seeded = self.initial.compare_exchange(
            UNKNOWN,
            reported.saturating_add(rate_limit.cost()),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        self.remaining.fetch_min(reported, Ordering::AcqRel);
        tracing::debug!(
            remaining = reported,
            cost = rate_limit.cost(),
            "rate limit observed"
        );
    }

    /// Charges one point for a successful mutation.
    pub fn record_mutation(&self) {
        let _charged = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current != UNKNOWN).then(|| current.saturating_sub(1))
            });
    }

    /// Returns the tracked budget, or `None` before the first observation.
    #[must_use]
    pub fn remaining(&self) -> Option<u64> {
        let current = self.remaining.load(Ordering::Acquire);
        (current != UNKNOWN).then_some(current)
    }

    /// Returns the points spent since the first observation.
    #[must_use]
    pub fn spent(&self) -> u64 {
        let initial = self.initial.load(Ordering::Acquire);
        match (initial, self.remaining()) {
            (UNKNOWN, _) | (_, None) => 0,
            (start, Some(current)) => start.saturating_sub(current),
        }
    }

    /// Points that must stay available before admitting `in_flight` items.
    #[must_use]
    pub const fn reserve_for(&self, in_flight: u64) -> u64 {
        let scaled = in_flight.saturating_mul(2);
        if scaled > self.reserve_floor {
            scaled
        } else {
            self.reserve_floor
        }
    }

    /// Returns true when fetching `in_flight` more items would eat into the
    /// reserve. An unknown budget never halts.
    #[must_use]
    pub fn should_halt(&self, in_flight: u64) -> bool {
        self.remaining()
            .is_some_and(|remaining| remaining < self.reserve_for(in_flight))
    }
}

impl Default for RateLimitGovernor {
    fn default() -> Self {
        Self::new(DEFAULT_RESERVE_FLOOR)
    }
}
