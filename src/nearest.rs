//! # Nearest — k Closest Primes to an Integer
//!
//! Collects up to `k` primes on each side of `n`, merges them by distance
//! and keeps the `k` closest. Ties go to the smaller prime, so
//! `nearest(10, 3)` is `[11, 7, 13]`.
//!
//! Inside the table both sides are contiguous slices found by binary search.
//! Past the table the locator probes the [`PrimeOracle`] one integer at a
//! time, at most `search_window` integers away from `n` in either direction.
//! When the window cuts a side short and a closer prime could still lie past
//! it, or fewer than `k` primes exist, the answer is flagged incomplete
//! rather than padded.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::oracle::PrimeOracle;

/// Farthest distance from `n` probed beyond the table.
pub const DEFAULT_SEARCH_WINDOW: u64 = 10_000_000_000;

/// Whether `n` itself counts when it is prime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfPolicy {
    #[default]
    Include,
    /// Only strictly larger or strictly smaller primes.
    Exclude,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NearPrime {
    pub prime: u64,
    pub distance: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NearestPrimes {
    pub entries: Vec<NearPrime>,
    /// False when fewer than the requested count could be found.
    pub complete: bool,
}

impl NearestPrimes {
    pub fn primes(&self) -> Vec<u64> {
        self.entries.iter().map(|e| e.prime).collect()
    }
}

pub struct NearestPrimeLocator {
    oracle: Arc<PrimeOracle>,
    search_window: u64,
    self_policy: SelfPolicy,
}

impl NearestPrimeLocator {
    pub fn new(oracle: Arc<PrimeOracle>) -> Self {
        NearestPrimeLocator {
            oracle,
            search_window: DEFAULT_SEARCH_WINDOW,
            self_policy: SelfPolicy::default(),
        }
    }

    pub fn with_search_window(mut self, window: u64) -> Self {
        self.search_window = window;
        self
    }

    pub fn with_self_policy(mut self, policy: SelfPolicy) -> Self {
        self.self_policy = policy;
        self
    }

    pub fn oracle(&self) -> &Arc<PrimeOracle> {
        &self.oracle
    }

    pub fn search_window(&self) -> u64 {
        self.search_window
    }

    pub fn nearest(&self, n: u64, k: usize) -> NearestPrimes {
        let inclusive = self.self_policy == SelfPolicy::Include;
        let above = self.above(n, k, inclusive);
        let below = self.below(n, k, inclusive);

        let mut candidates = above.primes;
        candidates.extend(below.primes);
        candidates.sort_unstable();
        candidates.dedup();

        let mut entries: Vec<NearPrime> = candidates
            .into_iter()
            .map(|prime| NearPrime {
                prime,
                distance: prime.abs_diff(n),
            })
            .collect();
        entries.sort_by_key(|e| (e.distance, e.prime));
        entries.truncate(k);

        // An unexplored prime above at distance d loses the tie to a found
        // prime below at d; an unexplored prime below at d wins it.
        let settled = entries.last().map_or(true, |last| {
            above.unexplored.map_or(true, |d| last.distance <= d)
                && below.unexplored.map_or(true, |d| last.distance < d)
        });
        let complete = entries.len() == k && settled;
        if !complete {
            debug!(n, k, found = entries.len(), "nearest primes incomplete");
        }
        NearestPrimes { entries, complete }
    }

    /// Up to `k` primes ascending from `n` (or `n + 1`).
    fn above(&self, n: u64, k: usize, inclusive: bool) -> Side {
        let Some(first) = (if inclusive { Some(n) } else { n.checked_add(1) }) else {
            return Side::default();
        };
        let table = self.oracle.table();
        let mut primes: Vec<u64> = table.primes()[table.lower_bound(first)..]
            .iter()
            .copied()
            .take(k)
            .collect();

        let reach = n.saturating_add(self.search_window);
        let mut candidate = first.max(table.limit().saturating_add(1));
        while primes.len() < k {
            if candidate > reach {
                return Side {
                    primes,
                    unexplored: Some(candidate - n),
                };
            }
            if self.oracle.is_prime(candidate) {
                primes.push(candidate);
            }
            match candidate.checked_add(1) {
                Some(next) => candidate = next,
                None => break,
            }
        }
        Side {
            primes,
            unexplored: None,
        }
    }

    /// Up to `k` primes descending from `n` (or `n − 1`).
    fn below(&self, n: u64, k: usize, inclusive: bool) -> Side {
        let Some(first) = (if inclusive { Some(n) } else { n.checked_sub(1) }) else {
            return Side::default();
        };
        let table = self.oracle.table();
        let mut primes = Vec::with_capacity(k);

        let reach = n.saturating_sub(self.search_window);
        let mut candidate = first;
        while primes.len() < k && candidate > table.limit() {
            if candidate < reach {
                return Side {
                    primes,
                    unexplored: Some(n - candidate),
                };
            }
            if self.oracle.is_prime(candidate) {
                primes.push(candidate);
            }
            candidate -= 1;
        }
        let remaining = k - primes.len();
        primes.extend(
            table.primes()[..table.upper_bound(candidate)]
                .iter()
                .rev()
                .copied()
                .take(remaining),
        );
        Side {
            primes,
            unexplored: None,
        }
    }
}

/// Primes found on one side of `n`. `unexplored` is the distance of the
/// closest integer the window kept the probe from testing.
#[derive(Default)]
struct Side {
    primes: Vec<u64>,
    unexplored: Option<u64>,
}
