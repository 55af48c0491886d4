//! # PrimeTable — Immutable Sieved Prime List
//!
//! The ground-truth table every other component consults: all primes up to a
//! fixed limit, in ascending order, plus a hash set of the same values for
//! O(1) membership. Built once by [`sieve::generate_primes`] and shared by
//! `Arc` afterwards; nothing mutates it.
//!
//! Range-bounded operations never scan linearly: [`PrimeTable::range_slice`]
//! locates both ends with `partition_point` and returns a borrowed sub-slice.

use std::collections::HashSet;
use std::time::Instant;
use tracing::info;

use crate::sieve;

/// Default table limit used by the engine.
pub const DEFAULT_TABLE_LIMIT: u64 = 1_000_000;

#[derive(Debug, Clone)]
pub struct PrimeTable {
    limit: u64,
    primes: Vec<u64>,
    membership: HashSet<u64>,
}

impl PrimeTable {
    /// Sieve `[0, limit]` and index the result.
    pub fn build(limit: u64) -> Self {
        let started = Instant::now();
        let primes = sieve::generate_primes(limit);
        let membership: HashSet<u64> = primes.iter().copied().collect();
        info!(
            limit,
            count = primes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "prime table built"
        );
        PrimeTable {
            limit,
            primes,
            membership,
        }
    }

    /// Upper bound of the sieved interval. Membership is exact up to here.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.primes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primes.is_empty()
    }

    /// All primes in ascending order.
    pub fn primes(&self) -> &[u64] {
        &self.primes
    }

    pub fn largest(&self) -> Option<u64> {
        self.primes.last().copied()
    }

    /// O(1) membership test. Only meaningful for `n <= limit()`; callers
    /// needing larger values go through [`PrimeOracle`](crate::oracle::PrimeOracle).
    #[inline]
    pub fn contains(&self, n: u64) -> bool {
        self.membership.contains(&n)
    }

    /// Index of the first prime `>= n` (== `len()` if none).
    #[inline]
    pub fn lower_bound(&self, n: u64) -> usize {
        self.primes.partition_point(|&p| p < n)
    }

    /// Index of the first prime `> n` (== `len()` if none).
    #[inline]
    pub fn upper_bound(&self, n: u64) -> usize {
        self.primes.partition_point(|&p| p <= n)
    }

    /// Primes within `[lo, hi]`, inclusive on both ends.
    pub fn range_slice(&self, lo: u64, hi: u64) -> &[u64] {
        if lo > hi {
            return &[];
        }
        let start = self.lower_bound(lo);
        let end = self.upper_bound(hi);
        &self.primes[start..end.max(start)]
    }

    /// Primes strictly below `n`.
    pub fn primes_below(&self, n: u64) -> &[u64] {
        &self.primes[..self.lower_bound(n)]
    }
}
