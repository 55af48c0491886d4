//! # Sequence — Consecutive Prime Runs Summing to a Target
//!
//! For a target p, finds every run of consecutive table primes
//! `q_i + q_{i+1} + … + q_{i+L−1} = p` with `L` inside the requested length
//! bounds. The classic example is 41 = 11 + 13 + 17 = 2 + 3 + 5 + 7 + 11 + 13.
//!
//! ## Algorithm
//!
//! Prefix sums `S[k] = q_0 + … + q_{k−1}` of the whole table are computed
//! once, at construction. A window sum is then `S[i+L] − S[i]`, O(1).
//!
//! For a fixed length `L`, window sums are strictly increasing in the start
//! index `i` (every term is positive and the table is ascending), so at most
//! one window of each length can hit the target and it is found by binary
//! search. Lengths are tried in ascending order and the loop stops as soon
//! as the very first window `S[L]` exceeds the target, since longer windows
//! only grow. Only primes below the target take part.
//!
//! Cost per query: O(L_max · log P) after the one-off O(P) prefix pass.
//!
//! ## Unbounded Length
//!
//! An `Unbounded` maximum length is resolved by [`UnboundedPolicy`]:
//! `DoubleMinimum` searches `[min, 2·min]` (a heuristic ceiling that can miss
//! longer runs), `Exhaustive` searches every length that can fit.
//!
//! ## Caching
//!
//! Results are memoized per `(target, min_length, max_length)` in a
//! [`SequenceCache`]. Entries are never evicted: the table is immutable, so a
//! cached answer never goes stale. The map grows by one entry per distinct
//! key; callers that need bounded memory should build a fresh finder per
//! batch or wrap it with their own eviction.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::error::PrimeError;
use crate::table::PrimeTable;

/// An optional upper limit. On the wire `Unbounded` is the sentinel `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bound {
    Bounded(usize),
    Unbounded,
}

impl Bound {
    /// Decode the `-1 = unbounded` wire convention. Other negatives are `None`.
    pub fn from_sentinel(value: i64) -> Option<Bound> {
        match value {
            -1 => Some(Bound::Unbounded),
            v if v >= 0 => Some(Bound::Bounded(v as usize)),
            _ => None,
        }
    }

    pub fn as_sentinel(self) -> i64 {
        match self {
            Bound::Bounded(n) => n as i64,
            Bound::Unbounded => -1,
        }
    }

    /// True if `value` does not exceed the bound.
    #[inline]
    pub fn admits(self, value: usize) -> bool {
        match self {
            Bound::Bounded(n) => value <= n,
            Bound::Unbounded => true,
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Bounded(n) => write!(f, "{}", n),
            Bound::Unbounded => write!(f, "unbounded"),
        }
    }
}

impl Serialize for Bound {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_sentinel())
    }
}

impl<'de> Deserialize<'de> for Bound {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Bound::from_sentinel(raw).ok_or_else(|| {
            de::Error::invalid_value(de::Unexpected::Signed(raw), &"-1 or a non-negative integer")
        })
    }
}

/// How an `Unbounded` maximum length is turned into a concrete ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnboundedPolicy {
    /// Search lengths `min..=2·min`.
    #[default]
    DoubleMinimum,
    /// Search every length whose smallest window still fits under the target.
    Exhaustive,
}

/// A run of consecutive primes and its sum. Serialized as the bare
/// ascending list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimeRun {
    pub primes: Vec<u64>,
    pub sum: u64,
}

impl PrimeRun {
    pub fn new(primes: Vec<u64>) -> Self {
        let sum = primes.iter().sum();
        PrimeRun { primes, sum }
    }

    pub fn len(&self) -> usize {
        self.primes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primes.is_empty()
    }
}

impl Serialize for PrimeRun {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.primes.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PrimeRun {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<u64>::deserialize(deserializer).map(PrimeRun::new)
    }
}

/// Cache key: one entry per distinct query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SequenceKey {
    pub target: u64,
    pub min_length: usize,
    pub max_length: Bound,
}

/// Insert-only memo of finder results, safe to share across threads.
///
/// Two threads racing on the same key both compute; the first insert wins
/// and both get the stored value back.
#[derive(Debug, Default)]
pub struct SequenceCache {
    entries: RwLock<HashMap<SequenceKey, Arc<[PrimeRun]>>>,
}

impl SequenceCache {
    pub fn get(&self, key: &SequenceKey) -> Option<Arc<[PrimeRun]>> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    /// Store `runs` unless the key is already present; return the stored value.
    pub fn insert_if_absent(&self, key: SequenceKey, runs: Arc<[PrimeRun]>) -> Arc<[PrimeRun]> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        Arc::clone(entries.entry(key).or_insert(runs))
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Finds consecutive prime runs summing to a target, memoizing every answer.
#[derive(Debug)]
pub struct SequenceFinder {
    table: Arc<PrimeTable>,
    /// prefix[k] = sum of the first k table primes.
    prefix: Vec<u64>,
    cache: SequenceCache,
    policy: UnboundedPolicy,
}

impl SequenceFinder {
    pub fn new(table: Arc<PrimeTable>) -> Self {
        let mut prefix = Vec::with_capacity(table.len() + 1);
        prefix.push(0u64);
        let mut running = 0u64;
        for &p in table.primes() {
            running += p;
            prefix.push(running);
        }
        SequenceFinder {
            table,
            prefix,
            cache: SequenceCache::default(),
            policy: UnboundedPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: UnboundedPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn table(&self) -> &Arc<PrimeTable> {
        &self.table
    }

    pub fn policy(&self) -> UnboundedPolicy {
        self.policy
    }

    /// Number of memoized queries.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn cached(&self, key: &SequenceKey) -> Option<Arc<[PrimeRun]>> {
        self.cache.get(key)
    }

    /// All runs of `min_length..=max_length` consecutive primes summing to
    /// `target`, ordered by length, then by first element.
    ///
    /// Repeated calls with the same arguments return the same allocation.
    pub fn find(
        &self,
        target: u64,
        min_length: usize,
        max_length: Bound,
    ) -> Result<Arc<[PrimeRun]>, PrimeError> {
        if target > self.table.limit() {
            return Err(PrimeError::BeyondTable {
                n: target,
                limit: self.table.limit(),
            });
        }
        let key = SequenceKey {
            target,
            min_length,
            max_length,
        };
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }
        let runs = self.compute(target, min_length, max_length);
        Ok(self.cache.insert_if_absent(key, runs.into()))
    }

    /// Number of qualifying runs for `target` (through the cache).
    pub fn count(&self, target: u64, min_length: usize, max_length: Bound) -> Result<usize, PrimeError> {
        self.find(target, min_length, max_length).map(|runs| runs.len())
    }

    fn compute(&self, target: u64, min_length: usize, max_length: Bound) -> Vec<PrimeRun> {
        let smaller = self.table.lower_bound(target);
        let min_length = min_length.max(1);
        let max_length = match max_length {
            Bound::Bounded(n) => n,
            Bound::Unbounded => match self.policy {
                UnboundedPolicy::DoubleMinimum => min_length.saturating_mul(2),
                UnboundedPolicy::Exhaustive => smaller,
            },
        }
        .min(smaller);

        let primes = self.table.primes();
        let mut runs = Vec::new();
        for len in min_length..=max_length {
            if self.prefix[len] > target {
                break;
            }
            let starts = smaller - len + 1;
            let i = self.first_window_at_least(len, starts, target);
            if i < starts && self.window_sum(i, len) == target {
                runs.push(PrimeRun {
                    primes: primes[i..i + len].to_vec(),
                    sum: target,
                });
            }
        }
        runs
    }

    #[inline]
    fn window_sum(&self, start: usize, len: usize) -> u64 {
        self.prefix[start + len] - self.prefix[start]
    }

    /// Smallest start index in `0..starts` whose window of `len` primes sums
    /// to at least `target`, or `starts` if none does.
    fn first_window_at_least(&self, len: usize, starts: usize, target: u64) -> usize {
        let (mut lo, mut hi) = (0usize, starts);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.window_sum(mid, len) < target {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }
}
