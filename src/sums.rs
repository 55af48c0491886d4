//! # Sums — Enumerating Consecutive Runs With Prime Sums
//!
//! The forward direction of [`SequenceFinder`](crate::sequence::SequenceFinder):
//! instead of asking which runs sum to a given prime, walk every run of
//! consecutive primes and keep those whose sum is itself prime.
//!
//! - [`prime_sum_runs`] lists every such run with sum ≤ a limit, ordered by
//!   start index then length.
//! - [`SumIndex`] precomputes all window sums of lengths `2..=max_len` that
//!   land on a table prime, so questions like "the first prime expressible in
//!   exactly n ways" are answered by a single ordered scan.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::error::PrimeError;
use crate::oracle::PrimeOracle;
use crate::sequence::{Bound, PrimeRun};
use crate::table::PrimeTable;

/// Every run of consecutive table primes whose sum is prime and at most
/// `limit`, with length in `[min_len, max_len]`.
pub fn prime_sum_runs(
    oracle: &PrimeOracle,
    limit: u64,
    min_len: usize,
    max_len: Bound,
) -> Result<Vec<PrimeRun>, PrimeError> {
    let table = oracle.table();
    if limit > table.limit() {
        return Err(PrimeError::BeyondTable {
            n: limit,
            limit: table.limit(),
        });
    }
    let primes = table.range_slice(0, limit);
    let min_len = min_len.max(1);
    let mut runs = Vec::new();
    for start in 0..primes.len() {
        let mut sum = 0u64;
        for end in start..primes.len() {
            sum += primes[end];
            let len = end - start + 1;
            if sum > limit || !max_len.admits(len) {
                break;
            }
            if len >= min_len && oracle.is_prime(sum) {
                runs.push(PrimeRun {
                    primes: primes[start..=end].to_vec(),
                    sum,
                });
            }
        }
    }
    Ok(runs)
}

/// Window sums of length `2..=max_len` that are table primes, keyed by sum.
#[derive(Debug, Clone)]
pub struct SumIndex {
    max_len: usize,
    by_sum: BTreeMap<u64, Vec<PrimeRun>>,
}

impl SumIndex {
    pub fn build(table: &Arc<PrimeTable>, max_len: usize) -> Self {
        let started = Instant::now();
        let primes = table.primes();
        let ceiling = table.largest().unwrap_or(0);
        let mut by_sum: BTreeMap<u64, Vec<PrimeRun>> = BTreeMap::new();

        for len in 2..=max_len.min(primes.len()) {
            let mut sum: u64 = primes[..len].iter().sum();
            if sum > ceiling {
                break;
            }
            for start in 0..=primes.len() - len {
                if start > 0 {
                    sum = sum - primes[start - 1] + primes[start + len - 1];
                }
                if sum > ceiling {
                    break;
                }
                if table.contains(sum) {
                    by_sum.entry(sum).or_default().push(PrimeRun {
                        primes: primes[start..start + len].to_vec(),
                        sum,
                    });
                }
            }
        }
        info!(
            max_len,
            sums = by_sum.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sum index built"
        );
        SumIndex { max_len, by_sum }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Distinct prime sums indexed.
    pub fn len(&self) -> usize {
        self.by_sum.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_sum.is_empty()
    }

    /// Runs summing to `prime` with length in `[min_len, max_len]`, ordered
    /// by length then start.
    pub fn runs_for(&self, prime: u64, min_len: usize, max_len: usize) -> Vec<PrimeRun> {
        self.by_sum
            .get(&prime)
            .map(|runs| {
                runs.iter()
                    .filter(|r| (min_len..=max_len).contains(&r.len()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The smallest prime with exactly `n` qualifying runs. `max_len` is
    /// clamped to the length the index was built with.
    pub fn first_with_exactly(
        &self,
        n: usize,
        min_len: usize,
        max_len: usize,
    ) -> Option<(u64, Vec<PrimeRun>)> {
        let max_len = max_len.min(self.max_len);
        self.by_sum.keys().find_map(|&prime| {
            let runs = self.runs_for(prime, min_len, max_len);
            (runs.len() == n).then_some((prime, runs))
        })
    }
}
