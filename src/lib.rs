//! # primesum — Consecutive Prime Sums and Prime Lookup
//!
//! A prime-number query engine built around a sieved table:
//!
//! - [`table`]: immutable list of primes up to a limit, with O(1) membership.
//! - [`oracle`]: multi-scale primality (table → PrimesDB → trial division →
//!   deterministic Miller–Rabin), plus a `rug` path for arbitrary sizes.
//! - [`primesdb`]: the PrimesDB bit-packed decade codec.
//! - [`sequence`]: runs of consecutive primes summing to a target, memoized.
//! - [`scheduler`]: validated, sampled, segmented batch search over a range.
//! - [`nearest`]: the k primes closest to an integer.
//! - [`sums`], [`plate`], [`phone`]: prime-sum enumeration, license plate
//!   and phone-number encodings.
//! - [`engine`]: builds all of the above from one [`config::EngineConfig`].

pub mod config;
pub mod engine;
pub mod error;
pub mod nearest;
pub mod oracle;
pub mod phone;
pub mod plate;
pub mod primesdb;
pub mod progress;
pub mod scheduler;
pub mod sequence;
pub mod sieve;
pub mod sums;
pub mod table;

pub use config::EngineConfig;
pub use engine::PrimeEngine;
pub use error::{PrimeError, SearchError, ValidationError};
pub use nearest::{NearPrime, NearestPrimeLocator, NearestPrimes, SelfPolicy};
pub use oracle::{PrimeOracle, Strategy, Verdict};
pub use primesdb::{AddressLayout, PrimesDbBlock};
pub use scheduler::{RangeSearchScheduler, SchedulerConfig, SearchOutcome, SearchRequest};
pub use sequence::{Bound, PrimeRun, SequenceFinder, UnboundedPolicy};
pub use table::PrimeTable;

use rug::Integer;
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `LOG_FORMAT=json` emits JSON lines, anything else human-readable text on
/// stderr. `RUST_LOG` filters (default `info`). Calling it again is a no-op.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    let _ = if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init()
    };
}

/// Small primes for trial division pre-filter.
const SMALL_PRIMES: [u32; 64] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
    101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191, 193,
    197, 199, 211, 223, 227, 229, 233, 239, 241, 251, 257, 263, 269, 271, 277, 281, 283, 293, 307,
    311,
];

/// Quick check if n is divisible by any small prime.
/// Returns true if n is definitely composite (has a small factor).
/// Returns false if n might be prime (passed trial division).
pub fn has_small_factor(n: &Integer) -> bool {
    for &p in &SMALL_PRIMES {
        if n.is_divisible_u(p) {
            return n > &Integer::from(p);
        }
    }
    false
}

/// Two-round Miller-Rabin pre-screening: run 2 fast rounds first, full rounds only for survivors.
pub fn mr_screened_test(candidate: &Integer, mr_rounds: u32) -> rug::integer::IsPrime {
    use rug::integer::IsPrime;
    if mr_rounds > 2 && candidate.is_probably_prime(2) == IsPrime::No {
        return IsPrime::No;
    }
    candidate.is_probably_prime(mr_rounds)
}

/// Estimate decimal digit count from bit length, avoiding expensive to_string conversion.
pub fn estimate_digits(n: &Integer) -> u64 {
    let bits = n.significant_bits();
    if bits == 0 {
        return 1;
    }
    (bits as f64 * std::f64::consts::LOG10_2) as u64 + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use rug::integer::IsPrime;
    use rug::ops::Pow;

    fn exact_digits(n: &Integer) -> u64 {
        n.to_string_radix(10).len() as u64
    }

    #[test]
    fn has_small_factor_returns_false_for_small_primes() {
        for &p in &SMALL_PRIMES {
            assert!(!has_small_factor(&Integer::from(p)), "flagged prime {}", p);
        }
    }

    #[test]
    fn has_small_factor_returns_true_for_composites() {
        for &c in &[4u32, 6, 9, 15, 25, 49, 1000, 311 * 2, 307 * 311] {
            assert!(has_small_factor(&Integer::from(c)), "missed composite {}", c);
        }
    }

    /// 313 · 317 has no factor in the pre-filter list.
    #[test]
    fn has_small_factor_misses_large_factor_products() {
        assert!(!has_small_factor(&Integer::from(313u32 * 317)));
        assert!(!has_small_factor(&Integer::from(313u32)));
    }

    #[test]
    fn mr_screened_test_agrees_with_table() {
        let table = PrimeTable::build(2_000);
        for n in 2..=2_000u32 {
            let verdict = mr_screened_test(&Integer::from(n), 25);
            assert_eq!(
                verdict != IsPrime::No,
                table.contains(n as u64),
                "n = {}",
                n
            );
        }
    }

    #[test]
    fn mr_screened_test_two_rounds_still_rejects_composites() {
        for &c in &[9u32, 15, 21, 25, 1001] {
            assert_eq!(mr_screened_test(&Integer::from(c), 2), IsPrime::No, "accepted {}", c);
        }
    }

    #[test]
    fn estimate_digits_within_one_of_exact() {
        let values: Vec<Integer> = vec![
            Integer::from(1u32),
            Integer::from(9u32),
            Integer::from(10u32),
            Integer::from(999u32),
            Integer::from(u64::MAX),
            Integer::from(10u32).pow(50),
            Integer::from(10u32).pow(100) - 1u32,
            Integer::from(2u32).pow(1000),
        ];
        for v in &values {
            let est = estimate_digits(v);
            let exact = exact_digits(v);
            assert!((est as i64 - exact as i64).abs() <= 1, "{}: {} vs {}", v, est, exact);
        }
        assert_eq!(estimate_digits(&Integer::from(0u32)), 1);
    }

    #[test]
    fn init_logging_twice_is_harmless() {
        init_logging();
        init_logging();
    }
}
