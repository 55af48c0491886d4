//! # Phone — Prime Phone Numbers
//!
//! Ten-digit phone numbers read as integers. Two operations:
//!
//! - [`prime_phone_numbers`]: every prime of the form `prefix · 10^6 + i`
//!   for a four-digit prefix, enumerated in parallel with Rayon.
//! - [`nearest_phone_primes`]: the primes closest to a (possibly formatted)
//!   number, excluding the number itself.

use rayon::prelude::*;
use std::time::Instant;
use tracing::info;

use crate::error::PrimeError;
use crate::nearest::{NearestPrimeLocator, NearestPrimes, SelfPolicy};
use crate::oracle::PrimeOracle;

pub const PREFIX_DIGITS: usize = 4;
const SUFFIX_SPAN: u64 = 1_000_000;

/// Strip everything but ASCII digits.
pub fn clean_phone_number(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Zero-padded ten-digit rendering.
pub fn format_phone(value: u64) -> String {
    format!("{:010}", value)
}

/// All primes `prefix · 10^6 + i` with `i < 10^6`, ascending.
pub fn prime_phone_numbers(oracle: &PrimeOracle, prefix: &str) -> Result<Vec<u64>, PrimeError> {
    if prefix.len() != PREFIX_DIGITS || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PrimeError::InvalidPrefix(prefix.to_string()));
    }
    let base = prefix
        .parse::<u64>()
        .map_err(|_| PrimeError::InvalidPrefix(prefix.to_string()))?
        * SUFFIX_SPAN;

    let started = Instant::now();
    let primes: Vec<u64> = (0..SUFFIX_SPAN)
        .into_par_iter()
        .map(|i| base + i)
        .filter(|&n| oracle.is_prime(n))
        .collect();
    info!(
        prefix,
        count = primes.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "prime phone numbers enumerated"
    );
    Ok(primes)
}

/// The `k` primes closest to the digits of `raw`, never including the
/// number itself.
pub fn nearest_phone_primes(
    locator: &NearestPrimeLocator,
    raw: &str,
    k: usize,
) -> Result<(u64, NearestPrimes), PrimeError> {
    let digits = clean_phone_number(raw);
    if digits.is_empty() {
        return Err(PrimeError::InvalidPhone(raw.to_string()));
    }
    let number: u64 = digits
        .parse()
        .map_err(|_| PrimeError::InvalidPhone(raw.to_string()))?;
    let strict = NearestPrimeLocator::new(locator.oracle().clone())
        .with_search_window(locator.search_window())
        .with_self_policy(SelfPolicy::Exclude);
    Ok((number, strict.nearest(number, k)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::PrimeTable;
    use std::sync::Arc;

    fn oracle(limit: u64) -> Arc<PrimeOracle> {
        Arc::new(PrimeOracle::new(Arc::new(PrimeTable::build(limit))))
    }

    #[test]
    fn clean_keeps_digits_only() {
        assert_eq!(clean_phone_number("(091) 234-5678"), "0912345678");
        assert_eq!(clean_phone_number("+886 912 345 678"), "886912345678");
        assert_eq!(clean_phone_number("no digits"), "");
    }

    #[test]
    fn format_pads_to_ten_digits() {
        assert_eq!(format_phone(912_345_678), "0912345678");
        assert_eq!(format_phone(1_234_567_890), "1234567890");
    }

    #[test]
    fn prefix_must_be_four_digits() {
        let o = oracle(100);
        for bad in ["091", "09123", "09a1", "", "０９１２"] {
            assert_eq!(
                prime_phone_numbers(&o, bad),
                Err(PrimeError::InvalidPrefix(bad.to_string()))
            );
        }
    }

    /// Prefix 0000 covers `[0, 10^6)`, exactly the table's primes.
    #[test]
    fn zero_prefix_matches_table() {
        let o = oracle(1_000_000);
        let phones = prime_phone_numbers(&o, "0000").unwrap();
        assert_eq!(phones.as_slice(), o.table().primes_below(1_000_000));
        assert_eq!(phones.len(), 78_498);
    }

    /// Prefix 0001 is `[10^6, 2·10^6)`, just past a 10^6 table.
    #[test]
    fn prefix_past_table_uses_oracle() {
        let o = oracle(1_000_000);
        let phones = prime_phone_numbers(&o, "0001").unwrap();
        let reference = PrimeTable::build(2_000_000);
        assert_eq!(phones.as_slice(), reference.range_slice(1_000_000, 1_999_999));
        assert!(phones.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn nearest_phone_excludes_itself() {
        let locator = NearestPrimeLocator::new(oracle(1_000));
        let (n, nearest) = nearest_phone_primes(&locator, "00-13", 2).unwrap();
        assert_eq!(n, 13);
        assert_eq!(nearest.primes(), vec![11, 17]);
        assert!(matches!(
            nearest_phone_primes(&locator, "call me", 2),
            Err(PrimeError::InvalidPhone(_))
        ));
    }
}
