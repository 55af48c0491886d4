//! # Oracle — Multi-Scale Primality Decisions
//!
//! Answers "is n prime?" for any integer by picking one explicit
//! [`Strategy`] per query, so each path's correctness bound can be tested on
//! its own:
//!
//! | Strategy | Applies to | Exactness |
//! |----------|-----------|-----------|
//! | `Trivial` | n < 2 | exact (false) |
//! | `Table` | n ≤ table limit | exact |
//! | `PrimesDb` | n ≤ block ceiling, block loaded | exact (as stored) |
//! | `TrialDivision` | n ≤ trial-division ceiling | exact |
//! | `MillerRabin` | everything else in u64 | exact, see below |
//!
//! A PrimesDB lookup that lands outside the buffer falls back to the
//! magnitude-based choice between trial division and Miller–Rabin.
//!
//! ## Miller–Rabin Witness Sets
//!
//! Write n − 1 = 2^s · d with d odd. For each witness a compute a^d mod n;
//! n passes the round if that is 1 or n − 1, or if squaring up to s − 1
//! times reaches n − 1.
//!
//! - `{2, 3, 5, 7, 11, 13, 17}` is proven for n < 341,550,071,728,321.
//! - `{2, …, 37}` (first twelve primes) is proven for n < 3.317·10^24,
//!   which covers every u64. It is used from 10^9 upward.
//!
//! Above 3.317·10^24 (only reachable through [`PrimeOracle::is_prime_big`])
//! no fixed witness set is proven; those results are reported as
//! [`Verdict::ProbablePrime`] after extra GMP rounds.
//!
//! ## References
//!
//! - G. Jaeschke, "On strong pseudoprimes to several bases", Math. Comp. 61
//!   (1993) 915–926.
//! - J. Sorenson, J. Webster, "Strong pseudoprimes to twelve prime bases",
//!   Math. Comp. 86 (2017) 985–1003.

use rug::integer::IsPrime;
use rug::Integer;
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

use crate::primesdb::{self, PrimesDbBlock};
use crate::sieve::{self, MontgomeryCtx, MONTGOMERY_MAX_MODULUS};
use crate::table::PrimeTable;
use crate::{estimate_digits, has_small_factor, mr_screened_test};

/// Witnesses used below [`WIDE_WITNESS_THRESHOLD`].
pub const MR_WITNESSES_SMALL: [u64; 7] = [2, 3, 5, 7, 11, 13, 17];

/// Witnesses used from [`WIDE_WITNESS_THRESHOLD`] upward and for big integers.
pub const MR_WITNESSES_WIDE: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// Magnitude from which the wide witness set is used.
pub const WIDE_WITNESS_THRESHOLD: u64 = 1_000_000_000;

/// The small witness set is deterministic below this value.
pub const SMALL_WITNESS_PROVEN_BOUND: u64 = 341_550_071_728_321;

/// The wide witness set is deterministic below this value.
pub const WIDE_WITNESS_PROVEN_BOUND: u128 = 3_317_044_064_679_887_385_961_981;

/// Default largest n decided by trial division (√n ≤ 10^5).
pub const DEFAULT_TRIAL_DIVISION_CEILING: u64 = 10_000_000_000;

/// Default extra GMP Miller–Rabin rounds for big integers past the proven bound.
pub const DEFAULT_MR_ROUNDS: u32 = 15;

/// Which primality path a query takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Trivial,
    Table,
    PrimesDb,
    TrialDivision,
    MillerRabin,
}

/// Outcome of a big-integer primality query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Composite,
    /// Deterministic: the value lies inside a proven bound.
    Prime,
    /// Passed every witness, but above any proven bound.
    ProbablePrime,
}

impl Verdict {
    pub fn is_prime(self) -> bool {
        self != Verdict::Composite
    }
}

/// Primality oracle over a shared prime table and an optional PrimesDB block.
#[derive(Debug, Clone)]
pub struct PrimeOracle {
    table: Arc<PrimeTable>,
    primesdb: Option<PrimesDbBlock>,
    trial_division_ceiling: u64,
    mr_rounds: u32,
}

impl PrimeOracle {
    pub fn new(table: Arc<PrimeTable>) -> Self {
        PrimeOracle {
            table,
            primesdb: None,
            trial_division_ceiling: DEFAULT_TRIAL_DIVISION_CEILING,
            mr_rounds: DEFAULT_MR_ROUNDS,
        }
    }

    /// Consult `block` for values above the table limit.
    pub fn with_primesdb(mut self, block: PrimesDbBlock) -> Self {
        self.primesdb = Some(block);
        self
    }

    pub fn with_trial_division_ceiling(mut self, ceiling: u64) -> Self {
        self.trial_division_ceiling = ceiling;
        self
    }

    pub fn with_mr_rounds(mut self, rounds: u32) -> Self {
        self.mr_rounds = rounds;
        self
    }

    pub fn table(&self) -> &Arc<PrimeTable> {
        &self.table
    }

    pub fn primesdb(&self) -> Option<&PrimesDbBlock> {
        self.primesdb.as_ref()
    }

    pub fn trial_division_ceiling(&self) -> u64 {
        self.trial_division_ceiling
    }

    /// The strategy [`is_prime`](Self::is_prime) will use for `n`.
    pub fn select_strategy(&self, n: u64) -> Strategy {
        if n < 2 {
            Strategy::Trivial
        } else if n <= self.table.limit() {
            Strategy::Table
        } else if self.primesdb.as_ref().is_some_and(|b| b.covers(n)) {
            Strategy::PrimesDb
        } else {
            self.magnitude_strategy(n)
        }
    }

    /// Trial division or Miller–Rabin, chosen by size alone.
    fn magnitude_strategy(&self, n: u64) -> Strategy {
        if n <= self.trial_division_ceiling {
            Strategy::TrialDivision
        } else {
            Strategy::MillerRabin
        }
    }

    pub fn is_prime(&self, n: u64) -> bool {
        match self.select_strategy(n) {
            Strategy::Trivial => false,
            Strategy::Table => self.table.contains(n),
            Strategy::PrimesDb => self.primesdb_lookup(n),
            Strategy::TrialDivision => self.trial_division(n),
            Strategy::MillerRabin => miller_rabin(n),
        }
    }

    fn primesdb_lookup(&self, n: u64) -> bool {
        // Multiples of 2, 3, 5 are never stored.
        if n % 2 == 0 || n % 3 == 0 || n % 5 == 0 {
            return matches!(n, 2 | 3 | 5);
        }
        if let Some(verdict) = self.primesdb.as_ref().and_then(|b| primesdb::decode(b, n)) {
            return verdict;
        }
        let fallback = self.magnitude_strategy(n);
        debug!(n, ?fallback, "PrimesDB lookup out of range, falling back");
        match fallback {
            Strategy::TrialDivision => self.trial_division(n),
            _ => miller_rabin(n),
        }
    }

    /// Exact trial division: table primes first, then the 6k ± 1 wheel for
    /// divisors beyond the table.
    pub fn trial_division(&self, n: u64) -> bool {
        if n < 2 {
            return false;
        }
        let root = sieve::isqrt(n);
        for &p in self.table.primes() {
            if p > root {
                return true;
            }
            if n % p == 0 {
                return n == p;
            }
        }
        let from = self.table.largest().map_or(5, |p| p + 1).max(5);
        if n < 4 {
            return true;
        }
        if n % 2 == 0 || n % 3 == 0 {
            return false;
        }
        !has_wheel_divisor(n, from, root)
    }

    /// Primality of an arbitrary-precision integer.
    ///
    /// Values that fit in u64 go through [`is_prime`](Self::is_prime).
    /// Larger values get small-prime trial division and the wide witness
    /// set; past [`WIDE_WITNESS_PROVEN_BOUND`] they additionally need to
    /// survive `mr_rounds` GMP rounds and are reported as probable.
    pub fn is_prime_big(&self, n: &Integer) -> Verdict {
        if n.cmp0() == Ordering::Less {
            return Verdict::Composite;
        }
        if let Some(small) = n.to_u64() {
            return if self.is_prime(small) {
                Verdict::Prime
            } else {
                Verdict::Composite
            };
        }
        if has_small_factor(n) || !miller_rabin_big(n, &MR_WITNESSES_WIDE) {
            return Verdict::Composite;
        }
        if *n < WIDE_WITNESS_PROVEN_BOUND {
            return Verdict::Prime;
        }
        debug!(
            digits = estimate_digits(n),
            rounds = self.mr_rounds,
            "above proven witness bound, running extra rounds"
        );
        match mr_screened_test(n, self.mr_rounds) {
            IsPrime::No => Verdict::Composite,
            _ => Verdict::ProbablePrime,
        }
    }
}

/// True if some 6k ± 1 value in `[from − 6, root]` divides `n`.
fn has_wheel_divisor(n: u64, from: u64, root: u64) -> bool {
    let mut i = (from / 6).max(1) * 6 - 1;
    while i <= root {
        if n % i == 0 || n % (i + 2) == 0 {
            return true;
        }
        i += 6;
    }
    false
}

/// Exact trial division by 2, 3 and the 6k ± 1 wheel up to √n.
/// Needs no table; used as an independent reference.
pub fn trial_division(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }
    !has_wheel_divisor(n, 5, sieve::isqrt(n))
}

/// Deterministic Miller–Rabin for any u64.
pub fn miller_rabin(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    for &p in &MR_WITNESSES_WIDE {
        if n == p {
            return true;
        }
        if n % p == 0 {
            return false;
        }
    }
    let witnesses: &[u64] = if n >= WIDE_WITNESS_THRESHOLD {
        &MR_WITNESSES_WIDE
    } else {
        &MR_WITNESSES_SMALL
    };
    let s = (n - 1).trailing_zeros();
    let d = (n - 1) >> s;

    if n < MONTGOMERY_MAX_MODULUS {
        let ctx = MontgomeryCtx::new(n);
        let (one, minus_one) = (ctx.one(), ctx.minus_one());
        'witness: for &a in witnesses {
            let mut x = ctx.pow_mod(ctx.to_mont(a), d);
            if x == one || x == minus_one {
                continue;
            }
            for _ in 1..s {
                x = ctx.sqr(x);
                if x == minus_one {
                    continue 'witness;
                }
            }
            return false;
        }
    } else {
        'witness: for &a in witnesses {
            let mut x = sieve::pow_mod(a, d, n);
            if x == 1 || x == n - 1 {
                continue;
            }
            for _ in 1..s {
                x = sieve::mul_mod(x, x, n);
                if x == n - 1 {
                    continue 'witness;
                }
            }
            return false;
        }
    }
    true
}

/// Miller–Rabin over GMP integers with a fixed witness list.
/// `n` must be odd and larger than every witness.
fn miller_rabin_big(n: &Integer, witnesses: &[u64]) -> bool {
    let n_minus_one = Integer::from(n - 1u32);
    let Some(s) = n_minus_one.find_one(0) else {
        return false;
    };
    let d = Integer::from(&n_minus_one >> s);

    'witness: for &a in witnesses {
        let Ok(mut x) = Integer::from(a).pow_mod(&d, n) else {
            return false;
        };
        if x == 1 || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x.square_mut();
            x %= n;
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    //! Tests for strategy selection and each primality path.
    //!
    //! Every path is checked against an independent reference: the sieve
    //! for table/PrimesDB, wheel trial division for Miller–Rabin, and
    //! known strong pseudoprimes for the witness-set boundaries.

    use super::*;
    use crate::primesdb::{encode, AddressLayout};
    use rug::ops::Pow;

    fn oracle(limit: u64) -> PrimeOracle {
        PrimeOracle::new(Arc::new(PrimeTable::build(limit)))
    }

    // ── Strategy Selection ─────────────────────────────────────────

    #[test]
    fn strategy_by_magnitude() {
        let o = oracle(1_000).with_trial_division_ceiling(1_000_000);
        assert_eq!(o.select_strategy(0), Strategy::Trivial);
        assert_eq!(o.select_strategy(1), Strategy::Trivial);
        assert_eq!(o.select_strategy(2), Strategy::Table);
        assert_eq!(o.select_strategy(1_000), Strategy::Table);
        assert_eq!(o.select_strategy(1_001), Strategy::TrialDivision);
        assert_eq!(o.select_strategy(1_000_000), Strategy::TrialDivision);
        assert_eq!(o.select_strategy(1_000_001), Strategy::MillerRabin);
    }

    #[test]
    fn strategy_prefers_primesdb_inside_coverage() {
        let table = Arc::new(PrimeTable::build(1_000));
        let reference = PrimeTable::build(50_000);
        let block = encode(50_000, AddressLayout::DecadePair, |n| reference.contains(n));
        let ceiling = block.ceiling();
        let o = PrimeOracle::new(table).with_primesdb(block);
        assert_eq!(o.select_strategy(999), Strategy::Table);
        assert_eq!(o.select_strategy(1_001), Strategy::PrimesDb);
        assert_eq!(o.select_strategy(ceiling), Strategy::PrimesDb);
        assert_eq!(o.select_strategy(ceiling + 1), Strategy::TrialDivision);
    }

    // ── Agreement with the Sieve ───────────────────────────────────

    /// Table path is exact over the whole table range.
    #[test]
    fn oracle_agrees_with_table() {
        let o = oracle(20_000);
        for n in 0..=20_000u64 {
            assert_eq!(o.is_prime(n), o.table().contains(n), "n={}", n);
        }
    }

    #[test]
    fn primesdb_path_agrees_with_sieve() {
        let reference = PrimeTable::build(60_000);
        let block = encode(50_000, AddressLayout::Offset, |n| reference.contains(n));
        let o = PrimeOracle::new(Arc::new(PrimeTable::build(500))).with_primesdb(block);
        for n in 501..=60_000u64 {
            assert_eq!(o.is_prime(n), reference.contains(n), "n={}", n);
        }
    }

    /// With a two-entry table the small primes fall through to the block.
    #[test]
    fn primesdb_path_below_table_of_two() {
        let reference = PrimeTable::build(2_000);
        for layout in [AddressLayout::DecadePair, AddressLayout::Offset] {
            let block = encode(1_000, layout, |n| reference.contains(n));
            let o = PrimeOracle::new(Arc::new(PrimeTable::build(2))).with_primesdb(block);
            assert_eq!(o.select_strategy(3), Strategy::PrimesDb);
            assert_eq!(o.select_strategy(5), Strategy::PrimesDb);
            for n in 0..=1_000u64 {
                assert_eq!(o.is_prime(n), reference.contains(n), "n={} {:?}", n, layout);
            }
        }
    }

    /// Trial division with a tiny table must keep going on the wheel once
    /// the table runs out of divisors.
    #[test]
    fn trial_division_past_table() {
        let o = oracle(30);
        let reference = PrimeTable::build(200_000);
        for n in 0..=200_000u64 {
            assert_eq!(o.trial_division(n), reference.contains(n), "n={}", n);
        }
    }

    #[test]
    fn free_trial_division_matches_sieve() {
        let reference = PrimeTable::build(100_000);
        for n in 0..=100_000u64 {
            assert_eq!(trial_division(n), reference.contains(n), "n={}", n);
        }
    }

    // ── Miller–Rabin ───────────────────────────────────────────────

    #[test]
    fn miller_rabin_matches_trial_division() {
        for n in 0..50_000u64 {
            assert_eq!(miller_rabin(n), trial_division(n), "n={}", n);
        }
        for n in 1_000_000_000u64..1_000_002_000 {
            assert_eq!(miller_rabin(n), trial_division(n), "n={}", n);
        }
    }

    /// Strong pseudoprimes that defeat shorter witness lists:
    /// 2047 (base 2), 3215031751 (bases 2..7), 341550071728321 (bases 2..19),
    /// 3825123056546413051 (bases 2..23). Carmichael 561 as well.
    #[test]
    fn miller_rabin_rejects_strong_pseudoprimes() {
        for n in [
            561u64,
            2_047,
            3_215_031_751,
            341_550_071_728_321,
            3_825_123_056_546_413_051,
        ] {
            assert!(!miller_rabin(n), "{} is composite", n);
        }
    }

    /// Known primes on both sides of the Montgomery limit (2^63).
    #[test]
    fn miller_rabin_large_primes() {
        for p in [
            1_000_000_007u64,
            999_999_999_989,
            2_305_843_009_213_693_951,
            9_223_372_036_854_775_783,
            18_446_744_073_709_551_557,
        ] {
            assert!(miller_rabin(p), "{} is prime", p);
        }
    }

    /// 4294967291² lies above 2^63 and has no factor below 2^32.
    #[test]
    fn miller_rabin_large_square() {
        let q = 4_294_967_291u64;
        assert!(miller_rabin(q));
        assert!(!miller_rabin(q * q));
        assert!(!miller_rabin(u64::MAX));
    }

    // ── Big Integers ───────────────────────────────────────────────

    #[test]
    fn big_values_inside_u64_are_exact() {
        let o = oracle(1_000);
        assert_eq!(o.is_prime_big(&Integer::from(97)), Verdict::Prime);
        assert_eq!(o.is_prime_big(&Integer::from(1_000_000_007u64)), Verdict::Prime);
        assert_eq!(o.is_prime_big(&Integer::from(100)), Verdict::Composite);
        assert_eq!(o.is_prime_big(&Integer::from(-7)), Verdict::Composite);
    }

    /// 2^64 + 13 is the smallest prime above 2^64; it sits below the
    /// proven bound, so the verdict is deterministic.
    #[test]
    fn big_prime_below_proven_bound() {
        let o = oracle(1_000);
        let n = Integer::from(2u32).pow(64) + 13u32;
        assert_eq!(o.is_prime_big(&n), Verdict::Prime);
        let composite = Integer::from(2u32).pow(64) + 1u32; // 274177 · 67280421310721
        assert_eq!(o.is_prime_big(&composite), Verdict::Composite);
    }

    /// Mersenne primes 2^89 − 1 and 2^127 − 1 are far above 3.3·10^24.
    #[test]
    fn big_prime_above_proven_bound_is_probable() {
        let o = oracle(1_000);
        for exp in [89u32, 127] {
            let m = Integer::from(2u32).pow(exp) - 1u32;
            assert_eq!(o.is_prime_big(&m), Verdict::ProbablePrime, "M{}", exp);
            assert!(o.is_prime_big(&m).is_prime());
        }
        let product = Integer::from(2_305_843_009_213_693_951u64) * 2_147_483_647u32;
        assert_eq!(o.is_prime_big(&product), Verdict::Composite);
    }
}
