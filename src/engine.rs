//! # Engine — One-Stop Façade
//!
//! Builds every component once from an [`EngineConfig`] and shares them by
//! `Arc`: the table feeds the oracle and the finder, the finder feeds the
//! scheduler, the oracle feeds the locator. A wrapping HTTP or CLI layer
//! holds one `PrimeEngine` for its whole lifetime.

use anyhow::Result;
use rug::Integer;
use std::sync::Arc;
use tracing::info;

use crate::config::EngineConfig;
use crate::error::{PrimeError, SearchError};
use crate::nearest::{NearestPrimeLocator, NearestPrimes};
use crate::oracle::{PrimeOracle, Verdict};
use crate::phone;
use crate::plate::{self, PlateReport};
use crate::primesdb::PrimesDbBlock;
use crate::progress::ProgressSnapshot;
use crate::scheduler::{CostEstimate, RangeSearchScheduler, SearchOutcome, SearchRequest};
use crate::sequence::{Bound, PrimeRun, SequenceFinder};
use crate::sums::{self, SumIndex};
use crate::table::PrimeTable;

pub struct PrimeEngine {
    config: EngineConfig,
    table: Arc<PrimeTable>,
    oracle: Arc<PrimeOracle>,
    finder: Arc<SequenceFinder>,
    scheduler: RangeSearchScheduler,
    locator: NearestPrimeLocator,
}

impl PrimeEngine {
    /// Validate `config`, load its PrimesDB block if any, sieve the table.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let primesdb = config.load_primesdb()?;
        let table = Arc::new(PrimeTable::build(config.table.limit));
        Ok(Self::from_parts(config, table, primesdb))
    }

    /// Assemble an engine around an already-built table.
    pub fn from_parts(
        config: EngineConfig,
        table: Arc<PrimeTable>,
        primesdb: Option<PrimesDbBlock>,
    ) -> Self {
        let mut oracle = PrimeOracle::new(Arc::clone(&table))
            .with_trial_division_ceiling(config.oracle.trial_division_ceiling)
            .with_mr_rounds(config.oracle.mr_rounds);
        if let Some(block) = primesdb {
            oracle = oracle.with_primesdb(block);
        }
        let oracle = Arc::new(oracle);

        let finder = Arc::new(
            SequenceFinder::new(Arc::clone(&table)).with_policy(config.search.unbounded_policy),
        );
        let scheduler =
            RangeSearchScheduler::new(Arc::clone(&finder), config.search.scheduler.clone());
        let locator = NearestPrimeLocator::new(Arc::clone(&oracle))
            .with_search_window(config.locator.search_window)
            .with_self_policy(config.locator.self_policy);

        info!(
            limit = table.limit(),
            primes = table.len(),
            primesdb = oracle.primesdb().is_some(),
            parallel = config.search.scheduler.parallel,
            "prime engine ready"
        );
        PrimeEngine {
            config,
            table,
            oracle,
            finder,
            scheduler,
            locator,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn table(&self) -> &Arc<PrimeTable> {
        &self.table
    }

    pub fn oracle(&self) -> &Arc<PrimeOracle> {
        &self.oracle
    }

    pub fn finder(&self) -> &Arc<SequenceFinder> {
        &self.finder
    }

    pub fn scheduler(&self) -> &RangeSearchScheduler {
        &self.scheduler
    }

    pub fn locator(&self) -> &NearestPrimeLocator {
        &self.locator
    }

    pub fn is_prime(&self, n: u64) -> bool {
        self.oracle.is_prime(n)
    }

    pub fn is_prime_big(&self, n: &Integer) -> Verdict {
        self.oracle.is_prime_big(n)
    }

    pub fn find(
        &self,
        target: u64,
        min_length: usize,
        max_length: Bound,
    ) -> Result<Arc<[PrimeRun]>, PrimeError> {
        self.finder.find(target, min_length, max_length)
    }

    pub fn search(&self, request: &SearchRequest) -> Result<SearchOutcome, SearchError> {
        self.scheduler.run(request)
    }

    pub fn search_with_progress<F>(
        &self,
        request: &SearchRequest,
        on_progress: F,
    ) -> Result<SearchOutcome, SearchError>
    where
        F: Fn(&ProgressSnapshot) + Sync,
    {
        self.scheduler.run_with_progress(request, on_progress)
    }

    pub fn estimate(&self, request: &SearchRequest) -> Result<CostEstimate, SearchError> {
        self.scheduler.estimate(request)
    }

    pub fn nearest(&self, n: u64, k: usize) -> NearestPrimes {
        self.locator.nearest(n, k)
    }

    pub fn prime_sum_runs(
        &self,
        limit: u64,
        min_len: usize,
        max_len: Bound,
    ) -> Result<Vec<PrimeRun>, PrimeError> {
        sums::prime_sum_runs(&self.oracle, limit, min_len, max_len)
    }

    pub fn sum_index(&self, max_len: usize) -> SumIndex {
        SumIndex::build(&self.table, max_len)
    }

    pub fn analyze_plate(&self, raw: &str, k: usize) -> Result<PlateReport, PrimeError> {
        plate::analyze_plate(&self.locator, raw, k)
    }

    pub fn prime_phone_numbers(&self, prefix: &str) -> Result<Vec<u64>, PrimeError> {
        phone::prime_phone_numbers(&self.oracle, prefix)
    }

    pub fn nearest_phone_primes(
        &self,
        raw: &str,
        k: usize,
    ) -> Result<(u64, NearestPrimes), PrimeError> {
        phone::nearest_phone_primes(&self.locator, raw, k)
    }
}
