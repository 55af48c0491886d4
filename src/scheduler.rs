//! # Scheduler — Batch Search Over a Prime Range
//!
//! Drives [`SequenceFinder`] over every table prime in `[start, end]` and keeps
//! those whose number of qualifying runs falls inside the requested count
//! bounds.
//!
//! ## Pipeline
//!
//! 1. **Validate** the request against the table limit. Nothing is computed
//!    for a malformed request.
//! 2. **Sample** wide ranges (`end − start` above the sampling threshold):
//!    search the first `sample_size` integers, extrapolate the wall time
//!    linearly to the full width, and refuse the search if the projection
//!    exceeds the time budget. The sample's finder results stay cached, so
//!    the real run does not repeat them.
//! 3. **Segment** the primes in range: fixed-size chunks for wide ranges, a
//!    single chunk otherwise. Segments are the progress and cancellation
//!    checkpoints.
//! 4. **Search** each segment, sequentially or sharded across the Rayon pool
//!    (`parallel = true`). Parallel results are merged back in segment order,
//!    so both modes produce the same output.
//! 5. **Report** progress at most once per interval, and aggregate timings.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::error::{PrimeError, SearchError, ValidationError};
use crate::progress::{Progress, ProgressSnapshot};
use crate::sequence::{Bound, PrimeRun, SequenceFinder};

/// A range search, as submitted on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchRequest {
    pub start: u64,
    pub end: u64,
    #[serde(alias = "min_sequences")]
    pub min_sequences: usize,
    #[serde(alias = "max_sequences")]
    pub max_sequences: Bound,
    #[serde(alias = "min_length")]
    pub min_length: usize,
    #[serde(alias = "max_length")]
    pub max_length: Bound,
}

impl Default for SearchRequest {
    fn default() -> Self {
        SearchRequest {
            start: 2,
            end: 100,
            min_sequences: 1,
            max_sequences: Bound::Unbounded,
            min_length: 2,
            max_length: Bound::Bounded(5),
        }
    }
}

impl SearchRequest {
    pub fn new(start: u64, end: u64) -> Self {
        SearchRequest {
            start,
            end,
            ..Default::default()
        }
    }

    pub fn with_lengths(mut self, min_length: usize, max_length: Bound) -> Self {
        self.min_length = min_length;
        self.max_length = max_length;
        self
    }

    pub fn with_counts(mut self, min_sequences: usize, max_sequences: Bound) -> Self {
        self.min_sequences = min_sequences;
        self.max_sequences = max_sequences;
        self
    }

    /// Check every field rule. `ceiling` is the largest admissible `end`.
    pub fn validate(&self, ceiling: u64) -> Result<(), ValidationError> {
        if self.start < 2 {
            return Err(ValidationError::StartTooSmall { start: self.start });
        }
        if self.end > ceiling {
            return Err(ValidationError::EndAboveCeiling {
                end: self.end,
                ceiling,
            });
        }
        if self.end < self.start {
            return Err(ValidationError::EndBeforeStart {
                start: self.start,
                end: self.end,
            });
        }
        if self.min_length < 2 {
            return Err(ValidationError::MinLengthTooSmall {
                min_length: self.min_length,
            });
        }
        if let Bound::Bounded(max_length) = self.max_length {
            if max_length < self.min_length {
                return Err(ValidationError::MaxLengthBelowMin {
                    min_length: self.min_length,
                    max_length,
                });
            }
        }
        if self.min_sequences < 1 {
            return Err(ValidationError::MinSequencesTooSmall {
                min_sequences: self.min_sequences,
            });
        }
        if let Bound::Bounded(max_sequences) = self.max_sequences {
            if max_sequences < self.min_sequences {
                return Err(ValidationError::MaxSequencesBelowMin {
                    min_sequences: self.min_sequences,
                    max_sequences,
                });
            }
        }
        Ok(())
    }

    /// Whether a prime with `count` qualifying runs belongs in the result.
    #[inline]
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_sequences && self.max_sequences.admits(count)
    }

    fn width(&self) -> u64 {
        self.end - self.start
    }
}

/// Scheduler tuning. Every field has a default matching the public service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Ranges wider than this are sampled and segmented.
    pub sampling_threshold: u64,
    pub sample_size: u64,
    pub time_budget_secs: f64,
    pub segment_size: usize,
    pub progress_interval_ms: u64,
    pub parallel: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            sampling_threshold: 10_000,
            sample_size: 1_000,
            time_budget_secs: 30.0,
            segment_size: 1_000,
            progress_interval_ms: 1_000,
            parallel: false,
        }
    }
}

impl SchedulerConfig {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

/// One prime that satisfied the count bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimeMatch {
    pub prime: u64,
    pub sequences: Arc<[PrimeRun]>,
    /// Number of qualifying sequences.
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub results: Vec<PrimeMatch>,
    pub total_time_seconds: f64,
    pub total_segments: usize,
    pub processed_segments: usize,
    pub total_results: usize,
}

/// Result of the sampling step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    /// Integers actually covered by the sample.
    pub sample_size: u64,
    pub sample_secs: f64,
    pub sample_results: usize,
    pub estimated_secs: f64,
    pub within_budget: bool,
}

pub struct RangeSearchScheduler {
    finder: Arc<SequenceFinder>,
    config: SchedulerConfig,
}

impl RangeSearchScheduler {
    pub fn new(finder: Arc<SequenceFinder>, config: SchedulerConfig) -> Self {
        RangeSearchScheduler { finder, config }
    }

    pub fn finder(&self) -> &Arc<SequenceFinder> {
        &self.finder
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Largest admissible `end`.
    pub fn ceiling(&self) -> u64 {
        self.finder.table().limit()
    }

    pub fn run(&self, request: &SearchRequest) -> Result<SearchOutcome, SearchError> {
        self.run_with_progress(request, |_| {})
    }

    /// Like [`run`](Self::run), also handing each rate-limited progress
    /// snapshot to `on_progress`.
    pub fn run_with_progress<F>(
        &self,
        request: &SearchRequest,
        on_progress: F,
    ) -> Result<SearchOutcome, SearchError>
    where
        F: Fn(&ProgressSnapshot) + Sync,
    {
        request.validate(self.ceiling())?;
        let started = Instant::now();

        let wide = request.width() > self.config.sampling_threshold;
        if wide {
            let estimate = self.sample(request)?;
            if !estimate.within_budget {
                warn!(
                    start = request.start,
                    end = request.end,
                    estimated_secs = estimate.estimated_secs,
                    budget_secs = self.config.time_budget_secs,
                    "search refused: projected time exceeds budget"
                );
                return Err(SearchError::BudgetExceeded {
                    estimated_secs: estimate.estimated_secs,
                    sample_secs: estimate.sample_secs,
                    sample_size: estimate.sample_size,
                    sample_results: estimate.sample_results,
                });
            }
        }

        let primes = self.finder.table().range_slice(request.start, request.end);
        let segment_size = if wide {
            self.config.segment_size.max(1)
        } else {
            primes.len().max(1)
        };
        let segments: Vec<&[u64]> = primes.chunks(segment_size).collect();
        info!(
            start = request.start,
            end = request.end,
            primes = primes.len(),
            segments = segments.len(),
            parallel = self.config.parallel,
            "range search started"
        );

        let progress = Progress::new(
            primes.len() as u64,
            segments.len() as u64,
            self.config.progress_interval(),
        );
        let search_segment = |segment: &[u64]| -> Result<Vec<PrimeMatch>, PrimeError> {
            let matches = self.search_segment(request, segment, &progress)?;
            progress.segments_done.fetch_add(1, Ordering::Relaxed);
            if let Some(snapshot) = progress.maybe_report() {
                on_progress(&snapshot);
            }
            Ok(matches)
        };

        let per_segment: Vec<Vec<PrimeMatch>> = if self.config.parallel {
            segments
                .par_iter()
                .map(|segment| search_segment(*segment))
                .collect::<Result<_, _>>()?
        } else {
            segments
                .iter()
                .map(|segment| search_segment(*segment))
                .collect::<Result<_, _>>()?
        };

        let results: Vec<PrimeMatch> = per_segment.into_iter().flatten().collect();
        let outcome = SearchOutcome {
            total_results: results.len(),
            results,
            total_time_seconds: started.elapsed().as_secs_f64(),
            total_segments: segments.len(),
            processed_segments: progress.segments_done.load(Ordering::Relaxed) as usize,
        };
        info!(
            results = outcome.total_results,
            segments = outcome.processed_segments,
            secs = format_args!("{:.3}", outcome.total_time_seconds),
            "range search finished"
        );
        Ok(outcome)
    }

    /// Validate and run only the sampling step, regardless of range width.
    pub fn estimate(&self, request: &SearchRequest) -> Result<CostEstimate, SearchError> {
        request.validate(self.ceiling())?;
        Ok(self.sample(request)?)
    }

    fn sample(&self, request: &SearchRequest) -> Result<CostEstimate, PrimeError> {
        let sample_end = request
            .start
            .saturating_add(self.config.sample_size)
            .min(request.end);
        let started = Instant::now();
        let mut sample_results = 0;
        for &p in self.finder.table().range_slice(request.start, sample_end) {
            let runs = self.finder.find(p, request.min_length, request.max_length)?;
            if request.accepts(runs.len()) {
                sample_results += 1;
            }
        }
        let sample_secs = started.elapsed().as_secs_f64();
        let sample_size = (sample_end - request.start).max(1);
        let estimated_secs = sample_secs * request.width().max(1) as f64 / sample_size as f64;
        let within_budget = estimated_secs <= self.config.time_budget_secs;
        info!(
            sample_size,
            sample_secs = format_args!("{:.4}", sample_secs),
            sample_results,
            estimated_secs = format_args!("{:.2}", estimated_secs),
            within_budget,
            "sampled search cost"
        );
        Ok(CostEstimate {
            sample_size,
            sample_secs,
            sample_results,
            estimated_secs,
            within_budget,
        })
    }

    fn search_segment(
        &self,
        request: &SearchRequest,
        segment: &[u64],
        progress: &Progress,
    ) -> Result<Vec<PrimeMatch>, PrimeError> {
        let mut matches = Vec::new();
        for &prime in segment {
            let sequences = self.finder.find(prime, request.min_length, request.max_length)?;
            progress.tested.fetch_add(1, Ordering::Relaxed);
            if request.accepts(sequences.len()) {
                progress.found.fetch_add(1, Ordering::Relaxed);
                matches.push(PrimeMatch {
                    prime,
                    length: sequences.len(),
                    sequences,
                });
            }
        }
        Ok(matches)
    }
}
