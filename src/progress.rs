//! # Progress — Atomic Range-Search Progress
//!
//! Thread-safe progress tracking shared between the scheduler's segment
//! workers and whoever is watching the search. Counters are atomics so
//! parallel Rayon workers update them lock-free; the only coordination is a
//! compare-and-swap on the last-report timestamp.
//!
//! ## Rate Limiting
//!
//! [`Progress::maybe_report`] is called after every segment but yields a
//! [`ProgressSnapshot`] at most once per interval. The winning caller logs
//! it via `tracing` and hands it to the caller's callback; everyone else in
//! that window gets `None`.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Point-in-time view of a running search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub elapsed_secs: f64,
    /// Share of primes examined, in `[0, 1]`.
    pub fraction: f64,
    pub tested: u64,
    pub total: u64,
    pub results: u64,
    pub processed_segments: u64,
    pub total_segments: u64,
    /// Linear extrapolation of the time still needed; `None` before any
    /// work has been measured.
    pub remaining_secs: Option<f64>,
}

pub struct Progress {
    pub tested: AtomicU64,
    pub found: AtomicU64,
    pub segments_done: AtomicU64,
    total: u64,
    total_segments: u64,
    interval: Duration,
    start: Instant,
    /// Milliseconds since `start` at the last emitted snapshot.
    last_report_ms: AtomicU64,
}

impl Progress {
    pub fn new(total: u64, total_segments: u64, interval: Duration) -> Arc<Self> {
        Arc::new(Progress {
            tested: AtomicU64::new(0),
            found: AtomicU64::new(0),
            segments_done: AtomicU64::new(0),
            total,
            total_segments,
            interval,
            start: Instant::now(),
            last_report_ms: AtomicU64::new(0),
        })
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let elapsed_secs = self.start.elapsed().as_secs_f64();
        let tested = self.tested.load(Ordering::Relaxed);
        let fraction = if self.total == 0 {
            1.0
        } else {
            (tested as f64 / self.total as f64).min(1.0)
        };
        let remaining_secs = if tested == 0 {
            None
        } else {
            Some(elapsed_secs / fraction - elapsed_secs)
        };
        ProgressSnapshot {
            elapsed_secs,
            fraction,
            tested,
            total: self.total,
            results: self.found.load(Ordering::Relaxed),
            processed_segments: self.segments_done.load(Ordering::Relaxed),
            total_segments: self.total_segments,
            remaining_secs,
        }
    }

    /// Snapshot and log if at least one interval has passed since the last
    /// report. Safe to call from many threads at once.
    pub fn maybe_report(&self) -> Option<ProgressSnapshot> {
        let now_ms = self.start.elapsed().as_millis() as u64;
        let last = self.last_report_ms.load(Ordering::Relaxed);
        if now_ms.saturating_sub(last) < self.interval.as_millis() as u64 {
            return None;
        }
        self.last_report_ms
            .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Relaxed)
            .ok()?;
        let snapshot = self.snapshot();
        log_status(&snapshot);
        Some(snapshot)
    }
}

pub fn log_status(snapshot: &ProgressSnapshot) {
    let elapsed = snapshot.elapsed_secs as u64;
    let h = elapsed / 3600;
    let m = (elapsed % 3600) / 60;
    let s = elapsed % 60;
    info!(
        tested = snapshot.tested,
        total = snapshot.total,
        percent = format_args!("{:.1}", snapshot.fraction * 100.0),
        found = snapshot.results,
        segments = format_args!("{}/{}", snapshot.processed_segments, snapshot.total_segments),
        remaining_secs = format_args!("{:.1}", snapshot.remaining_secs.unwrap_or(0.0)),
        elapsed = format_args!("{:02}:{:02}:{:02}", h, m, s),
        "search progress"
    );
}

#[cfg(test)]
mod tests {
    //! Tests for atomic progress counters and rate-limited snapshots.
    //!
    //! Counters must not lose increments under contention; snapshots must
    //! derive fraction and remaining time from those counters; and
    //! `maybe_report` must honour its interval.

    use super::*;
    use std::thread;

    // ── Initialization ──────────────────────────────────────────────

    #[test]
    fn counters_start_at_zero() {
        let p = Progress::new(100, 10, Duration::from_secs(1));
        let snap = p.snapshot();
        assert_eq!(snap.tested, 0);
        assert_eq!(snap.results, 0);
        assert_eq!(snap.processed_segments, 0);
        assert_eq!(snap.fraction, 0.0);
        assert_eq!(snap.remaining_secs, None);
    }

    /// An empty search is already complete.
    #[test]
    fn empty_search_is_fully_done() {
        let p = Progress::new(0, 0, Duration::from_secs(1));
        assert_eq!(p.snapshot().fraction, 1.0);
    }

    // ── Snapshot Arithmetic ────────────────────────────────────────

    #[test]
    fn snapshot_reflects_counters() {
        let p = Progress::new(200, 4, Duration::from_secs(1));
        p.tested.fetch_add(50, Ordering::Relaxed);
        p.found.fetch_add(7, Ordering::Relaxed);
        p.segments_done.fetch_add(1, Ordering::Relaxed);
        let snap = p.snapshot();
        assert_eq!(snap.tested, 50);
        assert_eq!(snap.results, 7);
        assert_eq!(snap.processed_segments, 1);
        assert_eq!(snap.total_segments, 4);
        assert!((snap.fraction - 0.25).abs() < 1e-12);
        assert!(snap.remaining_secs.unwrap() >= 0.0);
    }

    // ── Concurrent Increment Correctness ────────────────────────────

    /// 8 threads × 1000 increments must land exactly 8000.
    #[test]
    fn concurrent_increments_are_accurate() {
        let p = Progress::new(8000, 8, Duration::from_secs(1));
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let p = Arc::clone(&p);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        p.tested.fetch_add(1, Ordering::Relaxed);
                    }
                    p.segments_done.fetch_add(1, Ordering::Relaxed);
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        let snap = p.snapshot();
        assert_eq!(snap.tested, 8000);
        assert_eq!(snap.processed_segments, 8);
        assert_eq!(snap.fraction, 1.0);
    }

    // ── Rate Limiting ──────────────────────────────────────────────

    #[test]
    fn zero_interval_always_reports() {
        let p = Progress::new(10, 1, Duration::ZERO);
        assert!(p.maybe_report().is_some());
        assert!(p.maybe_report().is_some());
    }

    #[test]
    fn long_interval_suppresses_reports() {
        let p = Progress::new(10, 1, Duration::from_secs(3600));
        for _ in 0..100 {
            assert!(p.maybe_report().is_none());
        }
    }

    #[test]
    fn snapshot_json_is_camel_case() {
        let p = Progress::new(10, 2, Duration::ZERO);
        let json = serde_json::to_value(p.snapshot()).unwrap();
        assert!(json.get("processedSegments").is_some());
        assert!(json.get("remainingSecs").is_some());
    }
}
