//! Stress tests for vecseg segments.
//!
//! These helpers drive one segment from many threads at once and report how
//! many operations succeeded.

use crate::fixtures::{RowBatch, TestSegment};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, ScopedJoinHandle};
use std::time::{Duration, Instant};
use vecseg_codec::FieldValues;
use vecseg_core::{PrimaryKey, RetrievePlan, Segment, SegmentType};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Batches each thread inserts.
    pub batches_per_thread: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Rows per insert batch.
    pub batch_rows: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            batches_per_thread: 100,
            threads: 4,
            batch_rows: 8,
        }
    }
}

impl StressConfig {
    /// Total rows the configuration inserts.
    pub fn total_rows(&self) -> usize {
        self.threads * self.batches_per_thread * self.batch_rows
    }

    fn batch(&self, thread: usize, batch: usize) -> RowBatch {
        let start = ((thread * self.batches_per_thread + batch) * self.batch_rows) as i64;
        RowBatch::sequential(start, self.batch_rows)
    }
}

fn insert_once(segment: &Segment, batch: &RowBatch, ts: u64) -> bool {
    let Ok(offset) = segment.pre_insert(batch.len() as i64) else {
        return false;
    };
    segment
        .insert(
            offset,
            &batch.row_ids,
            &vec![ts; batch.len()],
            &batch.blobs(segment.config().endian),
        )
        .is_ok()
}

/// Joins writer threads, counting each one that panicked as a failure.
fn join_writers(writers: Vec<ScopedJoinHandle<'_, ()>>, failed: &AtomicUsize) {
    for writer in writers {
        if writer.join().is_err() {
            failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Inserts disjoint batches from every thread; every row gets timestamp 1.
pub fn stress_concurrent_inserts(segment: &Segment, config: &StressConfig) -> StressTestResult {
    let successful = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let start = Instant::now();

    thread::scope(|s| {
        let writers: Vec<_> = (0..config.threads)
            .map(|t| {
                let (successful, failed) = (&successful, &failed);
                s.spawn(move || {
                    for b in 0..config.batches_per_thread {
                        if insert_once(segment, &config.batch(t, b), 1) {
                            successful.fetch_add(1, Ordering::Relaxed);
                        } else {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();
        join_writers(writers, &failed);
    });

    StressTestResult::new(
        successful.into_inner(),
        failed.into_inner(),
        start.elapsed(),
    )
}

/// Inserts from writer threads while one reader retrieves continuously.
///
/// A read fails if any visible row is missing its `age` value or if the
/// number of visible rows ever shrinks.
pub fn stress_inserts_with_reader(segment: &Segment, config: &StressConfig) -> StressTestResult {
    let successful = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let done = AtomicBool::new(false);
    let start = Instant::now();

    thread::scope(|s| {
        let writers: Vec<_> = (0..config.threads)
            .map(|t| {
                let (successful, failed) = (&successful, &failed);
                s.spawn(move || {
                    for b in 0..config.batches_per_thread {
                        if insert_once(segment, &config.batch(t, b), 1) {
                            successful.fetch_add(1, Ordering::Relaxed);
                        } else {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();

        let (successful, failed, done) = (&successful, &failed, &done);
        s.spawn(move || {
            let plan = RetrievePlan {
                predicate: None,
                output_field_ids: vec![crate::fixtures::AGE_FIELD_ID],
                timestamp: 1,
            };
            let mut last_seen = 0usize;
            while !done.load(Ordering::Acquire) {
                let consistent = segment.retrieve(&plan).is_ok_and(|r| {
                    let ages_match = match r.field(crate::fixtures::AGE_FIELD_ID).map(|f| &f.values) {
                        Some(FieldValues::Int32(ages)) => ages.len() == r.len(),
                        _ => false,
                    };
                    let grew = r.len() >= last_seen;
                    last_seen = r.len();
                    ages_match && grew
                });
                if consistent {
                    successful.fetch_add(1, Ordering::Relaxed);
                } else {
                    failed.fetch_add(1, Ordering::Relaxed);
                }
                thread::yield_now();
            }
        });

        join_writers(writers, failed);
        done.store(true, Ordering::Release);
    });

    StressTestResult::new(
        successful.into_inner(),
        failed.into_inner(),
        start.elapsed(),
    )
}

/// Races teardown against loads and reads on fresh sealed segments.
///
/// Every operation must either succeed or report the segment as released;
/// anything else counts as a failure.
pub fn stress_teardown(rounds: usize) -> StressTestResult {
    let mut successful = 0usize;
    let mut failed = 0usize;
    let start = Instant::now();

    for round in 0..rounds {
        let seg = TestSegment::new(SegmentType::Sealed);
        let batch = RowBatch::sequential(round as i64 * 10, 10);
        let handle = seg.handle();
        let outcomes: Vec<bool> = thread::scope(|s| {
            let loader = s.spawn(|| {
                let result = handle.load_field_data(
                    crate::fixtures::PK_FIELD_ID,
                    batch.len() as i64,
                    FieldValues::Int64(batch.pks.clone()),
                );
                result.is_ok() || result.is_err_and(|e| e.is_nil_segment())
            });
            let reader = s.spawn(|| {
                let _ = handle.may_contain_pk(&PrimaryKey::from(0));
                handle.stats().segment_id == 1
            });
            handle.delete_segment();
            vec![
                loader.join().unwrap_or(false),
                reader.join().unwrap_or(false),
                handle.is_released(),
            ]
        });
        for ok in outcomes {
            if ok {
                successful += 1;
            } else {
                failed += 1;
            }
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}
