use std::thread;
use std::time::Instant;

use tracing::debug;

use crate::base_primes::BasePrimes;
use crate::config::Algorithm;
use crate::error::{Result, SieveError};
use crate::partition::{self, Range};
use crate::result::PartialResult;
use crate::segment;
use crate::trial;

/// What each worker does with its sub-range
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Job {
    pub algorithm: Algorithm,
    /// Collect the prime values, not just the count
    pub enumerate: bool,
}

impl Job {
    pub fn count(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            enumerate: false,
        }
    }

    pub fn enumerate(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            enumerate: true,
        }
    }

    /// Odd primes of `range`; 2 is never reported
    ///
    /// The sieve walks `range` in fixed-size segments with one reused buffer.
    pub fn execute(&self, range: Range, base: &BasePrimes) -> PartialResult {
        match (self.algorithm, self.enumerate) {
            (Algorithm::Sieve, false) => PartialResult::counted(segment::count_primes(range, base)),
            (Algorithm::Sieve, true) => PartialResult::enumerated(segment::collect_primes(range, base)),
            (Algorithm::Trial, false) => PartialResult::counted(trial::count_odd_primes(range)),
            (Algorithm::Trial, true) => PartialResult::enumerated(trial::odd_primes(range).collect()),
        }
    }
}

/// Thread-level fan-out over one node's range
///
/// - Splits `range` into `workers` contiguous parts
/// - One scoped thread per part; each owns its segment buffer and result slot
/// - No shared mutable state while sieving
/// - Slots are summed on the calling thread once every worker has joined
///
/// Worker results are concatenated in worker order, which keeps an
/// enumerated list ascending within the node.
pub fn run(range: Range, workers: usize, base: &BasePrimes, job: Job) -> Result<PartialResult> {
    if workers == 0 {
        return Err(SieveError::NoWorkers);
    }

    let parts = partition::split(range, workers);

    // Scatter: each worker writes only to its own join handle
    let slots: Vec<thread::Result<PartialResult>> = thread::scope(|scope| {
        let handles: Vec<_> = parts
            .iter()
            .enumerate()
            .map(|(worker_id, &part)| {
                let base = base.clone();

                scope.spawn(move || {
                    let started = Instant::now();
                    let partial = job.execute(part, &base);
                    debug!(
                        worker = worker_id,
                        range = %part,
                        count = partial.count,
                        elapsed_us = started.elapsed().as_micros() as u64,
                        "worker finished"
                    );
                    partial
                })
            })
            .collect();

        handles.into_iter().map(|handle| handle.join()).collect()
    });

    // Gather: single-threaded, after every worker is done
    let mut total = PartialResult::default();
    for (worker, slot) in slots.into_iter().enumerate() {
        let partial = slot.map_err(|_| SieveError::WorkerPanicked { worker })?;
        total = total.merge(partial);
    }

    Ok(total)
}
