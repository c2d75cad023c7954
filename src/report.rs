use std::fmt::Write;
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::config::Algorithm;
use crate::result::GlobalResult;

/// Coordinator's human-readable summary of a run
pub fn render(
    global: &GlobalResult,
    algorithm: Algorithm,
    started_at: DateTime<Local>,
    elapsed: Duration,
    show: usize,
) -> String {
    let mut out = String::new();
    let duration_us = elapsed.as_micros();

    // Writing to a String cannot fail
    let _ = writeln!(out, "=== RESULTS ===");
    let _ = writeln!(out, "Started: {}", started_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(
        out,
        "Searched below {} with {} ({} nodes x {} workers)",
        global.limit, algorithm, global.nodes, global.workers
    );
    let _ = writeln!(out, "Total primes found: {}", global.count);
    let _ = writeln!(
        out,
        "Total execution time: {}us ({:.2}ms)",
        duration_us,
        duration_us as f64 / 1000.0
    );

    if show > 0 && global.primes.as_ref().is_some_and(|p| !p.is_empty()) {
        let _ = writeln!(out, "First {} primes: {}", show, join(global.first(show)));
        if global.count as usize > show {
            let _ = writeln!(out, "Last {} primes: {}", show, join(global.last(show)));
        }
    }

    out
}

/// Space-separated, formatted with itoa
fn join(primes: &[u64]) -> String {
    let mut itoa_buf = itoa::Buffer::new();
    let mut line = String::with_capacity(primes.len() * 8);
    for (i, &prime) in primes.iter().enumerate() {
        if i > 0 {
            line.push(' ');
        }
        line.push_str(itoa_buf.format(prime));
    }
    line
}
