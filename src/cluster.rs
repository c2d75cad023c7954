//! Node-level decomposition and the coordinator's gather.
//!
//! [0, limit) is split across nodes with the same arithmetic the workers use.
//! Every node, the coordinator included, sieves its slice. The others send
//! one result each to rank 0, which receives exactly once per rank in rank
//! order and assembles the global answer.

use std::thread;
use std::time::Instant;

use tracing::{debug, info};

use crate::base_primes::{self, BasePrimes};
use crate::config::RunConfig;
use crate::error::{Result, SieveError};
use crate::message::{Envelope, Tag};
use crate::partition::{self, Range};
use crate::pool::{self, Job};
use crate::result::{GlobalResult, PartialResult};
use crate::transport::{LocalTransport, Transport};

pub const COORDINATOR: usize = 0;

/// Slice of [0, limit) owned by `rank`
pub fn node_range(limit: u64, nodes: usize, rank: usize) -> Range {
    partition::nth_part(Range::below(limit), nodes, rank)
}

/// Base primes for a run bounded by `limit`
///
/// Pure, so each node computes its own and the list never goes on the wire.
pub fn base_primes_for(limit: u64) -> BasePrimes {
    base_primes::generate(base_primes::base_limit(limit))
}

/// Sieve this node's slice with all local workers
pub fn local_result(config: &RunConfig, rank: usize, base: &BasePrimes) -> Result<PartialResult> {
    let range = node_range(config.limit, config.nodes, rank);
    let job = Job {
        algorithm: config.algorithm,
        enumerate: config.enumerate,
    };

    let started = Instant::now();
    let partial = pool::run(range, config.workers, base, job)?;
    info!(
        rank,
        range = %range,
        workers = config.workers,
        count = partial.count,
        elapsed_us = started.elapsed().as_micros() as u64,
        "local sieve finished"
    );
    Ok(partial)
}

/// Run one node of the cluster
///
/// Returns the global result on the coordinator and `None` everywhere else.
/// A node only reports after all of its workers are done.
pub fn run_node<T: Transport>(config: &RunConfig, transport: &mut T) -> Result<Option<GlobalResult>> {
    let rank = transport.rank();
    let nodes = transport.size();
    if nodes != config.nodes {
        return Err(SieveError::TopologyMismatch {
            expected: config.nodes,
            actual: nodes,
        });
    }
    config.validate_rank(rank)?;

    let base = base_primes_for(config.limit);
    debug!(rank, base_primes = base.len(), largest = base.largest(), "base primes ready");

    let local = local_result(config, rank, &base)?;

    if rank != COORDINATOR {
        transport.send(COORDINATOR, &Envelope::result(rank, local))?;
        debug!(rank, "result sent to coordinator");
        return Ok(None);
    }

    gather(config, transport, local).map(Some)
}

/// One blocking receive per other rank, then the final reduction
fn gather<T: Transport>(
    config: &RunConfig,
    transport: &mut T,
    local: PartialResult,
) -> Result<GlobalResult> {
    let mut merged = local;
    for source in (0..transport.size()).filter(|&rank| rank != COORDINATOR) {
        let envelope = transport.recv(source, Tag::Result)?;
        let (tag, peer) = (envelope.tag, envelope.source);
        let partial = envelope
            .into_partial()
            .ok_or(SieveError::UnexpectedPayload { tag, peer })?;
        debug!(source, count = partial.count, "received node result");
        merged = merged.merge(partial);
    }

    Ok(GlobalResult::assemble(
        config.limit,
        merged,
        config.nodes,
        config.workers,
    ))
}

/// Whole cluster in one process: one thread per node over an in-memory mesh
///
/// Nodes still share nothing but the channels between them.
pub fn run_local(config: &RunConfig) -> Result<GlobalResult> {
    config.validate()?;

    let mesh = LocalTransport::mesh(config.nodes);
    let outcomes: Vec<thread::Result<Result<Option<GlobalResult>>>> = thread::scope(|scope| {
        let handles: Vec<_> = mesh
            .into_iter()
            .map(|mut transport| scope.spawn(move || run_node(config, &mut transport)))
            .collect();

        handles.into_iter().map(|handle| handle.join()).collect()
    });

    let mut global = None;
    for (rank, outcome) in outcomes.into_iter().enumerate() {
        let result = outcome.map_err(|_| SieveError::NodePanicked { rank })??;
        if rank == COORDINATOR {
            global = result;
        }
    }

    global.ok_or(SieveError::NodePanicked { rank: COORDINATOR })
}

/// Count primes below `limit`, any limit accepted
///
/// Values below 2 clamp to an empty answer instead of failing validation.
pub fn count_below(limit: u64, nodes: usize, workers: usize) -> Result<u64> {
    if limit < 2 {
        return Ok(0);
    }
    run_local(&RunConfig::new(limit, nodes, workers)).map(|global| global.count)
}
