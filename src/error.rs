//! Error types for a sieve run.
//!
//! Every variant is fatal: a run either completes or aborts, nothing is
//! retried and no partial result is kept.

use thiserror::Error;

use crate::message::Tag;

pub type Result<T> = std::result::Result<T, SieveError>;

#[derive(Debug, Error)]
pub enum SieveError {
    /// The bound is below the smallest value a run accepts.
    #[error("limit {limit} is below the minimum of {min}")]
    LimitTooSmall { limit: u64, min: u64 },

    #[error("a cluster needs at least one node")]
    NoNodes,

    #[error("a node needs at least one worker thread")]
    NoWorkers,

    /// The runtime reported a different cluster size than the run was configured for.
    #[error("expected {expected} nodes but the cluster has {actual}")]
    TopologyMismatch { expected: usize, actual: usize },

    #[error("rank {rank} is outside a cluster of {nodes} nodes")]
    RankOutOfRange { rank: usize, nodes: usize },

    #[error("failed to encode message: {0}")]
    Encode(#[source] postcard::Error),

    #[error("failed to decode message: {0}")]
    Decode(#[source] postcard::Error),

    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },

    #[error("transport I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The peer's end of the link is gone.
    #[error("node {peer} disconnected")]
    Disconnected { peer: usize },

    #[error("expected {expected:?} message from node {peer}, got {actual:?} from node {sender}")]
    UnexpectedMessage {
        expected: Tag,
        actual: Tag,
        peer: usize,
        sender: usize,
    },

    /// A result-tagged message whose payload holds no result.
    #[error("node {peer} sent a {tag:?} message without a result payload")]
    UnexpectedPayload { tag: Tag, peer: usize },

    #[error("node {rank} joined the cluster twice")]
    DuplicateRank { rank: usize },

    #[error("no route from node {from} to node {dest}")]
    NoRoute { from: usize, dest: usize },

    #[error("worker {worker} panicked while sieving")]
    WorkerPanicked { worker: usize },

    #[error("node {rank} panicked")]
    NodePanicked { rank: usize },
}

impl SieveError {
    /// Configuration problems are reported before any work starts.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            SieveError::LimitTooSmall { .. }
                | SieveError::NoNodes
                | SieveError::NoWorkers
                | SieveError::TopologyMismatch { .. }
                | SieveError::RankOutOfRange { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = SieveError::TopologyMismatch {
            expected: 5,
            actual: 3,
        };
        assert_eq!(err.to_string(), "expected 5 nodes but the cluster has 3");

        let err = SieveError::Disconnected { peer: 2 };
        assert_eq!(err.to_string(), "node 2 disconnected");
    }

    #[test]
    fn test_is_config() {
        assert!(SieveError::NoWorkers.is_config());
        assert!(SieveError::LimitTooSmall { limit: 1, min: 2 }.is_config());
        assert!(!SieveError::WorkerPanicked { worker: 0 }.is_config());
        assert!(!SieveError::Disconnected { peer: 1 }.is_config());
    }
}
