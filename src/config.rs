use std::fmt;

use clap::ValueEnum;

use crate::error::{Result, SieveError};

/// Bound used when none is given on the command line
pub const DEFAULT_LIMIT: u64 = 100_000_000;

/// Smallest bound a run accepts
pub const MIN_LIMIT: u64 = 2;

/// How many primes to print from each end of an enumerated run
pub const DEFAULT_SHOW: usize = 10;

/// Per-segment algorithm
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Algorithm {
    /// Segmented bit-packed Sieve of Eratosthenes
    #[default]
    Sieve,
    /// Trial division of every odd candidate (slow, for comparison)
    Trial,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Sieve => write!(f, "segmented sieve"),
            Algorithm::Trial => write!(f, "trial division"),
        }
    }
}

/// Worker threads per node when not given: one per available core
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Everything a node needs to know to take part in a run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    /// Primes are searched in [0, limit)
    pub limit: u64,
    pub nodes: usize,
    /// Worker threads per node
    pub workers: usize,
    pub algorithm: Algorithm,
    /// Ship and report prime values, not only the count
    pub enumerate: bool,
    pub show: usize,
    /// Refuse to run unless the cluster has exactly this many nodes
    pub expected_nodes: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            nodes: 1,
            workers: default_workers(),
            algorithm: Algorithm::default(),
            enumerate: false,
            show: DEFAULT_SHOW,
            expected_nodes: None,
        }
    }
}

impl RunConfig {
    pub fn new(limit: u64, nodes: usize, workers: usize) -> Self {
        Self {
            limit,
            nodes,
            workers,
            ..Self::default()
        }
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_enumerate(mut self, enumerate: bool) -> Self {
        self.enumerate = enumerate;
        self
    }

    pub fn with_expected_nodes(mut self, expected: Option<usize>) -> Self {
        self.expected_nodes = expected;
        self
    }

    /// Startup checks; nothing is partitioned until these pass
    pub fn validate(&self) -> Result<()> {
        if self.limit < MIN_LIMIT {
            return Err(SieveError::LimitTooSmall {
                limit: self.limit,
                min: MIN_LIMIT,
            });
        }
        if self.nodes == 0 {
            return Err(SieveError::NoNodes);
        }
        if self.workers == 0 {
            return Err(SieveError::NoWorkers);
        }
        if let Some(expected) = self.expected_nodes {
            if expected != self.nodes {
                return Err(SieveError::TopologyMismatch {
                    expected,
                    actual: self.nodes,
                });
            }
        }
        Ok(())
    }

    /// `validate` plus a check that `rank` belongs to the cluster
    pub fn validate_rank(&self, rank: usize) -> Result<()> {
        self.validate()?;
        if rank >= self.nodes {
            return Err(SieveError::RankOutOfRange {
                rank,
                nodes: self.nodes,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = RunConfig::default();
        assert_eq!(config.limit, DEFAULT_LIMIT);
        assert!(config.workers >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_limit_below_two() {
        for limit in [0, 1] {
            let err = RunConfig::new(limit, 1, 1).validate().unwrap_err();
            assert!(matches!(err, SieveError::LimitTooSmall { min: 2, .. }));
        }
        assert!(RunConfig::new(2, 1, 1).validate().is_ok());
    }

    #[test]
    fn test_zero_nodes_or_workers() {
        assert!(matches!(
            RunConfig::new(100, 0, 1).validate(),
            Err(SieveError::NoNodes)
        ));
        assert!(matches!(
            RunConfig::new(100, 1, 0).validate(),
            Err(SieveError::NoWorkers)
        ));
    }

    #[test]
    fn test_topology_mismatch() {
        let config = RunConfig::new(100, 3, 2).with_expected_nodes(Some(5));
        assert!(matches!(
            config.validate(),
            Err(SieveError::TopologyMismatch {
                expected: 5,
                actual: 3
            })
        ));
        let config = RunConfig::new(100, 5, 2).with_expected_nodes(Some(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rank_out_of_range() {
        let config = RunConfig::new(100, 2, 1);
        assert!(config.validate_rank(1).is_ok());
        assert!(matches!(
            config.validate_rank(2),
            Err(SieveError::RankOutOfRange { rank: 2, nodes: 2 })
        ));
    }

    #[test]
    fn test_algorithm_display() {
        assert_eq!(Algorithm::Sieve.to_string(), "segmented sieve");
        assert_eq!(Algorithm::Trial.to_string(), "trial division");
    }
}
