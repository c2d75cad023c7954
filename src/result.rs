/// Primes found by one worker or one node
///
/// `primes` is only populated in enumeration mode. Merging adds counts and
/// concatenates lists, so any merge order yields the same count and the same
/// multiset of primes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartialResult {
    pub count: u64,
    pub primes: Option<Vec<u64>>,
}

impl PartialResult {
    pub fn counted(count: u64) -> Self {
        Self {
            count,
            primes: None,
        }
    }

    pub fn enumerated(primes: Vec<u64>) -> Self {
        Self {
            count: primes.len() as u64,
            primes: Some(primes),
        }
    }

    pub fn merge(mut self, other: PartialResult) -> PartialResult {
        self.count += other.count;
        self.primes = match (self.primes, other.primes) {
            (Some(mut mine), Some(theirs)) => {
                mine.extend(theirs);
                Some(mine)
            }
            (mine, theirs) => mine.or(theirs),
        };
        self
    }
}

/// Final answer, assembled on the coordinator only
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalResult {
    pub limit: u64,
    /// Number of primes below `limit`, 2 included
    pub count: u64,
    /// Every prime below `limit` in ascending order, when enumerating
    pub primes: Option<Vec<u64>>,
    pub nodes: usize,
    pub workers: usize,
}

impl GlobalResult {
    /// Finish the reduction of all node results
    ///
    /// Segments only ever see odd numbers, so 2 is added here exactly once.
    /// Node lists are disjoint but arrive in whatever order they were merged,
    /// so the combined list is sorted again.
    pub fn assemble(limit: u64, merged: PartialResult, nodes: usize, workers: usize) -> Self {
        let two = u64::from(limit > 2);
        let primes = merged.primes.map(|mut primes| {
            if limit > 2 {
                primes.push(2);
            }
            primes.sort_unstable();
            primes
        });

        Self {
            limit,
            count: merged.count + two,
            primes,
            nodes,
            workers,
        }
    }

    pub fn first(&self, k: usize) -> &[u64] {
        match &self.primes {
            Some(primes) => &primes[..k.min(primes.len())],
            None => &[],
        }
    }

    pub fn last(&self, k: usize) -> &[u64] {
        match &self.primes {
            Some(primes) => &primes[primes.len().saturating_sub(k)..],
            None => &[],
        }
    }
}
