use crate::base_primes::BasePrimes;
use crate::bitset::BitSet;
use crate::partition::Range;

pub const SEGMENT_SIZE_BITS: usize = 32 * 1024 * 8; // 32KB in bits = 262,144 odd numbers
pub const SEGMENT_SIZE_NUMBERS: u64 = SEGMENT_SIZE_BITS as u64 * 2; // 524,288 actual numbers

/// Sieved odd candidates of one sub-range
///
/// - Bit i represents the odd number `start + 2*i`
/// - A set bit means prime
/// - 2 is never represented, the coordinator accounts for it once
#[derive(Clone, Debug)]
pub struct Segment {
    pub range: Range,
    /// First odd number >= range.lo
    pub start: u64,
    pub bits: BitSet,
    pub count: u64,
}

impl Segment {
    /// Odd primes of the segment in ascending order
    pub fn primes(&self) -> impl Iterator<Item = u64> + '_ {
        self.bits.iter_ones().map(|idx| self.start + 2 * idx as u64)
    }

    pub fn is_prime(&self, n: u64) -> bool {
        n % 2 == 1
            && n >= self.start
            && self.range.contains(n)
            && self.bits.test(((n - self.start) / 2) as usize)
    }
}

/// Segmented, bit-packed, odd-only Sieve of Eratosthenes over `range`
///
/// `base` must hold every prime up to ⌈√hi⌉ for the global bound, not just
/// the primes inside `range`: a prime far below `lo` can still have multiples
/// inside it.
///
/// 1. Normalise lo to the first odd value
/// 2. One bit per odd candidate, all set
/// 3. For each odd base prime p, clear odd multiples from max(p², first odd
///    multiple >= start) stepping by 2p
/// 4. Clear 1 if the segment starts there, then count
///
/// Allocates one bit per odd candidate of the whole range. Workers go through
/// `sieve_chunks` instead, which bounds the buffer to `SEGMENT_SIZE_BITS`.
pub fn sieve(range: Range, base: &BasePrimes) -> Segment {
    sieve_into(range, base, BitSet::empty(0))
}

/// Same as `sieve`, reusing the allocation of `bits`
fn sieve_into(range: Range, base: &BasePrimes, mut bits: BitSet) -> Segment {
    let start = range.lo | 1;
    let odd_count = if start < range.hi {
        (range.hi - start).div_ceil(2) as usize
    } else {
        0
    };
    bits.refill(odd_count);
    if odd_count == 0 {
        return Segment {
            range,
            start,
            bits,
            count: 0,
        };
    }

    for &p in base.odd() {
        let square = p * p;
        if square >= range.hi {
            break; // Base primes are ascending, nothing further reaches this segment
        }

        // Find first odd multiple of p in [max(start, p²), hi)
        let mut multiple = square.max(start.div_ceil(p) * p);
        if multiple % 2 == 0 {
            multiple += p; // Make it odd
        }

        let step = 2 * p;
        while multiple < range.hi {
            bits.clear(((multiple - start) / 2) as usize);
            multiple += step;
        }
    }

    // 1 survives every crossing-out pass (no p² <= 1), drop it by hand
    if start == 1 {
        bits.clear(0);
    }

    let count = bits.count_ones() as u64;
    Segment {
        range,
        start,
        bits,
        count,
    }
}

/// Sieve `range` in consecutive chunks of at most `SEGMENT_SIZE_NUMBERS`
///
/// One buffer of `SEGMENT_SIZE_BITS` is refilled for every chunk, so memory
/// stays fixed however wide the range is. Chunks are visited in ascending
/// order.
pub fn sieve_chunks<F>(range: Range, base: &BasePrimes, mut visit: F)
where
    F: FnMut(&Segment),
{
    let mut bits = BitSet::empty(SEGMENT_SIZE_BITS);
    let mut lo = range.lo;
    while lo < range.hi {
        let hi = lo.saturating_add(SEGMENT_SIZE_NUMBERS).min(range.hi);
        let segment = sieve_into(Range::new(lo, hi), base, bits);
        visit(&segment);
        bits = segment.bits;
        lo = hi;
    }
}

/// Number of odd primes in `range`, chunk by chunk
pub fn count_primes(range: Range, base: &BasePrimes) -> u64 {
    let mut count = 0;
    sieve_chunks(range, base, |segment| count += segment.count);
    count
}

/// Odd primes of `range` in ascending order, chunk by chunk
pub fn collect_primes(range: Range, base: &BasePrimes) -> Vec<u64> {
    let mut primes = Vec::new();
    sieve_chunks(range, base, |segment| primes.extend(segment.primes()));
    primes
}
