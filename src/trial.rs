use crate::partition::Range;

/// Trial division by odd divisors up to √n
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 {
        return false;
    }
    let mut i = 3;
    while i * i <= n {
        if n % i == 0 {
            return false;
        }
        i += 2;
    }
    true
}

/// Odd primes of `range` by trial division
///
/// Same contract as the segment sieve: 2 is left out and counted once by the
/// coordinator.
pub fn odd_primes(range: Range) -> impl Iterator<Item = u64> {
    (range.lo | 1..range.hi).step_by(2).filter(|&n| is_prime(n))
}

pub fn count_odd_primes(range: Range) -> u64 {
    odd_primes(range).count() as u64
}
