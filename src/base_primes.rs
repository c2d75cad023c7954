use std::ops::Deref;
use std::sync::Arc;

/// Primes up to ⌈√N⌉, shared read-only by every worker of a node
///
/// Each node computes its own copy from N. `generate` is pure, so every node
/// ends up with an identical list and nothing has to cross the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasePrimes(Arc<[u64]>);

impl BasePrimes {
    /// Largest prime in the list, 0 when empty
    pub fn largest(&self) -> u64 {
        self.0.last().copied().unwrap_or(0)
    }

    /// Odd primes only, the ones the segment sieve crosses out with
    pub fn odd(&self) -> &[u64] {
        match self.0.first() {
            Some(2) => &self.0[1..],
            _ => &self.0,
        }
    }
}

impl Deref for BasePrimes {
    type Target = [u64];

    fn deref(&self) -> &[u64] {
        &self.0
    }
}

/// Exact integer square root (largest x with x * x <= n)
pub fn isqrt(n: u64) -> u64 {
    if n == 0 {
        return 0;
    }
    let mut x = (n as f64).sqrt() as u64;
    while x > 0 && x.checked_mul(x).is_none_or(|sq| sq > n) {
        x -= 1;
    }
    while (x + 1).checked_mul(x + 1).is_some_and(|sq| sq <= n) {
        x += 1;
    }
    x
}

/// Inclusive bound of the base prime list for a global bound `n`: ⌈√n⌉
pub fn base_limit(n: u64) -> u64 {
    let root = isqrt(n);
    if root * root == n { root } else { root + 1 }
}

/// Odd-only Sieve of Eratosthenes over [2, limit]
///
/// - Index mapping: is_prime[i] represents the number (2*i + 3)
/// - 2 is emitted up front and never stored
/// - Output is 2 followed by strictly increasing odd primes
pub fn generate(limit: u64) -> BasePrimes {
    if limit < 2 {
        return BasePrimes(Arc::from(Vec::new()));
    }
    if limit == 2 {
        return BasePrimes(Arc::from(vec![2]));
    }

    let size = ((limit - 1) / 2) as usize;
    let mut is_prime = vec![true; size];

    let mut i = 0;
    loop {
        let p = 2 * i as u64 + 3;
        if p * p > limit {
            break;
        }
        if is_prime[i] {
            // Mark odd multiples of p starting at p²
            let mut j = ((p * p - 3) / 2) as usize;
            while j < size {
                is_prime[j] = false;
                j += p as usize;
            }
        }
        i += 1;
    }

    let mut primes = Vec::with_capacity(size / 2 + 1);
    primes.push(2);
    primes.extend(
        is_prime
            .iter()
            .enumerate()
            .filter_map(|(i, &prime)| prime.then_some(2 * i as u64 + 3)),
    );

    BasePrimes(Arc::from(primes))
}
