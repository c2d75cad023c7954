/// Bit-packed boolean vector
///
/// One bit per index, 64 indices per word.
/// - Index i lives in word i / 64, bit i % 64
/// - `filled` masks the unused tail bits of the last word so popcount is exact
/// - No bounds checks in release builds, callers stay inside `0..len`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitSet {
    words: Vec<u64>,
    len: usize,
}

const WORD_BITS: usize = 64;

impl BitSet {
    /// All bits set (every candidate assumed prime)
    pub fn filled(len: usize) -> Self {
        let mut bits = Self::empty(0);
        bits.refill(len);
        bits
    }

    /// Resize to `len` and set every bit, keeping the allocation
    pub fn refill(&mut self, len: usize) {
        self.words.clear();
        self.words.resize(len.div_ceil(WORD_BITS), !0_u64);
        self.len = len;

        // Mask trailing bits in last word
        let tail = len % WORD_BITS;
        if tail != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1_u64 << tail) - 1;
            }
        }
    }

    pub fn empty(len: usize) -> Self {
        Self {
            words: vec![0_u64; len.div_ceil(WORD_BITS)],
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn set(&mut self, idx: usize) {
        debug_assert!(idx < self.len, "bit {} out of range {}", idx, self.len);
        self.words[idx / WORD_BITS] |= 1_u64 << (idx % WORD_BITS);
    }

    #[inline]
    pub fn clear(&mut self, idx: usize) {
        debug_assert!(idx < self.len, "bit {} out of range {}", idx, self.len);
        self.words[idx / WORD_BITS] &= !(1_u64 << (idx % WORD_BITS));
    }

    #[inline]
    pub fn test(&self, idx: usize) -> bool {
        debug_assert!(idx < self.len, "bit {} out of range {}", idx, self.len);
        (self.words[idx / WORD_BITS] >> (idx % WORD_BITS)) & 1 == 1
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Indices of set bits in ascending order
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words
            .iter()
            .enumerate()
            .flat_map(|(word_idx, &word)| SetBits {
                word,
                base: word_idx * WORD_BITS,
            })
    }
}

/// Walks one word, lowest set bit first
struct SetBits {
    word: u64,
    base: usize,
}

impl Iterator for SetBits {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.word == 0 {
            return None;
        }
        let bit_idx = self.word.trailing_zeros() as usize;
        self.word &= self.word - 1; // Clear lowest set bit
        Some(self.base + bit_idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_masks_tail() {
        let bits = BitSet::filled(70);
        assert_eq!(bits.len(), 70);
        assert_eq!(bits.count_ones(), 70);
        assert!(bits.test(69));
    }

    #[test]
    fn test_filled_exact_word() {
        assert_eq!(BitSet::filled(128).count_ones(), 128);
        assert_eq!(BitSet::filled(0).count_ones(), 0);
        assert!(BitSet::filled(0).is_empty());
    }

    #[test]
    fn test_set_clear_test() {
        let mut bits = BitSet::empty(200);
        assert_eq!(bits.count_ones(), 0);

        bits.set(0);
        bits.set(63);
        bits.set(64);
        bits.set(199);
        assert!(bits.test(0));
        assert!(bits.test(63));
        assert!(bits.test(64));
        assert!(bits.test(199));
        assert!(!bits.test(1));
        assert_eq!(bits.count_ones(), 4);

        bits.clear(63);
        assert!(!bits.test(63));
        assert!(bits.test(64));
        assert_eq!(bits.count_ones(), 3);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut bits = BitSet::filled(10);
        bits.clear(3);
        bits.clear(3);
        assert_eq!(bits.count_ones(), 9);
    }

    #[test]
    fn test_refill_reuses_buffer() {
        let mut bits = BitSet::empty(256);
        bits.set(200);
        let capacity = bits.words.capacity();

        bits.refill(100);
        assert_eq!(bits.len(), 100);
        assert_eq!(bits.count_ones(), 100);
        assert_eq!(bits.words.capacity(), capacity);

        bits.clear(7);
        bits.refill(70);
        assert_eq!(bits.count_ones(), 70);
        assert!(bits.test(7));
    }

    #[test]
    fn test_iter_ones_ascending() {
        let mut bits = BitSet::filled(130);
        for idx in 0..130 {
            if idx % 3 != 0 {
                bits.clear(idx);
            }
        }

        let ones: Vec<usize> = bits.iter_ones().collect();
        let expected: Vec<usize> = (0..130).step_by(3).collect();
        assert_eq!(ones, expected);
    }
}
