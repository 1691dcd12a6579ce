//! Deterministic pseudo-random numbers for transaction ids and timer jitter.
//!
//! None of these values are security sensitive, so a small generator
//! seeded by the caller is enough.

use core::ops::Range;

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rand {
    state: u64,
}

impl Rand {
    pub const fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn rand_u32(&mut self) -> u32 {
        // sPCG32 from https://www.pcg-random.org/paper.html
        // see also https://nullprogram.com/blog/2017/09/21/
        const M: u64 = 0xbb2efcec3c39611d;
        const A: u64 = 0x7590ef39;

        let s = self.state.wrapping_mul(M).wrapping_add(A);
        self.state = s;

        let shift = 29 - (s >> 61);
        (s >> shift) as u32
    }

    /// A value uniformly-ish distributed in `range`, or `range.start` if the
    /// range is empty.
    pub fn rand_range(&mut self, range: Range<u64>) -> u64 {
        let span = range.end.saturating_sub(range.start);
        if span == 0 {
            return range.start;
        }
        let n = ((self.rand_u32() as u64) << 32) | self.rand_u32() as u64;
        range.start + n % span
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = Rand::new(0x1234);
        let mut b = Rand::new(0x1234);
        for _ in 0..16 {
            assert_eq!(a.rand_u32(), b.rand_u32());
        }
    }

    #[test]
    fn test_range_bounds() {
        let mut rand = Rand::new(7);
        for _ in 0..1000 {
            let n = rand.rand_range(1000..2000);
            assert!((1000..2000).contains(&n));
        }
    }

    #[test]
    fn test_empty_range() {
        let mut rand = Rand::new(7);
        assert_eq!(rand.rand_range(5..5), 5);
        #[allow(clippy::reversed_empty_ranges)]
        let reversed = 9..3;
        assert_eq!(rand.rand_range(reversed), 9);
    }
}
