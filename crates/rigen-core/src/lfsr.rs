//! Fibonacci-style linear-feedback shift register.
//!
//! `order = ceil(log2(feed))`, `max_val = 2^order - 1`. Each draw shifts the
//! register right by one and XORs in `feed` when the bit shifted out was set.
//!
//! A register that reaches 0 stays at 0 forever. That fixed point is a
//! property of the chosen feed/seed pair and is deliberately left alone.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Register word.
pub type LfsrWord = u64;

/// Deterministic pseudo-random source.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lfsr {
    feed: LfsrWord,
    register: LfsrWord,
}

impl Lfsr {
    /// Construct with a feedback polynomial and an initial register value.
    ///
    /// `feed` must be non-zero; the seed is taken as-is (including 0).
    pub fn new(feed: LfsrWord, seed: LfsrWord) -> Result<Self> {
        ensure!(feed != 0, "lfsr feed polynomial must be non-zero");
        Ok(Self {
            feed,
            register: seed,
        })
    }

    /// Bit order of the feed: `ceil(log2(feed))`.
    #[inline]
    #[must_use]
    pub const fn order(&self) -> u32 {
        if self.feed <= 1 {
            0
        } else {
            LfsrWord::BITS - (self.feed - 1).leading_zeros()
        }
    }

    /// Largest value the opcode ranges are laid out over: `2^order - 1`.
    #[inline]
    #[must_use]
    pub const fn max_val(&self) -> LfsrWord {
        match 1u64.checked_shl(self.order()) {
            Some(v) => v - 1,
            None => LfsrWord::MAX,
        }
    }

    /// Advance one step and return the new register value.
    #[inline]
    pub fn next_value(&mut self) -> LfsrWord {
        self.register = if self.register & 1 == 1 {
            (self.register >> 1) ^ self.feed
        } else {
            self.register >> 1
        };
        self.register
    }

    /// Current register contents.
    #[inline]
    #[must_use]
    pub const fn register(&self) -> LfsrWord {
        self.register
    }

    /// Feedback polynomial (fixed for the lifetime of the register).
    #[inline]
    #[must_use]
    pub const fn feed(&self) -> LfsrWord {
        self.feed
    }
}

impl Iterator for Lfsr {
    type Item = LfsrWord;

    #[inline]
    fn next(&mut self) -> Option<LfsrWord> {
        Some(self.next_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_and_max_val() {
        let l = Lfsr::new(0xF82F, 1).unwrap();
        assert_eq!(l.order(), 16);
        assert_eq!(l.max_val(), 65_535);

        let l = Lfsr::new(7, 1).unwrap();
        assert_eq!(l.order(), 3);
        assert_eq!(l.max_val(), 7);

        // Exact powers of two do not round up.
        let l = Lfsr::new(8, 1).unwrap();
        assert_eq!(l.order(), 3);
        assert_eq!(l.max_val(), 7);

        let l = Lfsr::new(1, 1).unwrap();
        assert_eq!(l.order(), 0);
        assert_eq!(l.max_val(), 0);

        let l = Lfsr::new(u64::MAX, 1).unwrap();
        assert_eq!(l.order(), 64);
        assert_eq!(l.max_val(), u64::MAX);
    }

    #[test]
    fn feed_seven_cycles() {
        let l = Lfsr::new(7, 1).unwrap();
        let draws: Vec<_> = l.take(8).collect();
        assert_eq!(draws, vec![7, 4, 2, 1, 7, 4, 2, 1]);
    }

    #[test]
    fn zero_register_is_a_fixed_point() {
        let mut l = Lfsr::new(0xF82F, 0).unwrap();
        for _ in 0..16 {
            assert_eq!(l.next_value(), 0);
        }
        assert_eq!(l.feed(), 0xF82F);
    }

    #[test]
    fn zero_feed_is_rejected() {
        assert!(Lfsr::new(0, 1).is_err());
    }

    #[test]
    fn draws_stay_below_feed_order() {
        let mut l = Lfsr::new(0xF82F, 1).unwrap();
        let max = l.max_val();
        for _ in 0..10_000 {
            let v = l.next_value();
            assert!(v <= max);
        }
    }
}
