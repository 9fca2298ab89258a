use std::io;

use crate::entropy_coding::{ACRead, ACWrite, ArithmeticCoder};

/// Hit count after which the adaptation rate stops slowing down
pub const HIT_LIMIT: u8 = 29;
/// Added to the hit count when computing the adaptation step
const RATE_OFFSET: i32 = 3;

/// Adaptive estimate of the chance that the next bit is 0.
///
/// Each update moves the estimate `1 / (hits + 3)` of the way towards the
/// observed outcome, so young counters adapt quickly and old ones settle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitProbability {
    p: u16,
    hits: u8,
}

impl Default for BitProbability {
    fn default() -> Self {
        Self::new()
    }
}

impl BitProbability {
    pub const fn new() -> Self {
        Self { p: 1 << 15, hits: 0 }
    }

    /// Probability of a 0 bit, never 0 or certain
    pub fn p(&self) -> u16 {
        self.p
    }

    pub fn update(&mut self, bit: u8) {
        let target = if bit == 0 { 1 << u16::BITS } else { 0 };
        let p = i32::from(self.p);
        let next = p + (target - p) / (i32::from(self.hits) + RATE_OFFSET);

        self.p = crate::u16!(next.clamp(1, i32::from(u16::MAX)));
        self.hits = (self.hits + 1).min(HIT_LIMIT);
    }

    pub fn write<W: ACWrite>(&mut self, ac: &mut ArithmeticCoder<W>, bit: u8) -> io::Result<()> {
        ac.encode(bit, self.p)?;
        self.update(bit);
        Ok(())
    }

    pub fn read<R: ACRead>(&mut self, ac: &mut ArithmeticCoder<R>) -> io::Result<u8> {
        let bit = ac.decode(self.p)?;
        self.update(bit);
        Ok(bit)
    }
}
