pub mod ac_io;
#[cfg(test)]
mod tests;

use std::io;

/// Width of a probability in bits
pub const PROB_BITS: u32 = u16::BITS;
/// Probability of certainty, estimates live in the open interval `(0, PROB_ONE)`
pub const PROB_ONE: u32 = 1 << PROB_BITS;

const PREC_SHIFT: u32 = u32::BITS - 1; // 31
const Q1: u32 = 1 << (PREC_SHIFT - 1); // 0x40000000, 1 = 0b01, quarter 1
const Q2: u32 = 2 << (PREC_SHIFT - 1); // 0x80000000, 2 = 0b10, range middle
const Q3: u32 = 3 << (PREC_SHIFT - 1); // 0xC0000000, 3 = 0b11, quarter 3
const RLO_MOD: u32 = (1 << PREC_SHIFT) - 1; // 0x7FFFFFFF, range low modify
const RHI_MOD: u32 = (1 << PREC_SHIFT) + 1; // 0x80000001, range high modify

/// The `ArithmeticCoder` encodes/decodes bits given the probability of a 0 bit.
///
/// One coder carries the interval state of a whole region pass. The encoder side
/// is consumed by [`ArithmeticCoder::flush`], so nothing can be written after it.
pub struct ArithmeticCoder<T> {
    x1: u32, // low
    x2: u32, // high
    x: u32,  // state
    io: T,   // bit reader/writer
}

pub trait ACRead {
    /// Read the next bit, `UnexpectedEof` past the end of the stream
    fn read_bit(&mut self) -> io::Result<u8>;
    /// Read 4 bytes BE as u32
    fn read_u32(&mut self) -> io::Result<u32>;
}

pub trait ACWrite {
    /// Increases the number of reverse bits to write
    fn inc_parity(&mut self);
    /// Writes a bit and maintains E3 mapping logic
    fn write_bit(&mut self, bit: impl TryInto<u8>) -> io::Result<()>;
    /// Writes the full coder state, leftover parity bits and pads to a byte
    fn flush(&mut self, state: u32) -> io::Result<()>;
}

impl<W: ACWrite> ArithmeticCoder<W> {
    pub fn new_coder(writer: W) -> Self {
        Self { io: writer, x1: 0, x2: u32::MAX, x: 0 }
    }

    /// Encodes `bit` where `prob` is the chance of a 0 bit, in `1..PROB_ONE`
    pub fn encode(&mut self, bit: u8, prob: u16) -> io::Result<()> {
        let xmid = lerp(self.x1, self.x2, prob);

        // Update range (kinda like binary search), 0 takes the low part
        match bit {
            0 => self.x2 = xmid,
            _ => self.x1 = xmid + 1,
        }

        // Renormalize range -> write matching bits to stream
        while ((self.x1 ^ self.x2) >> PREC_SHIFT) == 0 {
            self.io.write_bit(self.x1 >> PREC_SHIFT)?;
            self.x1 <<= 1;
            self.x2 = (self.x2 << 1) | 1;
        }

        // E3 renorm (special case) -> increase parity
        while self.x1 >= Q1 && self.x2 < Q3 {
            self.io.inc_parity();
            self.x1 = (self.x1 << 1) & RLO_MOD;
            self.x2 = (self.x2 << 1) | RHI_MOD;
        }

        Ok(())
    }

    /// Terminates the stream and hands back the writer
    pub fn flush(mut self) -> io::Result<W> {
        // assert state is normalized
        debug_assert!(self.x1 >> PREC_SHIFT == 0 && self.x2 >> PREC_SHIFT == 1);
        self.io.flush(self.x2)?;
        Ok(self.io)
    }
}

impl<R: ACRead> ArithmeticCoder<R> {
    pub fn new_decoder(mut reader: R) -> io::Result<Self> {
        let x = reader.read_u32()?;
        Ok(Self { io: reader, x1: 0, x2: u32::MAX, x })
    }

    /// Decodes a bit written with the same `prob`
    pub fn decode(&mut self, prob: u16) -> io::Result<u8> {
        let xmid = lerp(self.x1, self.x2, prob);
        let bit = u8::from(self.x > xmid);

        // Update range (kinda like binary search)
        match bit {
            0 => self.x2 = xmid,
            _ => self.x1 = xmid + 1,
        }

        // Renormalize range -> read new bits from stream
        while ((self.x1 ^ self.x2) >> PREC_SHIFT) == 0 {
            self.x1 <<= 1;
            self.x2 = (self.x2 << 1) | 1;
            self.x = (self.x << 1) | u32::from(self.io.read_bit()?);
        }

        // E3 renorm (special case) -> fix parity
        while self.x1 >= Q1 && self.x2 < Q3 {
            self.x1 = (self.x1 << 1) & RLO_MOD;
            self.x2 = (self.x2 << 1) | RHI_MOD;
            self.x = ((self.x << 1) ^ Q2) | u32::from(self.io.read_bit()?);
        }

        Ok(bit)
    }

    pub fn into_inner(self) -> R {
        self.io
    }
}

#[inline(always)]
fn lerp(x1: u32, x2: u32, prob: u16) -> u32 {
    debug_assert!(prob > 0, "a 0 bit can't be impossible");
    let range = u64::from(x2 - x1);
    let lerped_range = (range * u64::from(prob)) >> PROB_BITS;

    // no overflows, range < 2^32 and prob < 2^16, lerped_range < range
    let xmid = x1 + crate::u32!(lerped_range);
    debug_assert!(xmid >= x1 && xmid < x2);
    xmid
}
