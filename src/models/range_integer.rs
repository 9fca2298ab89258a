use std::io;

use crate::counters::BitProbability;
use crate::entropy_coding::{ACRead, ACWrite, ArithmeticCoder};

/// Bit width of the largest magnitude the coder accepts
pub const MAX_BITS: usize = 16;

/// Codes integers whose bounds `[min, max]` are known to both sides.
///
/// A nonzero value is sent as a sign, a unary exponent and the mantissa bits
/// below its leading one, every decision on its own adaptive probability.
/// Decisions the bounds already settle are never coded, so a range of one
/// value costs nothing and a range of two costs a single decision.
#[derive(Clone, Debug)]
pub struct RangeIntegerCoder {
    zero: BitProbability,
    sign: BitProbability,
    exponent: [[BitProbability; MAX_BITS - 1]; 2], // [sign][exponent]
    mantissa: [BitProbability; MAX_BITS],
}

impl Default for RangeIntegerCoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RangeIntegerCoder {
    pub fn new() -> Self {
        Self {
            zero: BitProbability::new(),
            sign: BitProbability::new(),
            exponent: [[BitProbability::new(); MAX_BITS - 1]; 2],
            mantissa: [BitProbability::new(); MAX_BITS],
        }
    }

    pub fn write<W: ACWrite>(
        &mut self,
        ac: &mut ArithmeticCoder<W>,
        value: i32,
        min: i32,
        max: i32,
    ) -> io::Result<()> {
        assert!(min <= value && value <= max, "{value} is outside of [{min}, {max}]");
        if min == max {
            return Ok(());
        }

        if min <= 0 && 0 <= max {
            self.zero.write(ac, u8::from(value == 0))?;
            if value == 0 {
                return Ok(());
            }
        }

        let negative = value < 0;
        if min < 0 && max > 0 {
            self.sign.write(ac, u8::from(negative))?;
        }

        let (amin, amax) = magnitude_bounds(min, max, negative);
        let a = value.unsigned_abs();
        let e = floor_log2(a);

        let exponent = &mut self.exponent[usize::from(negative)];
        for candidate in floor_log2(amin)..floor_log2(amax) {
            let hit = candidate == e;
            exponent[crate::usize!(candidate)].write(ac, u8::from(hit))?;
            if hit {
                break;
            }
        }

        let (lo, hi) = mantissa_bounds(amin, amax, e);
        let mut have = 1 << e;
        for i in (0..e).rev() {
            let bit = (a >> i) & 1;
            match forced_bit(have, i, lo, hi) {
                Some(forced) => debug_assert_eq!(forced, bit),
                None => self.mantissa[crate::usize!(i)].write(ac, crate::u8!(bit))?,
            }
            have |= bit << i;
        }

        Ok(())
    }

    pub fn read<R: ACRead>(
        &mut self,
        ac: &mut ArithmeticCoder<R>,
        min: i32,
        max: i32,
    ) -> io::Result<i32> {
        assert!(min <= max, "empty range [{min}, {max}]");
        if min == max {
            return Ok(min);
        }

        if min <= 0 && 0 <= max && self.zero.read(ac)? == 1 {
            return Ok(0);
        }

        let negative = if min < 0 && max > 0 {
            self.sign.read(ac)? == 1
        } else {
            max <= 0
        };

        let (amin, amax) = magnitude_bounds(min, max, negative);
        let emax = floor_log2(amax);

        let exponent = &mut self.exponent[usize::from(negative)];
        let mut e = floor_log2(amin);
        while e < emax && exponent[crate::usize!(e)].read(ac)? == 0 {
            e += 1;
        }

        let (lo, hi) = mantissa_bounds(amin, amax, e);
        let mut have = 1 << e;
        for i in (0..e).rev() {
            let bit = match forced_bit(have, i, lo, hi) {
                Some(forced) => forced,
                None => u32::from(self.mantissa[crate::usize!(i)].read(ac)?),
            };
            have |= bit << i;
        }

        // mantissa bounds keep the magnitude inside [amin, amax]
        debug_assert!(amin <= have && have <= amax);
        let value = i32::from(crate::u16!(have));
        Ok(if negative { -value } else { value })
    }
}

/// Range of magnitudes left for a nonzero value of the given sign
fn magnitude_bounds(min: i32, max: i32, negative: bool) -> (u32, u32) {
    let (amin, amax) = if negative {
        (max.min(-1).unsigned_abs(), min.unsigned_abs())
    } else {
        (min.max(1).unsigned_abs(), max.unsigned_abs())
    };
    debug_assert!(1 <= amin && amin <= amax);
    assert!(amax < 1 << MAX_BITS, "magnitude {amax} needs more than {MAX_BITS} bits");
    (amin, amax)
}

/// Magnitudes with exponent `e` that are still inside `[amin, amax]`
fn mantissa_bounds(amin: u32, amax: u32, e: u32) -> (u32, u32) {
    (amin.max(1 << e), amax.min((2 << e) - 1))
}

/// The value of bit `i` if only one keeps the prefix `have` inside `[lo, hi]`
fn forced_bit(have: u32, i: u32, lo: u32, hi: u32) -> Option<u32> {
    let half = 1 << i;
    let zero_fits = have <= hi && have + half - 1 >= lo;
    let one_fits = have + half <= hi && have + 2 * half - 1 >= lo;
    match (zero_fits, one_fits) {
        (true, true) => None,
        (false, _) => Some(1),
        (true, false) => Some(0),
    }
}

fn floor_log2(a: u32) -> u32 {
    debug_assert!(a > 0);
    u32::BITS - 1 - a.leading_zeros()
}
