use std::io;

use crate::codec::{BlockCodec, NoProgress};
use crate::entropy_coding::ACWrite;
use crate::error::Result;
use crate::region::BlockRegion;

/// Coder io that only counts the bits it would have written
#[derive(Debug, Default)]
pub struct ACStats {
    bit_count: u64,
    rev_bits: u64,
}

impl ACStats {
    pub fn new() -> Self {
        Self { bit_count: 0, rev_bits: 0 }
    }

    /// Bytes the stream takes once flushed
    pub fn result(&self) -> u64 {
        self.bit_count.div_ceil(8)
    }
}

impl ACWrite for ACStats {
    fn inc_parity(&mut self) {
        self.rev_bits += 1;
    }

    fn write_bit(&mut self, _bit: impl TryInto<u8>) -> io::Result<()> {
        self.bit_count += 1 + self.rev_bits;
        self.rev_bits = 0;
        Ok(())
    }

    fn flush(&mut self, _state: u32) -> io::Result<()> {
        self.bit_count += u64::from(u32::BITS) + self.rev_bits;
        self.rev_bits = 0;
        Ok(())
    }
}

/// Size of the coded blocks of `region`, without the settings preamble
pub fn estimate_size(codec: BlockCodec, region: &BlockRegion) -> Result<u64> {
    let stats = codec.encode_with(region, ACStats::new(), &mut NoProgress)?;
    Ok(stats.result())
}
