mod progress;
mod settings;

pub use self::progress::*;
pub use self::settings::*;

use std::io::{Read, Write};

use log::debug;

use crate::entropy_coding::{
    ac_io::{ACReader, ACWriter},
    ACWrite, ArithmeticCoder,
};
use crate::error::Result;
use crate::hashmap::{context_key, ContextTable};
use crate::region::{zeroed_blocks, BlockCursor, BlockId, BlockRegion, Offset};

/// Blocks coded between two progress reports
pub const PROGRESS_INTERVAL: usize = 4096;

/// Codes a block region as a single arithmetic coded stream.
///
/// Blocks are visited in Y-Z-X order. Each block picks a context from the ids
/// of its already coded neighbors and is coded as its rank in that context's
/// adaptive palette order. Contexts live only as long as one pass, so every
/// region is coded independently of any other.
///
/// A codec does one pass: `encode` and `decode` consume it.
#[derive(Debug, Clone)]
pub struct BlockCodec {
    settings: CodecSettings,
}

impl BlockCodec {
    pub fn new(settings: CodecSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &CodecSettings {
        &self.settings
    }

    /// Writes the settings preamble a decoder needs to mirror this codec
    pub fn write_settings<W: Write>(&self, writer: W) -> Result<()> {
        self.settings.write_to(writer)
    }

    /// Builds a codec from a settings preamble, rejecting anything it can't decode exactly
    pub fn read_settings<R: Read>(reader: R) -> Result<Self> {
        Self::new(CodecSettings::read_from(reader)?)
    }

    /// Encodes `region` and flushes the coder, returning the writer.
    pub fn encode<W: Write>(
        self,
        region: &BlockRegion,
        writer: W,
        progress: &mut impl Progress,
    ) -> Result<W> {
        let writer = self.encode_with(region, ACWriter::new(writer), progress)?;
        debug!("encoded {} region into {} bytes", region.dims(), writer.written());
        Ok(writer.into_inner())
    }

    /// Decodes a stream written by [`BlockCodec::encode`] into `region`.
    ///
    /// `region` supplies the dimensions and palette length the stream was
    /// encoded with. Its blocks are replaced only once the whole stream has
    /// decoded, on error they are left untouched.
    pub fn decode<R: Read>(
        self,
        reader: R,
        region: &mut BlockRegion,
        progress: &mut impl Progress,
    ) -> Result<()> {
        let dims = region.dims();
        let palette_len = region.palette_len();
        debug!("decoding {dims} region, palette of {palette_len}, {}", self.settings);

        let mut ac = ArithmeticCoder::new_decoder(ACReader::new(reader))?;
        let mut table = ContextTable::new(self.settings.context_bits, palette_len);
        let mut cursor = BlockCursor::new(dims);
        let mut blocks = zeroed_blocks(dims.volume())?;

        while !cursor.is_done() {
            let key = neighbor_key(&self.settings.neighbors, &cursor, &blocks);
            blocks[cursor.index()] = table.get_or_create(key).read(&mut ac)?;
            cursor.advance();
            report(&cursor, dims.volume(), progress);
        }
        progress.advance(1.0);

        debug!(
            "decoded {dims} region from {} bytes, {} contexts",
            ac.into_inner().consumed(),
            table.created()
        );
        region.replace_blocks(blocks);
        Ok(())
    }

    /// Runs the encoder over any coder io, used directly for size estimates
    pub(crate) fn encode_with<A: ACWrite>(
        self,
        region: &BlockRegion,
        io: A,
        progress: &mut impl Progress,
    ) -> Result<A> {
        let dims = region.dims();
        debug!("encoding {dims} region, palette of {}, {}", region.palette_len(), self.settings);

        let mut ac = ArithmeticCoder::new_coder(io);
        let mut table = ContextTable::new(self.settings.context_bits, region.palette_len());
        let mut cursor = BlockCursor::new(dims);
        let blocks = region.blocks();

        while !cursor.is_done() {
            let key = neighbor_key(&self.settings.neighbors, &cursor, blocks);
            table.get_or_create(key).write(&mut ac, blocks[cursor.index()])?;
            cursor.advance();
            report(&cursor, dims.volume(), progress);
        }
        progress.advance(1.0);

        debug!("{} contexts used", table.created());
        Ok(ac.flush()?)
    }
}

fn neighbor_key(neighbors: &[Offset], cursor: &BlockCursor, blocks: &[BlockId]) -> u64 {
    context_key(neighbors.iter().map(|&offset| cursor.block_id(blocks, offset)))
}

fn report(cursor: &BlockCursor, total: usize, progress: &mut impl Progress) {
    let done = cursor.index();
    if done % PROGRESS_INTERVAL == 0 && done < total {
        progress.advance(done as f64 / total as f64);
    }
}
