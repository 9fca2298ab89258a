//! File framing for single regions, as read and written by the command line tools.
//!
//! A block dump is the magic `APBD`, the region header and every block id in
//! Y-Z-X order. A packed file is the magic `APPK`, the same header, the codec
//! settings preamble and the coded blocks. Integers are little endian.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::debug;

use crate::codec::{BlockCodec, Progress};
use crate::error::{Error, Result};
use crate::region::{BlockRegion, Dimensions, MAX_REGION_VOLUME};

pub const DUMP_MAGIC: [u8; 4] = *b"APBD";
pub const PACKED_MAGIC: [u8; 4] = *b"APPK";

/// Header bytes following the magic
pub const HEADER_LEN: usize = 3 * 2 + 4;

/// Block ids read per call, the buffer only grows as data arrives
const READ_CHUNK: usize = 4096;

pub fn write_dump<W: Write>(region: &BlockRegion, mut writer: W) -> Result<W> {
    writer.write_all(&DUMP_MAGIC)?;
    write_header(region, &mut writer)?;
    for &id in region.blocks() {
        writer.write_u16::<LittleEndian>(id)?;
    }
    writer.flush()?;
    Ok(writer)
}

pub fn read_dump<R: Read>(mut reader: R) -> Result<BlockRegion> {
    expect_magic(&mut reader, DUMP_MAGIC)?;
    let (dims, palette_len) = read_header(&mut reader)?;
    let volume = dims.volume();
    let mut blocks = Vec::new();
    let mut buf = [0; READ_CHUNK];
    while blocks.len() < volume {
        let chunk = &mut buf[..READ_CHUNK.min(volume - blocks.len())];
        reader.read_u16_into::<LittleEndian>(chunk)?;
        blocks.extend_from_slice(chunk);
    }
    BlockRegion::from_blocks(dims, palette_len, blocks)
}

pub fn write_packed<W: Write>(
    region: &BlockRegion,
    codec: BlockCodec,
    mut writer: W,
    progress: &mut impl Progress,
) -> Result<W> {
    writer.write_all(&PACKED_MAGIC)?;
    write_header(region, &mut writer)?;
    codec.write_settings(&mut writer)?;
    let mut writer = codec.encode(region, writer, progress)?;
    writer.flush()?;
    Ok(writer)
}

pub fn read_packed<R: Read>(mut reader: R, progress: &mut impl Progress) -> Result<BlockRegion> {
    expect_magic(&mut reader, PACKED_MAGIC)?;
    let (dims, palette_len) = read_header(&mut reader)?;
    let codec = BlockCodec::read_settings(&mut reader)?;
    debug!("packed {dims} region with {}", codec.settings());

    let mut region = BlockRegion::new(dims, palette_len)?;
    codec.decode(reader, &mut region, progress)?;
    Ok(region)
}

fn write_header<W: Write>(region: &BlockRegion, writer: &mut W) -> Result<()> {
    let dims = region.dims();
    let side = |len: usize| u16::try_from(len).map_err(|_| Error::RegionTooLarge(dims));
    writer.write_u16::<LittleEndian>(side(dims.width)?)?;
    writer.write_u16::<LittleEndian>(side(dims.height)?)?;
    writer.write_u16::<LittleEndian>(side(dims.depth)?)?;
    // palettes hold at most 2^16 entries
    writer.write_u32::<LittleEndian>(crate::u32!(region.palette_len()))?;
    Ok(())
}

fn read_header<R: Read>(reader: &mut R) -> Result<(Dimensions, usize)> {
    let width = usize::from(reader.read_u16::<LittleEndian>()?);
    let height = usize::from(reader.read_u16::<LittleEndian>()?);
    let depth = usize::from(reader.read_u16::<LittleEndian>()?);
    let palette_len = crate::usize!(reader.read_u32::<LittleEndian>()?);

    let volume = width.checked_mul(height).and_then(|area| area.checked_mul(depth));
    if !volume.is_some_and(|volume| volume <= MAX_REGION_VOLUME) {
        return Err(Error::Corrupt("region volume out of range"));
    }
    Ok((Dimensions::new(width, height, depth), palette_len))
}

fn expect_magic<R: Read>(reader: &mut R, magic: [u8; 4]) -> Result<()> {
    let mut found = [0; 4];
    reader.read_exact(&mut found)?;
    match found == magic {
        true => Ok(()),
        false => Err(Error::Corrupt("unrecognized file magic")),
    }
}
