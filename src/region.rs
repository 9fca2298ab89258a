use std::fmt::{self, Display};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Index of a block state inside a region's palette.
pub type BlockId = u16;

/// Id a neighbor reads as when it lies outside of the region.
pub const OUTSIDE: BlockId = BlockId::MAX;

/// Largest palette a `BlockId` can address.
pub const MAX_PALETTE_LEN: usize = 1 << BlockId::BITS;

/// Largest region accepted from a stream, 512 blocks on every side.
pub const MAX_REGION_VOLUME: usize = 1 << 27;

/// Relative position of a neighbor block.
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Hash, Copy, Clone)]
pub struct Offset {
    pub x: i8,
    pub y: i8,
    pub z: i8,
}

impl Offset {
    pub const fn new(x: i8, y: i8, z: i8) -> Offset {
        Offset { x, y, z }
    }

    /// Whether the offset points at a block visited earlier in Y-Z-X order.
    pub fn is_causal(&self) -> bool {
        self.y < 0 || (self.y == 0 && (self.z < 0 || (self.z == 0 && self.x < 0)))
    }
}

impl Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl FromStr for Offset {
    type Err = String;

    /// Parses `"dx,dy,dz"`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|part| part.trim().parse::<i8>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|err| format!("invalid offset '{s}': {err}"))?;

        match parts[..] {
            [x, y, z] => Ok(Offset::new(x, y, z)),
            _ => Err(format!("invalid offset '{s}': expected 3 components")),
        }
    }
}

/// Size of a region in blocks.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone)]
pub struct Dimensions {
    /// Extent along X, the fastest moving axis.
    pub width: usize,
    /// Extent along Y, the slowest moving axis.
    pub height: usize,
    /// Extent along Z.
    pub depth: usize,
}

impl Dimensions {
    pub const fn new(width: usize, height: usize, depth: usize) -> Dimensions {
        Dimensions { width, height, depth }
    }

    pub const fn volume(&self) -> usize {
        self.width * self.height * self.depth
    }

    pub(crate) fn index(&self, x: usize, y: usize, z: usize) -> usize {
        debug_assert!(x < self.width, "Block x coordinate out of bounds");
        debug_assert!(y < self.height, "Block y coordinate out of bounds");
        debug_assert!(z < self.depth, "Block z coordinate out of bounds");

        (y * self.depth + z) * self.width + x
    }
}

impl Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.depth)
    }
}

/// A dense grid of block ids over a fixed palette, stored in Y-Z-X order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRegion {
    dims: Dimensions,
    palette_len: usize,
    blocks: Vec<BlockId>,
}

impl BlockRegion {
    /// Creates a region filled with palette entry 0.
    pub fn new(dims: Dimensions, palette_len: usize) -> Result<Self> {
        validate_palette(palette_len)?;
        Ok(BlockRegion { dims, palette_len, blocks: zeroed_blocks(dims.volume())? })
    }

    pub fn from_blocks(dims: Dimensions, palette_len: usize, blocks: Vec<BlockId>) -> Result<Self> {
        validate_palette(palette_len)?;
        if blocks.len() != dims.volume() {
            return Err(Error::RegionSizeMismatch { expected: dims.volume(), actual: blocks.len() });
        }
        if let Some(&id) = blocks.iter().find(|&&id| usize::from(id) >= palette_len) {
            return Err(Error::BlockIdOutOfRange { id, palette_len });
        }

        Ok(BlockRegion { dims, palette_len, blocks })
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    pub fn palette_len(&self) -> usize {
        self.palette_len
    }

    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    /// Swaps in a fully decoded block buffer.
    pub(crate) fn replace_blocks(&mut self, blocks: Vec<BlockId>) {
        debug_assert_eq!(blocks.len(), self.blocks.len());
        self.blocks = blocks;
    }

    pub fn into_blocks(self) -> Vec<BlockId> {
        self.blocks
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> BlockId {
        self.blocks[self.dims.index(x, y, z)]
    }

    pub fn set(&mut self, x: usize, y: usize, z: usize, id: BlockId) {
        debug_assert!(usize::from(id) < self.palette_len, "Block id outside of the palette");
        let index = self.dims.index(x, y, z);
        self.blocks[index] = id;
    }
}

/// A zeroed block buffer, allocation failure is an error rather than an abort.
pub(crate) fn zeroed_blocks(volume: usize) -> Result<Vec<BlockId>> {
    let mut blocks = Vec::new();
    blocks
        .try_reserve_exact(volume)
        .map_err(|_| Error::Corrupt("region too large to allocate"))?;
    blocks.resize(volume, 0);
    Ok(blocks)
}

fn validate_palette(palette_len: usize) -> Result<()> {
    match palette_len {
        1..=MAX_PALETTE_LEN => Ok(()),
        _ => Err(Error::InvalidPalette(palette_len)),
    }
}

/// Moving position over a region in Y-Z-X order.
///
/// The cursor doesn't borrow the blocks, so the decoder can read neighbors
/// from the same buffer it's filling.
#[derive(Debug, Clone)]
pub struct BlockCursor {
    dims: Dimensions,
    x: usize,
    y: usize,
    z: usize,
    index: usize,
}

impl BlockCursor {
    pub fn new(dims: Dimensions) -> Self {
        BlockCursor { dims, x: 0, y: 0, z: 0, index: 0 }
    }

    /// Linear index of the current block.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_done(&self) -> bool {
        self.index >= self.dims.volume()
    }

    /// Id of the block at `offset` from the cursor, [`OUTSIDE`] past the region's edges.
    pub fn block_id(&self, blocks: &[BlockId], offset: Offset) -> BlockId {
        match (
            shift(self.x, offset.x, self.dims.width),
            shift(self.y, offset.y, self.dims.height),
            shift(self.z, offset.z, self.dims.depth),
        ) {
            (Some(x), Some(y), Some(z)) => blocks[self.dims.index(x, y, z)],
            _ => OUTSIDE,
        }
    }

    pub fn advance(&mut self) {
        self.index += 1;
        self.x += 1;
        if self.x < self.dims.width {
            return;
        }
        self.x = 0;
        self.z += 1;
        if self.z < self.dims.depth {
            return;
        }
        self.z = 0;
        self.y += 1;
    }
}

fn shift(pos: usize, delta: i8, len: usize) -> Option<usize> {
    let moved = pos.checked_add_signed(isize::from(delta))?;
    (moved < len).then_some(moved)
}

#[cfg(test)]
mod tests {
    use super::{BlockCursor, BlockRegion, Dimensions, Offset, OUTSIDE};
    use crate::error::Error;

    #[test]
    fn causality_follows_scan_order() {
        assert!(Offset::new(-1, 0, 0).is_causal());
        assert!(Offset::new(0, 0, -1).is_causal());
        assert!(Offset::new(5, 0, -1).is_causal());
        assert!(Offset::new(3, -1, 7).is_causal());

        assert!(!Offset::new(0, 0, 0).is_causal());
        assert!(!Offset::new(1, 0, 0).is_causal());
        assert!(!Offset::new(-1, 0, 1).is_causal());
        assert!(!Offset::new(-4, 1, -4).is_causal());
    }

    #[test]
    fn parse_offset() {
        assert_eq!("-1,0,0".parse::<Offset>(), Ok(Offset::new(-1, 0, 0)));
        assert_eq!(" 2, -1 ,3".parse::<Offset>(), Ok(Offset::new(2, -1, 3)));
        assert!("1,2".parse::<Offset>().is_err());
        assert!("1,2,300".parse::<Offset>().is_err());
    }

    #[test]
    fn cursor_walks_y_z_x() {
        let dims = Dimensions::new(3, 2, 2);
        let blocks: Vec<u16> = (0..12).collect();
        let mut cursor = BlockCursor::new(dims);

        for expected in 0..12 {
            assert!(!cursor.is_done());
            assert_eq!(cursor.index(), expected);
            assert_eq!(cursor.block_id(&blocks, Offset::new(0, 0, 0)), expected as u16);
            cursor.advance();
        }
        assert!(cursor.is_done());
    }

    #[test]
    fn neighbors_outside_read_as_sentinel() {
        let dims = Dimensions::new(2, 2, 2);
        let blocks: Vec<u16> = (0..8).collect();
        let mut cursor = BlockCursor::new(dims);
        assert_eq!(cursor.block_id(&blocks, Offset::new(-1, 0, 0)), OUTSIDE);
        assert_eq!(cursor.block_id(&blocks, Offset::new(0, -1, 0)), OUTSIDE);

        (0..7).for_each(|_| cursor.advance()); // (1, 1, 1)
        assert_eq!(cursor.block_id(&blocks, Offset::new(-1, 0, 0)), 6);
        assert_eq!(cursor.block_id(&blocks, Offset::new(0, 0, -1)), 5);
        assert_eq!(cursor.block_id(&blocks, Offset::new(0, -1, 0)), 3);
        assert_eq!(cursor.block_id(&blocks, Offset::new(1, -1, 0)), OUTSIDE);
    }

    #[test]
    fn region_validation() {
        let dims = Dimensions::new(2, 1, 2);
        assert!(matches!(BlockRegion::new(dims, 0), Err(Error::InvalidPalette(0))));
        assert!(matches!(
            BlockRegion::from_blocks(dims, 4, vec![0; 3]),
            Err(Error::RegionSizeMismatch { expected: 4, actual: 3 })
        ));
        assert!(matches!(
            BlockRegion::from_blocks(dims, 4, vec![0, 1, 4, 2]),
            Err(Error::BlockIdOutOfRange { id: 4, palette_len: 4 })
        ));

        let mut region = BlockRegion::new(dims, 4).unwrap();
        region.set(1, 0, 1, 3);
        assert_eq!(region.get(1, 0, 1), 3);
        assert_eq!(region.blocks(), [0, 0, 0, 3]);
    }
}
