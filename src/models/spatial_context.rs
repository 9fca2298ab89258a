use crate::entropy_coding::{ACRead, ACWrite, ArithmeticCoder};
use crate::error::{Error, Result};
use crate::models::RangeIntegerCoder;
use crate::region::BlockId;

/// Leading entries checked before falling back to a full scan
const SCAN_AHEAD: usize = 4;
/// Hits per step of the frequency damping divisor
const DAMPING: u32 = 32;

/// Adaptive ranking of the palette for one neighborhood.
///
/// A block is coded as its rank in `order`, then promoted towards the front
/// past every entry whose damped frequency doesn't beat its own. Every
/// context starts from the full palette, so no block is ever unknown.
#[derive(Clone, Debug)]
pub struct SpatialContext {
    order: Vec<BlockId>,
    freq: Vec<u32>,
    hits: u32,
    coder: RangeIntegerCoder,
}

impl SpatialContext {
    pub fn new(palette_len: usize) -> Self {
        Self {
            order: (0..palette_len).map(|id| crate::u16!(id)).collect(),
            freq: vec![0; palette_len],
            hits: 0,
            coder: RangeIntegerCoder::new(),
        }
    }

    pub fn write<W: ACWrite>(&mut self, ac: &mut ArithmeticCoder<W>, id: BlockId) -> Result<()> {
        let pos = self
            .position(id)
            .ok_or(Error::BlockIdOutOfRange { id, palette_len: self.order.len() })?;
        let max_rank = self.max_rank();
        self.coder.write(ac, crate::u16!(pos).into(), 0, max_rank)?;
        self.promote(pos);
        Ok(())
    }

    pub fn read<R: ACRead>(&mut self, ac: &mut ArithmeticCoder<R>) -> Result<BlockId> {
        let max_rank = self.max_rank();
        let rank = self.coder.read(ac, 0, max_rank)?;
        let pos = usize::try_from(rank)
            .ok()
            .filter(|&pos| pos < self.order.len())
            .ok_or(Error::Corrupt("palette rank out of range"))?;
        let id = self.order[pos];
        self.promote(pos);
        Ok(id)
    }

    /// Current rank of `id`, recently promoted blocks are usually found early
    pub fn position(&self, id: BlockId) -> Option<usize> {
        let head = self.order.len().min(SCAN_AHEAD);
        self.order[..head]
            .iter()
            .position(|&other| other == id)
            .or_else(|| self.order[head..].iter().position(|&other| other == id).map(|pos| pos + head))
    }

    pub fn order(&self) -> &[BlockId] {
        &self.order
    }

    fn max_rank(&self) -> i32 {
        crate::u16!(self.order.len() - 1).into()
    }

    fn weight(&self, id: BlockId, scale: u32) -> u32 {
        self.freq[usize::from(id)] / scale
    }

    fn promote(&mut self, mut pos: usize) {
        let id = self.order[pos];
        let scale = 1 + self.hits / DAMPING;
        let weight = self.weight(id, scale);

        while pos > 0 {
            let prev = self.order[pos - 1];
            if self.weight(prev, scale) >= weight + 1 {
                break;
            }
            self.order[pos] = prev;
            pos -= 1;
        }
        self.order[pos] = id;

        self.freq[usize::from(id)] += 1;
        self.hits += 1;
    }
}
