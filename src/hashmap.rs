// (c) 2022 Dimitar Rusev <mitikodev@gmail.com> licensed under GPL-3.0

use log::trace;

use crate::models::SpatialContext;
use crate::region::BlockId;

const MIX1: u64 = 0x9E37_79B9_7F4A_7C15;
const MIX2: u64 = 0xBF58_476D_1CE4_E5B9;

/// Sparse table of `1 << context_bits` lazily created contexts.
///
/// Slots are picked by the high bits of the hashed neighbor key and live
/// for a single encode or decode pass.
pub struct ContextTable {
    slots: Vec<Option<Box<SpatialContext>>>,
    context_bits: u8,
    palette_len: usize,
    created: usize,
}

impl ContextTable {
    pub fn new(context_bits: u8, palette_len: usize) -> Self {
        debug_assert!((1..=16).contains(&context_bits));
        let mut slots = Vec::new();
        slots.resize_with(1 << context_bits, || None);
        Self { slots, context_bits, palette_len, created: 0 }
    }

    /// Uses high bits of hash first
    pub fn slot_index(&self, key: u64) -> usize {
        crate::usize!(hash_key(key) >> (u64::BITS - u32::from(self.context_bits)))
    }

    pub fn get_or_create(&mut self, key: u64) -> &mut SpatialContext {
        let index = self.slot_index(key);
        let palette_len = self.palette_len;
        let slot = &mut self.slots[index];
        if slot.is_none() {
            trace!("creating context in slot {index} for key {key:#018x}");
            self.created += 1;
        }
        slot.get_or_insert_with(|| Box::new(SpatialContext::new(palette_len)))
    }

    /// Number of contexts created so far
    pub fn created(&self) -> usize {
        self.created
    }
}

/// Packs up to 4 neighbor ids into a context key, first neighbor in the high bits
pub fn context_key(neighbors: impl IntoIterator<Item = BlockId>) -> u64 {
    neighbors.into_iter().fold(0, |key, id| (key << BlockId::BITS) | u64::from(id))
}

/// Two rounds of multiply-xorshift, every key bit reaches the top bits
pub fn hash_key(key: u64) -> u64 {
    let mut h = key.wrapping_mul(MIX1);
    h ^= h >> 31;
    h = h.wrapping_mul(MIX2);
    h ^ (h >> 29)
}
