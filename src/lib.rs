//! Spatial context entropy coding of block grids.
//!
//! A [`BlockRegion`] is coded block by block in Y-Z-X order. The ids of a
//! block's already coded neighbors select an adaptive [`SpatialContext`],
//! which codes the block as its rank in a frequency-damped move-to-front
//! ordering of the palette. Ranks go through a [`RangeIntegerCoder`] built
//! from [`BitProbability`] counters, all sharing one binary arithmetic coder.

pub mod codec;
pub mod counters;
pub mod dump;
pub mod entropy_coding;
pub mod error;
pub mod helpers;
pub mod macros;
pub mod models;
pub mod region;

mod hashmap;

pub use codec::{BlockCodec, CodecSettings, NoProgress, Progress};
pub use counters::BitProbability;
pub use error::{Error, Result};
pub use models::{RangeIntegerCoder, SpatialContext};
pub use region::{BlockId, BlockRegion, Dimensions, Offset};
