use std::fmt::{self, Display};
use std::io::{Read, Write};
use std::str::FromStr;

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};
use crate::region::Offset;

/// Settings preamble with one signed byte per offset component
pub const VERSION_WIDE: u8 = 1;
/// Settings preamble with each offset packed into a single byte
pub const VERSION_PACKED: u8 = 2;

pub const MAX_NEIGHBORS: usize = 4;
pub const MAX_CONTEXT_BITS: u8 = 16;

/// How a region's blocks are mapped to contexts.
///
/// Both sides of a stream must agree on these, so the encoder writes them
/// ahead of the coded blocks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CodecSettings {
    /// Width of the context slot index, the table holds `1 << context_bits` contexts.
    pub context_bits: u8,
    /// Causal neighbor offsets, earlier entries land in the high bits of the key.
    pub neighbors: Vec<Offset>,
}

impl Default for CodecSettings {
    fn default() -> Self {
        Self {
            context_bits: 12,
            neighbors: vec![Offset::new(-1, 0, 0), Offset::new(0, -1, 0), Offset::new(0, 0, -1)],
        }
    }
}

impl CodecSettings {
    pub fn new(context_bits: u8, neighbors: Vec<Offset>) -> Result<Self> {
        let settings = Self { context_bits, neighbors };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_CONTEXT_BITS).contains(&self.context_bits) {
            return Err(Error::InvalidContextBits(self.context_bits));
        }
        if self.neighbors.len() > MAX_NEIGHBORS {
            return Err(Error::TooManyNeighbors(self.neighbors.len()));
        }
        match self.neighbors.iter().find(|offset| !offset.is_causal()) {
            Some(&offset) => Err(Error::NonCausalNeighbor(offset)),
            None => Ok(()),
        }
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        self.validate()?;
        let packed: Option<Vec<u8>> = self.neighbors.iter().map(pack).collect();
        match packed {
            Some(bytes) => {
                writer.write_u8(VERSION_PACKED)?;
                writer.write_u8(self.context_bits)?;
                writer.write_u8(crate::u8!(bytes.len()))?;
                writer.write_all(&bytes)?;
            }
            None => {
                writer.write_u8(VERSION_WIDE)?;
                writer.write_u8(self.context_bits)?;
                writer.write_u8(crate::u8!(self.neighbors.len()))?;
                for offset in &self.neighbors {
                    writer.write_i8(offset.x)?;
                    writer.write_i8(offset.y)?;
                    writer.write_i8(offset.z)?;
                }
            }
        }
        Ok(())
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let version = reader.read_u8()?;
        if version != VERSION_WIDE && version != VERSION_PACKED {
            return Err(Error::UnsupportedVersion(version));
        }

        let context_bits = reader.read_u8()?;
        let count = usize::from(reader.read_u8()?);
        if count > MAX_NEIGHBORS {
            return Err(Error::TooManyNeighbors(count));
        }

        let mut neighbors = Vec::with_capacity(count);
        for _ in 0..count {
            let offset = match version {
                VERSION_PACKED => unpack(reader.read_u8()?),
                _ => Offset::new(reader.read_i8()?, reader.read_i8()?, reader.read_i8()?),
            };
            neighbors.push(offset);
        }

        Self::new(context_bits, neighbors)
    }

    /// Size of the preamble [`CodecSettings::write_to`] produces
    pub fn encoded_len(&self) -> usize {
        let per_offset = if self.neighbors.iter().all(|o| pack(o).is_some()) { 1 } else { 3 };
        3 + per_offset * self.neighbors.len()
    }
}

impl Display for CodecSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bits, neighbors [", self.context_bits)?;
        for (i, offset) in self.neighbors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{offset}")?;
        }
        write!(f, "]")
    }
}

/// Parses a neighbor list, `"dx,dy,dz;dx,dy,dz"`.
pub fn parse_neighbors(s: &str) -> std::result::Result<Vec<Offset>, String> {
    s.split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(Offset::from_str)
        .collect()
}

// dx: bits 0-2, dz: bits 3-5, dy: bits 6-7, all two's complement
fn pack(offset: &Offset) -> Option<u8> {
    let fits = |v: i8, bits: u32| {
        let half = 1i8 << (bits - 1);
        (-half..half).contains(&v)
    };
    if !(fits(offset.x, 3) && fits(offset.z, 3) && fits(offset.y, 2)) {
        return None;
    }

    let field = |v: i8, bits: u32| (v as u8) & ((1 << bits) - 1);
    Some(field(offset.x, 3) | field(offset.z, 3) << 3 | field(offset.y, 2) << 6)
}

fn unpack(byte: u8) -> Offset {
    let field = |shift: u32, bits: u32| {
        let unused = u8::BITS - bits;
        // move the field to the top, then sign extend it back down
        ((byte >> shift) << unused) as i8 >> unused
    };
    Offset::new(field(0, 3), field(6, 2), field(3, 3))
}

#[cfg(test)]
mod tests {
    use super::{pack, parse_neighbors, unpack, CodecSettings, VERSION_PACKED, VERSION_WIDE};
    use crate::error::Error;
    use crate::region::Offset;

    fn written(settings: &CodecSettings) -> Vec<u8> {
        let mut buf = Vec::new();
        settings.write_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn default_settings_are_packed() {
        let settings = CodecSettings::default();
        let buf = written(&settings);
        // (-1,0,0) -> 0b00_000_111, (0,-1,0) -> 0b11_000_000, (0,0,-1) -> 0b00_111_000
        assert_eq!(buf, [VERSION_PACKED, 12, 3, 0b0000_0111, 0b1100_0000, 0b0011_1000]);
        assert_eq!(buf.len(), settings.encoded_len());
        assert_eq!(CodecSettings::read_from(buf.as_slice()).unwrap(), settings);
    }

    #[test]
    fn far_offsets_fall_back_to_wide() {
        let settings = CodecSettings::new(9, vec![Offset::new(0, -2, 5), Offset::new(-7, 0, 0)]).unwrap();
        let buf = written(&settings);
        assert_eq!(buf, [VERSION_WIDE, 9, 2, 0, 0xfe, 5, 0xf9, 0, 0]);
        assert_eq!(buf.len(), settings.encoded_len());
        assert_eq!(CodecSettings::read_from(buf.as_slice()).unwrap(), settings);
    }

    #[test]
    fn packed_fields_cover_their_ranges() {
        for x in -4..=3 {
            for y in -2..=1 {
                for z in -4..=3 {
                    let offset = Offset::new(x, y, z);
                    assert_eq!(unpack(pack(&offset).unwrap()), offset);
                }
            }
        }
        assert_eq!(pack(&Offset::new(4, 0, 0)), None);
        assert_eq!(pack(&Offset::new(0, -3, 0)), None);
        assert_eq!(pack(&Offset::new(0, 0, -5)), None);
    }

    #[test]
    fn no_neighbors() {
        let settings = CodecSettings::new(1, vec![]).unwrap();
        assert_eq!(written(&settings), [VERSION_PACKED, 1, 0]);
    }

    #[test]
    fn rejects_invalid_settings() {
        assert!(matches!(CodecSettings::new(0, vec![]), Err(Error::InvalidContextBits(0))));
        assert!(matches!(CodecSettings::new(17, vec![]), Err(Error::InvalidContextBits(17))));
        assert!(matches!(
            CodecSettings::new(8, vec![Offset::new(-1, 0, 0); 5]),
            Err(Error::TooManyNeighbors(5))
        ));
        assert!(matches!(
            CodecSettings::new(8, vec![Offset::new(-1, 0, 0), Offset::new(1, 0, 0)]),
            Err(Error::NonCausalNeighbor(offset)) if offset == Offset::new(1, 0, 0)
        ));
    }

    #[test]
    fn rejects_invalid_preambles() {
        let read = |bytes: &[u8]| CodecSettings::read_from(bytes);

        assert!(matches!(read(&[3, 12, 0]), Err(Error::UnsupportedVersion(3))));
        assert!(matches!(read(&[0, 12, 0]), Err(Error::UnsupportedVersion(0))));
        assert!(matches!(read(&[2, 12, 5, 7, 7, 7, 7, 7]), Err(Error::TooManyNeighbors(5))));
        assert!(matches!(read(&[2, 0, 0]), Err(Error::InvalidContextBits(0))));
        // (1, 0, 0) is not causal
        assert!(matches!(read(&[2, 12, 1, 0b0000_0001]), Err(Error::NonCausalNeighbor(_))));
        assert!(matches!(read(&[1, 12, 1, 0xff, 0]), Err(Error::Corrupt(_))));
        assert!(matches!(read(&[]), Err(Error::Corrupt(_))));
    }

    #[test]
    fn parse_neighbor_lists() {
        assert_eq!(
            parse_neighbors("-1,0,0; 0,-1,0;0,0,-1"),
            Ok(CodecSettings::default().neighbors)
        );
        assert_eq!(parse_neighbors(""), Ok(vec![]));
        assert!(parse_neighbors("-1,0;0,0,-1").is_err());
    }
}
