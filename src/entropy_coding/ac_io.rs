use core::slice::from_mut as into_slice;
use std::io::{self, Read, Write};

use super::{ACRead, ACWrite};

/// Arithmetic coder read io for `io::Read` types
///
/// The coder's flush leaves every bit the decoder consumes in the stream, so
/// running out of bytes means the stream was cut short.
pub struct ACReader<R> {
    inner: R,
    buf: u8,
    mask: u8,
    consumed: u64,
}

impl<R: Read> ACReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, buf: 0, mask: 0, consumed: 0 }
    }

    /// Bytes pulled from the inner reader so far
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        debug_assert!(self.mask == 0);
        let mut byte = 0;
        self.inner.read_exact(into_slice(&mut byte))?;
        self.consumed += 1;
        Ok(byte)
    }
}

impl<R: Read> ACRead for ACReader<R> {
    fn read_bit(&mut self) -> io::Result<u8> {
        self.mask >>= 1; // move to next bit
        if self.mask == 0 {
            self.buf = self.read_byte()?; // fill
            self.mask = 1 << 7; // then move to first bit
        }
        Ok((self.buf & self.mask > 0).into())
    }

    fn read_u32(&mut self) -> io::Result<u32> {
        let bytes = [
            self.read_byte()?,
            self.read_byte()?,
            self.read_byte()?,
            self.read_byte()?,
        ];
        Ok(u32::from_be_bytes(bytes))
    }
}

/// Arithmetic coder write io for `io::Write` types
pub struct ACWriter<W> {
    inner: W,
    buf: u8,
    idx: u8,
    rev_bits: u64,
    written: u64,
}

impl<W: Write> ACWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, buf: 0, idx: 0, rev_bits: 0, written: 0 }
    }

    /// Bytes handed to the inner writer so far
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> ACWrite for ACWriter<W> {
    fn inc_parity(&mut self) {
        self.rev_bits += 1;
    }

    fn write_bit(&mut self, bit: impl TryInto<u8>) -> io::Result<()> {
        let bit: u8 = bit.try_into().unwrap_or_default();
        debug_assert!(bit <= 1, "Tried to write invalid bit");

        let mut write_bit_raw = |bit: u8| -> io::Result<()> {
            self.buf = (self.buf << 1) | bit;
            self.idx = (self.idx + 1) % 8;
            if self.idx == 0 {
                self.inner.write_all(&[self.buf])?;
                self.written += 1;
            }
            Ok(())
        };

        write_bit_raw(bit)?;
        while self.rev_bits > 0 {
            self.rev_bits -= 1;
            write_bit_raw(bit ^ 1)?;
        }
        Ok(())
    }

    fn flush(&mut self, mut state: u32) -> io::Result<()> {
        for _ in 0..u32::BITS {
            self.write_bit(state >> 31)?;
            state <<= 1;
        }
        while self.idx > 0 {
            self.write_bit(0)?;
        }
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;

    use super::{ACRead, ACReader, ACWrite, ACWriter};

    #[test]
    fn read_bits() {
        let data: [u8; 2] = [0b0101_0101, 0b1010_1010];
        let mut reader = ACReader::new(data.as_ref());
        let truth = [0, 1]
            .iter()
            .cycle()
            .take(17) // 16 bits, but eliminate 1
            .enumerate()
            .filter(|&(i, _)| i != 8) // fancy
            .map(|(_, x)| x);

        truth.for_each(|&bit| assert_eq!(reader.read_bit().unwrap(), bit));
        assert_eq!(reader.consumed(), 2);
        // read past EOF
        let err = reader.read_bit().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn read_u32_complete() {
        let data = b"\xde\xad\xbe\xef";
        let mut reader = ACReader::new(data.as_ref());
        assert_eq!(reader.read_u32().unwrap(), 0xdeadbeef);
        assert!(reader.read_bit().is_err());
    }

    #[test]
    fn read_u32_incomplete() {
        let data = b"\xde\xad";
        let mut reader = ACReader::new(data.as_ref());
        let err = reader.read_u32().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn write_bits_across_byte_boundary() {
        let mut data = Vec::new();
        let mut writer = ACWriter::new(&mut data);
        (0..3).for_each(|_| writer.write_bit(1).unwrap());
        (0..3).for_each(|_| writer.inc_parity());
        (0..5).for_each(|_| writer.write_bit(0).unwrap());
        writer.flush(0).unwrap();
        // 111 0 111 0000 + 32 state bits + 3 padding bits
        assert_eq!(data, [0b111_0_111_0, 0b000_00000, 0, 0, 0, 0]);
    }

    #[test]
    fn write_parity_bits_across_byte_boundary() {
        let mut data = Vec::new();
        let mut writer = ACWriter::new(&mut data);
        (0..3).for_each(|_| writer.write_bit(1).unwrap());
        (0..6).for_each(|_| writer.inc_parity());
        (0..2).for_each(|_| writer.write_bit(0).unwrap());
        writer.flush(u32::MAX).unwrap();
        assert_eq!(data, [0b111_0_1111, 0b11_0_11111, 0xff, 0xff, 0b1111_1111, 0b1110_0000]);
    }

    #[test]
    fn flush_aligned() {
        let mut data = Vec::new();
        let mut writer = ACWriter::new(&mut data);
        (0..8).for_each(|_| writer.write_bit(1).unwrap());
        writer.flush(0xdeadbeef).unwrap();
        assert_eq!(data, [0xff, 0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn flush_unaligned() {
        let mut data = Vec::new();
        let mut writer = ACWriter::new(&mut data);
        (0..4).for_each(|_| writer.write_bit(1).unwrap());
        writer.flush(0xdeadbeef).unwrap();
        assert_eq!(data, [0xfd, 0xea, 0xdb, 0xee, 0xf0]);
    }

    #[test]
    fn flush_with_parity() {
        let mut data = Vec::new();
        let mut writer = ACWriter::new(&mut data);
        (0..4).for_each(|_| writer.write_bit(1).unwrap());
        (0..2).for_each(|_| writer.inc_parity());
        writer.flush(0x00adbeef).unwrap();
        // pending bits resolve against the first state bit (0)
        assert_eq!(data, [0b1111_0_11_0, 0x02, 0xb6, 0xfb, 0xbc]);
    }

    #[test]
    fn flush_only() {
        let mut writer = ACWriter::new(Vec::new());
        writer.flush(0xdeadbeef).unwrap();
        assert_eq!(writer.written(), 4);
        assert_eq!(writer.into_inner(), b"\xde\xad\xbe\xef");
    }
}
