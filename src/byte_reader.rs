//! Random-access cursor over the whole file buffer.
//!
//! Every higher layer routes its byte access through this type so that
//! bounds are enforced in exactly one place. Absolute seek rather than a
//! forward-only stream, since the chunk-reference graph jumps forward
//! and backward through the file.

use std::mem::size_of;

use crate::error::{ParseError, ParseResult};
use crate::guid::Guid;

pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: u64,
}

macro_rules! impl_read_num {
    ($($type:ident),+) => {
        $(
            pub fn $type(&mut self) -> ParseResult<$type> {
                let bytes = self.read_bytes(size_of::<$type>() as u64)?;
                Ok($type::from_le_bytes(bytes.try_into().unwrap()))
            }
        )+
    };
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn tell(&self) -> u64 {
        self.pos
    }

    pub fn len(&self) -> u64 {
        self.buf.len() as u64
    }

    pub fn remaining(&self) -> u64 {
        self.len().saturating_sub(self.pos)
    }

    pub fn seek(&mut self, abs_offset: u64) -> ParseResult<()> {
        if abs_offset > self.len() {
            return Err(ParseError::TruncatedInput {
                offset: abs_offset,
                wanted: 0,
                available: self.len(),
            });
        }

        self.pos = abs_offset;
        Ok(())
    }

    /// Reads `n` bytes and returns a zero-copy slice tied to the buffer's
    /// lifetime. Decoded entities hold byte ranges into the original
    /// buffer, not copies.
    pub fn read_bytes(&mut self, n: u64) -> ParseResult<&'a [u8]> {
        let start = self.pos as usize;
        let end = start
            .checked_add(n as usize)
            .filter(|&end| end as u64 <= self.len())
            .ok_or(ParseError::TruncatedInput {
                offset: self.pos,
                wanted: n,
                available: self.remaining(),
            })?;

        let slice = &self.buf[start..end];
        self.pos = end as u64;
        Ok(slice)
    }

    impl_read_num!(u8, u16, u32, u64);

    pub fn read_guid(&mut self) -> ParseResult<Guid> {
        let bytes: [u8; 16] = self.read_bytes(16)?.try_into().unwrap();
        Ok(Guid::from_le_bytes(bytes))
    }

    /// Reads an IEEE-754 single-precision float.
    pub fn f32(&mut self) -> ParseResult<f32> {
        Ok(f32::from_bits(self.u32()?))
    }

    /// Reads an IEEE-754 double-precision float.
    pub fn f64(&mut self) -> ParseResult<f64> {
        Ok(f64::from_bits(self.u64()?))
    }

    /// The whole underlying buffer, for extractors that need to hand out
    /// a sub-slice computed from an absolute offset without going through
    /// the cursor.
    pub fn whole_buffer(&self) -> &'a [u8] {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_integers() {
        let mut r = ByteReader::new(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]);
        assert_eq!(r.u8().unwrap(), 0x01);
        assert_eq!(r.u16().unwrap(), 0x0403);
        assert_eq!(r.u32().unwrap(), 0x0807_0605);
    }

    #[test]
    fn seek_and_tell_roundtrip() {
        let mut r = ByteReader::new(&[0; 32]);
        r.seek(10).unwrap();
        assert_eq!(r.tell(), 10);
        assert_eq!(r.remaining(), 22);
    }

    #[test]
    fn read_past_end_is_truncated_input() {
        let mut r = ByteReader::new(&[1, 2, 3]);
        let err = r.u32().unwrap_err();
        assert!(matches!(err, ParseError::TruncatedInput { .. }));
    }

    #[test]
    fn seek_past_end_is_truncated_input() {
        let mut r = ByteReader::new(&[1, 2, 3]);
        assert!(r.seek(4).is_err());
        assert!(r.seek(3).is_ok());
    }

    #[test]
    fn read_bytes_is_zero_copy() {
        let buf = [1u8, 2, 3, 4];
        let mut r = ByteReader::new(&buf);
        let slice = r.read_bytes(4).unwrap();
        assert_eq!(slice.as_ptr(), buf.as_ptr());
    }
}
