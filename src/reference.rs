//! FileChunkReference decoding: the four standalone physical layouts plus
//! the two compressed-pointer/size encodings selected by a FileNode
//! header's StpFormat/CbFormat bits.

use crate::byte_reader::ByteReader;
use crate::error::ParseResult;

/// An (offset, length) pair into the file. Nil and zero encodings both
/// mean "no target" and are collapsed to `None` by the decoding
/// functions in this module rather than exposed as a distinguishable
/// reference variant, since every consumer treats them identically
/// ("both mean no data").
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Reference {
    pub stp: u64,
    pub cb: u64,
}

impl Reference {
    pub fn end(&self) -> u64 {
        self.stp.saturating_add(self.cb)
    }

    pub fn is_empty(&self) -> bool {
        self.cb == 0
    }
}

/// Format selector for the `stp` (offset) half of a FileNode-embedded
/// reference, taken from the node header's 2-bit `StpFormat` field.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StpFormat {
    /// u64, uncompressed.
    U64,
    /// u32, uncompressed.
    U32,
    /// u16, multiply by 8.
    U16Times8,
    /// u32, multiply by 8.
    U32Times8,
}

/// Format selector for the `cb` (byte count) half of a FileNode-embedded
/// reference, taken from the node header's 2-bit `CbFormat` field.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CbFormat {
    /// u32, uncompressed.
    U32,
    /// u64, uncompressed.
    U64,
    /// u8, multiply by 8.
    U8Times8,
    /// u16, multiply by 8.
    U16Times8,
}

/// Table-driven dispatch from the header's 2-bit format field to an
/// (StpFormat, CbFormat) pair. The format space is exhaustively tagged,
/// so decoding is pure dispatch.
pub fn formats_for(stp_format_bits: u8, cb_format_bits: u8) -> (StpFormat, CbFormat) {
    let stp = match stp_format_bits & 0b11 {
        0 => StpFormat::U64,
        1 => StpFormat::U32,
        2 => StpFormat::U16Times8,
        _ => StpFormat::U32Times8,
    };

    let cb = match cb_format_bits & 0b11 {
        0 => CbFormat::U32,
        1 => CbFormat::U64,
        2 => CbFormat::U8Times8,
        _ => CbFormat::U16Times8,
    };

    (stp, cb)
}

/// Reads a FileNode-embedded reference in the format selected by
/// `(stp_format, cb_format)` and collapses the nil/zero sentinels to
/// `None`.
pub fn read_embedded(
    r: &mut ByteReader,
    stp_format: StpFormat,
    cb_format: CbFormat,
) -> ParseResult<Option<Reference>> {
    let stp = match stp_format {
        StpFormat::U64 => r.u64()?,
        StpFormat::U32 => r.u32()? as u64,
        StpFormat::U16Times8 => (r.u16()? as u64) * 8,
        StpFormat::U32Times8 => (r.u32()? as u64) * 8,
    };

    let cb = match cb_format {
        CbFormat::U32 => r.u32()? as u64,
        CbFormat::U64 => r.u64()?,
        CbFormat::U8Times8 => (r.u8()? as u64) * 8,
        CbFormat::U16Times8 => (r.u16()? as u64) * 8,
    };

    Ok(collapse_sentinels(stp, cb, stp_format, cb_format))
}

fn collapse_sentinels(
    stp: u64,
    cb: u64,
    stp_format: StpFormat,
    cb_format: CbFormat,
) -> Option<Reference> {
    let stp_all_ones = match stp_format {
        StpFormat::U64 => stp == u64::MAX,
        StpFormat::U32 => stp == u32::MAX as u64,
        StpFormat::U16Times8 => stp == (u16::MAX as u64) * 8,
        StpFormat::U32Times8 => stp == (u32::MAX as u64) * 8,
    };
    let cb_all_ones = match cb_format {
        CbFormat::U32 => cb == u32::MAX as u64,
        CbFormat::U64 => cb == u64::MAX,
        CbFormat::U8Times8 => cb == (u8::MAX as u64) * 8,
        CbFormat::U16Times8 => cb == (u16::MAX as u64) * 8,
    };

    if (stp_all_ones && cb_all_ones) || (stp == 0 && cb == 0) {
        None
    } else {
        Some(Reference { stp, cb })
    }
}

/// Reads a standalone `FileChunkReference32`: u32 stp, u32 cb.
pub fn read_32(r: &mut ByteReader) -> ParseResult<Option<Reference>> {
    let stp = r.u32()?;
    let cb = r.u32()?;
    Ok(collapse_standalone(stp as u64, cb as u64, 4, 4))
}

/// Reads a standalone `FileChunkReference64`: u64 stp, u64 cb.
pub fn read_64(r: &mut ByteReader) -> ParseResult<Option<Reference>> {
    let stp = r.u64()?;
    let cb = r.u64()?;
    Ok(collapse_standalone(stp, cb, 8, 8))
}

/// Reads a standalone `FileChunkReference64x32`: u64 stp, u32 cb.
pub fn read_64x32(r: &mut ByteReader) -> ParseResult<Option<Reference>> {
    let stp = r.u64()?;
    let cb = r.u32()?;
    Ok(collapse_standalone(stp, cb as u64, 8, 4))
}

fn collapse_standalone(stp: u64, cb: u64, stp_bytes: u32, cb_bytes: u32) -> Option<Reference> {
    let stp_all_ones = stp == all_ones(stp_bytes);
    let cb_all_ones = cb == all_ones(cb_bytes);

    if (stp_all_ones && cb_all_ones) || (stp == 0 && cb == 0) {
        None
    } else {
        Some(Reference { stp, cb })
    }
}

fn all_ones(num_bytes: u32) -> u64 {
    if num_bytes >= 8 {
        u64::MAX
    } else {
        (1u64 << (num_bytes * 8)) - 1
    }
}
