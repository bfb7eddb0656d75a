//! FileNodeList Walker: traverses FileNodeList fragments, concatenating
//! them into one logical node stream, and dispatches each node by its
//! 10-bit FileNodeID.

use crate::byte_reader::ByteReader;
use crate::diagnostics::{DiagnosticKind, DiagnosticSink};
use crate::error::{ParseError, ParseResult};
use crate::reference::{self, CbFormat, Reference, StpFormat};

const FRAGMENT_HEADER_MAGIC: u64 = 0xA456_7AB1_F5F7_F4C4;
const FRAGMENT_FOOTER_MAGIC: u64 = 0x8BC2_15C3_8233_BA4B;

/// FileNodeID of the node that terminates a fragment's node sequence.
pub const CHUNK_TERMINATOR: u16 = 0x0FF;

/// Recursion ceiling for nested (BaseType=2) FileNodeLists.
pub const MAX_LIST_DEPTH: u32 = 32;

/// Sanity ceiling on the number of fragments chained via next-fragment
/// pointers, guarding against a cyclic or pathologically long chain.
pub const MAX_FRAGMENTS: u32 = 10_000;

/// A decoded FileNode, still carrying its untyped inline payload. The
/// object-space layer interprets `inline` according to `id`.
#[derive(Debug)]
pub struct RawNode<'a> {
    pub offset: u64,
    pub id: u16,
    pub base_type: u8,
    pub inline: &'a [u8],
    /// Present when `base_type` is 1 (raw data elsewhere) or 2 (nested
    /// FileNodeList).
    pub reference: Option<Reference>,
}

fn embedded_reference_width(stp_format: StpFormat, cb_format: CbFormat) -> u64 {
    let stp_width = match stp_format {
        StpFormat::U64 => 8,
        StpFormat::U32 => 4,
        StpFormat::U16Times8 => 2,
        StpFormat::U32Times8 => 4,
    };
    let cb_width = match cb_format {
        CbFormat::U32 => 4,
        CbFormat::U64 => 8,
        CbFormat::U8Times8 => 1,
        CbFormat::U16Times8 => 2,
    };
    stp_width + cb_width
}

fn read_fragment_header(r: &mut ByteReader, offset: u64) -> ParseResult<()> {
    let magic = r.u64()?;
    if magic != FRAGMENT_HEADER_MAGIC {
        return Err(ParseError::BadMagic {
            offset,
            expected: FRAGMENT_HEADER_MAGIC,
            found: magic,
        });
    }
    let _file_node_list_id = r.u32()?;
    let _fragment_sequence = r.u32()?;
    Ok(())
}

fn read_fragment_footer(r: &mut ByteReader, offset: u64) -> ParseResult<()> {
    let magic = r.u64()?;
    if magic != FRAGMENT_FOOTER_MAGIC {
        return Err(ParseError::BadMagic {
            offset,
            expected: FRAGMENT_FOOTER_MAGIC,
            found: magic,
        });
    }
    Ok(())
}

/// Reads a single FileNode at the reader's current position and, if its
/// BaseType requires one, the embedded reference right after its inline
/// fields. Returns `None` for the Chunk Terminator (callers stop there).
fn read_node<'a>(r: &mut ByteReader<'a>) -> ParseResult<Option<RawNode<'a>>> {
    let offset = r.tell();
    let header = r.u32()?;

    let id = (header & 0x3FF) as u16;
    let size = (header >> 10) & 0x1FFF;
    let stp_format_bits = ((header >> 23) & 0b11) as u8;
    let cb_format_bits = ((header >> 25) & 0b11) as u8;
    let base_type = ((header >> 27) & 0xF) as u8;
    let reserved = (header >> 31) & 1;

    if reserved != 0 {
        return Err(ParseError::ReservedBitSet { offset });
    }

    if size < 4 {
        return Err(ParseError::TruncatedInput {
            offset,
            wanted: 4,
            available: size as u64,
        });
    }

    if id == CHUNK_TERMINATOR {
        // The terminator carries no payload beyond its header.
        r.seek(offset + size as u64)?;
        return Ok(None);
    }

    let body_len = size as u64 - 4;

    let reference_width = if base_type == 1 || base_type == 2 {
        let (stp_format, cb_format) = reference::formats_for(stp_format_bits, cb_format_bits);
        embedded_reference_width(stp_format, cb_format)
    } else {
        0
    };
    let inline_len = body_len.saturating_sub(reference_width);

    let reference = if base_type == 1 || base_type == 2 {
        let (stp_format, cb_format) = reference::formats_for(stp_format_bits, cb_format_bits);
        reference::read_embedded(r, stp_format, cb_format)?
    } else {
        None
    };

    let inline = r.read_bytes(inline_len)?;

    Ok(Some(RawNode {
        offset,
        id,
        base_type,
        inline,
        reference,
    }))
}

/// Walks a logical FileNodeList (following all its fragments) and returns
/// the concatenated node stream. `depth` tracks BaseType=2 nesting.
pub fn walk<'a>(
    buf: &'a [u8],
    root: Reference,
    depth: u32,
    diagnostics: &mut DiagnosticSink,
) -> ParseResult<Vec<RawNode<'a>>> {
    if depth > MAX_LIST_DEPTH {
        return Err(ParseError::DepthExceeded {
            offset: root.stp,
            limit: MAX_LIST_DEPTH,
        });
    }

    let mut nodes = Vec::new();
    let mut next = Some(root);
    let mut fragment_count = 0u32;

    while let Some(fragment) = next {
        fragment_count += 1;
        if fragment_count > MAX_FRAGMENTS {
            return Err(ParseError::CyclicOrDeepList { offset: fragment.stp });
        }

        let mut r = ByteReader::new(buf);
        r.seek(fragment.stp)?;
        read_fragment_header(&mut r, fragment.stp)?;

        let fragment_end = fragment.stp.saturating_add(fragment.cb);

        let mut terminated_normally = false;
        loop {
            if r.tell() >= fragment_end {
                // Window exhausted without a terminator.
                diagnostics.record(r.tell(), DiagnosticKind::TruncatedNode);
                break;
            }

            match read_node(&mut r) {
                Ok(Some(node)) => nodes.push(node),
                Ok(None) => {
                    terminated_normally = true;
                    break;
                }
                Err(ParseError::ReservedBitSet { offset }) => {
                    // Not fatal; header is suspect past this point.
                    diagnostics.record(offset, DiagnosticKind::ReservedBitSet);
                    break;
                }
                Err(ParseError::TruncatedInput { offset, .. }) => {
                    diagnostics.record(offset, DiagnosticKind::TruncatedNode);
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        // A corrupt node header leaves the terminator position untrustworthy;
        // end the chain here instead of reading a next-fragment reference out
        // of whatever bytes happen to follow.
        next = if terminated_normally {
            let next = reference::read_64x32(&mut r)?;
            read_fragment_footer(&mut r, r.tell())?;
            next
        } else {
            None
        };
    }

    Ok(nodes)
}
