//! Header Decoder: validates the 16-byte file-type GUID and reads the
//! fixed 1024-byte header, yielding the root FileNodeList reference and
//! the transaction-log reference. A flat sequence of typed reads
//! validated eagerly and turned into specific error variants.

use crate::byte_reader::ByteReader;
use crate::error::{ParseError, ParseResult};
use crate::guid::Guid;
use crate::reference::{self, Reference};

/// Fixed size of the OneNote file header.
pub const HEADER_SIZE: u64 = 1024;

const FCR_FILE_NODE_LIST_ROOT_OFFSET: u64 = 0x1C8;
const FCR_TRANSACTION_LOG_OFFSET: u64 = 0x1D4;

/// File-type GUID for `.one` (single section).
pub const ONE_FILE_TYPE_GUID: Guid = Guid::from_bytes([
    0xE4, 0x52, 0x5C, 0x7B, 0x8C, 0xD8, 0xA7, 0x4D, 0xAE, 0xB1, 0x53, 0x78, 0xD0, 0x29, 0x96, 0xD3,
]);

/// File-type GUID for `.onetoc2` (table of contents).
pub const ONETOC2_FILE_TYPE_GUID: Guid = Guid::from_bytes([
    0xA1, 0x2F, 0xFF, 0x43, 0xD9, 0xEF, 0x76, 0x4C, 0x9E, 0xE2, 0x10, 0xEA, 0x57, 0x22, 0x76, 0x5F,
]);

/// Which of the two known OneNote container formats a file declares
/// itself to be.
#[derive(Clone, Copy, PartialEq, Eq, Debug, serde::Serialize)]
pub enum FileKind {
    Section,
    TableOfContents2,
}

/// The report-facing subset of [`Header`]: its chunk references are an
/// internal decoding detail the root FileNodeList walk already consumed
/// by the time a report is built.
#[derive(Clone, Debug, serde::Serialize)]
pub struct HeaderInfo {
    pub kind: FileKind,
    pub guid_file: Guid,
    pub guid_file_format: Guid,
}

impl From<&Header> for HeaderInfo {
    fn from(header: &Header) -> Self {
        Self {
            kind: header.kind,
            guid_file: header.guid_file,
            guid_file_format: header.guid_file_format,
        }
    }
}

pub struct Header {
    pub kind: FileKind,
    pub guid_file_type: Guid,
    pub guid_file: Guid,
    pub guid_file_format: Guid,
    pub file_node_list_root: Option<Reference>,
    pub transaction_log: Option<Reference>,
}

impl Header {
    /// Reads and validates the header at the start of the buffer.
    /// `BadSignature` is fatal for the whole file.
    pub fn read(r: &mut ByteReader) -> ParseResult<Self> {
        r.seek(0)?;
        let guid_file_type = r.read_guid()?;

        let kind = if guid_file_type == ONE_FILE_TYPE_GUID {
            FileKind::Section
        } else if guid_file_type == ONETOC2_FILE_TYPE_GUID {
            FileKind::TableOfContents2
        } else {
            return Err(ParseError::BadSignature);
        };

        r.seek(16)?;
        let guid_file = r.read_guid()?;

        r.seek(48)?;
        let guid_file_format = r.read_guid()?;

        r.seek(FCR_FILE_NODE_LIST_ROOT_OFFSET)?;
        let file_node_list_root = reference::read_64x32(r)?;

        r.seek(FCR_TRANSACTION_LOG_OFFSET)?;
        let transaction_log = reference::read_64x32(r)?;

        // Opaque header fields (file version GUIDs, expected-length,
        // transaction count) are not read: the core never consults them.
        if r.len() < HEADER_SIZE {
            return Err(ParseError::TruncatedInput {
                offset: 0,
                wanted: HEADER_SIZE,
                available: r.len(),
            });
        }

        Ok(Self {
            kind,
            guid_file_type,
            guid_file,
            guid_file_format,
            file_node_list_root,
            transaction_log,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(guid: Guid, root: Option<(u64, u32)>) -> Vec<u8> {
        let mut bytes = vec![0u8; HEADER_SIZE as usize];
        bytes[0..16].copy_from_slice(&guid.to_le_bytes());

        match root {
            Some((stp, cb)) => {
                bytes[0x1C8..0x1D0].copy_from_slice(&stp.to_le_bytes());
                bytes[0x1D0..0x1D4].copy_from_slice(&cb.to_le_bytes());
            }
            None => {
                for b in &mut bytes[0x1C8..0x1D4] {
                    *b = 0xFF;
                }
            }
        }

        // Nil transaction log reference.
        for b in &mut bytes[0x1D4..0x1E0] {
            *b = 0xFF;
        }

        bytes
    }

    #[test]
    fn bad_signature_is_fatal() {
        let bytes = header_bytes(Guid::from_le_bytes([0; 16]), None);
        let mut r = ByteReader::new(&bytes);
        let err = Header::read(&mut r).unwrap_err();
        assert!(matches!(err, ParseError::BadSignature));
        assert!(err.is_always_fatal());
    }

    #[test]
    fn empty_one_file_has_nil_root() {
        let bytes = header_bytes(ONE_FILE_TYPE_GUID, None);
        let mut r = ByteReader::new(&bytes);
        let header = Header::read(&mut r).unwrap();
        assert_eq!(header.kind, FileKind::Section);
        assert_eq!(header.file_node_list_root, None);
        assert_eq!(header.transaction_log, None);
    }

    #[test]
    fn onetoc2_signature_is_recognized() {
        let bytes = header_bytes(ONETOC2_FILE_TYPE_GUID, Some((1024, 64)));
        let mut r = ByteReader::new(&bytes);
        let header = Header::read(&mut r).unwrap();
        assert_eq!(header.kind, FileKind::TableOfContents2);
        assert_eq!(
            header.file_node_list_root,
            Some(Reference { stp: 1024, cb: 64 })
        );
    }
}
