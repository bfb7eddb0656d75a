//! File-Data Extractor: decodes a `FileDataStoreObject`, a GUID-framed
//! container wrapping one embedded file's raw bytes, referenced by an
//! object declaration whose JCID marks it as file data.

use crate::byte_reader::ByteReader;
use crate::error::{ParseError, ParseResult};
use crate::guid::Guid;
use crate::reference::Reference;

/// `{BDE316E7-2665-4511-A4C4-8D4D0B7A9EAC}`, written big-endian.
const HEADER_GUID: Guid = Guid::from_bytes([
    0xBD, 0xE3, 0x16, 0xE7, 0x26, 0x65, 0x45, 0x11, 0xA4, 0xC4, 0x8D, 0x4D, 0x0B, 0x7A, 0x9E, 0xAC,
]);

/// `{71FBA722-0F79-4A0B-BB13-899256426B24}`, written big-endian.
const FOOTER_GUID: Guid = Guid::from_bytes([
    0x71, 0xFB, 0xA7, 0x22, 0x0F, 0x79, 0x4A, 0x0B, 0xBB, 0x13, 0x89, 0x92, 0x56, 0x42, 0x6B, 0x24,
]);

const HEADER_LEN: u64 = 36;
const FOOTER_LEN: u64 = 16;

/// A decoded file-data payload: the raw bytes between the fixed header
/// and footer, still a zero-copy slice into the original buffer.
#[derive(Debug)]
pub struct FileDataStoreObject<'a> {
    pub offset: u64,
    pub data: &'a [u8],
}

/// Decodes a `FileDataStoreObject` at `reference`, validating the header
/// and footer GUIDs and the declared length against the region actually
/// available.
pub fn decode_file_data_store_object<'a>(
    buf: &'a [u8],
    reference: Reference,
) -> ParseResult<FileDataStoreObject<'a>> {
    let offset = reference.stp;
    let mut r = ByteReader::new(buf);
    r.seek(offset)?;

    let header_guid = r.read_guid()?;
    if header_guid != HEADER_GUID {
        return Err(ParseError::CorruptDataStore {
            offset,
            reason: "header GUID mismatch",
        });
    }

    let cb_length = r.u64()?;
    let _unused = r.u32()?;
    let _reserved = r.u64()?;

    let declared_total = HEADER_LEN
        .checked_add(cb_length)
        .and_then(|total| total.checked_add(FOOTER_LEN))
        .ok_or(ParseError::CorruptDataStore {
            offset,
            reason: "declared length overflows",
        })?;

    if declared_total > reference.cb {
        return Err(ParseError::CorruptDataStore {
            offset,
            reason: "declared length overruns the reference",
        });
    }

    let data = r.read_bytes(cb_length)?;

    let footer_guid = r.read_guid()?;
    if footer_guid != FOOTER_GUID {
        return Err(ParseError::CorruptDataStore {
            offset,
            reason: "footer GUID mismatch",
        });
    }

    Ok(FileDataStoreObject { offset, data })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_object(payload: &[u8]) -> Vec<u8> {
        let mut bytes = vec![];
        bytes.extend_from_slice(&HEADER_GUID.to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());
        bytes.extend_from_slice(payload);
        bytes.extend_from_slice(&FOOTER_GUID.to_le_bytes());
        bytes
    }

    #[test]
    fn decodes_payload_between_header_and_footer() {
        let bytes = store_object(b"hello world");
        let len = bytes.len() as u64;
        let store =
            decode_file_data_store_object(&bytes, Reference { stp: 0, cb: len }).unwrap();
        assert_eq!(store.data, b"hello world");
    }

    #[test]
    fn bad_header_guid_is_corrupt_data_store() {
        let mut bytes = store_object(b"x");
        bytes[0] ^= 0xFF;
        let len = bytes.len() as u64;
        let err =
            decode_file_data_store_object(&bytes, Reference { stp: 0, cb: len }).unwrap_err();
        assert!(matches!(err, ParseError::CorruptDataStore { reason: "header GUID mismatch", .. }));
    }

    #[test]
    fn bad_footer_guid_is_corrupt_data_store() {
        let mut bytes = store_object(b"x");
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let len = bytes.len() as u64;
        let err =
            decode_file_data_store_object(&bytes, Reference { stp: 0, cb: len }).unwrap_err();
        assert!(matches!(err, ParseError::CorruptDataStore { reason: "footer GUID mismatch", .. }));
    }

    #[test]
    fn declared_length_overrunning_reference_is_corrupt() {
        let bytes = store_object(b"hello world");
        // Claim a reference shorter than the bytes actually present.
        let err = decode_file_data_store_object(&bytes, Reference { stp: 0, cb: 10 })
            .unwrap_err();
        assert!(matches!(err, ParseError::CorruptDataStore { reason: "declared length overruns the reference", .. }));
    }

    #[test]
    fn empty_payload_decodes_to_empty_slice() {
        let bytes = store_object(&[]);
        let len = bytes.len() as u64;
        let store =
            decode_file_data_store_object(&bytes, Reference { stp: 0, cb: len }).unwrap();
        assert!(store.data.is_empty());
    }
}
