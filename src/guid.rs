//! GUID, ExtendedGUID and CompactID: the identifier types that tie the
//! object-space graph together.

use std::fmt::{self, Debug, Display};

use crate::error::{ParseError, ParseResult};

/// A 128-bit globally unique identifier, stored little-endian on disk.
///
/// Wraps [`uuid::Uuid`] for display/debug formatting. `Uuid::from_bytes_le`
/// matches the on-disk byte order: 16 bytes, little-endian field order.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Guid(uuid::Uuid);

impl Guid {
    pub const NIL: Guid = Guid(uuid::Uuid::nil());

    /// Builds a `Guid` from its 16 on-disk bytes (little-endian field order).
    pub fn from_le_bytes(bytes: [u8; 16]) -> Self {
        Self(uuid::Uuid::from_bytes_le(bytes))
    }

    /// Builds a `Guid` from a literal big-endian byte sequence, the way
    /// file-type GUID constants are written.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(uuid::Uuid::from_bytes(bytes))
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// The 16 bytes in on-disk (little-endian field) order.
    pub fn to_le_bytes(self) -> [u8; 16] {
        self.0.to_bytes_le()
    }
}

impl Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.0.hyphenated())
    }
}

impl Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0.hyphenated(), f)
    }
}

impl serde::Serialize for Guid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// A GUID paired with a 32-bit sequence number `n`. Two `ExtendedGuid`s
/// are equal iff both members match. The nil `ExtendedGuid` has an
/// all-zero GUID and `n == 0`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize)]
pub struct ExtendedGuid {
    pub guid: Guid,
    pub n: u32,
}

impl ExtendedGuid {
    pub const NIL: ExtendedGuid = ExtendedGuid {
        guid: Guid::NIL,
        n: 0,
    };

    pub fn is_nil(&self) -> bool {
        self.guid.is_nil() && self.n == 0
    }
}

impl Display for ExtendedGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}, {}}}", self.guid, self.n)
    }
}

/// A 32-bit compressed identifier: `n` in the low 8 bits, `guidIndex` in
/// the high 24 bits. Resolved to an [`ExtendedGuid`] by looking up
/// `guidIndex` in the Global Identification Table; the resulting
/// `ExtendedGuid`'s `n` comes from the CompactID itself, not from the
/// table entry.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CompactId {
    pub n: u8,
    pub guid_index: u32,
}

impl CompactId {
    pub fn from_u32(value: u32) -> Self {
        Self {
            n: (value & 0xFF) as u8,
            guid_index: value >> 8,
        }
    }

    /// Inverse of [`CompactId::from_u32`].
    pub fn encode(&self) -> u32 {
        (self.guid_index << 8) | self.n as u32
    }

    /// Resolves this CompactID against a Global Identification Table,
    /// represented as a dense vector indexed by `guidIndex`. Table indices
    /// are dense from 0 upward within a revision, so `guidIndex` is used
    /// directly.
    pub fn resolve(&self, offset: u64, table: &[ExtendedGuid]) -> ParseResult<ExtendedGuid> {
        let guid = table
            .get(self.guid_index as usize)
            .ok_or(ParseError::BadCompactId {
                offset,
                guid_index: self.guid_index,
                table_len: table.len() as u32,
            })?
            .guid;

        Ok(ExtendedGuid {
            guid,
            n: self.n as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guid_roundtrips_le_bytes() {
        let bytes = [
            0xE4, 0x52, 0x5C, 0x7B, 0x8C, 0xD8, 0xA7, 0x4D, 0xAE, 0xB1, 0x53, 0x78, 0xD0, 0x29,
            0x96, 0xD3,
        ];
        let guid = Guid::from_le_bytes(bytes);
        assert_eq!(guid.to_le_bytes(), bytes);
    }

    #[test]
    fn nil_extended_guid_is_nil() {
        assert!(ExtendedGuid::NIL.is_nil());
        assert!(!ExtendedGuid {
            guid: Guid::from_le_bytes([1; 16]),
            n: 0
        }
        .is_nil());
    }

    #[test]
    fn compact_id_decomposes_bit_fields() {
        let id = CompactId::from_u32(0x0000_0305);
        assert_eq!(id.n, 0x05);
        assert_eq!(id.guid_index, 0x03);
    }

    #[test]
    fn compact_id_resolves_against_table() {
        let guid = Guid::from_le_bytes([9; 16]);
        let table = vec![ExtendedGuid { guid, n: 42 }];
        let id = CompactId {
            n: 7,
            guid_index: 0,
        };
        let resolved = id.resolve(0, &table).unwrap();
        assert_eq!(resolved.guid, guid);
        assert_eq!(resolved.n, 7);
    }

    #[test]
    fn compact_id_encode_roundtrips_from_u32() {
        let id = CompactId::from_u32(0x0000_0305);
        assert_eq!(CompactId::from_u32(id.encode()), id);
    }

    #[test]
    fn compact_id_out_of_range_errors() {
        let id = CompactId {
            n: 0,
            guid_index: 5,
        };
        let err = id.resolve(0x10, &[]).unwrap_err();
        assert!(matches!(err, ParseError::BadCompactId { .. }));
    }
}
