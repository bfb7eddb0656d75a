//! Property-Set Decoder: an `ObjectSpaceObjectPropSet` is an OIDs stream
//! (mandatory), optionally followed by OSIDs and ContextIDs streams,
//! followed by the PropertySet body: a tagged array of PropertyIDs and
//! their positionally-decoded values.
//!
//! Each ID stream is encapsulated as a cursor exposing only
//! `take_one`/`take_n`, never random access, since lockstep consumption
//! with property decoding is the actual invariant, not the stream's
//! contents.

use num_enum::TryFromPrimitive;

use crate::byte_reader::ByteReader;
use crate::error::{ParseError, ParseResult};
use crate::guid::{CompactId, ExtendedGuid};

/// Recursion ceiling for nested PropertySets / ArrayOfPropertyValues.
pub const MAX_PROPERTY_SET_DEPTH: u32 = 16;

/// The low-26-bit property name portion of a PropertyID.
pub type PropertyName = u32;

/// The ~18 physical encodings a PropertyID's high tag bits select
/// between. Numeric tag assignment recorded in `DESIGN.md`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, TryFromPrimitive)]
#[repr(u8)]
pub enum PropertyTag {
    NoData = 0,
    Bool = 1,
    U8 = 2,
    U16 = 3,
    U32 = 4,
    U64 = 5,
    F32 = 6,
    F64 = 7,
    SizedData = 8,
    ObjectId = 9,
    ObjectIdArray = 10,
    ObjectSpaceId = 11,
    ObjectSpaceIdArray = 12,
    ContextId = 13,
    ContextIdArray = 14,
    PropertySet = 15,
    ArrayOfPropertyValues = 16,
}

#[derive(Clone, Copy, Debug)]
pub struct PropertyId {
    pub name: PropertyName,
    pub tag: PropertyTag,
    /// Only meaningful when `tag == Bool`: the value carried inline in
    /// the PropertyID itself.
    pub inline_bool: bool,
}

impl PropertyId {
    fn from_u32(offset: u64, value: u32) -> ParseResult<Self> {
        let name = value & 0x03FF_FFFF;
        let tag_bits = ((value >> 26) & 0x1F) as u8;
        let inline_bool = (value >> 31) & 1 != 0;
        let tag = PropertyTag::try_from(tag_bits).map_err(|_| ParseError::UnknownNodeId {
            offset,
            id: tag_bits as u16,
        })?;
        Ok(Self {
            name,
            tag,
            inline_bool,
        })
    }
}

#[derive(Clone, Debug)]
pub enum PropertyValue<'a> {
    NoData,
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    /// Raw bytes behind a `FourBytesOfLengthFollowedByData` property.
    /// Text properties are this variant; decode with
    /// [`decode_utf16_text`].
    Bytes(&'a [u8]),
    ObjectId(ExtendedGuid),
    ObjectIdArray(Vec<ExtendedGuid>),
    ObjectSpaceId(ExtendedGuid),
    ObjectSpaceIdArray(Vec<ExtendedGuid>),
    ContextId(ExtendedGuid),
    ContextIdArray(Vec<ExtendedGuid>),
    PropertySet(PropertySet<'a>),
    Array(Vec<PropertySet<'a>>),
}

#[derive(Clone, Debug, Default)]
pub struct PropertySet<'a> {
    pub properties: Vec<(PropertyId, PropertyValue<'a>)>,
}

impl<'a> PropertySet<'a> {
    pub fn get(&self, name: PropertyName) -> Option<&PropertyValue<'a>> {
        self.properties
            .iter()
            .find(|(id, _)| id.name == name)
            .map(|(_, value)| value)
    }
}

/// Decodes a little-endian UTF-16 byte string, trimming a single
/// trailing null.
pub fn decode_utf16_text(bytes: &[u8]) -> String {
    let mut units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    if units.last() == Some(&0) {
        units.pop();
    }

    String::from_utf16_lossy(&units)
}

/// A stream of CompactIDs consumed strictly positionally: property
/// decoding calls `take_one`/`take_n` in lockstep with the PropertyID
/// array, and never re-reads or looks ahead.
#[derive(Default)]
struct IdStream {
    ids: Vec<CompactId>,
    pos: usize,
}

impl IdStream {
    fn take_one(&mut self, offset: u64, name: &'static str) -> ParseResult<CompactId> {
        let id = *self
            .ids
            .get(self.pos)
            .ok_or(ParseError::PropertyStreamExhausted {
                offset,
                stream: name,
            })?;
        self.pos += 1;
        Ok(id)
    }

    fn take_n(&mut self, offset: u64, n: usize, name: &'static str) -> ParseResult<Vec<CompactId>> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.ids.len())
            .ok_or(ParseError::PropertyStreamExhausted {
                offset,
                stream: name,
            })?;
        let slice = self.ids[self.pos..end].to_vec();
        self.pos = end;
        Ok(slice)
    }

    fn is_exhausted(&self) -> bool {
        self.pos == self.ids.len()
    }
}

struct StreamHeader {
    count: u32,
    osid_stream_not_present: bool,
    extended_streams_present: bool,
}

fn read_stream_header(r: &mut ByteReader) -> ParseResult<StreamHeader> {
    let raw = r.u32()?;
    Ok(StreamHeader {
        count: raw & 0x3FFF_FFFF,
        osid_stream_not_present: (raw >> 30) & 1 != 0,
        extended_streams_present: (raw >> 31) & 1 != 0,
    })
}

fn read_id_stream(r: &mut ByteReader, count: u32) -> ParseResult<IdStream> {
    let mut ids = Vec::with_capacity(count as usize);
    for _ in 0..count {
        ids.push(CompactId::from_u32(r.u32()?));
    }
    Ok(IdStream { ids, pos: 0 })
}

/// Decodes a full `ObjectSpaceObjectPropSet`: the three ID streams
/// followed by the PropertySet body, resolving ObjectID-family
/// properties against `table` (the owning object space's Global
/// Identification Table) as they're read.
pub fn decode_object_space_object_prop_set<'a>(
    buf: &'a [u8],
    table: &[ExtendedGuid],
) -> ParseResult<PropertySet<'a>> {
    let mut r = ByteReader::new(buf);

    let oids_header = read_stream_header(&mut r)?;
    let mut oids = read_id_stream(&mut r, oids_header.count)?;

    let mut osids = IdStream::default();
    if !oids_header.osid_stream_not_present {
        let osids_header = read_stream_header(&mut r)?;
        osids = read_id_stream(&mut r, osids_header.count)?;
    }

    let mut context_ids = IdStream::default();
    if oids_header.extended_streams_present {
        let context_header = read_stream_header(&mut r)?;
        context_ids = read_id_stream(&mut r, context_header.count)?;
    }

    let property_set = decode_property_set_body(&mut r, table, &mut oids, &mut osids, &mut context_ids, 0)?;

    if !oids.is_exhausted() {
        return Err(ParseError::PropertyStreamExhausted {
            offset: r.tell(),
            stream: "OIDs",
        });
    }
    if !osids.is_exhausted() {
        return Err(ParseError::PropertyStreamExhausted {
            offset: r.tell(),
            stream: "OSIDs",
        });
    }
    if !context_ids.is_exhausted() {
        return Err(ParseError::PropertyStreamExhausted {
            offset: r.tell(),
            stream: "ContextIDs",
        });
    }

    Ok(property_set)
}

fn decode_property_set_body<'a>(
    r: &mut ByteReader<'a>,
    table: &[ExtendedGuid],
    oids: &mut IdStream,
    osids: &mut IdStream,
    context_ids: &mut IdStream,
    depth: u32,
) -> ParseResult<PropertySet<'a>> {
    if depth > MAX_PROPERTY_SET_DEPTH {
        return Err(ParseError::DepthExceeded {
            offset: r.tell(),
            limit: MAX_PROPERTY_SET_DEPTH,
        });
    }

    let count = r.u16()?;
    let mut ids = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let offset = r.tell();
        ids.push(PropertyId::from_u32(offset, r.u32()?)?);
    }

    let mut properties = Vec::with_capacity(ids.len());
    for id in ids {
        let offset = r.tell();
        let value = decode_property_value(r, id, table, oids, osids, context_ids, depth)?;
        let _ = offset;
        properties.push((id, value));
    }

    Ok(PropertySet { properties })
}

fn decode_property_value<'a>(
    r: &mut ByteReader<'a>,
    id: PropertyId,
    table: &[ExtendedGuid],
    oids: &mut IdStream,
    osids: &mut IdStream,
    context_ids: &mut IdStream,
    depth: u32,
) -> ParseResult<PropertyValue<'a>> {
    let offset = r.tell();

    Ok(match id.tag {
        PropertyTag::NoData => PropertyValue::NoData,
        PropertyTag::Bool => PropertyValue::Bool(id.inline_bool),
        PropertyTag::U8 => PropertyValue::U8(r.u8()?),
        PropertyTag::U16 => PropertyValue::U16(r.u16()?),
        PropertyTag::U32 => PropertyValue::U32(r.u32()?),
        PropertyTag::U64 => PropertyValue::U64(r.u64()?),
        PropertyTag::F32 => PropertyValue::F32(r.f32()?),
        PropertyTag::F64 => PropertyValue::F64(r.f64()?),
        PropertyTag::SizedData => {
            let len = r.u32()?;
            PropertyValue::Bytes(r.read_bytes(len as u64)?)
        }
        PropertyTag::ObjectId => {
            let compact = oids.take_one(offset, "OIDs")?;
            PropertyValue::ObjectId(compact.resolve(offset, table)?)
        }
        PropertyTag::ObjectIdArray => {
            let n = r.u32()?;
            let compacts = oids.take_n(offset, n as usize, "OIDs")?;
            let resolved: ParseResult<Vec<_>> =
                compacts.iter().map(|c| c.resolve(offset, table)).collect();
            PropertyValue::ObjectIdArray(resolved?)
        }
        PropertyTag::ObjectSpaceId => {
            let compact = osids.take_one(offset, "OSIDs")?;
            PropertyValue::ObjectSpaceId(compact.resolve(offset, table)?)
        }
        PropertyTag::ObjectSpaceIdArray => {
            let n = r.u32()?;
            let compacts = osids.take_n(offset, n as usize, "OSIDs")?;
            let resolved: ParseResult<Vec<_>> =
                compacts.iter().map(|c| c.resolve(offset, table)).collect();
            PropertyValue::ObjectSpaceIdArray(resolved?)
        }
        PropertyTag::ContextId => {
            let compact = context_ids.take_one(offset, "ContextIDs")?;
            PropertyValue::ContextId(compact.resolve(offset, table)?)
        }
        PropertyTag::ContextIdArray => {
            let n = r.u32()?;
            let compacts = context_ids.take_n(offset, n as usize, "ContextIDs")?;
            let resolved: ParseResult<Vec<_>> =
                compacts.iter().map(|c| c.resolve(offset, table)).collect();
            PropertyValue::ContextIdArray(resolved?)
        }
        PropertyTag::PropertySet => {
            let nested = decode_property_set_body(r, table, oids, osids, context_ids, depth + 1)?;
            PropertyValue::PropertySet(nested)
        }
        PropertyTag::ArrayOfPropertyValues => {
            let n = r.u32()?;
            let mut sets = Vec::with_capacity(n as usize);
            for _ in 0..n {
                sets.push(decode_property_set_body(
                    r,
                    table,
                    oids,
                    osids,
                    context_ids,
                    depth + 1,
                )?);
            }
            PropertyValue::Array(sets)
        }
    })
}
