//! Object-Space / Revision Layer: assembles the event stream emitted by
//! the FileNodeList walker into object-space manifests, current-revision
//! object declarations, and the Global Identification Table used to
//! resolve CompactIDs.
//!
//! FileNodeID dispatch table; assignments recorded in `DESIGN.md`.

use crate::byte_reader::ByteReader;
use crate::diagnostics::{DiagnosticKind, DiagnosticSink};
use crate::error::ParseResult;
use crate::guid::{CompactId, ExtendedGuid};
use crate::jcid::Jcid;
use crate::node_list::{self, RawNode};
use crate::reference::Reference;

pub const OBJECT_SPACE_MANIFEST_LIST_REFERENCE: u16 = 0x008;
pub const REVISION_MANIFEST_START: u16 = 0x01B;
pub const REVISION_MANIFEST_END: u16 = 0x01C;
pub const GLOBAL_ID_TABLE_START: u16 = 0x021;
pub const GLOBAL_ID_TABLE_ENTRY: u16 = 0x024;
pub const GLOBAL_ID_TABLE_END: u16 = 0x028;
pub const OBJECT_DECLARATION: u16 = 0x02D;

/// An object declaration: `(oid, jcid, body-reference)`. The body
/// reference points at an `ObjectSpaceObjectPropSet` unless
/// `jcid.is_file_data()`, in which case it points at a
/// `FileDataStoreObject`.
#[derive(Clone, Debug)]
pub struct ObjectDeclaration {
    pub offset: u64,
    pub oid: ExtendedGuid,
    pub jcid: Jcid,
    pub body: Option<Reference>,
}

/// One object space's current-revision state: its declarations and any
/// nested child object spaces (e.g. a page's outline lives in its own
/// nested object space).
#[derive(Clone, Debug)]
pub struct ObjectSpace {
    pub gosid: ExtendedGuid,
    pub declarations: Vec<ObjectDeclaration>,
    pub children: Vec<ObjectSpace>,
    /// The current revision's Global Identification Table, scoped to
    /// this object space: CompactIDs in this space's PropertySets
    /// resolve against this table, not a file-wide one.
    pub global_id_table: Vec<ExtendedGuid>,
}

struct Revision {
    declarations: Vec<ObjectDeclaration>,
    table: Vec<ExtendedGuid>,
}

fn read_extended_guid(r: &mut ByteReader) -> ParseResult<ExtendedGuid> {
    let guid = r.read_guid()?;
    let n = r.u32()?;
    Ok(ExtendedGuid { guid, n })
}

/// Decodes one object space, recursing into nested object spaces
/// referenced via [`OBJECT_SPACE_MANIFEST_LIST_REFERENCE`] nodes.
///
/// `gosid` is the identifier the *parent* assigned this object space
/// (nil for the file's root object space, whose declarations live
/// directly in the header's root FileNodeList).
pub fn decode_object_space<'a>(
    buf: &'a [u8],
    gosid: ExtendedGuid,
    reference: Reference,
    depth: u32,
    diagnostics: &mut DiagnosticSink,
) -> ParseResult<ObjectSpace> {
    let nodes = node_list::walk(buf, reference, depth, diagnostics)?;
    decode_from_nodes(buf, gosid, &nodes, depth, diagnostics)
}

fn decode_from_nodes<'a>(
    buf: &'a [u8],
    gosid: ExtendedGuid,
    nodes: &[RawNode<'a>],
    depth: u32,
    diagnostics: &mut DiagnosticSink,
) -> ParseResult<ObjectSpace> {
    let mut revisions: Vec<Revision> = Vec::new();
    let mut current_declarations: Vec<ObjectDeclaration> = Vec::new();
    let mut current_table: Vec<ExtendedGuid> = Vec::new();
    let mut in_revision = false;
    let mut children = Vec::new();

    for node in nodes {
        match node.id {
            REVISION_MANIFEST_START => {
                in_revision = true;
                current_declarations = Vec::new();
                current_table = Vec::new();
            }
            REVISION_MANIFEST_END => {
                if in_revision {
                    revisions.push(Revision {
                        declarations: std::mem::take(&mut current_declarations),
                        table: std::mem::take(&mut current_table),
                    });
                    in_revision = false;
                }
            }
            GLOBAL_ID_TABLE_START | GLOBAL_ID_TABLE_END => {
                // Bracket markers only; entries are the payload.
            }
            GLOBAL_ID_TABLE_ENTRY => {
                let mut r = ByteReader::new(node.inline);
                if let Ok(index) = r.u32() {
                    match read_extended_guid(&mut r) {
                        Ok(entry) => {
                            if index as usize != current_table.len() {
                                diagnostics.record(node.offset, DiagnosticKind::BadCompactId);
                            }
                            current_table.push(entry);
                        }
                        Err(_) => diagnostics.record(node.offset, DiagnosticKind::BadCompactId),
                    }
                }
            }
            OBJECT_DECLARATION => {
                let mut r = ByteReader::new(node.inline);
                let decoded = (|| -> ParseResult<ObjectDeclaration> {
                    let compact_oid = CompactId::from_u32(r.u32()?);
                    let jcid_raw = r.u32()?;
                    let oid = compact_oid.resolve(node.offset, &current_table)?;
                    Ok(ObjectDeclaration {
                        offset: node.offset,
                        oid,
                        jcid: Jcid::from_u32(jcid_raw),
                        body: node.reference,
                    })
                })();

                match decoded {
                    Ok(declaration) => current_declarations.push(declaration),
                    Err(_) => diagnostics.record(node.offset, DiagnosticKind::BadCompactId),
                }
            }
            OBJECT_SPACE_MANIFEST_LIST_REFERENCE => {
                if let Some(child_ref) = node.reference {
                    let mut r = ByteReader::new(node.inline);
                    match read_extended_guid(&mut r) {
                        Ok(child_gosid) => {
                            match decode_object_space(
                                buf,
                                child_gosid,
                                child_ref,
                                depth + 1,
                                diagnostics,
                            ) {
                                Ok(child) => children.push(child),
                                Err(err) if !err.is_always_fatal() => {
                                    diagnostics.record(node.offset, DiagnosticKind::BadReference);
                                }
                                Err(err) => return Err(err),
                            }
                        }
                        Err(_) => diagnostics.record(node.offset, DiagnosticKind::BadReference),
                    }
                }
            }
            other => {
                diagnostics.record(node.offset, DiagnosticKind::UnknownNodeId);
                let _ = other;
            }
        }
    }

    // A dangling open revision (malformed RevisionManifestEnd) still
    // contributes its declarations rather than being silently dropped.
    if in_revision {
        revisions.push(Revision {
            declarations: current_declarations,
            table: current_table,
        });
    }

    // Retain only the most recent revision; older ones are ignored
    // silently.
    let (declarations, global_id_table) = revisions
        .pop()
        .map(|r| (r.declarations, r.table))
        .unwrap_or_default();

    Ok(ObjectSpace {
        gosid,
        declarations,
        children,
        global_id_table,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guid::Guid;

    fn node_header(id: u16, size: u32, stp_format: u8, cb_format: u8, base_type: u8) -> u32 {
        (id as u32 & 0x3FF)
            | ((size & 0x1FFF) << 10)
            | ((stp_format as u32 & 0b11) << 23)
            | ((cb_format as u32 & 0b11) << 25)
            | ((base_type as u32 & 0xF) << 27)
    }

    fn revision_start() -> Vec<u8> {
        node_header(REVISION_MANIFEST_START, 4, 0, 0, 0)
            .to_le_bytes()
            .to_vec()
    }

    fn revision_end() -> Vec<u8> {
        node_header(REVISION_MANIFEST_END, 4, 0, 0, 0)
            .to_le_bytes()
            .to_vec()
    }

    fn object_declaration(oid_compact: u32, jcid: u32) -> Vec<u8> {
        let mut bytes = node_header(OBJECT_DECLARATION, 4 + 8 + 8, 1, 0, 1)
            .to_le_bytes()
            .to_vec();
        bytes.extend_from_slice(&0u32.to_le_bytes()); // reference stp
        bytes.extend_from_slice(&0u32.to_le_bytes()); // reference cb (zero = empty, not nil)
        bytes.extend_from_slice(&oid_compact.to_le_bytes());
        bytes.extend_from_slice(&jcid.to_le_bytes());
        bytes
    }

    const FRAGMENT_HEADER_MAGIC: u64 = 0xA456_7AB1_F5F7_F4C4;
    const FRAGMENT_FOOTER_MAGIC: u64 = 0x8BC2_15C3_8233_BA4B;
    const CHUNK_TERMINATOR: u16 = 0x0FF;

    fn wrap_fragment(nodes: &[u8]) -> Vec<u8> {
        let mut bytes = vec![];
        bytes.extend_from_slice(&FRAGMENT_HEADER_MAGIC.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(nodes);
        bytes.extend_from_slice(&node_header(CHUNK_TERMINATOR, 4, 0, 0, 0).to_le_bytes());
        bytes.extend_from_slice(&[0xFF; 12]);
        bytes.extend_from_slice(&FRAGMENT_FOOTER_MAGIC.to_le_bytes());
        bytes
    }

    #[test]
    fn single_revision_single_declaration() {
        let mut nodes = vec![];
        nodes.extend(revision_start());
        nodes.extend(object_declaration(0, 0x0006_0007));
        nodes.extend(revision_end());

        let bytes = wrap_fragment(&nodes);
        let mut diagnostics = DiagnosticSink::new();
        let space = decode_object_space(
            &bytes,
            ExtendedGuid::NIL,
            Reference { stp: 0, cb: bytes.len() as u64 },
            0,
            &mut diagnostics,
        )
        .unwrap();

        assert_eq!(space.declarations.len(), 1);
        assert_eq!(space.declarations[0].jcid.raw_index, 0x0007);
    }

    #[test]
    fn only_the_last_revision_is_retained() {
        let mut nodes = vec![];
        nodes.extend(revision_start());
        nodes.extend(object_declaration(0, 0x0006_0007));
        nodes.extend(revision_end());
        nodes.extend(revision_start());
        nodes.extend(object_declaration(0, 0x0006_000B));
        nodes.extend(object_declaration(0, 0x0006_000C));
        nodes.extend(revision_end());

        let bytes = wrap_fragment(&nodes);
        let mut diagnostics = DiagnosticSink::new();
        let space = decode_object_space(
            &bytes,
            ExtendedGuid::NIL,
            Reference { stp: 0, cb: bytes.len() as u64 },
            0,
            &mut diagnostics,
        )
        .unwrap();

        assert_eq!(space.declarations.len(), 2);
        assert_eq!(space.declarations[0].jcid.raw_index, 0x000B);
    }

    #[test]
    fn global_id_table_entry_resolves_compact_ids() {
        let guid = Guid::from_le_bytes([7; 16]);
        let mut nodes = vec![];
        nodes.extend(revision_start());

        let mut entry = node_header(GLOBAL_ID_TABLE_ENTRY, 4 + 4 + 20, 0, 0, 0)
            .to_le_bytes()
            .to_vec();
        entry.extend_from_slice(&0u32.to_le_bytes()); // index 0
        entry.extend_from_slice(&guid.to_le_bytes());
        entry.extend_from_slice(&99u32.to_le_bytes()); // table entry n (unused on resolve)
        nodes.extend(entry);

        // CompactID: n=3, guid_index=0.
        nodes.extend(object_declaration(3, 0x0006_0007));
        nodes.extend(revision_end());

        let bytes = wrap_fragment(&nodes);
        let mut diagnostics = DiagnosticSink::new();
        let space = decode_object_space(
            &bytes,
            ExtendedGuid::NIL,
            Reference { stp: 0, cb: bytes.len() as u64 },
            0,
            &mut diagnostics,
        )
        .unwrap();

        assert_eq!(space.declarations[0].oid.guid, guid);
        assert_eq!(space.declarations[0].oid.n, 3);
    }
}
