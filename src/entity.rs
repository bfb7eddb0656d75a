//! Entity Tree Assembly: bridges the object-declaration graph and
//! decoded PropertySets into a navigable tree, resolving child-listing
//! ObjectID/ObjectIDArray properties and routing file-data declarations
//! to the file-data extractor instead of expanding them as child
//! entities.
//!
//! Holds no decoding logic of its own: it dispatches and walks what the
//! object-space and property-set layers already produced.

use std::collections::HashMap;

use crate::diagnostics::{DiagnosticKind, DiagnosticSink};
use crate::file_data::decode_file_data_store_object;
use crate::guid::ExtendedGuid;
use crate::jcid::{Jcid, KnownIndex};
use crate::object_space::{ObjectDeclaration, ObjectSpace};
use crate::property_set::{self, PropertyName, PropertySet, PropertyValue};

/// The known JCID-driven entity roles recognized structurally.
/// Everything else is reported as `Other`, carrying the raw JCID so a
/// caller can still identify it.
#[derive(Clone, Copy, PartialEq, Eq, Debug, serde::Serialize)]
pub enum EntityKind {
    Section,
    Page,
    Outline,
    RichText,
    Image,
    EmbeddedFile,
    Other,
}

impl EntityKind {
    fn from_jcid(jcid: &Jcid) -> Self {
        match jcid.index {
            KnownIndex::SectionNode => EntityKind::Section,
            KnownIndex::PageSeriesNode | KnownIndex::PageNode => EntityKind::Page,
            KnownIndex::OutlineNode | KnownIndex::OutlineElementNode => EntityKind::Outline,
            KnownIndex::RichTextOENode => EntityKind::RichText,
            KnownIndex::ImageNode => EntityKind::Image,
            KnownIndex::EmbeddedFileNode => EntityKind::EmbeddedFile,
            KnownIndex::Other(_) => EntityKind::Other,
        }
    }
}

/// Property names (the low-26-bit portion of a PropertyID) this crate
/// recognizes as carrying a list of child object references. Numeric
/// assignments recorded in `DESIGN.md`.
pub const ELEMENT_CHILD_NODES: PropertyName = 0x0001;
pub const RICH_TEXT_OE_CHILDREN: PropertyName = 0x0002;

const CHILD_LIST_PROPERTIES: &[PropertyName] = &[ELEMENT_CHILD_NODES, RICH_TEXT_OE_CHILDREN];

/// Property name carrying the `FileChunkReference` to a file-data
/// declaration's `FileDataStoreObject`. Physical encoding is
/// `SizedData` carrying the reference's raw 12 bytes (u64 stp, u32 cb),
/// the same shape as a standalone `FileChunkReference64x32`.
pub const FILE_DATA_REFERENCE: PropertyName = 0x0003;

/// Property name carrying the file-data declaration's suggested
/// filename. `SizedData`-encoded UTF-16 text, decoded with
/// [`property_set::decode_utf16_text`].
pub const FILE_NAME: PropertyName = 0x0004;

#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct PropertyMap {
    #[serde(serialize_with = "serialize_property_map")]
    entries: HashMap<PropertyName, PropertyValueOwned>,
}

/// An owned rendering of [`PropertyValue`], detached from the source
/// buffer's lifetime so it can live inside a long-lived [`Entity`] tree
/// independent of the original parse call's borrow.
#[derive(Clone, Debug, serde::Serialize)]
pub enum PropertyValueOwned {
    NoData,
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Bytes(Vec<u8>),
    ObjectId(ExtendedGuid),
    ObjectIdArray(Vec<ExtendedGuid>),
    ObjectSpaceId(ExtendedGuid),
    ObjectSpaceIdArray(Vec<ExtendedGuid>),
    ContextId(ExtendedGuid),
    ContextIdArray(Vec<ExtendedGuid>),
    PropertySet(PropertyMap),
    Array(Vec<PropertyMap>),
}

fn serialize_property_map<S>(
    entries: &HashMap<PropertyName, PropertyValueOwned>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeMap;
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (name, value) in entries {
        map.serialize_entry(&name.to_string(), value)?;
    }
    map.end()
}

impl PropertyMap {
    pub fn get(&self, name: PropertyName) -> Option<&PropertyValueOwned> {
        self.entries.get(&name)
    }

    fn from_decoded(decoded: PropertySet) -> Self {
        let entries = decoded
            .properties
            .into_iter()
            .map(|(id, value)| (id.name, to_owned(value)))
            .collect();
        Self { entries }
    }
}

fn to_owned(value: PropertyValue) -> PropertyValueOwned {
    match value {
        PropertyValue::NoData => PropertyValueOwned::NoData,
        PropertyValue::Bool(b) => PropertyValueOwned::Bool(b),
        PropertyValue::U8(v) => PropertyValueOwned::U8(v),
        PropertyValue::U16(v) => PropertyValueOwned::U16(v),
        PropertyValue::U32(v) => PropertyValueOwned::U32(v),
        PropertyValue::U64(v) => PropertyValueOwned::U64(v),
        PropertyValue::F32(v) => PropertyValueOwned::F32(v),
        PropertyValue::F64(v) => PropertyValueOwned::F64(v),
        PropertyValue::Bytes(bytes) => PropertyValueOwned::Bytes(bytes.to_vec()),
        PropertyValue::ObjectId(id) => PropertyValueOwned::ObjectId(id),
        PropertyValue::ObjectIdArray(ids) => PropertyValueOwned::ObjectIdArray(ids),
        PropertyValue::ObjectSpaceId(id) => PropertyValueOwned::ObjectSpaceId(id),
        PropertyValue::ObjectSpaceIdArray(ids) => PropertyValueOwned::ObjectSpaceIdArray(ids),
        PropertyValue::ContextId(id) => PropertyValueOwned::ContextId(id),
        PropertyValue::ContextIdArray(ids) => PropertyValueOwned::ContextIdArray(ids),
        PropertyValue::PropertySet(nested) => {
            PropertyValueOwned::PropertySet(PropertyMap::from_decoded(nested))
        }
        PropertyValue::Array(sets) => PropertyValueOwned::Array(
            sets.into_iter().map(PropertyMap::from_decoded).collect(),
        ),
    }
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub oid: ExtendedGuid,
    pub properties: PropertyMap,
    pub children: Vec<Entity>,
}

/// An embedded file pulled out of a `FileDataStoreObject`, owned and
/// detached from the parse buffer's borrow so it can outlive the
/// `parse()` call that produced it.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ExtractedFile {
    pub oid: ExtendedGuid,
    pub suggested_filename: Option<String>,
    pub payload: Vec<u8>,
}

/// Assembles every object space's current-revision declarations into
/// entities, collecting file-data declarations as [`ExtractedFile`]s
/// along the way instead of expanding them as children.
pub fn assemble(
    buf: &[u8],
    space: &ObjectSpace,
    files: &mut Vec<ExtractedFile>,
    diagnostics: &mut DiagnosticSink,
) -> Vec<Entity> {
    let by_oid: HashMap<ExtendedGuid, &ObjectDeclaration> = space
        .declarations
        .iter()
        .map(|declaration| (declaration.oid, declaration))
        .collect();

    let mut seen = std::collections::HashSet::new();
    let mut entities: Vec<Entity> = space
        .declarations
        .iter()
        .filter_map(|declaration| {
            build_entity(
                buf,
                declaration,
                &by_oid,
                &space.global_id_table,
                files,
                diagnostics,
                &mut seen,
            )
        })
        .collect();

    // Nested object spaces (e.g. a page series' per-page content) are
    // each their own revision root, scoped to their own Global
    // Identification Table; their entities join this level's rather
    // than nesting under a synthetic wrapper node.
    for child_space in &space.children {
        entities.extend(assemble(buf, child_space, files, diagnostics));
    }

    entities
}

fn build_entity(
    buf: &[u8],
    declaration: &ObjectDeclaration,
    by_oid: &HashMap<ExtendedGuid, &ObjectDeclaration>,
    global_table: &[ExtendedGuid],
    files: &mut Vec<ExtractedFile>,
    diagnostics: &mut DiagnosticSink,
    seen: &mut std::collections::HashSet<ExtendedGuid>,
) -> Option<Entity> {
    if !seen.insert(declaration.oid) {
        // Already assembled, either reached earlier as another parent's
        // child (the flat declaration list also lists it at "top level")
        // or a genuine child-listing cycle. Drop the repeat rather than
        // recursing or duplicating it in the tree; not itself an error
        // worth a diagnostic.
        return None;
    }

    let Some(body) = declaration.body else {
        return Some(Entity {
            kind: EntityKind::from_jcid(&declaration.jcid),
            oid: declaration.oid,
            properties: PropertyMap::default(),
            children: Vec::new(),
        });
    };

    if declaration.jcid.is_file_data() {
        extract_file_data(buf, declaration, body, global_table, files, diagnostics);
        return Some(Entity {
            kind: EntityKind::from_jcid(&declaration.jcid),
            oid: declaration.oid,
            properties: PropertyMap::default(),
            children: Vec::new(),
        });
    }

    let region = match slice_reference(buf, body) {
        Some(region) => region,
        None => {
            diagnostics.record(declaration.offset, DiagnosticKind::BadReference);
            return Some(Entity {
                kind: EntityKind::from_jcid(&declaration.jcid),
                oid: declaration.oid,
                properties: PropertyMap::default(),
                children: Vec::new(),
            });
        }
    };

    let decoded = match property_set::decode_object_space_object_prop_set(region, global_table) {
        Ok(decoded) => decoded,
        Err(_) => {
            diagnostics.record(declaration.offset, DiagnosticKind::PropertyStreamExhausted);
            return Some(Entity {
                kind: EntityKind::from_jcid(&declaration.jcid),
                oid: declaration.oid,
                properties: PropertyMap::default(),
                children: Vec::new(),
            });
        }
    };

    let mut children = Vec::new();
    for (id, value) in &decoded.properties {
        if !CHILD_LIST_PROPERTIES.contains(&id.name) {
            continue;
        }
        let child_oids = match value {
            PropertyValue::ObjectIdArray(ids) => ids.clone(),
            PropertyValue::ObjectId(id) => vec![*id],
            _ => continue,
        };
        for child_oid in child_oids {
            if let Some(child_declaration) = by_oid.get(&child_oid) {
                if let Some(child) = build_entity(
                    buf,
                    child_declaration,
                    by_oid,
                    global_table,
                    files,
                    diagnostics,
                    seen,
                ) {
                    children.push(child);
                }
            } else {
                diagnostics.record(declaration.offset, DiagnosticKind::BadCompactId);
            }
        }
    }

    let properties = PropertyMap::from_decoded(decoded);

    Some(Entity {
        kind: EntityKind::from_jcid(&declaration.jcid),
        oid: declaration.oid,
        properties,
        children,
    })
}

/// Resolves a file-data declaration's `FileDataReference` property to
/// locate its `FileDataStoreObject`, decodes it, and pushes the
/// extracted payload (with its sibling `FileName` property, if any).
fn extract_file_data(
    buf: &[u8],
    declaration: &ObjectDeclaration,
    body: crate::reference::Reference,
    global_table: &[ExtendedGuid],
    files: &mut Vec<ExtractedFile>,
    diagnostics: &mut DiagnosticSink,
) {
    let Some(region) = slice_reference(buf, body) else {
        diagnostics.record(declaration.offset, DiagnosticKind::BadReference);
        return;
    };

    let properties = match property_set::decode_object_space_object_prop_set(region, global_table)
    {
        Ok(properties) => properties,
        Err(_) => {
            diagnostics.record(declaration.offset, DiagnosticKind::PropertyStreamExhausted);
            return;
        }
    };

    let Some(PropertyValue::Bytes(reference_bytes)) = properties.get(FILE_DATA_REFERENCE) else {
        diagnostics.record(declaration.offset, DiagnosticKind::CorruptDataStore);
        return;
    };

    let mut reference_reader = crate::byte_reader::ByteReader::new(reference_bytes);
    let store_reference = match crate::reference::read_64x32(&mut reference_reader) {
        Ok(Some(reference)) => reference,
        _ => {
            diagnostics.record(declaration.offset, DiagnosticKind::CorruptDataStore);
            return;
        }
    };

    match decode_file_data_store_object(buf, store_reference) {
        Ok(store) => {
            let suggested_filename = match properties.get(FILE_NAME) {
                Some(PropertyValue::Bytes(name_bytes)) => {
                    Some(property_set::decode_utf16_text(name_bytes))
                }
                _ => None,
            };
            files.push(ExtractedFile {
                oid: declaration.oid,
                suggested_filename,
                payload: store.data.to_vec(),
            });
        }
        Err(_) => diagnostics.record(declaration.offset, DiagnosticKind::CorruptDataStore),
    }
}

fn slice_reference(buf: &[u8], reference: crate::reference::Reference) -> Option<&[u8]> {
    let start = reference.stp as usize;
    let end = reference.end() as usize;
    buf.get(start..end)
}
