//! JCID: a 32-bit typed object-class identifier with an index and flag
//! bits, used to dispatch object declarations to the entity tree
//! assembler and the file-data extractor.

use bitflags::bitflags;

bitflags! {
    /// Flag bits packed into the high bits of a JCID, above the 16-bit
    /// index.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct JcidFlags: u32 {
        const IS_BINARY        = 1 << 16;
        const IS_PROPERTY_SET  = 1 << 17;
        const IS_GRAPH_NODE    = 1 << 18;
        const IS_FILE_DATA     = 1 << 19;
        const IS_READ_ONLY     = 1 << 20;
    }
}

/// Known JCID indices this crate dispatches on, falling back to `Other`
/// for anything else.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum KnownIndex {
    SectionNode,
    PageSeriesNode,
    PageNode,
    OutlineNode,
    OutlineElementNode,
    RichTextOENode,
    ImageNode,
    EmbeddedFileNode,
    Other(u16),
}

impl KnownIndex {
    fn from_u16(index: u16) -> Self {
        match index {
            0x0007 => KnownIndex::SectionNode,
            0x0008 => KnownIndex::PageSeriesNode,
            0x000B => KnownIndex::PageNode,
            0x000C => KnownIndex::OutlineNode,
            0x000D => KnownIndex::OutlineElementNode,
            0x000E => KnownIndex::RichTextOENode,
            0x01C9 => KnownIndex::ImageNode,
            0x0035 => KnownIndex::EmbeddedFileNode,
            other => KnownIndex::Other(other),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Jcid {
    pub index: KnownIndex,
    pub raw_index: u16,
    pub flags: JcidFlags,
}

impl Jcid {
    pub fn from_u32(value: u32) -> Self {
        let raw_index = (value & 0xFFFF) as u16;
        Self {
            index: KnownIndex::from_u16(raw_index),
            raw_index,
            flags: JcidFlags::from_bits_truncate(value),
        }
    }

    /// Whether this object declaration's body is a FileDataStoreObject
    /// reference rather than a PropertySet.
    pub fn is_file_data(&self) -> bool {
        self.flags.contains(JcidFlags::IS_FILE_DATA)
            || matches!(self.index, KnownIndex::EmbeddedFileNode | KnownIndex::ImageNode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decomposes_index_and_flags() {
        let raw = 0x0006_000B | (JcidFlags::IS_PROPERTY_SET.bits());
        let jcid = Jcid::from_u32(raw);
        assert_eq!(jcid.raw_index, 0x000B);
        assert_eq!(jcid.index, KnownIndex::PageNode);
        assert!(jcid.flags.contains(JcidFlags::IS_PROPERTY_SET));
        assert!(!jcid.is_file_data());
    }

    #[test]
    fn embedded_file_node_is_file_data() {
        let jcid = Jcid::from_u32(0x0006_0035);
        assert!(jcid.is_file_data());
    }

    #[test]
    fn is_file_data_flag_alone_routes_to_extractor() {
        let jcid = Jcid::from_u32(0x0001_0000 | JcidFlags::IS_FILE_DATA.bits());
        assert!(jcid.is_file_data());
    }
}
