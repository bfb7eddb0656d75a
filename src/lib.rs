//! A read-only forensic parser for the OneNote binary file format
//! (`.one` section files and `.onetoc2` table-of-contents files).
//!
//! Entry point: [`parse`], which takes the whole file buffer and
//! returns a [`ParseOutput`]: a (possibly partial) entity tree plus the
//! diagnostics collected along the way. Every error [`parse`] itself
//! returns is always-fatal; anything recoverable is folded into
//! `ParseOutput::diagnostics` instead of aborting the run.

pub mod byte_reader;
pub mod diagnostics;
pub mod entity;
pub mod error;
pub mod extract;
pub mod file_data;
pub mod guid;
pub mod header;
pub mod jcid;
pub mod node_list;
pub mod object_space;
pub mod property_set;
pub mod reference;
pub mod report;

use diagnostics::{Diagnostic, DiagnosticSink};
use entity::{Entity, ExtractedFile};
use error::ParseResult;
use guid::ExtendedGuid;
use header::{Header, HeaderInfo};
use object_space::ObjectSpace;

/// The top-level output of a parse run.
pub struct ParseOutput {
    pub header: HeaderInfo,
    pub root: Vec<Entity>,
    pub files: Vec<ExtractedFile>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parses a whole OneNote file already loaded into memory.
///
/// Only the kinds the error-handling design marks always-fatal (a bad
/// file-type signature, or a truncated/corrupt root FileNodeList) abort
/// the run with `Err`. Everything else is recorded as a diagnostic
/// against its offending subtree, which is then pruned, and the run
/// still returns a usable partial tree.
pub fn parse(buf: &[u8]) -> ParseResult<ParseOutput> {
    log::debug!("parsing {} bytes", buf.len());

    let mut r = byte_reader::ByteReader::new(buf);
    let header = Header::read(&mut r)?;

    let mut diagnostics = DiagnosticSink::new();

    let root = match header.file_node_list_root {
        Some(reference) => {
            object_space::decode_object_space(buf, ExtendedGuid::NIL, reference, 0, &mut diagnostics)?
        }
        None => ObjectSpace {
            gosid: ExtendedGuid::NIL,
            declarations: Vec::new(),
            children: Vec::new(),
            global_id_table: Vec::new(),
        },
    };

    let mut files = Vec::new();
    let entities = entity::assemble(buf, &root, &mut files, &mut diagnostics);

    log::info!(
        "parsed {} top-level entities, {} files, {} diagnostics",
        entities.len(),
        files.len(),
        diagnostics.len()
    );

    Ok(ParseOutput {
        header: HeaderInfo::from(&header),
        root: entities,
        files,
        diagnostics: diagnostics.into_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_one_file() -> Vec<u8> {
        let mut bytes = vec![0u8; header::HEADER_SIZE as usize];
        bytes[0..16].copy_from_slice(&header::ONE_FILE_TYPE_GUID.to_le_bytes());
        for b in &mut bytes[0x1C8..0x1E0] {
            *b = 0xFF;
        }
        bytes
    }

    #[test]
    fn parses_empty_one_file_to_empty_tree() {
        let bytes = empty_one_file();
        let output = parse(&bytes).unwrap();
        assert!(output.root.is_empty());
        assert!(output.files.is_empty());
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn bad_signature_is_rejected() {
        let bytes = vec![0u8; header::HEADER_SIZE as usize];
        let err = parse(&bytes).unwrap_err();
        assert!(matches!(err, error::ParseError::BadSignature));
    }

    #[test]
    fn truncated_file_is_rejected() {
        let bytes = vec![0u8; 10];
        let err = parse(&bytes).unwrap_err();
        assert!(matches!(err, error::ParseError::TruncatedInput { .. }));
    }
}
