//! JSON Report Serializer: renders a [`crate::ParseOutput`] as a
//! `serde_json` document, honouring `--json-include` section filtering
//! and `--json-files-no-content` digest substitution.

use sha2::{Digest, Sha256};
use serde::Serialize;

use crate::diagnostics::Diagnostic;
use crate::entity::{Entity, ExtractedFile};
use crate::header::HeaderInfo;

/// The top-level sections `--json-include` can select between.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ReportSection {
    Headers,
    Entities,
    Files,
    Diagnostics,
}

impl ReportSection {
    fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "headers" => Some(Self::Headers),
            "entities" => Some(Self::Entities),
            "files" => Some(Self::Files),
            "diagnostics" => Some(Self::Diagnostics),
            _ => None,
        }
    }
}

/// Parses a comma-separated `--json-include` argument. Unknown section
/// names are ignored rather than rejected, matching the tolerant
/// "omitted sections are simply not populated" framing.
pub fn parse_sections(csv: &str) -> Vec<ReportSection> {
    csv.split(',').filter_map(ReportSection::parse).collect()
}

#[derive(Serialize)]
struct FileEntry {
    oid: String,
    suggested_filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha256: Option<String>,
}

#[derive(Serialize)]
pub struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    headers: Option<HeaderInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entities: Option<Vec<Entity>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    files: Option<Vec<FileEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostics: Option<Vec<Diagnostic>>,
}

/// Builds a [`Report`], populating only the requested `sections` (all
/// four if `sections` is empty, matching "no filter means everything").
pub fn build_report(
    sections: &[ReportSection],
    header: &HeaderInfo,
    entities: &[Entity],
    files: &[ExtractedFile],
    diagnostics: &[Diagnostic],
    redact_file_content: bool,
) -> Report {
    let want = |section: ReportSection| sections.is_empty() || sections.contains(&section);

    Report {
        headers: want(ReportSection::Headers).then(|| header.clone()),
        entities: want(ReportSection::Entities).then(|| entities.to_vec()),
        files: want(ReportSection::Files).then(|| {
            files
                .iter()
                .map(|file| {
                    if redact_file_content {
                        let digest = Sha256::digest(&file.payload);
                        FileEntry {
                            oid: file.oid.to_string(),
                            suggested_filename: file.suggested_filename.clone(),
                            payload: None,
                            sha256: Some(format!("{digest:x}")),
                        }
                    } else {
                        FileEntry {
                            oid: file.oid.to_string(),
                            suggested_filename: file.suggested_filename.clone(),
                            payload: Some(file.payload.clone()),
                            sha256: None,
                        }
                    }
                })
                .collect()
        }),
        diagnostics: want(ReportSection::Diagnostics).then(|| diagnostics.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::entity::{EntityKind, PropertyMap};
    use crate::guid::{ExtendedGuid, Guid};
    use crate::header::FileKind;

    fn sample_header() -> HeaderInfo {
        HeaderInfo {
            kind: FileKind::Section,
            guid_file: ExtendedGuid::NIL.guid,
            guid_file_format: ExtendedGuid::NIL.guid,
        }
    }

    fn sample_entity() -> Entity {
        Entity {
            kind: EntityKind::Section,
            oid: ExtendedGuid { guid: Guid::from_le_bytes([1; 16]), n: 1 },
            properties: PropertyMap::default(),
            children: vec![],
        }
    }

    #[test]
    fn empty_sections_includes_everything() {
        let report = build_report(&[], &sample_header(), &[sample_entity()], &[], &[], false);
        let value = serde_json::to_value(&report).unwrap();
        assert!(value.get("headers").is_some());
        assert!(value.get("entities").is_some());
        assert!(value.get("files").is_some());
        assert!(value.get("diagnostics").is_some());
    }

    #[test]
    fn filtering_to_one_section_omits_the_rest() {
        let report = build_report(
            &[ReportSection::Entities],
            &sample_header(),
            &[sample_entity()],
            &[],
            &[],
            false,
        );
        let value = serde_json::to_value(&report).unwrap();
        assert!(value.get("headers").is_none());
        assert!(value.get("entities").is_some());
        assert!(value.get("files").is_none());
    }

    #[test]
    fn redacted_file_content_is_a_digest_not_bytes() {
        let file = ExtractedFile {
            oid: ExtendedGuid::NIL,
            suggested_filename: Some("x.bin".into()),
            payload: b"hello".to_vec(),
        };
        let report = build_report(
            &[ReportSection::Files],
            &sample_header(),
            &[],
            std::slice::from_ref(&file),
            &[],
            true,
        );
        let value = serde_json::to_value(&report).unwrap();
        let entry = &value["files"][0];
        assert!(entry.get("payload").is_none());
        assert_eq!(
            entry["sha256"].as_str().unwrap(),
            format!("{:x}", Sha256::digest(b"hello"))
        );
    }

    #[test]
    fn unrecognized_section_name_is_ignored() {
        assert_eq!(parse_sections("headers,bogus,files"), vec![ReportSection::Headers, ReportSection::Files]);
    }

    #[test]
    fn diagnostics_section_reports_recorded_kind() {
        let diagnostic = Diagnostic { offset: 0x40, kind: DiagnosticKind::UnknownNodeId };
        let report = build_report(
            &[ReportSection::Diagnostics],
            &sample_header(),
            &[],
            &[],
            std::slice::from_ref(&diagnostic),
            false,
        );
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["diagnostics"][0]["offset"], 0x40);
    }
}
