//! Recoverable-error bookkeeping. Most error kinds are recoverable:
//! recorded against the offending offset, with the offending subtree
//! pruned, while the parse as a whole continues and still yields a
//! usable (partial) tree.

use serde::Serialize;

/// The recoverable subset of [`crate::error::ParseError`]. Kept as its
/// own small enum (rather than reusing `ParseError` directly) since a
/// `Diagnostic` is a report artifact: it needs to be `Serialize` for
/// the JSON report, and it never needs to carry a live borrow.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum DiagnosticKind {
    ReservedBitSet,
    UnknownNodeId,
    BadReference,
    CorruptDataStore,
    PropertyStreamExhausted,
    BadCompactId,
    /// A `FileNode` header declared a `Size` too small to hold even its
    /// own header. Recoverable: the fragment's remaining nodes are
    /// abandoned but the file as a whole still parses.
    TruncatedNode,
}

#[derive(Clone, Debug, Serialize)]
pub struct Diagnostic {
    pub offset: u64,
    pub kind: DiagnosticKind,
}

/// Accumulates diagnostics across a parse run. Threaded by mutable
/// reference through the node-list walker, the object-space layer, and
/// the property-set decoder rather than returned piecemeal from each,
/// since a single object can fail in more than one recoverable way
/// while its siblings keep decoding.
#[derive(Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, offset: u64, kind: DiagnosticKind) {
        log::warn!("recoverable parse issue at offset {offset:#x}: {kind:?}");
        self.diagnostics.push(Diagnostic { offset, kind });
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_order() {
        let mut sink = DiagnosticSink::new();
        sink.record(0x10, DiagnosticKind::UnknownNodeId);
        sink.record(0x20, DiagnosticKind::BadReference);
        let diagnostics = sink.into_vec();
        assert_eq!(diagnostics[0].offset, 0x10);
        assert_eq!(diagnostics[1].offset, 0x20);
    }
}
