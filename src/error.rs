//! Error handling types.

use std::error;
use std::fmt::{self, Display};
use std::result;

/// The kind of problem encountered while decoding a OneNote file.
///
/// Mirrors the taxonomy a OneNote parser needs: a handful of kinds are
/// always fatal for the whole file, the rest are recoverable and get
/// folded into a [`crate::diagnostics::Diagnostic`] instead of aborting
/// the parse. See [`ParseError::is_fatal`].
#[derive(Debug)]
pub enum ParseError {
    /// The first 16 bytes match neither the `.one` nor the `.onetoc2`
    /// file-type GUID.
    BadSignature,
    /// A typed read would cross the end of the buffer.
    TruncatedInput {
        offset: u64,
        wanted: u64,
        available: u64,
    },
    /// A `FileNodeList` fragment header or footer magic did not match.
    BadMagic {
        offset: u64,
        expected: u64,
        found: u64,
    },
    /// A `FileNode` header's reserved bit (31) was non-zero.
    ReservedBitSet { offset: u64 },
    /// A `FileNodeID` outside the known set was encountered. Recoverable:
    /// the caller skips the node using its declared `Size`.
    UnknownNodeId { offset: u64, id: u16 },
    /// A recursion ceiling (FileNodeList nesting or PropertySet nesting)
    /// was exceeded.
    DepthExceeded { offset: u64, limit: u32 },
    /// A chunk reference points outside the buffer.
    BadReference { offset: u64, stp: u64, cb: u64 },
    /// A `FileDataStoreObject` header/footer GUID mismatched, or its
    /// declared length overruns the buffer.
    CorruptDataStore { offset: u64, reason: &'static str },
    /// An ObjectID/ObjectSpaceID/ContextID-family property requested more
    /// CompactIDs than its stream holds.
    PropertyStreamExhausted { offset: u64, stream: &'static str },
    /// A `FileNodeList` fragment chain exceeded the sanity limit.
    CyclicOrDeepList { offset: u64 },
    /// A `CompactID`'s `guidIndex` is outside the current Global
    /// Identification Table's population.
    BadCompactId {
        offset: u64,
        guid_index: u32,
        table_len: u32,
    },
    /// The per-run byte-read budget was exceeded (adversarial-input guard).
    BudgetExceeded { offset: u64 },
}

impl ParseError {
    /// Whether this error kind always aborts the whole parse. Per the
    /// propagation policy, `BadSignature` is always fatal; `TruncatedInput`
    /// and `CorruptDataStore` are fatal only at call sites that decode the
    /// root header/root data store, which callers indicate explicitly
    /// rather than this method guessing from the variant alone.
    pub fn is_always_fatal(&self) -> bool {
        matches!(self, ParseError::BadSignature)
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::BadSignature => {
                write!(f, "first 16 bytes match neither known file-type GUID")
            }
            ParseError::TruncatedInput {
                offset,
                wanted,
                available,
            } => write!(
                f,
                "truncated input at offset {offset:#x}: wanted {wanted} bytes, {available} available"
            ),
            ParseError::BadMagic {
                offset,
                expected,
                found,
            } => write!(
                f,
                "bad magic at offset {offset:#x}: expected {expected:#x}, found {found:#x}"
            ),
            ParseError::ReservedBitSet { offset } => {
                write!(f, "FileNode reserved bit set at offset {offset:#x}")
            }
            ParseError::UnknownNodeId { offset, id } => {
                write!(f, "unknown FileNodeID {id:#05x} at offset {offset:#x}")
            }
            ParseError::DepthExceeded { offset, limit } => {
                write!(f, "recursion depth exceeded {limit} at offset {offset:#x}")
            }
            ParseError::BadReference { offset, stp, cb } => write!(
                f,
                "chunk reference at offset {offset:#x} (stp={stp:#x}, cb={cb:#x}) points outside the buffer"
            ),
            ParseError::CorruptDataStore { offset, reason } => write!(
                f,
                "corrupt FileDataStoreObject at offset {offset:#x}: {reason}"
            ),
            ParseError::PropertyStreamExhausted { offset, stream } => write!(
                f,
                "{stream} stream exhausted while decoding properties at offset {offset:#x}"
            ),
            ParseError::CyclicOrDeepList { offset } => write!(
                f,
                "FileNodeList fragment chain too long or cyclic at offset {offset:#x}"
            ),
            ParseError::BadCompactId {
                offset,
                guid_index,
                table_len,
            } => write!(
                f,
                "CompactID at offset {offset:#x} references guidIndex {guid_index}, table has {table_len} entries"
            ),
            ParseError::BudgetExceeded { offset } => {
                write!(f, "byte-read budget exceeded at offset {offset:#x}")
            }
        }
    }
}

impl error::Error for ParseError {}

/// Parse result.
pub type ParseResult<T> = result::Result<T, ParseError>;
