//! File-System Extraction Writer: a pure sink that writes decoded
//! `ExtractedFile` payloads to disk. Consults nothing about the parsed
//! entity tree beyond the `ExtractedFile` records handed to it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::entity::ExtractedFile;

/// Writes `payload` verbatim to `{out_dir}/{suggested_filename or an
/// oid-derived fallback}{suffix}`, creating `out_dir` if it doesn't
/// exist yet.
pub fn extract_all(out_dir: &Path, suffix: &str, files: &[ExtractedFile]) -> io::Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)?;

    files
        .iter()
        .map(|file| {
            let name = file
                .suggested_filename
                .clone()
                .unwrap_or_else(|| fallback_name(file));
            let path = out_dir.join(format!("{name}{suffix}"));
            fs::write(&path, &file.payload)?;
            Ok(path)
        })
        .collect()
}

fn fallback_name(file: &ExtractedFile) -> String {
    format!("{}-{}", file.oid.guid, file.oid.n)
}
