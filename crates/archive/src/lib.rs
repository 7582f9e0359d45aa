//! Zip archive normalization for the Carimbo gateway
//!
//! A GitHub tagged-source archive nests every file under a synthetic
//! `{repo}-{tag}/` root directory. Bundles are served with that directory
//! stripped so the engine can address assets by their in-repo paths.

use std::io::Cursor;

use carimbo_core::{Error, Result};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Rewrite `data` into a new zip archive with the first path segment removed
/// from every entry name.
///
/// Entry byte contents round-trip exactly; the compression method is
/// re-chosen by the encoder. No entry is dropped or added, with one
/// exception: the root directory entry itself (whose stripped name would be
/// empty) is omitted. An entry whose name contains no `/` at all rejects the
/// whole archive — the input is then not a single-rooted source archive, and
/// stripping would corrupt it.
///
/// # Errors
///
/// Returns [`Error::Archive`] when `data` cannot be parsed as a zip, when an
/// entry is flat (no `/` in its name), or when writing the rewritten stream
/// fails.
pub fn strip_root(data: &[u8]) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(data))
        .map_err(|e| Error::archive(format!("failed to read zip archive: {e}")))?;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| Error::archive(format!("failed to read zip entry {index}: {e}")))?;
        let name = entry.name().to_string();

        let Some((_, stripped)) = name.split_once('/') else {
            return Err(Error::archive(format!(
                "entry '{name}' has no root directory to strip"
            )));
        };
        if stripped.is_empty() {
            // The synthetic root directory itself.
            continue;
        }

        if entry.is_dir() {
            writer
                .add_directory(stripped, options)
                .map_err(|e| Error::archive(format!("failed to write directory entry: {e}")))?;
        } else {
            writer
                .start_file(stripped, options)
                .map_err(|e| Error::archive(format!("failed to write zip entry: {e}")))?;
            std::io::copy(&mut entry, &mut writer)
                .map_err(|e| Error::archive(format!("failed to copy entry contents: {e}")))?;
        }
    }

    let cursor = writer
        .finish()
        .map_err(|e| Error::archive(format!("failed to finalize zip archive: {e}")))?;
    Ok(cursor.into_inner())
}
