//! Output naming and export of the final entry.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use common::file_utils::stem_without_suffix;

use crate::catalog::{CatalogEntry, CatalogId, CatalogStore};
use crate::combine::CombineError;

/// Output file next to `first_input`: its stem with any trailing `_part`
/// removed, then `suffix` and `extension`.
///
/// `data/W3OH_12_20.sdf` with `_dbcon` and `fits` gives
/// `data/W3OH_12_dbcon.fits`.
pub fn output_path(first_input: &Path, suffix: &str, extension: &str) -> PathBuf {
    let base = stem_without_suffix(first_input);
    let file_name = format!("{base}{suffix}.{extension}");
    match first_input.parent() {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// Writes `entry` to `destination`, removing an existing file first.
pub fn export_entry<S: CatalogStore + ?Sized>(
    store: &S,
    id: CatalogId,
    entry: &CatalogEntry,
    destination: &Path,
) -> Result<(), CombineError> {
    match fs::remove_file(destination) {
        Ok(()) => {
            tracing::info!(
                path = %destination.display(),
                "Removed existing file to make room for new one"
            );
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(CombineError::RemoveExisting {
                path: destination.to_path_buf(),
                source,
            });
        }
    }

    store
        .export(id, entry, destination)
        .map_err(|source| CombineError::Export {
            path: destination.to_path_buf(),
            source,
        })
}
