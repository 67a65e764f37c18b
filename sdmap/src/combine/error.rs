//! Error types for combination sessions.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::CatalogError;

/// Errors that end a combination session.
///
/// None of them are recovered locally. Entries created before the failure
/// stay in the catalog until the next session clears it.
#[derive(Debug, Error)]
pub enum CombineError {
    #[error("No spectra accepted for combination ({loaded} loaded, {rejected} rejected)")]
    NoInput { loaded: usize, rejected: usize },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Failed to remove existing output '{path}': {source}")]
    RemoveExisting {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to export combined spectra to '{path}': {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: CatalogError,
    },
}
