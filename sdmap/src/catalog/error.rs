//! Error types for catalog operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::{CatalogEntry, Disk};
use crate::engine::EngineError;
use crate::uvdata::UvFitsError;

/// Errors raised by a [`CatalogStore`](crate::catalog::CatalogStore).
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog id must be a positive integer, got {0}")]
    InvalidCatalogId(u32),

    #[error("Invalid class tag '{0}': expected 1 to 6 ASCII letters, digits or '_'")]
    InvalidClassTag(String),

    #[error("Disk {disk} is not configured ({available} disks available)")]
    UnknownDisk { disk: Disk, available: usize },

    #[error("Failed to load '{path}' into the catalog: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: UvFitsError,
    },

    #[error("No catalog entry at position {position} on disk {disk} ({len} entries)")]
    NotFound {
        disk: Disk,
        position: isize,
        len: usize,
    },

    #[error("Catalog entry {entry} does not exist")]
    StaleReference { entry: CatalogEntry },

    #[error("Catalog slot {entry} is already occupied")]
    SlotOccupied { entry: CatalogEntry },

    #[error("Failed to read catalog slot {entry}: {source}")]
    SlotRead {
        entry: CatalogEntry,
        #[source]
        source: UvFitsError,
    },

    #[error("Failed to write catalog slot {entry}: {source}")]
    SlotWrite {
        entry: CatalogEntry,
        #[source]
        source: UvFitsError,
    },

    #[error("{operation} of {entry} failed: {source}")]
    Engine {
        operation: &'static str,
        entry: CatalogEntry,
        #[source]
        source: EngineError,
    },

    #[error("Failed to export {entry} to '{path}': {source}")]
    Export {
        entry: CatalogEntry,
        path: PathBuf,
        #[source]
        source: UvFitsError,
    },

    #[error("No scratch disk available besides avoided disk {avoid}")]
    NoScratchDisk { avoid: Disk },

    #[error("Catalog I/O failed at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Catalog index '{path}' is unreadable: {source}")]
    Index {
        path: PathBuf,
        #[source]
        source: common::SerdeFormatError,
    },
}
