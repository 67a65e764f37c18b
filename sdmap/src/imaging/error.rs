use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::combine::CombineError;
use crate::imaging::MapKey;
use crate::uvdata::UvFitsError;

#[derive(Debug, Error)]
pub enum ImagingError {
    #[error("Mapping tool '{path}' not found")]
    ToolMissing { path: PathBuf },

    #[error("No calibrated files for {key} in '{dir}'")]
    NoFiles { key: MapKey, dir: PathBuf },

    #[error("Failed to list '{dir}': {source}")]
    Listing {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read channel count from '{path}': {source}")]
    Header {
        path: PathBuf,
        #[source]
        source: UvFitsError,
    },

    #[error("Combination for {key} failed: {source}")]
    Combine {
        key: MapKey,
        #[source]
        source: CombineError,
    },

    #[error("Failed to start mapping tool '{tool}': {source}")]
    Spawn {
        tool: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Mapping tool '{tool}' failed for {key} ({status}): {stderr}")]
    ToolFailed {
        tool: PathBuf,
        key: MapKey,
        status: ExitStatus,
        stderr: String,
    },
}
