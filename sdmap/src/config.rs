//! Pipeline configuration file.
//!
//! ```yaml
//! disks:
//!   - /data/catalog/DA01
//!   - /data/catalog/DA02
//! combine:
//!   working_disk: 2
//!   avoid_disk: 1
//!   tolerance_hz: 100000.0
//! mapping_tool: /opt/sdmap/bin/create-maps
//! log_dir: logs
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use common::{FileExtensionError, FileFormat, SerdeFormatError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{CatalogError, Disk, check_class_tag};
use crate::combine::CombineConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported config file '{path}': {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: FileExtensionError,
    },

    #[error("Failed to parse config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: SerdeFormatError,
    },

    #[error("No catalog disks configured")]
    NoDisks,

    #[error("{role} disk {disk} is not configured ({available} disks available)")]
    DiskOutOfRange {
        role: &'static str,
        disk: Disk,
        available: usize,
    },

    #[error("Invalid combine.sort_class: {0}")]
    SortClass(#[source] CatalogError),

    #[error("Frequency tolerance must be a non-negative number of Hz, got {0}")]
    InvalidTolerance(f64),
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Catalog disk roots; disk `n` is the `n`-th root.
    pub disks: Vec<PathBuf>,
    pub combine: CombineConfig,
    /// External executable that turns the exported spectra into maps.
    pub mapping_tool: Option<PathBuf>,
    /// Directory for rolling log files. `None` logs to the console only.
    pub log_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            disks: vec![
                PathBuf::from("catalog/DA01"),
                PathBuf::from("catalog/DA02"),
            ],
            combine: CombineConfig::default(),
            mapping_tool: None,
            log_dir: Some(PathBuf::from("logs")),
        }
    }
}

impl PipelineConfig {
    /// Loads a YAML or JSON config, chosen by file extension.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let format = FileFormat::from_file_name(&path.to_string_lossy()).map_err(|source| {
            ConfigError::Format {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            common::deserialize(&text, format).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::debug!(path = %path.display(), ?format, "Loaded pipeline config");
        Ok(config)
    }

    /// Checks that the combination disks exist and the tolerance and sort
    /// class are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.disks.is_empty() {
            return Err(ConfigError::NoDisks);
        }

        let available = self.disks.len();
        let check = |role: &'static str, disk: Disk| {
            if disk.index() < available {
                Ok(())
            } else {
                Err(ConfigError::DiskOutOfRange {
                    role,
                    disk,
                    available,
                })
            }
        };
        check("Working", self.combine.working_disk)?;
        if let Some(avoid) = self.combine.avoid_disk {
            check("Avoided", avoid)?;
        }

        let tolerance = self.combine.tolerance_hz;
        if !(tolerance.is_finite() && tolerance >= 0.0) {
            return Err(ConfigError::InvalidTolerance(tolerance));
        }
        check_class_tag(&self.combine.sort_class).map_err(ConfigError::SortClass)
    }
}
