//! Runs the combination and the external mapping tool for each map.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::catalog::{CatalogId, CatalogStore};
use crate::combine::{CombinationResult, CombinationSession, CombineConfig};
use crate::imaging::{
    ChannelRange, ImagingError, MapKey, MappingPipeline, plan_maps, select_map_files,
};
use crate::uvdata;

/// Environment variable carrying the channel range to the mapping tool.
pub const CHANNELS_ENV: &str = "SDMAP_CHANNELS";

/// Result of imaging one map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapOutcome {
    pub key: MapKey,
    pub feeds: BTreeSet<u32>,
    pub files: Vec<PathBuf>,
    pub channels: ChannelRange,
    pub combination: CombinationResult,
}

/// Drives combination and mapping for a set of calibrated products.
///
/// The mapping tool is called as `<tool> <catalog id> -u=_<start>_<end>`
/// from the data directory, with the channel range in [`CHANNELS_ENV`].
#[derive(Debug, Clone)]
pub struct ImagingRunner {
    catalog_id: CatalogId,
    mapping_tool: PathBuf,
    combine: CombineConfig,
    channels: Option<ChannelRange>,
}

impl ImagingRunner {
    pub fn new(
        catalog_id: CatalogId,
        mapping_tool: impl Into<PathBuf>,
        combine: CombineConfig,
    ) -> Self {
        Self {
            catalog_id,
            mapping_tool: mapping_tool.into(),
            combine,
            channels: None,
        }
    }

    /// Fixed channel range instead of one derived from each map's data.
    pub fn with_channels(mut self, channels: Option<ChannelRange>) -> Self {
        self.channels = channels;
        self
    }

    pub fn check_tool(&self) -> Result<(), ImagingError> {
        if self.mapping_tool.is_file() {
            Ok(())
        } else {
            Err(ImagingError::ToolMissing {
                path: self.mapping_tool.clone(),
            })
        }
    }

    /// Images every map planned from `pipelines`, stopping at the first
    /// failure. The mapping tool is checked before any work starts.
    pub fn run<S: CatalogStore + ?Sized>(
        &self,
        store: &mut S,
        dir: &Path,
        pipelines: &[MappingPipeline],
    ) -> Result<Vec<MapOutcome>, ImagingError> {
        self.check_tool()?;

        let plan = plan_maps(pipelines);
        tracing::info!(maps = plan.len(), dir = %dir.display(), "Start imaging");

        let mut outcomes = Vec::with_capacity(plan.len());
        for (key, feeds) in plan {
            outcomes.push(self.run_map(store, dir, key, feeds)?);
        }
        Ok(outcomes)
    }

    pub fn run_map<S: CatalogStore + ?Sized>(
        &self,
        store: &mut S,
        dir: &Path,
        key: MapKey,
        feeds: BTreeSet<u32>,
    ) -> Result<MapOutcome, ImagingError> {
        tracing::info!(%key, feeds = ?feeds, "Imaging map");

        let files =
            select_map_files(dir, &key, &feeds).map_err(|source| ImagingError::Listing {
                dir: dir.to_path_buf(),
                source,
            })?;
        let Some(first) = files.first() else {
            return Err(ImagingError::NoFiles {
                key,
                dir: dir.to_path_buf(),
            });
        };

        let channels = match self.channels {
            Some(channels) => channels,
            None => {
                let (_, header) = uvdata::read_header(first).map_err(|source| {
                    ImagingError::Header {
                        path: first.clone(),
                        source,
                    }
                })?;
                ChannelRange::default_for(header.channel_count.round().max(0.0) as u32)
            }
        };

        let combination = CombinationSession::new(self.catalog_id, &files, self.combine.clone())
            .run(store)
            .map_err(|source| ImagingError::Combine { key, source })?;
        tracing::info!(%key, "... (step 1 of 2) done");

        self.invoke_tool(dir, &key, channels)?;
        tracing::info!(%key, "... (step 2 of 2) done");

        Ok(MapOutcome {
            key,
            feeds,
            files,
            channels,
            combination,
        })
    }

    fn invoke_tool(
        &self,
        dir: &Path,
        key: &MapKey,
        channels: ChannelRange,
    ) -> Result<(), ImagingError> {
        let suffix = format!("-u=_{}", key.scan_range_label());
        tracing::debug!(
            tool = %self.mapping_tool.display(),
            catalog = %self.catalog_id,
            suffix = %suffix,
            channels = %channels,
            "Running mapping tool"
        );

        let output = Command::new(&self.mapping_tool)
            .arg(self.catalog_id.to_string())
            .arg(&suffix)
            .env(CHANNELS_ENV, channels.to_string())
            .current_dir(dir)
            .output()
            .map_err(|source| ImagingError::Spawn {
                tool: self.mapping_tool.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::debug!(%key, stdout = %stdout.trim_end(), "Mapping tool stdout");
        tracing::debug!(%key, stderr = %stderr.trim_end(), "Mapping tool stderr");

        if !output.status.success() {
            return Err(ImagingError::ToolFailed {
                tool: self.mapping_tool.clone(),
                key: *key,
                status: output.status,
                stderr: stderr.trim_end().to_string(),
            });
        }
        Ok(())
    }
}
