//! Grouping of calibrated products into maps and selection of their files.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use common::file_utils::files_with_extensions;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One calibrated product: a feed's spectra for a window and scan range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingPipeline {
    pub window: u32,
    pub start_scan: u32,
    pub end_scan: u32,
    pub feed: u32,
}

/// Identity of one output map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapKey {
    pub window: u32,
    pub start_scan: u32,
    pub end_scan: u32,
}

impl MapKey {
    /// `"{start}_{end}"`, the scan range as it appears in file names.
    pub fn scan_range_label(&self) -> String {
        format!("{}_{}", self.start_scan, self.end_scan)
    }
}

impl From<&MappingPipeline> for MapKey {
    fn from(p: &MappingPipeline) -> Self {
        Self {
            window: p.window,
            start_scan: p.start_scan,
            end_scan: p.end_scan,
        }
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "window {} scans {}-{}",
            self.window, self.start_scan, self.end_scan
        )
    }
}

/// Feeds contributing to each map, both in ascending order.
pub type MapPlan = BTreeMap<MapKey, BTreeSet<u32>>;

pub fn plan_maps(pipelines: &[MappingPipeline]) -> MapPlan {
    let mut plan = MapPlan::new();
    for pipeline in pipelines {
        plan.entry(MapKey::from(pipeline))
            .or_default()
            .insert(pipeline.feed);
    }
    plan
}

/// Calibrated `.fits` files in `dir` for `key`, grouped feed by feed in
/// ascending feed order.
///
/// A candidate's name must contain the scan range label, `window<w>`,
/// `feed` and `pol`, in that order. It belongs to feed `n` when it contains
/// `feed<n>_`.
pub fn select_map_files(
    dir: &Path,
    key: &MapKey,
    feeds: &BTreeSet<u32>,
) -> io::Result<Vec<PathBuf>> {
    let window = format!("window{}", key.window);
    let label = key.scan_range_label();
    let pattern = [label.as_str(), window.as_str(), "feed", "pol"];

    let candidates: Vec<(PathBuf, String)> = files_with_extensions(dir, &["fits"])?
        .into_iter()
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?.to_string();
            contains_in_order(&name, &pattern).then_some((path, name))
        })
        .collect();

    let mut selected = Vec::new();
    for feed in feeds {
        let tag = format!("feed{feed}_");
        selected.extend(
            candidates
                .iter()
                .filter(|(_, name)| name.contains(&tag))
                .map(|(path, _)| path.clone()),
        );
    }
    Ok(selected)
}

fn contains_in_order(name: &str, parts: &[&str]) -> bool {
    let mut rest = name;
    for part in parts {
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    true
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseChannelRangeError {
    #[error("Channel range '{0}' must look like FIRST:LAST")]
    Syntax(String),
    #[error("Channel range {first}:{last} ends before it starts")]
    Reversed { first: u32, last: u32 },
}

/// Inclusive channel window handed to the mapping tool, written `first:last`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRange {
    pub first: u32,
    pub last: u32,
}

impl ChannelRange {
    /// Drops the outer 2% of the band on each side.
    pub fn default_for(channel_count: u32) -> Self {
        let n = f64::from(channel_count);
        Self {
            first: (n * 0.02).floor() as u32,
            last: (n * 0.98).floor() as u32,
        }
    }
}

impl FromStr for ChannelRange {
    type Err = ParseChannelRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let syntax = || ParseChannelRangeError::Syntax(s.to_string());
        let (first, last) = s.split_once(':').ok_or_else(syntax)?;
        let first: u32 = first.trim().parse().map_err(|_| syntax())?;
        let last: u32 = last.trim().parse().map_err(|_| syntax())?;
        if last < first {
            return Err(ParseChannelRangeError::Reversed { first, last });
        }
        Ok(Self { first, last })
    }
}

impl fmt::Display for ChannelRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.first, self.last)
    }
}
