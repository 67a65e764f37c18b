//! Combination settings.

use serde::{Deserialize, Serialize};

use crate::catalog::{Disk, SORT_CLASS, SortSpec};
use crate::combine::DEFAULT_TOLERANCE_HZ;
use crate::uvdata::SortKey;

/// Disk receiving loaded, merged and sorted entries unless configured.
pub const DEFAULT_WORKING_DISK: Disk = match Disk::new(2) {
    Some(disk) => disk,
    None => unreachable!(),
};

/// Disk kept free of sort scratch data unless configured.
pub const DEFAULT_AVOID_DISK: Option<Disk> = Disk::new(1);

/// Settings for one [`CombinationSession`](crate::CombinationSession).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombineConfig {
    /// Disk holding every entry the session creates.
    pub working_disk: Disk,
    /// Disk the sort must not use for scratch space. `None` disables avoidance.
    pub avoid_disk: Option<Disk>,
    /// Largest accepted reference frequency offset, in Hz.
    pub tolerance_hz: f64,
    /// Appended to the output base name, e.g. `W3OH_12` + `_dbcon`.
    pub output_suffix: String,
    pub output_extension: String,
    pub sort_key: SortKey,
    /// Class tag of the sorted product.
    pub sort_class: String,
}

impl Default for CombineConfig {
    fn default() -> Self {
        Self {
            working_disk: DEFAULT_WORKING_DISK,
            avoid_disk: DEFAULT_AVOID_DISK,
            tolerance_hz: DEFAULT_TOLERANCE_HZ,
            output_suffix: "_dbcon".to_string(),
            output_extension: "fits".to_string(),
            sort_key: SortKey::TimeBaseline,
            sort_class: SORT_CLASS.to_string(),
        }
    }
}

impl CombineConfig {
    /// Sort placement: the working disk, scratch kept off the avoid disk.
    pub fn sort_spec(&self) -> SortSpec {
        SortSpec {
            key: self.sort_key,
            output_disk: self.working_disk,
            class_tag: self.sort_class.clone(),
            avoid_disk: self.avoid_disk,
        }
    }
}
