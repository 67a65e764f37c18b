//! Spectral observation records and their FITS representation.
//!
//! A dataset is a table of fixed-length records. Every record starts with the
//! random parameters `TIME` (days) and `BASELINE` (encoded antenna pair),
//! followed by `payload_width` values that are carried through untouched.

mod fits;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::catalog::SpectralHeader;

pub use fits::{UvFitsError, read_header, read_uv_fits, write_uv_fits};

/// Number of random parameters leading every record.
pub const RANDOM_PARAMETERS: usize = 2;

/// Row ordering applied by a sort.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
pub enum SortKey {
    /// Time, then baseline.
    #[default]
    #[strum(serialize = "TB")]
    #[serde(rename = "TB")]
    TimeBaseline,
    /// Baseline, then time.
    #[strum(serialize = "BT")]
    #[serde(rename = "BT")]
    BaselineTime,
}

/// One spectral dataset: header plus row-major records.
#[derive(Debug, Clone, PartialEq)]
pub struct UvData {
    pub object: String,
    pub header: SpectralHeader,
    pub sort_order: Option<SortKey>,
    record_len: usize,
    records: Vec<f64>,
}

impl UvData {
    /// Creates a dataset from flattened records of
    /// `RANDOM_PARAMETERS + payload_width` values each.
    pub fn new(
        object: impl Into<String>,
        header: SpectralHeader,
        payload_width: usize,
        records: Vec<f64>,
    ) -> Self {
        let record_len = RANDOM_PARAMETERS + payload_width;
        assert!(
            records.len() % record_len == 0,
            "Record buffer of {} values is not a multiple of record length {}",
            records.len(),
            record_len
        );
        Self {
            object: object.into(),
            header,
            sort_order: None,
            record_len,
            records,
        }
    }

    pub fn row_count(&self) -> usize {
        self.records.len() / self.record_len
    }

    pub fn payload_width(&self) -> usize {
        self.record_len - RANDOM_PARAMETERS
    }

    pub fn record_len(&self) -> usize {
        self.record_len
    }

    pub fn records(&self) -> &[f64] {
        &self.records
    }

    pub fn row(&self, idx: usize) -> &[f64] {
        let start = idx * self.record_len;
        &self.records[start..start + self.record_len]
    }

    pub fn time(&self, idx: usize) -> f64 {
        self.row(idx)[0]
    }

    pub fn baseline(&self, idx: usize) -> f64 {
        self.row(idx)[1]
    }

    pub fn payload(&self, idx: usize) -> &[f64] {
        &self.row(idx)[RANDOM_PARAMETERS..]
    }

    /// Rebuilds the dataset keeping the same header with rows taken in
    /// `order`.
    pub fn reordered(&self, order: &[usize]) -> Self {
        assert_eq!(order.len(), self.row_count(), "Row order length mismatch");
        let mut records = Vec::with_capacity(self.records.len());
        for &idx in order {
            records.extend_from_slice(self.row(idx));
        }
        Self {
            object: self.object.clone(),
            header: self.header,
            sort_order: None,
            record_len: self.record_len,
            records,
        }
    }

    /// Appends the rows of `other`. Record lengths must match.
    pub fn append_rows(&mut self, other: &UvData) {
        assert_eq!(self.record_len, other.record_len, "Record length mismatch");
        self.records.extend_from_slice(&other.records);
        self.sort_order = None;
    }
}
