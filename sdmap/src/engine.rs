//! Processing engine behind catalog merge and sort.
//!
//! The catalog delegates the data-level work of its merge and sort operations
//! to a [`ProcessingEngine`]. The engine never touches the catalog itself; it
//! maps datasets to datasets.

use std::cmp::Ordering;

use rayon::prelude::*;
use thiserror::Error;

use crate::uvdata::{SortKey, UvData};

/// Errors raised while combining or reordering datasets.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(
        "Record layouts differ: '{first}' has {first_width} payload values per record, '{second}' has {second_width}"
    )]
    LayoutMismatch {
        first: String,
        second: String,
        first_width: usize,
        second_width: usize,
    },
}

/// Data-level implementation of the catalog's merge and sort.
pub trait ProcessingEngine {
    /// Union of the records of both datasets, `first`'s records leading.
    /// The result carries `first`'s object name and header.
    fn combine(&self, first: &UvData, second: &UvData) -> Result<UvData, EngineError>;

    /// Copy of `data` with records ordered by `key`. Ties keep input order.
    fn sort(&self, data: &UvData, key: SortKey) -> Result<UvData, EngineError>;
}

/// In-process engine. Sorting runs on the rayon pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeEngine;

impl ProcessingEngine for NativeEngine {
    fn combine(&self, first: &UvData, second: &UvData) -> Result<UvData, EngineError> {
        if first.payload_width() != second.payload_width() {
            return Err(EngineError::LayoutMismatch {
                first: first.object.clone(),
                second: second.object.clone(),
                first_width: first.payload_width(),
                second_width: second.payload_width(),
            });
        }

        let mut combined = first.clone();
        combined.append_rows(second);

        tracing::debug!(
            first_rows = first.row_count(),
            second_rows = second.row_count(),
            combined_rows = combined.row_count(),
            "Combined datasets"
        );
        Ok(combined)
    }

    fn sort(&self, data: &UvData, key: SortKey) -> Result<UvData, EngineError> {
        let mut order: Vec<usize> = (0..data.row_count()).collect();
        order.par_sort_by(|&a, &b| compare_rows(data, a, b, key));

        let mut sorted = data.reordered(&order);
        sorted.sort_order = Some(key);
        Ok(sorted)
    }
}

fn compare_rows(data: &UvData, a: usize, b: usize, key: SortKey) -> Ordering {
    let by_time = data.time(a).total_cmp(&data.time(b));
    let by_baseline = data.baseline(a).total_cmp(&data.baseline(b));
    match key {
        SortKey::TimeBaseline => by_time.then(by_baseline),
        SortKey::BaselineTime => by_baseline.then(by_time),
    }
}
