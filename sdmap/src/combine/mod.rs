//! Catalog-driven combination of per-feed spectra.
//!
//! A [`CombinationSession`] clears its catalog, loads every input file onto
//! the working disk, drops inputs whose reference frequency strays from the
//! first one, folds the rest into a single merged entry, sorts it and
//! exports the sorted entry next to the first input.
//!
//! Every step works on the entry handles returned by the store, never on
//! catalog positions.

mod config;
mod error;
mod export;
mod frequency_guard;
mod merger;
mod normalize;

#[cfg(test)]
mod tests;

use std::path::PathBuf;

use crate::catalog::{CatalogEntry, CatalogId, CatalogStore};

pub use config::{CombineConfig, DEFAULT_AVOID_DISK, DEFAULT_WORKING_DISK};
pub use error::CombineError;
pub use export::{export_entry, output_path};
pub use frequency_guard::{DEFAULT_TOLERANCE_HZ, FrequencyGuard, accept};
pub use merger::merge_accepted;
pub use normalize::{ImagingParameters, normalize};

/// Outcome of a successful session.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinationResult {
    pub output_path: PathBuf,
    /// Sorted entry left in the catalog.
    pub output_entry: CatalogEntry,
    pub accepted_count: usize,
    /// Inputs dropped for their frequency, in input order.
    pub rejected: Vec<PathBuf>,
    pub reference_frequency: f64,
    pub parameters: ImagingParameters,
}

/// One combination run over an ordered list of input files.
#[derive(Debug, Clone)]
pub struct CombinationSession {
    pub catalog_id: CatalogId,
    pub input_files: Vec<PathBuf>,
    pub config: CombineConfig,
}

impl CombinationSession {
    pub fn new(
        catalog_id: CatalogId,
        input_files: impl IntoIterator<Item = impl Into<PathBuf>>,
        config: CombineConfig,
    ) -> Self {
        Self {
            catalog_id,
            input_files: input_files.into_iter().map(Into::into).collect(),
            config,
        }
    }

    /// Runs the session against `store`. The first error ends the run.
    pub fn run<S: CatalogStore + ?Sized>(
        &self,
        store: &mut S,
    ) -> Result<CombinationResult, CombineError> {
        let id = self.catalog_id;
        let disk = self.config.working_disk;

        tracing::info!(
            catalog = %id,
            inputs = self.input_files.len(),
            working_disk = %disk,
            avoid_disk = ?self.config.avoid_disk.map(|d| d.get()),
            "Starting combination"
        );
        store.clear(id)?;

        let mut guard = FrequencyGuard::new(self.config.tolerance_hz);
        let mut accepted = Vec::with_capacity(self.input_files.len());
        let mut rejected = Vec::new();
        for path in &self.input_files {
            let entry = store.load(id, path, disk)?;
            let header = store.header(id, &entry)?;
            if guard.check(&header) {
                accepted.push(entry);
            } else {
                tracing::warn!(
                    catalog = %id,
                    path = %path.display(),
                    frequency = header.reference_frequency,
                    reference = ?guard.reference_frequency(),
                    tolerance_hz = guard.tolerance_hz(),
                    "Frequencies differ, dropping input"
                );
                store.zap(id, &entry)?;
                rejected.push(path.clone());
            }
        }

        let (Some(first_input), Some(reference_frequency)) =
            (self.input_files.first(), guard.reference_frequency())
        else {
            return Err(CombineError::NoInput {
                loaded: self.input_files.len(),
                rejected: rejected.len(),
            });
        };

        let merged = merge_accepted(store, id, &accepted, disk)?;
        let (output_entry, parameters) = normalize(store, id, &merged, &self.config.sort_spec())?;

        let output_path = output_path(
            first_input,
            &self.config.output_suffix,
            &self.config.output_extension,
        );
        export_entry(&*store, id, &output_entry, &output_path)?;

        tracing::info!(
            catalog = %id,
            accepted = accepted.len(),
            rejected = rejected.len(),
            output = %output_path.display(),
            "Combination finished"
        );
        Ok(CombinationResult {
            output_path,
            output_entry,
            accepted_count: accepted.len(),
            rejected,
            reference_frequency,
            parameters,
        })
    }
}
