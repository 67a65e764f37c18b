//! Testing utilities for sdmap.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::catalog::{
    CatalogEntry, CatalogError, CatalogId, CatalogIndex, CatalogStore, Disk, LOAD_CLASS,
    MERGE_CLASS, SortSpec, SpectralHeader, catalog_name, entry_at_position, next_sequence,
};
use crate::engine::{NativeEngine, ProcessingEngine};
use crate::uvdata::{self, UvData, UvFitsError};

/// Payload values carried by every synthetic record.
pub const PAYLOAD_WIDTH: usize = 4;

/// Initialize tracing subscriber for tests.
/// Safe to call multiple times - will only initialize once.
/// Respects RUST_LOG env var, defaults to "info".
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

pub fn disk(n: u8) -> Disk {
    Disk::new(n).unwrap()
}

pub fn catalog_id(n: u32) -> CatalogId {
    CatalogId::new(n).unwrap()
}

/// Header of a 256-channel spectrum centred on `frequency`.
pub fn header_at(frequency: f64) -> SpectralHeader {
    SpectralHeader {
        reference_frequency: frequency,
        frequency_delta: 24414.0625,
        channel_count: 256.0,
        reference_channel: 128.5,
        cell_scale: 0.0025,
        image_width_param: 30.0,
        image_height_param: 45.0,
        ra_deg: 83.8,
        dec_deg: -5.4,
    }
}

/// Dataset with one record per `(time, baseline)` pair. Payload values are
/// distinct per record so reorderings are observable.
pub fn spectrum(object: &str, frequency: f64, rows: &[(f64, f64)]) -> UvData {
    let mut records = Vec::with_capacity(rows.len() * (PAYLOAD_WIDTH + 2));
    for (i, &(time, baseline)) in rows.iter().enumerate() {
        records.extend_from_slice(&[time, baseline]);
        records.extend((0..PAYLOAD_WIDTH).map(|k| (i * PAYLOAD_WIDTH + k) as f64 + time));
    }
    UvData::new(object, header_at(frequency), PAYLOAD_WIDTH, records)
}

/// Writes a synthetic spectrum to `dir/file_name` and returns its path.
pub fn write_spectrum(
    dir: &Path,
    file_name: &str,
    object: &str,
    frequency: f64,
    rows: &[(f64, f64)],
) -> PathBuf {
    let path = dir.join(file_name);
    uvdata::write_uv_fits(&path, &spectrum(object, frequency, rows)).unwrap();
    path
}

/// One call made against a [`MemoryCatalog`].
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogCall {
    Clear,
    Load(PathBuf),
    /// `position` is the entry's ordinal on its disk right before removal.
    Zap {
        entry: CatalogEntry,
        position: usize,
    },
    Merge {
        first: CatalogEntry,
        second: CatalogEntry,
        sequence: u32,
    },
    Sort(CatalogEntry),
    Export(PathBuf),
}

/// In-memory model of a catalog store.
///
/// Loads resolve against registered datasets instead of the filesystem and
/// exports are kept in memory. Positions renumber on removal exactly like
/// [`crate::DiskCatalog`].
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    files: HashMap<PathBuf, UvData>,
    indexes: HashMap<(CatalogId, Disk), CatalogIndex>,
    data: HashMap<(CatalogId, CatalogEntry), UvData>,
    exported: RefCell<HashMap<PathBuf, UvData>>,
    engine: NativeEngine,
    calls: RefCell<Vec<CatalogCall>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `data` loadable from `path`.
    pub fn with_file(mut self, path: impl Into<PathBuf>, data: UvData) -> Self {
        self.files.insert(path.into(), data);
        self
    }

    pub fn exported(&self, path: &Path) -> Option<UvData> {
        self.exported.borrow().get(path).cloned()
    }

    pub fn calls(&self) -> Vec<CatalogCall> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: CatalogCall) {
        self.calls.borrow_mut().push(call);
    }

    pub fn data(&self, id: CatalogId, entry: &CatalogEntry) -> Option<&UvData> {
        self.data.get(&(id, entry.clone()))
    }

    /// Every entry of `id` across all disks.
    pub fn entry_count(&self, id: CatalogId) -> usize {
        self.indexes
            .iter()
            .filter(|((cat, _), _)| *cat == id)
            .map(|(_, index)| index.len())
            .sum()
    }

    pub fn merges(&self) -> usize {
        self.count(|call| matches!(call, CatalogCall::Merge { .. }))
    }

    pub fn sorts(&self) -> usize {
        self.count(|call| matches!(call, CatalogCall::Sort(_)))
    }

    pub fn exports(&self) -> usize {
        self.count(|call| matches!(call, CatalogCall::Export(_)))
    }

    /// Zapped entries with their positions, in call order.
    pub fn zaps(&self) -> Vec<(CatalogEntry, usize)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                CatalogCall::Zap { entry, position } => Some((entry.clone(), *position)),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&CatalogCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|call| pred(call)).count()
    }

    fn index(&self, id: CatalogId, disk: Disk) -> CatalogIndex {
        self.indexes.get(&(id, disk)).cloned().unwrap_or_default()
    }

    fn stored(&self, id: CatalogId, entry: &CatalogEntry) -> Result<&UvData, CatalogError> {
        self.data
            .get(&(id, entry.clone()))
            .ok_or_else(|| CatalogError::StaleReference {
                entry: entry.clone(),
            })
    }

    fn append(
        &mut self,
        id: CatalogId,
        entry: CatalogEntry,
        data: UvData,
    ) -> Result<CatalogEntry, CatalogError> {
        let index = self.indexes.entry((id, entry.disk)).or_default();
        let position = index
            .try_push(entry)
            .map_err(|entry| CatalogError::SlotOccupied { entry })?;
        let created = index[position].clone();
        self.data.insert((id, created.clone()), data);
        Ok(created)
    }
}

impl CatalogStore for MemoryCatalog {
    fn clear(&mut self, id: CatalogId) -> Result<(), CatalogError> {
        self.record(CatalogCall::Clear);
        self.indexes.retain(|(cat, _), _| *cat != id);
        self.data.retain(|(cat, _), _| *cat != id);
        Ok(())
    }

    fn load(
        &mut self,
        id: CatalogId,
        path: &Path,
        disk: Disk,
    ) -> Result<CatalogEntry, CatalogError> {
        self.record(CatalogCall::Load(path.to_path_buf()));
        let data = self
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| CatalogError::Load {
                path: path.to_path_buf(),
                source: UvFitsError::Malformed {
                    path: path.to_path_buf(),
                    reason: "not registered with the model catalog".to_string(),
                },
            })?;
        let name = catalog_name(&data.object);
        let sequence = next_sequence(&self.index(id, disk), &name, LOAD_CLASS);
        self.append(id, CatalogEntry::new(name, LOAD_CLASS, sequence, disk), data)
    }

    fn entry_at(
        &self,
        id: CatalogId,
        disk: Disk,
        position: isize,
    ) -> Result<CatalogEntry, CatalogError> {
        entry_at_position(&self.index(id, disk), disk, position)
    }

    fn entries(&self, id: CatalogId, disk: Disk) -> Result<Vec<CatalogEntry>, CatalogError> {
        Ok(self.index(id, disk).iter().cloned().collect())
    }

    fn header(
        &self,
        id: CatalogId,
        entry: &CatalogEntry,
    ) -> Result<SpectralHeader, CatalogError> {
        Ok(self.stored(id, entry)?.header)
    }

    fn zap(&mut self, id: CatalogId, entry: &CatalogEntry) -> Result<(), CatalogError> {
        let stale = || CatalogError::StaleReference {
            entry: entry.clone(),
        };
        let index = self.indexes.get_mut(&(id, entry.disk)).ok_or_else(stale)?;
        let position = index.index_of_key(entry).ok_or_else(stale)?;
        index.remove_by_key(entry);
        self.data.remove(&(id, entry.clone()));
        self.record(CatalogCall::Zap {
            entry: entry.clone(),
            position,
        });
        Ok(())
    }

    fn merge(
        &mut self,
        id: CatalogId,
        first: &CatalogEntry,
        second: &CatalogEntry,
        output_disk: Disk,
        sequence: u32,
    ) -> Result<CatalogEntry, CatalogError> {
        self.record(CatalogCall::Merge {
            first: first.clone(),
            second: second.clone(),
            sequence,
        });
        let combined = self
            .engine
            .combine(self.stored(id, first)?, self.stored(id, second)?)
            .map_err(|source| CatalogError::Engine {
                operation: "merge",
                entry: second.clone(),
                source,
            })?;
        let entry = CatalogEntry::new(first.name.clone(), MERGE_CLASS, sequence, output_disk);
        self.append(id, entry, combined)
    }

    fn sort(
        &mut self,
        id: CatalogId,
        entry: &CatalogEntry,
        spec: &SortSpec,
    ) -> Result<CatalogEntry, CatalogError> {
        self.record(CatalogCall::Sort(entry.clone()));
        let sorted = self
            .engine
            .sort(self.stored(id, entry)?, spec.key)
            .map_err(|source| CatalogError::Engine {
                operation: "sort",
                entry: entry.clone(),
                source,
            })?;
        let sequence = next_sequence(
            &self.index(id, spec.output_disk),
            &entry.name,
            &spec.class_tag,
        );
        let output = CatalogEntry::new(
            entry.name.clone(),
            spec.class_tag.clone(),
            sequence,
            spec.output_disk,
        );
        self.append(id, output, sorted)
    }

    fn export(
        &self,
        id: CatalogId,
        entry: &CatalogEntry,
        destination: &Path,
    ) -> Result<(), CatalogError> {
        self.record(CatalogCall::Export(destination.to_path_buf()));
        let data = self.stored(id, entry)?.clone();
        self.exported
            .borrow_mut()
            .insert(destination.to_path_buf(), data);
        Ok(())
    }
}
