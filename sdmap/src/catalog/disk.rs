//! Filesystem-backed catalog.
//!
//! Layout, per configured disk root:
//!
//! ```text
//! <disk root>/
//!   CAT<id>/
//!     catalog.json                 ordered entry index
//!     <name>.<class>.<seq>.uvfits  one spectral FITS file per entry
//!     scratch/                     staging area for slots being written
//! ```
//!
//! New slot files are staged under `scratch/` on a disk chosen by the
//! operation, then moved into place before the index is updated.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use common::FileFormat;

use crate::catalog::{
    CatalogEntry, CatalogError, CatalogId, CatalogIndex, CatalogStore, Disk, LOAD_CLASS,
    MERGE_CLASS, SortSpec, SpectralHeader, catalog_name, check_class_tag, entry_at_position,
    next_sequence,
};
use crate::engine::{NativeEngine, ProcessingEngine};
use crate::uvdata::{self, UvData};

const INDEX_FILE: &str = "catalog.json";
const SCRATCH_DIR: &str = "scratch";
const SLOT_EXTENSION: &str = "uvfits";

/// Catalog stored under a list of disk roots; disk `n` is `disks[n - 1]`.
#[derive(Debug, Clone)]
pub struct DiskCatalog<E: ProcessingEngine = NativeEngine> {
    disks: Vec<PathBuf>,
    engine: E,
}

impl DiskCatalog<NativeEngine> {
    pub fn new(disks: Vec<PathBuf>) -> Self {
        Self::with_engine(disks, NativeEngine)
    }
}

impl<E: ProcessingEngine> DiskCatalog<E> {
    pub fn with_engine(disks: Vec<PathBuf>, engine: E) -> Self {
        Self { disks, engine }
    }

    pub fn disk_count(&self) -> usize {
        self.disks.len()
    }

    fn configured_disks(&self) -> impl Iterator<Item = Disk> {
        (1..=self.disks.len()).filter_map(|n| u8::try_from(n).ok().and_then(Disk::new))
    }

    fn disk_root(&self, disk: Disk) -> Result<&Path, CatalogError> {
        self.disks
            .get(disk.index())
            .map(PathBuf::as_path)
            .ok_or(CatalogError::UnknownDisk {
                disk,
                available: self.disks.len(),
            })
    }

    fn catalog_dir(&self, id: CatalogId, disk: Disk) -> Result<PathBuf, CatalogError> {
        Ok(self.disk_root(disk)?.join(format!("CAT{:05}", id.get())))
    }

    fn slot_path(&self, id: CatalogId, entry: &CatalogEntry) -> Result<PathBuf, CatalogError> {
        Ok(self
            .catalog_dir(id, entry.disk)?
            .join(slot_file_name(entry)))
    }

    fn read_index(&self, id: CatalogId, disk: Disk) -> Result<CatalogIndex, CatalogError> {
        let path = self.catalog_dir(id, disk)?.join(INDEX_FILE);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(CatalogIndex::default()),
            Err(source) => return Err(CatalogError::Io { path, source }),
        };
        common::deserialize(&text, FileFormat::Json)
            .map_err(|source| CatalogError::Index { path, source })
    }

    fn write_index(
        &self,
        id: CatalogId,
        disk: Disk,
        index: &CatalogIndex,
    ) -> Result<(), CatalogError> {
        let dir = self.catalog_dir(id, disk)?;
        create_dir(&dir)?;
        let path = dir.join(INDEX_FILE);
        let text =
            common::serialize(index, FileFormat::Json).map_err(|source| CatalogError::Index {
                path: path.clone(),
                source,
            })?;

        let staged = dir.join(format!("{INDEX_FILE}.partial"));
        fs::write(&staged, text).map_err(|source| CatalogError::Io {
            path: staged.clone(),
            source,
        })?;
        fs::rename(&staged, &path).map_err(|source| CatalogError::Io { path, source })
    }

    /// Index of `entry.disk`, failing if `entry` is not in it.
    fn index_containing(
        &self,
        id: CatalogId,
        entry: &CatalogEntry,
    ) -> Result<CatalogIndex, CatalogError> {
        let index = self.read_index(id, entry.disk)?;
        if !index.contains_key(entry) {
            return Err(CatalogError::StaleReference {
                entry: entry.clone(),
            });
        }
        Ok(index)
    }

    fn read_data(&self, id: CatalogId, entry: &CatalogEntry) -> Result<UvData, CatalogError> {
        self.index_containing(id, entry)?;
        let path = self.slot_path(id, entry)?;
        uvdata::read_uv_fits(&path).map_err(|source| CatalogError::SlotRead {
            entry: entry.clone(),
            source,
        })
    }

    /// First disk, starting with `preferred`, that is not `avoid`.
    fn scratch_disk(&self, preferred: Disk, avoid: Option<Disk>) -> Result<Disk, CatalogError> {
        let Some(avoid) = avoid else {
            return Ok(preferred);
        };
        if preferred != avoid {
            return Ok(preferred);
        }
        self.configured_disks()
            .find(|&disk| disk != avoid)
            .ok_or(CatalogError::NoScratchDisk { avoid })
    }

    /// Stages `data` on `staging_disk`, moves it into the slot of `entry` and
    /// appends `entry` to its disk's index.
    fn append(
        &mut self,
        id: CatalogId,
        entry: CatalogEntry,
        data: &UvData,
        staging_disk: Disk,
    ) -> Result<CatalogEntry, CatalogError> {
        let mut index = self.read_index(id, entry.disk)?;
        if index.contains_key(&entry) {
            return Err(CatalogError::SlotOccupied { entry });
        }

        let slot_path = self.slot_path(id, &entry)?;
        let scratch = self.catalog_dir(id, staging_disk)?.join(SCRATCH_DIR);
        create_dir(&scratch)?;
        let staged = scratch.join(format!("{}.partial", slot_file_name(&entry)));
        uvdata::write_uv_fits(&staged, data).map_err(|source| CatalogError::SlotWrite {
            entry: entry.clone(),
            source,
        })?;
        if let Some(parent) = slot_path.parent() {
            create_dir(parent)?;
        }
        move_file(&staged, &slot_path)?;

        let disk = entry.disk;
        let position = index
            .try_push(entry)
            .map_err(|entry| CatalogError::SlotOccupied { entry })?;
        self.write_index(id, disk, &index)?;

        let created = index[position].clone();
        tracing::debug!(catalog = %id, entry = %created, position, "Created catalog entry");
        Ok(created)
    }
}

impl<E: ProcessingEngine> CatalogStore for DiskCatalog<E> {
    fn clear(&mut self, id: CatalogId) -> Result<(), CatalogError> {
        for disk in self.configured_disks() {
            let dir = self.catalog_dir(id, disk)?;
            match fs::remove_dir_all(&dir) {
                Ok(()) => tracing::debug!(catalog = %id, disk = %disk, "Cleared catalog disk"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(CatalogError::Io { path: dir, source }),
            }
        }
        tracing::info!(catalog = %id, disks = self.disks.len(), "Catalog cleared");
        Ok(())
    }

    fn load(
        &mut self,
        id: CatalogId,
        path: &Path,
        disk: Disk,
    ) -> Result<CatalogEntry, CatalogError> {
        let data = uvdata::read_uv_fits(path).map_err(|source| CatalogError::Load {
            path: path.to_path_buf(),
            source,
        })?;

        let name = catalog_name(&data.object);
        let sequence = next_sequence(&self.read_index(id, disk)?, &name, LOAD_CLASS);
        let entry = CatalogEntry::new(name, LOAD_CLASS, sequence, disk);

        let entry = self.append(id, entry, &data, disk)?;
        tracing::info!(
            catalog = %id,
            source = %path.display(),
            entry = %entry,
            rows = data.row_count(),
            "Loaded spectra"
        );
        Ok(entry)
    }

    fn entry_at(
        &self,
        id: CatalogId,
        disk: Disk,
        position: isize,
    ) -> Result<CatalogEntry, CatalogError> {
        entry_at_position(&self.read_index(id, disk)?, disk, position)
    }

    fn entries(&self, id: CatalogId, disk: Disk) -> Result<Vec<CatalogEntry>, CatalogError> {
        Ok(self.read_index(id, disk)?.iter().cloned().collect())
    }

    fn header(
        &self,
        id: CatalogId,
        entry: &CatalogEntry,
    ) -> Result<SpectralHeader, CatalogError> {
        self.index_containing(id, entry)?;
        let path = self.slot_path(id, entry)?;
        let (_, header) = uvdata::read_header(&path).map_err(|source| CatalogError::SlotRead {
            entry: entry.clone(),
            source,
        })?;
        Ok(header)
    }

    fn zap(&mut self, id: CatalogId, entry: &CatalogEntry) -> Result<(), CatalogError> {
        let mut index = self.read_index(id, entry.disk)?;
        let position = index.index_of_key(entry);
        if index.remove_by_key(entry).is_none() {
            return Err(CatalogError::StaleReference {
                entry: entry.clone(),
            });
        }
        self.write_index(id, entry.disk, &index)?;

        let path = self.slot_path(id, entry)?;
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(catalog = %id, entry = %entry, "Zapped entry had no slot file");
            }
            Err(source) => return Err(CatalogError::Io { path, source }),
        }

        tracing::debug!(catalog = %id, entry = %entry, position = ?position, "Zapped catalog entry");
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
        let first_data = self.read_data(id, first)?;
        let second_data = self.read_data(id, second)?;
        let combined = self
            .engine
            .combine(&first_data, &second_data)
            .map_err(|source| CatalogError::Engine {
                operation: "merge",
                entry: second.clone(),
                source,
            })?;

        let entry = CatalogEntry::new(first.name.clone(), MERGE_CLASS, sequence, output_disk);
        let entry = self.append(id, entry, &combined, output_disk)?;
        tracing::info!(
            catalog = %id,
            first = %first,
            second = %second,
            output = %entry,
            rows = combined.row_count(),
            "Merged entries"
        );
        Ok(entry)
    }

    fn sort(
        &mut self,
        id: CatalogId,
        entry: &CatalogEntry,
        spec: &SortSpec,
    ) -> Result<CatalogEntry, CatalogError> {
        check_class_tag(&spec.class_tag)?;
        let data = self.read_data(id, entry)?;
        let sorted = self
            .engine
            .sort(&data, spec.key)
            .map_err(|source| CatalogError::Engine {
                operation: "sort",
                entry: entry.clone(),
                source,
            })?;

        let staging_disk = self.scratch_disk(spec.output_disk, spec.avoid_disk)?;
        let index = self.read_index(id, spec.output_disk)?;
        let sequence = next_sequence(&index, &entry.name, &spec.class_tag);
        let output = CatalogEntry::new(
            entry.name.clone(),
            spec.class_tag.clone(),
            sequence,
            spec.output_disk,
        );

        let output = self.append(id, output, &sorted, staging_disk)?;
        tracing::info!(
            catalog = %id,
            input = %entry,
            output = %output,
            key = %spec.key,
            scratch_disk = %staging_disk,
            "Sorted entry"
        );
        Ok(output)
    }

    fn export(
        &self,
        id: CatalogId,
        entry: &CatalogEntry,
        destination: &Path,
    ) -> Result<(), CatalogError> {
        let data = self.read_data(id, entry)?;
        uvdata::write_uv_fits(destination, &data).map_err(|source| CatalogError::Export {
            entry: entry.clone(),
            path: destination.to_path_buf(),
            source,
        })?;
        tracing::info!(
            catalog = %id,
            entry = %entry,
            destination = %destination.display(),
            rows = data.row_count(),
            "Exported entry"
        );
        Ok(())
    }
}

fn slot_file_name(entry: &CatalogEntry) -> String {
    format!(
        "{}.{}.{}.{SLOT_EXTENSION}",
        entry.name, entry.class_tag, entry.sequence
    )
}

fn create_dir(dir: &Path) -> Result<(), CatalogError> {
    fs::create_dir_all(dir).map_err(|source| CatalogError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

/// Rename, falling back to copy and delete when `from` and `to` live on
/// different filesystems.
fn move_file(from: &Path, to: &Path) -> Result<(), CatalogError> {
    let Err(err) = fs::rename(from, to) else {
        return Ok(());
    };
    tracing::debug!(
        from = %from.display(),
        to = %to.display(),
        error = %err,
        "Rename failed, copying instead"
    );
    fs::copy(from, to).map_err(|source| CatalogError::Io {
        path: to.to_path_buf(),
        source,
    })?;
    fs::remove_file(from).map_err(|source| CatalogError::Io {
        path: from.to_path_buf(),
        source,
    })
}
