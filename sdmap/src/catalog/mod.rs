//! Disk-partitioned catalog of spectral datasets.
//!
//! Every entry lives on one disk and is identified by its name, class tag,
//! sequence number and disk. Entries on a disk are kept in creation order and
//! can be addressed by ordinal position; removing an entry renumbers every
//! later position on that disk.

mod disk;
mod error;
mod header;


use std::fmt;
use std::path::Path;

use common::key_index_vec::{KeyIndexKey, KeyIndexVec};
use serde::{Deserialize, Serialize};

use crate::uvdata::SortKey;

pub use disk::DiskCatalog;
pub use error::CatalogError;
pub use header::SpectralHeader;

/// Class tag given to freshly loaded spectra.
pub const LOAD_CLASS: &str = "UVLOD";
/// Class tag of pairwise merge products.
pub const MERGE_CLASS: &str = "DBCON";
/// Class tag of time-baseline sorted products.
pub const SORT_CLASS: &str = "UVSRT";

/// Maximum entry name length.
pub const NAME_LEN: usize = 12;
/// Maximum class tag length.
pub const CLASS_LEN: usize = 6;

/// Numeric account that scopes every catalog operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct CatalogId(u32);

impl CatalogId {
    pub fn new(value: u32) -> Result<Self, CatalogError> {
        if value == 0 {
            return Err(CatalogError::InvalidCatalogId(value));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for CatalogId {
    type Error = CatalogError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CatalogId> for u32 {
    fn from(id: CatalogId) -> Self {
        id.0
    }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Catalog disk partition. Disks are numbered from 1; 0 means "no disk".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Disk(u8);

impl Disk {
    pub const fn new(number: u8) -> Option<Self> {
        if number == 0 { None } else { Some(Self(number)) }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based index into a list of disk roots.
    pub fn index(self) -> usize {
        usize::from(self.0) - 1
    }
}

impl TryFrom<u8> for Disk {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| "disk numbers start at 1".to_string())
    }
}

impl From<Disk> for u8 {
    fn from(disk: Disk) -> Self {
        disk.0
    }
}

impl fmt::Display for Disk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to one dataset resident in the catalog.
///
/// The four fields together are unique within a catalog and form the
/// entry's key. Headers are read lazily through [`CatalogStore::header`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub class_tag: String,
    pub sequence: u32,
    pub disk: Disk,
}

impl CatalogEntry {
    pub fn new(
        name: impl Into<String>,
        class_tag: impl Into<String>,
        sequence: u32,
        disk: Disk,
    ) -> Self {
        Self {
            name: name.into(),
            class_tag: class_tag.into(),
            sequence,
            disk,
        }
    }
}

impl KeyIndexKey<CatalogEntry> for CatalogEntry {
    fn key(&self) -> &CatalogEntry {
        self
    }
}

impl fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{} (disk {})",
            self.name, self.class_tag, self.sequence, self.disk
        )
    }
}

/// Ordered entries of one disk for one catalog id.
pub type CatalogIndex = KeyIndexVec<CatalogEntry, CatalogEntry>;

/// Output placement of a sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    pub output_disk: Disk,
    pub class_tag: String,
    /// Disk that must not receive scratch data.
    pub avoid_disk: Option<Disk>,
}

/// Indexed, disk-backed store of catalog entries.
///
/// Every call names the catalog id it operates on. Operations that create
/// entries return the new entry's handle; none of them delete their inputs.
pub trait CatalogStore {
    /// Removes every entry of `id` on every disk. Succeeds on an empty catalog.
    fn clear(&mut self, id: CatalogId) -> Result<(), CatalogError>;

    /// Reads an external spectral file and appends it to `disk` with the next
    /// free sequence number for its name.
    fn load(&mut self, id: CatalogId, path: &Path, disk: Disk)
    -> Result<CatalogEntry, CatalogError>;

    /// Looks up an entry by ordinal position on `disk`; negative positions
    /// count from the newest entry (-1).
    fn entry_at(
        &self,
        id: CatalogId,
        disk: Disk,
        position: isize,
    ) -> Result<CatalogEntry, CatalogError>;

    /// All entries on `disk` in catalog order.
    fn entries(&self, id: CatalogId, disk: Disk) -> Result<Vec<CatalogEntry>, CatalogError>;

    /// Reads the header of an existing entry.
    fn header(&self, id: CatalogId, entry: &CatalogEntry)
    -> Result<SpectralHeader, CatalogError>;

    /// Deletes an entry. Fails with [`CatalogError::StaleReference`] if it
    /// does not exist.
    fn zap(&mut self, id: CatalogId, entry: &CatalogEntry) -> Result<(), CatalogError>;

    /// Combines the rows of two entries into a new merge entry named after
    /// `first` at `sequence` on `output_disk`.
    fn merge(
        &mut self,
        id: CatalogId,
        first: &CatalogEntry,
        second: &CatalogEntry,
        output_disk: Disk,
        sequence: u32,
    ) -> Result<CatalogEntry, CatalogError>;

    /// Writes a reordered copy of `entry` as described by `spec`.
    fn sort(
        &mut self,
        id: CatalogId,
        entry: &CatalogEntry,
        spec: &SortSpec,
    ) -> Result<CatalogEntry, CatalogError>;

    /// Writes the entry's data to an external file, overwriting it.
    fn export(
        &self,
        id: CatalogId,
        entry: &CatalogEntry,
        destination: &Path,
    ) -> Result<(), CatalogError>;
}

/// Resolves a possibly negative ordinal against `len` entries.
pub fn resolve_position(len: usize, position: isize) -> Option<usize> {
    let len = isize::try_from(len).ok()?;
    let resolved = if position < 0 { len + position } else { position };
    (0..len)
        .contains(&resolved)
        .then(|| resolved as usize)
}

/// Looks up `position` in `index`, reporting the miss with full context.
pub(crate) fn entry_at_position(
    index: &CatalogIndex,
    disk: Disk,
    position: isize,
) -> Result<CatalogEntry, CatalogError> {
    resolve_position(index.len(), position)
        .and_then(|idx| index.get(idx))
        .cloned()
        .ok_or(CatalogError::NotFound {
            disk,
            position,
            len: index.len(),
        })
}

/// Next unused sequence number for `name`/`class_tag` in `index`.
pub(crate) fn next_sequence(index: &CatalogIndex, name: &str, class_tag: &str) -> u32 {
    index
        .iter()
        .filter(|e| e.name == name && e.class_tag == class_tag)
        .map(|e| e.sequence)
        .max()
        .map_or(1, |seq| seq + 1)
}

/// Class tags are 1 to [`CLASS_LEN`] ASCII alphanumerics or `_`, since they
/// become part of slot file names.
pub fn check_class_tag(tag: &str) -> Result<(), CatalogError> {
    let valid = !tag.is_empty()
        && tag.len() <= CLASS_LEN
        && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(CatalogError::InvalidClassTag(tag.to_string()))
    }
}

/// Catalog-safe entry name: ASCII alphanumerics, `-`, `+` and `_`, at most
/// [`NAME_LEN`] characters.
pub fn catalog_name(raw: &str) -> String {
    let name: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(NAME_LEN)
        .collect();
    if name.is_empty() {
        "SPECTRA".to_string()
    } else {
        name
    }
}
