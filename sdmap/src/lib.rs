//! sdmap - catalog-driven combination of single-dish spectral maps.
//!
//! Calibrated per-feed spectra are loaded into a disk-partitioned catalog,
//! filtered for frequency consistency, folded pairwise into one combined
//! dataset, time-baseline sorted and exported for the external mapping tool.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sdmap::{CatalogId, CombinationSession, CombineConfig, DiskCatalog};
//!
//! let mut catalog = DiskCatalog::new(vec!["catalog/DA01".into(), "catalog/DA02".into()]);
//! let session = CombinationSession::new(
//!     CatalogId::new(1024)?,
//!     ["W3OH_12_20_feed0.fits", "W3OH_12_20_feed1.fits"],
//!     CombineConfig::default(),
//! );
//! let result = session.run(&mut catalog)?;
//! println!("wrote {}", result.output_path.display());
//! ```

pub mod catalog;
pub mod combine;
pub mod config;
pub mod engine;
pub mod imaging;
pub mod uvdata;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Catalog
// ============================================================================

pub use catalog::{
    CatalogEntry, CatalogError, CatalogId, CatalogStore, Disk, DiskCatalog, SortSpec,
    SpectralHeader,
};

// ============================================================================
// Spectral data and processing engine
// ============================================================================

pub use engine::{EngineError, NativeEngine, ProcessingEngine};
pub use uvdata::{SortKey, UvData, UvFitsError};

// ============================================================================
// Combination
// ============================================================================

pub use combine::{
    CombinationResult, CombinationSession, CombineConfig, CombineError, FrequencyGuard,
    ImagingParameters,
};

// ============================================================================
// Imaging orchestration
// ============================================================================

pub use config::{ConfigError, PipelineConfig};
pub use imaging::{
    ChannelRange, ImagingError, ImagingRunner, MapKey, MapOutcome, MappingPipeline,
};
