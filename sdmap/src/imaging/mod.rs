//! Imaging orchestration.
//!
//! Calibrated spectra are grouped into maps by spectral window and scan
//! range. For every map the matching per-feed files are combined in the
//! catalog and the external mapping tool is run on the result.

mod error;
mod plan;
mod runner;


pub use error::ImagingError;
pub use plan::{
    ChannelRange, MapKey, MapPlan, MappingPipeline, ParseChannelRangeError, plan_maps,
    select_map_files,
};
pub use runner::{CHANNELS_ENV, ImagingRunner, MapOutcome};
