//! Sorting of the merged entry and extraction of imaging parameters.

use serde::Serialize;

use crate::catalog::{CatalogEntry, CatalogId, CatalogStore, SortSpec, SpectralHeader};
use crate::combine::CombineError;

/// Map geometry derived from a merged entry's header.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImagingParameters {
    pub channel_count: i64,
    /// Map cell size in arcseconds.
    pub cell_size_arcsec: i64,
    pub reference_channel: f64,
    pub image_width: i64,
    pub image_height: i64,
    pub ra_deg: f64,
    pub dec_deg: f64,
    pub reference_frequency: f64,
    pub frequency_delta: f64,
}

impl ImagingParameters {
    /// Integer quantities round half away from zero.
    pub fn from_header(header: &SpectralHeader) -> Self {
        Self {
            channel_count: round(header.channel_count),
            cell_size_arcsec: round(header.cell_scale * 3600.0),
            reference_channel: header.reference_channel,
            image_width: 2 * round(header.image_width_param / 1.5),
            image_height: 2 * round(header.image_height_param / 1.5),
            ra_deg: header.ra_deg,
            dec_deg: header.dec_deg,
            reference_frequency: header.reference_frequency,
            frequency_delta: header.frequency_delta,
        }
    }
}

fn round(value: f64) -> i64 {
    value.round() as i64
}

/// Sorts `merged` into a new entry as described by `spec` and zaps
/// `merged`. The parameters come from `merged`'s header, read before the
/// sort.
pub fn normalize<S: CatalogStore + ?Sized>(
    store: &mut S,
    id: CatalogId,
    merged: &CatalogEntry,
    spec: &SortSpec,
) -> Result<(CatalogEntry, ImagingParameters), CombineError> {
    let params = ImagingParameters::from_header(&store.header(id, merged)?);
    tracing::info!(
        catalog = %id,
        ra_deg = params.ra_deg,
        dec_deg = params.dec_deg,
        image_width = params.image_width,
        image_height = params.image_height,
        cell_arcsec = params.cell_size_arcsec,
        channels = params.channel_count,
        "Observation summary"
    );

    let sorted = store.sort(id, merged, spec)?;
    store.zap(id, merged)?;

    Ok((sorted, params))
}
