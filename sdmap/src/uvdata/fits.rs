use std::path::{Path, PathBuf};

use fitsio::FitsFile;
use fitsio::hdu::{FitsHdu, HduInfo};
use fitsio::images::{ImageDescription, ImageType};
use thiserror::Error;

use super::{RANDOM_PARAMETERS, SortKey, UvData};
use crate::catalog::SpectralHeader;

/// cfitsio status for a keyword absent from the header.
const KEY_NO_EXIST: i32 = 202;

/// Errors reading or writing spectral FITS files.
#[derive(Debug, Error)]
pub enum UvFitsError {
    #[error("FITS error in '{path}': {source}")]
    Fits {
        path: PathBuf,
        source: fitsio::errors::Error,
    },

    #[error("'{path}' lacks required header keyword {keyword}")]
    MissingKeyword {
        path: PathBuf,
        keyword: &'static str,
    },

    #[error("Header keyword {keyword} in '{path}' is not a number: {source}")]
    BadKeyword {
        path: PathBuf,
        keyword: &'static str,
        #[source]
        source: fitsio::errors::Error,
    },

    #[error("'{path}' does not hold spectral records: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

/// Read the object name and spectral header without touching the records.
pub fn read_header(path: &Path) -> Result<(String, SpectralHeader), UvFitsError> {
    let mut fptr = open(path)?;
    let hdu = fptr.primary_hdu().map_err(|source| UvFitsError::Fits {
        path: path.to_path_buf(),
        source,
    })?;
    let header = read_spectral_header(path, &hdu, &mut fptr)?;
    let object = read_object(path, &hdu, &mut fptr);
    Ok((object, header))
}

/// Load a spectral dataset from a FITS file.
pub fn read_uv_fits(path: &Path) -> Result<UvData, UvFitsError> {
    let mut fptr = open(path)?;
    let hdu = fptr.primary_hdu().map_err(|source| UvFitsError::Fits {
        path: path.to_path_buf(),
        source,
    })?;

    let (rows, record_len) = match &hdu.info {
        HduInfo::ImageInfo { shape, .. } => match shape.as_slice() {
            &[rows, record_len] => (rows, record_len),
            other => {
                return Err(malformed(
                    path,
                    format!("expected a 2-D record array, got shape {other:?}"),
                ));
            }
        },
        HduInfo::TableInfo { .. } => {
            return Err(malformed(path, "primary HDU is a table".to_string()));
        }
        HduInfo::AnyInfo => return Err(malformed(path, "unknown HDU type".to_string())),
    };
    if record_len < RANDOM_PARAMETERS {
        return Err(malformed(
            path,
            format!("records of {record_len} values cannot hold TIME and BASELINE"),
        ));
    }
    if rows == 0 {
        return Err(malformed(path, "no observation records".to_string()));
    }

    let header = read_spectral_header(path, &hdu, &mut fptr)?;
    let object = read_object(path, &hdu, &mut fptr);
    let sort_order = hdu
        .read_key::<String>(&mut fptr, "SORTORD")
        .ok()
        .and_then(|code| code.trim().parse::<SortKey>().ok());

    let records: Vec<f64> = hdu.read_image(&mut fptr).map_err(|source| UvFitsError::Fits {
        path: path.to_path_buf(),
        source,
    })?;
    if records.len() != rows * record_len {
        return Err(malformed(
            path,
            format!(
                "read {} values, expected {rows} x {record_len}",
                records.len()
            ),
        ));
    }

    let mut data = UvData::new(object, header, record_len - RANDOM_PARAMETERS, records);
    data.sort_order = sort_order;
    Ok(data)
}

/// Write a spectral dataset, replacing any file at `path`.
pub fn write_uv_fits(path: &Path, data: &UvData) -> Result<(), UvFitsError> {
    let fits_err = |source: fitsio::errors::Error| UvFitsError::Fits {
        path: path.to_path_buf(),
        source,
    };

    let dimensions = [data.row_count(), data.record_len()];
    let description = ImageDescription {
        data_type: ImageType::Double,
        dimensions: &dimensions,
    };
    let mut fptr = FitsFile::create(path)
        .with_custom_primary(&description)
        .overwrite()
        .open()
        .map_err(fits_err)?;
    let hdu = fptr.primary_hdu().map_err(fits_err)?;

    if !data.records().is_empty() {
        hdu.write_image(&mut fptr, data.records())
            .map_err(fits_err)?;
    }

    let header = &data.header;
    hdu.write_key(&mut fptr, "OBJECT", data.object.as_str())
        .map_err(fits_err)?;
    hdu.write_key(&mut fptr, "PTYPE1", "TIME").map_err(fits_err)?;
    hdu.write_key(&mut fptr, "PTYPE2", "BASELINE")
        .map_err(fits_err)?;

    hdu.write_key(&mut fptr, "CTYPE3", "FREQ").map_err(fits_err)?;
    hdu.write_key(&mut fptr, "MAXIS3", header.channel_count.round() as i64)
        .map_err(fits_err)?;
    hdu.write_key(&mut fptr, "CRVAL3", header.reference_frequency)
        .map_err(fits_err)?;
    hdu.write_key(&mut fptr, "CDELT3", header.frequency_delta)
        .map_err(fits_err)?;
    hdu.write_key(&mut fptr, "CRPIX3", header.reference_channel)
        .map_err(fits_err)?;

    hdu.write_key(&mut fptr, "CTYPE4", "RA").map_err(fits_err)?;
    hdu.write_key(&mut fptr, "CRVAL4", header.ra_deg)
        .map_err(fits_err)?;
    hdu.write_key(&mut fptr, "CRPIX4", header.image_width_param)
        .map_err(fits_err)?;

    hdu.write_key(&mut fptr, "CTYPE5", "DEC").map_err(fits_err)?;
    hdu.write_key(&mut fptr, "CRVAL5", header.dec_deg)
        .map_err(fits_err)?;
    hdu.write_key(&mut fptr, "CDELT5", header.cell_scale)
        .map_err(fits_err)?;
    hdu.write_key(&mut fptr, "CRPIX5", header.image_height_param)
        .map_err(fits_err)?;

    if let Some(order) = data.sort_order {
        hdu.write_key(&mut fptr, "SORTORD", order.to_string())
            .map_err(fits_err)?;
    }
    hdu.write_key(&mut fptr, "ORIGIN", env!("CARGO_PKG_NAME"))
        .map_err(fits_err)?;

    Ok(())
}

fn open(path: &Path) -> Result<FitsFile, UvFitsError> {
    FitsFile::open(path).map_err(|source| UvFitsError::Fits {
        path: path.to_path_buf(),
        source,
    })
}

fn malformed(path: &Path, reason: String) -> UvFitsError {
    UvFitsError::Malformed {
        path: path.to_path_buf(),
        reason,
    }
}

fn read_spectral_header(
    path: &Path,
    hdu: &FitsHdu,
    fptr: &mut FitsFile,
) -> Result<SpectralHeader, UvFitsError> {
    let mut required = |keyword: &'static str| -> Result<f64, UvFitsError> {
        hdu.read_key::<f64>(fptr, keyword).map_err(|source| match source {
            fitsio::errors::Error::Fits(ref e) if e.status == KEY_NO_EXIST => {
                UvFitsError::MissingKeyword {
                    path: path.to_path_buf(),
                    keyword,
                }
            }
            source => UvFitsError::BadKeyword {
                path: path.to_path_buf(),
                keyword,
                source,
            },
        })
    };

    Ok(SpectralHeader {
        reference_frequency: required("CRVAL3")?,
        frequency_delta: required("CDELT3")?,
        channel_count: required("MAXIS3")?,
        reference_channel: required("CRPIX3")?,
        cell_scale: required("CDELT5")?,
        image_width_param: required("CRPIX4")?,
        image_height_param: required("CRPIX5")?,
        ra_deg: required("CRVAL4")?,
        dec_deg: required("CRVAL5")?,
    })
}

/// OBJECT keyword, falling back to the file stem.
fn read_object(path: &Path, hdu: &FitsHdu, fptr: &mut FitsFile) -> String {
    hdu.read_key::<String>(fptr, "OBJECT")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
}
