/// Header fields of a spectral dataset that the combination stage reads.
///
/// Axis 3 is frequency, axis 4 right ascension and axis 5 declination.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpectralHeader {
    /// Frequency at the reference channel in Hz (CRVAL3).
    pub reference_frequency: f64,
    /// Channel spacing in Hz (CDELT3).
    pub frequency_delta: f64,
    /// Number of spectral channels (MAXIS3).
    pub channel_count: f64,
    /// Reference channel, 1-based (CRPIX3).
    pub reference_channel: f64,
    /// Map cell scale in degrees (CDELT5).
    pub cell_scale: f64,
    /// Reference pixel of the RA axis (CRPIX4).
    pub image_width_param: f64,
    /// Reference pixel of the Dec axis (CRPIX5).
    pub image_height_param: f64,
    /// Map centre right ascension in degrees (CRVAL4).
    pub ra_deg: f64,
    /// Map centre declination in degrees (CRVAL5).
    pub dec_deg: f64,
}
