//! Frequency consistency check for loaded spectra.

use crate::catalog::SpectralHeader;

/// Default largest accepted reference frequency offset, in Hz.
pub const DEFAULT_TOLERANCE_HZ: f64 = 1.0e5;

/// Whether `header` lies within `tolerance_hz` of `reference_frequency`.
/// The bound is inclusive.
pub fn accept(header: &SpectralHeader, reference_frequency: f64, tolerance_hz: f64) -> bool {
    (header.reference_frequency - reference_frequency).abs() <= tolerance_hz
}

/// Running frequency check over a session's loads.
///
/// The first header checked becomes the reference and is always accepted.
/// The guard only decides; removing rejected entries is the caller's job.
#[derive(Debug, Clone, Copy)]
pub struct FrequencyGuard {
    tolerance_hz: f64,
    reference_frequency: Option<f64>,
}

impl FrequencyGuard {
    pub fn new(tolerance_hz: f64) -> Self {
        Self {
            tolerance_hz,
            reference_frequency: None,
        }
    }

    pub fn reference_frequency(&self) -> Option<f64> {
        self.reference_frequency
    }

    pub fn tolerance_hz(&self) -> f64 {
        self.tolerance_hz
    }

    pub fn check(&mut self, header: &SpectralHeader) -> bool {
        let reference = *self
            .reference_frequency
            .get_or_insert(header.reference_frequency);
        accept(header, reference, self.tolerance_hz)
    }
}

impl Default for FrequencyGuard {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE_HZ)
    }
}
