//! DSP Error Types

use thiserror::Error;

use crate::band::BandId;

/// Errors that can occur during DSP operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DspError {
    #[error("Invalid band {band_id}: {reason}")]
    InvalidBand { band_id: BandId, reason: String },

    #[error("Band table key {key} does not match band id {band_id}")]
    BandIdMismatch { key: BandId, band_id: BandId },

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    #[error(
        "Cannot design filter for band {band_id} ({center_freq}Hz): \
         edges [{low_edge}Hz, {high_edge}Hz] are not inside (0, {nyquist}Hz)"
    )]
    FilterDesign {
        band_id: BandId,
        center_freq: f64,
        low_edge: f64,
        high_edge: f64,
        nyquist: f64,
    },

    #[error("Sample rate must be positive, got {0}")]
    InvalidSampleRate(u32),

    #[error("Channel count must be positive")]
    InvalidChannelCount,
}

impl DspError {
    /// Whether this error describes a bad settings value rather than a
    /// settings/sample-rate mismatch found while filtering.
    pub fn is_config_error(&self) -> bool {
        !matches!(self, DspError::FilterDesign { .. })
    }
}
