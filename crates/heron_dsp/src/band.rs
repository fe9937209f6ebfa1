//! Parametric EQ Band
//!
//! A band is a bandpass region described by its center frequency and Q.
//! The edges are derived, never stored:
//!
//! ```text
//! bandwidth = center / q
//! low_edge  = center - bandwidth / 2
//! high_edge = center + bandwidth / 2
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DspError;

/// Unique key of a band inside a band table
pub type BandId = u32;

/// Band table keyed by id. Ordering carries no meaning; the bands are summed.
pub type BandTable = BTreeMap<BandId, EqBand>;

/// Default Q when a caller does not specify one
pub const DEFAULT_Q: f64 = 1.0;

/// Single EQ band
///
/// Only constructible through [`EqBand::new`], so a band with a non-positive
/// frequency or Q cannot exist.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBand")]
pub struct EqBand {
    id: BandId,
    center_freq: f64,
    gain_db: f64,
    q_factor: f64,
}

#[derive(Deserialize)]
struct RawBand {
    id: BandId,
    center_freq: f64,
    gain_db: f64,
    #[serde(default = "default_q")]
    q_factor: f64,
}

fn default_q() -> f64 {
    DEFAULT_Q
}

impl TryFrom<RawBand> for EqBand {
    type Error = DspError;

    fn try_from(raw: RawBand) -> Result<Self, Self::Error> {
        EqBand::new(raw.id, raw.center_freq, raw.gain_db, raw.q_factor)
    }
}

impl EqBand {
    pub fn new(
        id: BandId,
        center_freq: f64,
        gain_db: f64,
        q_factor: f64,
    ) -> Result<Self, DspError> {
        let invalid = |reason: &str| DspError::InvalidBand {
            band_id: id,
            reason: reason.to_string(),
        };

        if !center_freq.is_finite() || center_freq <= 0.0 {
            return Err(invalid("center frequency must be a positive number"));
        }
        if !q_factor.is_finite() || q_factor <= 0.0 {
            return Err(invalid("q factor must be a positive number"));
        }
        if !gain_db.is_finite() {
            return Err(invalid("gain must be finite"));
        }

        Ok(Self {
            id,
            center_freq,
            gain_db,
            q_factor,
        })
    }

    pub fn id(&self) -> BandId {
        self.id
    }

    pub fn center_freq(&self) -> f64 {
        self.center_freq
    }

    pub fn gain_db(&self) -> f64 {
        self.gain_db
    }

    pub fn q_factor(&self) -> f64 {
        self.q_factor
    }

    pub fn bandwidth(&self) -> f64 {
        self.center_freq / self.q_factor
    }

    pub fn low_edge(&self) -> f64 {
        self.center_freq - self.bandwidth() / 2.0
    }

    pub fn high_edge(&self) -> f64 {
        self.center_freq + self.bandwidth() / 2.0
    }

    /// Linear amplitude multiplier for this band's gain
    pub fn linear_gain(&self) -> f64 {
        db_to_linear(self.gain_db)
    }

    /// Check that the derived edges form a sub-Nyquist interval at `sample_rate`
    pub fn validate_for(&self, sample_rate: u32) -> Result<(), DspError> {
        if sample_rate == 0 {
            return Err(DspError::InvalidSampleRate(sample_rate));
        }

        let nyquist = sample_rate as f64 / 2.0;
        let (low, high) = (self.low_edge(), self.high_edge());

        if low <= 0.0 || high >= nyquist || low >= high {
            return Err(DspError::FilterDesign {
                band_id: self.id,
                center_freq: self.center_freq,
                low_edge: low,
                high_edge: high,
                nyquist,
            });
        }
        Ok(())
    }

    /// Whether switching from `self` to `other` needs a new filter design.
    /// Gain alone does not.
    pub(crate) fn same_shape(&self, other: &EqBand) -> bool {
        self.center_freq == other.center_freq && self.q_factor == other.q_factor
    }
}

/// Convert dB gain to linear amplitude
/// Formula: amplitude = 10^(dB/20)
pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_edges() {
        let band = EqBand::new(1, 4000.0, -6.0, 1.0).unwrap();
        assert_eq!(band.bandwidth(), 4000.0);
        assert_eq!(band.low_edge(), 2000.0);
        assert_eq!(band.high_edge(), 6000.0);
    }

    #[test]
    fn test_valid_at_high_sample_rate() {
        let band = EqBand::new(1, 4000.0, 0.0, 1.0).unwrap();
        assert!(band.validate_for(192_000).is_ok());
    }

    #[test]
    fn test_wide_band_rejected() {
        // bandwidth 40 kHz pushes the low edge below zero
        let band = EqBand::new(3, 4000.0, 0.0, 0.1).unwrap();
        assert_eq!(band.bandwidth(), 40000.0);
        assert!(band.low_edge() < 0.0);

        match band.validate_for(8000) {
            Err(DspError::FilterDesign { band_id, nyquist, .. }) => {
                assert_eq!(band_id, 3);
                assert_eq!(nyquist, 4000.0);
            }
            other => panic!("expected FilterDesign, got {:?}", other),
        }
    }

    #[test]
    fn test_band_above_nyquist_rejected() {
        let band = EqBand::new(2, 20000.0, 3.0, 2.0).unwrap();
        assert!(band.validate_for(44100).is_ok());
        assert!(band.validate_for(32000).is_err());
    }

    #[test]
    fn test_invalid_construction() {
        assert!(EqBand::new(1, 0.0, 0.0, 1.0).is_err());
        assert!(EqBand::new(1, -100.0, 0.0, 1.0).is_err());
        assert!(EqBand::new(1, 1000.0, 0.0, 0.0).is_err());
        assert!(EqBand::new(1, 1000.0, f64::NAN, 1.0).is_err());
        assert!(EqBand::new(1, f64::INFINITY, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_zero_db_is_unity() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-12);
        assert!((db_to_linear(-6.0) - 0.501_187).abs() < 1e-5);
        assert!((db_to_linear(20.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_deserialize_validates() {
        let band: EqBand =
            serde_json::from_str(r#"{"id": 4, "center_freq": 1000.0, "gain_db": 3.0}"#).unwrap();
        assert_eq!(band.q_factor(), DEFAULT_Q);

        let bad = serde_json::from_str::<EqBand>(
            r#"{"id": 4, "center_freq": -1.0, "gain_db": 3.0, "q_factor": 1.0}"#,
        );
        assert!(bad.is_err());
    }
}
