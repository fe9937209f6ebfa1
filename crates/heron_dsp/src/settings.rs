//! Shared Equalizer Settings
//!
//! One band table plus a global gain, shared between the controlling thread
//! and the audio callback. Every operation takes the single mutex for the time
//! it needs to copy or mutate the in-memory table and nothing longer, which
//! bounds how long the callback can stall on a concurrent writer.

use parking_lot::Mutex;

use crate::band::{BandId, BandTable, EqBand, DEFAULT_Q};
use crate::error::DspError;
use crate::presets::find_preset;

/// Default band table: one cut at 4 kHz
pub const DEFAULT_EQ_BANDS: &[(BandId, f64, f64, f64)] = &[(1, 4000.0, -6.0, DEFAULT_Q)];

pub const DEFAULT_GLOBAL_GAIN_DB: f64 = 0.0;

/// Consistent view of the settings taken under one lock acquisition
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EqSnapshot {
    pub bands: BandTable,
    pub global_gain_db: f64,
    /// Write counter value this snapshot was taken at
    pub generation: u64,
}

#[derive(Debug)]
struct Inner {
    bands: BandTable,
    global_gain_db: f64,
    generation: u64,
}

impl Inner {
    fn touch(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}

/// Thread-safe band table and global gain
#[derive(Debug)]
pub struct EqualizerSettings {
    inner: Mutex<Inner>,
}

impl Default for EqualizerSettings {
    fn default() -> Self {
        let bands = DEFAULT_EQ_BANDS
            .iter()
            .filter_map(|&(id, freq, gain, q)| EqBand::new(id, freq, gain, q).ok())
            .map(|band| (band.id(), band))
            .collect();

        Self::with_bands(bands, DEFAULT_GLOBAL_GAIN_DB)
    }
}

impl EqualizerSettings {
    /// Settings with an empty band table (identity equalizer)
    pub fn flat() -> Self {
        Self::with_bands(BandTable::new(), DEFAULT_GLOBAL_GAIN_DB)
    }

    fn with_bands(bands: BandTable, global_gain_db: f64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                bands,
                global_gain_db,
                generation: 0,
            }),
        }
    }

    /// Copy of the full band table
    pub fn get_bands(&self) -> BandTable {
        self.inner.lock().bands.clone()
    }

    /// Replace the whole table atomically
    pub fn set_bands(&self, bands: BandTable) -> Result<(), DspError> {
        if let Some((&key, band)) = bands.iter().find(|(key, band)| **key != band.id()) {
            return Err(DspError::BandIdMismatch {
                key,
                band_id: band.id(),
            });
        }

        let mut inner = self.inner.lock();
        inner.bands = bands;
        inner.touch();
        Ok(())
    }

    /// Insert a band or overwrite the band with the same id
    pub fn add_or_update_band(
        &self,
        id: BandId,
        center_freq: f64,
        gain_db: f64,
        q_factor: f64,
    ) -> Result<(), DspError> {
        let band = EqBand::new(id, center_freq, gain_db, q_factor)?;
        self.upsert(band);
        Ok(())
    }

    /// Insert an already validated band
    pub fn upsert(&self, band: EqBand) {
        let mut inner = self.inner.lock();
        inner.bands.insert(band.id(), band);
        inner.touch();
    }

    /// Remove a band; absent ids are ignored
    pub fn remove_band(&self, id: BandId) {
        let mut inner = self.inner.lock();
        if inner.bands.remove(&id).is_some() {
            inner.touch();
        }
    }

    pub fn clear_bands(&self) {
        let mut inner = self.inner.lock();
        inner.bands.clear();
        inner.touch();
    }

    pub fn band(&self, id: BandId) -> Option<EqBand> {
        self.inner.lock().bands.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().bands.is_empty()
    }

    pub fn get_global_gain(&self) -> f64 {
        self.inner.lock().global_gain_db
    }

    pub fn set_global_gain(&self, gain_db: f64) -> Result<(), DspError> {
        if !gain_db.is_finite() {
            return Err(DspError::InvalidBand {
                band_id: 0,
                reason: format!("global gain must be finite, got {gain_db}"),
            });
        }

        let mut inner = self.inner.lock();
        inner.global_gain_db = gain_db;
        inner.touch();
        Ok(())
    }

    /// Replace the table with a named preset
    pub fn apply_preset(&self, name: &str) -> Result<(), DspError> {
        let bands = find_preset(name)
            .ok_or_else(|| DspError::UnknownPreset(name.to_string()))?
            .band_table()?;
        self.set_bands(bands)
    }

    /// Bands and global gain read under one lock
    pub fn snapshot(&self) -> EqSnapshot {
        let inner = self.inner.lock();
        EqSnapshot {
            bands: inner.bands.clone(),
            global_gain_db: inner.global_gain_db,
            generation: inner.generation,
        }
    }

    /// Like [`snapshot`](Self::snapshot) but skips the copy when nothing was
    /// written since generation `seen`
    pub fn snapshot_if_changed(&self, seen: u64) -> Option<EqSnapshot> {
        let inner = self.inner.lock();
        if inner.generation == seen {
            return None;
        }
        Some(EqSnapshot {
            bands: inner.bands.clone(),
            global_gain_db: inner.global_gain_db,
            generation: inner.generation,
        })
    }

    /// Number of writes so far
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }
}
