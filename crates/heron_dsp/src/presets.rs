//! Built-in Band Presets

use crate::band::{BandId, BandTable, EqBand};
use crate::error::DspError;

/// Named band table: (id, center Hz, gain dB, q)
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub name: &'static str,
    pub bands: &'static [(BandId, f64, f64, f64)],
}

impl Preset {
    pub fn band_table(&self) -> Result<BandTable, DspError> {
        self.bands
            .iter()
            .map(|&(id, freq, gain, q)| EqBand::new(id, freq, gain, q).map(|band| (id, band)))
            .collect()
    }
}

/// List of built-in presets
pub const PRESETS: &[Preset] = &[
    Preset { name: "Flat", bands: &[] },
    Preset { name: "Default", bands: &[(1, 4000.0, -6.0, 1.0)] },
    Preset { name: "Presence", bands: &[(1, 2500.0, 3.0, 1.5), (2, 5000.0, 2.0, 2.0)] },
    Preset { name: "Warmth", bands: &[(1, 200.0, 4.0, 0.8), (2, 3000.0, -2.0, 1.0)] },
    Preset { name: "Air", bands: &[(1, 12000.0, 4.0, 1.2)] },
    // Six flat bands spanning 20 Hz to 20 kHz, edges at 60/200/600/2000/6000
    Preset {
        name: "Standard",
        bands: &[
            (1, 40.0, 0.0, 1.0),
            (2, 130.0, 0.0, 13.0 / 14.0),
            (3, 400.0, 0.0, 1.0),
            (4, 1300.0, 0.0, 13.0 / 14.0),
            (5, 4000.0, 0.0, 1.0),
            (6, 13000.0, 0.0, 13.0 / 14.0),
        ],
    },
];

/// Case-insensitive lookup
pub fn find_preset(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}
