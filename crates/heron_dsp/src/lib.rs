//! Heron DSP - Digital Signal Processing Module
//!
//! This crate provides the equalization pipeline for Heron, including:
//! - Validated parametric band records and a thread-safe band table
//! - 4th-order Butterworth bandpass design on top of BiQuad sections
//! - Zero-phase band filtering with state carried across frames and source look-ahead
//! - Additive band mixing with global gain and hard clipping to the bit depth
//!
//! # Architecture
//!
//! [`EqualizerSettings`] is shared between the controlling thread and the
//! audio callback. [`Equalizer`] lives on the callback side and reads one
//! snapshot of the settings per frame.

mod band;
mod eq;
mod error;
mod filter;
mod presets;
mod sample;
mod settings;

pub use band::{db_to_linear, BandId, BandTable, EqBand, DEFAULT_Q};
pub use eq::Equalizer;
pub use error::DspError;
pub use filter::{BandpassDesign, ZeroPhaseBandpass, BUTTERWORTH_Q4, DEFAULT_LOOKAHEAD};
pub use presets::{find_preset, Preset, PRESETS};
pub use sample::BitDepth;
pub use settings::{EqSnapshot, EqualizerSettings, DEFAULT_EQ_BANDS, DEFAULT_GLOBAL_GAIN_DB};
