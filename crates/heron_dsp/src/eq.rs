//! Multi-Band Parametric Equalizer
//!
//! Every band is an independent zero-phase bandpass whose output is scaled by
//! the band gain. The band outputs are summed (not averaged), the global gain
//! is applied to the sum, and the result is rounded and hard-clipped back into
//! the frame's bit depth.
//!
//! # Filter state
//!
//! Each band keeps one forward delay line per channel that carries over from
//! frame to frame, so only the newly arrived frame (plus a bounded look-ahead
//! into the source) is filtered on each call and the cost does not grow with
//! the length of the session. See [`crate::filter`] for how the look-ahead
//! feeds the backward half of the pass.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::band::{db_to_linear, BandId, EqBand};
use crate::error::DspError;
use crate::filter::{BandpassDesign, ZeroPhaseBandpass, DEFAULT_LOOKAHEAD};
use crate::sample::BitDepth;
use crate::settings::{EqSnapshot, EqualizerSettings};

/// Filter state for one band across all channels
struct BandState {
    band: EqBand,
    sample_rate: u32,
    channels: Vec<ZeroPhaseBandpass>,
}

impl BandState {
    fn new(band: EqBand, sample_rate: u32, channels: usize) -> Result<Self, DspError> {
        let design = BandpassDesign::new(&band, sample_rate)?;
        Ok(Self {
            band,
            sample_rate,
            channels: vec![ZeroPhaseBandpass::new(&design); channels],
        })
    }
}

/// The equalizer engine
///
/// Reads its band table from shared [`EqualizerSettings`] once per call, so a
/// frame is always processed against one consistent configuration while the
/// table stays live-tunable between frames.
pub struct Equalizer {
    settings: Arc<EqualizerSettings>,
    channels: usize,
    bit_depth: BitDepth,
    snapshot: EqSnapshot,
    /// Generation of `snapshot`; `None` until the first read
    seen_generation: Option<u64>,
    bands: BTreeMap<BandId, BandState>,
    lookahead: usize,
    // Scratch buffers, grown on demand and reused
    planar_in: Vec<Vec<f64>>,
    planar_band: Vec<Vec<f64>>,
    mix: Vec<f64>,
}

impl Equalizer {
    pub fn new(
        settings: Arc<EqualizerSettings>,
        channels: usize,
        bit_depth: BitDepth,
    ) -> Result<Self, DspError> {
        if channels == 0 {
            return Err(DspError::InvalidChannelCount);
        }

        Ok(Self {
            settings,
            channels,
            bit_depth,
            snapshot: EqSnapshot::default(),
            seen_generation: None,
            bands: BTreeMap::new(),
            lookahead: DEFAULT_LOOKAHEAD,
            planar_in: vec![Vec::new(); channels],
            planar_band: vec![Vec::new(); channels],
            mix: Vec::new(),
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn bit_depth(&self) -> BitDepth {
        self.bit_depth
    }

    pub fn settings(&self) -> &Arc<EqualizerSettings> {
        &self.settings
    }

    /// Set how many frames of upcoming source the caller should pass as
    /// look-ahead. Longer look-ahead suits very low bands, at a higher
    /// per-call cost.
    pub fn with_lookahead(mut self, frames: usize) -> Self {
        self.lookahead = frames;
        self
    }

    /// Look-ahead in frames; callers pass `lookahead_frames() * channels`
    /// interleaved samples
    pub fn lookahead_frames(&self) -> usize {
        self.lookahead
    }

    /// Equalize one interleaved frame as the end of the signal.
    ///
    /// Same as [`equalize_with_lookahead`](Self::equalize_with_lookahead)
    /// with no look-ahead.
    pub fn equalize<'a>(
        &mut self,
        frame: &'a [i32],
        sample_rate: u32,
    ) -> Result<Cow<'a, [i32]>, DspError> {
        self.equalize_with_lookahead(frame, &[], sample_rate)
    }

    /// Equalize one interleaved frame.
    ///
    /// `lookahead` is the interleaved source that follows the frame; it is
    /// read but never emitted, and it does not advance any filter state.
    /// Returns the input unchanged (borrowed) when the band table is empty;
    /// otherwise a new frame of the same length. Fails with
    /// [`DspError::FilterDesign`] if any band does not fit below Nyquist at
    /// `sample_rate`.
    pub fn equalize_with_lookahead<'a>(
        &mut self,
        frame: &'a [i32],
        lookahead: &[i32],
        sample_rate: u32,
    ) -> Result<Cow<'a, [i32]>, DspError> {
        if sample_rate == 0 {
            return Err(DspError::InvalidSampleRate(sample_rate));
        }

        self.refresh_snapshot();

        if self.snapshot.bands.is_empty() {
            return Ok(Cow::Borrowed(frame));
        }

        self.sync_band_states(sample_rate)?;

        if frame.is_empty() {
            return Ok(Cow::Owned(Vec::new()));
        }

        self.deinterleave(frame, lookahead);
        self.mix.clear();
        self.mix.resize(frame.len(), 0.0);

        let channels = self.channels;
        for state in self.bands.values_mut() {
            let gain = state.band.linear_gain();

            for (ch, filter) in state.channels.iter_mut().enumerate() {
                let input = &self.planar_in[ch];
                let output = &mut self.planar_band[ch];
                output.clear();
                output.resize(input.len(), 0.0);

                // Samples of this channel inside the frame
                let frame_len = frame.len() / channels + usize::from(ch < frame.len() % channels);
                filter.process(input, frame_len, output);

                for (i, y) in output[..frame_len].iter().enumerate() {
                    self.mix[i * channels + ch] += y * gain;
                }
            }
        }

        let global = db_to_linear(self.snapshot.global_gain_db);
        let depth = self.bit_depth;
        let out = self.mix.iter().map(|&s| depth.clip(s * global)).collect();

        Ok(Cow::Owned(out))
    }

    /// Clear every band's delay lines
    ///
    /// Call when jumping to an unrelated position in the source.
    pub fn reset(&mut self) {
        for state in self.bands.values_mut() {
            for filter in &mut state.channels {
                filter.reset();
            }
        }
    }

    fn refresh_snapshot(&mut self) {
        let fresh = match self.seen_generation {
            Some(seen) => self.settings.snapshot_if_changed(seen),
            None => Some(self.settings.snapshot()),
        };
        if let Some(snapshot) = fresh {
            self.seen_generation = Some(snapshot.generation);
            self.snapshot = snapshot;
        }
    }

    /// Bring per-band filter state in line with the current snapshot.
    ///
    /// Bands whose shape or sample rate changed are redesigned from rest;
    /// gain-only edits keep their delay lines. Removed bands are dropped.
    fn sync_band_states(&mut self, sample_rate: u32) -> Result<(), DspError> {
        let wanted = &self.snapshot.bands;
        self.bands.retain(|id, _| wanted.contains_key(id));

        for (id, band) in wanted {
            match self.bands.get_mut(id) {
                Some(state) if state.sample_rate == sample_rate && state.band.same_shape(band) => {
                    state.band = *band;
                }
                _ => {
                    let state = BandState::new(*band, sample_rate, self.channels)?;
                    self.bands.insert(*id, state);
                }
            }
        }
        Ok(())
    }

    /// Split an interleaved frame and its look-ahead into per-channel f64
    /// buffers, frame samples first.
    ///
    /// A trailing partial sample group still lands in its channels, so the
    /// mix index `i * channels + ch` always stays inside the frame.
    fn deinterleave(&mut self, frame: &[i32], lookahead: &[i32]) {
        for buf in &mut self.planar_in {
            buf.clear();
        }
        for (i, &sample) in frame.iter().chain(lookahead).enumerate() {
            self.planar_in[i % self.channels].push(sample as f64);
        }
    }
}
