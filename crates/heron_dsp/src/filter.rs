//! Butterworth Bandpass Filters
//!
//! A band's passband is built from a 4th-order Butterworth highpass at the low
//! edge cascaded with a 4th-order Butterworth lowpass at the high edge. Each
//! 4th-order stage is two biquad sections whose Q values are the Butterworth
//! pole pair Qs, the same cascading approach as a Linkwitz-Riley crossover.
//!
//! # Zero-phase filtering in a stream
//!
//! A classic forward-backward pass needs the whole signal. Here the forward
//! pass keeps its delay lines across calls so consecutive frames join without
//! a seam. The backward pass needs the signal that follows the frame, so each
//! call also receives look-ahead samples from the source: a throwaway copy of
//! the forward cascade runs over them, and the backward filter starts from
//! rest at the far end of the look-ahead. By the time it reaches the frame its
//! start-up transient has decayed, and the frame matches what a whole-signal
//! pass would produce.

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type};

use crate::band::EqBand;
use crate::error::DspError;

/// Q values of the two pole pairs of a 4th-order Butterworth filter:
/// 1 / (2 cos(pi/8)) and 1 / (2 cos(3pi/8))
pub const BUTTERWORTH_Q4: [f64; 2] = [0.541_196_100_146_197, 1.306_562_964_876_376_7];

/// Default look-ahead per channel handed to the backward pass
pub const DEFAULT_LOOKAHEAD: usize = 4096;

const SECTIONS: usize = 4;

/// Designed coefficients for one band at one sample rate
#[derive(Debug, Clone, Copy)]
pub struct BandpassDesign {
    sections: [Coefficients<f64>; SECTIONS],
}

impl BandpassDesign {
    /// Design the bandpass for `band` at `sample_rate`.
    ///
    /// Fails with [`DspError::FilterDesign`] when the band's edges are not a
    /// sub-Nyquist interval.
    pub fn new(band: &EqBand, sample_rate: u32) -> Result<Self, DspError> {
        band.validate_for(sample_rate)?;

        let design_error = || DspError::FilterDesign {
            band_id: band.id(),
            center_freq: band.center_freq(),
            low_edge: band.low_edge(),
            high_edge: band.high_edge(),
            nyquist: sample_rate as f64 / 2.0,
        };

        let fs = (sample_rate as f64).hz();
        let low = band.low_edge().hz();
        let high = band.high_edge().hz();

        let section = |filter_type: Type<f64>, f0, q| {
            Coefficients::<f64>::from_params(filter_type, fs, f0, q).map_err(|_| design_error())
        };

        Ok(Self {
            sections: [
                section(Type::HighPass, low, BUTTERWORTH_Q4[0])?,
                section(Type::HighPass, low, BUTTERWORTH_Q4[1])?,
                section(Type::LowPass, high, BUTTERWORTH_Q4[0])?,
                section(Type::LowPass, high, BUTTERWORTH_Q4[1])?,
            ],
        })
    }
}

/// Four biquad sections run in series
#[derive(Clone, Copy)]
struct Cascade {
    stages: [DirectForm2Transposed<f64>; SECTIONS],
}

impl Cascade {
    fn new(design: &BandpassDesign) -> Self {
        Self {
            stages: design.sections.map(DirectForm2Transposed::<f64>::new),
        }
    }

    #[inline]
    fn run(&mut self, input: f64) -> f64 {
        self.stages.iter_mut().fold(input, |x, stage| stage.run(x))
    }

    fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset_state();
        }
    }
}

/// Zero-phase bandpass for a single channel
///
/// The forward delay line persists between [`process`](Self::process) calls
/// and only advances over the frame, never over the look-ahead.
#[derive(Clone, Copy)]
pub struct ZeroPhaseBandpass {
    forward: Cascade,
    backward: Cascade,
}

impl ZeroPhaseBandpass {
    pub fn new(design: &BandpassDesign) -> Self {
        Self {
            forward: Cascade::new(design),
            backward: Cascade::new(design),
        }
    }

    /// Filter `signal` into `output` (same length).
    ///
    /// `signal` holds the frame in its first `frame_len` samples followed by
    /// look-ahead from the source. Only `output[..frame_len]` is final; the
    /// rest is scratch. With no look-ahead the frame is treated as the end of
    /// the signal.
    ///
    /// # Real-time Safety
    /// No allocations. O(signal length).
    pub fn process(&mut self, signal: &[f64], frame_len: usize, output: &mut [f64]) {
        debug_assert_eq!(signal.len(), output.len(), "Channel buffers must be same length");
        debug_assert!(frame_len <= signal.len());

        let (frame, lookahead) = signal.split_at(frame_len.min(signal.len()));
        let (frame_out, lookahead_out) = output.split_at_mut(frame.len());

        for (x, y) in frame.iter().zip(frame_out.iter_mut()) {
            *y = self.forward.run(*x);
        }

        // Look-ahead must not leave a trace in the persisted state
        let mut ahead = self.forward;
        for (x, y) in lookahead.iter().zip(lookahead_out.iter_mut()) {
            *y = ahead.run(*x);
        }

        self.backward.reset();
        for y in output.iter_mut().rev() {
            *y = self.backward.run(*y);
        }
    }

    /// Clear both delay lines
    pub fn reset(&mut self) {
        self.forward.reset();
        self.backward.reset();
    }
}
