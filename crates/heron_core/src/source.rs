//! Source Audio
//!
//! The whole input is decoded up front into a flat interleaved buffer. The
//! callback walks it with a cursor that only ever moves forward.

use std::ops::Range;
use std::path::Path;

use heron_dsp::BitDepth;
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};

/// Pre-loaded interleaved samples plus a read cursor
#[derive(Debug, Clone)]
pub struct SourceBuffer {
    samples: Vec<i32>,
    cursor: usize,
}

impl SourceBuffer {
    pub fn new(samples: Vec<i32>) -> Self {
        Self { samples, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples consumed so far
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.samples.len() - self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.samples.len()
    }

    /// Claim the next `frame_count * channels` samples and advance the cursor.
    ///
    /// The last slice may be short. Returns `None` once the buffer is
    /// exhausted; the cursor never passes the end.
    pub fn next_slice(&mut self, frame_count: usize, channels: usize) -> Option<Range<usize>> {
        let start = self.cursor;
        if start >= self.samples.len() {
            return None;
        }

        let wanted = frame_count.saturating_mul(channels);
        let end = start.saturating_add(wanted).min(self.samples.len());
        self.cursor = end;
        Some(start..end)
    }

    /// Up to `count` samples after the cursor, without consuming them
    pub fn upcoming(&self, count: usize) -> &[i32] {
        let end = self.cursor.saturating_add(count).min(self.samples.len());
        &self.samples[self.cursor..end]
    }

    pub fn slice(&self, range: Range<usize>) -> &[i32] {
        &self.samples[range]
    }

    pub fn samples(&self) -> &[i32] {
        &self.samples
    }
}

/// Decoded input handed over by a loader
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub samples: Vec<i32>,
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: BitDepth,
}

impl LoadedSource {
    /// Length in frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn into_buffer(self) -> SourceBuffer {
        SourceBuffer::new(self.samples)
    }
}

/// Anything that can decode a file into interleaved integer PCM
pub trait SourceLoader {
    fn load(&self, path: &Path) -> EngineResult<LoadedSource>;
}

/// Loads 16- or 24-bit integer WAV files
#[derive(Debug, Default, Clone, Copy)]
pub struct WavSourceLoader;

impl SourceLoader for WavSourceLoader {
    fn load(&self, path: &Path) -> EngineResult<LoadedSource> {
        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        debug!("WAV spec for {}: {:?}", path.display(), spec);

        if spec.sample_format != hound::SampleFormat::Int {
            return Err(EngineError::config(format!(
                "{}: only integer PCM is supported",
                path.display()
            )));
        }
        let bit_depth = BitDepth::from_bits(spec.bits_per_sample).ok_or_else(|| {
            EngineError::config(format!(
                "{}: unsupported bit depth {}",
                path.display(),
                spec.bits_per_sample
            ))
        })?;

        let samples = reader
            .into_samples::<i32>()
            .collect::<Result<Vec<_>, _>>()?;

        let source = LoadedSource {
            samples,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            bit_depth,
        };

        info!(
            "Loaded {} ({} Hz, {} ch, {}-bit, {:.2}s)",
            path.display(),
            source.sample_rate,
            source.channels,
            bit_depth.bits(),
            source.duration_secs()
        );
        Ok(source)
    }
}
