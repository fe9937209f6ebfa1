//! Recording Output
//!
//! Persists the drained frame queue once the stream has stopped.

use std::path::Path;

use heron_dsp::BitDepth;
use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};

/// Format of a recording handed to a writer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: BitDepth,
}

/// Encodes interleaved samples to a file
pub trait RecordingWriter {
    fn write(&self, path: &Path, samples: &[i32], spec: RecordingSpec) -> EngineResult<()>;
}

/// Writes integer PCM WAV files at the recording's bit depth
#[derive(Debug, Default, Clone, Copy)]
pub struct WavRecordingWriter;

impl RecordingWriter for WavRecordingWriter {
    fn write(&self, path: &Path, samples: &[i32], spec: RecordingSpec) -> EngineResult<()> {
        if spec.channels == 0 {
            return Err(EngineError::config("recording needs at least one channel"));
        }

        let wav_spec = hound::WavSpec {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bit_depth.bits(),
            sample_format: hound::SampleFormat::Int,
        };

        // WAV only holds whole frames
        let channels = spec.channels as usize;
        let whole = samples.len() - samples.len() % channels;
        if whole < samples.len() {
            warn!(
                "Dropping {} trailing samples that do not fill a frame",
                samples.len() - whole
            );
        }

        let mut writer = hound::WavWriter::create(path, wav_spec)?;
        for &sample in &samples[..whole] {
            writer.write_sample(spec.bit_depth.clip(sample as f64))?;
        }
        writer.finalize()?;

        info!(
            "Wrote {} ({} frames, {} Hz, {}-bit)",
            path.display(),
            whole / channels,
            spec.sample_rate,
            spec.bit_depth.bits()
        );
        Ok(())
    }
}
