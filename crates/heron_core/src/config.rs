//! Session Constants and Stream Parameters

use heron_dsp::BitDepth;
use serde::{Deserialize, Serialize};

/// Lowest accepted session sampling rate (Hz)
pub const MIN_FREQ: u32 = 5000;

/// Highest accepted session sampling rate (Hz)
pub const MAX_FREQ: u32 = 192_000;

pub const DEFAULT_SAMPLING_RATE: u32 = MAX_FREQ;
pub const DEFAULT_BIT_DEPTH: BitDepth = BitDepth::TwentyFour;
pub const DEFAULT_FRAME_SIZE: u32 = 1024;
pub const DEFAULT_CHANNELS: u16 = 2;
pub const MAX_CHANNELS: u16 = 32;

/// Names (file and session) must be shorter than this and non-empty
pub const MAX_NAME_LEN: usize = 20;

/// Session numbers must lie strictly between 0 and this
pub const MAX_SESSION_NUMBER: u32 = 999;

pub const DEFAULT_FILE_NAME: &str = "default_audio.wav";
pub const DEFAULT_SESSION_NAME: &str = "Default_Session";

/// Parameters a backend needs to open a playback stream
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamParams {
    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Number of interleaved channels
    pub channels: u16,

    /// Frames per callback buffer
    pub frames_per_buffer: u32,

    /// Integer PCM depth of the samples handed to the backend
    pub bit_depth: BitDepth,
}

impl Default for StreamParams {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLING_RATE,
            channels: DEFAULT_CHANNELS,
            frames_per_buffer: DEFAULT_FRAME_SIZE,
            bit_depth: DEFAULT_BIT_DEPTH,
        }
    }
}

impl StreamParams {
    /// Calculate latency in milliseconds for one callback buffer
    pub fn latency_ms(&self) -> f32 {
        (self.frames_per_buffer as f32 / self.sample_rate as f32) * 1000.0
    }

    /// Interleaved samples in one full callback buffer
    pub fn samples_per_buffer(&self) -> usize {
        self.frames_per_buffer as usize * self.channels as usize
    }

    /// Calculate bytes per frame at the session bit depth
    pub fn bytes_per_frame(&self) -> usize {
        self.bit_depth.bytes() * self.channels as usize
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(MIN_FREQ..=MAX_FREQ).contains(&self.sample_rate) {
            return Err(format!("Invalid sample rate: {}", self.sample_rate));
        }
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(format!("Invalid channel count: {}", self.channels));
        }
        if self.frames_per_buffer == 0 {
            return Err(format!("Invalid buffer size: {}", self.frames_per_buffer));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = StreamParams::default();
        assert_eq!(params.sample_rate, 192_000);
        assert_eq!(params.channels, 2);
        assert_eq!(params.frames_per_buffer, 1024);
        assert_eq!(params.bit_depth, BitDepth::TwentyFour);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_latency_calculation() {
        let params = StreamParams {
            sample_rate: 48000,
            frames_per_buffer: 480, // Exactly 10ms at 48kHz
            ..Default::default()
        };
        assert!((params.latency_ms() - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_buffer_sizes() {
        let params = StreamParams {
            channels: 2,
            frames_per_buffer: 512,
            bit_depth: BitDepth::Sixteen,
            ..Default::default()
        };
        assert_eq!(params.samples_per_buffer(), 1024);
        assert_eq!(params.bytes_per_frame(), 4);
    }

    #[test]
    fn test_validation() {
        let invalid_rate = StreamParams {
            sample_rate: 4000,
            ..Default::default()
        };
        assert!(invalid_rate.validate().is_err());

        let invalid_channels = StreamParams {
            channels: 0,
            ..Default::default()
        };
        assert!(invalid_channels.validate().is_err());

        let invalid_buffer = StreamParams {
            frames_per_buffer: 0,
            ..Default::default()
        };
        assert!(invalid_buffer.validate().is_err());
    }

    #[test]
    fn test_params_serialization() {
        let params = StreamParams::default();
        let json = serde_json::to_string(&params).unwrap();
        assert!(json.contains("\"bit_depth\":24"));

        let back: StreamParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }
}
