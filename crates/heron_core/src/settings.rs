//! Session Settings
//!
//! In-memory recording/session parameters shared between the controlling
//! thread and the audio callback. Every setter validates before taking the
//! lock, so a rejected value never becomes visible and the previous value
//! stays in place.

use std::path::{Path, PathBuf};

use heron_dsp::BitDepth;
use parking_lot::Mutex;

use crate::config::{
    StreamParams, DEFAULT_BIT_DEPTH, DEFAULT_CHANNELS, DEFAULT_FILE_NAME, DEFAULT_FRAME_SIZE,
    DEFAULT_SAMPLING_RATE, DEFAULT_SESSION_NAME, MAX_CHANNELS, MAX_FREQ, MAX_NAME_LEN,
    MAX_SESSION_NUMBER, MIN_FREQ,
};
use crate::error::{EngineError, EngineResult};

/// Consistent copy of all session fields
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub sampling_rate: u32,
    pub bit_depth: BitDepth,
    pub channels: u16,
    pub frame_size: u32,
    pub directory: PathBuf,
    pub file_name: String,
    pub session_number: u32,
    pub session_name: String,
}

impl SessionSnapshot {
    pub fn full_path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }

    pub fn stream_params(&self) -> StreamParams {
        StreamParams {
            sample_rate: self.sampling_rate,
            channels: self.channels,
            frames_per_buffer: self.frame_size,
            bit_depth: self.bit_depth,
        }
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            sampling_rate: DEFAULT_SAMPLING_RATE,
            bit_depth: DEFAULT_BIT_DEPTH,
            channels: DEFAULT_CHANNELS,
            frame_size: DEFAULT_FRAME_SIZE,
            directory: PathBuf::from("."),
            file_name: DEFAULT_FILE_NAME.to_string(),
            session_number: 0,
            session_name: DEFAULT_SESSION_NAME.to_string(),
        }
    }
}

/// Thread-safe session settings
#[derive(Debug, Default)]
pub struct SessionSettings {
    inner: Mutex<SessionSnapshot>,
}

impl SessionSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().clone()
    }

    pub fn stream_params(&self) -> StreamParams {
        self.inner.lock().stream_params()
    }

    // Sampling rate

    pub fn sampling_rate(&self) -> u32 {
        self.inner.lock().sampling_rate
    }

    pub fn set_sampling_rate(&self, rate: u32) -> EngineResult<()> {
        if !(MIN_FREQ..=MAX_FREQ).contains(&rate) {
            return Err(EngineError::config(format!(
                "sampling rate {rate} Hz outside [{MIN_FREQ}, {MAX_FREQ}]"
            )));
        }
        self.inner.lock().sampling_rate = rate;
        Ok(())
    }

    // Bit depth

    pub fn bit_depth(&self) -> BitDepth {
        self.inner.lock().bit_depth
    }

    /// Set the bit depth from a raw bit count (16 or 24)
    pub fn set_bit_depth(&self, bits: u16) -> EngineResult<()> {
        let depth = BitDepth::from_bits(bits)
            .ok_or_else(|| EngineError::config(format!("bit depth must be 16 or 24, got {bits}")))?;
        self.inner.lock().bit_depth = depth;
        Ok(())
    }

    // Channels

    pub fn channels(&self) -> u16 {
        self.inner.lock().channels
    }

    pub fn set_channels(&self, channels: u16) -> EngineResult<()> {
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(EngineError::config(format!(
                "channel count must be 1..={MAX_CHANNELS}, got {channels}"
            )));
        }
        self.inner.lock().channels = channels;
        Ok(())
    }

    // Frame size

    pub fn frame_size(&self) -> u32 {
        self.inner.lock().frame_size
    }

    pub fn set_frame_size(&self, frames: u32) -> EngineResult<()> {
        if frames == 0 {
            return Err(EngineError::config("frame size must be positive"));
        }
        self.inner.lock().frame_size = frames;
        Ok(())
    }

    // Output location

    pub fn directory(&self) -> PathBuf {
        self.inner.lock().directory.clone()
    }

    /// Set the output directory; it must exist and be writable.
    ///
    /// Writability is checked by creating (and dropping) an anonymous
    /// temporary file there, so ownership and read-only mounts count too.
    pub fn set_directory(&self, path: impl AsRef<Path>) -> EngineResult<()> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|e| {
            EngineError::config(format!("{} is not accessible: {e}", path.display()))
        })?;

        if !metadata.is_dir() {
            return Err(EngineError::config(format!("{} is not a directory", path.display())));
        }
        tempfile::tempfile_in(path).map_err(|e| {
            EngineError::config(format!("{} is not writable: {e}", path.display()))
        })?;

        self.inner.lock().directory = path.to_path_buf();
        Ok(())
    }

    pub fn file_name(&self) -> String {
        self.inner.lock().file_name.clone()
    }

    pub fn set_file_name(&self, name: &str) -> EngineResult<()> {
        validate_name("output file name", name)?;
        if name.contains(['/', '\\']) {
            return Err(EngineError::config(format!(
                "output file name must not contain path separators: {name}"
            )));
        }
        self.inner.lock().file_name = name.to_string();
        Ok(())
    }

    /// Directory and file name joined
    pub fn full_path(&self) -> PathBuf {
        self.inner.lock().full_path()
    }

    // Session identity

    pub fn session_number(&self) -> u32 {
        self.inner.lock().session_number
    }

    pub fn set_session_number(&self, number: u32) -> EngineResult<()> {
        if number == 0 || number >= MAX_SESSION_NUMBER {
            return Err(EngineError::config(format!(
                "session number must be between 1 and {}, got {number}",
                MAX_SESSION_NUMBER - 1
            )));
        }
        self.inner.lock().session_number = number;
        Ok(())
    }

    pub fn session_name(&self) -> String {
        self.inner.lock().session_name.clone()
    }

    pub fn set_session_name(&self, name: &str) -> EngineResult<()> {
        validate_name("session name", name)?;
        self.inner.lock().session_name = name.to_string();
        Ok(())
    }
}

fn validate_name(what: &str, name: &str) -> EngineResult<()> {
    let len = name.chars().count();
    if len == 0 || len >= MAX_NAME_LEN {
        return Err(EngineError::config(format!(
            "{what} must be 1 to {} characters, got {len}",
            MAX_NAME_LEN - 1
        )));
    }
    Ok(())
}
