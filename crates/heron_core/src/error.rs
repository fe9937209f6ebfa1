//! Engine Error Types

use thiserror::Error;

/// Errors that can occur in the audio engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Cannot {operation} while stream is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("DSP error: {0}")]
    Dsp(#[from] heron_dsp::DspError),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn config(msg: impl Into<String>) -> Self {
        EngineError::Config(msg.into())
    }

    pub fn device(msg: impl Into<String>) -> Self {
        EngineError::Device(msg.into())
    }

    /// Whether this is a rejected settings value (including band settings)
    pub fn is_config_error(&self) -> bool {
        match self {
            EngineError::Config(_) => true,
            EngineError::Dsp(e) => e.is_config_error(),
            _ => false,
        }
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
