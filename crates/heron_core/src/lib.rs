//! Heron Core - Streaming Engine
//!
//! This crate drives an equalized playback session and records what was
//! played, including:
//! - Validated session settings shared with the audio callback
//! - The real-time render callback walking a pre-loaded source
//! - Backends for a cpal output device and for offline rendering
//! - An ordered frame queue persisted to WAV once the stream stops
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Controller Thread                        │
//! │  start_stream ──▶ streaming (poll, events) ──▶ stop_stream  │
//! │                                      │                      │
//! │                                      └──▶ save_recording    │
//! └─────────────────────────────────────────────────────────────┘
//!        │ open/start            ▲ crossbeam-channel (try_send)
//!        ▼                       │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Backend Audio Thread                      │
//! │   Source cursor ──▶ Equalizer ──▶ playback buffer           │
//! │                         │                                   │
//! │                         └──copy──▶ FrameQueue (mutex)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod backend;
mod config;
mod controller;
mod device;
mod error;
mod message;
mod offline;
mod queue;
mod settings;
mod source;
mod stream;
mod writer;

pub use backend::{AudioBackend, BackendStream};
pub use config::{
    StreamParams, DEFAULT_BIT_DEPTH, DEFAULT_CHANNELS, DEFAULT_FILE_NAME, DEFAULT_FRAME_SIZE,
    DEFAULT_SAMPLING_RATE, DEFAULT_SESSION_NAME, MAX_CHANNELS, MAX_FREQ, MAX_NAME_LEN,
    MAX_SESSION_NUMBER, MIN_FREQ,
};
pub use controller::{StreamController, StreamOutcome, StreamState, DEFAULT_POLL_INTERVAL};
pub use device::CpalBackend;
pub use error::{EngineError, EngineResult};
pub use message::{event_channel, Event, EVENT_CAPACITY};
pub use offline::OfflineBackend;
pub use queue::FrameQueue;
pub use settings::{SessionSettings, SessionSnapshot};
pub use source::{LoadedSource, SourceBuffer, SourceLoader, WavSourceLoader};
pub use stream::{RenderCallback, StreamFlow, StreamProcessor};
pub use writer::{RecordingSpec, RecordingWriter, WavRecordingWriter};

// Re-export DSP types for convenience
pub use heron_dsp::{BitDepth, DspError, EqBand, Equalizer, EqualizerSettings, PRESETS};
