//! CPAL Playback Backend
//!
//! Plays the rendered integer PCM through an f32 output stream on the default
//! (or a named) output device.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig as CpalStreamConfig};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::backend::{AudioBackend, BackendStream};
use crate::config::StreamParams;
use crate::error::{EngineError, EngineResult};
use crate::message::Event;
use crate::stream::{RenderCallback, StreamFlow};

/// State shared between the cpal callbacks and the controller
#[derive(Default)]
struct PlaybackState {
    finished: AtomicBool,
    error: Mutex<Option<String>>,
}

/// Output backend built on the system's default cpal host
pub struct CpalBackend {
    device: Option<Device>,
    device_name: String,
}

impl CpalBackend {
    /// Use the system default output device
    pub fn new() -> EngineResult<Self> {
        let host = cpal::default_host();
        debug!("Using audio host: {}", host.id().name());

        let device = host
            .default_output_device()
            .ok_or_else(|| EngineError::device("no default output device"))?;
        Self::from_device(device)
    }

    /// Use the output device whose name matches `name`
    pub fn with_device_name(name: &str) -> EngineResult<Self> {
        let host = cpal::default_host();
        let device = host
            .output_devices()
            .map_err(|e| EngineError::device(e.to_string()))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| EngineError::device(format!("output device not found: {name}")))?;
        Self::from_device(device)
    }

    fn from_device(device: Device) -> EngineResult<Self> {
        let device_name = device
            .name()
            .map_err(|e| EngineError::device(e.to_string()))?;
        info!("Using output device: {}", device_name);

        Ok(Self {
            device: Some(device),
            device_name,
        })
    }

    /// Names of all output devices on the default host
    pub fn output_device_names() -> EngineResult<Vec<String>> {
        let host = cpal::default_host();
        let devices = host
            .output_devices()
            .map_err(|e| EngineError::device(e.to_string()))?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }
}

impl AudioBackend for CpalBackend {
    fn name(&self) -> &str {
        &self.device_name
    }

    fn open(
        &mut self,
        params: &StreamParams,
        mut callback: RenderCallback,
        events: Sender<Event>,
    ) -> EngineResult<Box<dyn BackendStream>> {
        params.validate().map_err(EngineError::Config)?;

        let device = self
            .device
            .as_ref()
            .ok_or_else(|| EngineError::device("backend already terminated"))?;

        let config = CpalStreamConfig {
            channels: params.channels,
            sample_rate: cpal::SampleRate(params.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(params.frames_per_buffer),
        };
        debug!("Stream config: {:?}", config);

        let state = Arc::new(PlaybackState::default());
        let data_state = Arc::clone(&state);
        let err_state = Arc::clone(&state);

        let channels = params.channels as usize;
        let depth = params.bit_depth;
        // Pre-allocated so a normal-sized buffer never allocates in the callback
        let mut scratch: Vec<i32> = Vec::with_capacity(params.samples_per_buffer());

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    // Real-time audio callback - no logging, no blocking
                    if data_state.finished.load(Ordering::Acquire) {
                        data.fill(0.0);
                        return;
                    }

                    let flow = callback(data.len() / channels, &mut scratch);

                    let written = scratch.len().min(data.len());
                    for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
                        *dst = depth.to_f32(src);
                    }
                    data[written..].fill(0.0);

                    if flow == StreamFlow::Complete {
                        data_state.finished.store(true, Ordering::Release);
                    }
                },
                move |err| {
                    *err_state.error.lock() = Some(err.to_string());
                    let _ = events.try_send(Event::backend_error(err));
                },
                None,
            )
            .map_err(|e| EngineError::device(format!("failed to build output stream: {e}")))?;

        Ok(Box::new(CpalStream {
            stream: Some(stream),
            state,
            started: false,
        }))
    }

    fn terminate(&mut self) {
        if self.device.take().is_some() {
            debug!("Released output device {}", self.device_name);
        }
    }
}

/// A live cpal output stream
struct CpalStream {
    stream: Option<Stream>,
    state: Arc<PlaybackState>,
    started: bool,
}

impl BackendStream for CpalStream {
    fn start(&mut self) -> EngineResult<()> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| EngineError::device("stream already closed"))?;
        stream
            .play()
            .map_err(|e| EngineError::device(format!("failed to start stream: {e}")))?;
        self.started = true;
        Ok(())
    }

    fn is_active(&self) -> EngineResult<bool> {
        if let Some(message) = self.state.error.lock().clone() {
            return Err(EngineError::Device(message));
        }
        Ok(self.started && self.stream.is_some() && !self.state.finished.load(Ordering::Acquire))
    }

    fn stop(&mut self) -> EngineResult<()> {
        self.started = false;
        if let Some(stream) = &self.stream {
            stream
                .pause()
                .map_err(|e| EngineError::device(format!("failed to stop stream: {e}")))?;
        }
        Ok(())
    }

    fn close(&mut self) {
        // Dropping the cpal stream releases it
        self.stream = None;
    }
}
