//! Stream Controller
//!
//! Lives on the controlling thread and owns the session's lifecycle:
//!
//! ```text
//!   Idle ──start_stream()──▶ Streaming ──stop_stream()──▶ Stopped
//!    │                                                      ▲
//!    └──────────────────stop_stream()───────────────────────┘
//! ```
//!
//! `Stopped` is terminal; a new session needs a new controller. While
//! streaming, [`StreamController::streaming`] polls the backend at a coarse
//! interval, drains diagnostic events from the audio side and watches the
//! interrupt flag. Teardown runs on every exit from that loop.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use heron_dsp::{Equalizer, EqualizerSettings};
use tracing::{debug, error, info, warn};

use crate::backend::{AudioBackend, BackendStream};
use crate::error::{EngineError, EngineResult};
use crate::message::{event_channel, Event};
use crate::queue::FrameQueue;
use crate::settings::SessionSettings;
use crate::source::{LoadedSource, SourceBuffer};
use crate::stream::StreamProcessor;
use crate::writer::{RecordingSpec, RecordingWriter};

/// Default interval between liveness polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Lifecycle state of a [`StreamController`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Streaming,
    Stopped,
}

impl StreamState {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamState::Idle => "idle",
            StreamState::Streaming => "streaming",
            StreamState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a streaming session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Playback ran to the end of the source
    Completed,
    /// The interrupt flag was raised
    Interrupted,
    /// The callback or the backend failed; the queue still holds what was rendered
    Failed(String),
}

impl StreamOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, StreamOutcome::Completed)
    }
}

/// Drives one streaming session from the controlling thread
pub struct StreamController {
    backend: Box<dyn AudioBackend>,
    stream: Option<Box<dyn BackendStream>>,
    source: LoadedSource,
    session: Arc<SessionSettings>,
    equalizer_settings: Arc<EqualizerSettings>,
    queue: Arc<FrameQueue>,
    event_sender: Sender<Event>,
    event_receiver: Receiver<Event>,
    interrupt: Arc<AtomicBool>,
    poll_interval: Duration,
    state: StreamState,
    backend_released: bool,
}

impl StreamController {
    /// Bind a loaded source to a session.
    ///
    /// Fails with a configuration error if the source's sample rate, channel
    /// count or bit depth disagree with the session.
    pub fn new(
        backend: Box<dyn AudioBackend>,
        source: LoadedSource,
        session: Arc<SessionSettings>,
        equalizer_settings: Arc<EqualizerSettings>,
        queue: Arc<FrameQueue>,
    ) -> EngineResult<Self> {
        check_source_matches(&source, &session)?;
        let (event_sender, event_receiver) = event_channel();

        Ok(Self {
            backend,
            stream: None,
            source,
            session,
            equalizer_settings,
            queue,
            event_sender,
            event_receiver,
            interrupt: Arc::new(AtomicBool::new(false)),
            poll_interval: DEFAULT_POLL_INTERVAL,
            state: StreamState::Idle,
            backend_released: false,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Share an interrupt flag created elsewhere, e.g. by a signal handler
    /// installed before the controller existed
    pub fn with_interrupt(mut self, interrupt: Arc<AtomicBool>) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Flag any thread can raise to request teardown
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    pub fn queue(&self) -> &Arc<FrameQueue> {
        &self.queue
    }

    pub fn session(&self) -> &Arc<SessionSettings> {
        &self.session
    }

    pub fn equalizer_settings(&self) -> &Arc<EqualizerSettings> {
        &self.equalizer_settings
    }

    /// Open and start the backend stream.
    ///
    /// On a device failure the controller stays `Idle` and no callback has
    /// run.
    pub fn start_stream(&mut self) -> EngineResult<()> {
        if self.state != StreamState::Idle {
            return Err(EngineError::InvalidState {
                operation: "start",
                state: self.state.as_str(),
            });
        }
        check_source_matches(&self.source, &self.session)?;

        let params = self.session.stream_params();
        params.validate().map_err(EngineError::Config)?;

        let equalizer = Equalizer::new(
            Arc::clone(&self.equalizer_settings),
            params.channels as usize,
            params.bit_depth,
        )?;
        let processor = StreamProcessor::new(
            SourceBuffer::new(self.source.samples.clone()),
            equalizer,
            Arc::clone(&self.session),
            Arc::clone(&self.queue),
            self.event_sender.clone(),
        );

        info!(
            "Opening {} stream: {} Hz, {} ch, {}-bit, {} frames/buffer ({:.1} ms)",
            self.backend.name(),
            params.sample_rate,
            params.channels,
            params.bit_depth.bits(),
            params.frames_per_buffer,
            params.latency_ms()
        );

        let mut stream = self.backend.open(
            &params,
            processor.into_render_callback(),
            self.event_sender.clone(),
        )?;

        if let Err(e) = stream.start() {
            error!("Failed to start stream: {}", e);
            stream.close();
            return Err(match e {
                EngineError::Device(_) => e,
                other => EngineError::device(other.to_string()),
            });
        }

        self.stream = Some(stream);
        self.state = StreamState::Streaming;
        info!("Streaming started");
        Ok(())
    }

    /// Poll until playback ends, fails or is interrupted, then tear down.
    pub fn streaming(&mut self) -> StreamOutcome {
        let outcome = self.poll_stream();

        match &outcome {
            StreamOutcome::Completed => info!("Playback completed"),
            StreamOutcome::Interrupted => info!("Interrupted, stopping stream"),
            StreamOutcome::Failed(reason) => error!("Streaming failed: {}", reason),
        }

        if let Err(e) = self.stop_stream() {
            error!("Error during stream teardown: {}", e);
        }
        outcome
    }

    fn poll_stream(&mut self) -> StreamOutcome {
        if self.state != StreamState::Streaming {
            return StreamOutcome::Failed(
                EngineError::InvalidState {
                    operation: "poll",
                    state: self.state.as_str(),
                }
                .to_string(),
            );
        }

        let mut failure: Option<String> = None;
        loop {
            if self.interrupt.load(Ordering::Acquire) {
                return StreamOutcome::Interrupted;
            }

            self.drain_events(&mut failure);
            if let Some(reason) = failure.take() {
                return StreamOutcome::Failed(reason);
            }

            let active = match &self.stream {
                Some(stream) => stream.is_active(),
                None => return StreamOutcome::Failed("stream handle missing".into()),
            };

            match active {
                Ok(true) => thread::sleep(self.poll_interval),
                Ok(false) => {
                    // Pick up anything sent just before the stream went quiet
                    self.drain_events(&mut failure);
                    return match failure {
                        Some(reason) => StreamOutcome::Failed(reason),
                        None => StreamOutcome::Completed,
                    };
                }
                Err(e) => return StreamOutcome::Failed(e.to_string()),
            }
        }
    }

    fn drain_events(&self, failure: &mut Option<String>) {
        for event in self.event_receiver.try_iter() {
            match event {
                Event::EndOfSource { samples } => {
                    debug!("End of source reached after {} samples", samples);
                }
                Event::CallbackFailed { message } => {
                    error!("Audio callback failed: {}", message);
                    failure.get_or_insert(message);
                }
                Event::BackendError { message } => {
                    error!("Backend error: {}", message);
                    failure.get_or_insert(message);
                }
            }
        }
    }

    /// Stop and release the stream, then release the backend.
    ///
    /// Safe to call from any state and more than once. Cleanup always runs
    /// to the end; the first error hit along the way is returned.
    pub fn stop_stream(&mut self) -> EngineResult<()> {
        let mut result = Ok(());

        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.stop() {
                warn!("Failed to stop stream cleanly: {}", e);
                result = Err(e);
            }
            stream.close();
            debug!("Stream closed");
        }

        if !self.backend_released {
            self.backend.terminate();
            self.backend_released = true;
            debug!("{} backend released", self.backend.name());
        }

        if self.state != StreamState::Stopped {
            info!(
                "Stream stopped ({} samples queued)",
                self.queue.sample_count()
            );
        }
        self.state = StreamState::Stopped;
        result
    }

    /// Drain the queue and write it to the session's output path.
    ///
    /// Only valid once stopped, so the recording is complete and ordered.
    pub fn save_recording(&self, writer: &dyn RecordingWriter) -> EngineResult<PathBuf> {
        if self.state != StreamState::Stopped {
            return Err(EngineError::InvalidState {
                operation: "save recording",
                state: self.state.as_str(),
            });
        }

        let snapshot = self.session.snapshot();
        let path = snapshot.full_path();
        let samples = self.queue.drain_concatenated();
        if samples.is_empty() {
            warn!("Nothing was recorded, writing an empty file");
        }

        writer.write(
            &path,
            &samples,
            RecordingSpec {
                sample_rate: snapshot.sampling_rate,
                channels: snapshot.channels,
                bit_depth: snapshot.bit_depth,
            },
        )?;
        Ok(path)
    }
}

impl Drop for StreamController {
    fn drop(&mut self) {
        if let Err(e) = self.stop_stream() {
            warn!("Error stopping stream on drop: {}", e);
        }
    }
}

fn check_source_matches(source: &LoadedSource, session: &SessionSettings) -> EngineResult<()> {
    let snapshot = session.snapshot();

    if source.sample_rate != snapshot.sampling_rate {
        return Err(EngineError::config(format!(
            "source sample rate {} Hz does not match session rate {} Hz",
            source.sample_rate, snapshot.sampling_rate
        )));
    }
    if source.channels != snapshot.channels {
        return Err(EngineError::config(format!(
            "source has {} channels, session expects {}",
            source.channels, snapshot.channels
        )));
    }
    if source.bit_depth != snapshot.bit_depth {
        return Err(EngineError::config(format!(
            "source is {}-bit, session expects {}-bit",
            source.bit_depth.bits(),
            snapshot.bit_depth.bits()
        )));
    }
    Ok(())
}
