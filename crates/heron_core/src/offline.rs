//! Offline Backend
//!
//! Drives the render callback from a plain worker thread, block by block,
//! without any audio hardware. Used for rendering a session straight to a
//! file and for exercising the controller in tests. Pacing can be switched
//! on to call back at the cadence a real device would. Rendered blocks are
//! dropped unless capture is switched on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::backend::{AudioBackend, BackendStream};
use crate::config::StreamParams;
use crate::error::{EngineError, EngineResult};
use crate::message::Event;
use crate::stream::{RenderCallback, StreamFlow};

/// Backend that renders without a device
#[derive(Debug, Clone, Default)]
pub struct OfflineBackend {
    realtime: bool,
    fail_open: Option<String>,
    played: Option<Arc<Mutex<Vec<i32>>>>,
    terminated: Arc<AtomicBool>,
}

impl OfflineBackend {
    /// Render as fast as possible
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep one buffer duration between callbacks, like a real device
    pub fn realtime() -> Self {
        Self {
            realtime: true,
            ..Self::default()
        }
    }

    /// A backend whose `open` always fails with a device error
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_open: Some(message.into()),
            ..Self::default()
        }
    }

    /// Keep a copy of every rendered block, readable through [`played`](Self::played)
    pub fn with_capture(mut self) -> Self {
        self.played.get_or_insert_with(Default::default);
        self
    }

    /// Handle to everything "played" so far, in order; `None` without capture
    pub fn played(&self) -> Option<Arc<Mutex<Vec<i32>>>> {
        self.played.clone()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Shared flag that flips once [`terminate`](AudioBackend::terminate) ran
    pub fn terminated_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.terminated)
    }
}

impl AudioBackend for OfflineBackend {
    fn name(&self) -> &str {
        "offline"
    }

    fn open(
        &mut self,
        params: &StreamParams,
        callback: RenderCallback,
        _events: Sender<Event>,
    ) -> EngineResult<Box<dyn BackendStream>> {
        if let Some(message) = &self.fail_open {
            return Err(EngineError::device(message.clone()));
        }
        if self.is_terminated() {
            return Err(EngineError::device("backend already terminated"));
        }
        params.validate().map_err(EngineError::Config)?;

        let block_time = if self.realtime {
            Some(Duration::from_secs_f64(
                params.frames_per_buffer as f64 / params.sample_rate as f64,
            ))
        } else {
            None
        };

        Ok(Box::new(OfflineStream {
            callback: Some(callback),
            frames_per_buffer: params.frames_per_buffer as usize,
            block_time,
            played: self.played.clone(),
            active: Arc::new(AtomicBool::new(false)),
            stop_flag: Arc::new(AtomicBool::new(false)),
            worker: None,
        }))
    }

    fn terminate(&mut self) {
        self.terminated.store(true, Ordering::Release);
    }
}

/// Clears the active flag when the render thread exits, panics included
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct OfflineStream {
    callback: Option<RenderCallback>,
    frames_per_buffer: usize,
    block_time: Option<Duration>,
    played: Option<Arc<Mutex<Vec<i32>>>>,
    active: Arc<AtomicBool>,
    stop_flag: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl OfflineStream {
    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Offline render thread panicked");
            }
        }
    }
}

impl BackendStream for OfflineStream {
    fn start(&mut self) -> EngineResult<()> {
        let mut callback = self
            .callback
            .take()
            .ok_or_else(|| EngineError::device("offline stream already started"))?;

        let frames = self.frames_per_buffer;
        let block_time = self.block_time;
        let played = self.played.clone();
        let active = Arc::clone(&self.active);
        let stop_flag = Arc::clone(&self.stop_flag);

        active.store(true, Ordering::Release);
        let worker = thread::Builder::new()
            .name("heron-offline".into())
            .spawn(move || {
                let _active = ActiveGuard(active);
                let mut buffer = Vec::with_capacity(frames);
                while !stop_flag.load(Ordering::Acquire) {
                    let flow = callback(frames, &mut buffer);
                    if let Some(played) = &played {
                        played.lock().extend_from_slice(&buffer);
                    }
                    if flow == StreamFlow::Complete {
                        break;
                    }
                    if let Some(block_time) = block_time {
                        thread::sleep(block_time);
                    }
                }
            })
            .map_err(|e| {
                self.active.store(false, Ordering::Release);
                EngineError::device(format!("failed to spawn render thread: {e}"))
            })?;

        self.worker = Some(worker);
        debug!("Offline stream started");
        Ok(())
    }

    fn is_active(&self) -> EngineResult<bool> {
        Ok(self.active.load(Ordering::Acquire))
    }

    fn stop(&mut self) -> EngineResult<()> {
        self.stop_flag.store(true, Ordering::Release);
        self.join_worker();
        self.active.store(false, Ordering::Release);
        Ok(())
    }

    fn close(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
        self.join_worker();
        self.callback = None;
    }
}

impl Drop for OfflineStream {
    fn drop(&mut self) {
        self.close();
    }
}
