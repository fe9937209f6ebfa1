//! Audio Backend Abstraction
//!
//! The controller drives any backend through these two traits. A backend
//! owns the device; each opened stream owns the callback and calls it on the
//! backend's own thread until the callback reports completion or the stream
//! is stopped.

use crossbeam_channel::Sender;

use crate::config::StreamParams;
use crate::error::EngineResult;
use crate::message::Event;
use crate::stream::RenderCallback;

/// A playback device handle
pub trait AudioBackend {
    /// Human-readable name for logs
    fn name(&self) -> &str;

    /// Open a stream bound to `callback`. Backend failures surface as
    /// [`EngineError::Device`](crate::EngineError::Device); stream failures
    /// after opening are reported through `events` and [`BackendStream::is_active`].
    fn open(
        &mut self,
        params: &StreamParams,
        callback: RenderCallback,
        events: Sender<Event>,
    ) -> EngineResult<Box<dyn BackendStream>>;

    /// Release the device. Safe to call more than once.
    fn terminate(&mut self);
}

/// An opened playback stream
pub trait BackendStream {
    fn start(&mut self) -> EngineResult<()>;

    /// `Ok(false)` once playback ended; `Err` if the backend reported a failure
    fn is_active(&self) -> EngineResult<bool>;

    fn stop(&mut self) -> EngineResult<()>;

    /// Release the stream. Safe to call more than once.
    fn close(&mut self);
}
