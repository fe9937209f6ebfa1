//! Recording Accumulation Queue
//!
//! The audio callback appends a copy of every processed frame; the controller
//! drains the queue once the stream has stopped and concatenates the frames
//! in the order they were produced.

use parking_lot::Mutex;

/// Ordered, unbounded, mutex-guarded list of processed frames
#[derive(Debug, Default)]
pub struct FrameQueue {
    frames: Mutex<Vec<Vec<i32>>>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one frame. Holds the lock only for the push.
    pub fn push(&self, frame: Vec<i32>) {
        self.frames.lock().push(frame);
    }

    /// Number of frames queued
    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }

    /// Total samples across all queued frames
    pub fn sample_count(&self) -> usize {
        self.frames.lock().iter().map(Vec::len).sum()
    }

    /// Flat copy of everything queued so far, leaving the queue intact
    pub fn concatenated(&self) -> Vec<i32> {
        self.frames.lock().concat()
    }

    /// Take every queued frame and return them joined in production order.
    ///
    /// Safe while a producer is still running, but only a drain after the
    /// stream stopped is guaranteed to hold the whole recording.
    pub fn drain_concatenated(&self) -> Vec<i32> {
        let frames = std::mem::take(&mut *self.frames.lock());
        frames.concat()
    }

    pub fn clear(&self) {
        self.frames.lock().clear();
    }
}
