//! Real-time Render Callback
//!
//! [`StreamProcessor`] is the state the backend's audio thread owns while a
//! stream runs. Each call walks the source cursor forward by one buffer,
//! equalizes the slice (reading the source that follows it as look-ahead for
//! the zero-phase filters), queues a copy for recording and hands the
//! processed samples back for playback.
//!
//! # Real-time Safety
//!
//! The only blocking points are the equalizer settings lock, the session
//! settings lock and the frame queue lock, each held for an in-memory copy
//! or push. No logging, no I/O, no sleeping: diagnostics go out through a
//! bounded channel with `try_send`.

use std::sync::Arc;

use crossbeam_channel::Sender;
use heron_dsp::Equalizer;

use crate::message::Event;
use crate::queue::FrameQueue;
use crate::settings::SessionSettings;
use crate::source::SourceBuffer;

/// What the backend should do after a callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFlow {
    /// More data will follow
    Continue,
    /// This was the last buffer (end of source or a processing failure)
    Complete,
}

/// Backend-facing callback: fill `out` with up to `frame_count` interleaved frames
pub type RenderCallback = Box<dyn FnMut(usize, &mut Vec<i32>) -> StreamFlow + Send + 'static>;

/// Callback-side state of a stream
pub struct StreamProcessor {
    source: SourceBuffer,
    equalizer: Equalizer,
    session: Arc<SessionSettings>,
    queue: Arc<FrameQueue>,
    events: Sender<Event>,
    channels: usize,
    finished: bool,
}

impl StreamProcessor {
    pub fn new(
        source: SourceBuffer,
        equalizer: Equalizer,
        session: Arc<SessionSettings>,
        queue: Arc<FrameQueue>,
        events: Sender<Event>,
    ) -> Self {
        let channels = equalizer.channels();
        Self {
            source,
            equalizer,
            session,
            queue,
            events,
            channels,
            finished: false,
        }
    }

    /// Produce the next buffer into `out` (cleared first).
    ///
    /// Returns [`StreamFlow::Complete`] when this call reached the end of the
    /// source, when the source was already exhausted (with `out` empty), or
    /// when equalization failed (with `out` empty and a
    /// [`Event::CallbackFailed`] sent). Frames queued before a failure stay
    /// queued.
    pub fn render(&mut self, frame_count: usize, out: &mut Vec<i32>) -> StreamFlow {
        out.clear();

        if self.finished {
            return StreamFlow::Complete;
        }

        let Some(range) = self.source.next_slice(frame_count, self.channels) else {
            return self.finish(Event::EndOfSource {
                samples: self.source.len(),
            });
        };

        let sample_rate = self.session.sampling_rate();
        let ahead = self.equalizer.lookahead_frames().saturating_mul(self.channels);
        let slice = self.source.slice(range);
        let lookahead = self.source.upcoming(ahead);

        match self
            .equalizer
            .equalize_with_lookahead(slice, lookahead, sample_rate)
        {
            Ok(processed) => {
                let processed = processed.into_owned();
                out.extend_from_slice(&processed);
                self.queue.push(processed);
            }
            Err(e) => {
                return self.finish(Event::callback_failed(e));
            }
        }

        if self.source.is_exhausted() {
            return self.finish(Event::EndOfSource {
                samples: self.source.len(),
            });
        }
        StreamFlow::Continue
    }

    fn finish(&mut self, event: Event) -> StreamFlow {
        if !self.finished {
            self.finished = true;
            let _ = self.events.try_send(event);
        }
        StreamFlow::Complete
    }

    /// Samples consumed from the source so far
    pub fn cursor(&self) -> usize {
        self.source.cursor()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Box this processor as a backend callback
    pub fn into_render_callback(mut self) -> RenderCallback {
        Box::new(move |frame_count, out| self.render(frame_count, out))
    }
}
