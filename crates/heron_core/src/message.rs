//! Diagnostic Events
//!
//! Events flow from the audio callback and the backend to the controller
//! thread, which drains and logs them while it polls the stream. The
//! callback side only ever uses `try_send`, so a full channel drops the
//! event instead of blocking the audio thread.

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

/// Capacity of the event channel
pub const EVENT_CAPACITY: usize = 64;

/// Events sent from the audio side to the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    /// The cursor reached the end of the source buffer
    EndOfSource { samples: usize },

    /// Processing inside the callback failed; the stream was completed
    CallbackFailed { message: String },

    /// The backend reported a stream failure
    BackendError { message: String },
}

impl Event {
    /// Create a callback failure event from any error type
    pub fn callback_failed<E: std::fmt::Display>(err: E) -> Self {
        Event::CallbackFailed {
            message: err.to_string(),
        }
    }

    /// Create a backend error event from any error type
    pub fn backend_error<E: std::fmt::Display>(err: E) -> Self {
        Event::BackendError {
            message: err.to_string(),
        }
    }

    /// Whether this event means the session did not finish cleanly
    pub fn is_failure(&self) -> bool {
        !matches!(self, Event::EndOfSource { .. })
    }
}

/// Bounded event channel sized for the audio side
pub fn event_channel() -> (Sender<Event>, Receiver<Event>) {
    bounded(EVENT_CAPACITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = Event::EndOfSource { samples: 1000 };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("EndOfSource"));

        let deserialized: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[test]
    fn test_failure_events() {
        let event = Event::callback_failed("bad band");
        assert!(event.is_failure());
        if let Event::CallbackFailed { message } = event {
            assert_eq!(message, "bad band");
        } else {
            panic!("Should be CallbackFailed variant");
        }

        assert!(Event::backend_error("gone").is_failure());
        assert!(!Event::EndOfSource { samples: 0 }.is_failure());
    }

    #[test]
    fn test_channel_never_blocks_when_full() {
        let (tx, rx) = event_channel();
        for _ in 0..EVENT_CAPACITY {
            tx.try_send(Event::EndOfSource { samples: 0 }).unwrap();
        }
        assert!(tx.try_send(Event::EndOfSource { samples: 0 }).is_err());
        assert_eq!(rx.len(), EVENT_CAPACITY);
    }
}
