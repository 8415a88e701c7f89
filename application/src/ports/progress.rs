//! Progress sink port
//!
//! Defines the interface for reporting progress during solve and debate
//! execution. A CLI prints events directly; a server could serialize
//! them as Server-Sent-Events. The core has no knowledge of wire
//! framing — it only invokes the sink synchronously with each event.

use scholar_domain::StreamEvent;

/// Callback for progress updates during solve/debate execution
pub trait ProgressSink: Send + Sync {
    /// Called synchronously with each outbound event, in order.
    fn on_event(&self, event: &StreamEvent);
}

/// No-op progress sink for when progress reporting is not needed
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_event(&self, _event: &StreamEvent) {}
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Records every event it receives, for assertions.
    pub struct RecordingSink {
        pub events: Mutex<Vec<StreamEvent>>,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
            }
        }

        pub fn events(&self) -> Vec<StreamEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl ProgressSink for RecordingSink {
        fn on_event(&self, event: &StreamEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }
}
