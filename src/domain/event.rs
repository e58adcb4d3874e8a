use serde::{Serialize, Serializer};
use std::fmt;

/// Maximum payload length in bytes. Longer payloads are clipped, never rejected.
pub const MAX_PAYLOAD_LEN: usize = 256;

/// Kind tag carried by every status event.
///
/// The wire identifier of each kind is fixed; downstream consumers match on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    FileCreated,
    FileModified,
    FileDeleted,
    Message,
    ProgressUpdated,
    ConvergenceUpdated,
    WorkerStarted,
    WorkerStopped,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::FileCreated,
        EventKind::FileModified,
        EventKind::FileDeleted,
        EventKind::Message,
        EventKind::ProgressUpdated,
        EventKind::ConvergenceUpdated,
        EventKind::WorkerStarted,
        EventKind::WorkerStopped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::FileCreated => "FILE_CREATED",
            EventKind::FileModified => "FILE_MODIFIED",
            EventKind::FileDeleted => "FILE_DELETED",
            EventKind::Message => "MESSAGE",
            EventKind::ProgressUpdated => "PROGRESS_UPDATED",
            EventKind::ConvergenceUpdated => "CONVERGENCE_UPDATED",
            EventKind::WorkerStarted => "WORKER_STARTED",
            EventKind::WorkerStopped => "WORKER_STOPPED",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A single status update: an immutable `(kind, payload)` pair.
///
/// Serializes as `{"type":"<KIND>","message":"<payload>"}`. The payload is
/// escaped by `serde_json`, so quotes and control characters in user text
/// cannot break the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    #[serde(rename = "type")]
    kind: EventKind,
    #[serde(rename = "message")]
    payload: String,
}

impl Event {
    pub fn new(kind: EventKind, payload: impl Into<String>) -> Self {
        let mut payload = payload.into();
        truncate_on_char_boundary(&mut payload, MAX_PAYLOAD_LEN);
        Self { kind, payload }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn to_json(&self) -> String {
        // Serializing a struct of two strings cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn truncate_on_char_boundary(text: &mut String, max_len: usize) {
    if text.len() <= max_len {
        return;
    }
    let mut cut = max_len;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
}
