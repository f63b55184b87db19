//! Shared types for stream recording - live events and recording reports.

use serde::{Deserialize, Serialize};

use querystream_core::splitter::SplitWarning;
use querystream_core::{ChunkType, LogicalChunk};

/// One decoded event from the provider stream. Never persisted directly.
pub type RawProviderEvent = serde_json::Value;

// ============================================================================
// Recording Report
// ============================================================================

/// A fragment that could not be stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentFailure {
    pub chunk_type: ChunkType,
    pub sequence: u32,
    pub fragment_index: u32,
    pub error: String,
}

/// Outcome of recording one message stream.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingReport {
    pub message_id: String,
    pub chunks_classified: usize,
    pub events_skipped: usize,
    pub fragments_stored: usize,
    pub fragment_failures: Vec<FragmentFailure>,
    pub split_warnings: Vec<SplitWarning>,
    /// Chunk types in sequence order.
    pub chunk_types: Vec<ChunkType>,
}

impl RecordingReport {
    pub fn new(message_id: &str) -> Self {
        Self {
            message_id: message_id.to_string(),
            ..Default::default()
        }
    }

    pub fn fragments_attempted(&self) -> usize {
        self.fragments_stored + self.fragment_failures.len()
    }

    /// More than half of the attempted fragments failed to store.
    pub fn is_degraded(&self) -> bool {
        let attempted = self.fragments_attempted();
        attempted > 0 && self.fragment_failures.len() * 2 > attempted
    }
}

/// What happened to one classified event.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedChunk {
    pub chunk: LogicalChunk,
    pub fragment_count: usize,
    pub fragments_stored: usize,
}

impl RecordedChunk {
    pub fn fully_stored(&self) -> bool {
        self.fragment_count > 0 && self.fragments_stored == self.fragment_count
    }
}

// ============================================================================
// Stream Events
// ============================================================================

/// Events emitted to the live consumer of a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StreamEvent {
    /// Sent first.
    #[serde(rename_all = "camelCase")]
    Started { message_id: String },

    /// A classified chunk, sent after its fragments were handed to the store.
    #[serde(rename_all = "camelCase")]
    Chunk {
        message_id: String,
        chunk: LogicalChunk,
        fragment_count: usize,
        stored: bool,
    },

    /// The provider stream failed.
    #[serde(rename_all = "camelCase")]
    Error {
        message_id: String,
        code: String,
        message: String,
    },

    /// Terminal event.
    #[serde(rename_all = "camelCase")]
    Done {
        message_id: String,
        report: RecordingReport,
    },
}

impl StreamEvent {
    pub fn started(message_id: &str) -> Self {
        Self::Started {
            message_id: message_id.to_string(),
        }
    }

    pub fn chunk(message_id: &str, recorded: RecordedChunk) -> Self {
        let stored = recorded.fully_stored();
        Self::Chunk {
            message_id: message_id.to_string(),
            chunk: recorded.chunk,
            fragment_count: recorded.fragment_count,
            stored,
        }
    }

    pub fn error(message_id: &str, code: &str, message: &str) -> Self {
        Self::Error {
            message_id: message_id.to_string(),
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    pub fn done(message_id: &str, report: RecordingReport) -> Self {
        Self::Done {
            message_id: message_id.to_string(),
            report,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(index: u32) -> FragmentFailure {
        FragmentFailure {
            chunk_type: ChunkType::Data,
            sequence: 1,
            fragment_index: index,
            error: "disk full".to_string(),
        }
    }

    #[test]
    fn test_degraded_when_most_fragments_fail() {
        let mut report = RecordingReport::new("m");
        assert!(!report.is_degraded());

        report.fragments_stored = 1;
        report.fragment_failures = vec![failure(1)];
        assert!(!report.is_degraded());

        report.fragment_failures.push(failure(2));
        assert!(report.is_degraded());
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = StreamEvent::error("m", "PROVIDER_ERROR", "boom");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["messageId"], "m");
        assert_eq!(json["code"], "PROVIDER_ERROR");

        let done = StreamEvent::done("m", RecordingReport::new("m"));
        assert!(done.is_terminal());
        assert_eq!(serde_json::to_value(&done).unwrap()["report"]["eventsSkipped"], 0);
    }
}
