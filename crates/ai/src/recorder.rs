//! Per-message stream recorder: classify, split, append.

use log::{debug, error, warn};
use std::sync::Arc;

use querystream_core::{ChunkSizeSplitter, ChunkStoreTrait, NewFragment};

use crate::classifier::{MessageStreamClassifier, SequenceCursor};
use crate::types::{FragmentFailure, RawProviderEvent, RecordedChunk, RecordingReport};

/// Owns the sequence cursor of one message and persists every classified
/// chunk as soon as it is seen.
pub struct StreamRecorder {
    message_id: String,
    store: Arc<dyn ChunkStoreTrait>,
    classifier: MessageStreamClassifier,
    splitter: ChunkSizeSplitter,
    cursor: SequenceCursor,
    report: RecordingReport,
}

impl StreamRecorder {
    pub fn new(
        message_id: &str,
        store: Arc<dyn ChunkStoreTrait>,
        classifier: MessageStreamClassifier,
        splitter: ChunkSizeSplitter,
    ) -> Self {
        Self {
            message_id: message_id.to_string(),
            store,
            classifier,
            splitter,
            cursor: SequenceCursor::new(),
            report: RecordingReport::new(message_id),
        }
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Record one provider event. Returns `None` when the event was skipped.
    ///
    /// Fragments are appended in index order; a failed append is logged and
    /// reported, and the remaining fragments are still attempted.
    pub async fn record(&mut self, event: &RawProviderEvent) -> Option<RecordedChunk> {
        let Some(chunk) = self
            .classifier
            .classify(&self.message_id, event, &mut self.cursor)
        else {
            self.report.events_skipped += 1;
            return None;
        };

        let chunk_type = chunk.chunk_type();
        self.report.chunks_classified += 1;
        self.report.chunk_types.push(chunk_type);

        let outcome = match self.splitter.split_chunk(&chunk) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    "Failed to encode {} chunk #{} of message {}: {}",
                    chunk_type, chunk.sequence, self.message_id, e
                );
                self.report.fragment_failures.push(FragmentFailure {
                    chunk_type,
                    sequence: chunk.sequence,
                    fragment_index: 0,
                    error: e.to_string(),
                });
                return Some(RecordedChunk {
                    chunk,
                    fragment_count: 0,
                    fragments_stored: 0,
                });
            }
        };

        for warning in &outcome.warnings {
            warn!(
                "{} chunk #{} of message {}: {}",
                chunk_type, chunk.sequence, self.message_id, warning
            );
        }
        self.report
            .split_warnings
            .extend(outcome.warnings.iter().cloned());

        let fragment_count = outcome.fragment_count();
        if outcome.is_split() {
            debug!(
                "Split {} chunk #{} of message {} into {} fragments",
                chunk_type, chunk.sequence, self.message_id, fragment_count
            );
        }

        let mut fragments_stored = 0;
        for slice in outcome.fragments {
            let fragment_index = slice.fragment_index;
            let fragment = NewFragment {
                message_id: self.message_id.clone(),
                chunk_type,
                sequence: chunk.sequence,
                fragment_index,
                fragment_count: slice.fragment_count,
                payload: slice.payload,
            };

            match self.store.append(fragment).await {
                Ok(_) => {
                    fragments_stored += 1;
                    self.report.fragments_stored += 1;
                }
                Err(e) => {
                    error!(
                        "Failed to store fragment {}/{} of {} chunk #{} for message {}: {}",
                        fragment_index + 1,
                        fragment_count,
                        chunk_type,
                        chunk.sequence,
                        self.message_id,
                        e
                    );
                    self.report.fragment_failures.push(FragmentFailure {
                        chunk_type,
                        sequence: chunk.sequence,
                        fragment_index,
                        error: e.to_string(),
                    });
                }
            }
        }

        Some(RecordedChunk {
            chunk,
            fragment_count,
            fragments_stored,
        })
    }

    pub fn report(&self) -> &RecordingReport {
        &self.report
    }

    /// Consume the recorder and hand back its report.
    pub fn finish(self) -> RecordingReport {
        if self.report.is_degraded() {
            warn!(
                "Message {} recorded in degraded state: {} of {} fragments failed",
                self.message_id,
                self.report.fragment_failures.len(),
                self.report.fragments_attempted()
            );
        }
        self.report
    }
}
