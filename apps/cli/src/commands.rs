//! Operations behind the CLI subcommands.

use std::path::Path;

use anyhow::{anyhow, Context};
use futures::{stream, StreamExt};
use serde_json::{json, Value};

use querystream_ai::{RawProviderEvent, RecordingReport, StreamError, StreamEvent};
use querystream_core::reconstruction::{
    ConversationReconstruction, FragmentSummary, MessageReconstructorTrait, ReconstructionError,
};
use querystream_core::ChunkStoreTrait;

use crate::main_lib::AppState;

/// Parse an NDJSON capture. Blank lines are ignored, malformed lines are
/// logged and skipped.
pub fn parse_events(content: &str) -> Vec<RawProviderEvent> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(index, line)| match serde_json::from_str::<Value>(line) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!("Skipping malformed event on line {}: {}", index + 1, e);
                None
            }
        })
        .collect()
}

pub fn read_events(path: &Path) -> anyhow::Result<Vec<RawProviderEvent>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(parse_events(&content))
}

/// Replay `events` through the stream service and return the final report.
pub async fn record(
    state: &AppState,
    message_id: &str,
    events: Vec<RawProviderEvent>,
) -> anyhow::Result<RecordingReport> {
    let provider = stream::iter(events.into_iter().map(Ok::<_, StreamError>));
    let mut live = state.stream_service.start(message_id, provider);

    let mut report = None;
    while let Some(event) = live.next().await {
        match event {
            StreamEvent::Started { .. } => {
                tracing::info!("Recording message {}", message_id);
            }
            StreamEvent::Chunk {
                chunk,
                fragment_count,
                stored,
                ..
            } => {
                tracing::info!(
                    "#{} {} -> {} fragment(s){}",
                    chunk.sequence,
                    chunk.chunk_type(),
                    fragment_count,
                    if stored { "" } else { " (not fully stored)" }
                );
            }
            StreamEvent::Error { code, message, .. } => {
                tracing::error!("Stream error {}: {}", code, message);
            }
            StreamEvent::Done { report: done, .. } => report = Some(done),
        }
    }

    report.ok_or_else(|| anyhow!("Stream for message {} ended without a report", message_id))
}

/// Reconstructed message JSON, or a fallback notice when nothing could be
/// merged.
pub fn show(state: &AppState, message_id: &str) -> anyhow::Result<Value> {
    match state.reconstructor.reconstruct(message_id) {
        Ok(message) => {
            let unavailable = message.unavailable_types();
            if !unavailable.is_empty() {
                tracing::warn!(
                    "Message {} is partially available, missing: {:?}",
                    message_id,
                    unavailable
                );
            }
            Ok(json!({
                "messageId": message.message_id,
                "chunks": message.presented_chunks(),
                "summary": message.summary,
                "issues": message.issues,
            }))
        }
        Err(e @ ReconstructionError::NotFound { .. }) | Err(e @ ReconstructionError::Empty { .. }) => {
            Ok(json!({
                "messageId": message_id,
                "available": false,
                "notice": format!("Unable to load message data: {}", e),
            }))
        }
        Err(e) => Err(anyhow!(e)),
    }
}

pub fn summary(state: &AppState, message_id: &str) -> anyhow::Result<FragmentSummary> {
    Ok(state.reconstructor.fragment_summary(message_id)?)
}

/// Every stored message, oldest id first.
pub fn history(state: &AppState) -> anyhow::Result<ConversationReconstruction> {
    let message_ids = state.repository.list_message_ids()?;
    Ok(state.reconstructor.reconstruct_many(&message_ids))
}

pub fn list(state: &AppState) -> anyhow::Result<Vec<String>> {
    Ok(state.repository.list_message_ids()?)
}

pub async fn purge(state: &AppState, message_id: &str) -> anyhow::Result<usize> {
    Ok(state.repository.delete_all(message_id).await?)
}
