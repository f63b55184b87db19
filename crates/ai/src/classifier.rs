//! Message stream classifier.
//!
//! Turns one provider event into at most one typed chunk. Rules are tried in
//! priority order (SQL, data, chart, insights); the first match wins.
//! Malformed or irrelevant events are skipped, never rejected.

use log::{debug, warn};
use serde_json::Value;
use std::sync::Arc;

use querystream_core::constants::{FIRST_SEQUENCE, INSIGHTS_LINE_BREAK};
use querystream_core::{
    ChartPayload, ChunkPayload, DataPayload, InsightsPayload, LogicalChunk, SqlPayload,
};

use crate::chart::ChartNormalizerTrait;
use crate::document_links::extract_document_references;
use crate::types::RawProviderEvent;
use crate::wire::{
    adapt_event, CHART_DESCRIPTION, CHART_SPEC, CHART_TITLE, GENERATED_QUERY, RESULT, TEXT_PARTS,
    TIMESTAMP,
};

/// Per-message sequence counter, owned by the stream task.
///
/// Advanced only when an event is classified, so sequences are dense over
/// chunks rather than over raw events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceCursor {
    next: u32,
    /// Set once `u32::MAX` has been handed out.
    exhausted: bool,
}

impl SequenceCursor {
    pub fn new() -> Self {
        Self {
            next: FIRST_SEQUENCE,
            exhausted: false,
        }
    }

    /// Sequence the next classified chunk will receive.
    pub fn peek(&self) -> u32 {
        self.next
    }

    /// Number of sequences handed out so far.
    pub fn assigned(&self) -> u32 {
        (self.next - FIRST_SEQUENCE).saturating_add(u32::from(self.exhausted))
    }

    /// Hand out the next sequence, or `None` once every `u32` was used.
    fn advance(&mut self) -> Option<u32> {
        if self.exhausted {
            return None;
        }
        let current = self.next;
        match self.next.checked_add(1) {
            Some(next) => self.next = next,
            None => self.exhausted = true,
        }
        Some(current)
    }
}

impl Default for SequenceCursor {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MessageStreamClassifier {
    chart_normalizer: Arc<dyn ChartNormalizerTrait>,
}

impl MessageStreamClassifier {
    pub fn new(chart_normalizer: Arc<dyn ChartNormalizerTrait>) -> Self {
        Self { chart_normalizer }
    }

    /// Classify `event`; on a match the cursor advances and the chunk gets
    /// the sequence it pointed at.
    pub fn classify(
        &self,
        message_id: &str,
        event: &RawProviderEvent,
        cursor: &mut SequenceCursor,
    ) -> Option<LogicalChunk> {
        let adapted = adapt_event(event);
        let timestamp = Self::timestamp(&adapted);

        let payload = Self::classify_sql(&adapted, &timestamp)
            .or_else(|| Self::classify_data(&adapted, &timestamp))
            .or_else(|| self.classify_chart(&adapted, &timestamp))
            .or_else(|| Self::classify_insights(&adapted, &timestamp));

        match payload {
            Some(payload) => {
                let Some(sequence) = cursor.advance() else {
                    warn!(
                        "Sequence numbers exhausted for message {}; dropping {} chunk",
                        message_id,
                        payload.chunk_type()
                    );
                    return None;
                };
                debug!(
                    "Classified {} chunk #{} for message {}",
                    payload.chunk_type(),
                    sequence,
                    message_id
                );
                Some(LogicalChunk::new(message_id, sequence, payload))
            }
            None => {
                debug!("Skipping event with no relevant payload for message {}", message_id);
                None
            }
        }
    }

    fn timestamp(adapted: &Value) -> Option<String> {
        match adapted.get(TIMESTAMP)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    fn classify_sql(adapted: &Value, timestamp: &Option<String>) -> Option<ChunkPayload> {
        let sql = adapted.get(GENERATED_QUERY)?.as_str()?;
        Some(ChunkPayload::Sql(SqlPayload {
            sql_query: sql.to_string(),
            timestamp: timestamp.clone(),
        }))
    }

    fn classify_data(adapted: &Value, timestamp: &Option<String>) -> Option<ChunkPayload> {
        let result = adapted.get(RESULT)?.as_object()?;
        let (Some(rows), Some(schema), Some(name)) =
            (result.get("rows"), result.get("schema"), result.get("name"))
        else {
            debug!("Result event is missing rows, schema or name");
            return None;
        };
        let Value::Array(rows) = rows else {
            debug!("Result rows are not an array");
            return None;
        };

        let name = match name {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let execution_time = result
            .get("execution_time")
            .and_then(Value::as_str)
            .unwrap_or("0ms")
            .to_string();

        Some(ChunkPayload::Data(DataPayload {
            rows: rows.clone(),
            schema: schema.clone(),
            name,
            execution_time,
            timestamp: timestamp.clone(),
        }))
    }

    fn classify_chart(&self, adapted: &Value, timestamp: &Option<String>) -> Option<ChunkPayload> {
        let spec = adapted.get(CHART_SPEC)?;
        let title = adapted.get(CHART_TITLE).and_then(Value::as_str);
        let description = adapted.get(CHART_DESCRIPTION).and_then(Value::as_str);

        match self.chart_normalizer.normalize(spec, title, description) {
            Ok(chart_config) => Some(ChunkPayload::Chart(ChartPayload {
                chart_config,
                timestamp: timestamp.clone(),
            })),
            Err(e) => {
                debug!("Skipping chart event: {}", e);
                None
            }
        }
    }

    fn classify_insights(adapted: &Value, timestamp: &Option<String>) -> Option<ChunkPayload> {
        let parts = adapted.get(TEXT_PARTS)?.as_array()?;
        let text = parts
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(INSIGHTS_LINE_BREAK);
        let document_references = extract_document_references(&text);

        Some(ChunkPayload::Insights(InsightsPayload {
            text,
            document_references,
            timestamp: timestamp.clone(),
        }))
    }
}
