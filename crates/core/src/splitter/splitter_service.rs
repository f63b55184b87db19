use log::{debug, warn};
use serde_json::Value;

use crate::chunks::{ChunkType, LogicalChunk};
use crate::errors::Result;

use super::splitter_model::{FragmentLimits, FragmentSlice, SplitOutcome, SplitWarning};

/// Compact JSON size of a value in bytes.
pub fn encoded_len(value: &Value) -> usize {
    serde_json::to_vec(value).map(|bytes| bytes.len()).unwrap_or(0)
}

/// Packs the repeating array of a chunk payload into fragments that respect
/// [`FragmentLimits`].
#[derive(Debug, Clone, Default)]
pub struct ChunkSizeSplitter {
    limits: FragmentLimits,
}

impl ChunkSizeSplitter {
    pub fn new(limits: FragmentLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> FragmentLimits {
        self.limits
    }

    /// Encode a chunk's payload and split it.
    pub fn split_chunk(&self, chunk: &LogicalChunk) -> Result<SplitOutcome> {
        let document = chunk.payload.to_document()?;
        Ok(self.split(chunk.chunk_type(), document))
    }

    /// Split an encoded payload document. Never fails; problems are reported
    /// as warnings on the outcome.
    pub fn split(&self, chunk_type: ChunkType, document: Value) -> SplitOutcome {
        let max_bytes = self.limits.max_fragment_bytes;
        let whole_len = encoded_len(&document);

        if whole_len <= max_bytes {
            return Self::single(document, whole_len, Vec::new());
        }

        let Some(pointer) = chunk_type.split_array_pointer() else {
            let warning = SplitWarning::Unsplittable {
                chunk_type,
                encoded_len: whole_len,
            };
            warn!("{}", warning);
            return Self::single(document, whole_len, vec![warning]);
        };

        let mut envelope = document;
        let elements = match envelope.pointer_mut(pointer) {
            Some(Value::Array(items)) => std::mem::take(items),
            _ => {
                let warning = SplitWarning::Unsplittable {
                    chunk_type,
                    encoded_len: whole_len,
                };
                warn!("{} (no array at {})", warning, pointer);
                return Self::single(envelope, whole_len, vec![warning]);
            }
        };

        let mut warnings = Vec::new();
        let envelope_len = encoded_len(&envelope);
        let envelope_fits = envelope_len <= max_bytes;
        if !envelope_fits {
            let warning = SplitWarning::OversizedEnvelope {
                encoded_len: envelope_len,
            };
            warn!("{} {}", chunk_type, warning);
            warnings.push(warning);
        }

        let groups = self.pack(elements, envelope_len, envelope_fits, &mut warnings);

        if groups.is_empty() {
            return Self::single(envelope, envelope_len, warnings);
        }

        let fragment_count = groups.len() as u32;
        let fragments = groups
            .into_iter()
            .enumerate()
            .map(|(index, group)| {
                let mut payload = envelope.clone();
                if let Some(slot) = payload.pointer_mut(pointer) {
                    *slot = Value::Array(group);
                }
                let encoded_len = encoded_len(&payload);
                FragmentSlice {
                    fragment_index: index as u32,
                    fragment_count,
                    payload,
                    encoded_len,
                }
            })
            .collect::<Vec<_>>();

        debug!(
            "Split {} payload of {} bytes into {} fragments",
            chunk_type, whole_len, fragment_count
        );

        SplitOutcome {
            fragments,
            warnings,
        }
    }

    /// Greedy packing. A fragment's size is the envelope plus its elements
    /// plus one separator between consecutive elements.
    fn pack(
        &self,
        elements: Vec<Value>,
        envelope_len: usize,
        envelope_fits: bool,
        warnings: &mut Vec<SplitWarning>,
    ) -> Vec<Vec<Value>> {
        let max_bytes = self.limits.max_fragment_bytes;
        let max_rows = self.limits.max_rows_per_fragment;

        let mut groups: Vec<Vec<Value>> = Vec::new();
        let mut current: Vec<Value> = Vec::new();
        let mut current_len = envelope_len;

        for (element_index, element) in elements.into_iter().enumerate() {
            let element_len = encoded_len(&element);

            if !current.is_empty()
                && (current_len + 1 + element_len > max_bytes || current.len() >= max_rows)
            {
                groups.push(std::mem::take(&mut current));
                current_len = envelope_len;
            }

            if envelope_fits && envelope_len + element_len > max_bytes {
                let warning = SplitWarning::OversizedElement {
                    element_index,
                    encoded_len: element_len,
                };
                warn!("{}", warning);
                warnings.push(warning);
            }

            current_len += usize::from(!current.is_empty()) + element_len;
            current.push(element);
        }

        if !current.is_empty() {
            groups.push(current);
        }
        groups
    }

    fn single(payload: Value, encoded_len: usize, warnings: Vec<SplitWarning>) -> SplitOutcome {
        SplitOutcome {
            fragments: vec![FragmentSlice {
                fragment_index: 0,
                fragment_count: 1,
                payload,
                encoded_len,
            }],
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunks::{ChunkPayload, DataPayload, InsightsPayload};
    use serde_json::json;

    fn data_chunk(rows: Vec<Value>) -> LogicalChunk {
        LogicalChunk::new(
            "msg-1",
            2,
            ChunkPayload::Data(DataPayload {
                rows,
                schema: json!({"fields": [{"name": "id", "type": "integer"}]}),
                name: "result".to_string(),
                execution_time: "5ms".to_string(),
                timestamp: None,
            }),
        )
    }

    fn rows(n: usize) -> Vec<Value> {
        (0..n).map(|i| json!({ "id": i })).collect()
    }

    fn row_ids(payload: &Value) -> Vec<u64> {
        payload["rows"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_u64().unwrap())
            .collect()
    }

    #[test]
    fn test_small_payload_is_single_fragment() {
        let splitter = ChunkSizeSplitter::default();
        let outcome = splitter.split_chunk(&data_chunk(rows(5))).unwrap();

        assert_eq!(outcome.fragments.len(), 1);
        assert_eq!(outcome.fragments[0].fragment_count, 1);
        assert_eq!(row_ids(&outcome.fragments[0].payload), vec![0, 1, 2, 3, 4]);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_row_limit_binds_before_byte_limit() {
        let splitter = ChunkSizeSplitter::default();
        let outcome = splitter.split_chunk(&data_chunk(rows(320))).unwrap();

        let sizes: Vec<usize> = outcome
            .fragments
            .iter()
            .map(|f| f.payload["rows"].as_array().unwrap().len())
            .collect();
        assert_eq!(sizes, vec![150, 150, 20]);
        assert!(outcome.fragments.iter().all(|f| f.fragment_count == 3));

        let merged: Vec<u64> = outcome
            .fragments
            .iter()
            .flat_map(|f| row_ids(&f.payload))
            .collect();
        assert_eq!(merged, (0..320).collect::<Vec<u64>>());
    }

    #[test]
    fn test_byte_limit_is_respected() {
        let limits = FragmentLimits::new(300, 150).unwrap();
        let splitter = ChunkSizeSplitter::new(limits);
        let outcome = splitter.split_chunk(&data_chunk(rows(100))).unwrap();

        assert!(outcome.is_split());
        for fragment in &outcome.fragments {
            assert!(fragment.encoded_len <= 300);
            assert_eq!(fragment.encoded_len, encoded_len(&fragment.payload));
        }
    }

    #[test]
    fn test_fragments_keep_envelope_fields() {
        let limits = FragmentLimits::new(200, 150).unwrap();
        let splitter = ChunkSizeSplitter::new(limits);
        let outcome = splitter.split_chunk(&data_chunk(rows(50))).unwrap();

        for fragment in &outcome.fragments {
            assert_eq!(fragment.payload["name"], "result");
            assert_eq!(fragment.payload["executionTime"], "5ms");
            assert!(fragment.payload["schema"]["fields"].is_array());
        }
    }

    #[test]
    fn test_oversized_element_gets_own_fragment() {
        let limits = FragmentLimits::new(200, 150).unwrap();
        let splitter = ChunkSizeSplitter::new(limits);
        let big = json!({ "id": 1, "blob": "x".repeat(400) });
        let chunk = data_chunk(vec![json!({"id": 0}), big, json!({"id": 2})]);

        let outcome = splitter.split_chunk(&chunk).unwrap();

        assert_eq!(outcome.fragments.len(), 3);
        assert_eq!(outcome.fragments[1].payload["rows"].as_array().unwrap().len(), 1);
        assert!(matches!(
            outcome.warnings.as_slice(),
            [SplitWarning::OversizedElement { element_index: 1, .. }]
        ));
    }

    #[test]
    fn test_large_insights_is_unsplittable() {
        let limits = FragmentLimits::new(100, 150).unwrap();
        let splitter = ChunkSizeSplitter::new(limits);
        let chunk = LogicalChunk::new(
            "msg-1",
            4,
            ChunkPayload::Insights(InsightsPayload {
                text: "y".repeat(500),
                document_references: Vec::new(),
                timestamp: None,
            }),
        );

        let outcome = splitter.split_chunk(&chunk).unwrap();

        assert_eq!(outcome.fragments.len(), 1);
        assert!(matches!(
            outcome.warnings.as_slice(),
            [SplitWarning::Unsplittable {
                chunk_type: ChunkType::Insights,
                ..
            }]
        ));
    }

    #[test]
    fn test_missing_array_yields_single_fragment() {
        let limits = FragmentLimits::new(50, 150).unwrap();
        let splitter = ChunkSizeSplitter::new(limits);
        let document = json!({ "chartConfig": { "vegaSpec": { "mark": "bar", "note": "z".repeat(80) } } });

        let outcome = splitter.split(ChunkType::Chart, document.clone());

        assert_eq!(outcome.fragments.len(), 1);
        assert_eq!(outcome.fragments[0].payload, document);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_oversized_envelope_with_empty_array() {
        let limits = FragmentLimits::new(50, 150).unwrap();
        let splitter = ChunkSizeSplitter::new(limits);
        let document = json!({ "rows": [], "schema": {}, "name": "n".repeat(100) });

        let outcome = splitter.split(ChunkType::Data, document);

        assert_eq!(outcome.fragments.len(), 1);
        assert!(matches!(
            outcome.warnings.as_slice(),
            [SplitWarning::OversizedEnvelope { .. }]
        ));
    }

    #[test]
    fn test_limits_reject_zero() {
        assert!(FragmentLimits::new(0, 10).is_err());
        assert!(FragmentLimits::new(10, 0).is_err());
        assert!(FragmentLimits::new(3000, 10).is_ok());
    }
}
