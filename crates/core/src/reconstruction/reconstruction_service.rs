use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::chunks::ChunkStoreTrait;
use crate::errors::Result;
use crate::splitter::encoded_len;

use super::merge::merge_fragments;
use super::reconstruction_model::{
    ChunkSummary, ConversationReconstruction, FragmentInfo, FragmentSummary,
    ReconstructedMessage, ReconstructionError, ReconstructionFailure,
};
use super::reconstruction_traits::MessageReconstructorTrait;

/// Reassembles messages from the fragments in a [`ChunkStoreTrait`].
///
/// Read-only: repeated calls with no intervening writes give identical output.
pub struct MessageReconstructor {
    store: Arc<dyn ChunkStoreTrait>,
}

impl MessageReconstructor {
    pub fn new(store: Arc<dyn ChunkStoreTrait>) -> Self {
        Self { store }
    }
}

impl MessageReconstructorTrait for MessageReconstructor {
    fn reconstruct(
        &self,
        message_id: &str,
    ) -> std::result::Result<ReconstructedMessage, ReconstructionError> {
        let fragments =
            self.store
                .read_all(message_id)
                .map_err(|e| ReconstructionError::Store {
                    message_id: message_id.to_string(),
                    reason: e.to_string(),
                })?;

        if fragments.is_empty() {
            debug!("No fragments stored for message {}", message_id);
            return Err(ReconstructionError::NotFound {
                message_id: message_id.to_string(),
            });
        }

        let fragment_total = fragments.len();
        let outcome = merge_fragments(message_id, fragments);

        if outcome.chunks.is_empty() {
            warn!(
                "Reconstruction of message {} produced no chunks ({} groups dropped)",
                message_id,
                outcome.issues.len()
            );
            return Err(ReconstructionError::Empty {
                message_id: message_id.to_string(),
                issues: outcome.issues,
            });
        }

        let summary = ChunkSummary::from_chunks(&outcome.chunks);
        info!(
            "Reconstructed message {}: {} chunks from {} fragments, {} groups dropped",
            message_id,
            outcome.chunks.len(),
            fragment_total,
            outcome.issues.len()
        );

        Ok(ReconstructedMessage {
            message_id: message_id.to_string(),
            chunks: outcome.chunks,
            summary,
            issues: outcome.issues,
        })
    }

    fn reconstruct_many(&self, message_ids: &[String]) -> ConversationReconstruction {
        let mut result = ConversationReconstruction::default();
        for message_id in message_ids {
            match self.reconstruct(message_id) {
                Ok(message) => result.messages.push(message),
                Err(error) => result.failures.push(ReconstructionFailure {
                    message_id: message_id.clone(),
                    error,
                }),
            }
        }
        result
    }

    fn fragment_summary(&self, message_id: &str) -> Result<FragmentSummary> {
        let fragments = self.store.read_all(message_id)?;

        let mut counts_by_type = BTreeMap::new();
        let mut groups = BTreeSet::new();
        let mut has_split_data = false;
        let mut infos = Vec::with_capacity(fragments.len());

        for fragment in &fragments {
            *counts_by_type.entry(fragment.chunk_type).or_insert(0) += 1;
            groups.insert((fragment.sequence, fragment.chunk_type));
            has_split_data |= fragment.fragment_count > 1;
            infos.push(FragmentInfo {
                id: fragment.id.clone(),
                chunk_type: fragment.chunk_type,
                sequence: fragment.sequence,
                fragment_index: fragment.fragment_index,
                fragment_count: fragment.fragment_count,
                payload_bytes: encoded_len(&fragment.payload),
                created_at: fragment.created_at,
            });
        }

        Ok(FragmentSummary {
            message_id: message_id.to_string(),
            total_fragments: fragments.len(),
            total_groups: groups.len(),
            counts_by_type,
            has_split_data,
            fragments: infos,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunks::{ChunkType, FragmentId, NewFragment, PhysicalFragment};
    use crate::errors::{DatabaseError, Error};
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::{json, Value};
    use std::sync::RwLock;

    #[derive(Default)]
    struct InMemoryStore {
        fragments: RwLock<Vec<PhysicalFragment>>,
        fail_reads: bool,
    }

    impl InMemoryStore {
        fn insert(&self, chunk_type: ChunkType, sequence: u32, index: u32, count: u32, payload: Value) {
            let mut fragments = self.fragments.write().unwrap();
            let id = format!("f{}", fragments.len());
            fragments.push(PhysicalFragment {
                id,
                message_id: "msg-1".to_string(),
                chunk_type,
                sequence,
                fragment_index: index,
                fragment_count: count,
                payload,
                created_at: Utc::now(),
            });
        }
    }

    #[async_trait]
    impl ChunkStoreTrait for InMemoryStore {
        async fn append(&self, _fragment: NewFragment) -> Result<FragmentId> {
            unimplemented!("append is not used by the reconstructor")
        }

        fn read_all(&self, message_id: &str) -> Result<Vec<PhysicalFragment>> {
            if self.fail_reads {
                return Err(Error::Database(DatabaseError::ConnectionFailed(
                    "pool exhausted".to_string(),
                )));
            }
            let mut fragments: Vec<PhysicalFragment> = self
                .fragments
                .read()
                .unwrap()
                .iter()
                .filter(|f| f.message_id == message_id)
                .cloned()
                .collect();
            fragments.sort_by_key(|f| (f.sequence, f.fragment_index));
            Ok(fragments)
        }

        async fn delete_all(&self, _message_id: &str) -> Result<usize> {
            Ok(0)
        }
    }

    fn rows(ids: std::ops::Range<u64>) -> Value {
        let rows: Vec<Value> = ids.map(|i| json!({ "id": i })).collect();
        json!({ "rows": rows, "schema": {}, "name": "result" })
    }

    fn seeded_store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::default());
        // Written out of sequence order on purpose.
        store.insert(ChunkType::Insights, 3, 0, 1, json!({ "text": "Revenue grew" }));
        store.insert(ChunkType::Data, 2, 1, 2, rows(3..5));
        store.insert(ChunkType::Sql, 1, 0, 1, json!({ "sqlQuery": "SELECT 1" }));
        store.insert(ChunkType::Data, 2, 0, 2, rows(0..3));
        store
    }

    #[test]
    fn test_reconstruct_orders_and_summarizes() {
        let reconstructor = MessageReconstructor::new(seeded_store());

        let message = reconstructor.reconstruct("msg-1").unwrap();

        let sequences: Vec<u32> = message.chunks.iter().map(|c| c.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
        assert_eq!(message.summary.total_chunks, 3);
        assert!(message.summary.has_sql && message.summary.has_data && message.summary.has_insights);
        assert!(!message.summary.has_chart);
        assert!(message.is_complete());

        let presented = message.presented_chunks();
        assert_eq!(presented[1].chunk_type, ChunkType::Data);
        assert_eq!(presented[1].data["rows"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn test_reconstruct_is_idempotent() {
        let reconstructor = MessageReconstructor::new(seeded_store());

        let first = reconstructor.reconstruct("msg-1").unwrap();
        let second = reconstructor.reconstruct("msg-1").unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_message_is_not_found() {
        let reconstructor = MessageReconstructor::new(seeded_store());

        let err = reconstructor.reconstruct("missing").unwrap_err();

        assert!(matches!(err, ReconstructionError::NotFound { .. }));
    }

    #[test]
    fn test_all_groups_dropped_is_empty() {
        let store = Arc::new(InMemoryStore::default());
        store.insert(ChunkType::Data, 1, 1, 2, rows(0..2));
        let reconstructor = MessageReconstructor::new(store);

        let err = reconstructor.reconstruct("msg-1").unwrap_err();

        match err {
            ReconstructionError::Empty { issues, .. } => assert_eq!(issues.len(), 1),
            other => panic!("Expected empty reconstruction, got {:?}", other),
        }
    }

    #[test]
    fn test_partial_loss_marks_type_unavailable() {
        let store = Arc::new(InMemoryStore::default());
        store.insert(ChunkType::Sql, 1, 0, 1, json!({ "sqlQuery": "SELECT 1" }));
        store.insert(ChunkType::Data, 2, 0, 2, rows(0..3));
        store.insert(ChunkType::Insights, 3, 0, 1, json!({ "text": "ok" }));
        let reconstructor = MessageReconstructor::new(store);

        let message = reconstructor.reconstruct("msg-1").unwrap();

        assert_eq!(message.chunks.len(), 2);
        assert!(!message.summary.has_data);
        assert_eq!(message.unavailable_types(), vec![ChunkType::Data]);
    }

    #[test]
    fn test_store_failure_is_returned() {
        let store = Arc::new(InMemoryStore {
            fail_reads: true,
            ..Default::default()
        });
        let reconstructor = MessageReconstructor::new(store);

        let err = reconstructor.reconstruct("msg-1").unwrap_err();

        assert!(matches!(err, ReconstructionError::Store { .. }));
    }

    #[test]
    fn test_reconstruct_many_collects_failures() {
        let reconstructor = MessageReconstructor::new(seeded_store());

        let conversation =
            reconstructor.reconstruct_many(&["msg-1".to_string(), "msg-2".to_string()]);

        assert_eq!(conversation.messages.len(), 1);
        assert_eq!(conversation.failures.len(), 1);
        assert_eq!(conversation.failures[0].message_id, "msg-2");
    }

    #[test]
    fn test_fragment_summary() {
        let reconstructor = MessageReconstructor::new(seeded_store());

        let summary = reconstructor.fragment_summary("msg-1").unwrap();

        assert_eq!(summary.total_fragments, 4);
        assert_eq!(summary.total_groups, 3);
        assert_eq!(summary.counts_by_type.get(&ChunkType::Data), Some(&2));
        assert!(summary.has_split_data);
        assert!(summary.fragments.iter().all(|f| f.payload_bytes > 0));
    }
}
