use async_trait::async_trait;
use std::collections::BTreeMap;

use super::chunks_model::ChunkType;
use super::fragments_model::{FragmentId, NewFragment, PhysicalFragment};
use crate::errors::Result;

/// Append-only persistence of message fragments.
///
/// Appends for one message are issued sequentially by the stream that owns
/// it. Reads may run concurrently with appends for the same or other messages
/// and observe whatever has been stored so far.
#[async_trait]
pub trait ChunkStoreTrait: Send + Sync {
    /// Insert one fragment. Retrying the same
    /// `(message_id, chunk_type, sequence, fragment_index)` returns the id of
    /// the row already stored instead of inserting a duplicate.
    async fn append(&self, fragment: NewFragment) -> Result<FragmentId>;

    /// All fragments of a message ordered by `(sequence, fragment_index)`.
    fn read_all(&self, message_id: &str) -> Result<Vec<PhysicalFragment>>;

    /// Delete every fragment of a message, returning the number removed.
    async fn delete_all(&self, message_id: &str) -> Result<usize>;

    /// Number of stored fragments per chunk type.
    fn count_by_type(&self, message_id: &str) -> Result<BTreeMap<ChunkType, usize>> {
        let mut counts = BTreeMap::new();
        for fragment in self.read_all(message_id)? {
            *counts.entry(fragment.chunk_type).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
