//! Fragment merge: regroups stored fragments into logical chunks.

use log::error;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::chunks::{ChunkPayload, ChunkType, LogicalChunk, PhysicalFragment};

use super::reconstruction_model::MergeIntegrityError;

/// Chunks that merged and groups that were dropped.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergeOutcome {
    pub chunks: Vec<LogicalChunk>,
    pub issues: Vec<MergeIntegrityError>,
    pub group_count: usize,
}

/// Merge fragments of one message into chunks ordered by sequence.
///
/// Input order does not matter. Each `(chunk_type, sequence)` group is
/// validated on its own; an invalid group is reported and skipped.
pub fn merge_fragments(message_id: &str, fragments: Vec<PhysicalFragment>) -> MergeOutcome {
    let mut groups: BTreeMap<(u32, ChunkType), Vec<PhysicalFragment>> = BTreeMap::new();
    for fragment in fragments {
        groups
            .entry((fragment.sequence, fragment.chunk_type))
            .or_default()
            .push(fragment);
    }

    let mut outcome = MergeOutcome {
        group_count: groups.len(),
        ..Default::default()
    };

    for ((sequence, chunk_type), mut group) in groups {
        group.sort_by_key(|f| f.fragment_index);
        match merge_group(chunk_type, sequence, group) {
            Ok(payload) => outcome
                .chunks
                .push(LogicalChunk::new(message_id, sequence, payload)),
            Err(issue) => {
                error!("Dropping chunk of message {}: {}", message_id, issue);
                outcome.issues.push(issue);
            }
        }
    }

    outcome.chunks.sort_by_key(|c| c.sequence);
    outcome
}

/// Group fragments must already be sorted by `fragment_index`.
fn merge_group(
    chunk_type: ChunkType,
    sequence: u32,
    group: Vec<PhysicalFragment>,
) -> Result<ChunkPayload, MergeIntegrityError> {
    let decode = |document: Value| {
        ChunkPayload::from_document(chunk_type, document).map_err(|e| {
            MergeIntegrityError::UndecodablePayload {
                chunk_type,
                sequence,
                reason: e.to_string(),
            }
        })
    };

    if group.len() == 1 && group[0].fragment_count == 1 {
        let document = group.into_iter().next().map(|f| f.payload).unwrap_or_default();
        return decode(document);
    }

    let mut counts: Vec<u32> = group.iter().map(|f| f.fragment_count).collect();
    counts.sort_unstable();
    counts.dedup();
    if counts.len() != 1 {
        return Err(MergeIntegrityError::InconsistentFragmentCount {
            chunk_type,
            sequence,
            counts,
        });
    }

    let expected = counts[0];
    if group.len() != expected as usize {
        return Err(MergeIntegrityError::FragmentCountMismatch {
            chunk_type,
            sequence,
            expected,
            found: group.len() as u32,
        });
    }

    let indices: Vec<u32> = group.iter().map(|f| f.fragment_index).collect();
    if indices.iter().enumerate().any(|(i, idx)| *idx != i as u32) {
        return Err(MergeIntegrityError::InvalidFragmentIndices {
            chunk_type,
            sequence,
            indices,
        });
    }

    let Some(pointer) = chunk_type.split_array_pointer() else {
        return Err(MergeIntegrityError::Unsplittable {
            chunk_type,
            sequence,
        });
    };

    let mut merged: Vec<Value> = Vec::new();
    let mut envelope: Option<Value> = None;
    for fragment in group {
        let fragment_index = fragment.fragment_index;
        let mut payload = fragment.payload;
        match payload.pointer_mut(pointer) {
            Some(Value::Array(items)) => merged.append(items),
            _ => {
                return Err(MergeIntegrityError::MissingArray {
                    chunk_type,
                    sequence,
                    fragment_index,
                })
            }
        }
        if envelope.is_none() {
            envelope = Some(payload);
        }
    }

    let mut document = envelope.unwrap_or_default();
    if let Some(slot) = document.pointer_mut(pointer) {
        *slot = Value::Array(merged);
    }
    decode(document)
}
