//! Reconstruction domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::chunks::{ChunkType, LogicalChunk};

/// Integrity problem found in one `(chunk_type, sequence)` group.
///
/// The affected group is dropped; every other group still merges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MergeIntegrityError {
    #[error("{chunk_type}#{sequence}: expected {expected} fragments, found {found}")]
    #[serde(rename_all = "camelCase")]
    FragmentCountMismatch {
        chunk_type: ChunkType,
        sequence: u32,
        expected: u32,
        found: u32,
    },

    #[error("{chunk_type}#{sequence}: fragments disagree on fragment_count ({counts:?})")]
    #[serde(rename_all = "camelCase")]
    InconsistentFragmentCount {
        chunk_type: ChunkType,
        sequence: u32,
        counts: Vec<u32>,
    },

    #[error("{chunk_type}#{sequence}: fragment indices {indices:?} are not contiguous from 0")]
    #[serde(rename_all = "camelCase")]
    InvalidFragmentIndices {
        chunk_type: ChunkType,
        sequence: u32,
        indices: Vec<u32>,
    },

    #[error("{chunk_type}#{sequence}: fragment {fragment_index} has no array to merge")]
    #[serde(rename_all = "camelCase")]
    MissingArray {
        chunk_type: ChunkType,
        sequence: u32,
        fragment_index: u32,
    },

    #[error("{chunk_type}#{sequence}: chunk type cannot span several fragments")]
    #[serde(rename_all = "camelCase")]
    Unsplittable { chunk_type: ChunkType, sequence: u32 },

    #[error("{chunk_type}#{sequence}: payload could not be decoded: {reason}")]
    #[serde(rename_all = "camelCase")]
    UndecodablePayload {
        chunk_type: ChunkType,
        sequence: u32,
        reason: String,
    },
}

impl MergeIntegrityError {
    pub fn chunk_type(&self) -> ChunkType {
        match self {
            MergeIntegrityError::FragmentCountMismatch { chunk_type, .. }
            | MergeIntegrityError::InconsistentFragmentCount { chunk_type, .. }
            | MergeIntegrityError::InvalidFragmentIndices { chunk_type, .. }
            | MergeIntegrityError::MissingArray { chunk_type, .. }
            | MergeIntegrityError::Unsplittable { chunk_type, .. }
            | MergeIntegrityError::UndecodablePayload { chunk_type, .. } => *chunk_type,
        }
    }

    pub fn sequence(&self) -> u32 {
        match self {
            MergeIntegrityError::FragmentCountMismatch { sequence, .. }
            | MergeIntegrityError::InconsistentFragmentCount { sequence, .. }
            | MergeIntegrityError::InvalidFragmentIndices { sequence, .. }
            | MergeIntegrityError::MissingArray { sequence, .. }
            | MergeIntegrityError::Unsplittable { sequence, .. }
            | MergeIntegrityError::UndecodablePayload { sequence, .. } => *sequence,
        }
    }
}

/// Failure to produce any message content. Returned, never raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ReconstructionError {
    #[error("No fragments stored for message {message_id}")]
    #[serde(rename_all = "camelCase")]
    NotFound { message_id: String },

    #[error("No chunk of message {message_id} could be merged")]
    #[serde(rename_all = "camelCase")]
    Empty {
        message_id: String,
        issues: Vec<MergeIntegrityError>,
    },

    #[error("Failed to read fragments of message {message_id}: {reason}")]
    #[serde(rename_all = "camelCase")]
    Store { message_id: String, reason: String },
}

/// Per-type counts and presence flags of a reconstructed message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkSummary {
    pub total_chunks: usize,
    pub counts: BTreeMap<ChunkType, usize>,
    pub has_sql: bool,
    pub has_data: bool,
    pub has_chart: bool,
    pub has_insights: bool,
}

impl ChunkSummary {
    pub fn from_chunks(chunks: &[LogicalChunk]) -> Self {
        let mut counts = BTreeMap::new();
        for chunk in chunks {
            *counts.entry(chunk.chunk_type()).or_insert(0) += 1;
        }
        let has = |chunk_type: ChunkType| counts.contains_key(&chunk_type);
        Self {
            total_chunks: chunks.len(),
            has_sql: has(ChunkType::Sql),
            has_data: has(ChunkType::Data),
            has_chart: has(ChunkType::Chart),
            has_insights: has(ChunkType::Insights),
            counts,
        }
    }
}

/// Chunk shape handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentedChunk {
    #[serde(rename = "type")]
    pub chunk_type: ChunkType,
    pub sequence: u32,
    pub data: Value,
}

/// A message reassembled from its stored fragments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconstructedMessage {
    pub message_id: String,
    /// Chunks in stream order.
    pub chunks: Vec<LogicalChunk>,
    pub summary: ChunkSummary,
    /// Groups that were dropped while merging.
    pub issues: Vec<MergeIntegrityError>,
}

impl ReconstructedMessage {
    pub fn is_complete(&self) -> bool {
        self.issues.is_empty()
    }

    /// Chunks as ordered `{type, sequence, data}` entries.
    pub fn presented_chunks(&self) -> Vec<PresentedChunk> {
        self.chunks
            .iter()
            .filter_map(|chunk| {
                let data = chunk.payload.to_document().ok()?;
                Some(PresentedChunk {
                    chunk_type: chunk.chunk_type(),
                    sequence: chunk.sequence,
                    data,
                })
            })
            .collect()
    }

    /// Chunk types that had at least one group dropped.
    pub fn unavailable_types(&self) -> Vec<ChunkType> {
        let mut types: Vec<ChunkType> = self.issues.iter().map(|i| i.chunk_type()).collect();
        types.sort();
        types.dedup();
        types
    }
}

/// Per-message failure collected while reconstructing a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconstructionFailure {
    pub message_id: String,
    pub error: ReconstructionError,
}

/// Reconstruction of several messages of one conversation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationReconstruction {
    pub messages: Vec<ReconstructedMessage>,
    pub failures: Vec<ReconstructionFailure>,
}

/// Stored fragment metadata, without the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentInfo {
    pub id: String,
    pub chunk_type: ChunkType,
    pub sequence: u32,
    pub fragment_index: u32,
    pub fragment_count: u32,
    pub payload_bytes: usize,
    pub created_at: DateTime<Utc>,
}

/// Debug view over the raw fragments of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentSummary {
    pub message_id: String,
    pub total_fragments: usize,
    pub total_groups: usize,
    pub counts_by_type: BTreeMap<ChunkType, usize>,
    pub has_split_data: bool,
    pub fragments: Vec<FragmentInfo>,
}
