use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::chunks_model::ChunkType;

/// Identifier of a stored fragment row.
pub type FragmentId = String;

/// One stored row holding all or part of a chunk's payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalFragment {
    pub id: FragmentId,
    pub message_id: String,
    pub chunk_type: ChunkType,
    pub sequence: u32,
    /// 0-based position of this slice within its group.
    pub fragment_index: u32,
    /// Number of fragments recorded for this `(chunk_type, sequence)` group.
    pub fragment_count: u32,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

/// Input for appending a fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFragment {
    pub message_id: String,
    pub chunk_type: ChunkType,
    pub sequence: u32,
    pub fragment_index: u32,
    pub fragment_count: u32,
    pub payload: Value,
}
