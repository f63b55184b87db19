//! Splitter configuration and output models.

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chunks::ChunkType;
use crate::constants::{
    DEFAULT_MAX_FRAGMENT_BYTES, DEFAULT_MAX_ROWS_PER_FRAGMENT, STORAGE_ROW_HARD_LIMIT_BYTES,
};
use crate::errors::{Error, Result};

/// Size and row limits applied to every stored fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentLimits {
    pub max_fragment_bytes: usize,
    pub max_rows_per_fragment: usize,
}

impl FragmentLimits {
    pub fn new(max_fragment_bytes: usize, max_rows_per_fragment: usize) -> Result<Self> {
        if max_fragment_bytes == 0 {
            return Err(Error::InvalidConfigValue(
                "max_fragment_bytes must be greater than zero".to_string(),
            ));
        }
        if max_rows_per_fragment == 0 {
            return Err(Error::InvalidConfigValue(
                "max_rows_per_fragment must be greater than zero".to_string(),
            ));
        }
        if max_fragment_bytes > STORAGE_ROW_HARD_LIMIT_BYTES {
            warn!(
                "max_fragment_bytes {} exceeds the storage row ceiling of {} bytes",
                max_fragment_bytes, STORAGE_ROW_HARD_LIMIT_BYTES
            );
        }
        Ok(Self {
            max_fragment_bytes,
            max_rows_per_fragment,
        })
    }
}

impl Default for FragmentLimits {
    fn default() -> Self {
        Self {
            max_fragment_bytes: DEFAULT_MAX_FRAGMENT_BYTES,
            max_rows_per_fragment: DEFAULT_MAX_ROWS_PER_FRAGMENT,
        }
    }
}

/// Non-fatal condition noticed while splitting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SplitWarning {
    /// A single array element does not fit in a fragment even on its own.
    #[error("Element {element_index} encodes to {encoded_len} bytes and was stored alone")]
    #[serde(rename_all = "camelCase")]
    OversizedElement {
        element_index: usize,
        encoded_len: usize,
    },

    /// The payload without its array already exceeds the byte limit.
    #[error("Payload envelope encodes to {encoded_len} bytes")]
    #[serde(rename_all = "camelCase")]
    OversizedEnvelope { encoded_len: usize },

    /// The payload exceeds the byte limit but has no array to split.
    #[error("{chunk_type} payload of {encoded_len} bytes cannot be split")]
    #[serde(rename_all = "camelCase")]
    Unsplittable {
        chunk_type: ChunkType,
        encoded_len: usize,
    },
}

/// One slice of a split chunk, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentSlice {
    pub fragment_index: u32,
    pub fragment_count: u32,
    pub payload: Value,
    pub encoded_len: usize,
}

/// Result of splitting one chunk.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SplitOutcome {
    pub fragments: Vec<FragmentSlice>,
    pub warnings: Vec<SplitWarning>,
}

impl SplitOutcome {
    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_split(&self) -> bool {
        self.fragments.len() > 1
    }
}
