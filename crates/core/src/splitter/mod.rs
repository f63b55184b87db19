//! Splitter module - size-constrained fragmenting of chunk payloads.

mod splitter_model;
mod splitter_service;

pub use splitter_model::{FragmentLimits, FragmentSlice, SplitOutcome, SplitWarning};
pub use splitter_service::{encoded_len, ChunkSizeSplitter};
