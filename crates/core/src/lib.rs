//! QueryStream Core - Domain entities, services, and traits.
//!
//! This crate holds the chunk/fragment model, the size-constrained splitter
//! and the reconstruction pipeline. It is database-agnostic and defines the
//! store trait implemented by the `storage-sqlite` crate.

pub mod chunks;
pub mod constants;
pub mod errors;
pub mod reconstruction;
pub mod splitter;

pub use chunks::*;
pub use splitter::{ChunkSizeSplitter, FragmentLimits};

// Re-export error types
pub use errors::Error;
pub use errors::Result;
