//! Environment abstraction for stream recording.
//!
//! The `StreamEnvironment` trait supplies the runtime collaborators of a
//! stream: the fragment store and the chart normalizer. The CLI implements it
//! over the SQLite repository; tests use the mocks in [`test_env`].

use std::sync::Arc;

use querystream_core::ChunkStoreTrait;

use crate::chart::ChartNormalizerTrait;

pub trait StreamEnvironment: Send + Sync {
    /// Store that receives every fragment.
    fn chunk_store(&self) -> Arc<dyn ChunkStoreTrait>;

    /// Collaborator that validates chart specifications.
    fn chart_normalizer(&self) -> Arc<dyn ChartNormalizerTrait>;
}
