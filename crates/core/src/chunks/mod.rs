//! Chunks module - logical chunk and stored fragment models, and the store trait.

mod chunks_model;
mod chunks_traits;
mod fragments_model;

pub use chunks_model::{
    ChartConfig, ChartMetadata, ChartPayload, ChunkPayload, ChunkType, DataPayload,
    DocumentReference, InsightsPayload, LogicalChunk, RenderingOptions, SqlPayload,
};
pub use chunks_traits::ChunkStoreTrait;
pub use fragments_model::{FragmentId, NewFragment, PhysicalFragment};
