//! Reconstruction module - merges stored fragments back into ordered messages.

mod merge;
mod reconstruction_model;
mod reconstruction_service;
mod reconstruction_traits;

pub use merge::{merge_fragments, MergeOutcome};
pub use reconstruction_model::{
    ChunkSummary, ConversationReconstruction, FragmentInfo, FragmentSummary, MergeIntegrityError,
    PresentedChunk, ReconstructedMessage, ReconstructionError, ReconstructionFailure,
};
pub use reconstruction_service::MessageReconstructor;
pub use reconstruction_traits::MessageReconstructorTrait;
