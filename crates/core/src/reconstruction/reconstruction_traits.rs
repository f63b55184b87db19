use super::reconstruction_model::{
    ConversationReconstruction, FragmentSummary, ReconstructedMessage, ReconstructionError,
};
use crate::errors::Result;

/// Read-side service that reassembles stored messages.
pub trait MessageReconstructorTrait: Send + Sync {
    fn reconstruct(
        &self,
        message_id: &str,
    ) -> std::result::Result<ReconstructedMessage, ReconstructionError>;

    fn reconstruct_many(&self, message_ids: &[String]) -> ConversationReconstruction;

    fn fragment_summary(&self, message_id: &str) -> Result<FragmentSummary>;
}
