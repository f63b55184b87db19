//! Message fragment persistence module.
//!
//! Stores the size-bounded fragments of streamed message chunks, one row per
//! fragment, keyed by `(message_id, chunk_type, sequence, fragment_index)`.

pub mod model;
pub mod repository;

pub use model::MessageFragmentDB;
pub use repository::FragmentRepository;
