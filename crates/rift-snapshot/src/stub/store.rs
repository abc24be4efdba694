//! Rule store collaborator.

use super::types::StubMapping;
use uuid::Uuid;

/// Error types for rule store writes
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Stub {id} rejected: {reason}")]
    Rejected { id: Uuid, reason: String },
    #[error("Failed to persist stub {id}: {source}")]
    Io {
        id: Uuid,
        #[source]
        source: std::io::Error,
    },
}

/// Where persisted stubs go. The write policy (add-if-absent or overwrite)
/// belongs to the implementation.
pub trait StubStore: Send + Sync {
    fn add_stub(&self, stub: StubMapping) -> Result<(), StoreError>;
}
