//! Errors of a snapshot invocation.

use super::transformer::TransformerError;
use crate::predicate::PatternError;
use crate::stub::StoreError;
use uuid::Uuid;

/// Error types for the snapshot pipeline
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Invalid snapshot spec: {0}")]
    InvalidSpec(String),
    #[error("Invalid filter: {0}")]
    InvalidFilter(#[from] PatternError),
    #[error("Unknown transformer(s): {}", .0.join(", "))]
    UnknownTransformers(Vec<String>),
    #[error("Failed to generate stub from exchange {event_id}: {source}")]
    StubGeneration {
        event_id: Uuid,
        #[source]
        source: PatternError,
    },
    #[error("Transformer '{name}' failed on stub {stub_id}: {source}")]
    Transformer {
        name: String,
        stub_id: Uuid,
        #[source]
        source: TransformerError,
    },
    #[error("Failed to extract body of stub {stub_id}: {source}")]
    BodyExtraction {
        stub_id: Uuid,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Failed to render stub: {0}")]
    Render(#[from] serde_json::Error),
}

impl SnapshotError {
    /// True when the request itself was at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SnapshotError::InvalidSpec(_)
                | SnapshotError::InvalidFilter(_)
                | SnapshotError::UnknownTransformers(_)
        )
    }

    /// Short machine-readable code for API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            SnapshotError::InvalidSpec(_) => "INVALID_SPEC",
            SnapshotError::InvalidFilter(_) => "INVALID_FILTER",
            SnapshotError::UnknownTransformers(_) => "UNKNOWN_TRANSFORMER",
            SnapshotError::StubGeneration { .. } => "STUB_GENERATION_FAILED",
            SnapshotError::Transformer { .. } => "TRANSFORMER_FAILED",
            SnapshotError::BodyExtraction { .. } => "BODY_EXTRACTION_FAILED",
            SnapshotError::Store(_) => "PERSISTENCE_FAILED",
            SnapshotError::Render(_) => "RENDER_FAILED",
        }
    }
}
