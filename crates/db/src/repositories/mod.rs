use async_trait::async_trait;
use thiserror::Error;

use leadquote_core::domain::submission::{StoredSubmission, SubmissionId, SyncStatus};
use leadquote_core::errors::StoreError;
use leadquote_core::pipeline::SubmissionStore;

pub mod memory;
pub mod submission;

pub use memory::InMemorySubmissionRepository;
pub use submission::SqlSubmissionRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("idempotency key `{0}` is already taken")]
    Conflict(String),
    #[error("submission `{0}` is not awaiting sync")]
    NotAwaitingSync(String),
}

impl From<RepositoryError> for StoreError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict(key) => Self::DuplicateKey(key),
            RepositoryError::Decode(message) => Self::Decode(message),
            RepositoryError::NotAwaitingSync(id) => Self::NotAwaitingSync(id),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Operator-facing queries on top of the pipeline's store port.
#[async_trait]
pub trait SubmissionRepository: SubmissionStore {
    async fn find_by_id(&self, id: &SubmissionId)
        -> Result<Option<StoredSubmission>, RepositoryError>;

    /// Newest first.
    async fn list_by_status(
        &self,
        status: SyncStatus,
        limit: u32,
    ) -> Result<Vec<StoredSubmission>, RepositoryError>;
}
