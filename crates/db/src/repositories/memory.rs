use std::collections::HashMap;

use tokio::sync::RwLock;

use leadquote_core::domain::submission::{
    StoredSubmission, SubmissionId, SyncStatus, SyncUpdate,
};
use leadquote_core::errors::StoreError;
use leadquote_core::idempotency::IdempotencyKey;
use leadquote_core::pipeline::SubmissionStore;

use super::{RepositoryError, SubmissionRepository};

/// Keyed by idempotency key, so duplicate inserts conflict like the SQL unique constraint.
#[derive(Default)]
pub struct InMemorySubmissionRepository {
    submissions: RwLock<HashMap<String, StoredSubmission>>,
}

#[async_trait::async_trait]
impl SubmissionStore for InMemorySubmissionRepository {
    async fn find_by_idempotency_key(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<StoredSubmission>, StoreError> {
        let submissions = self.submissions.read().await;
        Ok(submissions.get(key.as_str()).cloned())
    }

    async fn insert(&self, submission: StoredSubmission) -> Result<StoredSubmission, StoreError> {
        let mut submissions = self.submissions.write().await;
        let key = submission.idempotency_key.0.clone();
        if submissions.contains_key(&key) {
            return Err(RepositoryError::Conflict(key).into());
        }
        submissions.insert(key, submission.clone());
        Ok(submission)
    }

    async fn update_sync(&self, id: &SubmissionId, update: SyncUpdate) -> Result<(), StoreError> {
        let mut submissions = self.submissions.write().await;
        let record = submissions
            .values_mut()
            .find(|record| &record.id == id)
            .ok_or_else(|| RepositoryError::NotAwaitingSync(id.to_string()))?;
        record
            .status
            .ensure_transition(update.status)
            .map_err(|_| RepositoryError::NotAwaitingSync(id.to_string()))?;
        update.apply_to(record);
        Ok(())
    }
}

#[async_trait::async_trait]
impl SubmissionRepository for InMemorySubmissionRepository {
    async fn find_by_id(
        &self,
        id: &SubmissionId,
    ) -> Result<Option<StoredSubmission>, RepositoryError> {
        let submissions = self.submissions.read().await;
        Ok(submissions.values().find(|record| &record.id == id).cloned())
    }

    async fn list_by_status(
        &self,
        status: SyncStatus,
        limit: u32,
    ) -> Result<Vec<StoredSubmission>, RepositoryError> {
        let submissions = self.submissions.read().await;
        let mut matching: Vec<StoredSubmission> =
            submissions.values().filter(|record| record.status == status).cloned().collect();
        matching.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        matching.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use leadquote_core::domain::submission::{ContactId, SubmissionId, SyncStatus, SyncUpdate};
    use leadquote_core::errors::StoreError;
    use leadquote_core::pipeline::SubmissionStore;

    use crate::repositories::submission::tests::sample_submission;
    use crate::repositories::{InMemorySubmissionRepository, SubmissionRepository};

    #[tokio::test]
    async fn in_memory_submission_repo_round_trip() {
        let repo = InMemorySubmissionRepository::default();
        let submission = sample_submission("ana@example.com", "2025-05-01T15:00:00Z");

        repo.insert(submission.clone()).await.expect("save submission");
        let by_key =
            repo.find_by_idempotency_key(&submission.idempotency_key).await.expect("find by key");
        let by_id = repo.find_by_id(&submission.id).await.expect("find by id");

        assert_eq!(by_key, Some(submission.clone()));
        assert_eq!(by_id, Some(submission));
    }

    #[tokio::test]
    async fn in_memory_repo_rejects_duplicate_keys() {
        let repo = InMemorySubmissionRepository::default();
        let first = sample_submission("ana@example.com", "2025-05-01T09:00:00Z");
        let mut second = sample_submission("ana@example.com", "2025-05-01T10:00:00Z");
        second.id = SubmissionId::generate();

        repo.insert(first.clone()).await.expect("first insert");
        let error = repo.insert(second).await.expect_err("duplicate insert");

        assert_eq!(error, StoreError::DuplicateKey(first.idempotency_key.0));
    }

    #[tokio::test]
    async fn in_memory_repo_enforces_sync_transitions() {
        let repo = InMemorySubmissionRepository::default();
        let submission = sample_submission("ana@example.com", "2025-05-01T15:00:00Z");
        repo.insert(submission.clone()).await.expect("insert");

        repo.update_sync(
            &submission.id,
            SyncUpdate::failed(Default::default(), json!({ "message": "timeout" }), Utc::now()),
        )
        .await
        .expect("mark failed");
        let retry = repo
            .update_sync(
                &submission.id,
                SyncUpdate::synced(ContactId("hs-1".to_string()), Default::default(), Utc::now()),
            )
            .await;

        assert!(matches!(retry, Err(StoreError::NotAwaitingSync(_))));
        let failed = repo.list_by_status(SyncStatus::SyncFailed, 5).await.expect("list");
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].contact_id, None);
    }
}
