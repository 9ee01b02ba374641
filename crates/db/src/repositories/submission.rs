use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use leadquote_core::domain::submission::{
    Attribution, ContactId, StoredSubmission, SubmissionId, SyncStatus, SyncUpdate,
};
use leadquote_core::errors::StoreError;
use leadquote_core::idempotency::IdempotencyKey;
use leadquote_core::pipeline::SubmissionStore;

use super::{RepositoryError, SubmissionRepository};
use crate::DbPool;

const SUBMISSION_COLUMNS: &str = "id, idempotency_key, schema_version, request_id,
    page_url, referrer, utm_source, utm_medium, utm_campaign, utm_term, utm_content,
    gclid, fbclid, answers_json, normalized_json, derived_json, status, crm_contact_id,
    crm_payload_json, error_json, created_at, updated_at";

pub struct SqlSubmissionRepository {
    pool: DbPool,
}

impl SqlSubmissionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn insert_row(&self, submission: &StoredSubmission) -> Result<(), RepositoryError> {
        let attribution = &submission.attribution;
        let crm_payload_json = submission.crm_payload.as_ref().map(encode_json).transpose()?;
        let error_json = submission.error_detail.as_ref().map(encode_json).transpose()?;

        let result = sqlx::query(
            "INSERT INTO form_submissions (
                 id, idempotency_key, schema_version, request_id,
                 page_url, referrer, utm_source, utm_medium, utm_campaign, utm_term, utm_content,
                 gclid, fbclid, answers_json, normalized_json, derived_json, status,
                 crm_contact_id, crm_payload_json, error_json, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&submission.id.0)
        .bind(submission.idempotency_key.as_str())
        .bind(&submission.schema_version)
        .bind(&submission.request_id)
        .bind(&attribution.page_url)
        .bind(&attribution.referrer)
        .bind(&attribution.utm_source)
        .bind(&attribution.utm_medium)
        .bind(&attribution.utm_campaign)
        .bind(&attribution.utm_term)
        .bind(&attribution.utm_content)
        .bind(&attribution.gclid)
        .bind(&attribution.fbclid)
        .bind(encode_json(&submission.answers)?)
        .bind(encode_json(&submission.normalized)?)
        .bind(encode_json(&submission.derived)?)
        .bind(submission.status.as_str())
        .bind(submission.contact_id.as_ref().map(|id| id.0.clone()))
        .bind(crm_payload_json)
        .bind(error_json)
        .bind(submission.created_at.to_rfc3339())
        .bind(submission.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(error)) if error.is_unique_violation() => {
                Err(RepositoryError::Conflict(submission.idempotency_key.to_string()))
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn apply_sync(
        &self,
        id: &SubmissionId,
        update: SyncUpdate,
    ) -> Result<(), RepositoryError> {
        SyncStatus::Received
            .ensure_transition(update.status)
            .map_err(|_| RepositoryError::NotAwaitingSync(id.to_string()))?;

        let crm_payload_json = update.crm_payload.as_ref().map(encode_json).transpose()?;
        let error_json = update.error_detail.as_ref().map(encode_json).transpose()?;

        let result = sqlx::query(
            "UPDATE form_submissions
             SET status = ?,
                 crm_contact_id = COALESCE(?, crm_contact_id),
                 crm_payload_json = COALESCE(?, crm_payload_json),
                 error_json = ?,
                 updated_at = ?
             WHERE id = ? AND status = 'received'",
        )
        .bind(update.status.as_str())
        .bind(update.contact_id.as_ref().map(|id| id.0.clone()))
        .bind(crm_payload_json)
        .bind(error_json)
        .bind(update.updated_at.to_rfc3339())
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotAwaitingSync(id.to_string()));
        }
        Ok(())
    }

    async fn fetch_by_key(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<StoredSubmission>, RepositoryError> {
        let sql =
            format!("SELECT {SUBMISSION_COLUMNS} FROM form_submissions WHERE idempotency_key = ?");
        let row = sqlx::query(&sql).bind(key.as_str()).fetch_optional(&self.pool).await?;

        row.as_ref().map(submission_from_row).transpose()
    }
}

#[async_trait::async_trait]
impl SubmissionStore for SqlSubmissionRepository {
    async fn find_by_idempotency_key(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<StoredSubmission>, StoreError> {
        Ok(self.fetch_by_key(key).await?)
    }

    async fn insert(&self, submission: StoredSubmission) -> Result<StoredSubmission, StoreError> {
        self.insert_row(&submission).await?;
        Ok(submission)
    }

    async fn update_sync(&self, id: &SubmissionId, update: SyncUpdate) -> Result<(), StoreError> {
        Ok(self.apply_sync(id, update).await?)
    }
}

#[async_trait::async_trait]
impl SubmissionRepository for SqlSubmissionRepository {
    async fn find_by_id(
        &self,
        id: &SubmissionId,
    ) -> Result<Option<StoredSubmission>, RepositoryError> {
        let sql = format!("SELECT {SUBMISSION_COLUMNS} FROM form_submissions WHERE id = ?");
        let row = sqlx::query(&sql).bind(&id.0).fetch_optional(&self.pool).await?;

        row.as_ref().map(submission_from_row).transpose()
    }

    async fn list_by_status(
        &self,
        status: SyncStatus,
        limit: u32,
    ) -> Result<Vec<StoredSubmission>, RepositoryError> {
        let sql = format!(
            "SELECT {SUBMISSION_COLUMNS} FROM form_submissions
             WHERE status = ?
             ORDER BY created_at DESC
             LIMIT ?"
        );
        let rows = sqlx::query(&sql)
            .bind(status.as_str())
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(submission_from_row).collect()
    }
}

fn submission_from_row(row: &SqliteRow) -> Result<StoredSubmission, RepositoryError> {
    let status_raw: String = column(row, "status")?;
    let status = SyncStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown sync status `{status_raw}`")))?;
    let crm_payload_json: Option<String> = column(row, "crm_payload_json")?;
    let error_json: Option<String> = column(row, "error_json")?;
    let contact_id: Option<String> = column(row, "crm_contact_id")?;

    Ok(StoredSubmission {
        id: SubmissionId(column(row, "id")?),
        idempotency_key: IdempotencyKey(column(row, "idempotency_key")?),
        schema_version: column(row, "schema_version")?,
        request_id: column(row, "request_id")?,
        attribution: Attribution {
            page_url: column(row, "page_url")?,
            referrer: column(row, "referrer")?,
            utm_source: column(row, "utm_source")?,
            utm_medium: column(row, "utm_medium")?,
            utm_campaign: column(row, "utm_campaign")?,
            utm_term: column(row, "utm_term")?,
            utm_content: column(row, "utm_content")?,
            gclid: column(row, "gclid")?,
            fbclid: column(row, "fbclid")?,
        },
        answers: decode_json("answers_json", &column::<String>(row, "answers_json")?)?,
        normalized: decode_json("normalized_json", &column::<String>(row, "normalized_json")?)?,
        derived: decode_json("derived_json", &column::<String>(row, "derived_json")?)?,
        status,
        contact_id: contact_id.map(ContactId),
        crm_payload: crm_payload_json
            .map(|raw| decode_json("crm_payload_json", &raw))
            .transpose()?,
        error_detail: error_json.map(|raw| decode_json("error_json", &raw)).transpose()?,
        created_at: parse_timestamp("created_at", &column::<String>(row, "created_at")?)?,
        updated_at: parse_timestamp("updated_at", &column::<String>(row, "updated_at")?)?,
    })
}

fn column<T>(row: &SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name).map_err(|error| RepositoryError::Decode(format!("{name}: {error}")))
}

fn encode_json<T: Serialize>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|error| RepositoryError::Decode(error.to_string()))
}

fn decode_json<T: DeserializeOwned>(column: &str, raw: &str) -> Result<T, RepositoryError> {
    serde_json::from_str(raw).map_err(|error| RepositoryError::Decode(format!("{column}: {error}")))
}

fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("{column}: {error}")))
}
