//! Submission orchestration: shape check, idempotent persistence, quote
//! derivation and CRM contact sync.
//!
//! Storage and the CRM sit behind the [`SubmissionStore`] and
//! [`ContactDirectory`] ports so the flow can run against SQLite and HubSpot
//! in production and against in-memory doubles in tests. Duplicate requests
//! are resolved by the store's unique idempotency key; the pipeline itself
//! holds no per-request state.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::age::effective_age_band;
use crate::domain::submission::{
    ContactId, ContactProperties, DerivedFacts, RawSubmission, StoredSubmission, SubmissionId,
    SyncStatus, SyncUpdate,
};
use crate::enum_schema::{validate_properties, EnumSchema, PROPERTY_PAYMENT_PLAN};
use crate::errors::{ApplicationError, CrmError, DomainError, StoreError};
use crate::idempotency::IdempotencyKey;
use crate::normalize::{normalize_answers, normalize_email};
use crate::pricing::{household_quote, PaymentPlan};
use crate::redact::{mask_email, mask_phone};

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn find_by_idempotency_key(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<StoredSubmission>, StoreError>;

    /// Fails with [`StoreError::DuplicateKey`] when the key is already taken.
    async fn insert(&self, submission: StoredSubmission) -> Result<StoredSubmission, StoreError>;

    async fn update_sync(&self, id: &SubmissionId, update: SyncUpdate) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ContactDirectory: Send + Sync {
    async fn find_contact_by_email(&self, email: &str) -> Result<Option<ContactId>, CrmError>;

    async fn create_contact(&self, properties: &ContactProperties)
        -> Result<ContactId, CrmError>;

    async fn update_contact(
        &self,
        id: &ContactId,
        properties: &ContactProperties,
    ) -> Result<ContactId, CrmError>;
}

#[derive(Clone, Debug)]
pub struct SubmissionContext {
    pub request_id: String,
    pub received_at: DateTime<Utc>,
}

impl SubmissionContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self { request_id: request_id.into(), received_at: Utc::now() }
    }

    pub fn at(request_id: impl Into<String>, received_at: DateTime<Utc>) -> Self {
        Self { request_id: request_id.into(), received_at }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AcceptedSubmission {
    pub submission_id: SubmissionId,
    pub contact_id: Option<ContactId>,
    pub status: SyncStatus,
    pub derived: DerivedFacts,
    pub replayed: bool,
}

impl AcceptedSubmission {
    fn replay_of(record: StoredSubmission) -> Self {
        Self {
            submission_id: record.id,
            contact_id: record.contact_id,
            status: record.status,
            derived: record.derived,
            replayed: true,
        }
    }
}

#[derive(Clone)]
pub struct SubmissionPipeline {
    store: Arc<dyn SubmissionStore>,
    contacts: Arc<dyn ContactDirectory>,
    schema: Arc<EnumSchema>,
    schema_version: String,
}

impl SubmissionPipeline {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        contacts: Arc<dyn ContactDirectory>,
        schema: Arc<EnumSchema>,
        schema_version: impl Into<String>,
    ) -> Self {
        Self { store, contacts, schema, schema_version: schema_version.into() }
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    pub async fn submit(
        &self,
        raw: RawSubmission,
        context: &SubmissionContext,
    ) -> Result<AcceptedSubmission, ApplicationError> {
        let checked = raw.check_shape().map_err(DomainError::InvalidShape)?;
        let email = normalize_email(&raw.email);

        info!(
            event_name = "quote.request.received",
            correlation_id = %context.request_id,
            email = %mask_email(&email),
            phone = ?mask_phone(raw.phone.as_deref()),
            "quote request received"
        );

        let key = IdempotencyKey::for_receipt(&email, &self.schema_version, context.received_at);
        if let Some(existing) = self.store.find_by_idempotency_key(&key).await? {
            info!(
                event_name = "quote.request.replayed",
                correlation_id = %context.request_id,
                submission_id = %existing.id,
                "returning existing submission for idempotency key"
            );
            return Ok(AcceptedSubmission::replay_of(existing));
        }

        let today = context.received_at.date_naive();
        let titular = effective_age_band(checked.dob_titular, today);
        let pareja = checked.dob_pareja.map(|dob| effective_age_band(dob, today));

        let normalized =
            normalize_answers(&raw, &checked, titular.band, pareja.map(|derived| derived.band));
        let properties = normalized.contact_properties();
        let violations = validate_properties(&self.schema, &properties);

        let plan = normalized
            .payment_plan
            .as_deref()
            .filter(|token| self.schema.is_allowed(PROPERTY_PAYMENT_PLAN, token))
            .and_then(PaymentPlan::from_enum_token);
        let derived = DerivedFacts {
            effective_age: titular.effective_age,
            age_band_titular: titular.band,
            age_band_pareja: pareja.map(|derived| derived.band),
            quote: household_quote(titular.band, pareja.map(|derived| derived.band), plan),
        };

        let (status, error_detail) = if violations.is_empty() {
            (SyncStatus::Received, None)
        } else {
            (SyncStatus::SyncFailed, Some(json!({ "invalid_enums": violations })))
        };

        let record = StoredSubmission {
            id: SubmissionId::generate(),
            idempotency_key: key.clone(),
            schema_version: self.schema_version.clone(),
            request_id: context.request_id.clone(),
            attribution: raw.attribution.clone(),
            answers: raw,
            normalized,
            derived: derived.clone(),
            status,
            contact_id: None,
            crm_payload: Some(properties.clone()),
            error_detail,
            created_at: context.received_at,
            updated_at: context.received_at,
        };

        let stored = match self.store.insert(record).await {
            Ok(stored) => stored,
            Err(StoreError::DuplicateKey(_)) => {
                return self.replay_winner(&key, context).await;
            }
            Err(error) => return Err(error.into()),
        };

        if !violations.is_empty() {
            warn!(
                event_name = "quote.validation.invalid_enum",
                correlation_id = %context.request_id,
                submission_id = %stored.id,
                violation_count = violations.len(),
                "submission stored with invalid enum values"
            );
            return Err(DomainError::InvalidEnums(violations).into());
        }

        self.sync_contact(stored, &email, properties, derived, context).await
    }

    async fn replay_winner(
        &self,
        key: &IdempotencyKey,
        context: &SubmissionContext,
    ) -> Result<AcceptedSubmission, ApplicationError> {
        let winner = self.store.find_by_idempotency_key(key).await?.ok_or_else(|| {
            ApplicationError::Persistence(format!(
                "idempotency key `{key}` conflicted but no record was found"
            ))
        })?;
        info!(
            event_name = "quote.request.concurrent_duplicate",
            correlation_id = %context.request_id,
            submission_id = %winner.id,
            "lost insert race, returning winning submission"
        );
        Ok(AcceptedSubmission::replay_of(winner))
    }

    async fn sync_contact(
        &self,
        stored: StoredSubmission,
        email: &str,
        properties: ContactProperties,
        derived: DerivedFacts,
        context: &SubmissionContext,
    ) -> Result<AcceptedSubmission, ApplicationError> {
        match self.upsert_contact(email, &properties).await {
            Ok(contact_id) => {
                stored.status.ensure_transition(SyncStatus::Synced)?;
                let update =
                    SyncUpdate::synced(contact_id.clone(), properties.clone(), Utc::now());
                if let Err(store_error) = self.store.update_sync(&stored.id, update).await {
                    self.record_unsaved_sync(&stored, contact_id, properties, &store_error, context)
                        .await;
                    return Err(store_error.into());
                }
                info!(
                    event_name = "quote.crm.synced",
                    correlation_id = %context.request_id,
                    submission_id = %stored.id,
                    contact_id = %contact_id,
                    "contact synced to crm"
                );
                Ok(AcceptedSubmission {
                    submission_id: stored.id,
                    contact_id: Some(contact_id),
                    status: SyncStatus::Synced,
                    derived,
                    replayed: false,
                })
            }
            Err(crm_error) => {
                warn!(
                    event_name = "quote.crm.sync_failed",
                    correlation_id = %context.request_id,
                    submission_id = %stored.id,
                    error = %crm_error,
                    "crm contact sync failed"
                );
                stored.status.ensure_transition(SyncStatus::SyncFailed)?;
                let update = SyncUpdate::failed(
                    properties,
                    json!({ "message": crm_error.to_string() }),
                    Utc::now(),
                );
                if let Err(store_error) = self.store.update_sync(&stored.id, update).await {
                    error!(
                        event_name = "quote.crm.failure_not_recorded",
                        correlation_id = %context.request_id,
                        submission_id = %stored.id,
                        error = %store_error,
                        "could not record crm sync failure"
                    );
                }
                Err(crm_error.into())
            }
        }
    }

    /// The CRM holds the contact but the synced status was not saved; park the
    /// record as `sync_failed` so it is terminal and visible to operators.
    async fn record_unsaved_sync(
        &self,
        stored: &StoredSubmission,
        contact_id: ContactId,
        properties: ContactProperties,
        store_error: &StoreError,
        context: &SubmissionContext,
    ) {
        error!(
            event_name = "quote.crm.sync_not_recorded",
            correlation_id = %context.request_id,
            submission_id = %stored.id,
            contact_id = %contact_id,
            error = %store_error,
            "crm contact synced but status update failed"
        );
        let fallback = SyncUpdate::failed(
            properties,
            json!({
                "message": format!("sync status not recorded: {store_error}"),
                "contact_id": contact_id.0.clone(),
            }),
            Utc::now(),
        )
        .with_contact(contact_id);
        match self.store.update_sync(&stored.id, fallback).await {
            Ok(()) => warn!(
                event_name = "quote.crm.sync_parked",
                correlation_id = %context.request_id,
                submission_id = %stored.id,
                "submission marked sync_failed after unrecorded crm sync"
            ),
            Err(retry_error) => error!(
                event_name = "quote.crm.failure_not_recorded",
                correlation_id = %context.request_id,
                submission_id = %stored.id,
                error = %retry_error,
                "could not record crm sync outcome"
            ),
        }
    }

    async fn upsert_contact(
        &self,
        email: &str,
        properties: &ContactProperties,
    ) -> Result<ContactId, CrmError> {
        match self.contacts.find_contact_by_email(email).await? {
            Some(existing) => self.contacts.update_contact(&existing, properties).await,
            None => self.contacts.create_contact(properties).await,
        }
    }
}
